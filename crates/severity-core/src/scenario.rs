//! Accident scenarios submitted for prediction, and their local validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::{
    AccidentCause, Country, DayOfWeek, DriverAgeGroup, DriverGender, Month, RoadCondition,
    RoadType, TimeOfDay, UrbanRural, VehicleCondition, WeatherConditions,
};

pub const MAX_SPEED_LIMIT: u32 = 200;
/// Upper bound for `visibility_level`, in meters.
pub const MAX_VISIBILITY: f64 = 1000.0;
/// Largest batch the service accepts in one call.
pub const MAX_BATCH_SIZE: usize = 1000;

/// One hypothetical accident context, as sent to `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccidentScenario {
    // Location and time
    pub country: Country,
    pub month: Month,
    pub day_of_week: DayOfWeek,
    pub time_of_day: TimeOfDay,
    pub urban_rural: UrbanRural,

    // Road
    pub road_type: RoadType,
    pub road_condition: RoadCondition,
    /// km/h.
    pub speed_limit: u32,

    // Weather
    pub weather_conditions: WeatherConditions,
    /// Meters.
    pub visibility_level: f64,

    // Vehicles
    pub number_of_vehicles_involved: u32,
    pub vehicle_condition: VehicleCondition,

    // Driver
    pub driver_age_group: DriverAgeGroup,
    pub driver_gender: DriverGender,
    pub driver_alcohol_level: f64,
    pub driver_fatigue: u32,

    // Other factors
    pub pedestrians_involved: u32,
    pub cyclists_involved: u32,
    pub traffic_volume: f64,
    pub population_density: f64,
    pub accident_cause: AccidentCause,
}

/// A single field that failed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Input rejected before anything is sent to the network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{} invalid field(s): {}", .0.len(), join_fields(.0))]
    Fields(Vec<FieldError>),

    #[error("batch of {size} scenarios exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("batch is empty")]
    EmptyBatch,
}

impl ValidationError {
    /// Per-field errors, empty for batch-level failures.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::Fields(errors) => errors,
            _ => &[],
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl AccidentScenario {
    /// The dashboard's quick-prediction baseline: a weekday-morning urban
    /// street collision in clear weather.
    pub fn baseline() -> Self {
        Self {
            country: Country::Usa,
            month: Month::January,
            day_of_week: DayOfWeek::Monday,
            time_of_day: TimeOfDay::Morning,
            urban_rural: UrbanRural::Urban,
            road_type: RoadType::Street,
            road_condition: RoadCondition::Dry,
            speed_limit: 50,
            weather_conditions: WeatherConditions::Clear,
            visibility_level: 500.0,
            number_of_vehicles_involved: 2,
            vehicle_condition: VehicleCondition::Good,
            driver_age_group: DriverAgeGroup::Adult,
            driver_gender: DriverGender::Male,
            driver_alcohol_level: 0.0,
            driver_fatigue: 0,
            pedestrians_involved: 0,
            cyclists_involved: 0,
            traffic_volume: 1000.0,
            population_density: 2000.0,
            accident_cause: AccidentCause::HumanError,
        }
    }

    /// Check declared numeric ranges. Categorical fields are valid by type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        check_numbers(
            &NumericFields {
                speed_limit: Some(f64::from(self.speed_limit)),
                number_of_vehicles_involved: Some(f64::from(self.number_of_vehicles_involved)),
                driver_fatigue: Some(f64::from(self.driver_fatigue)),
                pedestrians_involved: Some(f64::from(self.pedestrians_involved)),
                cyclists_involved: Some(f64::from(self.cyclists_involved)),
                visibility_level: Some(self.visibility_level),
                driver_alcohol_level: Some(self.driver_alcohol_level),
                traffic_volume: Some(self.traffic_volume),
                population_density: Some(self.population_density),
            },
            &mut errors,
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(errors))
        }
    }
}

/// Validate every scenario of a batch plus the batch size.
///
/// Field messages are prefixed with the scenario's index, e.g. `scenario 3: ...`.
pub fn validate_batch(scenarios: &[AccidentScenario]) -> Result<(), ValidationError> {
    if scenarios.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if scenarios.len() > MAX_BATCH_SIZE {
        return Err(ValidationError::BatchTooLarge {
            size: scenarios.len(),
            max: MAX_BATCH_SIZE,
        });
    }
    let mut errors = Vec::new();
    for (idx, scenario) in scenarios.iter().enumerate() {
        if let Err(ValidationError::Fields(fields)) = scenario.validate() {
            errors.extend(fields.into_iter().map(|e| FieldError {
                field: e.field,
                message: format!("scenario {idx}: {}", e.message),
            }));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Fields(errors))
    }
}

/// Numbers as received, before conversion. Counts arrive as `f64` so that a
/// negative or fractional value from a form or file becomes a field error
/// rather than a parse failure.
struct NumericFields {
    speed_limit: Option<f64>,
    number_of_vehicles_involved: Option<f64>,
    driver_fatigue: Option<f64>,
    pedestrians_involved: Option<f64>,
    cyclists_involved: Option<f64>,
    visibility_level: Option<f64>,
    driver_alcohol_level: Option<f64>,
    traffic_volume: Option<f64>,
    population_density: Option<f64>,
}

fn check_numbers(n: &NumericFields, errors: &mut Vec<FieldError>) {
    for (field, value, max, unit) in [
        ("speed_limit", n.speed_limit, MAX_SPEED_LIMIT, " km/h"),
        ("number_of_vehicles_involved", n.number_of_vehicles_involved, u32::MAX, ""),
        ("driver_fatigue", n.driver_fatigue, u32::MAX, ""),
        ("pedestrians_involved", n.pedestrians_involved, u32::MAX, ""),
        ("cyclists_involved", n.cyclists_involved, u32::MAX, ""),
    ] {
        let Some(v) = value else { continue };
        let message = if !v.is_finite() || v < 0.0 {
            format!("must be a non-negative whole number (got {v})")
        } else if v.fract() != 0.0 {
            format!("must be a whole number (got {v})")
        } else if v > f64::from(max) {
            format!("cannot exceed {max}{unit} (got {v})")
        } else {
            continue;
        };
        errors.push(FieldError { field, message });
    }
    if let Some(v) = n.visibility_level {
        if !v.is_finite() || v < 0.0 {
            errors.push(FieldError {
                field: "visibility_level",
                message: format!("visibility must be a non-negative number (got {v})"),
            });
        } else if v > MAX_VISIBILITY {
            errors.push(FieldError {
                field: "visibility_level",
                message: format!("visibility cannot exceed {MAX_VISIBILITY}m (got {v})"),
            });
        }
    }
    for (field, value) in [
        ("driver_alcohol_level", n.driver_alcohol_level),
        ("traffic_volume", n.traffic_volume),
        ("population_density", n.population_density),
    ] {
        if let Some(v) = value
            && (!v.is_finite() || v < 0.0)
        {
            errors.push(FieldError {
                field,
                message: format!("must be a non-negative number (got {v})"),
            });
        }
    }
}

/// Partially filled scenario, as collected from a form or a JSON file.
///
/// Missing keys deserialise to `None`; [`ScenarioDraft::build`] reports every
/// missing or out-of-range field at once. Counts are held as `f64` until
/// `build` has checked they are whole and non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioDraft {
    pub country: Option<Country>,
    pub month: Option<Month>,
    pub day_of_week: Option<DayOfWeek>,
    pub time_of_day: Option<TimeOfDay>,
    pub urban_rural: Option<UrbanRural>,
    pub road_type: Option<RoadType>,
    pub road_condition: Option<RoadCondition>,
    pub speed_limit: Option<f64>,
    pub weather_conditions: Option<WeatherConditions>,
    pub visibility_level: Option<f64>,
    pub number_of_vehicles_involved: Option<f64>,
    pub vehicle_condition: Option<VehicleCondition>,
    pub driver_age_group: Option<DriverAgeGroup>,
    pub driver_gender: Option<DriverGender>,
    pub driver_alcohol_level: Option<f64>,
    pub driver_fatigue: Option<f64>,
    pub pedestrians_involved: Option<f64>,
    pub cyclists_involved: Option<f64>,
    pub traffic_volume: Option<f64>,
    pub population_density: Option<f64>,
    pub accident_cause: Option<AccidentCause>,
}

impl From<AccidentScenario> for ScenarioDraft {
    fn from(s: AccidentScenario) -> Self {
        Self {
            country: Some(s.country),
            month: Some(s.month),
            day_of_week: Some(s.day_of_week),
            time_of_day: Some(s.time_of_day),
            urban_rural: Some(s.urban_rural),
            road_type: Some(s.road_type),
            road_condition: Some(s.road_condition),
            speed_limit: Some(f64::from(s.speed_limit)),
            weather_conditions: Some(s.weather_conditions),
            visibility_level: Some(s.visibility_level),
            number_of_vehicles_involved: Some(f64::from(s.number_of_vehicles_involved)),
            vehicle_condition: Some(s.vehicle_condition),
            driver_age_group: Some(s.driver_age_group),
            driver_gender: Some(s.driver_gender),
            driver_alcohol_level: Some(s.driver_alcohol_level),
            driver_fatigue: Some(f64::from(s.driver_fatigue)),
            pedestrians_involved: Some(f64::from(s.pedestrians_involved)),
            cyclists_involved: Some(f64::from(s.cyclists_involved)),
            traffic_volume: Some(s.traffic_volume),
            population_density: Some(s.population_density),
            accident_cause: Some(s.accident_cause),
        }
    }
}

impl ScenarioDraft {
    /// Overlay every field set in `other` onto `self`.
    pub fn merge(mut self, other: ScenarioDraft) -> Self {
        macro_rules! overlay {
            ($($f:ident),+) => { $( if other.$f.is_some() { self.$f = other.$f; } )+ };
        }
        overlay!(
            country,
            month,
            day_of_week,
            time_of_day,
            urban_rural,
            road_type,
            road_condition,
            speed_limit,
            weather_conditions,
            visibility_level,
            number_of_vehicles_involved,
            vehicle_condition,
            driver_age_group,
            driver_gender,
            driver_alcohol_level,
            driver_fatigue,
            pedestrians_involved,
            cyclists_involved,
            traffic_volume,
            population_density,
            accident_cause
        );
        self
    }

    /// Convert into a validated [`AccidentScenario`].
    pub fn build(self) -> Result<AccidentScenario, ValidationError> {
        let mut errors = Vec::new();
        check_numbers(
            &NumericFields {
                speed_limit: self.speed_limit,
                number_of_vehicles_involved: self.number_of_vehicles_involved,
                driver_fatigue: self.driver_fatigue,
                pedestrians_involved: self.pedestrians_involved,
                cyclists_involved: self.cyclists_involved,
                visibility_level: self.visibility_level,
                driver_alcohol_level: self.driver_alcohol_level,
                traffic_volume: self.traffic_volume,
                population_density: self.population_density,
            },
            &mut errors,
        );

        macro_rules! required {
            ($f:ident) => {{
                if self.$f.is_none() {
                    errors.push(FieldError {
                        field: stringify!($f),
                        message: "is required".to_string(),
                    });
                }
                self.$f
            }};
        }

        let country = required!(country);
        let month = required!(month);
        let day_of_week = required!(day_of_week);
        let time_of_day = required!(time_of_day);
        let urban_rural = required!(urban_rural);
        let road_type = required!(road_type);
        let road_condition = required!(road_condition);
        let speed_limit = required!(speed_limit);
        let weather_conditions = required!(weather_conditions);
        let visibility_level = required!(visibility_level);
        let number_of_vehicles_involved = required!(number_of_vehicles_involved);
        let vehicle_condition = required!(vehicle_condition);
        let driver_age_group = required!(driver_age_group);
        let driver_gender = required!(driver_gender);
        let driver_alcohol_level = required!(driver_alcohol_level);
        let driver_fatigue = required!(driver_fatigue);
        let pedestrians_involved = required!(pedestrians_involved);
        let cyclists_involved = required!(cyclists_involved);
        let traffic_volume = required!(traffic_volume);
        let population_density = required!(population_density);
        let accident_cause = required!(accident_cause);

        let (
            Some(country),
            Some(month),
            Some(day_of_week),
            Some(time_of_day),
            Some(urban_rural),
            Some(road_type),
            Some(road_condition),
            Some(speed_limit),
            Some(weather_conditions),
            Some(visibility_level),
            Some(number_of_vehicles_involved),
            Some(vehicle_condition),
            Some(driver_age_group),
            Some(driver_gender),
            Some(driver_alcohol_level),
            Some(driver_fatigue),
            Some(pedestrians_involved),
            Some(cyclists_involved),
            Some(traffic_volume),
            Some(population_density),
            Some(accident_cause),
        ) = (
            country,
            month,
            day_of_week,
            time_of_day,
            urban_rural,
            road_type,
            road_condition,
            speed_limit,
            weather_conditions,
            visibility_level,
            number_of_vehicles_involved,
            vehicle_condition,
            driver_age_group,
            driver_gender,
            driver_alcohol_level,
            driver_fatigue,
            pedestrians_involved,
            cyclists_involved,
            traffic_volume,
            population_density,
            accident_cause,
        )
        else {
            return Err(ValidationError::Fields(errors));
        };
        if !errors.is_empty() {
            return Err(ValidationError::Fields(errors));
        }

        // Counts were checked whole and within u32 above.
        Ok(AccidentScenario {
            country,
            month,
            day_of_week,
            time_of_day,
            urban_rural,
            road_type,
            road_condition,
            speed_limit: speed_limit as u32,
            weather_conditions,
            visibility_level,
            number_of_vehicles_involved: number_of_vehicles_involved as u32,
            vehicle_condition,
            driver_age_group,
            driver_gender,
            driver_alcohol_level,
            driver_fatigue: driver_fatigue as u32,
            pedestrians_involved: pedestrians_involved as u32,
            cyclists_involved: cyclists_involved as u32,
            traffic_volume,
            population_density,
            accident_cause,
        })
    }
}
