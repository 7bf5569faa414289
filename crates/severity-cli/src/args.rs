//! Scenario input from flags and JSON files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use severity_core::{
    AccidentCause, AccidentScenario, Country, DayOfWeek, DriverAgeGroup, DriverGender, FieldError,
    Month, RoadCondition, RoadType, ScenarioDraft, TimeOfDay, UrbanRural, ValidationError,
    VehicleCondition, WeatherConditions,
};

/// Scenario fields. Unset fields fall back to `--file`, then to the
/// quick-prediction baseline (weekday-morning urban street, clear weather).
#[derive(Args, Debug, Default)]
pub struct ScenarioArgs {
    /// JSON object with any subset of scenario fields.
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub country: Option<Country>,
    #[arg(long)]
    pub month: Option<Month>,
    #[arg(long)]
    pub day_of_week: Option<DayOfWeek>,
    #[arg(long)]
    pub time_of_day: Option<TimeOfDay>,
    #[arg(long)]
    pub urban_rural: Option<UrbanRural>,
    /// "Highway", "Main Road", or "Street".
    #[arg(long)]
    pub road_type: Option<RoadType>,
    #[arg(long)]
    pub road_condition: Option<RoadCondition>,
    /// km/h, 0-200.
    #[arg(long)]
    pub speed_limit: Option<u32>,
    #[arg(long)]
    pub weather: Option<WeatherConditions>,
    /// Meters, 0-1000.
    #[arg(long)]
    pub visibility: Option<f64>,
    #[arg(long)]
    pub vehicles: Option<u32>,
    #[arg(long)]
    pub vehicle_condition: Option<VehicleCondition>,
    #[arg(long)]
    pub driver_age_group: Option<DriverAgeGroup>,
    #[arg(long)]
    pub driver_gender: Option<DriverGender>,
    #[arg(long)]
    pub alcohol_level: Option<f64>,
    #[arg(long)]
    pub fatigue: Option<u32>,
    #[arg(long)]
    pub pedestrians: Option<u32>,
    #[arg(long)]
    pub cyclists: Option<u32>,
    #[arg(long)]
    pub traffic_volume: Option<f64>,
    #[arg(long)]
    pub population_density: Option<f64>,
    #[arg(long)]
    pub cause: Option<AccidentCause>,
}

/// A scenario assembled from command-line input.
pub enum ScenarioInput {
    Ready(AccidentScenario),
    Invalid(Vec<FieldError>),
}

impl ScenarioArgs {
    fn overrides(&self) -> ScenarioDraft {
        ScenarioDraft {
            country: self.country,
            month: self.month,
            day_of_week: self.day_of_week,
            time_of_day: self.time_of_day,
            urban_rural: self.urban_rural,
            road_type: self.road_type,
            road_condition: self.road_condition,
            speed_limit: self.speed_limit.map(f64::from),
            weather_conditions: self.weather,
            visibility_level: self.visibility,
            number_of_vehicles_involved: self.vehicles.map(f64::from),
            vehicle_condition: self.vehicle_condition,
            driver_age_group: self.driver_age_group,
            driver_gender: self.driver_gender,
            driver_alcohol_level: self.alcohol_level,
            driver_fatigue: self.fatigue.map(f64::from),
            pedestrians_involved: self.pedestrians.map(f64::from),
            cyclists_involved: self.cyclists.map(f64::from),
            traffic_volume: self.traffic_volume,
            population_density: self.population_density,
            accident_cause: self.cause,
        }
    }

    /// Layer baseline, file, and flags, then validate.
    pub fn resolve(&self) -> anyhow::Result<ScenarioInput> {
        let mut draft = ScenarioDraft::from(AccidentScenario::baseline());
        if let Some(path) = &self.file {
            let from_file: ScenarioDraft = read_json(path)?;
            draft = draft.merge(from_file);
        }
        Ok(into_input(draft.merge(self.overrides()).build()))
    }
}

/// Read a batch file: a JSON array of complete scenarios.
///
/// Field errors from every entry are collected, prefixed with the entry index.
pub fn read_batch(path: &Path) -> anyhow::Result<ScenarioInputs> {
    let drafts: Vec<ScenarioDraft> = read_json(path)?;
    let mut scenarios = Vec::with_capacity(drafts.len());
    let mut errors = Vec::new();
    for (idx, draft) in drafts.into_iter().enumerate() {
        match draft.build() {
            Ok(s) => scenarios.push(s),
            Err(e) => errors.extend(e.fields().iter().map(|f| FieldError {
                field: f.field,
                message: format!("scenario {idx}: {}", f.message),
            })),
        }
    }
    if errors.is_empty() {
        Ok(ScenarioInputs::Ready(scenarios))
    } else {
        Ok(ScenarioInputs::Invalid(errors))
    }
}

pub enum ScenarioInputs {
    Ready(Vec<AccidentScenario>),
    Invalid(Vec<FieldError>),
}

fn into_input(built: Result<AccidentScenario, ValidationError>) -> ScenarioInput {
    match built {
        Ok(s) => ScenarioInput::Ready(s),
        Err(e) => ScenarioInput::Invalid(e.fields().to_vec()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_gives_baseline() {
        match ScenarioArgs::default().resolve().unwrap() {
            ScenarioInput::Ready(s) => assert_eq!(s, AccidentScenario::baseline()),
            ScenarioInput::Invalid(e) => panic!("unexpected errors: {e:?}"),
        }
    }

    #[test]
    fn flags_override_file_which_overrides_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(
            &path,
            r#"{"weather_conditions": "Snowy", "road_condition": "Icy", "speed_limit": 80}"#,
        )
        .unwrap();

        let args = ScenarioArgs {
            file: Some(path),
            speed_limit: Some(30),
            ..Default::default()
        };
        let scenario = match args.resolve().unwrap() {
            ScenarioInput::Ready(s) => s,
            ScenarioInput::Invalid(e) => panic!("unexpected errors: {e:?}"),
        };
        assert_eq!(scenario.weather_conditions, WeatherConditions::Snowy);
        assert_eq!(scenario.road_condition, RoadCondition::Icy);
        assert_eq!(scenario.speed_limit, 30);
    }

    #[test]
    fn out_of_range_flag_is_reported() {
        let args = ScenarioArgs {
            speed_limit: Some(250),
            ..Default::default()
        };
        match args.resolve().unwrap() {
            ScenarioInput::Invalid(errors) => assert_eq!(errors[0].field, "speed_limit"),
            ScenarioInput::Ready(_) => panic!("250 km/h must be rejected"),
        }
    }

    #[test]
    fn negative_count_in_file_is_a_field_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, r#"{"pedestrians_involved": -1, "speed_limit": 250}"#).unwrap();

        let args = ScenarioArgs {
            file: Some(path),
            ..Default::default()
        };
        match args.resolve().unwrap() {
            ScenarioInput::Invalid(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["speed_limit", "pedestrians_involved"]);
            }
            ScenarioInput::Ready(_) => panic!("negative count must be rejected"),
        }
    }

    #[test]
    fn batch_file_reports_entry_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        let mut entries = vec![serde_json::to_value(AccidentScenario::baseline()).unwrap(); 2];
        entries[1]["driver_fatigue"] = serde_json::json!(-2);
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        match read_batch(&path).unwrap() {
            ScenarioInputs::Invalid(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "driver_fatigue");
                assert!(errors[0].message.starts_with("scenario 1:"));
            }
            ScenarioInputs::Ready(_) => panic!("negative fatigue must be rejected"),
        }
    }
}
