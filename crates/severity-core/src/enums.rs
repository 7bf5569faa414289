//! Closed categorical values shared with the prediction service.
//!
//! Each enum serialises to the exact literal the service expects, including
//! embedded spaces and hyphens (`"Main Road"`, `"Snow-covered"`, `"18-25"`).
//! Parsing is exact: no case folding, no trimming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that is not one of an enumeration's literals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $kind:literal {
            $($variant:ident => $lit:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $lit)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $lit,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// Predicted outcome class.
    Severity: "severity" {
        Minor => "Minor",
        Moderate => "Moderate",
        Severe => "Severe",
    }
}

wire_enum! {
    Country: "country" {
        Usa => "USA",
        Uk => "UK",
        Canada => "Canada",
        India => "India",
        China => "China",
        Japan => "Japan",
    }
}

wire_enum! {
    Month: "month" {
        January => "January",
        February => "February",
        March => "March",
        April => "April",
        May => "May",
        June => "June",
        July => "July",
        August => "August",
        September => "September",
        October => "October",
        November => "November",
        December => "December",
    }
}

wire_enum! {
    DayOfWeek: "day of week" {
        Monday => "Monday",
        Tuesday => "Tuesday",
        Wednesday => "Wednesday",
        Thursday => "Thursday",
        Friday => "Friday",
        Saturday => "Saturday",
        Sunday => "Sunday",
    }
}

wire_enum! {
    TimeOfDay: "time of day" {
        Morning => "Morning",
        Afternoon => "Afternoon",
        Evening => "Evening",
        Night => "Night",
    }
}

wire_enum! {
    UrbanRural: "urban/rural" {
        Urban => "Urban",
        Rural => "Rural",
    }
}

wire_enum! {
    RoadType: "road type" {
        Highway => "Highway",
        MainRoad => "Main Road",
        Street => "Street",
    }
}

wire_enum! {
    RoadCondition: "road condition" {
        Dry => "Dry",
        Wet => "Wet",
        Icy => "Icy",
        SnowCovered => "Snow-covered",
    }
}

wire_enum! {
    WeatherConditions: "weather conditions" {
        Clear => "Clear",
        Rainy => "Rainy",
        Snowy => "Snowy",
        Foggy => "Foggy",
        Windy => "Windy",
    }
}

wire_enum! {
    VehicleCondition: "vehicle condition" {
        Good => "Good",
        Moderate => "Moderate",
        Poor => "Poor",
    }
}

wire_enum! {
    DriverAgeGroup: "driver age group" {
        Young => "18-25",
        Adult => "26-40",
        MiddleAged => "41-60",
        Senior => "60+",
    }
}

wire_enum! {
    DriverGender: "driver gender" {
        Male => "Male",
        Female => "Female",
    }
}

wire_enum! {
    AccidentCause: "accident cause" {
        Speeding => "Speeding",
        DistractedDriving => "Distracted Driving",
        Weather => "Weather",
        MechanicalFailure => "Mechanical Failure",
        HumanError => "Human Error",
    }
}

wire_enum! {
    /// Chart kinds accepted by the data-exploration endpoint.
    ChartType: "chart type" {
        Histogram => "histogram",
        Bar => "bar",
        Scatter => "scatter",
        Box => "box",
        Correlation => "correlation",
    }
}

wire_enum! {
    /// `type` tag of a streaming-channel message.
    StreamEventKind: "stream event type" {
        Prediction => "prediction",
        Error => "error",
        SystemStatus => "system_status",
        ModelUpdate => "model_update",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_keep_spaces_and_hyphens() {
        assert_eq!(
            serde_json::to_string(&RoadType::MainRoad).unwrap(),
            "\"Main Road\""
        );
        assert_eq!(
            serde_json::to_string(&RoadCondition::SnowCovered).unwrap(),
            "\"Snow-covered\""
        );
        assert_eq!(
            serde_json::to_string(&DriverAgeGroup::Senior).unwrap(),
            "\"60+\""
        );
        let cause: AccidentCause = serde_json::from_str("\"Distracted Driving\"").unwrap();
        assert_eq!(cause, AccidentCause::DistractedDriving);
    }

    #[test]
    fn from_str_is_exact() {
        assert_eq!("18-25".parse::<DriverAgeGroup>(), Ok(DriverAgeGroup::Young));
        assert!("main road".parse::<RoadType>().is_err());
        assert!(" Street".parse::<RoadType>().is_err());

        let err = "Critical".parse::<Severity>().unwrap_err();
        assert_eq!(err.kind, "severity");
        assert_eq!(err.value, "Critical");
    }

    #[test]
    fn unknown_literal_fails_deserialisation() {
        assert!(serde_json::from_str::<Country>("\"France\"").is_err());
        assert!(serde_json::from_str::<Country>("\"usa\"").is_err());
    }

    #[test]
    fn all_lists_every_value_in_order() {
        assert_eq!(Month::ALL.len(), 12);
        assert_eq!(Month::ALL[0], Month::January);
        assert_eq!(Month::ALL[11], Month::December);
        assert_eq!(DayOfWeek::ALL.len(), 7);
        assert_eq!(Severity::ALL, &[Severity::Minor, Severity::Moderate, Severity::Severe]);
        for cause in AccidentCause::ALL {
            assert_eq!(cause.as_str().parse::<AccidentCause>(), Ok(*cause));
        }
    }

    #[test]
    fn display_matches_wire_literal() {
        assert_eq!(Country::Usa.to_string(), "USA");
        assert_eq!(ChartType::Correlation.to_string(), "correlation");
    }
}
