//! Shared contract with the accident-severity prediction service: domain
//! enumerations, scenarios, prediction results, and display mapping.

pub mod display;
pub mod enums;
pub mod prediction;
pub mod scenario;
pub mod wire;

pub use display::{Tier, format_percentage, format_percentage_with, severity_tier};
pub use enums::{
    AccidentCause, ChartType, Country, DayOfWeek, DriverAgeGroup, DriverGender, Month,
    RoadCondition, RoadType, Severity, StreamEventKind, TimeOfDay, UnknownVariant, UrbanRural,
    VehicleCondition, WeatherConditions,
};
pub use prediction::{PredictionResult, ServerDataError};
pub use scenario::{
    AccidentScenario, FieldError, MAX_BATCH_SIZE, ScenarioDraft, ValidationError, validate_batch,
};
pub use wire::{
    BatchOutcome, BatchPredictionRequest, BatchPredictionResponse, ExplorationRequest,
    ExplorationResponse, HealthStatus, ModelMetrics, RetrainAck, StreamMessage,
};
