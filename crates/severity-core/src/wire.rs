//! Auxiliary request/response bodies: batch, model metrics, health,
//! retraining, data exploration, and the streaming envelope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::{ChartType, StreamEventKind};
use crate::prediction::{PredictionResult, ServerDataError, parse_timestamp};
use crate::scenario::AccidentScenario;

/// Body of `POST /predict/batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionRequest {
    pub predictions: Vec<AccidentScenario>,
}

/// Raw body returned by `POST /predict/batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<PredictionResult>,
    pub batch_id: String,
    pub total_predictions: u64,
    /// Seconds.
    pub processing_time: f64,
}

/// A checked batch response: one result per submitted scenario, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<PredictionResult>,
    pub batch_id: String,
    pub total_count: u64,
    pub processing_time_seconds: f64,
}

impl BatchOutcome {
    /// Validate a raw response against the number of scenarios submitted.
    pub fn from_response(
        response: BatchPredictionResponse,
        submitted: usize,
    ) -> Result<Self, ServerDataError> {
        if response.predictions.len() != submitted {
            return Err(ServerDataError::Cardinality {
                expected: submitted,
                actual: response.predictions.len(),
            });
        }
        if response.total_predictions as usize != submitted {
            return Err(ServerDataError::Cardinality {
                expected: submitted,
                actual: response.total_predictions as usize,
            });
        }
        for result in &response.predictions {
            result.check()?;
        }
        Ok(Self {
            results: response.predictions,
            batch_id: response.batch_id,
            total_count: response.total_predictions,
            processing_time_seconds: response.processing_time,
        })
    }

    /// Look up a result by its `prediction_id`.
    pub fn find(&self, prediction_id: &str) -> Option<&PredictionResult> {
        self.results.iter().find(|r| r.prediction_id == prediction_id)
    }
}

/// Body of `GET /model/performance`.
///
/// Per-class maps are keyed by whatever class labels the model reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: BTreeMap<String, f64>,
    pub recall: BTreeMap<String, f64>,
    pub f1_score: BTreeMap<String, f64>,
    pub confusion_matrix: Vec<Vec<u64>>,
    pub feature_importance: BTreeMap<String, f64>,
    pub model_version: String,
    pub last_updated: String,
}

impl ModelMetrics {
    /// The `n` most important features, highest first.
    pub fn top_features(&self, n: usize) -> Vec<(&str, f64)> {
        let mut features: Vec<_> = self
            .feature_importance
            .iter()
            .map(|(k, &v)| (k.as_str(), v))
            .collect();
        features.sort_by(|a, b| b.1.total_cmp(&a.1));
        features.truncate(n);
        features
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.last_updated)
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub ml_service: String,
    pub version: String,
    pub timestamp: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of `POST /model/retrain`. Retraining runs in the background server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrainAck {
    pub message: String,
    pub status: String,
}

/// Body of `POST /data/explore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationRequest {
    pub feature: String,
    pub chart_type: ChartType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Map<String, Value>>,
}

/// Response of `POST /data/explore`. Chart data and statistics have no
/// fixed schema and are passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationResponse {
    pub chart_data: Map<String, Value>,
    pub statistics: Map<String, Value>,
    pub insights: Vec<String>,
}

/// One push notification on the streaming channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Server clock reading; not necessarily wall-clock time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl StreamMessage {
    /// Decode `data` as a prediction result for `prediction` messages.
    ///
    /// Returns `None` for other message kinds or when `data` is absent.
    pub fn prediction(&self) -> Option<Result<PredictionResult, ServerDataError>> {
        if self.kind != StreamEventKind::Prediction {
            return None;
        }
        let data = self.data.clone()?;
        Some(
            serde_json::from_value::<PredictionResult>(data)
                .map_err(|e| ServerDataError::Malformed(e.to_string()))
                .and_then(|result| result.check().map(|()| result)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::tests::sample_result;

    fn batch_response(n: usize) -> BatchPredictionResponse {
        let predictions = (0..n)
            .map(|i| {
                let mut r = sample_result();
                r.prediction_id = format!("p-{i}");
                r
            })
            .collect();
        BatchPredictionResponse {
            predictions,
            batch_id: "batch-1".into(),
            total_predictions: n as u64,
            processing_time: 0.42,
        }
    }

    #[test]
    fn batch_request_shape() {
        let body = BatchPredictionRequest {
            predictions: vec![AccidentScenario::baseline()],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["predictions"][0]["road_type"], "Street");
    }

    #[test]
    fn batch_outcome_preserves_cardinality() {
        let outcome = BatchOutcome::from_response(batch_response(3), 3).unwrap();
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.total_count, 3);
        assert_eq!(outcome.batch_id, "batch-1");
        assert_eq!(outcome.find("p-2").unwrap().prediction_id, "p-2");
        assert!(outcome.find("p-9").is_none());
    }

    #[test]
    fn batch_outcome_rejects_missing_results() {
        assert_eq!(
            BatchOutcome::from_response(batch_response(2), 3),
            Err(ServerDataError::Cardinality {
                expected: 3,
                actual: 2
            })
        );

        let mut lying = batch_response(2);
        lying.total_predictions = 5;
        assert!(BatchOutcome::from_response(lying, 2).is_err());
    }

    #[test]
    fn batch_outcome_checks_each_result() {
        let mut response = batch_response(2);
        response.predictions[1].confidence_score = -0.5;
        assert!(matches!(
            BatchOutcome::from_response(response, 2),
            Err(ServerDataError::ConfidenceOutOfRange(_))
        ));
    }

    #[test]
    fn metrics_top_features() {
        let json = r#"{
            "accuracy": 0.87,
            "precision": {"Minor": 0.9, "Moderate": 0.8, "Severe": 0.85},
            "recall": {"Minor": 0.88, "Moderate": 0.79, "Severe": 0.9},
            "f1_score": {"Minor": 0.89, "Moderate": 0.795, "Severe": 0.874},
            "confusion_matrix": [[50, 3, 1], [4, 40, 6], [0, 5, 45]],
            "feature_importance": {"speed_limit": 0.21, "weather": 0.08, "driver_alcohol_level": 0.3},
            "model_version": "1.0.0",
            "last_updated": "2025-03-01T00:00:00"
        }"#;
        let metrics: ModelMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(
            metrics.top_features(2),
            vec![("driver_alcohol_level", 0.3), ("speed_limit", 0.21)]
        );
        assert_eq!(metrics.confusion_matrix[1][2], 6);
        assert!(metrics.last_updated_at().is_some());
    }

    #[test]
    fn health_status() {
        let health: HealthStatus = serde_json::from_str(
            r#"{"status":"healthy","ml_service":"healthy","version":"2.0.0","timestamp":"2025-03-01T00:00:00"}"#,
        )
        .unwrap();
        assert!(health.is_healthy());
    }

    #[test]
    fn exploration_request_omits_absent_filters() {
        let req = ExplorationRequest {
            feature: "speed_limit".into(),
            chart_type: ChartType::Histogram,
            filters: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["chart_type"], "histogram");
        assert!(value.get("filters").is_none());
    }

    #[test]
    fn stream_envelope_variants() {
        let err: StreamMessage =
            serde_json::from_str(r#"{"type":"error","message":"model not loaded"}"#).unwrap();
        assert_eq!(err.kind, StreamEventKind::Error);
        assert_eq!(err.message.as_deref(), Some("model not loaded"));
        assert!(err.prediction().is_none());

        let status: StreamMessage = serde_json::from_str(
            r#"{"type":"system_status","data":{"load":0.3},"timestamp":1234.5}"#,
        )
        .unwrap();
        assert_eq!(status.kind, StreamEventKind::SystemStatus);
        assert_eq!(status.timestamp, Some(1234.5));

        assert!(serde_json::from_str::<StreamMessage>(r#"{"type":"heartbeat"}"#).is_err());
    }

    #[test]
    fn stream_prediction_payload() {
        let msg = StreamMessage {
            kind: StreamEventKind::Prediction,
            data: Some(serde_json::to_value(sample_result()).unwrap()),
            message: None,
            timestamp: None,
        };
        let result = msg.prediction().unwrap().unwrap();
        assert_eq!(result, sample_result());

        let broken = StreamMessage {
            data: Some(serde_json::json!({"predicted_severity": "Minor"})),
            ..msg
        };
        assert!(matches!(
            broken.prediction(),
            Some(Err(ServerDataError::Malformed(_)))
        ));
    }
}
