//! Prediction results returned by the service, and their invariants.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::Severity;

/// Allowed drift of the probability sum away from 1.0.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;

/// One prediction, as returned by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_severity: Severity,
    /// Model certainty in `predicted_severity`, in `[0, 1]`.
    pub confidence_score: f64,
    pub probabilities: BTreeMap<Severity, f64>,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub prediction_id: String,
    /// ISO 8601 timestamp string, assigned by the server.
    pub timestamp: String,
    pub model_version: String,
}

/// A response body that parsed but does not describe a usable result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServerDataError {
    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("confidence score {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("probability for {severity} is {value}, outside [0, 1]")]
    ProbabilityOutOfRange { severity: Severity, value: f64 },

    #[error("probabilities sum to {0}, expected 1.0")]
    ProbabilitySum(f64),

    #[error("predicted severity {0} has no probability entry")]
    MissingPredictedSeverity(Severity),

    #[error("expected {expected} results, got {actual}")]
    Cardinality { expected: usize, actual: usize },
}

impl PredictionResult {
    /// Verify the invariants the service promises for every result.
    pub fn check(&self) -> Result<(), ServerDataError> {
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(ServerDataError::ConfidenceOutOfRange(self.confidence_score));
        }
        for (&severity, &value) in &self.probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ServerDataError::ProbabilityOutOfRange { severity, value });
            }
        }
        if !self.probabilities.contains_key(&self.predicted_severity) {
            return Err(ServerDataError::MissingPredictedSeverity(
                self.predicted_severity,
            ));
        }
        let sum: f64 = self.probabilities.values().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(ServerDataError::ProbabilitySum(sum));
        }
        Ok(())
    }

    /// Probability of `severity`, if the service reported one.
    pub fn probability(&self, severity: Severity) -> Option<f64> {
        self.probabilities.get(&severity).copied()
    }

    /// The distribution ordered from most to least likely.
    pub fn ranked_probabilities(&self) -> Vec<(Severity, f64)> {
        let mut ranked: Vec<_> = self.probabilities.iter().map(|(&s, &p)| (s, p)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Parse `timestamp`.
    ///
    /// Accepts RFC 3339 with an offset, or a naive ISO 8601 datetime (what
    /// the service emits today), which is read as UTC.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_result() -> PredictionResult {
        PredictionResult {
            predicted_severity: Severity::Moderate,
            confidence_score: 0.62,
            probabilities: BTreeMap::from([
                (Severity::Minor, 0.25),
                (Severity::Moderate, 0.62),
                (Severity::Severe, 0.13),
            ]),
            risk_factors: vec!["High traffic volume".into()],
            recommendations: vec!["Maintain safe following distance".into()],
            prediction_id: "3f0b2c1e-9a51-4d7e-8a43-5b1b7f0c2d11".into(),
            timestamp: "2025-03-14T09:26:53.589793".into(),
            model_version: "1.0.0".into(),
        }
    }

    #[test]
    fn parses_service_payload() {
        let json = r#"{
            "predicted_severity": "Severe",
            "confidence_score": 0.847,
            "probabilities": {"Minor": 0.05, "Moderate": 0.103, "Severe": 0.847},
            "risk_factors": ["Icy road", "Night time"],
            "recommendations": [],
            "prediction_id": "abc-123",
            "timestamp": "2025-03-14T09:26:53.589793",
            "model_version": "1.0.0"
        }"#;
        let result: PredictionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.predicted_severity, Severity::Severe);
        assert_eq!(result.probability(Severity::Severe), Some(0.847));
        assert!(result.recommendations.is_empty());
        assert!(result.check().is_ok());
    }

    #[test]
    fn unknown_probability_key_is_rejected() {
        let json = r#"{
            "predicted_severity": "Minor",
            "confidence_score": 0.9,
            "probabilities": {"Minor": 0.9, "Critical": 0.1},
            "risk_factors": [], "recommendations": [],
            "prediction_id": "x", "timestamp": "t", "model_version": "1"
        }"#;
        assert!(serde_json::from_str::<PredictionResult>(json).is_err());
    }

    #[test]
    fn check_accepts_small_rounding_drift() {
        let mut result = sample_result();
        result.probabilities.insert(Severity::Severe, 0.135);
        assert!(result.check().is_ok());
    }

    #[test]
    fn check_rejects_bad_sum() {
        let mut result = sample_result();
        result.probabilities.insert(Severity::Severe, 0.3);
        assert!(matches!(
            result.check(),
            Err(ServerDataError::ProbabilitySum(_))
        ));
    }

    #[test]
    fn check_requires_predicted_key() {
        let mut result = sample_result();
        result.probabilities.remove(&Severity::Moderate);
        result.probabilities.insert(Severity::Minor, 0.87);
        assert_eq!(
            result.check(),
            Err(ServerDataError::MissingPredictedSeverity(Severity::Moderate))
        );
    }

    #[test]
    fn check_rejects_confidence_out_of_range() {
        let mut result = sample_result();
        result.confidence_score = 1.2;
        assert_eq!(
            result.check(),
            Err(ServerDataError::ConfidenceOutOfRange(1.2))
        );
        result.confidence_score = f64::NAN;
        assert!(result.check().is_err());
    }

    #[test]
    fn ranked_probabilities_descend() {
        let ranked = sample_result().ranked_probabilities();
        let order: Vec<_> = ranked.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            order,
            vec![Severity::Moderate, Severity::Minor, Severity::Severe]
        );
    }

    #[test]
    fn timestamps_naive_and_offset() {
        let naive = sample_result().created_at().unwrap();
        assert_eq!(naive.to_rfc3339(), "2025-03-14T09:26:53.589793+00:00");

        let mut result = sample_result();
        result.timestamp = "2025-03-14T10:26:53+01:00".into();
        assert_eq!(
            result.created_at().unwrap().to_rfc3339(),
            "2025-03-14T09:26:53+00:00"
        );

        result.timestamp = "yesterday".into();
        assert!(result.created_at().is_none());
    }
}
