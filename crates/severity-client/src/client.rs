//! HTTP client for the prediction service's `/api/v1` surface.

use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use severity_core::{
    AccidentScenario, BatchOutcome, BatchPredictionRequest, BatchPredictionResponse,
    ExplorationRequest, ExplorationResponse, HealthStatus, ModelMetrics, PredictionResult,
    RetrainAck, ServerDataError, validate_batch,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ConfigError, TransportError};
use crate::session::Session;

pub const DEFAULT_TREND_PERIOD: &str = "monthly";

/// Typed client for the prediction service.
///
/// Every call attaches the session's bearer token when one is stored. A 401
/// clears the token and emits `CredentialCleared` + `AuthExpired` on the
/// session, once per failing call, without retrying.
///
/// Calls are independent futures with no ordering between them; correlate
/// results by `prediction_id`. Dropping a pending future abandons the call
/// and nothing further is done with its response.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Session,
}

impl PredictionClient {
    pub fn new(config: ClientConfig, session: Session) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("severity-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Predict the severity of one scenario.
    ///
    /// The scenario is validated first; an invalid one never reaches the network.
    pub async fn predict(&self, scenario: &AccidentScenario) -> Result<PredictionResult, ClientError> {
        scenario.validate()?;

        let result: PredictionResult = self
            .send(self.http.post(self.config.endpoint("/predict")).json(scenario))
            .await?;
        result.check()?;

        info!(
            prediction_id = %result.prediction_id,
            severity = %result.predicted_severity,
            confidence = result.confidence_score,
            "prediction received"
        );
        Ok(result)
    }

    /// Predict a batch. The outcome holds exactly one result per scenario.
    pub async fn predict_batch(
        &self,
        scenarios: &[AccidentScenario],
    ) -> Result<BatchOutcome, ClientError> {
        validate_batch(scenarios)?;

        let body = BatchPredictionRequest {
            predictions: scenarios.to_vec(),
        };
        let response: BatchPredictionResponse = self
            .send(self.http.post(self.config.endpoint("/predict/batch")).json(&body))
            .await?;
        let outcome = BatchOutcome::from_response(response, scenarios.len())?;

        info!(
            batch_id = %outcome.batch_id,
            count = outcome.total_count,
            processing_time = outcome.processing_time_seconds,
            "batch prediction received"
        );
        Ok(outcome)
    }

    pub async fn model_performance(&self) -> Result<ModelMetrics, ClientError> {
        self.get("/model/performance").await
    }

    /// Ask the service to retrain. Returns once the job is queued.
    pub async fn retrain_model(&self) -> Result<RetrainAck, ClientError> {
        let ack: RetrainAck = self
            .send(self.http.post(self.config.endpoint("/model/retrain")))
            .await?;
        info!(status = %ack.status, "retraining requested");
        Ok(ack)
    }

    pub async fn explore_data(
        &self,
        request: &ExplorationRequest,
    ) -> Result<ExplorationResponse, ClientError> {
        self.post("/data/explore", request).await
    }

    pub async fn data_summary(&self) -> Result<Value, ClientError> {
        self.get("/data/summary").await
    }

    /// Trend analytics grouped by `period` (the service defaults to `"monthly"`).
    pub async fn accident_trends(&self, period: &str) -> Result<Value, ClientError> {
        self.send(
            self.http
                .get(self.config.endpoint("/analytics/trends"))
                .query(&[("period", period)]),
        )
        .await
    }

    pub async fn risk_factor_analysis(&self) -> Result<Value, ClientError> {
        self.get("/analytics/risk-factors").await
    }

    pub async fn geographical_analysis(&self) -> Result<Value, ClientError> {
        self.get("/analytics/geographical").await
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get("/health").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http.get(self.config.endpoint(path))).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.http.post(self.config.endpoint(path)).json(body))
            .await
    }

    /// Attach auth, send, and classify the response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match self.session.fetch_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let request = request.build().map_err(TransportError::from)?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(%method, url = %url, "sending request");
        let resp = self.http.execute(request).await.map_err(|e| {
            warn!(%method, url = %url, error = %e, "request failed");
            TransportError::from(e)
        })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.revoke(&self.config.login_path).await;
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            warn!(%method, url = %url, status = status.as_u16(), detail = %message, "service error");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body = resp.text().await.map_err(TransportError::from)?;
        serde_json::from_str(&body).map_err(|e| ServerDataError::Malformed(e.to_string()).into())
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists
/// `{"detail": [{"msg": "..."}]}`, and `{"message": "..."}`; anything else
/// falls back to the status' reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_body = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| match value.get("detail") {
            Some(Value::String(detail)) => Some(detail.clone()),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                (!msgs.is_empty()).then(|| msgs.join("; "))
            }
            _ => value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    from_body.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    })
}
