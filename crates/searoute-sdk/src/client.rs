//! HTTP client for the searoute server.

use searoute_core::models::{DistanceUnits, GenerateRouteRequest, LatLng, Port, RouteResponse};
use searoute_core::segment::{
    SaveSegmentResponse, SegmentCandidate, SegmentHistoryResponse, SegmentRecord, SegmentSaveRequest,
    IDEMPOTENCY_KEY_HEADER,
};
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// A validated save, kept by the caller until it commits.
///
/// A failed attempt leaves it intact so [`SeaRouteClient::retry_save`] can
/// resubmit exactly what was validated. Every attempt carries the same
/// request id, so a save that committed before its response was lost is
/// not stored twice.
#[derive(Debug, Clone)]
pub struct PendingSave {
    candidate: SegmentCandidate,
    request_id: String,
    attempts: u32,
    saved: Option<SaveSegmentResponse>,
}

impl PendingSave {
    pub fn candidate(&self) -> &SegmentCandidate {
        &self.candidate
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn saved(&self) -> Option<&SaveSegmentResponse> {
        self.saved.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.saved.is_some()
    }
}

/// Client for the searoute server.
#[derive(Debug, Clone)]
pub struct SeaRouteClient {
    base_url: String,
    client: reqwest::Client,
}

impl SeaRouteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate a route between two ports. Coordinates come back as
    /// `[lon, lat]`; use [`RouteResponse::lat_lng_coordinates`] for display.
    pub async fn generate_route(
        &self,
        origin: &Port,
        destination: &Port,
        units: DistanceUnits,
    ) -> Result<RouteResponse, ClientError> {
        let request = GenerateRouteRequest {
            origin: LatLng::from(origin.position().map_err(|e| e.with_field("origin"))?),
            destination: LatLng::from(destination.position().map_err(|e| e.with_field("destination"))?),
            units,
            origin_port_id: Some(origin.id.clone()),
            destination_port_id: Some(destination.id.clone()),
        };
        request.endpoints()?;

        let url = format!("{}/v1/routes/generate", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Route generation {} -> {} failed: {}", origin.id, destination.id, status);
            return Err(ClientError::NoRouteFound { status });
        }
        Ok(response.json().await?)
    }

    /// Validate a save request locally. Nothing is sent.
    pub fn prepare_save(&self, request: SegmentSaveRequest) -> Result<PendingSave, ClientError> {
        let candidate = request.validate()?;
        Ok(PendingSave {
            candidate,
            request_id: uuid::Uuid::new_v4().to_string(),
            attempts: 0,
            saved: None,
        })
    }

    /// Submit a pending save. A save that already committed is not resent.
    pub async fn save_segment(&self, pending: &mut PendingSave) -> Result<SaveSegmentResponse, ClientError> {
        if let Some(saved) = &pending.saved {
            return Ok(saved.clone());
        }

        pending.attempts += 1;
        let url = format!("{}/v1/segments", self.base_url);
        let body = SegmentSaveRequest::from(&pending.candidate);
        let response = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_KEY_HEADER, &pending.request_id)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            tracing::warn!(
                "Save of {} failed on attempt {}: {} {}",
                pending.candidate.segment_id,
                pending.attempts,
                status,
                message
            );
            return Err(ClientError::SaveFailed { status, message });
        }

        let saved: SaveSegmentResponse = response.json().await?;
        tracing::info!("Saved {} as version {}", saved.segment_id, saved.version);
        pending.saved = Some(saved.clone());
        Ok(saved)
    }

    /// Resubmit a pending save after a failure, reusing its validated data.
    pub async fn retry_save(&self, pending: &mut PendingSave) -> Result<SaveSegmentResponse, ClientError> {
        if !pending.is_saved() {
            tracing::info!(
                "Retrying save of {} (previous attempts: {})",
                pending.candidate.segment_id,
                pending.attempts
            );
        }
        self.save_segment(pending).await
    }

    /// Current version of a segment.
    pub async fn segment(&self, segment_id: &str) -> Result<SegmentRecord, ClientError> {
        let url = format!("{}/v1/segments/{}", self.base_url, segment_id);
        self.get_json(&url, segment_id).await
    }

    /// All versions of a segment, oldest first.
    pub async fn history(&self, segment_id: &str) -> Result<Vec<SegmentRecord>, ClientError> {
        let url = format!("{}/v1/segments/{}/history", self.base_url, segment_id);
        let history: SegmentHistoryResponse = self.get_json(&url, segment_id).await?;
        Ok(history.versions)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, segment_id: &str) -> Result<T, ClientError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                segment_id: segment_id.to_string(),
            });
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ClientError::Unexpected { status, message });
        }
        Ok(response.json().await?)
    }
}

/// The server's `error` field, or the raw body if it is not JSON.
async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text)
}
