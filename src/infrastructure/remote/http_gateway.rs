use crate::application::ports::remote_gateway::{RemoteError, RemoteGateway, RemoteWriteRequest};
use crate::domain::value_objects::ActionKind;
use async_trait::async_trait;
use std::time::Duration;

/// HTTP adapter for the remote write endpoints. One POST route per action
/// kind; the `Idempotency-Key` header carries the action id so the server
/// can no-op a repeat delivery.
pub struct HttpRemoteGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteGateway {
    pub fn new(base_url: String, request_timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| RemoteError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn route(kind: &ActionKind) -> String {
        match kind {
            ActionKind::Booking => "/api/sync/bookings".to_string(),
            ActionKind::Payment => "/api/sync/payments".to_string(),
            ActionKind::RoomStatus => "/api/sync/room-status".to_string(),
            ActionKind::FolioCharge => "/api/sync/folio-charges".to_string(),
            ActionKind::FolioVoid => "/api/sync/folio-voids".to_string(),
            ActionKind::Unknown(other) => format!("/api/sync/{other}"),
        }
    }

    fn classify_status(status: u16, message: String) -> RemoteError {
        match status {
            401 | 403 => RemoteError::Unauthorized(message),
            408 | 429 => RemoteError::Unavailable(message),
            500..=599 => RemoteError::Unavailable(message),
            _ => RemoteError::Rejected { status, message },
        }
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn execute(
        &self,
        request: RemoteWriteRequest,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = format!("{}{}", self.base_url, Self::route(&request.kind));

        tracing::debug!(
            target: "remote::gateway",
            action = %request.action_id,
            kind = %request.kind,
            url,
            "dispatching remote write"
        );

        let response = self
            .client
            .post(&url)
            .header("Idempotency-Key", request.action_id.as_str())
            .header("X-Tenant-Id", request.tenant_id.as_str())
            .json(request.payload.as_json())
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RemoteError::Timeout
                } else {
                    RemoteError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status.as_u16(), message));
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(serde_json::Value::Null);
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|err| RemoteError::Network(format!("invalid response body: {err}")))
    }
}
