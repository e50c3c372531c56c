//! Typed calls through the request pipeline.
//!
//! Callers get the deserialized payload only; the transport envelope never
//! leaves this module. Collaborator endpoints (indicators, majors, uploads)
//! are plain `get`/`post`/`patch`/`delete` calls on top of this.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::pipeline::Pipeline;
use super::transport::ApiRequest;
use super::ApiError;
use crate::config::GatewayConfig;
use crate::models::{LoginRequest, PermissionSet, TokenResponse, UserProfile};

#[derive(Debug, Clone)]
struct Endpoints {
    login: String,
    profile: String,
    permissions: String,
}

/// Clone is cheap - the pipeline is shared.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<Pipeline>,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(pipeline: Pipeline, config: &GatewayConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            endpoints: Endpoints {
                login: config.login_path.clone(),
                profile: config.profile_path.clone(),
                permissions: config.permissions_path.clone(),
            },
        }
    }

    /// Run `request` through the pipeline and decode the payload.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.pipeline.execute(request).await?;
        Self::decode_payload(&path, &response.body)
    }

    fn decode_payload<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
        let parsed = if body.trim().is_empty() {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_str(body)
        };
        parsed.map_err(|e| {
            debug!(path = path, error = %e, "Payload did not match expected shape");
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path, body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::patch(path, body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    // ===== Session Endpoints =====

    /// Exchange username and password for a credential.
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ApiError> {
        self.post(&self.endpoints.login, request).await
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.get(&self.endpoints.profile).await
    }

    pub async fn fetch_permissions(&self) -> Result<PermissionSet, ApiError> {
        self.get(&self.endpoints.permissions).await
    }
}
