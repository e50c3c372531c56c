//! Interceptor chain wrapped around every outbound call.
//!
//! Request interceptors run in registration order before the transport.
//! After the round-trip, a success status runs each response interceptor's
//! `on_response` in order; any failure (a rejected request, a non-2xx status
//! or no response at all) runs each `on_error` in order and the resulting error is returned to the
//! caller, so per-call handling stays possible after the side effects.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::{debug, warn};

use super::notice::{Notice, Notifier};
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;
use crate::guard::Navigator;
use crate::session::SessionStore;

pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, request: ApiRequest) -> Result<ApiRequest, ApiError>;
}

pub trait ResponseInterceptor: Send + Sync {
    fn on_response(
        &self,
        _request: &ApiRequest,
        response: ApiResponse,
    ) -> Result<ApiResponse, ApiError> {
        Ok(response)
    }

    fn on_error(&self, _request: &ApiRequest, error: ApiError) -> ApiError {
        error
    }
}

pub struct Pipeline {
    transport: Arc<dyn Transport>,
    request_chain: Vec<Arc<dyn RequestInterceptor>>,
    response_chain: Vec<Arc<dyn ResponseInterceptor>>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            request_chain: Vec::new(),
            response_chain: Vec::new(),
        }
    }

    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_chain.push(interceptor);
        self
    }

    pub fn with_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_chain.push(interceptor);
        self
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let (request, outcome) = match self.run_request_chain(request.clone()) {
            Ok(prepared) => {
                let outcome = self.dispatch(&prepared).await;
                (prepared, outcome)
            }
            Err(e) => (request, Err(e)),
        };

        let mut error = match outcome {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        for interceptor in &self.response_chain {
            error = interceptor.on_error(&request, error);
        }
        Err(error)
    }

    fn run_request_chain(&self, mut request: ApiRequest) -> Result<ApiRequest, ApiError> {
        for interceptor in &self.request_chain {
            request = interceptor.on_request(request)?;
        }
        Ok(request)
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        match self.transport.send(request).await {
            Ok(response) if response.status.is_success() => {
                self.run_response_chain(request, response)
            }
            Ok(response) => Err(ApiError::from_status(response.status, &response.body)),
            Err(e) => Err(e),
        }
    }

    fn run_response_chain(
        &self,
        request: &ApiRequest,
        mut response: ApiResponse,
    ) -> Result<ApiResponse, ApiError> {
        for interceptor in &self.response_chain {
            response = interceptor.on_response(request, response)?;
        }
        Ok(response)
    }
}

/// Attaches the held credential as `Authorization: Bearer <token>`.
///
/// Expiry is not checked here: an expired-but-present credential is still
/// sent and the remote API decides.
pub struct BearerAuth {
    store: Arc<SessionStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }
}

impl RequestInterceptor for BearerAuth {
    fn on_request(&self, mut request: ApiRequest) -> Result<ApiRequest, ApiError> {
        if let Some(token) = self.store.credential() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("credential is not a valid header value".into()))?;
            request.headers.insert(AUTHORIZATION, value);
        }
        Ok(request)
    }
}

/// Side effects of a failed call.
///
/// - 401 on the login endpoint: nothing, the caller composes the message.
/// - 401 elsewhere: a session-expired notice, logout, redirect to the public
///   entry route.
/// - anything else: a notice with the best available message.
pub struct FailureClassifier {
    store: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    public_entry_route: String,
}

impl FailureClassifier {
    pub fn new(
        store: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
        public_entry_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            navigator,
            login_path: login_path.into(),
            public_entry_route: public_entry_route.into(),
        }
    }
}

impl ResponseInterceptor for FailureClassifier {
    fn on_error(&self, request: &ApiRequest, error: ApiError) -> ApiError {
        if error.is_unauthorized() {
            if request.path.contains(self.login_path.as_str()) {
                debug!("Login rejected, leaving message to caller");
            } else {
                warn!(path = %request.path, "Unauthorized response, clearing session");
                self.notifier.notify(Notice::session_expired());
                self.store.logout();
                self.navigator.redirect(&self.public_entry_route);
            }
        } else {
            warn!(path = %request.path, error = %error, "Request failed");
            self.notifier.notify(Notice::new(error.user_message()));
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::notice::SESSION_EXPIRED_MESSAGE;
    use crate::auth::MemoryStorage;
    use crate::guard::NavigationHistory;
    use crate::test_support::{RecordingNotifier, ScriptedTransport};
    use reqwest::StatusCode;

    struct Fixture {
        store: Arc<SessionStore>,
        transport: Arc<ScriptedTransport>,
        notifier: Arc<RecordingNotifier>,
        history: Arc<NavigationHistory>,
        pipeline: Pipeline,
    }

    fn fixture(token: Option<&str>) -> Fixture {
        let storage = match token {
            Some(t) => MemoryStorage::with_token(t),
            None => MemoryStorage::new(),
        };
        let store = Arc::new(SessionStore::hydrate(Arc::new(storage)));
        let transport = Arc::new(ScriptedTransport::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let history = Arc::new(NavigationHistory::new("/dashboard"));
        let pipeline = Pipeline::new(transport.clone())
            .with_request_interceptor(Arc::new(BearerAuth::new(store.clone())))
            .with_response_interceptor(Arc::new(FailureClassifier::new(
                store.clone(),
                notifier.clone(),
                history.clone(),
                "/users/login",
                "/login",
            )));
        Fixture {
            store,
            transport,
            notifier,
            history,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_attaches_bearer_header() {
        let fx = fixture(Some("a.b.c"));
        fx.transport.respond(StatusCode::OK, "[]");

        fx.pipeline
            .execute(ApiRequest::get("/majors/"))
            .await
            .expect("request succeeds");

        let sent = fx.transport.requests();
        assert_eq!(
            sent[0].headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer a.b.c")
        );
    }

    #[tokio::test]
    async fn test_no_header_without_credential() {
        let fx = fixture(None);
        fx.transport.respond(StatusCode::OK, "{}");

        fx.pipeline
            .execute(ApiRequest::get("/majors/"))
            .await
            .expect("request succeeds");

        assert!(fx.transport.requests()[0].headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_redirects() {
        let fx = fixture(Some("a.b.c"));
        fx.transport
            .respond(StatusCode::UNAUTHORIZED, r#"{"detail":"Could not validate credentials"}"#);

        let err = fx
            .pipeline
            .execute(ApiRequest::get("/indicators/"))
            .await
            .expect_err("401 is an error");

        assert!(err.is_unauthorized());
        assert_eq!(fx.store.credential(), None);
        assert_eq!(fx.notifier.messages(), vec![SESSION_EXPIRED_MESSAGE]);
        assert_eq!(fx.history.current(), "/login");
    }

    #[tokio::test]
    async fn test_unauthorized_login_is_silent() {
        let fx = fixture(Some("a.b.c"));
        fx.transport.respond(StatusCode::UNAUTHORIZED, r#"{"detail":"Incorrect password"}"#);

        let request = ApiRequest::post("/users/login", &serde_json::json!({"username": "a"}))
            .expect("body encodes");
        let err = fx.pipeline.execute(request).await.expect_err("401 is an error");

        assert!(err.is_unauthorized());
        assert!(fx.notifier.messages().is_empty());
        assert_eq!(fx.store.credential().as_deref(), Some("a.b.c"));
        assert_eq!(fx.history.current(), "/dashboard");
    }

    #[tokio::test]
    async fn test_other_failures_surface_notice() {
        let fx = fixture(Some("a.b.c"));
        fx.transport
            .respond(StatusCode::BAD_REQUEST, r#"{"detail":"Major code already exists"}"#);
        fx.transport.respond(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        fx.transport.fail(ApiError::Timeout);

        for _ in 0..3 {
            assert!(fx.pipeline.execute(ApiRequest::get("/majors/")).await.is_err());
        }

        assert_eq!(
            fx.notifier.messages(),
            vec![
                "Major code already exists".to_string(),
                "Request failed with status code 500".to_string(),
                "Request timed out. Please try again.".to_string(),
            ]
        );
        assert_eq!(fx.store.credential().as_deref(), Some("a.b.c"));
    }

    #[tokio::test]
    async fn test_rejected_request_is_classified() {
        let fx = fixture(Some("h.p.s\n"));

        let err = fx
            .pipeline
            .execute(ApiRequest::get("/majors/"))
            .await
            .expect_err("header value is invalid");

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(
            fx.notifier.messages(),
            vec!["Invalid request: credential is not a valid header value".to_string()]
        );
        assert!(fx.transport.requests().is_empty());
    }

    struct Tagger(&'static str);

    impl RequestInterceptor for Tagger {
        fn on_request(&self, mut request: ApiRequest) -> Result<ApiRequest, ApiError> {
            request.path.push_str(self.0);
            Ok(request)
        }
    }

    #[tokio::test]
    async fn test_request_chain_runs_in_order() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(StatusCode::OK, "null");
        let pipeline = Pipeline::new(transport.clone())
            .with_request_interceptor(Arc::new(Tagger("-a")))
            .with_request_interceptor(Arc::new(Tagger("-b")));

        pipeline
            .execute(ApiRequest::get("/x"))
            .await
            .expect("request succeeds");

        assert_eq!(transport.requests()[0].path, "/x-a-b");
    }
}
