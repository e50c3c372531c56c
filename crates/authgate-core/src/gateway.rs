//! Wiring of store, pipeline and guard into one injectable container.
//!
//! ```rust,ignore
//! let gateway = Gateway::builder(GatewayConfig::load()?)
//!     .notifier(Arc::new(notifier))
//!     .build()?;
//! gateway.refresh_profile().await;
//! gateway.navigate("/dashboard");
//! ```

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::api::{
    ApiClient, BearerAuth, FailureClassifier, HttpTransport, Notifier, Pipeline, TracingNotifier,
    Transport,
};
use crate::auth::CredentialStorage;
use crate::config::GatewayConfig;
use crate::guard::{NavigationGuard, NavigationHistory, NavigationOutcome, Navigator, RouteTable};
use crate::models::LoginRequest;
use crate::session::{LoginError, SessionSnapshot, SessionStore};

pub struct Gateway {
    config: GatewayConfig,
    store: Arc<SessionStore>,
    api: ApiClient,
    guard: NavigationGuard,
    navigator: Arc<dyn Navigator>,
}

pub struct GatewayBuilder {
    config: GatewayConfig,
    storage: Option<Arc<dyn CredentialStorage>>,
    transport: Option<Arc<dyn Transport>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
    routes: Option<RouteTable>,
}

impl GatewayBuilder {
    /// Override the durable slot (default: per `config.storage`).
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn CredentialStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Override the wire (default: `reqwest` against `config.base_url`).
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    #[must_use]
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn build(self) -> Result<Gateway> {
        let config = self.config;
        config.validate()?;

        let storage = match self.storage {
            Some(storage) => storage,
            None => config.open_storage()?,
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.base_url, config.timeout())?),
        };
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(NavigationHistory::new(&config.public_entry_route)));
        let routes = self.routes.unwrap_or_else(RouteTable::with_default_routes);

        let store = Arc::new(SessionStore::hydrate(storage));
        let pipeline = Pipeline::new(transport)
            .with_request_interceptor(Arc::new(BearerAuth::new(store.clone())))
            .with_response_interceptor(Arc::new(FailureClassifier::new(
                store.clone(),
                notifier,
                navigator.clone(),
                config.login_path.clone(),
                config.public_entry_route.clone(),
            )));
        let api = ApiClient::new(pipeline, &config);
        let guard = NavigationGuard::new(
            store.clone(),
            routes,
            navigator.clone(),
            config.public_entry_route.clone(),
            config.default_authenticated_route.clone(),
        );
        debug!(base_url = %config.base_url, "Gateway ready");

        Ok(Gateway {
            config,
            store,
            api,
            guard,
            navigator,
        })
    }
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder {
            config,
            storage: None,
            transport: None,
            notifier: None,
            navigator: None,
            routes: None,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Client for collaborator endpoints; every call goes through the pipeline.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn location(&self) -> String {
        self.navigator.current()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<(), LoginError> {
        self.store.login(&self.api, request).await
    }

    pub async fn refresh_profile(&self) {
        self.store.refresh_profile(&self.api).await
    }

    pub fn logout(&self) {
        self.store.logout()
    }

    pub fn navigate(&self, path: &str) -> NavigationOutcome {
        self.guard.navigate(path)
    }
}
