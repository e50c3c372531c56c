//! Pre-transition check for in-app views.
//!
//! | requirement  | credential usable | outcome                        |
//! |--------------|-------------------|--------------------------------|
//! | RequiresAuth | yes               | allow                          |
//! | RequiresAuth | no                | redirect to public entry       |
//! | GuestOnly    | yes               | redirect to default auth view  |
//! | GuestOnly    | no                | allow                          |
//! | Open         | either            | allow                          |
//!
//! A held credential that is no longer usable counts as absent and is
//! removed from durable storage. The in-memory profile and permissions are
//! left alone.

use std::sync::Arc;

use tracing::{debug, warn};

use super::navigator::Navigator;
use super::routes::{RouteRequirement, RouteTable};
use crate::auth::expiry;
use crate::session::SessionStore;

/// Redirects followed before a transition is abandoned.
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Allow,
    Redirect(String),
    /// The redirect chain did not settle; the UI stays where it is.
    Reject,
}

/// Pure transition table.
pub fn decide(
    requirement: RouteRequirement,
    usable: bool,
    public_entry_route: &str,
    default_authenticated_route: &str,
) -> NavigationOutcome {
    match (requirement, usable) {
        (RouteRequirement::RequiresAuth, false) => {
            NavigationOutcome::Redirect(public_entry_route.to_string())
        }
        (RouteRequirement::GuestOnly, true) => {
            NavigationOutcome::Redirect(default_authenticated_route.to_string())
        }
        _ => NavigationOutcome::Allow,
    }
}

pub struct NavigationGuard {
    store: Arc<SessionStore>,
    routes: RouteTable,
    navigator: Arc<dyn Navigator>,
    public_entry_route: String,
    default_authenticated_route: String,
}

impl NavigationGuard {
    pub fn new(
        store: Arc<SessionStore>,
        routes: RouteTable,
        navigator: Arc<dyn Navigator>,
        public_entry_route: impl Into<String>,
        default_authenticated_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            routes,
            navigator,
            public_entry_route: public_entry_route.into(),
            default_authenticated_route: default_authenticated_route.into(),
        }
    }

    /// Evaluate one transition against the current session.
    pub fn evaluate(&self, requirement: RouteRequirement) -> NavigationOutcome {
        let credential = self.store.credential();
        let usable = expiry::is_usable(credential.as_deref());
        if credential.is_some() && !usable {
            debug!("Held credential is expired");
            self.store.discard_expired_credential();
        }
        decide(
            requirement,
            usable,
            &self.public_entry_route,
            &self.default_authenticated_route,
        )
    }

    /// Attempt to move to `path`, following guard redirects, and commit the
    /// final location to the navigator.
    ///
    /// Returns `Allow` when `path` itself was entered, `Redirect(to)` when the
    /// UI ended up at `to` instead, and `Reject` when redirects did not settle.
    pub fn navigate(&self, path: &str) -> NavigationOutcome {
        let requested = self.routes.resolve(path);
        let mut target = requested.clone();

        for _ in 0..=MAX_REDIRECTS {
            match self.evaluate(self.routes.requirement(&target)) {
                NavigationOutcome::Allow if target == requested => {
                    // Commit what the caller asked for, query and fragment included.
                    self.navigator
                        .redirect(&format!("{}{}", target, query_and_fragment(path)));
                    return NavigationOutcome::Allow;
                }
                NavigationOutcome::Allow => {
                    self.navigator.redirect(&target);
                    return NavigationOutcome::Redirect(target);
                }
                NavigationOutcome::Redirect(next) => {
                    debug!(from = %target, to = %next, "Guard redirect");
                    target = self.routes.resolve(&next);
                }
                NavigationOutcome::Reject => break,
            }
        }

        warn!(path = %requested, "Navigation did not settle, staying put");
        NavigationOutcome::Reject
    }
}

fn query_and_fragment(path: &str) -> &str {
    path.find(['?', '#']).map_or("", |i| &path[i..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::encode_for_test;
    use crate::auth::{CredentialStorage, MemoryStorage};
    use crate::guard::NavigationHistory;
    use chrono::Utc;
    use serde_json::json;

    struct Fixture {
        storage: Arc<MemoryStorage>,
        store: Arc<SessionStore>,
        history: Arc<NavigationHistory>,
        guard: NavigationGuard,
    }

    fn fixture(token: Option<String>, routes: RouteTable) -> Fixture {
        let storage = Arc::new(match token {
            Some(t) => MemoryStorage::with_token(t),
            None => MemoryStorage::new(),
        });
        let store = Arc::new(SessionStore::hydrate(storage.clone()));
        let history = Arc::new(NavigationHistory::new("/"));
        let guard = NavigationGuard::new(
            store.clone(),
            routes,
            history.clone(),
            "/login",
            "/dashboard",
        );
        Fixture {
            storage,
            store,
            history,
            guard,
        }
    }

    fn token_expiring_in(secs: i64) -> String {
        encode_for_test(&json!({"sub": "1", "exp": Utc::now().timestamp() + secs}))
    }

    #[test]
    fn test_transition_table() {
        use NavigationOutcome::*;
        use RouteRequirement::*;
        let r = |to: &str| Redirect(to.to_string());

        assert_eq!(decide(RequiresAuth, true, "/login", "/dashboard"), Allow);
        assert_eq!(decide(RequiresAuth, false, "/login", "/dashboard"), r("/login"));
        assert_eq!(decide(GuestOnly, true, "/login", "/dashboard"), r("/dashboard"));
        assert_eq!(decide(GuestOnly, false, "/login", "/dashboard"), Allow);
        assert_eq!(decide(Open, true, "/login", "/dashboard"), Allow);
        assert_eq!(decide(Open, false, "/login", "/dashboard"), Allow);
    }

    #[test]
    fn test_protected_route_without_credential_redirects() {
        let fx = fixture(None, RouteTable::with_default_routes());
        assert_eq!(
            fx.guard.navigate("/majors"),
            NavigationOutcome::Redirect("/login".to_string())
        );
        assert_eq!(fx.history.current(), "/login");
    }

    #[test]
    fn test_protected_route_with_usable_credential_allows() {
        let fx = fixture(Some(token_expiring_in(3600)), RouteTable::with_default_routes());
        assert_eq!(fx.guard.navigate("/majors"), NavigationOutcome::Allow);
        assert_eq!(fx.history.current(), "/majors");
    }

    #[test]
    fn test_allowed_navigation_keeps_query_and_fragment() {
        let fx = fixture(Some(token_expiring_in(3600)), RouteTable::with_default_routes());
        assert_eq!(fx.guard.navigate("/majors/?page=2#top"), NavigationOutcome::Allow);
        assert_eq!(fx.history.current(), "/majors?page=2#top");

        let fx = fixture(None, RouteTable::with_default_routes());
        assert_eq!(
            fx.guard.navigate("/majors?page=2"),
            NavigationOutcome::Redirect("/login".to_string())
        );
        assert_eq!(fx.history.current(), "/login");
    }

    #[test]
    fn test_expired_credential_redirects_and_clears_storage() {
        let expired = token_expiring_in(-10);
        let fx = fixture(Some(expired.clone()), RouteTable::with_default_routes());

        assert_eq!(
            fx.guard.evaluate(RouteRequirement::RequiresAuth),
            NavigationOutcome::Redirect("/login".to_string())
        );
        assert_eq!(fx.storage.load().expect("load"), None);
        // Only the durable slot is touched.
        assert_eq!(fx.store.credential(), Some(expired));
    }

    #[test]
    fn test_guest_route_with_usable_credential_goes_to_dashboard() {
        let fx = fixture(Some(token_expiring_in(3600)), RouteTable::with_default_routes());
        assert_eq!(
            fx.guard.navigate("/login"),
            NavigationOutcome::Redirect("/dashboard".to_string())
        );
        assert_eq!(fx.history.current(), "/dashboard");
    }

    #[test]
    fn test_guest_route_without_credential_allows() {
        let fx = fixture(Some("garbage".to_string()), RouteTable::with_default_routes());
        assert_eq!(fx.guard.navigate("/login"), NavigationOutcome::Allow);
        assert_eq!(fx.storage.load().expect("load"), None);
    }

    #[test]
    fn test_root_alias_is_guarded() {
        let fx = fixture(None, RouteTable::with_default_routes());
        assert_eq!(
            fx.guard.navigate("/"),
            NavigationOutcome::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_open_route_allows_either_way() {
        let fx = fixture(None, RouteTable::with_default_routes());
        assert_eq!(fx.guard.navigate("/help"), NavigationOutcome::Allow);
        assert_eq!(fx.history.current(), "/help");
    }

    #[test]
    fn test_redirect_loop_is_rejected() {
        // The public entry itself requires auth, so an anonymous user can never settle.
        let routes = RouteTable::new()
            .route("/login", RouteRequirement::RequiresAuth)
            .route("/dashboard", RouteRequirement::RequiresAuth);
        let fx = fixture(None, routes);

        assert_eq!(fx.guard.navigate("/dashboard"), NavigationOutcome::Reject);
        assert_eq!(fx.history.entries(), vec!["/"]);
    }
}
