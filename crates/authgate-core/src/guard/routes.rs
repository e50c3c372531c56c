use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What a view demands of the session before it may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RouteRequirement {
    /// Protected view; needs a usable credential.
    RequiresAuth,
    /// Public-only view such as the login form.
    GuestOnly,
    Open,
}

/// Path registry for the navigation guard.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteRequirement>,
    aliases: HashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The views of the indicator management front end.
    pub fn with_default_routes() -> Self {
        let mut table = Self::new()
            .route("/login", RouteRequirement::GuestOnly)
            .alias("/", "/dashboard");
        for path in [
            "/dashboard",
            "/indicators",
            "/majors",
            "/evaluation-types",
            "/users",
            "/permissions",
            "/roles",
            "/role-permissions",
            "/settings",
            "/indicator-compare",
            "/big-screen",
            "/center-dashboard",
        ] {
            table = table.route(path, RouteRequirement::RequiresAuth);
        }
        table
    }

    pub fn route(mut self, path: &str, requirement: RouteRequirement) -> Self {
        self.routes.insert(normalize(path), requirement);
        self
    }

    pub fn alias(mut self, from: &str, to: &str) -> Self {
        self.aliases.insert(normalize(from), normalize(to));
        self
    }

    /// Follow aliases to the concrete path. Alias cycles stop at the first
    /// repeated path.
    pub fn resolve(&self, path: &str) -> String {
        let mut current = normalize(path);
        let mut seen = vec![current.clone()];
        while let Some(next) = self.aliases.get(&current) {
            if seen.contains(next) {
                break;
            }
            current = next.clone();
            seen.push(current.clone());
        }
        current
    }

    /// Requirement of a resolved path. Unknown paths are open.
    pub fn requirement(&self, path: &str) -> RouteRequirement {
        self.routes
            .get(&normalize(path))
            .copied()
            .unwrap_or(RouteRequirement::Open)
    }
}

/// Strip query, fragment and trailing slash; ensure a leading slash.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes() {
        let table = RouteTable::with_default_routes();
        assert_eq!(table.requirement("/login"), RouteRequirement::GuestOnly);
        assert_eq!(table.requirement("/majors"), RouteRequirement::RequiresAuth);
        assert_eq!(table.requirement("/majors/"), RouteRequirement::RequiresAuth);
        assert_eq!(table.requirement("/about"), RouteRequirement::Open);
        assert_eq!(table.resolve("/"), "/dashboard");
        assert_eq!(table.resolve("/settings?tab=password"), "/settings");
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let table = RouteTable::new().alias("/a", "/b").alias("/b", "/a");
        assert_eq!(table.resolve("/a"), "/b");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("users"), "/users");
        assert_eq!(normalize("/users/#top"), "/users");
    }
}
