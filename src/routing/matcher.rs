//! Route matching logic.
//!
//! # Responsibilities
//! - Compile route path patterns once, at configuration load
//! - Search each pattern anywhere in the request path (unanchored)
//! - Return the first rule, in declaration order, whose pattern matches
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Order is the only tie-breaker: an earlier, less specific rule wins
//!   over a later, more specific one
//! - No memoization of results; only the compiled patterns are reused

use regex::Regex;

use crate::config::RouteConfig;

/// A compiled route rule.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pattern: Regex,
    service: String,
    strip_prefix: String,
    optional_auth: bool,
}

impl RouteRule {
    /// Compile a rule from its configuration.
    pub fn compile(config: &RouteConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&config.path)?,
            service: config.service.clone(),
            strip_prefix: config.strip_prefix.clone(),
            optional_auth: config.optional_auth,
        })
    }

    /// Returns true if the pattern is found anywhere in `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// The source text of the path pattern.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Name of the service this rule forwards to.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn strip_prefix(&self) -> &str {
        &self.strip_prefix
    }

    /// Whether a request may proceed without valid credentials.
    pub fn optional_auth(&self) -> bool {
        self.optional_auth
    }

    /// Remove the configured prefix from `path`, if present.
    pub fn stripped_path<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.strip_prefix.as_str()).unwrap_or(path)
    }
}

/// Ordered list of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
    rules: Vec<RouteRule>,
}

impl RouteMatcher {
    /// Compile every configured route, preserving declaration order.
    pub fn compile(configs: &[RouteConfig]) -> Result<Self, regex::Error> {
        let rules = configs
            .iter()
            .map(RouteRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Returns the first rule whose pattern matches `path`.
    pub fn match_path(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str, service: &str) -> RouteConfig {
        RouteConfig {
            path: path.into(),
            service: service.into(),
            strip_prefix: String::new(),
            optional_auth: false,
        }
    }

    #[test]
    fn test_first_declared_match_wins() {
        let matcher = RouteMatcher::compile(&[
            route("/api", "broad"),
            route("^/api/users/[0-9]+$", "specific"),
        ])
        .unwrap();

        let rule = matcher.match_path("/api/users/42").unwrap();
        assert_eq!(rule.service(), "broad");
    }

    #[test]
    fn test_declaration_order_decides_when_reversed() {
        let matcher = RouteMatcher::compile(&[
            route("^/api/users/[0-9]+$", "specific"),
            route("/api", "broad"),
        ])
        .unwrap();

        assert_eq!(matcher.match_path("/api/users/42").unwrap().service(), "specific");
        assert_eq!(matcher.match_path("/api/orders").unwrap().service(), "broad");
    }

    #[test]
    fn test_partial_match_counts() {
        let matcher = RouteMatcher::compile(&[route("users", "svc")]).unwrap();
        assert!(matcher.match_path("/api/v2/users/42").is_some());
        assert!(matcher.match_path("/api/v2/orders").is_none());
    }

    #[test]
    fn test_path_matching_is_case_sensitive() {
        let matcher = RouteMatcher::compile(&[route("^/Users", "svc")]).unwrap();
        assert!(matcher.match_path("/Users").is_some());
        assert!(matcher.match_path("/users").is_none());
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = RouteMatcher::default();
        assert!(matcher.is_empty());
        assert!(matcher.match_path("/").is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RouteMatcher::compile(&[route("[", "svc")]).is_err());
    }

    #[test]
    fn test_stripped_path() {
        let mut config = route("^/api/users", "svc");
        config.strip_prefix = "/api".into();
        let rule = RouteRule::compile(&config).unwrap();

        assert_eq!(rule.stripped_path("/api/users/42"), "/users/42");
        assert_eq!(rule.stripped_path("/users/42"), "/users/42");
        assert_eq!(rule.pattern(), "^/api/users");
    }
}
