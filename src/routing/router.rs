//! Route lookup.
//!
//! # Responsibilities
//! - Hold the configured rules and upstreams
//! - Resolve a request URL to the upstream URL it should be forwarded to
//! - Return an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (shared across tasks without locks)
//! - O(n) scan in configured order; the first matching rule wins
//! - A rule's first upstream is the only one consulted

use std::collections::HashMap;

use crate::config::{RoutingRule, ServerConfig};
use crate::routing::matcher::request_path;

/// Outcome of a successful route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// The rule path that matched.
    pub rule_path: String,
    /// Id of the upstream that will serve the request.
    pub upstream_id: String,
    /// Upstream base URL with the original path and query appended.
    pub url: String,
}

/// Compiled routing table.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Vec<RoutingRule>,
    upstreams: HashMap<String, String>,
}

impl Router {
    /// Build the routing table from the server section of the config.
    pub fn from_config(config: &ServerConfig) -> Self {
        let upstreams = config
            .upstreams
            .iter()
            .map(|u| (u.id.clone(), u.url.clone()))
            .collect();

        Self {
            rules: config.rules.clone(),
            upstreams,
        }
    }

    /// Resolve a request URL (path + query) to a forwarding target.
    ///
    /// Rules with an empty upstream list never match. A matching rule whose
    /// first upstream is unknown yields no target.
    pub fn resolve(&self, url: &str) -> Option<RouteTarget> {
        let path = request_path(url);

        let rule = self
            .rules
            .iter()
            .find(|r| r.path == path && !r.upstreams.is_empty())?;

        let upstream_id = &rule.upstreams[0];
        let Some(base) = self.upstreams.get(upstream_id) else {
            tracing::warn!(rule = %rule.path, upstream = %upstream_id, "Rule references unknown upstream");
            return None;
        };

        Some(RouteTarget {
            rule_path: rule.path.clone(),
            upstream_id: upstream_id.clone(),
            url: format!("{base}{url}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamNode;

    fn config(rules: Vec<(&str, Vec<&str>)>) -> ServerConfig {
        ServerConfig {
            listen: 8000,
            host: "127.0.0.1".into(),
            worker_count: 1,
            upstreams: vec![
                UpstreamNode { id: "svc1".into(), url: "http://backend:9000".into() },
                UpstreamNode { id: "svc2".into(), url: "http://other:9001".into() },
            ],
            headers: vec![],
            rules: rules
                .into_iter()
                .map(|(path, ups)| RoutingRule {
                    path: path.into(),
                    upstreams: ups.into_iter().map(String::from).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_forwards_full_path_and_query() {
        let router = Router::from_config(&config(vec![("/api", vec!["svc1"])]));
        let target = router.resolve("/api/users?x=1").unwrap();
        assert_eq!(target.url, "http://backend:9000/api/users?x=1");
        assert_eq!(target.upstream_id, "svc1");
        assert_eq!(target.rule_path, "/api");
    }

    #[test]
    fn test_no_match() {
        let router = Router::from_config(&config(vec![("/api", vec!["svc1"])]));
        assert!(router.resolve("/web/index.html").is_none());
        assert!(router.resolve("/").is_none());
        assert!(router.resolve("/apis").is_none());
    }

    #[test]
    fn test_first_match_and_first_upstream() {
        let router = Router::from_config(&config(vec![
            ("/api", vec!["svc2", "svc1"]),
            ("/api", vec!["svc1"]),
        ]));
        assert_eq!(router.resolve("/api/x").unwrap().upstream_id, "svc2");
    }

    #[test]
    fn test_empty_rule_is_skipped() {
        let router = Router::from_config(&config(vec![("/api", vec![]), ("/api", vec!["svc1"])]));
        assert_eq!(router.resolve("/api").unwrap().upstream_id, "svc1");

        let only_empty = Router::from_config(&config(vec![("/api", vec![])]));
        assert!(only_empty.resolve("/api").is_none());
    }

    #[test]
    fn test_unknown_upstream_is_no_target() {
        let router = Router::from_config(&config(vec![("/api", vec!["ghost"]), ("/api", vec!["svc1"])]));
        assert!(router.resolve("/api").is_none());
    }

    #[test]
    fn test_root_rule() {
        let router = Router::from_config(&config(vec![("/", vec!["svc1"])]));
        assert_eq!(router.resolve("/?q=1").unwrap().url, "http://backend:9000/?q=1");
    }
}
