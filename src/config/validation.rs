//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (rules reference existing upstreams)
//! - Validate value ranges (port non-zero, URLs absolute)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `server.rules[0].path`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if server.listen == 0 {
        errors.push(ValidationError::new("server.listen", "port must be non-zero"));
    }

    if server.upstreams.is_empty() {
        errors.push(ValidationError::new("server.upstreams", "at least one upstream is required"));
    }

    let mut seen = HashSet::new();
    for (i, upstream) in server.upstreams.iter().enumerate() {
        if upstream.id.is_empty() {
            errors.push(ValidationError::new(format!("server.upstreams[{i}].id"), "must not be empty"));
        } else if !seen.insert(upstream.id.as_str()) {
            errors.push(ValidationError::new(
                format!("server.upstreams[{i}].id"),
                format!("duplicate upstream id '{}'", upstream.id),
            ));
        }

        match Url::parse(&upstream.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => errors.push(ValidationError::new(
                format!("server.upstreams[{i}].url"),
                format!("unsupported url '{}' (scheme {})", upstream.url, url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("server.upstreams[{i}].url"),
                format!("invalid url '{}': {}", upstream.url, e),
            )),
        }
    }

    for (i, header) in server.headers.iter().enumerate() {
        if header.key.is_empty() {
            errors.push(ValidationError::new(format!("server.headers[{i}].key"), "must not be empty"));
        }
        if header.value.is_empty() {
            errors.push(ValidationError::new(format!("server.headers[{i}].value"), "must not be empty"));
        }
    }

    for (i, rule) in server.rules.iter().enumerate() {
        let field = format!("server.rules[{i}].path");
        if !rule.path.starts_with('/') {
            errors.push(ValidationError::new(field, format!("'{}' must start with '/'", rule.path)));
        } else if rule.path[1..].contains('/') {
            errors.push(ValidationError::new(
                field,
                format!("'{}' must be a single top-level segment", rule.path),
            ));
        }

        for (j, id) in rule.upstreams.iter().enumerate() {
            if server.upstream(id).is_none() {
                errors.push(ValidationError::new(
                    format!("server.rules[{i}].upstreams[{j}]"),
                    format!("unknown upstream '{id}'"),
                ));
            }
        }
    }

    if config.ipc.max_frame_bytes < 1024 {
        errors.push(ValidationError::new("ipc.max_frame_bytes", "must be at least 1024"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> ProxyConfig {
        serde_yaml::from_str(doc).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r#"
server:
  listen: 8000
  upstreams:
    - { id: svc1, url: "http://backend:9000" }
  rules:
    - { path: /api, upstreams: [svc1] }
    - { path: /, upstreams: [svc1] }
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = parse(
            r#"
server:
  listen: 0
  upstreams:
    - { id: svc1, url: "http://backend:9000" }
    - { id: svc1, url: "not a url" }
  headers:
    - { key: "", value: x }
  rules:
    - { path: api, upstreams: [svc1] }
    - { path: /a/b, upstreams: [] }
    - { path: /web, upstreams: [missing] }
"#,
        );
        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"server.listen"));
        assert!(fields.contains(&"server.upstreams[1].id"));
        assert!(fields.contains(&"server.upstreams[1].url"));
        assert!(fields.contains(&"server.headers[0].key"));
        assert!(fields.contains(&"server.rules[0].path"));
        assert!(fields.contains(&"server.rules[1].path"));
        assert!(fields.contains(&"server.rules[2].upstreams[0]"));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_requires_upstreams() {
        let config = parse("server:\n  listen: 80\n");
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "server.upstreams");
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let config = parse(
            r#"
server:
  listen: 80
  upstreams:
    - { id: a, url: "ftp://files" }
"#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("ftp"));
    }
}
