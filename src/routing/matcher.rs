//! Request path matching.
//!
//! # Responsibilities
//! - Reduce a request URL to its routing key: "/" + first path segment
//!
//! # Design Decisions
//! - Matching is exact and case-sensitive on the segment
//! - Query string and fragment never take part in matching
//! - No regex, no prefix trees: rule counts are small

/// Routing key for a request URL (path + optional query).
///
/// `/api/users?x=1` → `/api`, `/health` → `/health`, `/` → `/`.
pub fn request_path(url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let segment = trimmed.split('/').next().unwrap_or_default();
    format!("/{segment}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_segment() {
        assert_eq!(request_path("/api/users"), "/api");
        assert_eq!(request_path("/api"), "/api");
        assert_eq!(request_path("/api/"), "/api");
        assert_eq!(request_path("/"), "/");
        assert_eq!(request_path(""), "/");
    }

    #[test]
    fn test_query_is_ignored() {
        assert_eq!(request_path("/api/users?x=1"), "/api");
        assert_eq!(request_path("/api?x=/y"), "/api");
        assert_eq!(request_path("/?x=1"), "/");
        assert_eq!(request_path("/docs#top"), "/docs");
    }

    #[test]
    fn test_case_sensitive() {
        assert_eq!(request_path("/API/v1"), "/API");
    }
}
