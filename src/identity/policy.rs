/// Which routes may be reached without a bound principal.
///
/// A static pattern table evaluated per request, first match wins. Patterns
/// are exact paths, or prefixes when they end in `*`. Everything that matches
/// nothing requires authentication.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    public_patterns: Vec<String>,
}

impl AccessPolicy {
    /// Default table: the auth endpoints and the designated test endpoints
    /// are public; all other routes require an authenticated principal.
    pub fn new() -> Self {
        Self::with_public_patterns(vec![
            "/api/auth/*".to_string(),
            "/api/test/*".to_string(),
        ])
    }

    pub fn with_public_patterns(patterns: Vec<String>) -> Self {
        Self { public_patterns: patterns }
    }

    pub fn is_public(&self, path: &str) -> bool {
        for pattern in &self.public_patterns {
            if let Some(prefix) = pattern.strip_suffix('*') {
                if path.starts_with(prefix) {
                    return true;
                }
            } else if pattern == path {
                return true;
            }
        }
        false
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_test_routes_are_public() {
        let policy = AccessPolicy::new();
        assert!(policy.is_public("/api/auth/login"));
        assert!(policy.is_public("/api/auth/register"));
        assert!(policy.is_public("/api/test/ping"));
    }

    #[test]
    fn everything_else_requires_authentication() {
        let policy = AccessPolicy::new();
        assert!(!policy.is_public("/api/me"));
        assert!(!policy.is_public("/"));
        assert!(!policy.is_public("/api/authx")); // prefix must match the full segment pattern
    }

    #[test]
    fn exact_patterns_match_only_themselves() {
        let policy = AccessPolicy::with_public_patterns(vec!["/healthz".to_string()]);
        assert!(policy.is_public("/healthz"));
        assert!(!policy.is_public("/healthz/deep"));
    }
}
