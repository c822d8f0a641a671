//! Bearer token checks for `/ws` and for the credential inside every
//! envelope.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

#[derive(Clone)]
pub struct TokenCheck {
    accepted: Vec<String>,
}

impl TokenCheck {
    /// An empty list accepts any non-empty token.
    pub fn new(accepted: Vec<String>) -> Self {
        Self { accepted }
    }

    pub fn verify(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        if self.accepted.is_empty() {
            return true;
        }

        // Compare against every entry so timing does not reveal which
        // position matched.
        let presented = token.as_bytes();
        let mut matched = 0u8;
        for expected in &self.accepted {
            let expected = expected.as_bytes();
            if expected.len() == presented.len() {
                matched |= presented.ct_eq(expected).unwrap_u8();
            }
        }
        matched == 1
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_open_mode_accepts_any_non_empty_token() {
        let check = TokenCheck::new(Vec::new());
        assert!(check.verify("anything"));
        assert!(!check.verify("  "));
    }

    #[test]
    fn test_token_list() {
        let check = TokenCheck::new(vec!["abc".into(), "secret-2".into()]);
        assert!(check.verify("abc"));
        assert!(check.verify("secret-2"));
        assert!(!check.verify("bad"));
        assert!(!check.verify("ab"));
        assert!(!check.verify("abcd"));
    }

    #[test]
    fn test_bearer_token_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
