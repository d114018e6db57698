//! Header extraction helpers shared by the auth gate.
//!
//! The actual axum `FromRequestParts` extractors live with `AppState` in
//! the API crate; this module only knows how to pull credentials out of a
//! `HeaderMap`.

use axum::http::HeaderMap;

pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers.get("X-Session-Token") {
        return token.to_str().ok().map(String::from);
    }

    let cookie_header = headers.get("Cookie")?;
    let cookies = cookie_header.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        let cookie = cookie.trim();
        cookie.strip_prefix("session_token=").map(String::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", "pk_abc123".parse().unwrap());
        assert_eq!(extract_api_key(&headers), Some("pk_abc123".to_string()));
    }

    #[test]
    fn extracts_session_token_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Session-Token", "test-token-123".parse().unwrap());
        assert_eq!(extract_session_token(&headers), Some("test-token-123".to_string()));
    }

    #[test]
    fn extracts_session_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Cookie", "other=value; session_token=cookie-token; more=stuff".parse().unwrap());
        assert_eq!(extract_session_token(&headers), Some("cookie-token".to_string()));
    }

    #[test]
    fn missing_credentials_return_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);
        assert_eq!(extract_session_token(&headers), None);
    }
}
