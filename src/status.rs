//! Reason phrases for HTTP status codes.

use http::StatusCode;

/// Returns the reason phrase for `code`, or an empty string if the code is
/// not a registered status.
#[must_use]
pub fn status_text(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(403), "Forbidden");
        assert_eq!(status_text(404), "Not Found");
        assert_eq!(status_text(418), "I'm a teapot");
    }

    #[test]
    fn test_unknown_codes_are_empty() {
        assert_eq!(status_text(0), "");
        assert_eq!(status_text(299), "");
        assert_eq!(status_text(1000), "");
    }
}
