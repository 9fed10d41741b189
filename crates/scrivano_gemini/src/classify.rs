//! Mapping Gemini HTTP outcomes onto the dispatch error taxonomy.

use crate::dto::{ErrorBody, GenerateContentResponse};
use scrivano_error::DispatchErrorKind;

/// Finish reasons that mean the model withheld output on purpose.
const BLOCKING_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

const MAX_RAW_BODY: usize = 300;

/// Pull the human-readable message out of an error body, falling back to
/// the (truncated) raw text when the body is not the documented JSON shape.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.message {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(MAX_RAW_BODY).collect()
    }
}

/// True when an error body signals quota exhaustion despite a generic status.
fn looks_like_quota(body: &str) -> bool {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if parsed.error.status.as_deref() == Some("RESOURCE_EXHAUSTED") {
            return true;
        }
    }
    let lower = body.to_lowercase();
    lower.contains("quota") || lower.contains("rate limit") || lower.contains("limit exceeded")
}

/// Classify a non-2xx response.
pub(crate) fn classify_failure(status: u16, body: &str) -> DispatchErrorKind {
    let message = error_message(body);
    match status {
        429 => DispatchErrorKind::RateLimited {
            message,
            wait_ms: None,
        },
        401 | 403 => DispatchErrorKind::AuthError { status, message },
        400..=499 => {
            // Some deployments report quota exhaustion as a generic 4xx.
            if looks_like_quota(body) {
                DispatchErrorKind::RateLimited {
                    message,
                    wait_ms: None,
                }
            } else {
                DispatchErrorKind::InvalidRequest { status, message }
            }
        }
        500..=599 => DispatchErrorKind::TransientService { status, message },
        _ => DispatchErrorKind::Unknown {
            message: format!("unexpected status {status}: {message}"),
        },
    }
}

/// Extract the generated text from a 2xx response.
///
/// The payload is every text part of the first candidate, concatenated in
/// order, so answers the upstream splits across parts survive intact.
///
/// A candidate that finished for a content-policy reason and carries no
/// text maps to `ContentFiltered`; anything else without text is a
/// malformed response the dispatch loop may retry.
pub(crate) fn extract_text(
    response: &GenerateContentResponse,
) -> Result<String, DispatchErrorKind> {
    let Some(candidate) = response.candidates.first() else {
        return Err(DispatchErrorKind::MalformedResponse {
            message: "response contained no candidates".to_string(),
        });
    };

    let text = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    if !text.is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason.as_deref() {
        Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason) => {
            Err(DispatchErrorKind::ContentFiltered {
                reason: reason.to_string(),
            })
        }
        other => Err(DispatchErrorKind::MalformedResponse {
            message: format!(
                "candidate carried no text (finish reason: {})",
                other.unwrap_or("absent")
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn status_429_is_rate_limited() {
        let kind = classify_failure(429, r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#);
        match kind {
            DispatchErrorKind::RateLimited { message, wait_ms } => {
                assert_eq!(message, "Resource has been exhausted");
                assert_eq!(wait_ms, None);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn auth_statuses_map_to_auth_errors() {
        for status in [401u16, 403] {
            let kind = classify_failure(
                status,
                r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#,
            );
            assert!(matches!(kind, DispatchErrorKind::AuthError { .. }));
        }
    }

    #[test]
    fn quota_wording_promotes_a_generic_4xx_to_rate_limited() {
        let kind = classify_failure(
            400,
            r#"{"error":{"message":"Quota exceeded for requests per minute"}}"#,
        );
        assert!(matches!(kind, DispatchErrorKind::RateLimited { .. }));
    }

    #[test]
    fn resource_exhausted_status_promotes_a_generic_4xx() {
        let kind = classify_failure(
            400,
            r#"{"error":{"message":"Please try again later","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(kind, DispatchErrorKind::RateLimited { .. }));
    }

    #[test]
    fn other_4xx_is_an_invalid_request() {
        let kind = classify_failure(
            400,
            r#"{"error":{"message":"Invalid JSON payload received."}}"#,
        );
        match kind {
            DispatchErrorKind::InvalidRequest { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid JSON payload received.");
            }
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [500u16, 502, 503, 504] {
            let kind = classify_failure(status, "upstream unavailable");
            assert!(matches!(
                kind,
                DispatchErrorKind::TransientService { .. }
            ));
        }
    }

    #[test]
    fn oddball_statuses_are_unknown() {
        let kind = classify_failure(302, "");
        assert!(matches!(kind, DispatchErrorKind::Unknown { .. }));
    }

    #[test]
    fn non_json_bodies_fall_back_to_raw_text() {
        let kind = classify_failure(503, "<html>Service Unavailable</html>");
        match kind {
            DispatchErrorKind::TransientService { message, .. } => {
                assert_eq!(message, "<html>Service Unavailable</html>");
            }
            other => panic!("expected TransientService, got {:?}", other),
        }
    }

    #[test]
    fn text_is_joined_across_parts() {
        let response = response(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world."}],"role":"model"},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(extract_text(&response).unwrap(), "Hello, world.");
    }

    #[test]
    fn safety_finish_without_text_is_content_filtered() {
        let response =
            response(r#"{"candidates":[{"content":{"parts":[],"role":"model"},"finishReason":"SAFETY"}]}"#);
        match extract_text(&response).unwrap_err() {
            DispatchErrorKind::ContentFiltered { reason } => assert_eq!(reason, "SAFETY"),
            other => panic!("expected ContentFiltered, got {:?}", other),
        }
    }

    #[test]
    fn recitation_finish_without_text_is_content_filtered() {
        let response = response(r#"{"candidates":[{"finishReason":"RECITATION"}]}"#);
        assert!(matches!(
            extract_text(&response).unwrap_err(),
            DispatchErrorKind::ContentFiltered { .. }
        ));
    }

    #[test]
    fn missing_candidates_are_malformed() {
        let response = response(r#"{"candidates":[]}"#);
        assert!(matches!(
            extract_text(&response).unwrap_err(),
            DispatchErrorKind::MalformedResponse { .. }
        ));
    }

    #[test]
    fn empty_stop_candidate_is_malformed_not_filtered() {
        let response = response(
            r#"{"candidates":[{"content":{"parts":[],"role":"model"},"finishReason":"STOP"}]}"#,
        );
        assert!(matches!(
            extract_text(&response).unwrap_err(),
            DispatchErrorKind::MalformedResponse { .. }
        ));
    }
}
