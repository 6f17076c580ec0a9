//! Error taxonomy for the fetch pipeline.

use thiserror::Error;

/// Terminal error of a fetch operation, after throttling and retries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Identifier rejected locally, before any network call.
    #[error("{0}")]
    Validation(String),
    /// Upstream 400-class response. Never retried.
    #[error("{0}")]
    InvalidRequest(String),
    /// Upstream kept answering 429 until the retry budget ran out.
    #[error("rate limit exceeded after retries; please try again later")]
    RateLimitExceeded,
    /// Network fault or 500-class response that survived all retries.
    #[error("request failed: {0}")]
    Transient(String),
    /// Transport succeeded but the payload carried an error message.
    #[error("{}", upstream_display(.message, .hint.as_deref()))]
    Upstream {
        /// Server-supplied message, passed through verbatim.
        message: String,
        /// Fixed remediation hint when the message matches a known pattern.
        hint: Option<&'static str>,
    },
}

impl FetchError {
    /// Whether the error was raised before any request was dispatched.
    pub fn is_local(&self) -> bool {
        matches!(self, FetchError::Validation(_))
    }
}

fn upstream_display(message: &str, hint: Option<&str>) -> String {
    match hint {
        Some(hint) => format!("{message} {hint}"),
        None => message.to_string(),
    }
}

/// Outcome of a single dispatch attempt, classified at the transport seam.
///
/// The throttler decides retry policy from this; it never inspects HTTP
/// status codes itself.
#[derive(Debug)]
pub enum AttemptError {
    /// 429-class response; eligible for backoff and retry.
    RateLimited,
    /// 400-class response; fails the operation immediately.
    Invalid(String),
    /// Anything else that went wrong (connection faults, 5xx, bad JSON).
    Transient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_is_verbatim_without_hint() {
        let err = FetchError::Upstream {
            message: "Profile is private.".to_string(),
            hint: None,
        };
        assert_eq!(err.to_string(), "Profile is private.");
    }

    #[test]
    fn upstream_hint_is_appended() {
        let err = FetchError::Upstream {
            message: "Error: profile is private".to_string(),
            hint: Some("Please set your game details to public in Steam (Settings > Privacy)."),
        };
        assert_eq!(
            err.to_string(),
            "Error: profile is private Please set your game details to public in Steam (Settings > Privacy)."
        );
    }
}
