//! HTTP client for the library API.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{AttemptError, FetchError};
use crate::models::{
    AchievementEnvelope, AchievementSummary, LibraryEnvelope, LibraryPage, LibrarySnapshot,
};
use crate::net::throttle::Throttler;
use crate::query::QueryState;

static STEAM_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{17}$").expect("steam id pattern compiles"));

const BAD_REQUEST_MESSAGE: &str = "Invalid request (HTTP 400). The SteamID64 may be invalid, \
     the profile may not exist, or it may be private.";

/// A validated library identifier, routed to the matching endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryTarget {
    /// A 17-digit SteamID64.
    SteamId(String),
    /// A custom-URL vanity name.
    Vanity(String),
}

impl LibraryTarget {
    /// Validate raw user input into a target.
    ///
    /// Accepts a bare vanity name, a 17-digit id, or a full
    /// `steamcommunity.com/id/<name>` URL. `/profiles/` URLs are rejected
    /// with guidance to paste the numeric id instead.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FetchError::Validation(
                "Please enter a Steam username or SteamID64.".to_string(),
            ));
        }

        let mut candidate = trimmed.to_string();
        if let Some(idx) = candidate.find("steamcommunity.com/id/") {
            candidate = candidate[idx + "steamcommunity.com/id/".len()..]
                .trim_matches('/')
                .to_string();
        } else if candidate.contains("steamcommunity.com/profiles/") {
            return Err(FetchError::Validation(
                "Profile URLs are not supported. Paste the 17-digit SteamID64 itself.".to_string(),
            ));
        }

        if candidate.is_empty() {
            return Err(FetchError::Validation(
                "Please enter a Steam username or SteamID64.".to_string(),
            ));
        }

        if candidate.chars().all(|c| c.is_ascii_digit()) {
            if STEAM_ID_RE.is_match(&candidate) {
                Ok(LibraryTarget::SteamId(candidate))
            } else {
                Err(FetchError::Validation(
                    "Invalid SteamID64. It must be a 17-digit number.".to_string(),
                ))
            }
        } else {
            Ok(LibraryTarget::Vanity(candidate))
        }
    }

    /// Endpoint path and identifier parameter for this target.
    fn endpoint(&self) -> (&'static str, &'static str, &str) {
        match self {
            LibraryTarget::Vanity(name) => ("/get_library", "username", name),
            LibraryTarget::SteamId(id) => ("/get_library_by_id", "steamid", id),
        }
    }
}

/// Fixed remediation hint for known upstream error messages.
///
/// Matching is case-sensitive substring search, in declaration order.
fn hint_for(message: &str) -> Option<&'static str> {
    const PATTERNS: [(&str, &str); 3] = [
        (
            "Invalid username",
            "Try setting a custom URL in Steam or use your SteamID64 instead.",
        ),
        (
            "profile is private",
            "Please set your game details to public in Steam (Settings > Privacy).",
        ),
        (
            "Invalid SteamID64",
            "The SteamID64 may be incorrect or the profile does not exist.",
        ),
    ];
    PATTERNS
        .iter()
        .find(|(pattern, _)| message.contains(pattern))
        .map(|(_, hint)| *hint)
}

/// Classify a non-success status for the retry policy.
///
/// 429 outranks the generic client-error bucket; everything else
/// non-2xx is transient and retryable.
fn classify_status(status: StatusCode) -> Option<AttemptError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Some(AttemptError::RateLimited)
    } else if status.is_client_error() {
        if status == StatusCode::BAD_REQUEST {
            Some(AttemptError::Invalid(BAD_REQUEST_MESSAGE.to_string()))
        } else {
            Some(AttemptError::Invalid(format!(
                "Request rejected (HTTP {}).",
                status.as_u16()
            )))
        }
    } else if !status.is_success() {
        Some(AttemptError::Transient(format!(
            "server returned HTTP {}",
            status.as_u16()
        )))
    } else {
        None
    }
}

/// Issues throttled, retried requests against the library API.
#[derive(Clone)]
pub struct LibraryClient {
    http: reqwest::Client,
    base_url: String,
    throttler: Throttler,
}

impl LibraryClient {
    /// Client built from configuration, sharing the given pacing clock.
    pub fn new(config: &AppConfig, throttler: Throttler) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| FetchError::Transient(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            throttler,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        label: &str,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        self.throttler
            .run(label, || {
                let http = self.http.clone();
                let url = url.clone();
                let params = params.clone();
                async move {
                    let response = http
                        .get(&url)
                        .query(&params)
                        .send()
                        .await
                        .map_err(|err| AttemptError::Transient(err.to_string()))?;
                    if let Some(err) = classify_status(response.status()) {
                        return Err(err);
                    }
                    response
                        .json::<T>()
                        .await
                        .map_err(|err| AttemptError::Transient(format!("bad payload: {err}")))
                }
            })
            .await
    }

    async fn fetch_envelope(
        &self,
        target: &LibraryTarget,
        query: &QueryState,
        per_page: u32,
    ) -> Result<LibraryEnvelope, FetchError> {
        let (path, id_param, id_value) = target.endpoint();
        let mut params = query.to_params(per_page);
        params.push((id_param.to_string(), id_value.to_string()));
        let envelope: LibraryEnvelope = self.get_json("library", path, params).await?;
        if let Some(message) = envelope.error {
            let hint = hint_for(&message);
            return Err(FetchError::Upstream { message, hint });
        }
        Ok(envelope)
    }

    /// Fetch one page of the filtered view.
    pub async fn fetch_page(
        &self,
        target: &LibraryTarget,
        query: &QueryState,
        per_page: u32,
    ) -> Result<LibraryPage, FetchError> {
        let envelope = self.fetch_envelope(target, query, per_page).await?;
        let before = envelope.games.len();
        let games: Vec<_> = envelope
            .games
            .into_iter()
            .filter(|game| game.is_valid())
            .collect();
        if games.len() < before {
            debug!(dropped = before - games.len(), "dropped invalid records");
        }
        Ok(LibraryPage {
            steam_id: envelope.steam_id.unwrap_or_default(),
            games,
            total_pages: envelope.total_pages.unwrap_or(0),
            total_games: envelope.total_games.unwrap_or(0),
        })
    }

    /// Fetch the whole library in one oversized page, for aggregates.
    pub async fn fetch_snapshot(
        &self,
        target: &LibraryTarget,
        aggregate_page_size: u32,
    ) -> Result<LibrarySnapshot, FetchError> {
        let query = QueryState::default();
        let envelope = self
            .fetch_envelope(target, &query, aggregate_page_size)
            .await?;
        let games = envelope
            .games
            .into_iter()
            .filter(|game| game.is_valid())
            .collect();
        Ok(LibrarySnapshot {
            steam_id: envelope.steam_id.unwrap_or_default(),
            games,
        })
    }

    /// Fetch the achievement completion summary for one title.
    pub async fn fetch_achievements(
        &self,
        steam_id: &str,
        app_id: u64,
    ) -> Result<AchievementSummary, FetchError> {
        let params = vec![
            ("steamid".to_string(), steam_id.to_string()),
            ("appid".to_string(), app_id.to_string()),
        ];
        let envelope: AchievementEnvelope = self
            .get_json("achievements", "/get_achievements", params)
            .await?;
        if let Some(message) = envelope.error {
            let hint = hint_for(&message);
            return Err(FetchError::Upstream { message, hint });
        }
        let entries = envelope.achievements.unwrap_or_default();
        Ok(AchievementSummary::from_entries(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seventeen_digit_input_is_a_steam_id() {
        let target = LibraryTarget::parse("76561197960435530").expect("valid id");
        assert_eq!(
            target,
            LibraryTarget::SteamId("76561197960435530".to_string())
        );
    }

    #[test]
    fn wrong_length_digits_are_rejected() {
        for input in ["7656119796043553", "765611979604355301", "123"] {
            let err = LibraryTarget::parse(input).expect_err("digit strings must be 17 long");
            assert!(matches!(err, FetchError::Validation(_)));
        }
    }

    #[test]
    fn vanity_names_pass_through() {
        let target = LibraryTarget::parse("  gaben  ").expect("vanity ok");
        assert_eq!(target, LibraryTarget::Vanity("gaben".to_string()));
    }

    #[test]
    fn custom_url_is_normalised() {
        let target = LibraryTarget::parse("https://steamcommunity.com/id/gaben/")
            .expect("custom url ok");
        assert_eq!(target, LibraryTarget::Vanity("gaben".to_string()));
    }

    #[test]
    fn profiles_url_is_rejected() {
        let err = LibraryTarget::parse("https://steamcommunity.com/profiles/76561197960435530")
            .expect_err("profiles urls are rejected");
        assert!(matches!(err, FetchError::Validation(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(LibraryTarget::parse("   ").is_err());
    }

    #[test]
    fn hints_match_known_messages() {
        assert_eq!(
            hint_for("Error: Invalid username provided"),
            Some("Try setting a custom URL in Steam or use your SteamID64 instead.")
        );
        assert_eq!(
            hint_for("This profile is private"),
            Some("Please set your game details to public in Steam (Settings > Privacy).")
        );
        // Matching is case-sensitive.
        assert_eq!(hint_for("this Profile Is Private"), None);
        assert_eq!(hint_for("something else entirely"), None);
    }

    #[test]
    fn status_classification_orders_429_first() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(AttemptError::RateLimited)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST),
            Some(AttemptError::Invalid(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(AttemptError::Transient(_))
        ));
        assert!(classify_status(StatusCode::OK).is_none());
    }
}
