//! Invitation security utilities.
//!
//! Rate limiting for invitation creation, secure response-form tokens, and
//! the composed pre-flight check the invitation form runs before calling the
//! advisor service.

use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::validation::ValidationReport;

/// Prefix applied to advisor response-form tokens
pub const INVITATION_TOKEN_PREFIX: &str = "invitation_";

/// Random bytes per token; hex-encoded into the token body
const TOKEN_BYTES: usize = 24;

/// Rate limiter tuning
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sliding window size in seconds
    pub window_seconds: u64,

    /// Invitation-creation attempts allowed per window
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_attempts: 10,
        }
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,

    /// Seconds until the oldest attempt leaves the window; `None` when allowed
    pub retry_after_secs: Option<u64>,
}

/// Sliding-window rate limiter for invitation creation.
///
/// Attempts are tracked per client identifier (IP or device id). The check
/// and the record happen under a single map-entry guard, so two concurrent
/// callers cannot both squeeze through the last slot in a window.
pub struct RateLimiter {
    /// Attempt timestamps per client in the current window
    attempts: DashMap<String, Vec<u64>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            attempts: DashMap::new(),
            config,
        }
    }

    /// Check whether an attempt is allowed and record it if so.
    pub fn check_and_record(&self, client_id: &str) -> RateLimitDecision {
        let now = epoch_secs();
        let cutoff = now.saturating_sub(self.config.window_seconds);

        let mut entry = self.attempts.entry(client_id.to_string()).or_default();

        // Drop attempts that have left the window
        entry.retain(|&ts| ts > cutoff);

        if entry.len() >= self.config.max_attempts as usize {
            let retry_after = self.retry_after(&entry, now);
            debug!(client_id, "invitation rate limit hit");
            return RateLimitDecision {
                allowed: false,
                retry_after_secs: Some(retry_after),
            };
        }

        entry.push(now);
        RateLimitDecision {
            allowed: true,
            retry_after_secs: None,
        }
    }

    /// Check without recording an attempt.
    ///
    /// Used by form pre-flight validation so a preview check does not consume
    /// a slot the subsequent create call will need.
    pub fn peek(&self, client_id: &str) -> RateLimitDecision {
        let now = epoch_secs();
        let cutoff = now.saturating_sub(self.config.window_seconds);

        match self.attempts.get(client_id) {
            Some(entry) => {
                let live: Vec<u64> = entry.iter().copied().filter(|&ts| ts > cutoff).collect();
                if live.len() >= self.config.max_attempts as usize {
                    RateLimitDecision {
                        allowed: false,
                        retry_after_secs: Some(self.retry_after(&live, now)),
                    }
                } else {
                    RateLimitDecision {
                        allowed: true,
                        retry_after_secs: None,
                    }
                }
            }
            None => RateLimitDecision {
                allowed: true,
                retry_after_secs: None,
            },
        }
    }

    /// Seconds until the oldest in-window attempt expires
    fn retry_after(&self, timestamps: &[u64], now: u64) -> u64 {
        timestamps
            .iter()
            .min()
            .map(|&oldest| (oldest + self.config.window_seconds).saturating_sub(now))
            .unwrap_or(self.config.window_seconds)
            .max(1)
    }

    /// Drop clients whose every attempt has left the window
    pub fn cleanup(&self) {
        let cutoff = epoch_secs().saturating_sub(self.config.window_seconds);
        self.attempts.retain(|_, timestamps| {
            timestamps.retain(|&ts| ts > cutoff);
            !timestamps.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Generate a cryptographically random token with the given prefix.
///
/// 24 bytes from the OS RNG, hex encoded; globally unique for any realistic
/// call volume.
pub fn generate_secure_token(prefix: &str) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{prefix}{}", hex::encode(bytes))
}

/// Syntactic email check: one `@`, a non-empty local part, a dotted domain,
/// no whitespace. Deliverability is the email collaborator's problem.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain needs an interior dot
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Pre-flight validation for invitation creation.
///
/// Composes the syntactic email check with a non-consuming rate-limit peek
/// and aggregates every failure into one report for the form to render.
pub fn validate_invitation_creation(
    limiter: &RateLimiter,
    session_id: &str,
    advisor_email: &str,
    client_id: &str,
) -> ValidationReport {
    let mut errors = Vec::new();

    if session_id.trim().is_empty() {
        errors.push("session id is required".to_string());
    }

    if !is_valid_email(advisor_email) {
        errors.push(format!("invalid advisor email: {advisor_email}"));
    }

    let decision = limiter.peek(client_id);
    if !decision.allowed {
        errors.push(format!(
            "too many invitations created, retry in {}s",
            decision.retry_after_secs.unwrap_or_default()
        ));
    }

    ValidationReport::from_errors(errors)
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_tokens_are_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let token = generate_secure_token(INVITATION_TOKEN_PREFIX);
            assert!(token.starts_with(INVITATION_TOKEN_PREFIX));
            assert!(seen.insert(token), "token collision");
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("maya@example.com"));
        assert!(is_valid_email("first.last@sub.example.org"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("maya@"));
        assert!(!is_valid_email("maya@nodot"));
        assert!(!is_valid_email("maya smith@example.com"));
        assert!(!is_valid_email("maya@.example.com"));
    }

    #[test]
    fn test_rate_limiter_blocks_after_threshold() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            max_attempts: 3,
        });

        for _ in 0..3 {
            assert!(limiter.check_and_record("10.0.0.1").allowed);
        }

        let blocked = limiter.check_and_record("10.0.0.1");
        assert!(!blocked.allowed);
        assert!(blocked.retry_after_secs.unwrap_or_default() >= 1);

        // Other clients are unaffected
        assert!(limiter.check_and_record("10.0.0.2").allowed);
    }

    #[test]
    fn test_peek_does_not_consume_a_slot() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            max_attempts: 1,
        });

        assert!(limiter.peek("client").allowed);
        assert!(limiter.peek("client").allowed);
        assert!(limiter.check_and_record("client").allowed);
        assert!(!limiter.peek("client").allowed);
    }

    #[test]
    fn test_rate_limiter_is_safe_under_concurrent_callers() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            max_attempts: 8,
        }));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.check_and_record("shared").allowed)
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().expect("limiter thread panicked"))
            .filter(|&allowed| allowed)
            .count();
        assert_eq!(allowed, 8);
    }

    #[test]
    fn test_validate_invitation_creation_aggregates_errors() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            max_attempts: 1,
        });
        limiter.check_and_record("203.0.113.9");

        let report =
            validate_invitation_creation(&limiter, "", "not-an-email", "203.0.113.9");
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);

        let ok = validate_invitation_creation(
            &limiter,
            "session_1",
            "advisor@example.com",
            "198.51.100.4",
        );
        assert!(ok.is_valid);
    }
}
