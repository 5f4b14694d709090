//! Shared error and result types for the advisor service.

use thiserror::Error;

use crate::advisor::email::EmailError;
use crate::advisor::types::InvitationStatus;
use crate::store::StoreError;

/// Errors surfaced by advisor lifecycle operations.
///
/// Validation failures (limit, duplicate, not-found) are reported to the
/// caller without internal retry; the presentation layer decides whether to
/// surface a message or offer a retry affordance.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The session already holds the configured maximum of invitations
    #[error("advisor limit reached: session already has {limit} invitations")]
    AdvisorLimitExceeded { limit: usize },

    /// An invitation for this advisor email already exists in the session
    #[error("advisor already invited: {email}")]
    DuplicateAdvisor { email: String },

    /// No invitation with the given id
    #[error("invitation not found: {id}")]
    InvitationNotFound { id: String },

    /// Input failed one or more validation checks
    #[error("validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    /// The requested status change is not a legal lifecycle move
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: InvitationStatus,
        to: InvitationStatus,
    },

    /// The client has exceeded the invitation-creation rate limit
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The email collaborator failed or timed out
    #[error("email dispatch failed: {0}")]
    EmailDispatch(#[from] EmailError),

    /// The record store collaborator failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AdvisorError>;
