//! Advisor feedback lifecycle.
//!
//! The single authority for creating, sending, and completing advisor
//! invitations, and for deriving analytics from the responses that come
//! back. The presentation layer calls the [`AdvisorService`] in-process;
//! persistence and email delivery are external collaborators behind traits.
//!
//! - **types**: invitation and response records, status lifecycle
//! - **service**: orchestration, per-session serialization, typed errors
//! - **analytics**: on-demand aggregation, never persisted
//! - **email**: dispatch contract and template parameters

pub mod analytics;
pub mod email;
pub mod service;
pub mod types;

pub use analytics::{AdvisorAnalytics, FeedbackSummary, ResponseTimeBucket};
pub use email::{EmailDispatcher, EmailError, EmailTemplate, NoopDispatcher, TemplateParams};
pub use service::{spawn_expiry_task, AdvisorService, AdvisorServiceConfig};
pub use types::{
    AdvisorInvitation, AdvisorResponse, ConfidenceContext, InvitationStatus, NewInvitation,
    ObservationPeriod, RelationshipType, ResponseAnswer, ResponseSubmission, SenderProfile,
};
