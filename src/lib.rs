//! Counsel - advisor feedback lifecycle for the Career Insight Engine
//!
//! Counsel is the in-process service layer behind the app's "ask your
//! advisors" flow: a user working through a career self-assessment invites a
//! handful of people who know their work, those advisors answer a short set
//! of questions, and the service turns the answers into analytics and a
//! feedback summary for the insight screens.
//!
//! ## Modules
//!
//! - **advisor**: invitation lifecycle, response submission, analytics
//! - **store**: record persistence contract, in-memory store, schema registry
//! - **validation**: free-text response validation and quality scoring
//! - **security**: invitation rate limiting and secure token generation
//! - **logging**: tracing subscriber setup for host applications

pub mod advisor;
pub mod logging;
pub mod security;
pub mod store;
pub mod types;
pub mod validation;

pub use advisor::{
    AdvisorAnalytics, AdvisorInvitation, AdvisorResponse, AdvisorService, AdvisorServiceConfig,
    EmailDispatcher, FeedbackSummary, InvitationStatus, NewInvitation, RelationshipType,
    ResponseSubmission, SenderProfile,
};
pub use types::{AdvisorError, Result};
