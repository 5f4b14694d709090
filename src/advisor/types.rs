//! Invitation and response records.
//!
//! Plain data with an enforced status lifecycle. Status moves are monotonic
//! forward; `declined` and `expired` are terminal. Every enum carries a
//! static metadata table so display strings and credibility weights live
//! next to the variant instead of in presentation-layer switches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{collections, RecordSchema};
use crate::types::AdvisorError;

// ============================================================================
// Enums and metadata tables
// ============================================================================

/// How the advisor knows the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Manager,
    Colleague,
    Mentor,
    Friend,
    Family,
    Client,
    Sponsor,
    Peer,
    Other,
}

/// Display metadata for a relationship type
#[derive(Debug, Clone, Copy)]
pub struct RelationshipMeta {
    pub label: &'static str,
}

impl RelationshipType {
    pub const fn metadata(self) -> RelationshipMeta {
        match self {
            Self::Manager => RelationshipMeta { label: "Manager" },
            Self::Colleague => RelationshipMeta { label: "Colleague" },
            Self::Mentor => RelationshipMeta { label: "Mentor" },
            Self::Friend => RelationshipMeta { label: "Friend" },
            Self::Family => RelationshipMeta { label: "Family" },
            Self::Client => RelationshipMeta { label: "Client" },
            Self::Sponsor => RelationshipMeta { label: "Sponsor" },
            Self::Peer => RelationshipMeta { label: "Peer" },
            Self::Other => RelationshipMeta { label: "Other" },
        }
    }

    pub const fn label(self) -> &'static str {
        self.metadata().label
    }
}

/// Invitation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Draft,
    Sent,
    Viewed,
    Completed,
    Declined,
    Expired,
}

/// Display metadata for an invitation status
#[derive(Debug, Clone, Copy)]
pub struct StatusMeta {
    pub label: &'static str,
    pub is_terminal: bool,
}

impl InvitationStatus {
    pub const fn metadata(self) -> StatusMeta {
        match self {
            Self::Draft => StatusMeta {
                label: "Draft",
                is_terminal: false,
            },
            Self::Sent => StatusMeta {
                label: "Sent",
                is_terminal: false,
            },
            Self::Viewed => StatusMeta {
                label: "Viewed",
                is_terminal: false,
            },
            Self::Completed => StatusMeta {
                label: "Completed",
                is_terminal: true,
            },
            Self::Declined => StatusMeta {
                label: "Declined",
                is_terminal: true,
            },
            Self::Expired => StatusMeta {
                label: "Expired",
                is_terminal: true,
            },
        }
    }

    pub const fn is_terminal(self) -> bool {
        self.metadata().is_terminal
    }

    /// Legal forward moves. Skipping `viewed` is allowed (an advisor can
    /// submit from a client that never reported the view event); moving
    /// backward or out of a terminal state is not.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Sent)
                | (Self::Draft, Self::Declined)
                | (Self::Draft, Self::Expired)
                | (Self::Sent, Self::Viewed)
                | (Self::Sent, Self::Completed)
                | (Self::Sent, Self::Declined)
                | (Self::Sent, Self::Expired)
                | (Self::Viewed, Self::Completed)
                | (Self::Viewed, Self::Declined)
                | (Self::Viewed, Self::Expired)
        )
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.metadata().label)
    }
}

/// How long the advisor has observed the user's work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationPeriod {
    UnderSixMonths,
    SixToTwelveMonths,
    OneToThreeYears,
    OverThreeYears,
}

/// Metadata for an observation period
#[derive(Debug, Clone, Copy)]
pub struct ObservationMeta {
    pub label: &'static str,
    /// Longer observation earns more credibility in the feedback summary
    pub credibility_weight: f64,
}

impl ObservationPeriod {
    pub const fn metadata(self) -> ObservationMeta {
        match self {
            Self::UnderSixMonths => ObservationMeta {
                label: "Less than 6 months",
                credibility_weight: 0.5,
            },
            Self::SixToTwelveMonths => ObservationMeta {
                label: "6-12 months",
                credibility_weight: 0.7,
            },
            Self::OneToThreeYears => ObservationMeta {
                label: "1-3 years",
                credibility_weight: 0.9,
            },
            Self::OverThreeYears => ObservationMeta {
                label: "More than 3 years",
                credibility_weight: 1.0,
            },
        }
    }
}

/// The setting the advisor's confidence comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceContext {
    DirectCollaboration,
    SameTeam,
    OccasionalInteraction,
    SecondhandObservation,
}

/// Metadata for a confidence context
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceMeta {
    pub label: &'static str,
    pub credibility_weight: f64,
}

impl ConfidenceContext {
    pub const fn metadata(self) -> ConfidenceMeta {
        match self {
            Self::DirectCollaboration => ConfidenceMeta {
                label: "Worked together directly",
                credibility_weight: 1.0,
            },
            Self::SameTeam => ConfidenceMeta {
                label: "Same team",
                credibility_weight: 0.9,
            },
            Self::OccasionalInteraction => ConfidenceMeta {
                label: "Occasional interaction",
                credibility_weight: 0.7,
            },
            Self::SecondhandObservation => ConfidenceMeta {
                label: "Secondhand observation",
                credibility_weight: 0.5,
            },
        }
    }
}

// ============================================================================
// Invitation record
// ============================================================================

/// Parameters for creating an invitation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvitation {
    pub session_id: String,
    pub advisor_name: String,
    pub advisor_email: String,
    pub advisor_phone: Option<String>,
    pub relationship_type: RelationshipType,
    pub personal_message: Option<String>,
    /// When false, any personal message is dropped at creation
    pub include_personal_message: bool,
}

/// The user's identity details rendered into invitation emails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderProfile {
    pub user_name: String,
    pub user_title: Option<String>,
    pub company_name: Option<String>,
}

/// An advisor invitation tracked from draft to a terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorInvitation {
    pub id: String,
    pub session_id: String,
    pub advisor_name: String,
    pub advisor_email: String,
    pub advisor_phone: Option<String>,
    pub relationship_type: RelationshipType,
    pub personal_message: Option<String>,

    /// Token embedded in the advisor's response-form link
    pub access_token: String,

    pub status: InvitationStatus,

    /// Reminders sent; only grows while the invitation awaits a response
    pub reminder_count: u32,

    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AdvisorInvitation {
    /// Create a draft invitation
    pub fn new(id: String, access_token: String, params: NewInvitation) -> Self {
        let personal_message = if params.include_personal_message {
            params.personal_message
        } else {
            None
        };

        Self {
            id,
            session_id: params.session_id,
            advisor_name: params.advisor_name,
            advisor_email: params.advisor_email,
            advisor_phone: params.advisor_phone,
            relationship_type: params.relationship_type,
            personal_message,
            access_token,
            status: InvitationStatus::Draft,
            reminder_count: 0,
            created_at: Utc::now(),
            sent_at: None,
            viewed_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the invitation is out with the advisor (sent or viewed)
    pub fn is_awaiting_response(&self) -> bool {
        matches!(self.status, InvitationStatus::Sent | InvitationStatus::Viewed)
    }

    fn transition(&mut self, next: InvitationStatus) -> Result<(), AdvisorError> {
        if !self.status.can_transition_to(next) {
            return Err(AdvisorError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Draft -> sent, stamping `sent_at`
    pub fn mark_sent(&mut self) -> Result<(), AdvisorError> {
        self.transition(InvitationStatus::Sent)?;
        self.sent_at = Some(Utc::now());
        Ok(())
    }

    /// Sent -> viewed; idempotent. Returns whether anything changed, and
    /// stamps `viewed_at` on the first call only.
    pub fn mark_viewed(&mut self) -> bool {
        if self.status != InvitationStatus::Sent {
            return false;
        }
        self.status = InvitationStatus::Viewed;
        self.viewed_at = Some(Utc::now());
        true
    }

    /// Sent/viewed -> completed, stamping `completed_at`
    pub fn mark_completed(&mut self) -> Result<(), AdvisorError> {
        self.transition(InvitationStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Any non-terminal state -> declined
    pub fn mark_declined(&mut self) -> Result<(), AdvisorError> {
        self.transition(InvitationStatus::Declined)
    }

    /// Any awaiting state -> expired
    pub fn mark_expired(&mut self) -> Result<(), AdvisorError> {
        self.transition(InvitationStatus::Expired)
    }

    /// Count a reminder; only legal while awaiting a response
    pub fn record_reminder(&mut self) -> bool {
        if !self.is_awaiting_response() {
            return false;
        }
        self.reminder_count += 1;
        true
    }

    /// Reference instant for staleness: last advisor-visible activity
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.viewed_at.or(self.sent_at)
    }
}

impl RecordSchema for AdvisorInvitation {
    const TYPE_ID: &'static str = "advisor_invitation";
    const COLLECTION: &'static str = collections::INVITATIONS;
}

// ============================================================================
// Response records
// ============================================================================

/// One answer in a submission, in form order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAnswer {
    pub question_id: String,
    pub response: String,
    /// Advisor's self-reported confidence, 1-5
    pub confidence_level: u8,
}

/// Everything an advisor submits when completing an invitation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub answers: Vec<ResponseAnswer>,
    pub observation_period: ObservationPeriod,
    pub confidence_context: ConfidenceContext,
    pub specific_examples: Vec<String>,
    pub additional_context: Option<String>,
    pub is_anonymous: bool,
}

/// A single persisted answer. One record per (invitation, question); never
/// mutated after creation, and the quality score is computed exactly once
/// at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorResponse {
    pub invitation_id: String,
    pub question_id: String,
    pub response: String,
    pub confidence_level: u8,
    pub response_quality_score: f64,
    pub specific_examples: Vec<String>,
    pub observation_period: ObservationPeriod,
    pub confidence_context: ConfidenceContext,
    pub additional_context: Option<String>,
    pub is_anonymous: bool,
    pub submitted_at: DateTime<Utc>,
}

impl AdvisorResponse {
    /// Store key enforcing one record per (invitation, question)
    pub fn store_key(&self) -> String {
        Self::key_for(&self.invitation_id, &self.question_id)
    }

    pub fn key_for(invitation_id: &str, question_id: &str) -> String {
        format!("{invitation_id}:{question_id}")
    }
}

impl RecordSchema for AdvisorResponse {
    const TYPE_ID: &'static str = "advisor_response";
    const COLLECTION: &'static str = collections::RESPONSES;
}
