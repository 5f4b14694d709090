//! Advisor analytics and feedback summary.
//!
//! Derived on demand from a session's invitations and responses, never
//! persisted. Computation is pure over plain records so the insight screens
//! get unit-testable numbers without touching the store.
//!
//! Rates are fractions in `[0, 1]` and do not have to sum to one: viewed and
//! expired invitations count toward the total but toward none of the
//! completion/decline/pending buckets.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::types::{AdvisorInvitation, AdvisorResponse, InvitationStatus, RelationshipType};

/// Elapsed time between sending an invitation and receiving its responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseTimeBucket {
    UnderOneDay,
    OneToThreeDays,
    ThreeToSevenDays,
    OverOneWeek,
}

impl ResponseTimeBucket {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        let days = elapsed.num_days();
        if days < 1 {
            Self::UnderOneDay
        } else if days < 3 {
            Self::OneToThreeDays
        } else if days < 7 {
            Self::ThreeToSevenDays
        } else {
            Self::OverOneWeek
        }
    }
}

/// Aggregated view of a session's advisor outreach
#[derive(Debug, Clone, Serialize)]
pub struct AdvisorAnalytics {
    pub total_invitations: usize,
    pub completed_invitations: usize,
    /// Draft or sent: still actionable by the user or the advisor
    pub pending_invitations: usize,
    pub declined_invitations: usize,
    pub expired_invitations: usize,

    pub completion_rate: f64,
    pub decline_rate: f64,
    pub pending_rate: f64,

    pub by_relationship: HashMap<RelationshipType, usize>,
    pub response_times: HashMap<ResponseTimeBucket, usize>,

    pub average_response_quality: f64,
    pub average_confidence: f64,
}

impl AdvisorAnalytics {
    /// Analytics for a session with no invitations
    pub fn empty() -> Self {
        Self {
            total_invitations: 0,
            completed_invitations: 0,
            pending_invitations: 0,
            declined_invitations: 0,
            expired_invitations: 0,
            completion_rate: 0.0,
            decline_rate: 0.0,
            pending_rate: 0.0,
            by_relationship: HashMap::new(),
            response_times: HashMap::new(),
            average_response_quality: 0.0,
            average_confidence: 0.0,
        }
    }

    /// Aggregate a session's invitations and their responses
    pub fn compute(invitations: &[AdvisorInvitation], responses: &[AdvisorResponse]) -> Self {
        if invitations.is_empty() {
            return Self::empty();
        }

        let total = invitations.len();
        let mut completed = 0;
        let mut pending = 0;
        let mut declined = 0;
        let mut expired = 0;
        let mut by_relationship: HashMap<RelationshipType, usize> = HashMap::new();
        let mut response_times: HashMap<ResponseTimeBucket, usize> = HashMap::new();

        for invitation in invitations {
            *by_relationship.entry(invitation.relationship_type).or_default() += 1;

            match invitation.status {
                InvitationStatus::Completed => {
                    completed += 1;
                    if let (Some(sent), Some(done)) = (invitation.sent_at, invitation.completed_at)
                    {
                        let bucket = ResponseTimeBucket::from_elapsed(done - sent);
                        *response_times.entry(bucket).or_default() += 1;
                    }
                }
                InvitationStatus::Draft | InvitationStatus::Sent => pending += 1,
                InvitationStatus::Declined => declined += 1,
                InvitationStatus::Expired => expired += 1,
                InvitationStatus::Viewed => {}
            }
        }

        let rate = |count: usize| count as f64 / total as f64;

        Self {
            total_invitations: total,
            completed_invitations: completed,
            pending_invitations: pending,
            declined_invitations: declined,
            expired_invitations: expired,
            completion_rate: rate(completed),
            decline_rate: rate(declined),
            pending_rate: rate(pending),
            by_relationship,
            response_times,
            average_response_quality: mean(responses.iter().map(|r| r.response_quality_score)),
            average_confidence: mean(responses.iter().map(|r| f64::from(r.confidence_level))),
        }
    }
}

/// What the insight screens show once feedback starts coming in
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSummary {
    /// Distinguishes an empty session from one with real feedback
    pub has_responses: bool,
    pub response_count: usize,
    /// Advisors whose invitations reached `completed`
    pub advisor_count: usize,
    pub average_quality: f64,
    pub average_confidence: f64,

    /// Confidence weighted by observation period and context, `[0, 1]`
    pub credibility_score: f64,

    /// Relationship labels represented among completed invitations
    pub relationship_types: Vec<&'static str>,
}

impl FeedbackSummary {
    pub fn empty() -> Self {
        Self {
            has_responses: false,
            response_count: 0,
            advisor_count: 0,
            average_quality: 0.0,
            average_confidence: 0.0,
            credibility_score: 0.0,
            relationship_types: Vec::new(),
        }
    }

    /// Summarize a session's completed feedback
    pub fn compute(invitations: &[AdvisorInvitation], responses: &[AdvisorResponse]) -> Self {
        if responses.is_empty() {
            return Self::empty();
        }

        let completed: Vec<&AdvisorInvitation> = invitations
            .iter()
            .filter(|i| i.status == InvitationStatus::Completed)
            .collect();

        let mut relationship_types: Vec<&'static str> = completed
            .iter()
            .map(|i| i.relationship_type.label())
            .collect();
        relationship_types.sort_unstable();
        relationship_types.dedup();

        let credibility = mean(responses.iter().map(|r| {
            let confidence = f64::from(r.confidence_level) / 5.0;
            let observation = r.observation_period.metadata().credibility_weight;
            let context = r.confidence_context.metadata().credibility_weight;
            (confidence * observation * context).clamp(0.0, 1.0)
        }));

        Self {
            has_responses: true,
            response_count: responses.len(),
            advisor_count: completed.len(),
            average_quality: mean(responses.iter().map(|r| r.response_quality_score)),
            average_confidence: mean(responses.iter().map(|r| f64::from(r.confidence_level))),
            credibility_score: credibility,
            relationship_types,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::types::{ConfidenceContext, NewInvitation, ObservationPeriod};
    use chrono::Utc;

    fn invitation(session: &str, email: &str, relationship: RelationshipType) -> AdvisorInvitation {
        AdvisorInvitation::new(
            format!("inv_{email}"),
            format!("invitation_{email}"),
            NewInvitation {
                session_id: session.to_string(),
                advisor_name: email.to_string(),
                advisor_email: email.to_string(),
                advisor_phone: None,
                relationship_type: relationship,
                personal_message: None,
                include_personal_message: false,
            },
        )
    }

    fn response(invitation_id: &str, question_id: &str, quality: f64, confidence: u8) -> AdvisorResponse {
        AdvisorResponse {
            invitation_id: invitation_id.to_string(),
            question_id: question_id.to_string(),
            response: "detailed enough".to_string(),
            confidence_level: confidence,
            response_quality_score: quality,
            specific_examples: Vec::new(),
            observation_period: ObservationPeriod::OneToThreeYears,
            confidence_context: ConfidenceContext::DirectCollaboration,
            additional_context: None,
            is_anonymous: false,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_session_yields_zeroed_analytics() {
        let analytics = AdvisorAnalytics::compute(&[], &[]);
        assert_eq!(analytics.total_invitations, 0);
        assert_eq!(analytics.completion_rate, 0.0);
        assert_eq!(analytics.decline_rate, 0.0);
        assert!(analytics.by_relationship.is_empty());
    }

    #[test]
    fn test_counts_and_rates() {
        let mut completed = invitation("s1", "a@example.com", RelationshipType::Manager);
        completed.mark_sent().unwrap();
        completed.mark_completed().unwrap();

        let mut declined = invitation("s1", "b@example.com", RelationshipType::Peer);
        declined.mark_sent().unwrap();
        declined.mark_declined().unwrap();

        let mut viewed = invitation("s1", "c@example.com", RelationshipType::Peer);
        viewed.mark_sent().unwrap();
        viewed.mark_viewed();

        let pending = invitation("s1", "d@example.com", RelationshipType::Mentor);

        let invitations = vec![completed, declined, viewed, pending];
        let responses = vec![response("inv_a@example.com", "q1", 0.8, 4)];

        let analytics = AdvisorAnalytics::compute(&invitations, &responses);
        assert_eq!(analytics.total_invitations, 4);
        assert_eq!(analytics.completed_invitations, 1);
        assert_eq!(analytics.declined_invitations, 1);
        assert_eq!(analytics.pending_invitations, 1);
        assert_eq!(analytics.completion_rate, 0.25);
        assert_eq!(analytics.decline_rate, 0.25);
        assert_eq!(analytics.pending_rate, 0.25);

        // Viewed counts toward the total but no rate bucket
        let bucket_sum =
            analytics.completion_rate + analytics.decline_rate + analytics.pending_rate;
        assert!(bucket_sum < 1.0);

        assert_eq!(analytics.by_relationship[&RelationshipType::Peer], 2);
        assert_eq!(analytics.average_response_quality, 0.8);
        assert_eq!(analytics.average_confidence, 4.0);
    }

    #[test]
    fn test_response_time_buckets() {
        assert_eq!(
            ResponseTimeBucket::from_elapsed(Duration::hours(5)),
            ResponseTimeBucket::UnderOneDay
        );
        assert_eq!(
            ResponseTimeBucket::from_elapsed(Duration::days(2)),
            ResponseTimeBucket::OneToThreeDays
        );
        assert_eq!(
            ResponseTimeBucket::from_elapsed(Duration::days(5)),
            ResponseTimeBucket::ThreeToSevenDays
        );
        assert_eq!(
            ResponseTimeBucket::from_elapsed(Duration::days(10)),
            ResponseTimeBucket::OverOneWeek
        );

        let mut completed = invitation("s1", "a@example.com", RelationshipType::Manager);
        completed.mark_sent().unwrap();
        completed.mark_completed().unwrap();
        let analytics = AdvisorAnalytics::compute(&[completed], &[]);
        assert_eq!(analytics.response_times[&ResponseTimeBucket::UnderOneDay], 1);
    }

    #[test]
    fn test_summary_empty_when_no_responses() {
        let pending = invitation("s1", "a@example.com", RelationshipType::Manager);
        let summary = FeedbackSummary::compute(&[pending], &[]);
        assert!(!summary.has_responses);
        assert_eq!(summary.response_count, 0);
        assert_eq!(summary.credibility_score, 0.0);
    }

    #[test]
    fn test_summary_aggregates_quality_and_credibility() {
        let mut completed = invitation("s1", "a@example.com", RelationshipType::Manager);
        completed.mark_sent().unwrap();
        completed.mark_completed().unwrap();
        let invitation_id = completed.id.clone();

        let responses = vec![
            response(&invitation_id, "q1", 0.9, 5),
            response(&invitation_id, "q2", 0.7, 3),
        ];

        let summary = FeedbackSummary::compute(&[completed], &responses);
        assert!(summary.has_responses);
        assert_eq!(summary.response_count, 2);
        assert_eq!(summary.advisor_count, 1);
        assert!((summary.average_quality - 0.8).abs() < 1e-9);
        assert!((summary.average_confidence - 4.0).abs() < 1e-9);

        // 1-3 years direct collaboration: weight 0.9, mean confidence 0.8
        assert!((summary.credibility_score - 0.8 * 0.9).abs() < 1e-9);
        assert_eq!(summary.relationship_types, vec!["Manager"]);
    }
}
