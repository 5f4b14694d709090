//! Advisor service.
//!
//! Single authority for the invitation lifecycle: creation, email dispatch,
//! view tracking, response submission, reminders, expiry, and the derived
//! analytics the insight screens render. Every multi-step write runs under a
//! per-session lock so concurrent calls cannot slip past the duplicate and
//! limit checks together.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::security::{
    self, RateLimitConfig, RateLimiter, INVITATION_TOKEN_PREFIX,
};
use crate::store::{RecordStore, SchemaRegistry, TypedCollection};
use crate::types::{AdvisorError, Result};
use crate::validation;

use super::analytics::{AdvisorAnalytics, FeedbackSummary};
use super::email::{EmailDispatcher, EmailError, EmailTemplate, TemplateParams};
use super::types::{
    AdvisorInvitation, AdvisorResponse, InvitationStatus, NewInvitation, ResponseSubmission,
    SenderProfile,
};

/// Advisor service tuning.
///
/// The invitation cap and rate-limit thresholds are deliberate configuration
/// rather than hard-coded rules; the defaults match product behavior (a
/// session's fifth invitation is rejected).
#[derive(Debug, Clone)]
pub struct AdvisorServiceConfig {
    /// Invitations allowed per session
    pub max_advisors_per_session: usize,

    /// Reminders allowed per invitation
    pub max_reminders_per_invitation: u32,

    /// How long a sent invitation waits before the expiry sweep claims it
    pub invitation_ttl: Duration,

    /// Upper bound on a single email dispatch
    pub email_timeout: Duration,

    /// Invitation-creation rate limit
    pub rate_limit: RateLimitConfig,
}

impl Default for AdvisorServiceConfig {
    fn default() -> Self {
        Self {
            max_advisors_per_session: 4,
            max_reminders_per_invitation: 3,
            invitation_ttl: Duration::from_secs(14 * 24 * 60 * 60), // 14 days
            email_timeout: Duration::from_secs(10),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Advisor feedback lifecycle service
pub struct AdvisorService {
    config: AdvisorServiceConfig,

    invitations: TypedCollection<AdvisorInvitation>,
    responses: TypedCollection<AdvisorResponse>,

    dispatcher: Arc<dyn EmailDispatcher>,
    rate_limiter: RateLimiter,

    /// Serializes check-then-write operations per session
    session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AdvisorService {
    /// Wire the service to its collaborators.
    ///
    /// Registers both record schemas; registration is idempotent so several
    /// services may share one registry.
    pub fn new(
        store: Arc<dyn RecordStore>,
        registry: Arc<SchemaRegistry>,
        dispatcher: Arc<dyn EmailDispatcher>,
        config: AdvisorServiceConfig,
    ) -> Self {
        let invitations = TypedCollection::new(Arc::clone(&store), Arc::clone(&registry));
        let responses = TypedCollection::new(store, registry);
        let rate_limiter = RateLimiter::new(config.rate_limit.clone());

        Self {
            config,
            invitations,
            responses,
            dispatcher,
            rate_limiter,
            session_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AdvisorServiceConfig {
        &self.config
    }

    /// The rate limiter, for form pre-flight checks
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    async fn require_invitation(&self, invitation_id: &str) -> Result<AdvisorInvitation> {
        self.invitations
            .get(invitation_id)
            .await?
            .ok_or_else(|| AdvisorError::InvitationNotFound {
                id: invitation_id.to_string(),
            })
    }

    /// Dispatch an email bounded by the configured timeout
    async fn dispatch(
        &self,
        to_address: &str,
        template: EmailTemplate,
        params: &TemplateParams,
    ) -> Result<()> {
        match timeout(
            self.config.email_timeout,
            self.dispatcher.send(to_address, template, params),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(to = to_address, error = %e, "email dispatch failed");
                Err(AdvisorError::EmailDispatch(e))
            }
            Err(_) => {
                warn!(to = to_address, "email dispatch timed out");
                Err(AdvisorError::EmailDispatch(EmailError::Timeout))
            }
        }
    }

    // ========================================================================
    // Invitation lifecycle
    // ========================================================================

    /// Create a draft invitation for a session.
    ///
    /// `client_id` identifies the caller (IP or device id) for rate limiting.
    /// Duplicate detection is case-insensitive on the advisor email and the
    /// session cap counts invitations in every status.
    pub async fn create_invitation(
        &self,
        params: NewInvitation,
        client_id: &str,
    ) -> Result<AdvisorInvitation> {
        let mut errors = Vec::new();
        if params.session_id.trim().is_empty() {
            errors.push("session id is required".to_string());
        }
        if params.advisor_name.trim().is_empty() {
            errors.push("advisor name is required".to_string());
        }
        if !security::is_valid_email(&params.advisor_email) {
            errors.push(format!("invalid advisor email: {}", params.advisor_email));
        }
        if !errors.is_empty() {
            return Err(AdvisorError::ValidationFailed { errors });
        }

        let decision = self.rate_limiter.check_and_record(client_id);
        if !decision.allowed {
            return Err(AdvisorError::RateLimited {
                retry_after_secs: decision.retry_after_secs.unwrap_or(1),
            });
        }

        let lock = self.session_lock(&params.session_id);
        let _guard = lock.lock().await;

        let existing = self.load_session_invitations(&params.session_id).await?;
        if let Some(duplicate) = existing
            .iter()
            .find(|i| i.advisor_email.eq_ignore_ascii_case(&params.advisor_email))
        {
            return Err(AdvisorError::DuplicateAdvisor {
                email: duplicate.advisor_email.clone(),
            });
        }
        if existing.len() >= self.config.max_advisors_per_session {
            return Err(AdvisorError::AdvisorLimitExceeded {
                limit: self.config.max_advisors_per_session,
            });
        }

        let id = format!("inv_{}", Uuid::new_v4());
        let access_token = security::generate_secure_token(INVITATION_TOKEN_PREFIX);
        let invitation = AdvisorInvitation::new(id, access_token, params);

        self.invitations.put(&invitation.id, &invitation).await?;
        info!(
            invitation = %invitation.id,
            session = %invitation.session_id,
            "created advisor invitation"
        );
        Ok(invitation)
    }

    /// Send the invitation email and move the invitation to `sent`.
    ///
    /// A failed or timed-out dispatch leaves the invitation in `draft`.
    pub async fn send_invitation_email(
        &self,
        invitation_id: &str,
        sender: &SenderProfile,
    ) -> Result<AdvisorInvitation> {
        let mut invitation = self.require_invitation(invitation_id).await?;
        if invitation.status != InvitationStatus::Draft {
            return Err(AdvisorError::InvalidTransition {
                from: invitation.status,
                to: InvitationStatus::Sent,
            });
        }

        let params = TemplateParams::for_invitation(&invitation, sender);
        self.dispatch(&invitation.advisor_email, EmailTemplate::Invitation, &params)
            .await?;

        invitation.mark_sent()?;
        self.invitations.put(&invitation.id, &invitation).await?;
        info!(invitation = %invitation.id, "invitation email sent");
        Ok(invitation)
    }

    /// Record that the advisor opened the response form.
    ///
    /// Idempotent: repeat calls, and calls after completion or a terminal
    /// state, change nothing.
    pub async fn mark_invitation_viewed(&self, invitation_id: &str) -> Result<AdvisorInvitation> {
        let mut invitation = self.require_invitation(invitation_id).await?;
        if invitation.mark_viewed() {
            self.invitations.put(&invitation.id, &invitation).await?;
            debug!(invitation = %invitation.id, "invitation viewed");
        }
        Ok(invitation)
    }

    /// Persist an advisor's answers and complete the invitation.
    ///
    /// Returns the created records in the order the answers were given. The
    /// whole write runs under the session lock, so readers never observe a
    /// partially submitted batch through service accessors.
    pub async fn submit_advisor_responses(
        &self,
        invitation_id: &str,
        submission: ResponseSubmission,
    ) -> Result<Vec<AdvisorResponse>> {
        // Resolve the session first so the lock can be taken; re-read inside
        // the lock for the status guard.
        let probe = self.require_invitation(invitation_id).await?;
        let lock = self.session_lock(&probe.session_id);
        let _guard = lock.lock().await;

        let mut invitation = self.require_invitation(invitation_id).await?;

        let mut errors = Vec::new();
        if submission.answers.is_empty() {
            errors.push("at least one answer is required".to_string());
        }
        let mut seen = HashSet::new();
        for answer in &submission.answers {
            if !seen.insert(answer.question_id.as_str()) {
                errors.push(format!("duplicate answer for question {}", answer.question_id));
            }
            if !(1..=5).contains(&answer.confidence_level) {
                errors.push(format!(
                    "confidence for question {} must be between 1 and 5",
                    answer.question_id
                ));
            }
        }
        if !errors.is_empty() {
            return Err(AdvisorError::ValidationFailed { errors });
        }

        if !invitation.status.can_transition_to(InvitationStatus::Completed) {
            return Err(AdvisorError::InvalidTransition {
                from: invitation.status,
                to: InvitationStatus::Completed,
            });
        }

        let submitted_at = Utc::now();
        let mut created = Vec::with_capacity(submission.answers.len());
        for answer in &submission.answers {
            let record = AdvisorResponse {
                invitation_id: invitation.id.clone(),
                question_id: answer.question_id.clone(),
                response: answer.response.clone(),
                confidence_level: answer.confidence_level,
                response_quality_score: validation::calculate_response_quality(&answer.response),
                specific_examples: submission.specific_examples.clone(),
                observation_period: submission.observation_period,
                confidence_context: submission.confidence_context,
                additional_context: submission.additional_context.clone(),
                is_anonymous: submission.is_anonymous,
                submitted_at,
            };
            self.responses.put(&record.store_key(), &record).await?;
            created.push(record);
        }

        invitation.mark_completed()?;
        self.invitations.put(&invitation.id, &invitation).await?;
        info!(
            invitation = %invitation.id,
            responses = created.len(),
            "advisor responses submitted"
        );
        Ok(created)
    }

    /// Record that the advisor declined. Terminal; repeat declines are a
    /// no-op rather than an error.
    pub async fn decline_invitation(&self, invitation_id: &str) -> Result<AdvisorInvitation> {
        let mut invitation = self.require_invitation(invitation_id).await?;
        if invitation.status == InvitationStatus::Declined {
            return Ok(invitation);
        }

        invitation.mark_declined()?;
        self.invitations.put(&invitation.id, &invitation).await?;
        info!(invitation = %invitation.id, "invitation declined");
        Ok(invitation)
    }

    /// Re-send the invitation as a reminder.
    ///
    /// Only legal while the invitation awaits a response, and bounded by the
    /// configured reminder cap.
    pub async fn send_reminder(
        &self,
        invitation_id: &str,
        sender: &SenderProfile,
    ) -> Result<AdvisorInvitation> {
        let mut invitation = self.require_invitation(invitation_id).await?;
        if !invitation.is_awaiting_response() {
            return Err(AdvisorError::ValidationFailed {
                errors: vec![format!(
                    "cannot remind an invitation in status {}",
                    invitation.status
                )],
            });
        }
        if invitation.reminder_count >= self.config.max_reminders_per_invitation {
            return Err(AdvisorError::ValidationFailed {
                errors: vec![format!(
                    "reminder limit of {} reached",
                    self.config.max_reminders_per_invitation
                )],
            });
        }

        let params = TemplateParams::for_invitation(&invitation, sender);
        self.dispatch(&invitation.advisor_email, EmailTemplate::Reminder, &params)
            .await?;

        invitation.record_reminder();
        self.invitations.put(&invitation.id, &invitation).await?;
        info!(
            invitation = %invitation.id,
            reminders = invitation.reminder_count,
            "reminder sent"
        );
        Ok(invitation)
    }

    /// Expire invitations that have waited past the configured TTL.
    ///
    /// Staleness is measured from the last advisor-visible activity (view if
    /// any, send otherwise). Returns how many invitations were expired.
    pub async fn expire_stale_invitations(&self) -> Result<usize> {
        let ttl = chrono::Duration::from_std(self.config.invitation_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(14));
        let cutoff = Utc::now() - ttl;

        let mut expired = 0;
        for mut invitation in self.invitations.get_all().await? {
            if !invitation.is_awaiting_response() {
                continue;
            }
            let stale = invitation
                .last_activity_at()
                .is_some_and(|at| at < cutoff);
            if stale && invitation.mark_expired().is_ok() {
                self.invitations.put(&invitation.id, &invitation).await?;
                expired += 1;
            }
        }

        if expired > 0 {
            info!(count = expired, "expired stale invitations");
        }
        Ok(expired)
    }

    /// Drop rate-limit windows that have gone quiet
    pub fn cleanup(&self) {
        self.rate_limiter.cleanup();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Fetch an invitation; absence is a normal result, not an error, so the
    /// screens can poll without error handling.
    pub async fn get_invitation_by_id(
        &self,
        invitation_id: &str,
    ) -> Result<Option<AdvisorInvitation>> {
        Ok(self.invitations.get(invitation_id).await?)
    }

    /// Resolve a response-form token to its invitation
    pub async fn get_invitation_by_token(
        &self,
        access_token: &str,
    ) -> Result<Option<AdvisorInvitation>> {
        Ok(self
            .invitations
            .get_all()
            .await?
            .into_iter()
            .find(|i| i.access_token == access_token))
    }

    /// All invitations for a session, most recently created first (ties
    /// broken by id so the order is stable).
    pub async fn get_invitations_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<AdvisorInvitation>> {
        let mut invitations = self.load_session_invitations(session_id).await?;
        invitations.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(invitations)
    }

    /// Responses recorded for one invitation, ordered by question id
    pub async fn get_responses_for_invitation(
        &self,
        invitation_id: &str,
    ) -> Result<Vec<AdvisorResponse>> {
        let mut responses: Vec<AdvisorResponse> = self
            .responses
            .get_all()
            .await?
            .into_iter()
            .filter(|r| r.invitation_id == invitation_id)
            .collect();
        responses.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        Ok(responses)
    }

    /// Aggregate analytics for a session. Never fails: a store problem is
    /// logged and the screens get zeroed analytics instead of an error.
    pub async fn get_advisor_analytics(&self, session_id: &str) -> AdvisorAnalytics {
        match self.load_session_records(session_id).await {
            Ok((invitations, responses)) => AdvisorAnalytics::compute(&invitations, &responses),
            Err(e) => {
                warn!(session = session_id, error = %e, "analytics degraded to empty");
                AdvisorAnalytics::empty()
            }
        }
    }

    /// Feedback summary for a session. Degrades to an empty summary on any
    /// store problem.
    pub async fn generate_feedback_summary(&self, session_id: &str) -> FeedbackSummary {
        match self.load_session_records(session_id).await {
            Ok((invitations, responses)) => FeedbackSummary::compute(&invitations, &responses),
            Err(e) => {
                warn!(session = session_id, error = %e, "feedback summary degraded to empty");
                FeedbackSummary::empty()
            }
        }
    }

    async fn load_session_invitations(&self, session_id: &str) -> Result<Vec<AdvisorInvitation>> {
        Ok(self
            .invitations
            .get_all()
            .await?
            .into_iter()
            .filter(|i| i.session_id == session_id)
            .collect())
    }

    async fn load_session_records(
        &self,
        session_id: &str,
    ) -> Result<(Vec<AdvisorInvitation>, Vec<AdvisorResponse>)> {
        let invitations = self.load_session_invitations(session_id).await?;
        let ids: HashSet<&str> = invitations.iter().map(|i| i.id.as_str()).collect();
        let responses = self
            .responses
            .get_all()
            .await?
            .into_iter()
            .filter(|r| ids.contains(r.invitation_id.as_str()))
            .collect();
        Ok((invitations, responses))
    }
}

/// Run the expiry sweep (and rate-limiter cleanup) on an interval
pub fn spawn_expiry_task(
    service: Arc<AdvisorService>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = service.expire_stale_invitations().await {
                warn!(error = %e, "expiry sweep failed");
            }
            service.cleanup();
        }
    })
}
