//! Email dispatch contract.
//!
//! Invitation and reminder emails go out through an external collaborator
//! behind [`EmailDispatcher`]. The service bounds every dispatch with a
//! timeout; a failed or timed-out dispatch must leave the invitation in
//! `draft`, so implementations only report success after handoff.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::types::{AdvisorInvitation, SenderProfile};

/// Errors from the email collaborator
#[derive(Debug, Clone, Error)]
pub enum EmailError {
    /// The provider rejected or failed the send
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// The send did not complete within the configured timeout
    #[error("dispatch timed out")]
    Timeout,
}

/// Which email is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    Invitation,
    Reminder,
}

impl EmailTemplate {
    /// Stable template identifier understood by the provider
    pub const fn template_id(self) -> &'static str {
        match self {
            Self::Invitation => "advisor_invitation",
            Self::Reminder => "advisor_reminder",
        }
    }
}

/// Values rendered into an invitation or reminder template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateParams {
    pub advisor_name: String,
    pub sender_name: String,
    pub sender_title: Option<String>,
    pub company_name: Option<String>,
    pub personal_message: Option<String>,

    /// Token the advisor's response-form link carries
    pub response_token: String,
}

impl TemplateParams {
    /// Build params for an invitation (or reminder) to this advisor
    pub fn for_invitation(invitation: &AdvisorInvitation, sender: &SenderProfile) -> Self {
        Self {
            advisor_name: invitation.advisor_name.clone(),
            sender_name: sender.user_name.clone(),
            sender_title: sender.user_title.clone(),
            company_name: sender.company_name.clone(),
            personal_message: invitation.personal_message.clone(),
            response_token: invitation.access_token.clone(),
        }
    }
}

/// External email collaborator.
///
/// `send` resolves `Ok` only once the message is accepted by the provider.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(
        &self,
        to_address: &str,
        template: EmailTemplate,
        params: &TemplateParams,
    ) -> Result<(), EmailError>;
}

/// Dispatcher that logs and succeeds. Used in dev mode and by screens
/// running against a device with no mail capability.
pub struct NoopDispatcher;

#[async_trait]
impl EmailDispatcher for NoopDispatcher {
    async fn send(
        &self,
        to_address: &str,
        template: EmailTemplate,
        _params: &TemplateParams,
    ) -> Result<(), EmailError> {
        info!(to = to_address, template = template.template_id(), "email dispatch (noop)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::types::{NewInvitation, RelationshipType};

    #[tokio::test]
    async fn test_noop_dispatcher_accepts_sends() {
        let invitation = AdvisorInvitation::new(
            "inv_1".to_string(),
            "invitation_tok".to_string(),
            NewInvitation {
                session_id: "session_1".to_string(),
                advisor_name: "Maya Chen".to_string(),
                advisor_email: "maya@example.com".to_string(),
                advisor_phone: None,
                relationship_type: RelationshipType::Mentor,
                personal_message: None,
                include_personal_message: false,
            },
        );
        let sender = SenderProfile {
            user_name: "Jordan Lee".to_string(),
            user_title: Some("Product Manager".to_string()),
            company_name: None,
        };

        let params = TemplateParams::for_invitation(&invitation, &sender);
        assert_eq!(params.response_token, "invitation_tok");
        assert_eq!(params.advisor_name, "Maya Chen");

        let result = NoopDispatcher
            .send(&invitation.advisor_email, EmailTemplate::Invitation, &params)
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_template_ids() {
        assert_eq!(EmailTemplate::Invitation.template_id(), "advisor_invitation");
        assert_eq!(EmailTemplate::Reminder.template_id(), "advisor_reminder");
    }
}
