//! Invite tokens, links and the invitation mail text.
//!
//! Delivery is left to whatever mail collaborator the host application has;
//! this module only produces the record and the message.

use jiff::{Timestamp, ToSpan};
use serde::Serialize;

use crate::{
    error::{Result, TrackerError},
    models::{Invite, InviteId, InviteStatus, ProjectId, Role, UserId},
};

/// Length of an invite token.
pub const TOKEN_LEN: usize = 40;

/// Days an invite stays usable.
pub const INVITE_TTL_DAYS: i64 = 7;

/// Random alphanumeric token of [`TOKEN_LEN`] characters.
pub fn generate_token() -> String {
    let mut token = uuid::Uuid::new_v4().simple().to_string();
    token.push_str(&uuid::Uuid::new_v4().simple().to_string());
    token.truncate(TOKEN_LEN);
    token
}

/// Link the invitee opens to join.
pub fn invite_link(base_url: &str, project_id: &ProjectId, token: &str) -> String {
    format!(
        "{}/projects/{}?invite={}",
        base_url.trim_end_matches('/'),
        project_id,
        token
    )
}

/// Build a fresh pending invite.
pub fn new_invite(
    project_id: &ProjectId,
    email: &str,
    role: Role,
    created_by: &UserId,
    now: Timestamp,
) -> Result<Invite> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(TrackerError::invalid_input("email")
            .with_reason(format!("'{email}' is not an email address")));
    }
    if role == Role::Owner {
        return Err(TrackerError::invalid_input("role").with_reason("Invites cannot grant the owner role"));
    }
    let expires_at = now
        .checked_add((INVITE_TTL_DAYS * 24).hours())
        .map_err(|e| TrackerError::Configuration {
            message: format!("Invalid invite expiry: {e}"),
        })?;

    Ok(Invite {
        id: InviteId::generate(),
        project_id: project_id.clone(),
        email: email.to_lowercase(),
        role,
        status: InviteStatus::Pending,
        token: generate_token(),
        created_by: created_by.clone(),
        created_at: now,
        expires_at,
        accepted_at: None,
    })
}

/// Subject and bodies of an invitation mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl InvitationMessage {
    /// Compose the mail. Missing names fall back to generic wording.
    pub fn compose(
        inviter: Option<&str>,
        project_title: Option<&str>,
        role: Option<Role>,
        link: &str,
        expires_at: Option<Timestamp>,
    ) -> Self {
        let inviter = inviter.filter(|s| !s.trim().is_empty()).unwrap_or("A teammate");
        let project_title = project_title.filter(|s| !s.trim().is_empty());

        let subject = format!(
            "You're invited to {}",
            project_title.unwrap_or("a StepTags project")
        );
        let as_role = role.map(|r| format!(" as {r}")).unwrap_or_default();
        let to_project = project_title.map(|t| format!(" to {t}")).unwrap_or_default();
        let expiry = expires_at
            .map(|at| format!("This invite may expire on {at}."))
            .unwrap_or_default();

        let text = [
            format!("{inviter} invited you{as_role}{to_project}."),
            format!("Open the link to join: {link}"),
            expiry.clone(),
            String::new(),
            "If you did not expect this email, you can ignore it.".to_string(),
        ]
        .join("\n");

        let html_role = role.map(|r| format!(" as <b>{r}</b>")).unwrap_or_default();
        let html_project = project_title
            .map(|t| format!(" to <b>{}</b>", escape_html(t)))
            .unwrap_or_default();
        let html_expiry = if expiry.is_empty() {
            String::new()
        } else {
            format!("<p>{expiry}</p>")
        };
        let html = format!(
            "<h2>StepTags invitation</h2>\n<p>{}{html_role}{html_project}.</p>\n<p><a href=\"{}\">Accept invitation</a></p>\n{html_expiry}\n<p>If you did not expect this email, ignore it.</p>",
            escape_html(inviter),
            escape_html(link),
        );

        Self { subject, text, html }
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_invite_link() {
        let link = invite_link("https://example.com/", &ProjectId::from("p1"), "abc");
        assert_eq!(link, "https://example.com/projects/p1?invite=abc");
    }

    #[test]
    fn test_new_invite_expires_in_seven_days() {
        let now: Timestamp = "2026-01-01T00:00:00Z".parse().unwrap();
        let invite = new_invite(&ProjectId::from("p1"), " Ada@Example.com ", Role::Member, &UserId::from("u1"), now)
            .unwrap();
        assert_eq!(invite.email, "ada@example.com");
        assert_eq!(invite.expires_at, "2026-01-08T00:00:00Z".parse::<Timestamp>().unwrap());
        assert!(invite.is_usable(now));
        assert!(!invite.is_usable(invite.expires_at));
    }

    #[test]
    fn test_new_invite_rejects_bad_input() {
        let now = Timestamp::now();
        let project = ProjectId::from("p1");
        let user = UserId::from("u1");
        assert!(new_invite(&project, "nobody", Role::Member, &user, now).is_err());
        assert!(new_invite(&project, "a@b.c", Role::Owner, &user, now).is_err());
    }

    #[test]
    fn test_compose_full_message() {
        let expires: Timestamp = "2026-01-08T00:00:00Z".parse().unwrap();
        let msg = InvitationMessage::compose(
            Some("Ada"),
            Some("Launch"),
            Some(Role::Admin),
            "https://x/projects/p1?invite=t",
            Some(expires),
        );
        assert_eq!(msg.subject, "You're invited to Launch");
        assert_eq!(
            msg.text,
            "Ada invited you as admin to Launch.\n\
             Open the link to join: https://x/projects/p1?invite=t\n\
             This invite may expire on 2026-01-08T00:00:00Z.\n\
             \n\
             If you did not expect this email, you can ignore it."
        );
        assert!(msg.html.contains("<b>Launch</b>"));
    }

    #[test]
    fn test_compose_falls_back_to_generic_wording() {
        let msg = InvitationMessage::compose(None, None, None, "L", None);
        assert_eq!(msg.subject, "You're invited to a StepTags project");
        assert!(msg.text.starts_with("A teammate invited you.\nOpen the link to join: L\n\n"));
    }
}
