//! Membership and invite operations for the Tracker.

use jiff::Timestamp;
use serde::Serialize;
use serde_json::json;

use super::{
    permissions::{authorize, check_invite, check_removal, check_role_change, Access},
    Tracker,
};
use crate::{
    error::{Result, TrackerError},
    invite::{invite_link, new_invite, InvitationMessage},
    models::{
        ActivityKind, Invite, InviteId, InviteStatus, Membership, ProjectId, Role, UserId,
    },
};

/// A freshly created invite with everything needed to send it.
#[derive(Debug, Clone, Serialize)]
pub struct InviteCreated {
    pub invite: Invite,
    pub link: String,
    pub message: InvitationMessage,
}

impl Tracker {
    /// Active members of a project.
    pub async fn list_members(&self, project_id: &ProjectId) -> Result<Vec<Membership>> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();

        self.with_db(move |db| {
            authorize(db, &project_id, &user, Access::Read)?;
            db.list_members(&project_id)
        })
        .await
    }

    /// Invite someone by email. The returned message is ready to hand to a
    /// mail sender.
    pub async fn invite_member(&self, project_id: &ProjectId, email: &str, role: Role) -> Result<InviteCreated> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();
        let email = email.to_string();
        let base_url = self.invite_base_url.clone();

        self.with_db(move |db| {
            let actor = authorize(db, &project_id, &user, Access::Manage)?;
            check_invite(&actor, role)?;

            let invite = new_invite(&project_id, &email, role, &user, Timestamp::now())?;
            db.create_invite(&invite)?;
            db.log_activity(
                &project_id,
                Some(&user),
                ActivityKind::MemberInvited,
                "project_invites",
                &json!({ "email": invite.email, "role": role.as_str() }),
            )?;

            let link = invite_link(&base_url, &project_id, &invite.token);
            let message = InvitationMessage::compose(
                Some(user.as_str()),
                Some(&actor.project.title),
                Some(role),
                &link,
                Some(invite.expires_at),
            );
            log::info!("Invited {} to project {} as {role}", invite.email, project_id);
            Ok(InviteCreated { invite, link, message })
        })
        .await
    }

    /// Pending invites of a project. Owners and admins only.
    pub async fn list_invites(&self, project_id: &ProjectId) -> Result<Vec<Invite>> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();

        self.with_db(move |db| {
            authorize(db, &project_id, &user, Access::Manage)?;
            db.list_invites(&project_id, Some(InviteStatus::Pending))
        })
        .await
    }

    pub async fn revoke_invite(&self, project_id: &ProjectId, invite_id: &InviteId) -> Result<()> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();
        let invite_id = invite_id.clone();

        self.with_db(move |db| {
            authorize(db, &project_id, &user, Access::Manage)?;
            if db.revoke_invite(&project_id, &invite_id)? {
                Ok(())
            } else {
                Err(TrackerError::InviteNotFound)
            }
        })
        .await
    }

    /// Join a project with an invite token. Removed members are reactivated
    /// with the invite's role.
    pub async fn accept_invite(&self, token: &str) -> Result<Membership> {
        let user = self.acting_user()?;
        let token = token.trim().to_string();

        self.with_db(move |db| {
            let (invite, membership) = db.accept_invite(&token, &user)?;
            db.log_activity(
                &invite.project_id,
                Some(&user),
                ActivityKind::MemberJoined,
                "project_members",
                &json!({ "user_id": user, "role": membership.role.as_str() }),
            )?;
            log::info!("{user} joined project {} as {}", invite.project_id, membership.role);
            Ok(membership)
        })
        .await
    }

    pub async fn change_role(&self, project_id: &ProjectId, member: &UserId, role: Role) -> Result<Membership> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();
        let member = member.clone();

        self.with_db(move |db| {
            let actor = authorize(db, &project_id, &user, Access::Manage)?;
            let target = active_member(db.get_membership(&project_id, &member)?, &member)?;
            check_role_change(&actor, &target, role)?;

            let updated = db.set_member_role(&project_id, &member, role)?;
            db.log_activity(
                &project_id,
                Some(&user),
                ActivityKind::MemberRoleChanged,
                "project_members",
                &json!({ "user_id": member, "from": target.role.as_str(), "to": role.as_str() }),
            )?;
            Ok(updated)
        })
        .await
    }

    pub async fn remove_member(&self, project_id: &ProjectId, member: &UserId) -> Result<()> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();
        let member = member.clone();

        self.with_db(move |db| {
            let actor = authorize(db, &project_id, &user, Access::Manage)?;
            let target = active_member(db.get_membership(&project_id, &member)?, &member)?;
            check_removal(&actor, &target)?;

            db.remove_member(&project_id, &member)?;
            db.log_activity(
                &project_id,
                Some(&user),
                ActivityKind::MemberRemoved,
                "project_members",
                &json!({ "user_id": member }),
            )?;
            Ok(())
        })
        .await
    }
}

fn active_member(membership: Option<Membership>, user: &UserId) -> Result<Membership> {
    membership.filter(Membership::is_active).ok_or_else(|| {
        TrackerError::invalid_input("user_id").with_reason(format!("{user} is not an active member of this project"))
    })
}
