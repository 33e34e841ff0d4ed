//! Who may do what on a project.
//!
//! | action                          | owner | admin | member | guest |
//! |---------------------------------|:-----:|:-----:|:------:|:-----:|
//! | read steps, members, activity   |   ✓   |   ✓   |   ✓    |   ✓   |
//! | create, edit, move, delete steps|   ✓   |   ✓   |   ✓    |       |
//! | settings, invites, members      |   ✓   |   ✓   |        |       |
//!
//! Member management is narrower still. The project creator may change any
//! other member's role and remove anyone but themself. Admins may only move
//! plain members between `member` and `guest` and remove them. Only the
//! creator may invite or promote someone as admin.

use crate::{
    db::Database,
    error::{Result, TrackerError},
    models::{Membership, Project, ProjectId, Role, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    EditSteps,
    Manage,
}

impl Access {
    fn action(&self) -> &'static str {
        match self {
            Access::Read => "viewing the project",
            Access::EditSteps => "editing steps",
            Access::Manage => "managing the project",
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        match self {
            Access::Read => true,
            Access::EditSteps => role.can_edit_steps(),
            Access::Manage => role.can_write(),
        }
    }
}

/// The acting user as seen by one project.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub is_creator: bool,
    pub project: Project,
}

/// Load the project and check `user`'s active role allows `access`.
pub(crate) fn authorize(db: &Database, project_id: &ProjectId, user: &UserId, access: Access) -> Result<Actor> {
    let project = db
        .get_project(project_id)?
        .ok_or_else(|| TrackerError::project_not_found(project_id))?;
    let role = db.active_role(project_id, user)?;

    match role {
        Some(role) if access.allows(role) => Ok(Actor {
            user_id: user.clone(),
            role,
            is_creator: project.created_by == *user,
            project,
        }),
        _ => Err(TrackerError::permission_denied(access.action(), role)),
    }
}

fn is_creator(actor: &Actor, user_id: &UserId) -> bool {
    actor.project.created_by == *user_id
}

fn is_privileged(role: Role) -> bool {
    matches!(role, Role::Owner | Role::Admin)
}

pub fn check_invite(actor: &Actor, role: Role) -> Result<()> {
    if !actor.role.can_write() {
        return Err(TrackerError::permission_denied("inviting members", Some(actor.role)));
    }
    if role == Role::Admin && !actor.is_creator {
        return Err(TrackerError::permission_denied("inviting admins", Some(actor.role)));
    }
    Ok(())
}

pub fn check_role_change(actor: &Actor, target: &Membership, new_role: Role) -> Result<()> {
    let denied = |action: &str| Err(TrackerError::permission_denied(action, Some(actor.role)));

    if target.user_id == actor.user_id {
        return denied("changing your own role");
    }
    if new_role == Role::Owner {
        return Err(TrackerError::invalid_input("role").with_reason("A project has exactly one owner"));
    }
    if actor.is_creator {
        return Ok(());
    }
    if actor.role != Role::Admin {
        return denied("changing roles");
    }
    if is_privileged(target.role) || is_creator(actor, &target.user_id) {
        return denied("changing an admin's role");
    }
    if new_role == Role::Admin {
        return denied("promoting to admin");
    }
    Ok(())
}

pub fn check_removal(actor: &Actor, target: &Membership) -> Result<()> {
    let denied = |action: &str| Err(TrackerError::permission_denied(action, Some(actor.role)));

    if target.user_id == actor.user_id {
        return denied("removing yourself");
    }
    if actor.is_creator {
        return Ok(());
    }
    if actor.role != Role::Admin {
        return denied("removing members");
    }
    if is_privileged(target.role) || is_creator(actor, &target.user_id) {
        return denied("removing an admin");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::models::MembershipStatus;

    fn project() -> Project {
        Project {
            id: ProjectId::from("p1"),
            title: "Launch".to_string(),
            description: None,
            start_date: None,
            due_date: None,
            background: None,
            created_by: UserId::from("creator"),
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn actor(user: &str, role: Role) -> Actor {
        Actor {
            user_id: UserId::from(user),
            role,
            is_creator: user == "creator",
            project: project(),
        }
    }

    fn member(user: &str, role: Role) -> Membership {
        Membership {
            project_id: ProjectId::from("p1"),
            user_id: UserId::from(user),
            role,
            status: MembershipStatus::Active,
            created_at: Timestamp::UNIX_EPOCH,
            removed_at: None,
        }
    }

    #[test]
    fn test_access_levels() {
        assert!(Access::Read.allows(Role::Guest));
        assert!(!Access::EditSteps.allows(Role::Guest));
        assert!(Access::EditSteps.allows(Role::Member));
        assert!(!Access::Manage.allows(Role::Member));
        assert!(Access::Manage.allows(Role::Admin));
    }

    #[test]
    fn test_creator_changes_anyone_but_self() {
        let creator = actor("creator", Role::Owner);
        assert!(check_role_change(&creator, &member("a", Role::Admin), Role::Guest).is_ok());
        assert!(check_role_change(&creator, &member("m", Role::Member), Role::Admin).is_ok());
        assert!(check_role_change(&creator, &member("creator", Role::Owner), Role::Admin).is_err());
        assert!(check_role_change(&creator, &member("m", Role::Member), Role::Owner).is_err());
    }

    #[test]
    fn test_admin_only_toggles_member_and_guest() {
        let admin = actor("a", Role::Admin);
        assert!(check_role_change(&admin, &member("m", Role::Member), Role::Guest).is_ok());
        assert!(check_role_change(&admin, &member("g", Role::Guest), Role::Member).is_ok());
        assert!(check_role_change(&admin, &member("g", Role::Guest), Role::Admin).is_err());
        assert!(check_role_change(&admin, &member("b", Role::Admin), Role::Member).is_err());
        assert!(check_role_change(&admin, &member("creator", Role::Owner), Role::Member).is_err());
    }

    #[test]
    fn test_members_cannot_manage() {
        let plain = actor("m", Role::Member);
        assert!(check_role_change(&plain, &member("g", Role::Guest), Role::Member).is_err());
        assert!(check_removal(&plain, &member("g", Role::Guest)).is_err());
        assert!(check_invite(&plain, Role::Guest).is_err());
    }

    #[test]
    fn test_removal_rules() {
        let creator = actor("creator", Role::Owner);
        let admin = actor("a", Role::Admin);
        assert!(check_removal(&creator, &member("a", Role::Admin)).is_ok());
        assert!(check_removal(&creator, &member("creator", Role::Owner)).is_err());
        assert!(check_removal(&admin, &member("m", Role::Member)).is_ok());
        assert!(check_removal(&admin, &member("b", Role::Admin)).is_err());
        assert!(check_removal(&admin, &member("a", Role::Admin)).is_err());
    }

    #[test]
    fn test_only_creator_invites_admins() {
        assert!(check_invite(&actor("creator", Role::Owner), Role::Admin).is_ok());
        assert!(check_invite(&actor("a", Role::Admin), Role::Admin).is_err());
        assert!(check_invite(&actor("a", Role::Admin), Role::Member).is_ok());
    }
}
