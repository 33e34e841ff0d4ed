//! Memberships and invites.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension};

use super::{optional_timestamp_column, parsed_column, timestamp_column};
use crate::{
    error::{DatabaseResultExt, Result, TrackerError},
    models::{Invite, InviteId, InviteStatus, Membership, ProjectId, Role, UserId},
};

const MEMBER_COLUMNS: &str = "project_id, user_id, role, status, created_at, removed_at";
const INVITE_COLUMNS: &str =
    "id, project_id, email, role, status, token, created_by, created_at, expires_at, accepted_at";

const UPSERT_MEMBER_SQL: &str = "INSERT INTO project_members (project_id, user_id, role, status, created_at)
     VALUES (?1, ?2, ?3, 'active', ?4)
     ON CONFLICT (project_id, user_id) DO UPDATE SET role = excluded.role, status = 'active', removed_at = NULL";
const SET_ROLE_SQL: &str =
    "UPDATE project_members SET role = ?1 WHERE project_id = ?2 AND user_id = ?3 AND status = 'active'";
const REMOVE_MEMBER_SQL: &str = "UPDATE project_members SET status = 'removed', removed_at = ?1
     WHERE project_id = ?2 AND user_id = ?3 AND status = 'active'";
const INSERT_INVITE_SQL: &str = "INSERT INTO project_invites (id, project_id, email, role, status, token, created_by, created_at, expires_at)
     VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8)";
const ACCEPT_INVITE_SQL: &str =
    "UPDATE project_invites SET status = 'accepted', accepted_at = ?1 WHERE id = ?2 AND status = 'pending'";
const REVOKE_INVITE_SQL: &str =
    "UPDATE project_invites SET status = 'revoked' WHERE id = ?1 AND project_id = ?2 AND status = 'pending'";

impl super::Database {
    fn build_membership_from_row(row: &rusqlite::Row) -> rusqlite::Result<Membership> {
        Ok(Membership {
            project_id: ProjectId::new(row.get::<_, String>(0)?),
            user_id: UserId::new(row.get::<_, String>(1)?),
            role: parsed_column(row, 2)?,
            status: parsed_column(row, 3)?,
            created_at: timestamp_column(row, 4)?,
            removed_at: optional_timestamp_column(row, 5)?,
        })
    }

    fn build_invite_from_row(row: &rusqlite::Row) -> rusqlite::Result<Invite> {
        Ok(Invite {
            id: InviteId::new(row.get::<_, String>(0)?),
            project_id: ProjectId::new(row.get::<_, String>(1)?),
            email: row.get(2)?,
            role: parsed_column(row, 3)?,
            status: parsed_column(row, 4)?,
            token: row.get(5)?,
            created_by: UserId::new(row.get::<_, String>(6)?),
            created_at: timestamp_column(row, 7)?,
            expires_at: timestamp_column(row, 8)?,
            accepted_at: optional_timestamp_column(row, 9)?,
        })
    }

    /// A user's membership record, active or removed.
    pub fn get_membership(&self, project_id: &ProjectId, user_id: &UserId) -> Result<Option<Membership>> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM project_members WHERE project_id = ?1 AND user_id = ?2");
        self.connection
            .query_row(
                &sql,
                params![project_id.as_str(), user_id.as_str()],
                Self::build_membership_from_row,
            )
            .optional()
            .db_context("Failed to fetch membership")
    }

    /// Role of an active member, `None` for outsiders and removed members.
    pub fn active_role(&self, project_id: &ProjectId, user_id: &UserId) -> Result<Option<Role>> {
        Ok(self
            .get_membership(project_id, user_id)?
            .filter(Membership::is_active)
            .map(|m| m.role))
    }

    /// Active members, owner first then by join time.
    pub fn list_members(&self, project_id: &ProjectId) -> Result<Vec<Membership>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members
             WHERE project_id = ?1 AND status = 'active'
             ORDER BY CASE role WHEN 'owner' THEN 0 WHEN 'admin' THEN 1 WHEN 'member' THEN 2 ELSE 3 END, created_at"
        );
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare member query")?;

        let members = stmt
            .query_map(params![project_id.as_str()], Self::build_membership_from_row)
            .db_context("Failed to query members")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read member rows")?;
        Ok(members)
    }

    /// Add a member, or reactivate a removed one with the given role.
    pub fn upsert_membership(&self, project_id: &ProjectId, user_id: &UserId, role: Role) -> Result<Membership> {
        self.connection
            .execute(
                UPSERT_MEMBER_SQL,
                params![
                    project_id.as_str(),
                    user_id.as_str(),
                    role.as_str(),
                    Timestamp::now().to_string()
                ],
            )
            .db_context("Failed to save membership")?;
        self.get_membership(project_id, user_id)?
            .ok_or_else(|| TrackerError::database("Membership missing after save").with_source(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn set_member_role(&self, project_id: &ProjectId, user_id: &UserId, role: Role) -> Result<Membership> {
        let changed = self
            .connection
            .execute(SET_ROLE_SQL, params![role.as_str(), project_id.as_str(), user_id.as_str()])
            .db_context("Failed to update member role")?;
        if changed == 0 {
            return Err(TrackerError::invalid_input("user_id")
                .with_reason(format!("{user_id} is not an active member of this project")));
        }
        self.get_membership(project_id, user_id)?
            .ok_or_else(|| TrackerError::database("Membership missing after update").with_source(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Mark a member removed. The row stays for history.
    pub fn remove_member(&self, project_id: &ProjectId, user_id: &UserId) -> Result<()> {
        let changed = self
            .connection
            .execute(
                REMOVE_MEMBER_SQL,
                params![Timestamp::now().to_string(), project_id.as_str(), user_id.as_str()],
            )
            .db_context("Failed to remove member")?;
        if changed == 0 {
            return Err(TrackerError::invalid_input("user_id")
                .with_reason(format!("{user_id} is not an active member of this project")));
        }
        Ok(())
    }

    pub fn create_invite(&self, invite: &Invite) -> Result<()> {
        self.connection
            .execute(
                INSERT_INVITE_SQL,
                params![
                    invite.id.as_str(),
                    invite.project_id.as_str(),
                    &invite.email,
                    invite.role.as_str(),
                    &invite.token,
                    invite.created_by.as_str(),
                    invite.created_at.to_string(),
                    invite.expires_at.to_string(),
                ],
            )
            .db_context("Failed to insert invite")?;
        Ok(())
    }

    /// Invites of a project, optionally only those with `status`, newest first.
    pub fn list_invites(&self, project_id: &ProjectId, status: Option<InviteStatus>) -> Result<Vec<Invite>> {
        let sql = format!(
            "SELECT {INVITE_COLUMNS} FROM project_invites
             WHERE project_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC"
        );
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare invite query")?;

        let invites = stmt
            .query_map(
                params![project_id.as_str(), status.map(|s| s.as_str())],
                Self::build_invite_from_row,
            )
            .db_context("Failed to query invites")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read invite rows")?;
        Ok(invites)
    }

    pub fn find_invite_by_token(&self, token: &str) -> Result<Option<Invite>> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM project_invites WHERE token = ?1");
        self.connection
            .query_row(&sql, params![token], Self::build_invite_from_row)
            .optional()
            .db_context("Failed to fetch invite")
    }

    /// Accept a usable invite for `user_id`: the membership is created (or
    /// reactivated) with the invite's role and the invite is marked accepted,
    /// in one transaction.
    pub fn accept_invite(&mut self, token: &str, user_id: &UserId) -> Result<(Invite, Membership)> {
        let now = Timestamp::now();
        let mut invite = self
            .find_invite_by_token(token)?
            .filter(|invite| invite.is_usable(now))
            .ok_or(TrackerError::InviteNotFound)?;

        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;
        let now_str = now.to_string();

        let accepted = tx
            .execute(ACCEPT_INVITE_SQL, params![&now_str, invite.id.as_str()])
            .db_context("Failed to mark invite accepted")?;
        if accepted == 0 {
            return Err(TrackerError::InviteNotFound);
        }
        tx.execute(
            UPSERT_MEMBER_SQL,
            params![invite.project_id.as_str(), user_id.as_str(), invite.role.as_str(), &now_str],
        )
        .db_context("Failed to add member from invite")?;
        tx.commit().db_context("Failed to commit transaction")?;

        invite.status = InviteStatus::Accepted;
        invite.accepted_at = Some(now);
        let membership = self
            .get_membership(&invite.project_id, user_id)?
            .ok_or_else(|| TrackerError::database("Membership missing after accept").with_source(rusqlite::Error::QueryReturnedNoRows))?;
        Ok((invite, membership))
    }

    /// Revoke a pending invite. Returns false if it was not pending.
    pub fn revoke_invite(&self, project_id: &ProjectId, id: &InviteId) -> Result<bool> {
        let changed = self
            .connection
            .execute(REVOKE_INVITE_SQL, params![id.as_str(), project_id.as_str()])
            .db_context("Failed to revoke invite")?;
        Ok(changed > 0)
    }
}
