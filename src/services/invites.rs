use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::models::ProjectInvite;
use crate::error::ApiError;
use crate::types::InviteStatus;

/// Generate a secure base64url invite token (32 random bytes by default)
pub fn generate_invite_token() -> String {
    let mut bytes = vec![0u8; config::config().invite.token_bytes];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(config::config().invite.expiry_days)
}

/// Accept link handed back to the inviter (delivery itself is out of scope)
pub fn accept_link(token: &str) -> String {
    format!("{}/invite/accept?token={}", config::config().api.app_url, token)
}

/// Outcome of evaluating an invite against the accepting caller.
///
/// The whole pending -> accepted/expired guard sequence lives here as a pure
/// function so the lifecycle is testable without a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptDecision {
    /// Invite was already accepted, expired, or revoked
    NotPending,
    /// Invite is pending but past its expiry; persist `expired`
    Expired,
    /// Caller's email does not match the invited address
    EmailMismatch,
    /// All guards passed; create membership and mark accepted
    Accept,
}

pub fn evaluate_acceptance(
    invite: &ProjectInvite,
    caller_email: &str,
    now: DateTime<Utc>,
) -> AcceptDecision {
    match InviteStatus::parse(&invite.status) {
        Some(InviteStatus::Pending) => {}
        _ => return AcceptDecision::NotPending,
    }

    if now > invite.expires_at {
        return AcceptDecision::Expired;
    }

    if !invite.email.eq_ignore_ascii_case(caller_email.trim()) {
        return AcceptDecision::EmailMismatch;
    }

    AcceptDecision::Accept
}

/// Create a new pending invite, or renew the existing pending invite for the
/// same (project, email) pair with a fresh token, role, and expiry.
pub async fn create_or_renew(
    pool: &PgPool,
    project_id: Uuid,
    inviter_id: Uuid,
    email: &str,
    role: &str,
) -> Result<ProjectInvite, ApiError> {
    let token = generate_invite_token();
    let expires_at = expiry_from(Utc::now());

    let existing: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM project_invites
         WHERE project_id = $1 AND email = $2 AND status = 'pending'",
    )
    .bind(project_id)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let invite = if let Some((id,)) = existing {
        tracing::debug!("Renewing pending invite {} for {}", id, email);
        sqlx::query_as::<_, ProjectInvite>(
            "UPDATE project_invites
             SET role = $2, token = $3, expires_at = $4
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(role)
        .bind(&token)
        .bind(expires_at)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as::<_, ProjectInvite>(
            "INSERT INTO project_invites (project_id, inviter_id, email, role, token, expires_at, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'pending')
             RETURNING *",
        )
        .bind(project_id)
        .bind(inviter_id)
        .bind(email)
        .bind(role)
        .bind(&token)
        .bind(expires_at)
        .fetch_one(pool)
        .await?
    };

    Ok(invite)
}

pub async fn list_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ProjectInvite>, ApiError> {
    let invites = sqlx::query_as::<_, ProjectInvite>(
        "SELECT * FROM project_invites WHERE project_id = $1 ORDER BY inserted_at DESC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(invites)
}

pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<ProjectInvite>, ApiError> {
    let invite =
        sqlx::query_as::<_, ProjectInvite>("SELECT * FROM project_invites WHERE token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await?;
    Ok(invite)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ProjectInvite>, ApiError> {
    let invite = sqlx::query_as::<_, ProjectInvite>("SELECT * FROM project_invites WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(invite)
}

pub async fn mark_expired(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
    sqlx::query("UPDATE project_invites SET status = 'expired' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn revoke(pool: &PgPool, id: Uuid) -> Result<ProjectInvite, ApiError> {
    let invite = sqlx::query_as::<_, ProjectInvite>(
        "UPDATE project_invites SET status = 'revoked' WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(invite)
}

/// Membership creation and status flip run in one transaction; partial
/// acceptance is never observable. Returns true when the caller was already
/// a member (acceptance is idempotent in that case).
pub async fn accept(
    pool: &PgPool,
    invite: &ProjectInvite,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let mut tx = pool.begin().await?;

    let existing: Option<(Uuid,)> = sqlx::query_as(
        "SELECT user_id FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(invite.project_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let already_member = existing.is_some();
    if !already_member {
        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3)",
        )
        .bind(invite.project_id)
        .bind(user_id)
        .bind(&invite.role)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE project_invites SET status = 'accepted', accepted_at = $2 WHERE id = $1")
        .bind(invite.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(already_member)
}

/// Bulk-mark pending invites past their expiry. Used by `nexus invite prune`.
pub async fn prune_expired(pool: &PgPool) -> Result<u64, ApiError> {
    let result = sqlx::query(
        "UPDATE project_invites SET status = 'expired'
         WHERE status = 'pending' AND expires_at < now()",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(status: &str, email: &str, expires_in_hours: i64) -> ProjectInvite {
        let now = Utc::now();
        ProjectInvite {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            inviter_id: Uuid::new_v4(),
            email: email.to_string(),
            role: "editor".to_string(),
            token: generate_invite_token(),
            status: status.to_string(),
            expires_at: now + Duration::hours(expires_in_hours),
            accepted_at: None,
            inserted_at: now,
        }
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_invite_token();
        let b = generate_invite_token();
        assert_ne!(a, b);
        assert!(a.len() >= 40);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn pending_valid_invite_is_accepted() {
        let inv = invite("pending", "alice@example.com", 24);
        assert_eq!(
            evaluate_acceptance(&inv, "alice@example.com", Utc::now()),
            AcceptDecision::Accept
        );
    }

    #[test]
    fn email_match_is_case_insensitive() {
        let inv = invite("pending", "alice@example.com", 24);
        assert_eq!(
            evaluate_acceptance(&inv, "Alice@Example.COM", Utc::now()),
            AcceptDecision::Accept
        );
        assert_eq!(
            evaluate_acceptance(&inv, "  alice@example.com  ".trim(), Utc::now()),
            AcceptDecision::Accept
        );
    }

    #[test]
    fn mismatched_email_is_rejected() {
        let inv = invite("pending", "alice@example.com", 24);
        assert_eq!(
            evaluate_acceptance(&inv, "mallory@example.com", Utc::now()),
            AcceptDecision::EmailMismatch
        );
    }

    #[test]
    fn expired_pending_invite_reports_expired() {
        let inv = invite("pending", "alice@example.com", -1);
        assert_eq!(
            evaluate_acceptance(&inv, "alice@example.com", Utc::now()),
            AcceptDecision::Expired
        );
    }

    #[test]
    fn terminal_states_are_not_reaccepted() {
        for status in ["accepted", "expired", "revoked"] {
            let inv = invite(status, "alice@example.com", 24);
            assert_eq!(
                evaluate_acceptance(&inv, "alice@example.com", Utc::now()),
                AcceptDecision::NotPending,
                "status {status} should not be acceptable"
            );
        }
    }

    #[test]
    fn expiry_check_runs_before_email_check() {
        // An expired invite reports Expired even to the wrong address; the
        // status transition must happen regardless of who knocked.
        let inv = invite("pending", "alice@example.com", -1);
        assert_eq!(
            evaluate_acceptance(&inv, "mallory@example.com", Utc::now()),
            AcceptDecision::Expired
        );
    }

    #[test]
    fn accept_link_embeds_token() {
        let link = accept_link("tok123");
        assert!(link.ends_with("/invite/accept?token=tok123"));
    }
}
