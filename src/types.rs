use serde::{Deserialize, Serialize};

/// Project membership roles, ordered from most to least privileged.
///
/// The legacy `super_admin` spelling is accepted on parse and treated as
/// admin-equivalent, but is never written back to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "owner" => Some(Role::Owner),
            "admin" | "super_admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Owner/admin: may manage members, invites, and project settings.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Owner/admin/editor: may create and modify tasks and subtasks.
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Editor)
    }
}

/// Roles that can be granted through an invite. Ownership is never granted
/// by invitation; it is transferred through the members endpoint.
pub const INVITABLE_ROLES: &[&str] = &["admin", "editor", "viewer"];

/// Invite lifecycle states. `pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InviteStatus {
    pub fn parse(s: &str) -> Option<InviteStatus> {
        match s {
            "pending" => Some(InviteStatus::Pending),
            "accepted" => Some(InviteStatus::Accepted),
            "expired" => Some(InviteStatus::Expired),
            "revoked" => Some(InviteStatus::Revoked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Expired => "expired",
            InviteStatus::Revoked => "revoked",
        }
    }
}

pub const TASK_STATUSES: &[&str] = &["todo", "in_progress", "done"];
pub const TASK_PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];

/// Minimal email shape check, same rule the original invite endpoint applied:
/// one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roles_including_legacy_spelling() {
        assert_eq!(Role::parse("owner"), Some(Role::Owner));
        assert_eq!(Role::parse("super_admin"), Some(Role::Admin));
        assert_eq!(Role::parse("manager"), None);
    }

    #[test]
    fn role_capabilities() {
        assert!(Role::Owner.can_manage());
        assert!(Role::Admin.can_manage());
        assert!(!Role::Editor.can_manage());
        assert!(Role::Editor.can_write());
        assert!(!Role::Viewer.can_write());
    }

    #[test]
    fn validates_email_shape() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaced user@example.com"));
        assert!(!is_valid_email("user@nodot"));
    }

    #[test]
    fn invite_status_round_trips() {
        for s in ["pending", "accepted", "expired", "revoked"] {
            assert_eq!(InviteStatus::parse(s).unwrap().as_str(), s);
        }
        assert_eq!(InviteStatus::parse("open"), None);
    }
}
