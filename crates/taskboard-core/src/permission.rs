use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Permissions, Result, WorkspaceMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Delete,
    Admin,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl Permissions {
    pub fn allows(&self, action: Action) -> bool {
        if self.admin {
            return true;
        }
        match action {
            Action::Read => self.read,
            Action::Write => self.write,
            Action::Delete => self.delete,
            Action::Admin => false,
        }
    }
}

/// Checks a membership row against the flag an action needs.
pub fn authorize(member: Option<&WorkspaceMember>, action: Action) -> Result<()> {
    let member = member.ok_or_else(|| Error::Forbidden("not a member of this workspace".to_string()))?;

    if member.permissions.allows(action) {
        Ok(())
    } else {
        tracing::warn!(
            "User {} denied {} on workspace {}",
            member.user_id,
            action,
            member.workspace_id
        );
        Err(Error::Forbidden(format!("missing {} permission", action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn member(permissions: Permissions) -> WorkspaceMember {
        WorkspaceMember::new(Uuid::new_v4(), Uuid::new_v4(), permissions)
    }

    #[test]
    fn test_admin_implies_everything() {
        let perms = Permissions {
            admin: true,
            ..Permissions::default()
        };
        for action in [Action::Read, Action::Write, Action::Delete, Action::Admin] {
            assert!(perms.allows(action));
        }
    }

    #[test]
    fn test_flags_are_independent() {
        let perms = Permissions {
            read: false,
            write: true,
            delete: false,
            admin: false,
        };
        assert!(!perms.allows(Action::Read));
        assert!(perms.allows(Action::Write));
        assert!(!perms.allows(Action::Delete));
        assert!(!perms.allows(Action::Admin));
    }

    #[test]
    fn test_authorize_non_member() {
        let err = authorize(None, Action::Read).unwrap_err();
        assert!(matches!(err, Error::Forbidden(msg) if msg.contains("not a member")));
    }

    #[test]
    fn test_authorize_missing_flag() {
        let viewer = member(Permissions::viewer());
        assert!(authorize(Some(&viewer), Action::Read).is_ok());
        let err = authorize(Some(&viewer), Action::Delete).unwrap_err();
        assert!(matches!(err, Error::Forbidden(msg) if msg == "missing delete permission"));
    }
}
