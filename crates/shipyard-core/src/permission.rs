//! Permission gate

use crate::types::{PermissionLevel, Resource, User};

/// Whether `user` may mutate `resource`'s config.
///
/// Pure and uncached: callers evaluate it against current state on every
/// edit so a revocation takes effect immediately.
pub fn can_edit(user: &User, resource: &Resource) -> bool {
    user.admin || resource.permission_for(&user.id) >= PermissionLevel::Update
}

/// Whether `user` may see `resource` in listings
pub fn can_read(user: &User, resource: &Resource) -> bool {
    user.admin || resource.permission_for(&user.id) >= PermissionLevel::Read
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ServerConfig};

    fn server() -> Resource {
        Resource::new("srv-1", "edge", Config::Server(ServerConfig::default()))
    }

    #[test]
    fn test_admin_can_always_edit() {
        assert!(can_edit(&User::admin("root", "root"), &server()));
    }

    #[test]
    fn test_update_level_required() {
        let user = User::new("alice", "alice");
        for (level, expected) in [
            (PermissionLevel::None, false),
            (PermissionLevel::Read, false),
            (PermissionLevel::Execute, false),
            (PermissionLevel::Update, true),
        ] {
            let resource = server().with_permission("alice", level);
            assert_eq!(can_edit(&user, &resource), expected, "level {level:?}");
        }
    }

    #[test]
    fn test_revocation_is_immediate() {
        let user = User::new("alice", "alice");
        let mut resource = server().with_permission("alice", PermissionLevel::Update);
        assert!(can_edit(&user, &resource));
        resource
            .permissions
            .insert("alice".into(), PermissionLevel::Read);
        assert!(!can_edit(&user, &resource));
        assert!(can_read(&user, &resource));
    }
}
