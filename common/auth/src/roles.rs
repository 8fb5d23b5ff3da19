pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_KASIR: &str = "kasir";
pub const ROLE_OWNER: &str = "owner";

pub const ROLE_HIERARCHY: &[&str] = &[ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER];

/// Whether `role` is one of the roles this system recognises.
pub fn is_known_role(role: &str) -> bool {
    ROLE_HIERARCHY.contains(&role)
}
