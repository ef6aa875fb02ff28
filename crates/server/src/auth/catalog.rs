//! Permissions and system roles that every deployment starts with.

pub const SUPER_ADMIN: &str = "super_admin";
pub const PROPERTY_MANAGER: &str = "property_manager";

pub const PROPERTIES_VIEW: &str = "properties:view";
pub const PROPERTIES_CREATE: &str = "properties:create";
pub const PROPERTIES_UPDATE: &str = "properties:update";
pub const PROPERTIES_DELETE: &str = "properties:delete";
pub const PROPERTIES_APPROVE: &str = "properties:approve";
pub const PROPERTIES_VERIFY: &str = "properties:verify";
pub const SEO_MANAGE: &str = "seo:manage";
pub const DASHBOARD_VIEW: &str = "dashboard:view";
pub const USERS_VIEW: &str = "users:view";
pub const USERS_MANAGE: &str = "users:manage";
pub const ADMINS_MANAGE: &str = "admins:manage";
pub const ROLES_MANAGE: &str = "roles:manage";
pub const ACTIVITY_VIEW: &str = "activity:view";

/// `(resource, action, description)` for every built-in permission.
pub const DEFAULT_PERMISSIONS: &[(&str, &str, &str)] = &[
    ("properties", "view", "Read property listings"),
    ("properties", "create", "Create property listings"),
    ("properties", "update", "Edit property listings"),
    ("properties", "delete", "Delete property listings"),
    ("properties", "approve", "Approve, reject, flag and reopen listings"),
    ("properties", "verify", "Change listing verification"),
    ("seo", "manage", "Edit SEO metadata"),
    ("dashboard", "view", "Read dashboard analytics"),
    ("users", "view", "Read platform users"),
    ("users", "manage", "Activate and deactivate platform users"),
    ("admins", "manage", "Create and manage admin accounts"),
    ("roles", "manage", "Manage roles, permissions and assignments"),
    ("activity", "view", "Read the admin activity log"),
];

pub struct SystemRole {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// `None` grants the whole catalog.
    pub permissions: Option<&'static [&'static str]>,
}

pub const SYSTEM_ROLES: &[SystemRole] = &[
    SystemRole {
        slug: SUPER_ADMIN,
        name: "Super Admin",
        description: "Full access to every admin capability",
        permissions: None,
    },
    SystemRole {
        slug: PROPERTY_MANAGER,
        name: "Property Manager",
        description: "Manages listings and their metadata",
        permissions: Some(&[
            PROPERTIES_VIEW,
            PROPERTIES_CREATE,
            PROPERTIES_UPDATE,
            SEO_MANAGE,
            DASHBOARD_VIEW,
        ]),
    },
];

pub fn permission_name(resource: &str, action: &str) -> String {
    format!("{resource}:{action}")
}
