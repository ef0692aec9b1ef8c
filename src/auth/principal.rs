use crate::database::models::User;
use crate::error::ApiError;
use crate::types::{permission_codename, Action, ResourceKind};

/// Every permission codename the catalog knows about
pub const KNOWN_PERMISSIONS: &[&str] = &[
    "add_category",
    "change_category",
    "delete_category",
    "add_product",
    "change_product",
    "delete_product",
];

pub fn is_known_permission(codename: &str) -> bool {
    KNOWN_PERMISSIONS.contains(&codename)
}

/// Authenticated user context resolved from a bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct UserPrincipal {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
    pub permissions: Vec<String>,
}

impl From<&User> for UserPrincipal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
            permissions: user.permissions.clone(),
        }
    }
}

impl UserPrincipal {
    pub fn has_permission(&self, codename: &str) -> bool {
        self.is_staff || self.permissions.iter().any(|p| p == codename)
    }
}

/// Who is making the request
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Anonymous,
    User(UserPrincipal),
}

impl Principal {
    pub fn username(&self) -> Option<&str> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(&user.username),
        }
    }
}

/// Reads are open; writes need the matching `<verb>_<resource>` permission
pub fn authorize(principal: &Principal, action: Action, resource: ResourceKind) -> Result<(), ApiError> {
    let Some(codename) = permission_codename(action, resource) else {
        return Ok(());
    };

    match principal {
        Principal::Anonymous => {
            tracing::debug!(?action, resource = resource.as_str(), "anonymous write rejected");
            Err(ApiError::authentication_required())
        }
        Principal::User(user) if user.has_permission(&codename) => Ok(()),
        Principal::User(user) => {
            tracing::debug!(user = %user.username, permission = %codename, "permission denied");
            Err(ApiError::forbidden("You do not have permission to perform this action."))
        }
    }
}
