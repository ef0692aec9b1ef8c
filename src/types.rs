/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Handler actions, used by authorization and request logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    List,
    Retrieve,
    Recent,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    pub fn is_read(&self) -> bool {
        matches!(self, Action::List | Action::Retrieve | Action::Recent)
    }

    /// Permission verb for write actions
    pub fn permission_verb(&self) -> Option<&'static str> {
        match self {
            Action::Create => Some("add"),
            Action::Update | Action::PartialUpdate => Some("change"),
            Action::Destroy => Some("delete"),
            Action::List | Action::Retrieve | Action::Recent => None,
        }
    }
}

/// Catalog resource types that carry permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Category,
    Product,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Category => "category",
            ResourceKind::Product => "product",
        }
    }
}

/// Codename a principal needs for `action` on `resource`, e.g. `add_product`
pub fn permission_codename(action: Action, resource: ResourceKind) -> Option<String> {
    action
        .permission_verb()
        .map(|verb| format!("{}_{}", verb, resource.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codenames() {
        assert_eq!(permission_codename(Action::Create, ResourceKind::Product).as_deref(), Some("add_product"));
        assert_eq!(permission_codename(Action::PartialUpdate, ResourceKind::Category).as_deref(), Some("change_category"));
        assert_eq!(permission_codename(Action::Destroy, ResourceKind::Category).as_deref(), Some("delete_category"));
        assert_eq!(permission_codename(Action::Recent, ResourceKind::Product), None);
    }
}
