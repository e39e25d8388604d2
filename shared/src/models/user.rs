//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::types::Language;

/// A staff account belonging to a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: StaffRole,
    pub preferred_language: Language,
    pub created_at: DateTime<Utc>,
}

/// Staff roles of a café tenant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Manager,
    Cashier,
    Kitchen,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Manager => "manager",
            StaffRole::Cashier => "cashier",
            StaffRole::Kitchen => "kitchen",
        }
    }

    /// Permissions granted to the role, as `resource:action` strings
    pub fn permissions(&self) -> Vec<String> {
        role_permissions(*self)
            .iter()
            .flat_map(|p| p.actions.iter().map(move |a| format!("{}:{}", p.resource.as_str(), a.as_str())))
            .collect()
    }
}

impl std::str::FromStr for StaffRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(StaffRole::Admin),
            "manager" => Ok(StaffRole::Manager),
            "cashier" => Ok(StaffRole::Cashier),
            "kitchen" => Ok(StaffRole::Kitchen),
            other => Err(DomainError::UnknownVariant {
                kind: "staff role",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for StaffRole {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A permission granting actions on a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub resource: Resource,
    pub actions: Vec<Action>,
}

/// Resources that can be accessed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Inventory,
    Recipe,
    Order,
    Accounting,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Inventory => "inventory",
            Resource::Recipe => "recipe",
            Resource::Order => "order",
            Resource::Accounting => "accounting",
        }
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Resolve,
    Export,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Resolve => "resolve",
            Action::Export => "export",
        }
    }
}

/// Permission matrix per role
pub fn role_permissions(role: StaffRole) -> Vec<Permission> {
    match role {
        StaffRole::Admin | StaffRole::Manager => vec![
            Permission {
                resource: Resource::Inventory,
                actions: vec![Action::View, Action::Create, Action::Edit, Action::Resolve],
            },
            Permission {
                resource: Resource::Recipe,
                actions: vec![Action::View, Action::Create, Action::Edit],
            },
            Permission {
                resource: Resource::Order,
                actions: vec![Action::View, Action::Create, Action::Edit],
            },
            Permission {
                resource: Resource::Accounting,
                actions: vec![Action::View, Action::Create, Action::Export],
            },
        ],
        StaffRole::Kitchen => vec![
            Permission {
                resource: Resource::Inventory,
                actions: vec![Action::View, Action::Create],
            },
            Permission {
                resource: Resource::Recipe,
                actions: vec![Action::View],
            },
            Permission {
                resource: Resource::Order,
                actions: vec![Action::View, Action::Edit],
            },
        ],
        StaffRole::Cashier => vec![
            Permission {
                resource: Resource::Inventory,
                actions: vec![Action::View],
            },
            Permission {
                resource: Resource::Recipe,
                actions: vec![Action::View],
            },
            Permission {
                resource: Resource::Order,
                actions: vec![Action::View, Action::Create, Action::Edit],
            },
        ],
    }
}
