//! Authentication and authorization tests
//!
//! Role permission matrix and access token round trips.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

use shared::{role_permissions, Action, Resource, StaffRole};

fn role_strategy() -> impl Strategy<Value = StaffRole> {
    prop_oneof![
        Just(StaffRole::Admin),
        Just(StaffRole::Manager),
        Just(StaffRole::Cashier),
        Just(StaffRole::Kitchen),
    ]
}

fn grants(role: StaffRole, resource: Resource, action: Action) -> bool {
    role_permissions(role)
        .iter()
        .any(|p| p.resource == resource && p.actions.contains(&action))
}

// ============================================================================
// Role Permission Tests
// ============================================================================

#[cfg(test)]
mod role_permission_tests {
    use super::*;

    #[test]
    fn test_manager_runs_the_back_office() {
        assert!(grants(StaffRole::Manager, Resource::Inventory, Action::Resolve));
        assert!(grants(StaffRole::Manager, Resource::Accounting, Action::View));
        assert!(grants(StaffRole::Manager, Resource::Accounting, Action::Create));
        assert!(grants(StaffRole::Manager, Resource::Accounting, Action::Export));
    }

    #[test]
    fn test_admin_matches_manager() {
        assert_eq!(StaffRole::Admin.permissions(), StaffRole::Manager.permissions());
    }

    #[test]
    fn test_cashier_sells_but_cannot_see_accounts() {
        assert!(grants(StaffRole::Cashier, Resource::Order, Action::Create));
        assert!(grants(StaffRole::Cashier, Resource::Order, Action::Edit));
        assert!(!grants(StaffRole::Cashier, Resource::Accounting, Action::View));
        assert!(!grants(StaffRole::Cashier, Resource::Inventory, Action::Create));
    }

    #[test]
    fn test_kitchen_records_waste_but_cannot_resolve() {
        assert!(grants(StaffRole::Kitchen, Resource::Inventory, Action::Create));
        assert!(!grants(StaffRole::Kitchen, Resource::Inventory, Action::Resolve));
        assert!(!grants(StaffRole::Kitchen, Resource::Recipe, Action::Edit));
    }

    #[test]
    fn test_permission_strings() {
        let perms = StaffRole::Kitchen.permissions();
        assert!(perms.contains(&"inventory:create".to_string()));
        assert!(perms.contains(&"order:edit".to_string()));
        assert!(!perms.contains(&"order:create".to_string()));
    }
}

// ============================================================================
// Token Tests
// ============================================================================

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestClaims {
    sub: String,
    tenant_id: String,
    role: String,
    permissions: Vec<String>,
    exp: i64,
    iat: i64,
}

#[cfg(test)]
mod auth_flow_tests {
    use super::*;

    fn claims_for(role: StaffRole, exp_offset: i64) -> TestClaims {
        let now = chrono::Utc::now().timestamp();
        TestClaims {
            sub: uuid::Uuid::new_v4().to_string(),
            tenant_id: uuid::Uuid::new_v4().to_string(),
            role: role.as_str().to_string(),
            permissions: role.permissions(),
            exp: now + exp_offset,
            iat: now,
        }
    }

    #[test]
    fn test_access_token_carries_permissions() {
        let claims = claims_for(StaffRole::Manager, 900);
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let decoded = decode::<TestClaims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims, claims);
        assert_eq!(decoded.claims.role.parse::<StaffRole>().unwrap(), StaffRole::Manager);
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = claims_for(StaffRole::Cashier, -3600);
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = decode::<TestClaims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }

    #[test]
    fn test_password_hash_not_stored_plain() {
        let hash = bcrypt::hash("barista-2024", 4).unwrap();
        assert_ne!(hash, "barista-2024");
        assert!(bcrypt::verify("barista-2024", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Every granted permission string maps back to a matrix entry
    #[test]
    fn prop_permission_strings_match_matrix(role in role_strategy()) {
        let matrix = role_permissions(role);
        for perm in role.permissions() {
            let (resource, action) = perm.split_once(':').unwrap();
            let in_matrix = matrix.iter().any(|p| {
                p.resource.as_str() == resource && p.actions.iter().any(|a| a.as_str() == action)
            });
            prop_assert!(in_matrix);
        }
    }

    /// Only admins and managers may resolve alerts or read accounts
    #[test]
    fn prop_back_office_is_restricted(role in role_strategy()) {
        let privileged = matches!(role, StaffRole::Admin | StaffRole::Manager);
        prop_assert_eq!(grants(role, Resource::Inventory, Action::Resolve), privileged);
        prop_assert_eq!(grants(role, Resource::Accounting, Action::View), privileged);
    }
}
