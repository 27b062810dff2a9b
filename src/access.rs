use crate::schema::{Entity, Person, RoleName};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const VIEW_ALL_COMPANIES: &str = "view_all_companies";
pub const VIEW_ASSIGNED_COMPANIES: &str = "view_assigned_companies";
pub const VIEW_CONSOLIDATED: &str = "view_consolidated";
pub const COMPARE_COMPANIES: &str = "compare_companies";
pub const EXPORT_REPORTS: &str = "export_reports";
pub const MANAGE_USERS: &str = "manage_users";
pub const MANAGE_COMPANIES: &str = "manage_companies";
pub const VIEW_AUDIT_TRAIL: &str = "view_audit_trail";

/// Which entities a role may see before the person's own grant list is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessScope {
    AllEntities,
    Assigned,
}

/// Capability map from role to permission tokens.
pub trait AccessPolicy {
    fn permissions_for(&self, role: &RoleName) -> BTreeSet<String>;

    fn scope_of(&self, role: &RoleName) -> AccessScope {
        match role {
            RoleName::SuperAdmin => AccessScope::AllEntities,
            RoleName::Admin | RoleName::Employee => AccessScope::Assigned,
        }
    }
}

/// Source of truth for who a person is and what they were granted.
pub trait IdentityProvider {
    fn role_of(&self, person_id: &str) -> Option<RoleName>;
    fn accessible_entities_of(&self, person_id: &str) -> Option<Vec<String>>;
}

/// The fixed three-level role table.
#[derive(Debug, Clone)]
pub struct RoleHierarchy {
    permissions: BTreeMap<RoleName, BTreeSet<String>>,
}

impl RoleHierarchy {
    pub fn new() -> Self {
        let super_admin = [
            VIEW_ALL_COMPANIES,
            VIEW_CONSOLIDATED,
            COMPARE_COMPANIES,
            EXPORT_REPORTS,
            MANAGE_USERS,
            MANAGE_COMPANIES,
            VIEW_AUDIT_TRAIL,
        ];
        let admin = [
            VIEW_ASSIGNED_COMPANIES,
            VIEW_CONSOLIDATED,
            COMPARE_COMPANIES,
            EXPORT_REPORTS,
            VIEW_AUDIT_TRAIL,
        ];
        let employee = [VIEW_ASSIGNED_COMPANIES, VIEW_CONSOLIDATED];

        let mut permissions = BTreeMap::new();
        permissions.insert(RoleName::SuperAdmin, to_token_set(&super_admin));
        permissions.insert(RoleName::Admin, to_token_set(&admin));
        permissions.insert(RoleName::Employee, to_token_set(&employee));

        Self { permissions }
    }

    /// Replaces the permission set of one role, keeping the others.
    pub fn with_permissions(mut self, role: RoleName, tokens: &[&str]) -> Self {
        self.permissions.insert(role, to_token_set(tokens));
        self
    }
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessPolicy for RoleHierarchy {
    fn permissions_for(&self, role: &RoleName) -> BTreeSet<String> {
        self.permissions.get(role).cloned().unwrap_or_default()
    }
}

fn to_token_set(tokens: &[&str]) -> BTreeSet<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

/// Identity lookups over the statically configured person roster.
pub struct RosterIdentityProvider<'a> {
    persons: &'a [Person],
}

impl<'a> RosterIdentityProvider<'a> {
    pub fn new(persons: &'a [Person]) -> Self {
        Self { persons }
    }

    fn find(&self, person_id: &str) -> Option<&'a Person> {
        self.persons.iter().find(|p| p.id == person_id)
    }
}

impl IdentityProvider for RosterIdentityProvider<'_> {
    fn role_of(&self, person_id: &str) -> Option<RoleName> {
        self.find(person_id).map(Person::role_name)
    }

    fn accessible_entities_of(&self, person_id: &str) -> Option<Vec<String>> {
        self.find(person_id).map(|p| p.accessible_companies.clone())
    }
}

/// Derived pairing of a person with what they may see. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub person_id: String,
    pub role: RoleName,
    pub entity_ids: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl AccessGrant {
    pub fn can_view(&self, entity_id: &str) -> bool {
        self.entity_ids.contains(entity_id)
    }

    pub fn has_permission(&self, token: &str) -> bool {
        self.permissions.contains(token)
    }
}

pub struct AccessResolver<'a> {
    entities: &'a [Entity],
    identity: &'a dyn IdentityProvider,
    policy: &'a dyn AccessPolicy,
}

impl<'a> AccessResolver<'a> {
    pub fn new(
        entities: &'a [Entity],
        identity: &'a dyn IdentityProvider,
        policy: &'a dyn AccessPolicy,
    ) -> Self {
        Self {
            entities,
            identity,
            policy,
        }
    }

    /// Unknown persons resolve to `Employee`.
    pub fn resolve_role(&self, person_id: &str) -> RoleName {
        self.identity
            .role_of(person_id)
            .unwrap_or(RoleName::Employee)
    }

    /// Unknown persons and unknown entity ids contribute nothing; this never fails.
    pub fn resolve_accessible_entities(
        &self,
        person_id: &str,
        role: &RoleName,
    ) -> BTreeSet<String> {
        let universe: BTreeSet<String> = self.entities.iter().map(|e| e.id.clone()).collect();

        match self.policy.scope_of(role) {
            AccessScope::AllEntities => universe,
            AccessScope::Assigned => {
                let assigned = self
                    .identity
                    .accessible_entities_of(person_id)
                    .unwrap_or_default();

                assigned
                    .into_iter()
                    .filter(|id| universe.contains(id))
                    .collect()
            }
        }
    }

    pub fn resolve_permissions(&self, role: &RoleName) -> BTreeSet<String> {
        self.policy.permissions_for(role)
    }

    pub fn grant(&self, person_id: &str) -> AccessGrant {
        let role = self.resolve_role(person_id);
        let entity_ids = self.resolve_accessible_entities(person_id, &role);
        let permissions = self.resolve_permissions(&role);

        debug!(
            "Resolved {} as {} with access to {} of {} entities",
            person_id,
            role,
            entity_ids.len(),
            self.entities.len()
        );

        AccessGrant {
            person_id: person_id.to_string(),
            role,
            entity_ids,
            permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityCategory, RecordStatus};
    use chrono::{TimeZone, Utc};

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.to_string(),
            name: format!("{} Pvt Ltd", id),
            code: id.to_string(),
            category: EntityCategory::Trading,
            gstin: String::new(),
            status: RecordStatus::Active,
            fiscal_year: "2024-25".to_string(),
            access_users: vec![],
        }
    }

    fn person(id: &str, role: &str, companies: &[&str]) -> Person {
        Person {
            id: id.to_string(),
            name: id.to_string(),
            email: String::new(),
            phone: String::new(),
            role: role.to_string(),
            department: String::new(),
            status: RecordStatus::Active,
            accessible_companies: companies.iter().map(|c| c.to_string()).collect(),
            permissions: vec![],
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            last_access: None,
        }
    }

    fn fixtures() -> (Vec<Entity>, Vec<Person>) {
        let entities = vec![entity("COMP001"), entity("COMP002"), entity("COMP003")];
        let persons = vec![
            person("EMP001", "Super Admin", &[]),
            person("EMP002", "Admin", &["COMP001", "COMP002"]),
            person("EMP003", "Employee", &["COMP003", "COMP999"]),
        ];
        (entities, persons)
    }

    #[test]
    fn test_super_admin_sees_full_universe() {
        let (entities, persons) = fixtures();
        let identity = RosterIdentityProvider::new(&persons);
        let policy = RoleHierarchy::default();
        let resolver = AccessResolver::new(&entities, &identity, &policy);

        let grant = resolver.grant("EMP001");
        assert_eq!(grant.role, RoleName::SuperAdmin);
        assert_eq!(grant.entity_ids.len(), 3);
        assert!(grant.has_permission(MANAGE_USERS));
    }

    #[test]
    fn test_assigned_access_is_contained_in_grant_list() {
        let (entities, persons) = fixtures();
        let identity = RosterIdentityProvider::new(&persons);
        let policy = RoleHierarchy::default();
        let resolver = AccessResolver::new(&entities, &identity, &policy);

        for p in persons.iter().filter(|p| p.role_name() != RoleName::SuperAdmin) {
            let role = resolver.resolve_role(&p.id);
            let accessible = resolver.resolve_accessible_entities(&p.id, &role);
            for id in &accessible {
                assert!(p.accessible_companies.contains(id));
            }
        }

        let grant = resolver.grant("EMP003");
        assert_eq!(grant.entity_ids.len(), 1);
        assert!(grant.can_view("COMP003"));
        assert!(!grant.can_view("COMP999"));
    }

    #[test]
    fn test_unknown_person_degrades_to_empty_employee() {
        let (entities, persons) = fixtures();
        let identity = RosterIdentityProvider::new(&persons);
        let policy = RoleHierarchy::default();
        let resolver = AccessResolver::new(&entities, &identity, &policy);

        let grant = resolver.grant("NOBODY");
        assert_eq!(grant.role, RoleName::Employee);
        assert!(grant.entity_ids.is_empty());
        assert_eq!(grant.permissions, policy.permissions_for(&RoleName::Employee));
    }

    #[test]
    fn test_permission_sets_narrow_down_the_hierarchy() {
        let policy = RoleHierarchy::default();
        let super_admin = policy.permissions_for(&RoleName::SuperAdmin);
        let admin = policy.permissions_for(&RoleName::Admin);
        let employee = policy.permissions_for(&RoleName::Employee);

        assert!(employee.len() < admin.len());
        assert!(admin.len() < super_admin.len());
        assert!(employee.is_subset(&admin));
        assert!(!admin.contains(MANAGE_USERS));
    }

    struct FixedIdentity;

    impl IdentityProvider for FixedIdentity {
        fn role_of(&self, _person_id: &str) -> Option<RoleName> {
            Some(RoleName::Admin)
        }

        fn accessible_entities_of(&self, _person_id: &str) -> Option<Vec<String>> {
            Some(vec!["COMP002".to_string()])
        }
    }

    #[test]
    fn test_injected_identity_and_policy() {
        let (entities, _) = fixtures();
        let policy = RoleHierarchy::new().with_permissions(RoleName::Admin, &[EXPORT_REPORTS]);
        let resolver = AccessResolver::new(&entities, &FixedIdentity, &policy);

        let grant = resolver.grant("anyone");
        assert_eq!(grant.role, RoleName::Admin);
        assert_eq!(grant.entity_ids.iter().collect::<Vec<_>>(), vec!["COMP002"]);
        assert_eq!(grant.permissions.len(), 1);
        assert!(grant.has_permission(EXPORT_REPORTS));
    }
}
