//! Permission registry - principal → role → capability
//!
//! 사용자 테이블을 메모리에 유지하고 모든 변경을 JSON 파일로 원자적으로 저장한다.
//! 저장이 실패하면 메모리 상태는 호출 이전으로 되돌린다.

use super::types::{CapabilitySet, Role, UserRecord};
use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// 사용자 테이블 기본 파일명
pub const USERS_FILE: &str = "users.json";

/// 부트스트랩 Owner의 표시 이름
const OWNER_DISPLAY_NAME: &str = "Owner";

// ============================================================================
// Persisted form
// ============================================================================

/// 저장되는 사용자 값: `{ "display_name": ..., "role": "admin" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    #[serde(alias = "username")]
    display_name: String,
    role: Role,
}

/// 등록 순서를 유지하는 사용자 테이블
///
/// JSON object로 저장되지만 키 순서는 등록 순서 그대로 유지된다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UserTable {
    records: Vec<UserRecord>,
}

impl UserTable {
    fn get(&self, id: &str) -> Option<&UserRecord> {
        self.records.iter().find(|r| r.principal_id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut UserRecord> {
        self.records.iter_mut().find(|r| r.principal_id == id)
    }

    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

impl Serialize for UserTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(
                &record.principal_id,
                &StoredUser {
                    display_name: record.display_name.clone(),
                    role: record.role,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for UserTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = UserTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of principal id to user record")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut table = UserTable::default();
                while let Some((id, stored)) = access.next_entry::<String, StoredUser>()? {
                    // 중복 키는 마지막 값으로 덮어씀 (JSON 관례)
                    if let Some(existing) = table.get_mut(&id) {
                        existing.display_name = stored.display_name;
                        existing.role = stored.role;
                    } else {
                        table
                            .records
                            .push(UserRecord::new(id, stored.display_name, stored.role));
                    }
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// 사용자/권한 레지스트리
///
/// 불변식: Owner는 항상 정확히 1명이며 설정된 owner id와 일치한다.
pub struct PermissionRegistry {
    /// 저장 위치 (None이면 메모리 전용)
    store: Option<(JsonStore, String)>,

    owner_id: String,

    users: RwLock<UserTable>,
}

impl PermissionRegistry {
    /// 파일에서 로드하고 Owner를 보정한다
    ///
    /// 파일이 없으면 빈 테이블로 시작하며, 설정된 owner가 없으면 Owner로 합성된다.
    pub fn open(path: &Path, owner_id: &str) -> Result<Self> {
        let (store, filename) = JsonStore::for_file(path)?;
        let table = store
            .load_optional::<UserTable>(&filename)?
            .unwrap_or_default();
        debug!(
            "Loaded {} user(s) from {}",
            table.records.len(),
            path.display()
        );

        let registry = Self::build(Some((store, filename)), owner_id, table)?;
        registry.persist_current()?;
        Ok(registry)
    }

    /// 메모리 전용 레지스트리 (저장 없음)
    pub fn in_memory(owner_id: &str) -> Result<Self> {
        Self::build(None, owner_id, UserTable::default())
    }

    fn build(
        store: Option<(JsonStore, String)>,
        owner_id: &str,
        mut table: UserTable,
    ) -> Result<Self> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(Error::Config("Owner id must not be empty".to_string()));
        }
        ensure_owner(&mut table, owner_id);

        Ok(Self {
            store,
            owner_id: owner_id.to_string(),
            users: RwLock::new(table),
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// 사용자 역할 조회
    pub fn get_role(&self, principal_id: &str) -> Option<Role> {
        self.users.read().ok()?.get(principal_id).map(|r| r.role)
    }

    /// 사용자 권한 조회 (None이면 미등록)
    pub fn capabilities(&self, principal_id: &str) -> Option<CapabilitySet> {
        self.get_role(principal_id).map(|role| role.capabilities())
    }

    /// 사용자 레코드 조회
    pub fn get_user(&self, principal_id: &str) -> Option<UserRecord> {
        self.users.read().ok()?.get(principal_id).cloned()
    }

    /// 등록 순서대로 전체 사용자
    pub fn list_users(&self) -> Vec<UserRecord> {
        self.users
            .read()
            .map(|t| t.records.clone())
            .unwrap_or_default()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn is_owner(&self, principal_id: &str) -> bool {
        self.get_role(principal_id) == Some(Role::Owner)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// 사용자 추가 (Owner 역할 또는 중복 id는 거부)
    pub fn add_user(&self, principal_id: &str, display_name: &str, role: Role) -> Result<()> {
        let principal_id = principal_id.trim();
        if principal_id.is_empty() {
            return Err(Error::InvalidInput("Principal id must not be empty".into()));
        }
        if role == Role::Owner {
            return Err(Error::OwnerImmutable("assigned"));
        }

        self.mutate(|table| {
            if table.contains(principal_id) {
                return Err(Error::UserExists(principal_id.to_string()));
            }
            table
                .records
                .push(UserRecord::new(principal_id, display_name, role));
            Ok(())
        })?;

        info!("User {} added as {}", principal_id, role);
        Ok(())
    }

    /// 사용자 삭제 (Owner는 삭제 불가)
    pub fn remove_user(&self, principal_id: &str) -> Result<UserRecord> {
        let removed = self.mutate(|table| {
            let index = table
                .records
                .iter()
                .position(|r| r.principal_id == principal_id)
                .ok_or_else(|| Error::UserNotFound(principal_id.to_string()))?;
            if table.records[index].role == Role::Owner {
                return Err(Error::OwnerImmutable("removed"));
            }
            Ok(table.records.remove(index))
        })?;

        info!("User {} removed", principal_id);
        Ok(removed)
    }

    /// 역할 변경 (Owner 대상 또는 Owner로의 변경은 거부)
    pub fn set_role(&self, principal_id: &str, new_role: Role) -> Result<()> {
        self.mutate(|table| {
            let record = table
                .get_mut(principal_id)
                .ok_or_else(|| Error::UserNotFound(principal_id.to_string()))?;
            if record.role == Role::Owner {
                return Err(Error::OwnerImmutable("changed"));
            }
            if new_role == Role::Owner {
                return Err(Error::OwnerImmutable("assigned"));
            }
            record.role = new_role;
            Ok(())
        })?;

        info!("User {} role set to {}", principal_id, new_role);
        Ok(())
    }

    /// 변경 적용 + 저장, 저장 실패 시 롤백
    fn mutate<T>(&self, f: impl FnOnce(&mut UserTable) -> Result<T>) -> Result<T> {
        let mut table = self
            .users
            .write()
            .map_err(|_| Error::Internal("User table lock poisoned".to_string()))?;

        let snapshot = table.clone();
        let value = f(&mut table)?;

        if let Err(e) = self.persist(&table) {
            warn!("Failed to persist user table, rolling back: {}", e);
            *table = snapshot;
            return Err(e);
        }
        Ok(value)
    }

    fn persist(&self, table: &UserTable) -> Result<()> {
        match &self.store {
            Some((store, filename)) => store.save(filename, table),
            None => Ok(()),
        }
    }

    fn persist_current(&self) -> Result<()> {
        let table = self
            .users
            .read()
            .map_err(|_| Error::Internal("User table lock poisoned".to_string()))?;
        self.persist(&table)
    }
}

/// 설정된 owner를 유일한 Owner로 만든다
fn ensure_owner(table: &mut UserTable, owner_id: &str) {
    for record in table.records.iter_mut() {
        if record.role == Role::Owner && record.principal_id != owner_id {
            warn!(
                "Demoting stale owner {} to admin (configured owner is {})",
                record.principal_id, owner_id
            );
            record.role = Role::Admin;
        }
    }

    match table.get_mut(owner_id) {
        Some(record) => {
            if record.role != Role::Owner {
                warn!("Promoting configured owner {} to owner", owner_id);
                record.role = Role::Owner;
            }
        }
        None => {
            info!("Registering configured owner {}", owner_id);
            table
                .records
                .push(UserRecord::new(owner_id, OWNER_DISPLAY_NAME, Role::Owner));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Capability;

    const OWNER: &str = "1000";

    fn owner_count(registry: &PermissionRegistry) -> usize {
        registry
            .list_users()
            .iter()
            .filter(|u| u.role == Role::Owner)
            .count()
    }

    #[test]
    fn test_bootstrap_owner() {
        let registry = PermissionRegistry::in_memory(OWNER).unwrap();
        assert_eq!(registry.get_role(OWNER), Some(Role::Owner));
        assert_eq!(owner_count(&registry), 1);
        assert!(registry.capabilities("unknown").is_none());
    }

    #[test]
    fn test_empty_owner_rejected() {
        assert!(matches!(
            PermissionRegistry::in_memory("  "),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_add_user() {
        let registry = PermissionRegistry::in_memory(OWNER).unwrap();
        registry.add_user("2000", "alice", Role::Admin).unwrap();

        let caps = registry.capabilities("2000").unwrap();
        assert!(caps.allows(Capability::ExecuteCommands));
        assert!(!caps.allows(Capability::ManageUsers));

        assert!(matches!(
            registry.add_user("2000", "alice again", Role::Monitor),
            Err(Error::UserExists(_))
        ));
        assert!(matches!(
            registry.add_user("3000", "mallory", Role::Owner),
            Err(Error::OwnerImmutable(_))
        ));
        assert_eq!(owner_count(&registry), 1);
    }

    #[test]
    fn test_owner_is_immutable() {
        let registry = PermissionRegistry::in_memory(OWNER).unwrap();
        registry.add_user("2000", "alice", Role::Monitor).unwrap();
        let before = registry.list_users();

        assert!(matches!(
            registry.remove_user(OWNER),
            Err(Error::OwnerImmutable(_))
        ));
        assert!(matches!(
            registry.set_role(OWNER, Role::Admin),
            Err(Error::OwnerImmutable(_))
        ));
        assert!(matches!(
            registry.set_role("2000", Role::Owner),
            Err(Error::OwnerImmutable(_))
        ));

        assert_eq!(registry.list_users(), before);
    }

    #[test]
    fn test_remove_and_set_role_unknown() {
        let registry = PermissionRegistry::in_memory(OWNER).unwrap();
        assert!(matches!(
            registry.remove_user("404"),
            Err(Error::UserNotFound(_))
        ));
        assert!(matches!(
            registry.set_role("404", Role::Admin),
            Err(Error::UserNotFound(_))
        ));
    }

    #[test]
    fn test_owner_count_invariant_over_sequence() {
        let registry = PermissionRegistry::in_memory(OWNER).unwrap();
        let _ = registry.add_user("a", "a", Role::Admin);
        let _ = registry.add_user("b", "b", Role::Monitor);
        let _ = registry.set_role("a", Role::Monitor);
        let _ = registry.set_role("b", Role::Owner);
        let _ = registry.remove_user("a");
        let _ = registry.remove_user(OWNER);
        let _ = registry.add_user("c", "c", Role::Owner);
        assert_eq!(owner_count(&registry), 1);
        assert!(registry.is_owner(OWNER));
    }

    #[test]
    fn test_list_order_is_registration_order() {
        let registry = PermissionRegistry::in_memory(OWNER).unwrap();
        registry.add_user("z", "zed", Role::Admin).unwrap();
        registry.add_user("a", "amy", Role::Monitor).unwrap();

        let ids: Vec<_> = registry
            .list_users()
            .into_iter()
            .map(|u| u.principal_id)
            .collect();
        assert_eq!(ids, vec![OWNER, "z", "a"]);
        assert_eq!(registry.list_users(), registry.list_users());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join(USERS_FILE);

        {
            let registry = PermissionRegistry::open(&path, OWNER).unwrap();
            registry.add_user("z", "zed", Role::Admin).unwrap();
            registry.add_user("a", "amy", Role::Monitor).unwrap();
            registry.set_role("a", Role::Admin).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"role\": \"admin\""));

        let reloaded = PermissionRegistry::open(&path, OWNER).unwrap();
        let ids: Vec<_> = reloaded
            .list_users()
            .into_iter()
            .map(|u| u.principal_id)
            .collect();
        assert_eq!(ids, vec![OWNER, "z", "a"]);
        assert_eq!(reloaded.get_role("a"), Some(Role::Admin));
    }

    #[test]
    fn test_load_legacy_username_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(USERS_FILE);
        std::fs::write(
            &path,
            r#"{ "1000": { "username": "Principal", "role": "owner" },
                 "55": { "username": "bob", "role": "monitor" } }"#,
        )
        .unwrap();

        let registry = PermissionRegistry::open(&path, OWNER).unwrap();
        let users = registry.list_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].display_name, "Principal");
        assert_eq!(users[1].role, Role::Monitor);
    }

    #[test]
    fn test_configured_owner_replaces_stale_owner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(USERS_FILE);
        std::fs::write(
            &path,
            r#"{ "999": { "display_name": "old", "role": "owner" } }"#,
        )
        .unwrap();

        let registry = PermissionRegistry::open(&path, OWNER).unwrap();
        assert_eq!(registry.get_role("999"), Some(Role::Admin));
        assert_eq!(registry.get_role(OWNER), Some(Role::Owner));
        assert_eq!(owner_count(&registry), 1);
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join(USERS_FILE);
        let registry = PermissionRegistry::open(&path, OWNER).unwrap();
        registry.add_user("a", "amy", Role::Admin).unwrap();

        // 저장 디렉토리를 파일로 바꿔 이후 저장이 실패하도록 함
        std::fs::remove_dir_all(dir.path().join("state")).unwrap();
        std::fs::write(dir.path().join("state"), "not a dir").unwrap();

        let before = registry.list_users();
        assert!(registry.add_user("b", "bob", Role::Monitor).is_err());
        assert!(registry.remove_user("a").is_err());
        assert!(registry.set_role("a", Role::Monitor).is_err());
        assert_eq!(registry.list_users(), before);
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(USERS_FILE);
        std::fs::write(&path, r#"{ "1": { "display_name": "x", "role": "root" } }"#).unwrap();
        assert!(PermissionRegistry::open(&path, OWNER).is_err());
    }
}
