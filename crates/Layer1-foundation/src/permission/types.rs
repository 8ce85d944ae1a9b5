//! 권한 타입 정의
//!
//! Role은 닫힌 enum이고, CapabilitySet은 Role로부터 계산되는 순수 함수 결과다.
//! 사용자별로 capability를 저장하지 않는다.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 사용자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 주 사용자, 모든 권한 (항상 정확히 1명)
    Owner,

    /// 사용자 관리를 제외한 모든 권한
    Admin,

    /// 조회 전용
    Monitor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Monitor => "monitor",
        }
    }

    /// Role → CapabilitySet (고정 테이블)
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            Role::Owner => CapabilitySet {
                can_execute_commands: true,
                can_view_info: true,
                can_manage_users: true,
                can_manage_alerts: true,
            },
            Role::Admin => CapabilitySet {
                can_execute_commands: true,
                can_view_info: true,
                can_manage_users: false,
                can_manage_alerts: true,
            },
            Role::Monitor => CapabilitySet {
                can_execute_commands: false,
                can_view_info: true,
                can_manage_users: false,
                can_manage_alerts: false,
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    /// 경계에서의 파싱 - 알 수 없는 문자열은 기본값 없이 에러
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "monitor" => Ok(Role::Monitor),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// 이름 붙은 단일 권한
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ExecuteCommands,
    ViewInfo,
    ManageUsers,
    ManageAlerts,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ExecuteCommands => "execute_commands",
            Capability::ViewInfo => "view_info",
            Capability::ManageUsers => "manage_users",
            Capability::ManageAlerts => "manage_alerts",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role에서 파생된 권한 집합
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    pub can_execute_commands: bool,
    pub can_view_info: bool,
    pub can_manage_users: bool,
    pub can_manage_alerts: bool,
}

impl CapabilitySet {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ExecuteCommands => self.can_execute_commands,
            Capability::ViewInfo => self.can_view_info,
            Capability::ManageUsers => self.can_manage_users,
            Capability::ManageAlerts => self.can_manage_alerts,
        }
    }
}

/// 등록된 사용자
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub principal_id: String,
    pub display_name: String,
    pub role: Role,
}

impl UserRecord {
    pub fn new(principal_id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            principal_id: principal_id.into(),
            display_name: display_name.into(),
            role,
        }
    }
}
