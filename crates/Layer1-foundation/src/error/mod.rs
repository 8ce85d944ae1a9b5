//! Error types for HostWarden
//!
//! 모든 foundation 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// HostWarden foundation 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 권한 관련
    // ========================================================================
    #[error("User already registered: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Owner cannot be {0}")]
    OwnerImmutable(&'static str),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::UserExists(_)
                | Error::UserNotFound(_)
                | Error::OwnerImmutable(_)
                | Error::InvalidRole(_)
                | Error::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing() {
        assert!(Error::UserExists("42".into()).is_user_facing());
        assert!(Error::OwnerImmutable("removed").is_user_facing());
        assert!(!Error::Storage("disk full".into()).is_user_facing());
    }

    #[test]
    fn test_owner_immutable_message() {
        let err = Error::OwnerImmutable("removed");
        assert_eq!(err.to_string(), "Owner cannot be removed");
    }
}
