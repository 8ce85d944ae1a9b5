//! Warden Config - 통합 설정
//!
//! 기본값 → JSON 파일 → 환경 변수 순서로 덮어쓴다.
//! 런타임에는 다시 검증하지 않으며, 시작 시 존재 여부만 확인한다.

use crate::permission::USERS_FILE;
use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 설정 파일명
pub const WARDEN_CONFIG_FILE: &str = "config.json";

// 환경 변수 이름
pub const ENV_TOKEN: &str = "WARDEN_TOKEN";
pub const ENV_OWNER_ID: &str = "WARDEN_OWNER_ID";
pub const ENV_ALLOWED_GROUP: &str = "WARDEN_ALLOWED_GROUP";
pub const ENV_DENYLIST: &str = "WARDEN_DENYLIST";
pub const ENV_MAX_RETRIES: &str = "WARDEN_MAX_RETRIES";
pub const ENV_USERS_FILE: &str = "WARDEN_USERS_FILE";

/// HostWarden 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WardenConfig {
    /// 메시징 채널 인증 정보
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// 부트스트랩 Owner principal id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// 허용된 그룹 채팅 id (None이면 제한 없음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_group: Option<String>,

    /// 실행 금지 명령어 (첫 토큰, 대소문자 무시)
    pub denylist: Vec<String>,

    /// 전송 재시도 횟수 (1 이상)
    pub max_retries: u32,

    /// 재시도 간격 (ms)
    pub retry_backoff_ms: u64,

    /// 리소스 알림 점검 주기 (초)
    pub alert_interval_secs: u64,

    /// 같은 카테고리 알림 최소 간격 (초)
    pub alert_cooldown_secs: u64,

    /// 응답 메시지 최대 길이 (문자)
    pub output_limit: usize,

    /// 잘라낼 때 앞/뒤로 남길 길이 (문자)
    pub output_keep: usize,

    /// 사용자 테이블 경로 (None이면 글로벌 설정 디렉토리)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_file: Option<PathBuf>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner_id: None,
            allowed_group: None,
            denylist: vec!["htop".to_string(), "shutdown".to_string()],
            max_retries: 3,
            retry_backoff_ms: 1000,
            alert_interval_secs: 60,
            alert_cooldown_secs: 300,
            output_limit: 4000,
            output_keep: 1500,
            users_file: None,
        }
    }
}

impl WardenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 파일 + 환경 변수 로드
    ///
    /// `path`가 없으면 글로벌 설정 디렉토리의 `config.json`을 (있으면) 읽는다.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let (store, filename) = JsonStore::for_file(path)?;
                store.load::<WardenConfig>(&filename)?
            }
            None => match JsonStore::global() {
                Ok(store) => store
                    .load_optional::<WardenConfig>(WARDEN_CONFIG_FILE)?
                    .unwrap_or_default(),
                Err(_) => Self::default(),
            },
        };

        config.apply_env()?;
        Ok(config)
    }

    /// 프로세스 환경 변수 적용
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 환경 변수 적용 (테스트용 주입 가능)
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_TOKEN) {
            self.token = Some(token);
        }
        if let Some(owner) = get(ENV_OWNER_ID) {
            self.owner_id = Some(owner.trim().to_string());
        }
        if let Some(group) = get(ENV_ALLOWED_GROUP) {
            self.allowed_group = Some(group.trim().to_string());
        }
        if let Some(list) = get(ENV_DENYLIST) {
            self.denylist = list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(retries) = get(ENV_MAX_RETRIES) {
            self.max_retries = retries.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a positive integer", ENV_MAX_RETRIES))
            })?;
        }
        if let Some(users) = get(ENV_USERS_FILE) {
            self.users_file = Some(PathBuf::from(users));
        }
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// 시작 시 존재 여부 검사
    pub fn validate(&self) -> Result<()> {
        if self.owner_id().is_none() {
            return Err(Error::Config(format!(
                "Owner id is not configured (set {} or ownerId)",
                ENV_OWNER_ID
            )));
        }
        if self.max_retries == 0 {
            return Err(Error::Config("maxRetries must be at least 1".to_string()));
        }
        if self.output_keep.saturating_mul(2) >= self.output_limit {
            return Err(Error::Config(format!(
                "outputKeep ({}) must be less than half of outputLimit ({})",
                self.output_keep, self.output_limit
            )));
        }
        Ok(())
    }

    /// 네트워크 전송에 필요한 인증 정보
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("Bot credential is not set ({})", ENV_TOKEN)))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 사용자 테이블 경로
    pub fn users_path(&self) -> Result<PathBuf> {
        match &self.users_file {
            Some(path) => Ok(path.clone()),
            None => Ok(JsonStore::global()?.file_path(USERS_FILE)),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs.max(1))
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.users_file = Some(path.into());
        self
    }

    pub fn denylist<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist = commands.into_iter().map(Into::into).collect();
        self
    }
}
