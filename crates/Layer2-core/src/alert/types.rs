//! Alert data types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

// ============================================================================
// AlertCategory
// ============================================================================

/// 알림 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Security,
    Cpu,
    Memory,
    Disk,
}

impl AlertCategory {
    /// All categories
    pub const ALL: [AlertCategory; 4] = [Self::Security, Self::Cpu, Self::Memory, Self::Disk];

    /// Resource categories in check order
    pub const RESOURCES: [AlertCategory; 3] = [Self::Cpu, Self::Memory, Self::Disk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Disk => "disk",
        }
    }

    /// Threshold-driven category
    pub fn is_resource(&self) -> bool {
        !matches!(self, Self::Security)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Security => "Security",
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
            Self::Disk => "Disk",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unknown category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown alert category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for AlertCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "security" => Ok(Self::Security),
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

// ============================================================================
// Severity / Alert
// ============================================================================

/// 알림 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 생성 → 전달 → 폐기되는 일회성 알림
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub category: AlertCategory,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Local>,
    pub source: String,
}

impl Alert {
    pub fn new(
        category: AlertCategory,
        severity: Severity,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            timestamp: Local::now(),
            source: source.into(),
        }
    }

    /// Text pushed to the owner
    pub fn render(&self) -> String {
        format!(
            "[{}] {}\n{}",
            self.severity.as_str().to_uppercase(),
            self.message,
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

// ============================================================================
// AlertRule
// ============================================================================

/// Per-category rule
#[derive(Debug, Clone)]
pub struct AlertRule {
    pub category: AlertCategory,
    pub enabled: bool,
    /// Percent threshold, None for security
    pub threshold: Option<f64>,
    pub last_fired_at: Option<Instant>,
}

impl AlertRule {
    pub fn new(category: AlertCategory, threshold: Option<f64>) -> Self {
        Self {
            category,
            enabled: true,
            threshold,
            last_fired_at: None,
        }
    }

    /// Still inside the cooldown window at `now`
    pub fn in_cooldown(&self, now: Instant, cooldown: std::time::Duration) -> bool {
        match self.last_fired_at {
            Some(fired) => now.saturating_duration_since(fired) < cooldown,
            None => false,
        }
    }

    /// Enabled and outside cooldown
    pub fn is_armed(&self, now: Instant, cooldown: std::time::Duration) -> bool {
        self.enabled && !self.in_cooldown(now, cooldown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_category_parse() {
        assert_eq!("CPU".parse::<AlertCategory>().unwrap(), AlertCategory::Cpu);
        assert_eq!(" disk ".parse::<AlertCategory>().unwrap(), AlertCategory::Disk);
        assert!("network".parse::<AlertCategory>().is_err());
    }

    #[test]
    fn test_rule_cooldown() {
        let start = Instant::now();
        let cooldown = Duration::from_secs(300);
        let mut rule = AlertRule::new(AlertCategory::Cpu, Some(80.0));
        assert!(rule.is_armed(start, cooldown));

        rule.last_fired_at = Some(start);
        assert!(!rule.is_armed(start + Duration::from_secs(299), cooldown));
        assert!(rule.is_armed(start + Duration::from_secs(300), cooldown));

        rule.enabled = false;
        assert!(!rule.is_armed(start + Duration::from_secs(600), cooldown));
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Danger > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
