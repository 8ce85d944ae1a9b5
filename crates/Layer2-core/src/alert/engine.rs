//! Alert Engine - 임계값 + 쿨다운 기반 알림 생성
//!
//! 규칙 잠금은 샘플링 동안 잡지 않는다. 샘플 후 다시 잠그고 규칙을 재확인한 뒤
//! 발화 시각을 기록한다.

use super::probe::{ResourceProbe, SysinfoProbe};
use super::types::{Alert, AlertCategory, AlertRule, Severity};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default per-category cooldown
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Default resource threshold (percent)
pub const DEFAULT_THRESHOLD: f64 = 80.0;

const SOURCE_ACCESS: &str = "access_control";
const SOURCE_MONITOR: &str = "system_monitor";

pub struct AlertEngine {
    rules: Mutex<BTreeMap<AlertCategory, AlertRule>>,
    cooldown: Duration,
    probe: Mutex<Box<dyn ResourceProbe>>,
}

impl AlertEngine {
    /// Engine sampling the local host
    pub fn new(cooldown: Duration) -> Self {
        Self::with_probe(cooldown, Box::new(SysinfoProbe::new()))
    }

    pub fn with_probe(cooldown: Duration, probe: Box<dyn ResourceProbe>) -> Self {
        let rules = AlertCategory::ALL
            .iter()
            .map(|&category| {
                let threshold = category.is_resource().then_some(DEFAULT_THRESHOLD);
                (category, AlertRule::new(category, threshold))
            })
            .collect();

        Self {
            rules: Mutex::new(rules),
            cooldown,
            probe: Mutex::new(probe),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    // ========================================================================
    // Checks
    // ========================================================================

    /// Security alert for a denied principal (cooldown-limited)
    pub fn check_unauthorized_access(&self, principal_id: &str, display_name: &str) -> Option<Alert> {
        self.check_unauthorized_access_at(principal_id, display_name, Instant::now())
    }

    pub fn check_unauthorized_access_at(
        &self,
        principal_id: &str,
        display_name: &str,
        now: Instant,
    ) -> Option<Alert> {
        let mut rules = self.rules.lock();
        let rule = rules.get_mut(&AlertCategory::Security)?;
        if !rule.is_armed(now, self.cooldown) {
            debug!("Security alert suppressed for {}", principal_id);
            return None;
        }

        rule.last_fired_at = Some(now);
        warn!("Unauthorized access attempt by {} ({})", display_name, principal_id);
        Some(Alert::new(
            AlertCategory::Security,
            Severity::Danger,
            format!(
                "Unauthorized access attempt\nUser: {}\nID: {}",
                display_name, principal_id
            ),
            SOURCE_ACCESS,
        ))
    }

    /// Sample resources, return the first breach in cpu → memory → disk order
    ///
    /// 블로킹 호출. 첫 위반 이후 카테고리는 샘플링하지 않는다.
    pub fn check_system_resources(&self) -> Option<Alert> {
        self.check_system_resources_at(Instant::now())
    }

    pub fn check_system_resources_at(&self, now: Instant) -> Option<Alert> {
        for category in AlertCategory::RESOURCES {
            if !self.is_armed(category, now) {
                continue;
            }

            let Some(value) = self.probe.lock().sample(category) else {
                debug!("No {} sample available", category);
                continue;
            };

            let mut rules = self.rules.lock();
            let Some(rule) = rules.get_mut(&category) else {
                continue;
            };
            // 샘플링 중 규칙이 바뀌었을 수 있음
            if !rule.is_armed(now, self.cooldown) {
                continue;
            }
            let Some(threshold) = rule.threshold else {
                continue;
            };
            if value <= threshold {
                continue;
            }

            rule.last_fired_at = Some(now);
            info!("{} usage {:.1}% exceeds {}%", category, value, threshold);
            return Some(Alert::new(
                category,
                Severity::Warning,
                format!(
                    "{} alert\nCurrent usage: {:.1}%\nThreshold: {}%",
                    category.label(),
                    value,
                    threshold
                ),
                SOURCE_MONITOR,
            ));
        }
        None
    }

    fn is_armed(&self, category: AlertCategory, now: Instant) -> bool {
        self.rules
            .lock()
            .get(&category)
            .map(|rule| rule.is_armed(now, self.cooldown))
            .unwrap_or(false)
    }

    // ========================================================================
    // Management
    // ========================================================================

    /// Set a resource threshold, false for unknown category or value outside 0-100
    pub fn set_threshold(&self, category: &str, value: f64) -> bool {
        let Ok(category) = category.parse::<AlertCategory>() else {
            return false;
        };
        if !category.is_resource() || !(0.0..=100.0).contains(&value) {
            return false;
        }

        match self.rules.lock().get_mut(&category) {
            Some(rule) => {
                rule.threshold = Some(value);
                info!("{} threshold set to {}%", category, value);
                true
            }
            None => false,
        }
    }

    /// Enable or disable a category, false for unknown category
    pub fn toggle_alert(&self, category: &str, enabled: bool) -> bool {
        let Ok(category) = category.parse::<AlertCategory>() else {
            return false;
        };

        match self.rules.lock().get_mut(&category) {
            Some(rule) => {
                rule.enabled = enabled;
                info!(
                    "{} alerts {}",
                    category,
                    if enabled { "enabled" } else { "disabled" }
                );
                true
            }
            None => false,
        }
    }

    pub fn get_alert_status(&self) -> BTreeMap<AlertCategory, bool> {
        self.rules
            .lock()
            .iter()
            .map(|(category, rule)| (*category, rule.enabled))
            .collect()
    }

    /// Current resource thresholds
    pub fn thresholds(&self) -> BTreeMap<AlertCategory, f64> {
        self.rules
            .lock()
            .iter()
            .filter_map(|(category, rule)| rule.threshold.map(|t| (*category, t)))
            .collect()
    }
}
