//! Dispatcher - 명령별 처리기
//!
//! 실행기/레지스트리 오류는 데이터이므로 응답 텍스트로 돌려준다.
//! 저장소 오류처럼 사용자에게 보여줄 수 없는 실패만 `HandlerError::Failed`가 된다.
//! 상태를 실제로 바꾼 응답만 `HandlerReply::performed`로 표시한다.

use crate::commands::{usage, Command, HELP_ENTRIES};
use crate::handler::{Handler, HandlerError, HandlerReply, RequestContext};
use crate::session::SessionContext;
use anyhow::anyhow;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{error, info};
use warden_core::system::TOP_PROCESSES;
use warden_core::{
    truncate_middle, AlertCategory, AlertEngine, DiskSnapshot, NetworkSnapshot, ProcessSnapshot,
    SystemSnapshot,
};
use warden_foundation::{CapabilitySet, PermissionRegistry, Role};

/// Reply size bound
#[derive(Debug, Clone, Copy)]
pub struct OutputBounds {
    pub limit: usize,
    pub keep: usize,
}

impl Default for OutputBounds {
    fn default() -> Self {
        Self {
            limit: 4000,
            keep: 1500,
        }
    }
}

impl OutputBounds {
    pub fn apply(&self, text: &str) -> String {
        truncate_middle(text, self.limit, self.keep)
    }
}

pub struct Dispatcher {
    session: Arc<SessionContext>,
    registry: Arc<PermissionRegistry>,
    alerts: Arc<AlertEngine>,
    bounds: OutputBounds,
}

impl Dispatcher {
    pub fn new(
        session: Arc<SessionContext>,
        registry: Arc<PermissionRegistry>,
        alerts: Arc<AlertEngine>,
        bounds: OutputBounds,
    ) -> Self {
        Self {
            session,
            registry,
            alerts,
            bounds,
        }
    }

    // ========================================================================
    // Terminal
    // ========================================================================

    async fn shell(&self, ctx: &RequestContext) -> HandlerReply {
        if !self.session.terminal_mode() {
            return HandlerReply::message("Terminal mode is not active. Use /run to enable it.");
        }

        let line = ctx.message.text.trim();
        info!(
            "Command from {} ({}): {}",
            ctx.principal.display_name, ctx.principal.principal_id, line
        );

        match self.session.executor().execute(line).await {
            Ok(output) => {
                let body = if output.is_empty() {
                    "Command executed successfully".to_string()
                } else {
                    output.combined_output()
                };
                HandlerReply::performed(self.bounds.apply(&format!("$ {}\n{}", line, body)))
            }
            Err(e) => {
                error!("Command from {} failed: {}", ctx.principal.principal_id, e);
                HandlerReply {
                    text: self.bounds.apply(&e.user_message()),
                    performed: !e.is_rejected(),
                }
            }
        }
    }

    // ========================================================================
    // Info
    // ========================================================================

    async fn blocking<T, F>(f: F) -> Result<T, HandlerError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| HandlerError::Failed(anyhow!("system query failed: {}", e)))
    }

    async fn info(&self) -> Result<String, HandlerError> {
        let cwd = self.session.executor().working_directory();
        let snapshot = Self::blocking(move || SystemSnapshot::collect(&cwd)).await?;
        Ok(snapshot.render())
    }

    // ========================================================================
    // Alerts
    // ========================================================================

    fn alert_status(&self) -> String {
        let thresholds = self.alerts.thresholds();
        let mut text = String::from("Alert status");
        for (category, enabled) in self.alerts.get_alert_status() {
            let _ = write!(
                text,
                "\n{}: {}",
                category,
                if enabled { "on" } else { "off" }
            );
            if let Some(threshold) = thresholds.get(&category) {
                let _ = write!(text, " (threshold {}%)", threshold);
            }
        }
        text
    }

    fn toggle_alert(&self, command: &Command, args: &[String]) -> HandlerReply {
        let [category, state] = args else {
            return HandlerReply::message(usage(command));
        };
        let enabled = match state.to_lowercase().as_str() {
            "on" => true,
            "off" => false,
            _ => return HandlerReply::message(usage(command)),
        };

        if self.alerts.toggle_alert(category, enabled) {
            HandlerReply::performed(format!(
                "{} alerts {}",
                category.to_lowercase(),
                if enabled { "enabled" } else { "disabled" }
            ))
        } else {
            HandlerReply::message(format!("Unknown alert category: {}", category))
        }
    }

    fn set_threshold(&self, command: &Command, args: &[String]) -> HandlerReply {
        let [category, value] = args else {
            return HandlerReply::message(usage(command));
        };
        let Ok(value) = value.trim_end_matches('%').parse::<f64>() else {
            return HandlerReply::message(usage(command));
        };

        if self.alerts.set_threshold(category, value) {
            return HandlerReply::performed(format!(
                "{} threshold set to {}%",
                category.to_lowercase(),
                value
            ));
        }
        HandlerReply::message(match category.parse::<AlertCategory>() {
            Ok(c) if c.is_resource() => "Threshold must be between 0 and 100".to_string(),
            _ => format!("Unknown resource category: {}", category),
        })
    }

    // ========================================================================
    // Users
    // ========================================================================

    fn list_users(&self) -> String {
        let mut text = String::from("Registered users");
        for user in self.registry.list_users() {
            let _ = write!(
                text,
                "\n{} - {} ({})",
                user.principal_id, user.display_name, user.role
            );
        }
        text
    }

    fn add_user(&self, command: &Command, args: &[String]) -> Result<HandlerReply, HandlerError> {
        if args.len() < 3 {
            return Ok(HandlerReply::message(usage(command)));
        }
        let id = &args[0];
        let role = &args[args.len() - 1];
        let name = args[1..args.len() - 1].join(" ");

        let role = match role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => return Ok(HandlerReply::message(e.to_string())),
        };
        registry_reply(
            self.registry.add_user(id, &name, role),
            format!("User {} ({}) added as {}", name, id, role),
        )
    }

    fn remove_user(&self, command: &Command, args: &[String]) -> Result<HandlerReply, HandlerError> {
        let [id] = args else {
            return Ok(HandlerReply::message(usage(command)));
        };
        match self.registry.remove_user(id) {
            Ok(user) => Ok(HandlerReply::performed(format!(
                "User {} ({}) removed",
                user.display_name, id
            ))),
            Err(e) if e.is_user_facing() => Ok(HandlerReply::message(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn set_role(&self, command: &Command, args: &[String]) -> Result<HandlerReply, HandlerError> {
        let [id, role] = args else {
            return Ok(HandlerReply::message(usage(command)));
        };
        let role = match role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => return Ok(HandlerReply::message(e.to_string())),
        };
        registry_reply(
            self.registry.set_role(id, role),
            format!("User {} is now {}", id, role),
        )
    }
}

fn registry_reply(
    result: warden_foundation::Result<()>,
    success: String,
) -> Result<HandlerReply, HandlerError> {
    match result {
        Ok(()) => Ok(HandlerReply::performed(success)),
        Err(e) if e.is_user_facing() => Ok(HandlerReply::message(e.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Command list filtered by what the caller may invoke
pub fn help_text(capabilities: &CapabilitySet) -> String {
    let mut text = String::from("Available commands\n\n/help - Show this list");
    for (name, usage, description) in HELP_ENTRIES {
        let allowed = Command::from_name(name)
            .required_capability()
            .map_or(true, |cap| capabilities.allows(cap));
        if allowed {
            let _ = write!(text, "\n{} - {}", usage, description);
        }
    }
    text
}

#[async_trait]
impl Handler for Dispatcher {
    async fn handle(&self, ctx: &RequestContext) -> Result<HandlerReply, HandlerError> {
        let command = &ctx.command;
        let args = ctx.args.as_slice();

        let reply = match command {
            Command::Start | Command::Help => HandlerReply::message(help_text(&ctx.capabilities)),
            Command::Run => {
                self.session.set_terminal_mode(true);
                HandlerReply::performed(
                    "Terminal mode enabled\nSend commands directly. Use /exit to leave.",
                )
            }
            Command::Exit => {
                self.session.set_terminal_mode(false);
                HandlerReply::performed("Terminal mode disabled")
            }
            Command::Shell => self.shell(ctx).await,
            Command::Info => HandlerReply::message(self.info().await?),
            Command::Ps => HandlerReply::message(
                Self::blocking(|| ProcessSnapshot::collect(TOP_PROCESSES).render()).await?,
            ),
            Command::Net => {
                HandlerReply::message(Self::blocking(|| NetworkSnapshot::collect().render()).await?)
            }
            Command::Disk => {
                HandlerReply::message(Self::blocking(|| DiskSnapshot::collect().render()).await?)
            }
            Command::Alerts => HandlerReply::message(self.alert_status()),
            Command::Alert => self.toggle_alert(command, args),
            Command::Threshold => self.set_threshold(command, args),
            Command::Users => HandlerReply::message(self.list_users()),
            Command::AddUser => self.add_user(command, args)?,
            Command::DelUser => self.remove_user(command, args)?,
            Command::SetRole => self.set_role(command, args)?,
            Command::Unknown(name) => HandlerReply::message(format!(
                "Unknown command: /{}. Use /help to list commands.",
                name
            )),
        };
        Ok(reply)
    }
}
