//! Command surface - 명령 이름 → 필요한 권한

use crate::transport::InboundMessage;
use warden_foundation::Capability;

/// Operations reachable through the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Terminal mode on
    Run,
    /// Terminal mode off
    Exit,
    Info,
    Ps,
    Net,
    Disk,
    Alerts,
    Alert,
    Threshold,
    Users,
    AddUser,
    DelUser,
    SetRole,
    /// Free text executed as a shell command line
    Shell,
    Unknown(String),
}

impl Command {
    /// Resolve the operation and its arguments from an inbound message
    pub fn parse(message: &InboundMessage) -> (Self, Vec<String>) {
        match message.command() {
            Some((name, args)) => (Self::from_name(&name), args),
            None => (Self::Shell, Vec::new()),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "start" => Self::Start,
            "help" => Self::Help,
            "run" => Self::Run,
            "exit" => Self::Exit,
            "info" => Self::Info,
            "ps" => Self::Ps,
            "net" => Self::Net,
            "disk" => Self::Disk,
            "alerts" => Self::Alerts,
            "alert" => Self::Alert,
            "threshold" => Self::Threshold,
            "users" => Self::Users,
            "adduser" => Self::AddUser,
            "deluser" => Self::DelUser,
            "setrole" => Self::SetRole,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Run => "run",
            Self::Exit => "exit",
            Self::Info => "info",
            Self::Ps => "ps",
            Self::Net => "net",
            Self::Disk => "disk",
            Self::Alerts => "alerts",
            Self::Alert => "alert",
            Self::Threshold => "threshold",
            Self::Users => "users",
            Self::AddUser => "adduser",
            Self::DelUser => "deluser",
            Self::SetRole => "setrole",
            Self::Shell => "shell",
            Self::Unknown(name) => name,
        }
    }

    /// Capability needed to invoke, None for help and unknown names
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::Start | Self::Help | Self::Unknown(_) => None,
            Self::Run | Self::Exit | Self::Shell => Some(Capability::ExecuteCommands),
            Self::Info | Self::Ps | Self::Net | Self::Disk => Some(Capability::ViewInfo),
            Self::Alerts | Self::Alert | Self::Threshold => Some(Capability::ManageAlerts),
            Self::Users | Self::AddUser | Self::DelUser | Self::SetRole => {
                Some(Capability::ManageUsers)
            }
        }
    }

    /// Mutating or host-affecting, reported to the owner when a non-owner invokes it
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Self::Shell
                | Self::Alert
                | Self::Threshold
                | Self::AddUser
                | Self::DelUser
                | Self::SetRole
        )
    }
}

/// Help entries: (command, usage, description)
pub const HELP_ENTRIES: &[(&str, &str, &str)] = &[
    ("run", "/run", "Enable terminal mode"),
    ("exit", "/exit", "Disable terminal mode"),
    ("info", "/info", "System information"),
    ("ps", "/ps", "Top processes"),
    ("net", "/net", "Network status"),
    ("disk", "/disk", "Disk usage"),
    ("alerts", "/alerts", "Alert status"),
    ("alert", "/alert <category> on|off", "Toggle an alert category"),
    ("threshold", "/threshold <category> <0-100>", "Set a resource threshold"),
    ("users", "/users", "List users"),
    ("adduser", "/adduser <id> <name> <admin|monitor>", "Register a user"),
    ("deluser", "/deluser <id>", "Remove a user"),
    ("setrole", "/setrole <id> <admin|monitor>", "Change a user's role"),
];

/// Usage line for a command
pub fn usage(command: &Command) -> String {
    HELP_ENTRIES
        .iter()
        .find(|(name, _, _)| *name == command.name())
        .map(|(_, usage, _)| format!("Usage: {}", usage))
        .unwrap_or_else(|| format!("Usage: /{}", command.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let msg = InboundMessage::private("1", "a", "/adduser 42 bob admin");
        let (command, args) = Command::parse(&msg);
        assert_eq!(command, Command::AddUser);
        assert_eq!(args.len(), 3);

        let msg = InboundMessage::private("1", "a", "df -h");
        assert_eq!(Command::parse(&msg).0, Command::Shell);

        let msg = InboundMessage::private("1", "a", "/reboot");
        assert_eq!(Command::parse(&msg).0, Command::Unknown("reboot".into()));
    }

    #[test]
    fn test_capability_mapping() {
        assert_eq!(Command::Help.required_capability(), None);
        assert_eq!(
            Command::Shell.required_capability(),
            Some(Capability::ExecuteCommands)
        );
        assert_eq!(Command::Disk.required_capability(), Some(Capability::ViewInfo));
        assert_eq!(
            Command::Threshold.required_capability(),
            Some(Capability::ManageAlerts)
        );
        assert_eq!(
            Command::SetRole.required_capability(),
            Some(Capability::ManageUsers)
        );
    }

    #[test]
    fn test_usage() {
        assert_eq!(usage(&Command::DelUser), "Usage: /deluser <id>");
        assert!(!Command::Info.is_sensitive());
        assert!(Command::Shell.is_sensitive());
    }
}
