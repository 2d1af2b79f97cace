//! Operator text commands.
//!
//! Each command maps onto one registry or moderation-client operation and
//! renders a plain-text reply. Errors are rendered too, so a command never
//! fails the caller.

use bulwark_error::{CommandError, CommandErrorKind, CommandResult, ProtectionError};
use bulwark_interface::ModerationClient;
use bulwark_protection::{ProtectionRegistry, ProtectionSummary, SettingUpdate, SettingValue};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Reply sent when account administration is not available.
pub const NOT_ADMINISTRATOR: &str = "I am not a server administrator, or the endpoint is blocked";

const USAGE_ENABLE: &str = "enable <protection>";
const USAGE_DISABLE: &str = "disable <protection>";
const USAGE_SET: &str = "set <protection>.<setting> <value>";
const USAGE_ADD: &str = "add <protection>.<setting> <value>";
const USAGE_REMOVE: &str = "remove <protection>.<setting> <value>";
const USAGE_LOCK: &str = "lock <user>";
const USAGE_SUSPEND: &str = "suspend <user>";

/// How a list or scalar setting should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConfigVerb {
    /// Replace the value
    Set,
    /// Add a list item
    Add,
    /// Remove a list item
    Remove,
}

/// A parsed operator command.
///
/// # Example
///
/// ```
/// use bulwark::{Command, ConfigVerb};
///
/// let command: Command = "set TrustedReporters.threshold 5".parse().unwrap();
/// assert_eq!(
///     command,
///     Command::Configure {
///         verb: ConfigVerb::Set,
///         protection: "TrustedReporters".to_string(),
///         setting: "threshold".to_string(),
///         value: "5".to_string(),
///     }
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List protections with their state
    Protections,
    /// Enable a protection
    Enable(String),
    /// Disable a protection
    Disable(String),
    /// Change a setting
    Configure {
        /// Kind of change
        verb: ConfigVerb,
        /// Protection name
        protection: String,
        /// Setting name
        setting: String,
        /// Raw value text
        value: String,
    },
    /// Show settings of one protection, or all
    Get(Option<String>),
    /// Lock a user account
    Lock(String),
    /// Suspend a user account
    Suspend(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(text: &str) -> CommandResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::new(CommandErrorKind::Empty));
        }
        let (word, rest) = match text.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (text, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "protections" => Ok(Self::Protections),
            "enable" => single(rest, USAGE_ENABLE).map(Self::Enable),
            "disable" => single(rest, USAGE_DISABLE).map(Self::Disable),
            "set" => configure(ConfigVerb::Set, rest, USAGE_SET),
            "add" => configure(ConfigVerb::Add, rest, USAGE_ADD),
            "remove" => configure(ConfigVerb::Remove, rest, USAGE_REMOVE),
            "get" => Ok(Self::Get((!rest.is_empty()).then(|| rest.to_string()))),
            "lock" => single(rest, USAGE_LOCK).map(Self::Lock),
            "suspend" => single(rest, USAGE_SUSPEND).map(Self::Suspend),
            other => Err(CommandError::new(CommandErrorKind::UnknownCommand(
                other.to_string(),
            ))),
        }
    }
}

fn single(rest: &str, usage: &'static str) -> CommandResult<String> {
    let mut words = rest.split_whitespace();
    match (words.next(), words.next()) {
        (Some(word), None) => Ok(word.to_string()),
        _ => Err(CommandError::new(CommandErrorKind::Usage(usage))),
    }
}

fn configure(verb: ConfigVerb, rest: &str, usage: &'static str) -> CommandResult<Command> {
    let (target, value) = match rest.split_once(char::is_whitespace) {
        Some((target, value)) => (target, value.trim()),
        None => (rest, ""),
    };
    let Some((protection, setting)) = target.split_once('.') else {
        return Err(CommandError::new(CommandErrorKind::Usage(usage)));
    };
    if protection.is_empty() || setting.is_empty() {
        return Err(CommandError::new(CommandErrorKind::Usage(usage)));
    }
    // Clearing a list with `set` is allowed; adding nothing is not.
    if value.is_empty() && verb != ConfigVerb::Set {
        return Err(CommandError::new(CommandErrorKind::Usage(usage)));
    }
    Ok(Command::Configure {
        verb,
        protection: protection.to_string(),
        setting: setting.to_string(),
        value: value.to_string(),
    })
}

/// Render the protection catalog, one line per protection.
pub fn render_protections(summaries: &[ProtectionSummary]) -> String {
    let mut lines = vec!["Available protections:".to_string()];
    for summary in summaries {
        let state = if *summary.enabled() {
            "🟢 (enabled)"
        } else {
            "🔴 (disabled)"
        };
        lines.push(format!(
            "* {} {} - {}",
            state,
            summary.name(),
            summary.description()
        ));
    }
    lines.join("\n")
}

/// Render settings as `* <protection>.<setting>: <value>` lines.
pub fn render_settings(all: &[(String, BTreeMap<String, SettingValue>)]) -> String {
    let lines: Vec<String> = all
        .iter()
        .flat_map(|(protection, values)| {
            values
                .iter()
                .map(move |(setting, value)| format!("* {}.{}: {}", protection, setting, value))
        })
        .collect();
    if lines.is_empty() {
        return "No settings found".to_string();
    }
    format!("Protection settings\n{}", lines.join("\n"))
}

fn render_error(error: &ProtectionError) -> String {
    error.kind().to_string()
}

/// Runs operator commands against a registry.
pub struct CommandExecutor {
    registry: Arc<ProtectionRegistry>,
    client: Arc<dyn ModerationClient>,
}

impl CommandExecutor {
    /// Executor over `registry`, using `client` for account administration.
    pub fn new(registry: Arc<ProtectionRegistry>, client: Arc<dyn ModerationClient>) -> Self {
        Self { registry, client }
    }

    /// Parse and run one command line, returning the reply text.
    #[instrument(skip(self))]
    pub async fn handle(&self, text: &str) -> String {
        match text.parse::<Command>() {
            Ok(command) => self.execute(&command).await,
            Err(e) => {
                warn!(error = %e.kind, "Rejected command");
                e.kind.to_string()
            }
        }
    }

    /// Run a parsed command, returning the reply text.
    pub async fn execute(&self, command: &Command) -> String {
        match command {
            Command::Protections => render_protections(&self.registry.list_available()),
            Command::Enable(name) => match self.registry.enable(name).await {
                Ok(true) => format!("Enabled protection {}", name),
                Ok(false) => format!("Protection {} is already enabled", name),
                Err(e) => render_error(&e),
            },
            Command::Disable(name) => match self.registry.disable(name).await {
                Ok(true) => format!("Disabled protection {}", name),
                Ok(false) => format!("Protection {} is already disabled", name),
                Err(e) => render_error(&e),
            },
            Command::Configure {
                verb,
                protection,
                setting,
                value,
            } => {
                let update = match verb {
                    ConfigVerb::Set => SettingUpdate::Parse(value.clone()),
                    ConfigVerb::Add => SettingUpdate::Add(value.clone()),
                    ConfigVerb::Remove => SettingUpdate::Remove(value.clone()),
                };
                match self
                    .registry
                    .apply_setting_change(protection, setting, update)
                    .await
                {
                    Ok(change) => change.to_string(),
                    Err(e) => render_error(&e),
                }
            }
            Command::Get(None) => render_settings(&self.registry.all_settings().await),
            Command::Get(Some(name)) => match self.registry.get_settings(name).await {
                Ok(values) => render_settings(&[(name.clone(), values)]),
                Err(e) => render_error(&e),
            },
            Command::Lock(user) => self.administer(user, AccountAction::Lock).await,
            Command::Suspend(user) => self.administer(user, AccountAction::Suspend).await,
        }
    }

    #[instrument(skip(self))]
    async fn administer(&self, user: &str, action: AccountAction) -> String {
        match self.client.is_administrator().await {
            Ok(true) => {}
            Ok(false) => return NOT_ADMINISTRATOR.to_string(),
            Err(e) => {
                warn!(error = %e, "Administrator check failed");
                return NOT_ADMINISTRATOR.to_string();
            }
        }
        let result = match action {
            AccountAction::Lock => self.client.lock_account(user).await,
            AccountAction::Suspend => self.client.suspend_account(user).await,
        };
        match result {
            Ok(()) => {
                info!("Account action performed");
                format!("{} {}", action.past_tense(), user)
            }
            Err(e) => {
                warn!(error = %e, "Account action failed");
                format!("Failed to {} {}: {}", action, user, e.kind)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, strum::Display)]
#[strum(serialize_all = "lowercase")]
enum AccountAction {
    Lock,
    Suspend,
}

impl AccountAction {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Lock => "Locked",
            Self::Suspend => "Suspended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> CommandResult<Command> {
        text.parse()
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("protections").unwrap(), Command::Protections);
        assert_eq!(
            parse("  ENABLE TrustedReporters ").unwrap(),
            Command::Enable("TrustedReporters".to_string())
        );
        assert_eq!(parse("get").unwrap(), Command::Get(None));
        assert_eq!(
            parse("suspend @u:x.org").unwrap(),
            Command::Suspend("@u:x.org".to_string())
        );
    }

    #[test]
    fn test_parse_configure_keeps_spaces_in_value() {
        assert_eq!(
            parse("set BasicFlooding.reason posting too fast").unwrap(),
            Command::Configure {
                verb: ConfigVerb::Set,
                protection: "BasicFlooding".to_string(),
                setting: "reason".to_string(),
                value: "posting too fast".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   ").unwrap_err().kind, CommandErrorKind::Empty);
        assert_eq!(
            parse("kick @u:x").unwrap_err().kind,
            CommandErrorKind::UnknownCommand("kick".to_string())
        );
        assert_eq!(
            parse("enable").unwrap_err().kind,
            CommandErrorKind::Usage(USAGE_ENABLE)
        );
        assert_eq!(
            parse("set threshold 5").unwrap_err().kind,
            CommandErrorKind::Usage(USAGE_SET)
        );
        assert_eq!(
            parse("add TrustedReporters.mxids").unwrap_err().kind,
            CommandErrorKind::Usage(USAGE_ADD)
        );
    }

    #[test]
    fn test_render_settings_empty() {
        assert_eq!(render_settings(&[]), "No settings found");
        assert_eq!(
            render_settings(&[("Quiet".to_string(), BTreeMap::new())]),
            "No settings found"
        );
    }
}
