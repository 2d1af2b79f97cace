//! Wiring of the shipped protections into a running engine.

use crate::{BulwarkConfig, CommandExecutor};
use bulwark_error::BulwarkResult;
use bulwark_interface::{ModerationClient, ReportEvent, RoomEvent};
use bulwark_protection::{Delivery, ProtectionContext, ProtectionRegistry};
use bulwark_reports::{BasicFlooding, TrustedReporters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// One line of engine input.
///
/// ```
/// use bulwark::Input;
///
/// let input: Input = serde_json::from_str(r#"{"type":"command","text":"protections"}"#).unwrap();
/// assert!(matches!(input, Input::Command { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Input {
    /// An abuse report
    Report(ReportEvent),
    /// A room message
    Event(RoomEvent),
    /// An operator command line
    Command {
        /// Command text
        text: String,
    },
}

/// Registry, context and command layer for one management room.
pub struct Bulwark {
    registry: Arc<ProtectionRegistry>,
    context: ProtectionContext,
    commands: CommandExecutor,
}

impl Bulwark {
    /// Register the shipped protections, restore persisted state and return
    /// a ready engine.
    ///
    /// # Errors
    ///
    /// Fails if the settings store cannot be read or the default enabled
    /// set cannot be saved.
    #[instrument(skip(config, client), fields(management_room = %config.management_room()))]
    pub async fn start(
        config: &BulwarkConfig,
        client: Arc<dyn ModerationClient>,
    ) -> BulwarkResult<Self> {
        let capacity = *config.report_capacity();
        let mut registry = ProtectionRegistry::new(config.settings_store());
        registry.register(Arc::new(TrustedReporters::new(capacity)))?;
        registry.register(Arc::new(BasicFlooding::new(capacity)))?;
        registry.restore(config.enabled_protections()).await?;

        let registry = Arc::new(registry);
        let context = ProtectionContext::new(Arc::clone(&client), config.management_room().clone());
        let commands = CommandExecutor::new(Arc::clone(&registry), client);
        info!(protections = registry.len(), "Bulwark started");
        Ok(Self {
            registry,
            context,
            commands,
        })
    }

    /// The protection registry.
    pub fn registry(&self) -> &Arc<ProtectionRegistry> {
        &self.registry
    }

    /// Deliver a report to the enabled protections.
    pub async fn handle_report(&self, report: &ReportEvent) -> Delivery {
        self.registry.handle_report(&self.context, report).await
    }

    /// Deliver a room event to the enabled protections.
    pub async fn handle_event(&self, event: &RoomEvent) -> Delivery {
        self.registry.handle_event(&self.context, event).await
    }

    /// Run an operator command line and return the reply.
    pub async fn handle_command(&self, text: &str) -> String {
        self.commands.handle(text).await
    }

    /// Process one input; returns a reply for commands.
    pub async fn handle_input(&self, input: &Input) -> Option<String> {
        match input {
            Input::Report(report) => {
                self.handle_report(report).await;
                None
            }
            Input::Event(event) => {
                self.handle_event(event).await;
                None
            }
            Input::Command { text } => Some(self.handle_command(text).await),
        }
    }
}
