//! Errors raised while parsing operator commands.

/// Why a command line could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CommandErrorKind {
    /// Nothing but whitespace was sent
    #[display("Empty command")]
    Empty,

    /// The first word is not a known command
    #[display("Unknown command: {}", _0)]
    UnknownCommand(String),

    /// Arguments missing or malformed
    #[display("Usage: {}", _0)]
    Usage(&'static str),
}

/// Command parse error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Command Error: {} at line {} in {}", kind, line, file)]
pub struct CommandError {
    /// The specific error kind
    pub kind: CommandErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl CommandError {
    /// Create a new command error with location tracking.
    #[track_caller]
    pub fn new(kind: CommandErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CommandErrorKind {
        &self.kind
    }
}

/// Result type for command parsing.
pub type CommandResult<T> = Result<T, CommandError>;
