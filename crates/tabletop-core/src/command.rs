//! Command abstractions.

use uuid::Uuid;

/// Trait implemented by every coordinator command.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command from the edge through broadcast.
    fn correlation_id(&self) -> Uuid;
}
