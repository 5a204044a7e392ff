//! Notifications for observers of the client.

use atena_model::ConversationId;

use crate::dispatch::DispatchStage;

/// Something observers may want to redraw for.
///
/// Events carry no state; observers read what they need through the
/// accessors after being notified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The text buffer or the pending attachments changed.
    ComposerChanged,
    /// Another conversation became active, or the active one was reset.
    ActiveChanged(ConversationId),
    /// Messages were added to a conversation.
    ConversationUpdated(ConversationId),
    /// Conversations were added to, removed from or refreshed in the
    /// archive.
    ArchiveChanged,
    /// A dispatched turn finished and its outcome has been recorded.
    TurnResolved {
        /// The conversation the turn was sent from.
        conversation_id: ConversationId,
        /// Whether the backend answered.
        succeeded: bool,
    },
    /// The dispatcher moved to another stage.
    StageChanged(DispatchStage),
}
