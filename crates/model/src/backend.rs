use std::error::Error;

use bytes::Bytes;

use crate::Message;
use crate::error::ErrorKind;

/// The error type for a backend.
pub trait BackendError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A binary image ready to be uploaded with a turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attachment {
    /// File name reported to the backend.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime: String,
    /// Encoded image data.
    pub bytes: Bytes,
}

/// One user turn to be delivered to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TurnRequest {
    /// The text the user typed, trimmed. May be empty when only images
    /// are sent.
    pub message: String,
    /// The sanitized history of the conversation before this turn.
    pub history: Vec<Message>,
    /// Images to upload with this turn, in the order they were attached.
    pub attachments: Vec<Attachment>,
}

/// The backend's answer to a [`TurnRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TurnReply {
    /// The assistant's text.
    pub text: String,
}

/// Something that can answer user turns, usually a remote service.
///
/// Once created, a backend should behave like a stateless object: the
/// caller hands it the whole history every time and keeps no session on
/// the backend side.
pub trait Backend: Send + Sync {
    /// The error type that may be returned by the backend.
    type Error: BackendError;

    /// Delivers a turn and waits for the reply.
    ///
    /// The returned future must not borrow `self` or `req`; it may be
    /// moved to another task and outlive both.
    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<TurnReply, Self::Error>> + Send + 'static;
}
