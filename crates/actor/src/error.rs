use std::error::Error;
use std::fmt;

/// Returned when a message is sent to an actor that has stopped, or when
/// an actor stops before answering a call.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ActorStoppedError;

impl fmt::Debug for ActorStoppedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActorStoppedError")
    }
}

impl fmt::Display for ActorStoppedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the actor has stopped")
    }
}

impl Error for ActorStoppedError {}
