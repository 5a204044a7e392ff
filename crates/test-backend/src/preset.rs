use atena_model::ErrorKind;

/// How the backend answers one turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PresetReply {
    /// Reply with this text.
    Text(String),
    /// Fail with this kind of error.
    Failure(ErrorKind),
    /// Panic while answering.
    Panic,
}

impl PresetReply {
    /// Creates a successful reply.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        PresetReply::Text(text.into())
    }

    /// Creates a failed reply.
    #[inline]
    pub fn failure(kind: ErrorKind) -> Self {
        PresetReply::Failure(kind)
    }
}
