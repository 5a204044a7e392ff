use atena_model::{Message, TurnRequest};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatRequest<'a> {
    message: &'a str,
    conversation_history: &'a [Message],
}

impl<'a> From<&'a TurnRequest> for ChatRequest<'a> {
    #[inline]
    fn from(req: &'a TurnRequest) -> Self {
        Self {
            message: &req.message,
            conversation_history: &req.history,
        }
    }
}

/// Builds the multipart body of a turn carrying images.
///
/// The history travels as a JSON string field, and every image becomes
/// its own `images` part, in order.
pub fn create_form(req: &TurnRequest) -> Result<Form, FormError> {
    let history = serde_json::to_string(&req.history)?;
    let mut form = Form::new()
        .text("message", req.message.clone())
        .text("conversation_history", history);
    for attachment in &req.attachments {
        let part = Part::bytes(attachment.bytes.to_vec())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime)?;
        form = form.part("images", part);
    }
    Ok(form)
}

#[derive(Debug)]
pub enum FormError {
    History(serde_json::Error),
    Part(reqwest::Error),
}

impl From<serde_json::Error> for FormError {
    #[inline]
    fn from(err: serde_json::Error) -> Self {
        FormError::History(err)
    }
}

impl From<reqwest::Error> for FormError {
    #[inline]
    fn from(err: reqwest::Error) -> Self {
        FormError::Part(err)
    }
}
