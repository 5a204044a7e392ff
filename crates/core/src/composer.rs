//! The input box: text and attachments waiting to be sent.

use std::mem;

use atena_model::{Attachment, Content, ContentPart, Message, Role};
use chrono::{DateTime, Utc};

use crate::attachment::PreparedAttachment;
use crate::locale::Locale;

/// Returns `true` if a turn with this text and this many attachments is
/// worth sending.
#[inline]
pub fn can_send(text: &str, attachments: usize) -> bool {
    !text.trim().is_empty() || attachments > 0
}

/// A turn taken out of the composer, ready to be dispatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedTurn {
    /// What the user sees: text (or a placeholder) plus previews.
    pub display: Message,
    /// What the backend will remember: text plus one marker per image.
    pub history: Message,
    /// The trimmed text, as sent to the backend.
    pub text: String,
    /// The images to upload.
    pub attachments: Vec<Attachment>,
}

/// Holds the text buffer and the pending attachments.
#[derive(Clone, Debug, Default)]
pub struct Composer {
    input: String,
    attachments: Vec<PreparedAttachment>,
    locale: Locale,
}

impl Composer {
    /// Creates an empty composer.
    #[inline]
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            ..Default::default()
        }
    }

    /// Returns the text buffer.
    #[inline]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replaces the text buffer.
    #[inline]
    pub fn set_input<S: Into<String>>(&mut self, input: S) {
        self.input = input.into();
    }

    /// Appends a finalized dictation fragment to the text buffer.
    pub fn push_fragment(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return;
        }
        if !self.input.is_empty() {
            self.input.push(' ');
        }
        self.input.push_str(fragment);
    }

    /// Returns the pending attachments.
    #[inline]
    pub fn attachments(&self) -> &[PreparedAttachment] {
        &self.attachments
    }

    /// Adds prepared attachments after the existing ones.
    #[inline]
    pub fn add_attachments<I>(&mut self, attachments: I)
    where
        I: IntoIterator<Item = PreparedAttachment>,
    {
        self.attachments.extend(attachments);
    }

    /// Removes one pending attachment.
    pub fn remove_attachment(&mut self, index: usize) -> Option<PreparedAttachment> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    /// Removes every pending attachment.
    #[inline]
    pub fn clear_attachments(&mut self) {
        self.attachments.clear();
    }

    /// Returns `true` if [`Self::compose`] would produce a turn.
    #[inline]
    pub fn can_send(&self) -> bool {
        can_send(&self.input, self.attachments.len())
    }

    /// Returns `true` if there is nothing at all in the composer.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.input.is_empty() && self.attachments.is_empty()
    }

    /// Takes the current input out as a turn stamped with `now`, leaving
    /// the composer empty.
    ///
    /// Returns `None`, and leaves everything as it was, if there is
    /// nothing to send.
    pub fn compose(&mut self, now: DateTime<Utc>) -> Option<ComposedTurn> {
        if !self.can_send() {
            return None;
        }
        let text = mem::take(&mut self.input).trim().to_owned();
        let (attachments, previews): (Vec<_>, Vec<_>) =
            mem::take(&mut self.attachments)
                .into_iter()
                .map(PreparedAttachment::into_parts)
                .unzip();

        let display_text = if text.is_empty() {
            self.locale.images_sent().to_owned()
        } else {
            text.clone()
        };
        let display = Message {
            role: Role::User,
            content: Content::Text(display_text),
            image_previews: (!previews.is_empty()).then_some(previews),
            timestamp: Some(now),
        };

        let history_content = if attachments.is_empty() {
            Content::Text(text.clone())
        } else {
            let text_part =
                (!text.is_empty()).then(|| ContentPart::text(text.clone()));
            Content::Parts(
                text_part
                    .into_iter()
                    .chain(attachments.iter().map(|_| ContentPart::image_marker()))
                    .collect(),
            )
        };
        let history = Message {
            role: Role::User,
            content: history_content,
            image_previews: None,
            timestamp: None,
        };

        Some(ComposedTurn {
            display,
            history,
            text,
            attachments,
        })
    }
}
