use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The URL carried by an image marker in place of the real image.
pub const IMAGE_MARKER_URL: &str = "[imagen]";

const IMAGE_MARKER_DETAIL: &str = "high";

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing into the client.
    User,
    /// The backend, or the client speaking on its behalf when a turn fails.
    Assistant,
}

/// The body of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// An ordered sequence of text parts and image markers.
    Parts(Vec<ContentPart>),
}

/// One element of a multi-part [`Content`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A run of text.
    Text {
        /// The text itself.
        text: String,
    },
    /// An opaque stand-in for an image that was sent with the turn.
    ImageUrl {
        /// Where the image lives. Always [`IMAGE_MARKER_URL`] for markers
        /// produced by this client.
        image_url: ImageUrl,
    },
}

impl ContentPart {
    /// Creates a text part.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Creates an opaque image marker.
    #[inline]
    pub fn image_marker() -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: IMAGE_MARKER_URL.to_owned(),
                detail: IMAGE_MARKER_DETAIL.to_owned(),
            },
        }
    }

    /// Returns `true` if this part is an image marker.
    #[inline]
    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::ImageUrl { .. })
    }
}

/// Image reference inside a [`ContentPart::ImageUrl`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageUrl {
    /// The image location, or a marker.
    pub url: String,
    /// Requested level of detail.
    pub detail: String,
}

/// A single chat message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote it.
    pub role: Role,
    /// What was written.
    pub content: Content,
    /// Local previews of the images attached to this message. Only
    /// display messages carry these.
    #[serde(
        rename = "imagePreviews",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_previews: Option<Vec<String>>,
    /// When the message was composed or completed.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a plain-text user message.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
            image_previews: None,
            timestamp: None,
        }
    }

    /// Creates a plain-text assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
            image_previews: None,
            timestamp: None,
        }
    }

    /// Stamps the message with the given time.
    #[inline]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns the text of this message as consumed by collaborators that
    /// only understand plain text (titles, clipboard, rendering).
    ///
    /// Multi-part content yields its first text part, or an empty string
    /// when it only has images.
    pub fn plain_text(&self) -> &str {
        match &self.content {
            Content::Text(text) => text,
            Content::Parts(parts) => parts
                .iter()
                .find_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .unwrap_or(""),
        }
    }

    /// Returns the number of image markers in this message.
    pub fn image_count(&self) -> usize {
        match &self.content {
            Content::Text(_) => 0,
            Content::Parts(parts) => {
                parts.iter().filter(|part| part.is_image()).count()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(Message::user("hello").plain_text(), "hello");

        let msg = Message {
            role: Role::User,
            content: Content::Parts(vec![
                ContentPart::image_marker(),
                ContentPart::text("look"),
            ]),
            image_previews: None,
            timestamp: None,
        };
        assert_eq!(msg.plain_text(), "look");
        assert_eq!(msg.image_count(), 1);

        let msg = Message {
            content: Content::Parts(vec![ContentPart::image_marker()]),
            ..msg
        };
        assert_eq!(msg.plain_text(), "");
    }

    #[test]
    fn test_wire_shape() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let msg = Message {
            role: Role::User,
            content: Content::Parts(vec![
                ContentPart::text("what is this?"),
                ContentPart::image_marker(),
            ]),
            image_previews: None,
            timestamp: Some(ts),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": "what is this?" },
                    {
                        "type": "image_url",
                        "image_url": { "url": "[imagen]", "detail": "high" }
                    }
                ],
                "timestamp": 1_700_000_000_123_i64
            })
        );
    }

    #[test]
    fn test_read_legacy_message() {
        let msg: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": "hi",
            "imagePreviews": ["data:image/png;base64,AAAA"]
        }))
        .unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.plain_text(), "hi");
        assert_eq!(msg.image_previews.unwrap().len(), 1);
        assert!(msg.timestamp.is_none());
    }
}
