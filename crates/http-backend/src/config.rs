const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Builder for [`HttpBackendConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HttpBackendConfigBuilder {
    base_url: Option<String>,
    chat_path: Option<String>,
    image_chat_path: Option<String>,
}

impl HttpBackendConfigBuilder {
    /// Creates a builder with every setting left at its default.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server address, `http://localhost:8000` by default.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the path of the text-only endpoint, `/chat` by default.
    #[inline]
    pub fn with_chat_path<S: Into<String>>(mut self, path: S) -> Self {
        self.chat_path = Some(path.into());
        self
    }

    /// Sets the path of the endpoint taking images, `/chat-with-image` by
    /// default.
    #[inline]
    pub fn with_image_chat_path<S: Into<String>>(mut self, path: S) -> Self {
        self.image_chat_path = Some(path.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> HttpBackendConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        HttpBackendConfig {
            base_url: base_url.trim_end_matches('/').to_owned(),
            chat_path: self.chat_path.unwrap_or_else(|| "/chat".to_owned()),
            image_chat_path: self
                .image_chat_path
                .unwrap_or_else(|| "/chat-with-image".to_owned()),
        }
    }
}

/// Configuration for [`crate::HttpBackend`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpBackendConfig {
    pub(crate) base_url: String,
    pub(crate) chat_path: String,
    pub(crate) image_chat_path: String,
}

impl HttpBackendConfig {
    /// Returns the server address, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for HttpBackendConfig {
    #[inline]
    fn default() -> Self {
        HttpBackendConfigBuilder::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpBackendConfig::default();
        assert_eq!(config.url(&config.chat_path), "http://localhost:8000/chat");
        assert_eq!(
            config.url(&config.image_chat_path),
            "http://localhost:8000/chat-with-image"
        );
    }

    #[test]
    fn test_trailing_slash() {
        let config = HttpBackendConfigBuilder::new()
            .with_base_url("https://atena.example/api/")
            .with_chat_path("/v2/chat")
            .build();
        assert_eq!(config.base_url(), "https://atena.example/api");
        assert_eq!(
            config.url(&config.chat_path),
            "https://atena.example/api/v2/chat"
        );
    }
}
