use atena_model::Backend;

use super::Client;
use crate::attachment::PreprocessorConfig;
use crate::dispatch::BackendClient;
use crate::locale::Locale;
use crate::storage::{MemoryStorage, Storage};

/// [`Client`] builder.
pub struct ClientBuilder {
    pub(crate) backend: BackendClient,
    pub(crate) storage: Box<dyn Storage>,
    pub(crate) locale: Locale,
    pub(crate) preprocessor_config: PreprocessorConfig,
}

impl ClientBuilder {
    /// Creates a new builder with the specified backend.
    ///
    /// Conversations are kept in memory unless a storage is set.
    #[inline]
    pub fn with_backend<B: Backend + 'static>(backend: B) -> Self {
        Self {
            backend: BackendClient::new(backend),
            storage: Box::new(MemoryStorage::new()),
            locale: Locale::default(),
            preprocessor_config: PreprocessorConfig::default(),
        }
    }

    /// Sets where the archive is persisted.
    #[inline]
    pub fn with_storage<S: Storage>(mut self, storage: S) -> Self {
        self.storage = Box::new(storage);
        self
    }

    /// Sets the language of placeholder and error messages.
    #[inline]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Sets the limits applied to attached images.
    #[inline]
    pub fn with_preprocessor_config(mut self, config: PreprocessorConfig) -> Self {
        self.preprocessor_config = config;
        self
    }

    /// Builds the client, reading the archive from storage.
    ///
    /// Must be called from within a tokio runtime.
    #[inline]
    pub fn build(self) -> Client {
        Client::spawn_from_builder(self)
    }
}
