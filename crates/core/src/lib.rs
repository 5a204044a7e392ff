//! Core logic of the chat client: attachment preprocessing, message
//! composition, session persistence and backend dispatch.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod attachment;
mod capture;
mod client;
mod composer;
mod dispatch;
mod event;
mod locale;
mod storage;
mod store;

pub use attachment::{
    Blob, DecodeError, PreparedAttachment, Preprocessor, PreprocessorConfig,
    shrink_image,
};
pub use capture::{CaptureSource, ChannelCapture};
pub use client::{Client, ClientBuilder, ClientError};
pub use composer::{ComposedTurn, Composer, can_send};
pub use dispatch::{BackendClient, DispatchStage, InvalidTransition, SendError};
pub use event::Event;
pub use locale::{Locale, UnknownLocale};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{ARCHIVE_KEY, CORRUPT_ARCHIVE_KEY, SessionStore, StoreError};
