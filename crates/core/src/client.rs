mod builder;
mod state;

use atena_actor::{Actor, ActorStoppedError};
use atena_model::{Conversation, ConversationId, ConversationSummary};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::attachment::{Blob, PreparedAttachment, Preprocessor};
use crate::capture::{CaptureSource, next_fragment};
use crate::dispatch::{DispatchStage, SendError};
use crate::event::Event;
use crate::store::StoreError;
pub use builder::ClientBuilder;
use state::{ClientState, PushFragment};

/// The error type for [`Client`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The turn could not be sent.
    #[error(transparent)]
    Send(#[from] SendError),
    /// The session operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The client task is gone.
    #[error("client task has stopped")]
    Stopped(#[from] ActorStoppedError),
}

/// A chat client session: composer, conversations and backend.
///
/// All state lives on a single task and every method is handled there in
/// call order. Only two things happen elsewhere: image preprocessing runs
/// in the caller before attachments are handed in, and each backend
/// request runs on a spawned task that reports back when it finishes.
/// At most one turn is in flight per client; sending while one is in
/// flight is rejected with [`SendError::Busy`].
///
/// Clones share the same session.
#[derive(Clone)]
pub struct Client {
    handle: Actor<ClientState>,
    events: broadcast::Sender<Event>,
    preprocessor: Preprocessor,
}

impl Client {
    /// Subscribes to change notifications.
    #[inline]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Replaces the text buffer.
    pub async fn set_input<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<(), ClientError> {
        let input = input.into();
        self.call(move |state| state.set_input(input)).await
    }

    /// Appends a finalized dictation fragment to the text buffer.
    pub async fn push_fragment<S: Into<String>>(
        &self,
        fragment: S,
    ) -> Result<(), ClientError> {
        let fragment = fragment.into();
        self.call(move |state| state.push_fragment(&fragment)).await
    }

    /// Preprocesses `blobs` and attaches the resulting images.
    ///
    /// Returns how many were accepted; anything that isn't an image is
    /// skipped.
    pub async fn attach<I>(&self, blobs: I) -> Result<usize, ClientError>
    where
        I: IntoIterator<Item = Blob>,
    {
        let prepared = self.preprocessor.prepare(blobs).await;
        let count = prepared.len();
        if count > 0 {
            self.call(move |state| state.add_attachments(prepared)).await?;
        }
        Ok(count)
    }

    /// Removes one pending attachment.
    pub async fn remove_attachment(
        &self,
        index: usize,
    ) -> Result<bool, ClientError> {
        self.call(move |state| state.remove_attachment(index)).await
    }

    /// Removes every pending attachment.
    pub async fn clear_attachments(&self) -> Result<(), ClientError> {
        self.call(ClientState::clear_attachments).await
    }

    /// Sends the composer's content to the backend.
    ///
    /// Returns the id of the conversation the turn was recorded in as soon
    /// as it is dispatched. Watch for [`Event::TurnResolved`] to learn how
    /// it ended.
    pub async fn send(&self) -> Result<ConversationId, ClientError> {
        let result = self
            .handle
            .call(|state, handle| state.send(handle))
            .await?;
        Ok(result?)
    }

    /// Saves the active conversation and starts a new one.
    pub async fn create_session(&self) -> Result<ConversationId, ClientError> {
        self.call(|state| state.store.create_session().clone()).await
    }

    /// Saves the active conversation and switches to an archived one.
    pub async fn load_session(
        &self,
        id: ConversationId,
    ) -> Result<(), ClientError> {
        let result = self.call(move |state| state.store.load_session(&id)).await?;
        Ok(result?)
    }

    /// Deletes a conversation. Returns `false` if it didn't exist.
    pub async fn delete_session(
        &self,
        id: ConversationId,
    ) -> Result<bool, ClientError> {
        self.call(move |state| state.store.delete_session(&id)).await
    }

    /// Deletes every conversation.
    pub async fn clear_archive(&self) -> Result<(), ClientError> {
        self.call(|state| state.store.clear_archive()).await
    }

    /// Returns a copy of the active conversation.
    pub async fn active(&self) -> Result<Conversation, ClientError> {
        self.call(|state| state.store.active().clone()).await
    }

    /// Returns a copy of a conversation, whether active or archived.
    pub async fn conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, ClientError> {
        self.call(move |state| state.store.conversation(&id).cloned())
            .await
    }

    /// Lists archived conversations, most recent first.
    pub async fn summaries(
        &self,
    ) -> Result<Vec<ConversationSummary>, ClientError> {
        self.call(|state| state.store.summaries()).await
    }

    /// Returns the dispatcher's current stage.
    pub async fn stage(&self) -> Result<DispatchStage, ClientError> {
        self.call(|state| state.stage).await
    }

    /// Returns the text buffer.
    pub async fn input(&self) -> Result<String, ClientError> {
        self.call(|state| state.composer.input().to_owned()).await
    }

    /// Returns the pending attachments.
    pub async fn attachments(
        &self,
    ) -> Result<Vec<PreparedAttachment>, ClientError> {
        self.call(|state| state.composer.attachments().to_vec()).await
    }

    /// Returns `true` if there is something to send and nothing in
    /// flight.
    pub async fn can_send(&self) -> Result<bool, ClientError> {
        self.call(|state| !state.stage.is_busy() && state.composer.can_send())
            .await
    }

    /// Feeds fragments from `source` into the text buffer until it ends.
    ///
    /// Abort the returned task to stop capturing early.
    pub fn capture<C: CaptureSource>(&self, source: C) -> JoinHandle<()> {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let mut source = Box::pin(source);
            while let Some(fragment) = next_fragment(&mut source).await {
                if handle.send(PushFragment(fragment)).is_err() {
                    break;
                }
            }
            trace!("capture source ended");
        })
    }

    async fn call<F, R>(&self, f: F) -> Result<R, ClientError>
    where
        F: FnOnce(&mut ClientState) -> R + Send + 'static,
        R: Send + 'static,
    {
        Ok(self.handle.call(move |state, _| f(state)).await?)
    }
}

impl Client {
    fn spawn_from_builder(builder: ClientBuilder) -> Self {
        let ClientBuilder {
            backend,
            storage,
            locale,
            preprocessor_config,
        } = builder;

        let state = ClientState::new(backend, storage, locale);
        let events = state.store.events().clone();
        Self {
            handle: Actor::spawn(state, Some("client")),
            events,
            preprocessor: Preprocessor::new(preprocessor_config),
        }
    }
}
