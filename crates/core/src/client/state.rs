use std::collections::HashMap;
use std::fmt::{self, Debug};

use atena_actor::{Actor, Message as ActorMessage};
use atena_model::{BackendError, ConversationId, Message, TurnReply, TurnRequest};
use chrono::Utc;
use tokio::task::JoinHandle;

use crate::attachment::PreparedAttachment;
use crate::composer::{ComposedTurn, Composer};
use crate::dispatch::{BackendClient, DispatchStage, SendError};
use crate::event::Event;
use crate::locale::Locale;
use crate::storage::Storage;
use crate::store::SessionStore;

/// Everything a [`super::Client`] owns, living on the actor's task.
pub struct ClientState {
    pub(super) store: SessionStore,
    pub(super) composer: Composer,
    pub(super) stage: DispatchStage,
    backend: BackendClient,
    locale: Locale,
    running_tasks: HashMap<u64, JoinHandle<()>>,
    next_task_id: u64,
}

impl ClientState {
    pub(super) fn new(
        backend: BackendClient,
        storage: Box<dyn Storage>,
        locale: Locale,
    ) -> Self {
        Self {
            store: SessionStore::open(storage),
            composer: Composer::new(locale),
            stage: Default::default(),
            backend,
            locale,
            running_tasks: Default::default(),
            next_task_id: 1,
        }
    }

    pub(super) fn set_input(&mut self, input: String) {
        self.composer.set_input(input);
        self.composer_changed();
    }

    pub(super) fn push_fragment(&mut self, fragment: &str) {
        self.composer.push_fragment(fragment);
        self.composer_changed();
    }

    pub(super) fn add_attachments(&mut self, prepared: Vec<PreparedAttachment>) {
        self.composer.add_attachments(prepared);
        self.composer_changed();
    }

    pub(super) fn remove_attachment(&mut self, index: usize) -> bool {
        let removed = self.composer.remove_attachment(index).is_some();
        if removed {
            self.composer_changed();
        }
        removed
    }

    pub(super) fn clear_attachments(&mut self) {
        self.composer.clear_attachments();
        self.composer_changed();
    }

    /// Composes a turn and hands it to the backend.
    pub(super) fn send(
        &mut self,
        handle: &Actor<Self>,
    ) -> Result<ConversationId, SendError> {
        // A busy client refuses before touching the composer, so the
        // user's draft survives.
        let next_stage = self.stage.begin()?;
        let Some(turn) = self.composer.compose(Utc::now()) else {
            return Err(SendError::Empty);
        };
        self.store.notify(Event::ComposerChanged);

        let ComposedTurn {
            display,
            history: user,
            text,
            attachments,
        } = turn;
        let conversation_id = self.store.begin_turn(display);
        let history = self
            .store
            .history(&conversation_id)
            .map(<[Message]>::to_vec)
            .unwrap_or_default();
        self.set_stage(next_stage);

        debug!(
            "dispatching turn in {conversation_id} with {} attachments",
            attachments.len()
        );
        let request = TurnRequest {
            message: text,
            history,
            attachments,
        };
        let backend = self.backend.clone();
        let handle_clone = handle.clone();
        let id = conversation_id.clone();
        self.spawn_task(
            |_| async move {
                let result = backend.send_turn_isolated(request).await;
                handle_clone
                    .send(TurnFinishedMessage {
                        conversation_id: id,
                        user,
                        result,
                    })
                    .ok();
            },
            handle,
        );
        Ok(conversation_id)
    }

    fn composer_changed(&mut self) {
        self.store.notify(Event::ComposerChanged);
        let stage = self.stage.on_composer_changed(!self.composer.is_blank());
        self.set_stage(stage);
    }

    fn set_stage(&mut self, stage: DispatchStage) {
        if self.stage == stage {
            return;
        }
        trace!("stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        self.store.notify(Event::StageChanged(stage));
    }

    fn spawn_task<F, Fut>(&mut self, f: F, handle: &Actor<Self>)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let handle = handle.clone();
        let fut = f(task_id);
        let task = tokio::spawn(async move {
            fut.await;
            handle.send(TaskEndedMessage(task_id)).ok();
        });
        self.running_tasks.insert(task_id, task);
    }
}

#[derive(Debug)]
pub(super) struct PushFragment(pub String);

impl ActorMessage<ClientState> for PushFragment {
    #[inline]
    fn handle(self, state: &mut ClientState, _handle: &Actor<ClientState>) {
        state.push_fragment(&self.0);
    }
}

struct TurnFinishedMessage {
    conversation_id: ConversationId,
    user: Message,
    result: Result<TurnReply, Box<dyn BackendError>>,
}

impl Debug for TurnFinishedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnFinishedMessage")
            .field("conversation_id", &self.conversation_id)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl ActorMessage<ClientState> for TurnFinishedMessage {
    fn handle(self, state: &mut ClientState, _handle: &Actor<ClientState>) {
        let Self {
            conversation_id,
            user,
            result,
        } = self;

        let (reply, succeeded) = match result {
            Ok(reply) => (Message::assistant(reply.text), true),
            Err(err) => {
                warn!("turn in {conversation_id} failed ({}): {err}", err.kind());
                (Message::assistant(state.locale.delivery_error()), false)
            }
        };
        let reply = reply.at(Utc::now());
        state
            .store
            .append_turn(&conversation_id, user, reply, succeeded);

        match state.stage.resolve(succeeded) {
            Ok(stage) => state.set_stage(stage),
            Err(err) => error!("{err}"),
        }
        state.store.notify(Event::TurnResolved {
            conversation_id,
            succeeded,
        });
    }
}

#[derive(Debug)]
struct TaskEndedMessage(u64);

impl ActorMessage<ClientState> for TaskEndedMessage {
    #[inline]
    fn handle(self, state: &mut ClientState, _handle: &Actor<ClientState>) {
        if state.running_tasks.remove(&self.0).is_none() {
            error!("task {} ended but was never tracked", self.0);
        }
    }
}
