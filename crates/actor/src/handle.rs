use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::mailbox::{Call, Mailbox, MailboxParts};
use crate::scheduler::run_actor;
use crate::{ActorStoppedError, Message};

/// Handle to an actor.
///
/// The actor keeps running while at least one handle is alive. Handles
/// are cheap to clone and can be moved into spawned tasks, which is how
/// background work reports its result back to the state.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor owning `state`, with an optional label used in
    /// its tracing span.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(state: S, label: Option<&str>) -> Self {
        let MailboxParts {
            mailbox,
            msg_rx,
            stop_rx,
        } = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            run_actor(Arc::downgrade(&mailbox), state, msg_rx, stop_rx)
                .instrument(trace_span!("actor", label = label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor without waiting for it to be handled.
    #[inline]
    pub fn send<M: Message<S> + 'static>(
        &self,
        msg: M,
    ) -> Result<(), ActorStoppedError> {
        self.mailbox.send(Box::new(msg))
    }

    /// Runs `f` against the state on the actor's task and returns what it
    /// produced.
    ///
    /// Calls are handled in order with every other message, so a call
    /// observes the effects of all messages sent before it.
    pub async fn call<F, R>(&self, f: F) -> Result<R, ActorStoppedError>
    where
        F: FnOnce(&mut S, &Actor<S>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Call { f, reply_tx })?;
        reply_rx.await.map_err(|_| ActorStoppedError)
    }

    /// Asks the actor to stop.
    ///
    /// Messages already queued may or may not be handled; nothing sent
    /// afterwards will be.
    #[inline]
    pub fn stop(&self) {
        self.mailbox.stop();
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
