//! Guarding and running backend dispatches.

use std::pin::Pin;
use std::sync::Arc;

use atena_model::{Backend, BackendError, ErrorKind, TurnReply, TurnRequest};
use tokio::task::JoinError;
use tracing::Instrument;

/// Where the client is in the life of a turn.
///
/// ```text
///  Idle <-> Composing --send--> Dispatching --ok--> Resolved
///                                     |
///                                     +--err--> Failed
/// ```
///
/// `Resolved` and `Failed` behave like `Idle`/`Composing` for everything
/// but display: they remember how the last turn ended until the user
/// starts typing again. Only `Dispatching` rejects a new send.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DispatchStage {
    /// Nothing typed, nothing in flight.
    #[default]
    Idle,
    /// The user has something in the composer.
    Composing,
    /// A turn is waiting for the backend.
    Dispatching,
    /// The last turn got a reply.
    Resolved,
    /// The last turn could not be delivered.
    Failed,
}

/// Why a send was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// There is neither text nor an attachment to send.
    #[error("nothing to send")]
    Empty,
    /// Another turn is still in flight.
    #[error("a message is already being sent")]
    Busy,
}

/// A transition that the current stage does not allow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} while {stage:?}")]
pub struct InvalidTransition {
    stage: DispatchStage,
    action: &'static str,
}

impl DispatchStage {
    /// Returns `true` while a turn is in flight.
    #[inline]
    pub fn is_busy(self) -> bool {
        self == DispatchStage::Dispatching
    }

    /// The stage after the composer was edited.
    pub fn on_composer_changed(self, has_content: bool) -> Self {
        match (self, has_content) {
            (DispatchStage::Dispatching, _) => self,
            (_, true) => DispatchStage::Composing,
            (DispatchStage::Resolved | DispatchStage::Failed, false) => self,
            (_, false) => DispatchStage::Idle,
        }
    }

    /// The stage after a turn was handed to the backend.
    pub fn begin(self) -> Result<Self, SendError> {
        if self.is_busy() {
            return Err(SendError::Busy);
        }
        Ok(DispatchStage::Dispatching)
    }

    /// The stage after the in-flight turn finished.
    pub fn resolve(self, succeeded: bool) -> Result<Self, InvalidTransition> {
        if !self.is_busy() {
            return Err(InvalidTransition {
                stage: self,
                action: "resolve a turn",
            });
        }
        Ok(if succeeded {
            DispatchStage::Resolved
        } else {
            DispatchStage::Failed
        })
    }
}

/// The backend request panicked or was cancelled before it answered.
#[derive(Debug, thiserror::Error)]
#[error("backend request aborted: {0}")]
pub(crate) struct Aborted(#[from] JoinError);

impl BackendError for Aborted {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Network
    }
}

type SendTurnResult = Result<TurnReply, Box<dyn BackendError>>;
type BoxedSendTurnFuture = Pin<Box<dyn Future<Output = SendTurnResult> + Send>>;
type HandlerFn = Arc<dyn Fn(TurnRequest) -> BoxedSendTurnFuture + Send + Sync>;

/// A type-erased [`Backend`], so the client doesn't need to be generic
/// over it.
#[derive(Clone)]
pub struct BackendClient {
    handler_fn: HandlerFn,
}

impl BackendClient {
    /// Wraps a backend.
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = backend.send_turn(&req);
            Box::pin(
                async move {
                    trace!(
                        "sending turn with {} history messages and {} attachments",
                        req.history.len(),
                        req.attachments.len()
                    );
                    match fut.await {
                        Ok(reply) => {
                            trace!("got a reply of {} bytes", reply.text.len());
                            Ok(reply)
                        }
                        Err(err) => {
                            error!("turn failed: {err}");
                            Err(Box::new(err) as Box<dyn BackendError>)
                        }
                    }
                }
                .instrument(trace_span!("backend req")),
            )
        });
        Self { handler_fn }
    }

    /// Delivers a turn and waits for the reply.
    ///
    /// # Cancel safety
    ///
    /// Dropping the future abandons the request; nothing is recorded.
    #[inline]
    pub async fn send_turn(&self, req: TurnRequest) -> SendTurnResult {
        (self.handler_fn)(req).await
    }

    /// Like [`Self::send_turn`], but runs the request on its own task so a
    /// panicking backend shows up as a failed turn.
    pub(crate) async fn send_turn_isolated(
        &self,
        req: TurnRequest,
    ) -> SendTurnResult {
        match tokio::spawn((self.handler_fn)(req)).await {
            Ok(result) => result,
            Err(err) => {
                error!("backend request aborted: {err}");
                Err(Box::new(Aborted::from(err)) as Box<dyn BackendError>)
            }
        }
    }
}
