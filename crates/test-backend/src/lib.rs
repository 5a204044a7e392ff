//! A local fake backend for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use atena_model::{Backend, BackendError, ErrorKind, TurnReply, TurnRequest};
use tokio::sync::Semaphore;
use tokio::time::sleep;

pub use preset::*;

/// The error returned by [`ScriptedBackend`].
#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<PresetReply>,
    requests: Vec<TurnRequest>,
}

/// A local fake backend for testing purpose.
///
/// Replies are taken from a script, one per turn, in the order turns are
/// sent. Once the script runs out every turn fails. Every request is
/// recorded so tests can look at what the client actually sent.
///
/// A gated backend holds every turn until [`ScriptedBackend::release`]
/// lets it through, which makes it possible to act while a turn is in
/// flight.
///
/// Clones share the script, the recorded requests and the gate.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    /// Creates a backend with an empty script.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose turns wait for [`Self::release`].
    #[inline]
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Appends a reply to the script.
    #[inline]
    pub fn push(&self, reply: PresetReply) {
        self.script().replies.push_back(reply);
    }

    /// Lets one held turn complete. Does nothing for an ungated backend.
    #[inline]
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Delays every reply.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<TurnRequest> {
        self.script().requests.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for ScriptedBackend {
    type Error = crate::Error;

    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<TurnReply, Self::Error>> + Send + 'static
    {
        let reply = {
            let mut script = self.script();
            script.requests.push(req.clone());
            script.replies.pop_front()
        };
        let gate = self.gate.clone();
        let delay = self.delay;
        async move {
            if let Some(gate) = gate {
                let Ok(permit) = gate.acquire().await else {
                    return Err(Error {
                        message: "gate closed",
                        kind: ErrorKind::Network,
                    });
                };
                permit.forget();
            }
            sleep(delay.unwrap_or(Duration::from_millis(1))).await;
            match reply {
                Some(PresetReply::Text(text)) => Ok(TurnReply { text }),
                Some(PresetReply::Failure(kind)) => Err(Error {
                    message: "scripted failure",
                    kind,
                }),
                Some(PresetReply::Panic) => panic!("scripted panic"),
                None => Err(Error {
                    message: "no more scripted replies",
                    kind: ErrorKind::Network,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use atena_model::Message;

    use super::*;

    fn request(text: &str) -> TurnRequest {
        TurnRequest {
            message: text.to_owned(),
            history: vec![],
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_script() {
        let backend = ScriptedBackend::new();
        backend.push(PresetReply::text("Hello, world!"));
        backend.push(PresetReply::failure(ErrorKind::Status(502)));

        let reply = backend.send_turn(&request("Hi")).await.unwrap();
        assert_eq!(reply.text, "Hello, world!");

        let mut req = request("Again");
        req.history = vec![Message::user("Hi"), Message::assistant("Hello")];
        let err = backend.send_turn(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status(502));

        let err = backend.send_turn(&request("More")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].history.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate() {
        let backend = ScriptedBackend::gated();
        backend.push(PresetReply::text("late"));
        let fut = backend.send_turn(&request("Hi"));
        let handle = tokio::spawn(fut);

        sleep(Duration::from_secs(60)).await;
        assert!(!handle.is_finished());
        // Recorded as soon as it was sent.
        assert_eq!(backend.requests().len(), 1);

        backend.release();
        assert_eq!(handle.await.unwrap().unwrap().text, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay() {
        let mut backend = ScriptedBackend::new();
        backend.set_delay(Duration::from_secs(30));
        backend.push(PresetReply::text("slow"));
        let handle = tokio::spawn(backend.send_turn(&request("Hi")));

        sleep(Duration::from_secs(29)).await;
        assert!(!handle.is_finished());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.await.unwrap().unwrap().text, "slow");
    }
}
