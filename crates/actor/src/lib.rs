//! A small single-writer actor runtime.
//!
//! An actor owns a piece of state on its own task. Everything that wants
//! to touch the state sends a message and the actor handles messages one
//! at a time, so the state never needs a lock. Long-running work is spawned
//! elsewhere and reports back by sending another message.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod scheduler;

pub use error::ActorStoppedError;
pub use handle::Actor;
pub use mailbox::Message;

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
    }

    #[derive(Debug)]
    struct Add(u32);

    impl Message<Counter> for Add {
        fn handle(self, state: &mut Counter, _handle: &Actor<Counter>) {
            state.value += self.0;
        }
    }

    #[derive(Debug)]
    struct Get(oneshot::Sender<u32>);

    impl Message<Counter> for Get {
        fn handle(self, state: &mut Counter, _handle: &Actor<Counter>) {
            self.0.send(state.value).unwrap();
        }
    }

    #[tokio::test]
    async fn test_send_message() {
        let actor = Actor::spawn(Counter::default(), None);
        actor.send(Add(42)).unwrap();

        let (tx, rx) = oneshot::channel();
        actor.send(Get(tx)).unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_call_sees_earlier_messages() {
        let actor = Actor::spawn(Counter::default(), Some("counter"));
        actor.send(Add(1)).unwrap();
        actor.send(Add(2)).unwrap();
        let value = actor
            .call(|state, _| {
                state.value *= 10;
                state.value
            })
            .await
            .unwrap();
        assert_eq!(value, 30);
    }

    #[tokio::test]
    async fn test_call_can_message_itself() {
        let actor = Actor::spawn(Counter::default(), None);
        actor
            .call(|_, handle| handle.send(Add(5)).unwrap())
            .await
            .unwrap();
        assert_eq!(actor.call(|state, _| state.value).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_stopped_actor() {
        let actor = Actor::spawn(Counter::default(), None);
        actor.stop();
        let result = actor.call(|state, _| state.value).await;
        assert_eq!(result, Err(ActorStoppedError));
    }
}
