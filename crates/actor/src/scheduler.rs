use std::sync::Weak;

use tokio::select;
use tokio::sync::{mpsc, watch};

use crate::mailbox::Mailbox;
use crate::{Actor, Message};

type MessageRx<S> = mpsc::UnboundedReceiver<Box<dyn Message<S>>>;

pub async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: MessageRx<S>,
    mut stop_rx: watch::Receiver<bool>,
) {
    debug!("started");
    let mut handled: u64 = 0;
    while let Some(msg) = next_message(&mut msg_rx, &mut stop_rx).await {
        trace!("received message: {msg:?}");

        let Some(mailbox) = mailbox.upgrade() else {
            warn!("last handle has been dropped, discarding the message");
            break;
        };
        trace_span!("handle msg", seq = handled).in_scope(|| {
            msg.handle(&mut state, &Actor::from_mailbox(mailbox));
        });
        handled += 1;
    }

    // Dropping what is left fails pending calls right away.
    msg_rx.close();
    let mut dropped = 0;
    while msg_rx.try_recv().is_ok() {
        dropped += 1;
    }
    debug!(handled, dropped, "stopped");
}

/// Waits for the next message. Returns `None` once the actor should stop.
async fn next_message<S>(
    msg_rx: &mut MessageRx<S>,
    stop_rx: &mut watch::Receiver<bool>,
) -> Option<Box<dyn Message<S>>> {
    select! {
        biased;

        _ = stop_rx.changed() => None,
        msg = msg_rx.recv() => msg,
    }
}
