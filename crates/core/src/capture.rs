//! Text captured from outside the keyboard, such as speech recognition.

use std::pin::Pin;
use std::task::{self, Poll};

use tokio::sync::mpsc;

/// A source of finalized text fragments.
///
/// Only final results are yielded; interim guesses that a recognizer may
/// still revise never leave the source. Each fragment is appended to the
/// composer's text buffer.
pub trait CaptureSource: Send + 'static {
    /// Attempts to pull out the next fragment.
    ///
    /// # Return value
    ///
    /// - `Poll::Pending` means the source is still listening. The current
    ///   task will be notified when the next fragment may be ready.
    /// - `Poll::Ready(Some(fragment))` delivers one finalized fragment.
    /// - `Poll::Ready(None)` means capturing has ended.
    ///
    /// Calling this method after the end should always return `None`.
    fn poll_next_fragment(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Option<String>>;
}

/// A [`CaptureSource`] fed through a channel.
///
/// Recognizers living on their own thread push final results into the
/// sender; capturing ends once every sender is dropped.
pub struct ChannelCapture {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChannelCapture {
    /// Creates a capture source together with the sender feeding it.
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl CaptureSource for ChannelCapture {
    #[inline]
    fn poll_next_fragment(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Option<String>> {
        self.rx.poll_recv(cx)
    }
}

/// Waits for the next fragment of a pinned source.
pub(crate) async fn next_fragment<C: CaptureSource + ?Sized>(
    source: &mut Pin<Box<C>>,
) -> Option<String> {
    std::future::poll_fn(|cx| source.as_mut().poll_next_fragment(cx)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_capture() {
        let (tx, source) = ChannelCapture::channel();
        let mut source = Box::pin(source);

        tx.send("hola".to_owned()).unwrap();
        tx.send("mundo".to_owned()).unwrap();
        drop(tx);

        assert_eq!(next_fragment(&mut source).await.as_deref(), Some("hola"));
        assert_eq!(next_fragment(&mut source).await.as_deref(), Some("mundo"));
        assert_eq!(next_fragment(&mut source).await, None);
        assert_eq!(next_fragment(&mut source).await, None);
    }
}
