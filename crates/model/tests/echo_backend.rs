use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::time::Duration;

use atena_model::{
    Backend, BackendError, Content, ContentPart, ErrorKind, Message,
    TurnReply, TurnRequest,
};
use tokio::time::sleep;

#[derive(Debug)]
struct EchoBackendError(ErrorKind);

impl Display for EchoBackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoBackendError {}

impl BackendError for EchoBackendError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Replies with the user's text and the number of earlier turns.
struct EchoBackend;

impl Backend for EchoBackend {
    type Error = EchoBackendError;

    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<TurnReply, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            if req.message.is_empty() && req.attachments.is_empty() {
                break 'blk Err(EchoBackendError(ErrorKind::Status(422)));
            }
            Ok(TurnReply {
                text: format!(
                    "You said {} after {} turns",
                    req.message,
                    req.history.len() / 2
                ),
            })
        };
        async move {
            sleep(Duration::from_millis(1)).await;
            ready(result).await
        }
    }
}

#[tokio::test]
async fn test_reply() {
    let backend = EchoBackend;
    let req = TurnRequest {
        message: "Good morning".to_owned(),
        history: vec![Message::user("hi"), Message::assistant("hello")],
        attachments: vec![],
    };
    let fut = backend.send_turn(&req);
    // The future must not keep the request alive.
    drop(req);
    let reply = fut.await.unwrap();
    assert_eq!(reply.text, "You said Good morning after 1 turns");
}

#[tokio::test]
async fn test_error() {
    let backend = EchoBackend;
    let req = TurnRequest {
        message: String::new(),
        history: vec![],
        attachments: vec![],
    };
    let err = backend.send_turn(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Status(422));
}

#[test]
fn test_history_user_message_with_images() {
    let msg = Message {
        content: Content::Parts(vec![
            ContentPart::text("two pictures"),
            ContentPart::image_marker(),
            ContentPart::image_marker(),
        ]),
        ..Message::user("")
    };
    assert_eq!(msg.image_count(), 2);
    assert_eq!(msg.plain_text(), "two pictures");
}
