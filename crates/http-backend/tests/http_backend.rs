use atena_http_backend::{HttpBackend, HttpBackendConfigBuilder};
use atena_model::{
    Attachment, Backend, BackendError, ErrorKind, Message, TurnRequest,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> HttpBackend {
    let config = HttpBackendConfigBuilder::new()
        .with_base_url(server.uri())
        .build();
    HttpBackend::new(config)
}

fn request(message: &str, attachments: Vec<Attachment>) -> TurnRequest {
    TurnRequest {
        message: message.to_owned(),
        history: vec![Message::user("hola"), Message::assistant("¡hola!")],
        attachments,
    }
}

fn png(name: &str) -> Attachment {
    Attachment {
        file_name: name.to_owned(),
        mime: "image/png".to_owned(),
        bytes: b"\x89PNG fake".to_vec().into(),
    }
}

#[tokio::test]
async fn test_text_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({
            "message": "¿qué tal?",
            "conversation_history": [
                { "role": "user", "content": "hola" },
                { "role": "assistant", "content": "¡hola!" },
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Muy bien.",
            "conversation_history": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = backend_for(&server)
        .send_turn(&request("¿qué tal?", vec![]))
        .await
        .unwrap();
    assert_eq!(reply.text, "Muy bien.");
}

#[tokio::test]
async fn test_image_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat-with-image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Two cats." })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reply = backend_for(&server)
        .send_turn(&request("", vec![png("a.png"), png("b.png")]))
        .await
        .unwrap();
    assert_eq!(reply.text, "Two cats.");

    let received = server.received_requests().await.unwrap();
    let req = &received[0];
    let content_type = req.headers.get("content-type").unwrap();
    assert!(
        content_type
            .to_str()
            .unwrap()
            .starts_with("multipart/form-data")
    );
    let body = String::from_utf8_lossy(&req.body);
    assert!(body.contains(r#"name="message""#));
    assert!(body.contains(r#"name="conversation_history""#));
    assert!(body.contains(r#"[{"role":"user","content":"hola"}"#));
    assert!(body.contains(r#"name="images"; filename="a.png""#));
    assert!(body.contains(r#"name="images"; filename="b.png""#));
    assert!(
        body.find(r#"filename="a.png""#) < body.find(r#"filename="b.png""#)
    );
}

#[tokio::test]
async fn test_reply_without_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"response":"hi"}"#),
        )
        .mount(&server)
        .await;

    let reply = backend_for(&server)
        .send_turn(&request("hola", vec![]))
        .await
        .unwrap();
    assert_eq!(reply.text, "hi");
}

#[tokio::test]
async fn test_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "detail": "boom" })),
        )
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .send_turn(&request("hi", vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Status(500));
}

#[tokio::test]
async fn test_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat-with-image"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "answer": 1 })),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .send_turn(&request("hi", vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);

    let err = backend
        .send_turn(&request("hi", vec![png("a.png")]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_unreachable_server() {
    let config = HttpBackendConfigBuilder::new()
        .with_base_url("http://127.0.0.1:1")
        .build();
    let backend = HttpBackend::new(config);
    let err = backend
        .send_turn(&request("hi", vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(backend.health().await.unwrap_err().kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "degraded" })),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    backend.health().await.unwrap();
    let err = backend.health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}
