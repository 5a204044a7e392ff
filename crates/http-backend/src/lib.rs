//! A backend talking to the Atena chat server over HTTP.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use atena_model::{Backend, BackendError, ErrorKind, TurnReply, TurnRequest};
use mime::Mime;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;

pub use config::{HttpBackendConfig, HttpBackendConfigBuilder};
use proto::{ChatRequest, ChatResponse, FormError, HealthResponse};

/// Error type for [`HttpBackend`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if let Some(status) = err.status() {
            ErrorKind::Status(status.as_u16())
        } else if err.is_decode() {
            ErrorKind::Malformed
        } else {
            ErrorKind::Network
        };
        Self::new(format!("{err}"), kind)
    }
}

impl From<FormError> for Error {
    fn from(err: FormError) -> Self {
        let message = match err {
            FormError::History(err) => format!("cannot encode history: {err}"),
            FormError::Part(err) => format!("cannot encode image: {err}"),
        };
        Self::new(message, ErrorKind::Malformed)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// The Atena chat server.
///
/// Text-only turns are posted as JSON to the chat endpoint. Turns with
/// images go to the image endpoint as a multipart form. Any non-2xx
/// status, network failure or body that isn't a reply is a failed turn;
/// nothing is retried. The `Content-Type` of a reply is not checked.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: Arc<HttpBackendConfig>,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` with the given configuration.
    #[inline]
    pub fn new(config: HttpBackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    /// Checks that the server is up.
    pub async fn health(&self) -> Result<(), Error> {
        let resp = self
            .client
            .get(self.config.url("/health"))
            .send()
            .await
            .and_then(Response::error_for_status)?;
        let health: HealthResponse = read_json(resp).await?;
        if health.status != "healthy" {
            return Err(Error::new(
                format!("server reports status {:?}", health.status),
                ErrorKind::Malformed,
            ));
        }
        Ok(())
    }

    fn build_request(&self, req: &TurnRequest) -> Result<RequestBuilder, Error> {
        if req.attachments.is_empty() {
            let url = self.config.url(&self.config.chat_path);
            return Ok(self.client.post(url).json(&ChatRequest::from(req)));
        }
        let form = proto::create_form(req)?;
        let url = self.config.url(&self.config.image_chat_path);
        Ok(self.client.post(url).multipart(form))
    }
}

impl Backend for HttpBackend {
    type Error = Error;

    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<TurnReply, Self::Error>> + Send + 'static
    {
        let builder = self
            .build_request(req)
            .map(|builder| builder.header(header::ACCEPT, "application/json"));

        async move {
            let resp = builder?
                .send()
                .await
                .and_then(Response::error_for_status)?;
            let chat: ChatResponse = read_json(resp).await?;
            Ok(TurnReply {
                text: chat.response,
            })
        }
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Mime>().ok());
    // The body decides; a server may label its JSON as anything.
    if !content_type
        .as_ref()
        .is_some_and(|m| m.subtype().as_str() == "json")
    {
        debug!("reading a JSON body labeled {content_type:?}");
    }

    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| {
        debug!("unexpected response body: {}", String::from_utf8_lossy(&body));
        Error::new(format!("Malformed response: {err}"), ErrorKind::Malformed)
    })
}
