//! L0 HTTP Transport.

use std::collections::HashMap;

use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TransportError;

/// A response from [`HttpTransport`]. Wraps [`reqwest::Response`] so callers
/// never depend on `reqwest` directly.
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Response headers as a flat map (multi-valued headers keep only the
    /// first value, which is sufficient for the headers this core reads).
    #[must_use]
    pub fn headers(&self) -> HashMap<String, String> {
        self.inner
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect()
    }

    /// Consume the response as text.
    pub async fn text(self) -> Result<String, TransportError> {
        Ok(self.inner.text().await?)
    }

    /// Consume the response as parsed JSON.
    pub async fn json(self) -> Result<Value, TransportError> {
        Ok(self.inner.json().await?)
    }

    /// Consume the response as a stream of byte chunks (for SSE parsing).
    pub fn byte_stream(self) -> impl Stream<Item = Result<Bytes, TransportError>> {
        use futures::StreamExt;
        self.inner.bytes_stream().map(|r| r.map_err(TransportError::from))
    }
}

/// Executes GET/POST with a streaming body, structured logging, and
/// cooperative cancellation. Does not itself classify errors as retryable
/// — that is [`crate::AuthTransport`]'s job.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport around a caller-supplied `reqwest::Client` (so
    /// callers can configure TLS, proxies, or a custom DNS resolver).
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` with optional headers, cancellable via `cancel`.
    pub async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, TransportError> {
        let mut req = self.client.get(url);
        for (k, v) in headers {
            req = req.header(k, v);
        }
        self.execute(url, req, cancel).await
    }

    /// POST a JSON `body` to `url` with optional headers, cancellable via `cancel`.
    pub async fn post(
        &self,
        url: &str,
        body: &Value,
        headers: &HashMap<String, String>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, TransportError> {
        let mut req = self.client.post(url).json(body);
        for (k, v) in headers {
            req = req.header(k, v);
        }
        self.execute(url, req, cancel).await
    }

    async fn execute(
        &self,
        url: &str,
        req: reqwest::RequestBuilder,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, TransportError> {
        debug!(url, "sending request");

        let send = req.send();
        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(TransportError::Cancelled),
                    result = send => result,
                }
            },
            None => send.await,
        };

        match result {
            Ok(inner) => {
                debug!(url, status = inner.status().as_u16(), "received response");
                Ok(Response { inner })
            },
            Err(e) => {
                warn!(url, error = %e, "request failed");
                Err(TransportError::Network(e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellation_before_send_returns_cancelled() {
        let transport = HttpTransport::new(reqwest::Client::new());
        let token = CancellationToken::new();
        token.cancel();

        let result = transport
            .get("http://127.0.0.1:1/unreachable", &HashMap::new(), Some(&token))
            .await;

        assert!(matches!(result, Err(TransportError::Cancelled)));
    }
}
