//! Plain HTTP/1.1 transport on hyper's pooled client

use std::time::Duration;

use bytes::Bytes;
use http::header::USER_AGENT;
use http::{HeaderValue, Request};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::Transport;
use crate::config::{ConfigResult, TransportConfig, Validator};
use crate::error::{self, BadScheme, Result, TimedOut};
use crate::http::{FetchRequest, FetchResponse};

/// Transport for absolute `http://` targets.
///
/// Connections are pooled per host. `https` targets are rejected with an
/// invalid-target error; TLS is left to custom transports.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    request_timeout: Duration,
    user_agent: HeaderValue,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Build a transport from `config`.
    ///
    /// Must be called inside a tokio runtime only when requests are made;
    /// construction itself does not spawn.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` when the timeouts or user agent are invalid.
    pub fn new(config: &TransportConfig) -> ConfigResult<Self> {
        config.validate()?;

        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|e| {
            crate::config::ConfigurationError::InvalidParameter(format!("user agent: {e}"))
        })?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout));
        connector.set_nodelay(true);
        connector.enforce_http(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
            user_agent,
        })
    }

    fn build_request(&self, request: &FetchRequest) -> Result<Request<Full<Bytes>>> {
        let Some(url) = request.url() else {
            return Err(error::invalid_target(format!(
                "target {:?} is not an absolute URL",
                request.target
            )));
        };
        if url.scheme() != "http" {
            return Err(error::invalid_target(BadScheme).with_url(url));
        }

        let mut builder = Request::builder()
            .method(request.options.method.clone())
            .uri(url.as_str());

        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.options.headers.clone());
            if !headers.contains_key(USER_AGENT) {
                headers.insert(USER_AGENT, self.user_agent.clone());
            }
        }

        let body = request.options.body.clone().unwrap_or_default();
        builder
            .body(Full::new(body))
            .map_err(|e| error::request(e).with_url(url))
    }

    async fn exchange(&self, request: Request<Full<Bytes>>) -> Result<FetchResponse> {
        let response = self.client.request(request).await.map_err(|e| {
            if e.is_connect() {
                error::connect(e)
            } else {
                error::request(e)
            }
        })?;

        let (parts, body) = response.into_parts();
        let body = body.collect().await.map_err(error::body)?.to_bytes();

        Ok(FetchResponse::new(parts.status, parts.headers, body))
    }
}

impl Transport for HyperTransport {
    async fn perform(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let http_request = self.build_request(request)?;
        let method = http_request.method().clone();

        tracing::debug!(
            target: "fetchcache::transport",
            method = %method,
            target_url = %request.target,
            "Sending request"
        );

        let outcome = match tokio::time::timeout(self.request_timeout, self.exchange(http_request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(error::timeout(TimedOut)),
        };

        let outcome = match (outcome, request.url()) {
            (Err(e), Some(url)) if e.url().is_none() => Err(e.with_url(url)),
            (outcome, _) => outcome,
        };

        match &outcome {
            Ok(response) => tracing::debug!(
                target: "fetchcache::transport",
                method = %method,
                target_url = %request.target,
                status = response.status.as_u16(),
                body_bytes = response.body.len(),
                "Received response"
            ),
            Err(e) => tracing::debug!(
                target: "fetchcache::transport",
                method = %method,
                target_url = %request.target,
                error = %e,
                "Request failed"
            ),
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::http::RequestOptions;

    fn transport() -> HyperTransport {
        HyperTransport::new(&TransportConfig::default()).expect("default config is valid")
    }

    #[tokio::test]
    async fn rejects_relative_and_tls_targets() {
        let transport = transport();

        let relative = transport
            .perform(&FetchRequest::new("/data", RequestOptions::default()))
            .await
            .expect_err("relative target");
        assert!(relative.is_invalid_target());

        let tls = transport
            .perform(&FetchRequest::new("https://example.com/", RequestOptions::default()))
            .await
            .expect_err("https target");
        assert!(tls.is_invalid_target());
        assert_eq!(tls.url().map(url::Url::as_str), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn performs_one_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 404 Not Found\r\ncontent-length: 7\r\ncache-control: max-age=30\r\n\r\nmissing",
                )
                .await
                .expect("write");
            String::from_utf8_lossy(&received).into_owned()
        });

        let response = transport()
            .perform(&FetchRequest::new(
                format!("http://{addr}/things"),
                RequestOptions::new().method(Method::GET),
            ))
            .await
            .expect("response");

        assert_eq!(response.status, http::StatusCode::NOT_FOUND);
        assert_eq!(response.body, "missing");
        assert!(!response.is_cached());

        let head = server.await.expect("server").to_ascii_lowercase();
        assert!(head.starts_with("get /things http/1.1"));
        assert!(head.contains("user-agent: fetchcache/0.1"));
    }

    #[tokio::test]
    async fn refused_connections_are_connect_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let err = transport()
            .perform(&FetchRequest::new(format!("http://{addr}/"), RequestOptions::default()))
            .await
            .expect_err("nothing listening");
        assert!(err.is_connect(), "{err:?}");
    }
}
