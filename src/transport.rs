//! Transport adapter (§4.I, §9 "Globally shared transport"): GET/PUT/POST
//! bounded by an ambient timeout, with connections threaded explicitly
//! through the call graph rather than captured ambiently.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::MaskLinkConfig;
use crate::error::{Error, Result, TransportError};

/// The response of a PUT/POST: just the headers the caller cares about
/// (`content-location` on POST, per §4.F step 6).
#[derive(Debug, Clone, Default)]
pub struct WriteResponse {
    pub headers: HashMap<String, String>,
}

/// The transport contract consumed by the rest of this crate (§6
/// "Transport contract"). Implementations must be safe to use
/// concurrently only insofar as they document; callers must not share a
/// `Connection` across concurrent calls unless it says otherwise (§5).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> std::result::Result<Value, TransportError>;

    async fn put(
        &self,
        path: &str,
        data: &Value,
        content_type: &str,
    ) -> std::result::Result<WriteResponse, TransportError>;

    async fn post(
        &self,
        path: &str,
        data: &Value,
        content_type: &str,
    ) -> std::result::Result<WriteResponse, TransportError>;
}

/// A resolved connection: a concrete transport plus the base domain it
/// was built against. Not `Clone`-shared across concurrent callers by
/// convention (§5 "Shared resources").
///
/// Carries an optional [`CancellationToken`] (§5 "Cancellation"): a
/// cancelled token aborts the in-flight call and surfaces as
/// [`TransportError::Cancelled`]. Partial writes already issued (e.g. a
/// nonce PUT that beat the cancellation) are not rolled back.
pub struct Connection {
    pub domain: String,
    transport: Box<dyn Transport>,
    cancellation: Option<CancellationToken>,
}

impl Connection {
    pub fn new(domain: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            domain: domain.into(),
            transport,
            cancellation: None,
        }
    }

    /// Attach a cancellation token; outstanding and future calls on this
    /// connection abort as soon as it's cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    async fn race<T>(
        &self,
        path: &str,
        fut: impl std::future::Future<Output = std::result::Result<T, TransportError>>,
    ) -> std::result::Result<T, TransportError> {
        let Some(token) = &self.cancellation else {
            return fut.await;
        };
        tokio::select! {
            res = fut => res,
            () = token.cancelled() => Err(TransportError::Cancelled { path: path.to_string() }),
        }
    }

    pub async fn get(&self, path: &str) -> std::result::Result<Value, TransportError> {
        self.race(path, self.transport.get(path)).await
    }

    pub async fn put(
        &self,
        path: &str,
        data: &Value,
        content_type: &str,
    ) -> std::result::Result<WriteResponse, TransportError> {
        self.race(path, self.transport.put(path, data, content_type)).await
    }

    pub async fn post(
        &self,
        path: &str,
        data: &Value,
        content_type: &str,
    ) -> std::result::Result<WriteResponse, TransportError> {
        self.race(path, self.transport.post(path, data, content_type)).await
    }
}

/// Inputs accepted by [`resolve_connection`].
pub struct ConnectionArgs<'a> {
    pub connection: Option<Connection>,
    pub token: Option<&'a str>,
    pub domain: Option<&'a str>,
    pub config: &'a MaskLinkConfig,
}

/// `resolveConnection({connection?, token?, domain?}) -> connection` (§4.I).
///
/// If no connection was supplied, a token and domain are required to
/// build a non-cached, non-websocket one.
pub fn resolve_connection(args: ConnectionArgs<'_>) -> Result<Connection> {
    if let Some(conn) = args.connection {
        return Ok(conn);
    }
    let (Some(token), Some(domain)) = (args.token, args.domain) else {
        return Err(Error::MissingCredentials);
    };
    let transport = HttpTransport::new(domain, token, args.config.http_timeout)
        .map_err(|e| Error::Signer(e.to_string()))?;
    Ok(Connection::new(domain, Box::new(transport)))
}

/// A `reqwest`-backed [`Transport`] against a single domain, bearer-token
/// authenticated — the concrete collaborator §6 leaves abstract.
pub struct HttpTransport {
    client: reqwest::Client,
    domain: String,
    token: String,
}

impl HttpTransport {
    pub fn new(domain: &str, token: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            domain: domain.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.domain, path.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> std::result::Result<Value, TransportError> {
        let url = self.url_for(path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| to_transport_error(&url, &e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                url,
            });
        }
        resp.json::<Value>()
            .await
            .map_err(|e| TransportError::InvalidJson {
                url: url.clone(),
                message: e.to_string(),
            })
    }

    async fn put(
        &self,
        path: &str,
        data: &Value,
        content_type: &str,
    ) -> std::result::Result<WriteResponse, TransportError> {
        let url = self.url_for(path);
        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header("content-type", content_type)
            .json(data)
            .send()
            .await
            .map_err(|e| to_transport_error(&url, &e))?;
        response_headers(url, resp).await
    }

    async fn post(
        &self,
        path: &str,
        data: &Value,
        content_type: &str,
    ) -> std::result::Result<WriteResponse, TransportError> {
        let url = self.url_for(path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("content-type", content_type)
            .json(data)
            .send()
            .await
            .map_err(|e| to_transport_error(&url, &e))?;
        response_headers(url, resp).await
    }
}

async fn response_headers(
    url: String,
    resp: reqwest::Response,
) -> std::result::Result<WriteResponse, TransportError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
            url,
        });
    }
    let mut headers = HashMap::new();
    for (name, value) in resp.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), v.to_string());
        }
    }
    Ok(WriteResponse { headers })
}

fn to_transport_error(url: &str, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
