// Control-plane HTTP client
//
// Wraps a pooled `reqwest::Client` with Basic auth, URL construction,
// envelope building and the shared retry loop. Typed operations live in
// `endpoints.rs` and `metrics.rs` as inherent methods so this module stays
// focused on transport mechanics.

use arc_swap::ArcSwapOption;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, info, trace};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ConnectionError, ConnectionErrorCode, Error};
use crate::response::{ApiResponse, extract_error_message};
use crate::retry::RetryPolicy;
use crate::transport::{MAX_CONNECTIONS, TransportConfig};

const BODY_PREVIEW_CHARS: usize = 200;

// ── RequestDescriptor ────────────────────────────────────────────────

/// One logical control-plane call, built by a typed operation.
#[derive(Debug, Clone)]
pub(crate) struct RequestDescriptor {
    pub method: Method,
    /// Operation path relative to the configured base path.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Add a scalar query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }
}

// ── DeviceClient ─────────────────────────────────────────────────────

/// Authenticated request/response client for one device.
///
/// Owns a keep-alive connection pool for its whole lifetime. At most
/// [`MAX_CONNECTIONS`] exchanges run at once; further callers wait for a
/// free slot. Call [`close`](Self::close) when done to release pooled sockets.
pub struct DeviceClient {
    config: ClientConfig,
    base_url: Url,
    retry: RetryPolicy,
    http: ArcSwapOption<reqwest::Client>,
    slots: Semaphore,
}

impl DeviceClient {
    /// Build a client and its connection pool. No network I/O happens here.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let base_url = config.base_url()?;
        let http = TransportConfig::from(&config).build_client()?;
        let retry = RetryPolicy::from_config(&config);

        debug!(
            %base_url,
            attempts = retry.attempts(),
            verify_tls = config.verify_tls,
            "device client created"
        );

        Ok(Self {
            config,
            base_url,
            retry,
            http: ArcSwapOption::from_pointee(http),
            slots: Semaphore::new(MAX_CONNECTIONS),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{scheme}://{host}:{port}{base_path}`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.effective_port()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Release the connection pool. Idempotent.
    ///
    /// In-flight requests finish on the sockets they hold; every later call
    /// fails with [`Error::Closed`].
    pub fn close(&self) {
        if self.http.swap(None).is_some() {
            self.slots.close();
            info!(host = %self.config.host, "device client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.http.load().is_none()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join an operation path onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request execution ────────────────────────────────────────────

    /// Run a request through the retry loop and build the envelope.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<ApiResponse<T>, Error> {
        self.retry
            .run(|attempt| self.attempt(&request, attempt))
            .await
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        attempt: u32,
    ) -> Result<ApiResponse<T>, Error> {
        let http = self.http.load_full().ok_or(Error::Closed)?;
        let _slot = self.slots.acquire().await.map_err(|_| Error::Closed)?;

        let url = self.url(&request.path)?;
        debug!(method = %request.method, %url, attempt, "sending request");

        let mut builder = http
            .request(request.method.clone(), url)
            .basic_auth(&self.config.username, Some(self.config.password.expose_secret()));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        self.build_envelope(resp).await
    }

    /// Turn an HTTP reply into an envelope.
    ///
    /// 401 is raised as an authentication failure; other non-2xx statuses
    /// come back as `success: false`. A 2xx body that fails to parse is a
    /// terminal [`Error::Deserialization`].
    async fn build_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<ApiResponse<T>, Error> {
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ConnectionError::new(
                ConnectionErrorCode::AuthenticationFailed,
                "HTTP 401: device rejected the credentials",
                self.host(),
                self.port(),
            )
            .into());
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(status = status.as_u16(), len = body.len(), "response body received");

        if !status.is_success() {
            let message = extract_error_message(status, &body);
            debug!(status = status.as_u16(), %message, "device returned error status");
            return Ok(ApiResponse::failure(status.as_u16(), message));
        }

        if body.trim().is_empty() {
            return Ok(ApiResponse::empty(status.as_u16()));
        }

        let data = serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        Ok(ApiResponse::ok(status.as_u16(), data))
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        ConnectionError::from_transport(err, self.host(), self.port()).into()
    }
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
