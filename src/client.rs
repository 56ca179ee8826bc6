//! Signed HTTP client for the screening API.
//!
//! Non-2xx responses are returned like any other response; only network and
//! framing failures surface as [`TransportError`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::config::{ApiConfig, Credentials};
use crate::error::TransportError;
use crate::signing::{self, HttpMethod, SignableRequest, JSON_CONTENT_TYPE};

/// A fully prepared request, ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and undecoded body as received.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Whatever moves bytes to the API and back.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connect {
                url: String::new(),
                message: format!("failed to build http client: {e}"),
            })?;
        Ok(Self { client })
    }
}

fn classify(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { url: url.to_string() }
    } else if err.is_body() || err.is_decode() {
        TransportError::Framing { url: url.to_string(), message: err.to_string() }
    } else {
        TransportError::Connect { url: url.to_string(), message: err.to_string() }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&request.url, e))?
            .to_vec();

        Ok(RawResponse { status, body })
    }
}

/// Response body, parsed as JSON when it is JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
    /// Body text exactly as received
    raw: String,
}

impl HttpResponse {
    pub fn from_raw(raw: RawResponse) -> Self {
        let text = String::from_utf8_lossy(&raw.body).into_owned();
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(json) => ResponseBody::Json(json),
            Err(_) => ResponseBody::Text(text.clone()),
        };
        Self { status: raw.status, body, raw: text }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }

    /// The body text as received, whether or not it parsed as JSON.
    pub fn text(&self) -> &str {
        &self.raw
    }

    /// Server-provided error message from the `message` field, or a
    /// status-coded fallback.
    pub fn error_message(&self) -> String {
        self.json()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("API Error: {}", self.status))
    }
}

/// Signs and sends requests against one API gateway.
pub struct SignedClient<T = ReqwestTransport> {
    credentials: Credentials,
    base_url: String,
    gateway_path: String,
    transport: T,
}

impl SignedClient<ReqwestTransport> {
    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.http_timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: HttpTransport> SignedClient<T> {
    pub fn with_transport(config: &ApiConfig, transport: T) -> Self {
        Self {
            credentials: config.credentials.clone(),
            base_url: format!("{}://{}", config.scheme, config.credentials.host()),
            gateway_path: config.gateway_path.clone(),
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Full request path for an endpoint relative to the gateway, e.g.
    /// `cases` → `/screening/v3/cases`.
    pub fn path_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.gateway_path, endpoint.trim_start_matches('/'))
    }

    /// Build the signed request. The date is taken once and used for both the
    /// `Date` header and the signature.
    pub fn prepare(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest, TransportError> {
        let path = self.path_for(endpoint);
        let date = signing::http_date(Utc::now());

        let authorization = signing::sign(
            &self.credentials,
            &SignableRequest {
                method,
                path: &path,
                body: body.as_deref(),
                date: &date,
            },
        )?;

        let mut headers = vec![("Authorization", authorization.to_string()), ("Date", date)];
        if let Some(body) = &body {
            headers.push(("Content-Type", JSON_CONTENT_TYPE.to_string()));
            headers.push(("Content-Length", body.len().to_string()));
        }

        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        })
    }

    pub async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.prepare(method, endpoint, body)?;
        let url = request.url.clone();

        tracing::debug!(%method, %url, "Sending signed request");
        let raw = self.transport.execute(request).await.map_err(|e| {
            tracing::warn!(%method, %url, "Request failed: {e}");
            e
        })?;

        let response = HttpResponse::from_raw(raw);
        tracing::info!(%method, %url, status = response.status, "Response received");
        Ok(response)
    }

    pub async fn get(&self, endpoint: &str) -> Result<HttpResponse, TransportError> {
        self.send(HttpMethod::Get, endpoint, None).await
    }

    pub async fn post_json(&self, endpoint: &str, body: &Value) -> Result<HttpResponse, TransportError> {
        self.send(HttpMethod::Post, endpoint, Some(body.to_string().into_bytes()))
            .await
    }
}
