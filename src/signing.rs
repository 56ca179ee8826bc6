// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! HMAC-SHA256 request signing for the screening API.
//!
//! Every request carries an `Authorization: Signature ...` header computed
//! over a canonical string built from the request itself.
//!
//! ## Canonical string format
//!
//! For a request without a body:
//! ```text
//! (request-target): get /screening/v3/reports/{id}/status
//! host: {host}
//! date: {date}
//! ```
//!
//! For a request with a JSON body:
//! ```text
//! (request-target): post /screening/v3/cases
//! host: {host}
//! date: {date}
//! content-type: application/json
//! content-length: {byte length}
//! {body}
//! ```
//!
//! The `headers="..."` list in the Authorization header names exactly the
//! lines above, in the same order. The server rebuilds the string from that
//! list, so any drift between the two is an authentication failure.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::Credentials;
use crate::error::SigningError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "hmac-sha256";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request, as seen by the signer. The date is generated once per request
/// and must be the same value sent in the `Date` header.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: HttpMethod,
    /// Full request path including the gateway prefix.
    pub path: &'a str,
    pub body: Option<&'a [u8]>,
    pub date: &'a str,
}

/// Parsed form of the `Authorization` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    pub key_id: String,
    pub algorithm: &'static str,
    pub signed_headers: Vec<&'static str>,
    pub signature: String,
}

impl fmt::Display for AuthorizationHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signature keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            self.algorithm,
            self.signed_headers.join(" "),
            self.signature
        )
    }
}

/// Format a timestamp as an HTTP-date (`Thu, 05 Feb 2026 10:00:00 GMT`).
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The ordered `(name, value)` pairs that make up the canonical string.
fn signed_lines(host: &str, request: &SignableRequest<'_>) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        (
            "(request-target)",
            format!("{} {}", request.method.as_str().to_ascii_lowercase(), request.path),
        ),
        ("host", host.to_string()),
        ("date", request.date.to_string()),
    ];
    if let Some(body) = request.body {
        lines.push(("content-type", JSON_CONTENT_TYPE.to_string()));
        lines.push(("content-length", body.len().to_string()));
    }
    lines
}

/// Build the canonical string and the header names it covers. Both come from
/// the same line list so they cannot disagree.
pub fn canonical_string(host: &str, request: &SignableRequest<'_>) -> (Vec<&'static str>, Vec<u8>) {
    let lines = signed_lines(host, request);
    let names = lines.iter().map(|(name, _)| *name).collect();

    let mut canonical = lines
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes();

    if let Some(body) = request.body {
        canonical.push(b'\n');
        canonical.extend_from_slice(body);
    }

    (names, canonical)
}

/// Compute the Authorization header for a request.
///
/// The secret is used as raw key bytes, exactly as configured.
pub fn sign(
    credentials: &Credentials,
    request: &SignableRequest<'_>,
) -> Result<AuthorizationHeader, SigningError> {
    let (signed_headers, canonical) = canonical_string(credentials.host(), request);

    let mut mac = HmacSha256::new_from_slice(credentials.secret())
        .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    mac.update(&canonical);
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(AuthorizationHeader {
        key_id: credentials.key_id().to_string(),
        algorithm: ALGORITHM,
        signed_headers,
        signature,
    })
}
