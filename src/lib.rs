//! Client for a remote watchlist-screening API.
//!
//! Submits screening cases, requests case dossier reports and polls them to
//! completion. Every request is signed with HMAC-SHA256 over a canonical
//! string (see [`signing`]).
//!
//! ## Endpoints used
//!
//! - `POST {gateway}/cases`               — Create and screen a case
//! - `POST {gateway}/reports`             — Request a dossier report
//! - `GET  {gateway}/reports/{id}/status` — Poll report progress
//! - `GET  {gateway}/reports/{id}/errors` — Failure details for a report

pub mod cases;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod reports;
pub mod signing;

pub use cases::submit_case;
pub use client::{HttpTransport, ReqwestTransport, SignedClient};
pub use config::{ApiConfig, Credentials, PollPolicy};
pub use error::{ConfigError, ReportError, SubmissionError, TransportError};
pub use reports::request_and_await_report;
