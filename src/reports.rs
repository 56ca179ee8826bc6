//! Dossier reports: request generation, then poll until the job settles.
//!
//! ```text
//! REQUESTED   --accepted-->            IN_PROGRESS
//! REQUESTED   --rejected-->            FAILED      (no polling)
//! IN_PROGRESS --status COMPLETED-->    COMPLETED
//! IN_PROGRESS --status FAILED-->       FAILED      (error details fetched once)
//! IN_PROGRESS --other status-->        IN_PROGRESS
//! IN_PROGRESS --attempts exhausted-->  TIMED_OUT
//! ```
//!
//! Polling is fixed-count and fixed-interval with no backoff. The wait before
//! each status check is a `tokio` timer, so dropping the future between
//! attempts abandons the workflow locally; the remote job keeps running.

use serde_json::Value;

use crate::client::{HttpTransport, SignedClient};
use crate::config::PollPolicy;
use crate::error::ReportError;
use crate::models::{ReportOutcome, ReportRequest, ReportState};

/// Remote status of a report job, as read from one poll response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Completed,
    Failed,
    /// Anything else, including a missing status.
    Pending(Option<String>),
}

impl PollStatus {
    pub fn from_body(body: &Value) -> Self {
        match report_status(body) {
            Some("COMPLETED") => PollStatus::Completed,
            Some("FAILED") => PollStatus::Failed,
            other => PollStatus::Pending(other.map(str::to_string)),
        }
    }
}

/// Status field of a poll response: `progressStatus`, then `status`. The
/// first non-empty string wins.
pub fn report_status(body: &Value) -> Option<&str> {
    ["progressStatus", "status"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// `reportId` of an accepted report request.
pub fn report_id(body: &Value) -> Option<&str> {
    body.get("reportId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Accepted(String),
    Rejected,
    Polled(PollStatus),
    AttemptsExhausted,
}

/// One report job. Terminal states absorb every further event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportJob {
    report_id: Option<String>,
    state: ReportState,
    attempts: u32,
}

impl Default for ReportJob {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportJob {
    pub fn new() -> Self {
        Self {
            report_id: None,
            state: ReportState::Requested,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ReportState {
        self.state
    }

    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    /// Status checks applied so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn apply(&mut self, event: JobEvent) -> ReportState {
        if self.state.is_terminal() {
            tracing::warn!(state = ?self.state, ?event, "Ignoring event for finished report job");
            return self.state;
        }

        let next = match (self.state, event) {
            (ReportState::Requested, JobEvent::Accepted(id)) => {
                self.report_id = Some(id);
                ReportState::InProgress
            }
            (ReportState::Requested, JobEvent::Rejected) => ReportState::Failed,
            (ReportState::InProgress, JobEvent::Polled(status)) => {
                self.attempts += 1;
                match status {
                    PollStatus::Completed => ReportState::Completed,
                    PollStatus::Failed => ReportState::Failed,
                    PollStatus::Pending(_) => ReportState::InProgress,
                }
            }
            (ReportState::InProgress, JobEvent::AttemptsExhausted) => ReportState::TimedOut,
            (state, event) => {
                tracing::warn!(?state, ?event, "Event does not apply in this state");
                state
            }
        };

        if next != self.state {
            tracing::info!(
                report_id = self.report_id.as_deref().unwrap_or("-"),
                from = ?self.state,
                to = ?next,
                "Report job transition"
            );
        }
        self.state = next;
        next
    }
}

/// Request a dossier for one case and wait for it to finish.
///
/// Returns `Ok` only for `COMPLETED`. `FAILED` comes back as
/// [`ReportError::Failed`] with the error-detail body, and running out of
/// attempts as [`ReportError::TimedOut`].
pub async fn request_and_await_report<T: HttpTransport>(
    client: &SignedClient<T>,
    request: &ReportRequest,
    policy: &PollPolicy,
) -> Result<ReportOutcome, ReportError> {
    if request.case_id.trim().is_empty() {
        return Err(ReportError::Validation("Missing required field: case id".into()));
    }
    if policy.max_attempts == 0 {
        return Err(ReportError::Validation("max attempts must be at least 1".into()));
    }

    let mut job = ReportJob::new();
    let body = serde_json::to_value(request.to_payload())
        .map_err(|e| ReportError::Decode(format!("could not encode report request: {e}")))?;

    tracing::info!(case_id = %request.case_id, "Requesting report");
    tracing::debug!(payload = %body, "Report request payload");

    let response = client.post_json("reports", &body).await?;
    tracing::debug!(status = response.status, body = %response.text(), "Report request response");

    if !response.is_success() {
        job.apply(JobEvent::Rejected);
        let message = response.error_message();
        tracing::warn!(status = response.status, "Report request rejected: {message}");
        return Err(ReportError::Remote { status: response.status, message });
    }

    let id = response
        .json()
        .and_then(report_id)
        .map(str::to_string)
        .ok_or_else(|| {
            ReportError::Decode(format!("report accepted without a reportId: {}", response.text()))
        })?;
    job.apply(JobEvent::Accepted(id.clone()));

    poll_until_settled(client, &mut job, &id, policy).await
}

async fn poll_until_settled<T: HttpTransport>(
    client: &SignedClient<T>,
    job: &mut ReportJob,
    report_id: &str,
    policy: &PollPolicy,
) -> Result<ReportOutcome, ReportError> {
    let status_endpoint = format!("reports/{report_id}/status");

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        let response = client.get(&status_endpoint).await?;
        tracing::debug!(
            report_id,
            attempt,
            status = response.status,
            body = %response.text(),
            "Poll response"
        );

        let status = match response.json() {
            Some(body) if response.is_success() => PollStatus::from_body(body),
            _ => {
                tracing::warn!(report_id, attempt, status = response.status, "Status check not usable; will retry");
                PollStatus::Pending(None)
            }
        };

        match job.apply(JobEvent::Polled(status)) {
            ReportState::Completed => {
                return Ok(ReportOutcome {
                    report_id: report_id.to_string(),
                    state: ReportState::Completed,
                    attempts: job.attempts(),
                });
            }
            ReportState::Failed => {
                let diagnostic = fetch_error_details(client, report_id).await?;
                return Err(ReportError::Failed {
                    report_id: report_id.to_string(),
                    diagnostic,
                });
            }
            _ => {}
        }
    }

    job.apply(JobEvent::AttemptsExhausted);
    tracing::warn!(report_id, attempts = job.attempts(), "Report still processing; giving up");
    Err(ReportError::TimedOut {
        report_id: report_id.to_string(),
        attempts: job.attempts(),
    })
}

/// `GET reports/{id}/errors`, returned raw whatever the status.
async fn fetch_error_details<T: HttpTransport>(
    client: &SignedClient<T>,
    report_id: &str,
) -> Result<String, ReportError> {
    let response = client.get(&format!("reports/{report_id}/errors")).await?;
    let diagnostic = response.text().to_string();
    tracing::warn!(report_id, status = response.status, details = %diagnostic, "Report failed");
    Ok(diagnostic)
}
