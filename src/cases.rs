//! Case submission: `POST /cases` and reduction of the returned match list.
//!
//! Field extraction is done with one function per field. Each documents the
//! keys it reads and what it returns when they are missing.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::client::{HttpTransport, SignedClient};
use crate::error::SubmissionError;
use crate::models::{
    AlertLevel, CaseRequest, MatchCandidate, MatchStrength, ScreeningResult, MISSING,
};

/// Submit one organisation for screening and reduce the response.
///
/// An empty `entity_name` fails before anything is sent.
pub async fn submit_case<T: HttpTransport>(
    client: &SignedClient<T>,
    entity_name: &str,
    country_code: Option<&str>,
    group_id: &str,
) -> Result<ScreeningResult, SubmissionError> {
    if entity_name.trim().is_empty() {
        return Err(SubmissionError::Validation(
            "Missing required field: entity name".into(),
        ));
    }

    let request = CaseRequest::organisation(entity_name, country_code, group_id);
    let body = serde_json::to_value(request.to_payload())
        .map_err(|e| SubmissionError::Decode(format!("could not encode case: {e}")))?;

    tracing::info!(
        entity = %request.entity_name,
        country = %request.country_code,
        "Submitting screening case"
    );

    let response = client.post_json("cases", &body).await?;

    if !response.is_success() {
        let message = response.error_message();
        tracing::warn!(status = response.status, "Case rejected: {message}");
        return Err(SubmissionError::Remote { status: response.status, message });
    }

    let json = response.json().ok_or_else(|| {
        SubmissionError::Decode(format!("case response is not JSON: {}", response.text()))
    })?;

    let result = reduce_case_response(&request.entity_name, json, Utc::now());
    tracing::info!(
        case_id = %result.case_id,
        matches = result.matches.len(),
        alert = %result.alert_level,
        "Case screened"
    );
    Ok(result)
}

/// Turn a case-creation response into a [`ScreeningResult`].
///
/// `now` stands in for `modificationDate` when the server leaves it out.
pub fn reduce_case_response(entity_name: &str, body: &Value, now: DateTime<Utc>) -> ScreeningResult {
    let matches: Vec<MatchCandidate> = match_results(body).iter().map(candidate).collect();
    let alert_level = if matches.iter().any(MatchCandidate::is_strong) {
        AlertLevel::Alert
    } else {
        AlertLevel::Clear
    };

    ScreeningResult {
        case_id: case_id(body),
        entity_name: echoed_name(body).unwrap_or_else(|| entity_name.to_string()),
        generated_at: modification_date(body).unwrap_or(now),
        matches,
        alert_level,
    }
}

/// `results`, or empty.
fn match_results(body: &Value) -> &[Value] {
    body.get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// `caseSystemId`, or [`MISSING`].
fn case_id(body: &Value) -> String {
    non_empty_str(body.get("caseSystemId"))
        .unwrap_or(MISSING)
        .to_string()
}

/// `name` as echoed by the server.
fn echoed_name(body: &Value) -> Option<String> {
    non_empty_str(body.get("name")).map(str::to_string)
}

/// `modificationDate` (RFC 3339). A value that does not parse is logged and
/// treated as absent.
fn modification_date(body: &Value) -> Option<DateTime<Utc>> {
    let raw = non_empty_str(body.get("modificationDate"))?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(modification_date = raw, "Unparseable modificationDate, using local time: {e}");
            None
        }
    }
}

fn candidate(result: &Value) -> MatchCandidate {
    MatchCandidate {
        name: candidate_name(result),
        score: result.get("matchScore").and_then(Value::as_f64),
        strength: non_empty_str(result.get("matchStrength")).map(MatchStrength::parse),
        countries: candidate_countries(result),
        categories: string_list(result.get("sourceCategories")),
        identifiers: candidate_identifiers(result),
    }
}

/// `names[0].details[0].value`
fn candidate_name(result: &Value) -> Option<String> {
    let value = result
        .get("names")?
        .get(0)?
        .get("details")?
        .get(0)?
        .get("value");
    non_empty_str(value).map(str::to_string)
}

/// `locations[*].country.name`, in order, skipping blanks.
fn candidate_countries(result: &Value) -> Vec<String> {
    result
        .get("locations")
        .and_then(Value::as_array)
        .map(|locations| {
            locations
                .iter()
                .filter_map(|l| non_empty_str(l.get("country").and_then(|c| c.get("name"))))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `identifications[*]` as `type → value`; the first entry of a type wins.
fn candidate_identifiers(result: &Value) -> std::collections::BTreeMap<String, String> {
    let mut identifiers = std::collections::BTreeMap::new();
    let entries = result
        .get("identifications")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    for entry in entries {
        if let (Some(kind), Some(value)) = (
            non_empty_str(entry.get("type")),
            non_empty_str(entry.get("value")),
        ) {
            identifiers
                .entry(kind.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    identifiers
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| non_empty_str(Some(v)))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{test_config, ScriptedTransport};
    use crate::models::OFAC_IDENTIFIER_TYPE;
    use chrono::TimeZone;
    use serde_json::json;

    fn hit(name: &str, strength: &str, score: f64) -> Value {
        json!({
            "matchStrength": strength,
            "matchScore": score,
            "names": [{ "details": [{ "value": name }] }],
            "sourceCategories": ["Sanctions"],
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_name_fails_without_network() {
        let client = SignedClient::with_transport(&test_config(), ScriptedTransport::new());
        for name in ["", "   "] {
            let err = submit_case(&client, name, None, "group-1").await.unwrap_err();
            assert!(matches!(err, SubmissionError::Validation(_)));
        }
        assert!(client.transport().urls().is_empty());
    }

    #[tokio::test]
    async fn successful_submission_is_reduced() {
        let transport = ScriptedTransport::new().respond_json(
            201,
            json!({
                "caseSystemId": "case-42",
                "name": "ACME CORP",
                "modificationDate": "2026-02-05T10:00:00Z",
                "results": [
                    hit("Acme Holdings", "STRONG", 95.0),
                    hit("Acme Ltd", "WEAK", 40.0),
                ]
            }),
        );
        let client = SignedClient::with_transport(&test_config(), transport);
        let result = submit_case(&client, "Acme Corp", Some("GBR"), "group-1").await.unwrap();

        assert_eq!(result.case_id, "case-42");
        assert_eq!(result.entity_name, "ACME CORP");
        assert_eq!(result.generated_at, Utc.with_ymd_and_hms(2026, 2, 5, 10, 0, 0).unwrap());
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.alert_level, AlertLevel::Alert);

        let sent = client.transport().requests.lock().unwrap()[0].clone();
        assert_eq!(sent.url, "https://api.example.test/screening/v3/cases");
        let body: Value = serde_json::from_slice(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "Acme Corp");
        assert_eq!(body["groupId"], "group-1");
        assert_eq!(body["secondaryFields"][0]["value"], "GBR");
    }

    #[tokio::test]
    async fn remote_rejection_carries_status_and_message() {
        let transport = ScriptedTransport::new()
            .respond_json(400, json!({ "message": "groupId is invalid" }))
            .respond(500, "oops");
        let client = SignedClient::with_transport(&test_config(), transport);

        let err = submit_case(&client, "Acme", None, "bad").await.unwrap_err();
        assert!(matches!(
            &err,
            SubmissionError::Remote { status: 400, message } if message == "groupId is invalid"
        ));

        let err = submit_case(&client, "Acme", None, "bad").await.unwrap_err();
        assert!(matches!(
            &err,
            SubmissionError::Remote { status: 500, message } if message == "API Error: 500"
        ));
    }

    #[test]
    fn strong_label_and_score_threshold() {
        let body = json!({ "results": [
            hit("A", "STRONG", 95.0),
            hit("B", "WEAK", 89.0),
            hit("C", "WEAK", 90.0),
            hit("D", "MEDIUM", 10.0),
        ]});
        let result = reduce_case_response("x", &body, now());
        let strong: Vec<_> = result.strong_matches().map(|m| m.name.clone().unwrap()).collect();
        assert_eq!(strong, vec!["A", "C"]);
    }

    #[test]
    fn weak_label_with_high_score_still_qualifies() {
        let body = json!({ "results": [hit("A", "STRONG", 95.0), hit("B", "WEAK", 99.0)] });
        let result = reduce_case_response("x", &body, now());
        assert_eq!(result.strong_matches().count(), 2);
        assert_eq!(result.top_hit().unwrap().name.as_deref(), Some("A"));
    }

    #[test]
    fn top_hit_is_first_strong_in_response_order() {
        let body = json!({ "results": [
            hit("Weak first", "WEAK", 20.0),
            hit("Lower score", "EXACT", 91.0),
            hit("Higher score", "EXACT", 100.0),
        ]});
        let result = reduce_case_response("x", &body, now());
        assert_eq!(result.top_hit().unwrap().name.as_deref(), Some("Lower score"));
    }

    #[test]
    fn ofac_number_from_top_hit_or_sentinel() {
        let mut top = hit("Acme", "EXACT", 100.0);
        top["identifications"] = json!([
            { "type": "OTHER", "value": "1" },
            { "type": OFAC_IDENTIFIER_TYPE, "value": "OFAC-12345" },
            { "type": OFAC_IDENTIFIER_TYPE, "value": "OFAC-99999" },
        ]);
        let result = reduce_case_response("x", &json!({ "results": [top] }), now());
        assert_eq!(result.ofac_number(), "OFAC-12345");

        let result = reduce_case_response("x", &json!({ "results": [hit("Acme", "EXACT", 100.0)] }), now());
        assert_eq!(result.ofac_number(), MISSING);
        assert_eq!(result.ofac_number(), MISSING);

        let result = reduce_case_response("x", &json!({}), now());
        assert_eq!(result.ofac_number(), MISSING);
    }

    #[test]
    fn unparseable_modification_date_falls_back_to_now() {
        let body = json!({ "modificationDate": "05/02/2026 10:00", "results": [] });
        assert_eq!(reduce_case_response("x", &body, now()).generated_at, now());

        let body = json!({ "modificationDate": "2026-02-05T10:00:00.123+01:00" });
        assert_eq!(
            reduce_case_response("x", &body, now()).generated_at,
            Utc.with_ymd_and_hms(2026, 2, 5, 9, 0, 0).unwrap() + chrono::Duration::milliseconds(123)
        );
    }

    #[test]
    fn sparse_response_uses_sentinels() {
        let result = reduce_case_response("Acme", &json!({ "results": [{}] }), now());
        assert_eq!(result.case_id, MISSING);
        assert_eq!(result.entity_name, "Acme");
        assert_eq!(result.generated_at, now());
        assert_eq!(result.alert_level, AlertLevel::Clear);

        let candidate = &result.matches[0];
        assert_eq!(candidate.name, None);
        assert_eq!(candidate.score, None);
        assert_eq!(candidate.strength, None);
        assert!(candidate.identifiers.is_empty());
    }

    #[test]
    fn summary_flattens_top_hit_and_lists_up_to_five() {
        let mut results: Vec<Value> = (0..7).map(|i| hit(&format!("Hit {i}"), "STRONG", 95.0)).collect();
        results[0]["locations"] = json!([{ "country": { "name": "Iran" } }]);
        results[0]["sourceCategories"] = json!(["Sanctions", "PEP"]);
        results[1]["sourceCategories"] = json!([]);
        let result = reduce_case_response("x", &json!({ "caseSystemId": "c1", "results": results }), now());

        let summary = result.summary();
        assert_eq!(summary.status, AlertLevel::Alert);
        assert_eq!(summary.total_matches, 7);
        assert_eq!(summary.strong_match_count, 7);
        assert_eq!(summary.top_hit_name, "Hit 0");
        assert_eq!(summary.top_hit_score, 95.0);
        assert_eq!(summary.top_hit_strength, "STRONG");
        assert_eq!(summary.top_hit_country, "Iran");
        assert_eq!(summary.top_hit_categories, "Sanctions, PEP");
        assert_eq!(summary.strong_matches_summary.split(" | ").count(), 5);
        assert!(summary
            .strong_matches_summary
            .starts_with("1. Hit 0 (95%) - Sanctions, PEP | 2. Hit 1 (95%) - N/A"));
    }

    #[test]
    fn clear_summary_uses_sentinels() {
        let result = reduce_case_response("x", &json!({ "results": [hit("A", "WEAK", 10.0)] }), now());
        let summary = result.summary();
        assert_eq!(summary.status, AlertLevel::Clear);
        assert_eq!(summary.top_hit_name, MISSING);
        assert_eq!(summary.top_hit_score, 0.0);
        assert_eq!(summary.top_hit_country, MISSING);
        assert_eq!(summary.strong_matches_summary, MISSING);
        assert_eq!(summary.ofac_number, MISSING);
    }
}
