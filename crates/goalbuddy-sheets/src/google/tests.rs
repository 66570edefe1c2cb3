//! Tests for the Google Sheets backend.

use super::*;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sheets(server: &MockServer) -> GoogleSheets {
    GoogleSheets::new(
        "sheet-1",
        "UserData",
        Arc::new(StaticToken("test-token".into())),
    )
    .with_base_url(server.uri())
}

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_column_letter() {
    assert_eq!(column_letter(1), "A");
    assert_eq!(column_letter(10), "J");
    assert_eq!(column_letter(26), "Z");
    assert_eq!(column_letter(27), "AA");
    assert_eq!(column_letter(52), "AZ");
    assert_eq!(column_letter(0), "");
}

#[test]
fn test_a1_range_quotes_title() {
    assert_eq!(a1_range("UserData", None), "'UserData'");
    assert_eq!(a1_range("Bob's goals", Some("A1:B1")), "'Bob''s goals'!A1:B1");
}

#[test]
fn test_first_row_of_range() {
    assert_eq!(first_row_of_range("'UserData'!A5:J5"), Some(5));
    assert_eq!(first_row_of_range("UserData!C12"), Some(12));
    assert_eq!(first_row_of_range("A7:D7"), Some(7));
    assert_eq!(first_row_of_range("'UserData'!A:J"), None);
}

#[tokio::test]
async fn test_get_all_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/sheet-1/values/[^:]+$"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "'UserData'!A1:J2",
            "majorDimension": "ROWS",
            "values": [["user_id", "username"], ["42", "anna_k"]]
        })))
        .mount(&server)
        .await;

    let rows = sheets(&server).get_all_values().await.unwrap();
    assert_eq!(rows, vec![strings(&["user_id", "username"]), strings(&["42", "anna_k"])]);
}

#[tokio::test]
async fn test_get_all_values_empty_sheet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/sheet-1/values/[^:]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "'UserData'!A1:Z1000",
            "majorDimension": "ROWS"
        })))
        .mount(&server)
        .await;

    assert!(sheets(&server).get_all_values().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_append_row_returns_row_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/sheet-1/values/.+:append$"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(body_partial_json(serde_json::json!({
            "values": [["Finish the report", "2026-01-05 10:00:00", "", ""]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "spreadsheetId": "sheet-1",
            "updates": {"updatedRange": "'UserData'!A7:D7", "updatedRows": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let row = sheets(&server)
        .append_row(strings(&["Finish the report", "2026-01-05 10:00:00", "", ""]))
        .await
        .unwrap();
    assert_eq!(row, 7);
}

#[tokio::test]
async fn test_update_row_targets_cell_range() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"F5%3AG5$"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_partial_json(serde_json::json!({
            "range": "'UserData'!F5:G5",
            "values": [["On track", "2026-01-06 10:00:00"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    sheets(&server)
        .update_row(5, 6, strings(&["On track", "2026-01-06 10:00:00"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string(
            r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#,
        ))
        .mount(&server)
        .await;

    let err = sheets(&server).get_all_values().await.unwrap_err();
    assert!(err.is_rate_limited(), "got: {err}");
}

#[tokio::test]
async fn test_quota_403_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            r#"{"error":{"code":403,"errors":[{"reason":"RATE_LIMIT_EXCEEDED"}]}}"#,
        ))
        .mount(&server)
        .await;

    let err = sheets(&server)
        .append_row(strings(&["x"]))
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_other_errors_are_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Requested entity was not found."))
        .mount(&server)
        .await;

    let err = sheets(&server).get_all_values().await.unwrap_err();
    assert!(matches!(err, GoalError::Storage(_)));
}

#[tokio::test]
async fn test_prepare_keeps_existing_worksheet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheet-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sheets": [{"properties": {"title": "UserData"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sheet-1:batchUpdate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    sheets(&server).prepare().await.unwrap();
}

#[tokio::test]
async fn test_prepare_creates_missing_worksheet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheet-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sheets": [{"properties": {"title": "Sheet1"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sheet-1:batchUpdate"))
        .and(body_partial_json(serde_json::json!({
            "requests": [{"addSheet": {"properties": {"title": "UserData"}}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    sheets(&server).prepare().await.unwrap();
}
