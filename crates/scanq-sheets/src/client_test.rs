use super::*;

const SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/1AbCdEf/edit#gid=0";

fn test_client() -> SheetsClient {
    SheetsClient::new(5, "scanq-test/0.1", 0, 0, Duration::ZERO).expect("client builds")
}

#[test]
fn export_url_from_edit_link() {
    let url = SheetsClient::export_url(SHEET_URL, "Cast Granit").unwrap();
    assert_eq!(
        url,
        "https://docs.google.com/spreadsheets/d/1AbCdEf/gviz/tq?tqx=out%3Acsv&sheet=Cast+Granit"
    );
}

#[test]
fn export_url_from_user_scoped_link() {
    let url = SheetsClient::export_url(
        "https://docs.google.com/spreadsheets/u/0/d/1AbCdEf/htmlview",
        "Patients",
    )
    .unwrap();
    assert!(url.starts_with("https://docs.google.com/spreadsheets/d/1AbCdEf/gviz/tq?"));
}

#[test]
fn export_url_rejects_non_sheet_links() {
    let err = SheetsClient::export_url("https://docs.google.com/document/d/1AbCdEf/edit", "x")
        .unwrap_err();
    assert!(
        matches!(err, SheetsError::InvalidSpreadsheetUrl { .. }),
        "expected InvalidSpreadsheetUrl, got: {err:?}"
    );
}

#[test]
fn export_url_rejects_garbage() {
    assert!(SheetsClient::export_url("not a url", "x").is_err());
}

#[test]
fn values_url_quotes_sheet_range() {
    let url = test_client()
        .values_url(SHEET_URL, "Cast Granit", "k123")
        .unwrap();
    assert_eq!(
        url,
        "https://sheets.googleapis.com/v4/spreadsheets/1AbCdEf/values/'Cast%20Granit'?valueRenderOption=UNFORMATTED_VALUE&key=k123"
    );
}

#[test]
fn values_url_escapes_apostrophes() {
    let url = test_client().values_url(SHEET_URL, "Bob's", "k").unwrap();
    assert!(url.contains("/values/'Bob''s'?"), "{url}");
}

#[test]
fn values_url_honours_api_base() {
    let url = test_client()
        .with_api_base("http://127.0.0.1:9999/")
        .values_url(SHEET_URL, "S", "k")
        .unwrap();
    assert!(url.starts_with("http://127.0.0.1:9999/v4/spreadsheets/1AbCdEf/values/"));
}

#[test]
fn html_detection() {
    assert!(looks_like_html("\n  <!DOCTYPE html><html>"));
    assert!(looks_like_html("<HTML lang=en>"));
    assert!(!looks_like_html("Patient,Status\n"));
    assert!(!looks_like_html(""));
}

#[test]
fn spreadsheet_parts_keeps_origin_port() {
    let (origin, id) = spreadsheet_parts("http://127.0.0.1:8080/spreadsheets/d/xyz/edit").unwrap();
    assert_eq!(origin, "http://127.0.0.1:8080");
    assert_eq!(id, "xyz");
}
