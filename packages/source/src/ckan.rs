//! CKAN `datastore_search_sql` client.
//!
//! Sends one SQL statement per request as the `sql` query parameter and
//! reads rows from `result.records`. Used for the Boston open data portal.

use crate::retry::{self, RetryPolicy};
use crate::{RawRecord, SourceError, SqlTransport};

/// The Boston open data SQL endpoint.
pub const DEFAULT_API_URL: &str = "https://data.boston.gov/api/3/action/datastore_search_sql";

/// [`SqlTransport`] over a CKAN datastore SQL endpoint.
#[derive(Debug, Clone)]
pub struct CkanSqlClient {
    client: reqwest::Client,
    api_url: String,
    retry: RetryPolicy,
}

impl Default for CkanSqlClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl CkanSqlClient {
    /// Creates a client for `api_url` that does not retry.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the retry policy applied to every request.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn execute_once(&self, sql: &str) -> Result<Vec<RawRecord>, SourceError> {
        log::debug!("CKAN SQL: {sql}");

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("sql", sql)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        extract_records(&body)
    }
}

#[async_trait::async_trait]
impl SqlTransport for CkanSqlClient {
    async fn execute(&self, sql: &str) -> Result<Vec<RawRecord>, SourceError> {
        retry::retry(&self.retry, |_| self.execute_once(sql)).await
    }
}

/// Pulls the row list out of a CKAN action response.
///
/// # Errors
///
/// Returns [`SourceError::MalformedResponse`] if the action reported
/// failure, `result.records` is missing, or a row is not a JSON object.
pub fn extract_records(body: &serde_json::Value) -> Result<Vec<RawRecord>, SourceError> {
    if body.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
        let detail = body
            .get("error")
            .map_or_else(|| "no error detail".to_string(), ToString::to_string);
        return Err(SourceError::MalformedResponse {
            message: format!("CKAN action failed: {detail}"),
        });
    }

    let records = body
        .get("result")
        .and_then(|r| r.get("records"))
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SourceError::MalformedResponse {
            message: "response has no result.records list".to_string(),
        })?;

    records
        .iter()
        .map(|row| {
            row.as_object()
                .cloned()
                .ok_or_else(|| SourceError::MalformedResponse {
                    message: format!("record is not an object: {row}"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_rows() {
        let body = json!({
            "success": true,
            "result": {
                "records": [
                    {"_id": 1, "y_latitude": "42.35", "x_longitude": "-71.06"},
                    {"_id": 2, "y_latitude": null, "x_longitude": "-71.00"}
                ]
            }
        });
        let rows = extract_records(&body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["y_latitude"], json!("42.35"));
        assert!(rows[1]["y_latitude"].is_null());
    }

    #[test]
    fn empty_records_is_an_empty_page() {
        let body = json!({"success": true, "result": {"records": []}});
        assert!(extract_records(&body).unwrap().is_empty());
    }

    #[test]
    fn missing_records_is_malformed() {
        let body = json!({"success": true, "result": {}});
        assert!(matches!(
            extract_records(&body),
            Err(SourceError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn failed_action_is_malformed() {
        let body = json!({"success": false, "error": {"message": "bad sql"}});
        let err = extract_records(&body).unwrap_err();
        assert!(err.to_string().contains("bad sql"));
    }
}
