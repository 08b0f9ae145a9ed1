use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Map, Value, json};

use crate::catalog::{CatalogAnswer, CatalogQuery, FileDownload, case_fields};
use crate::config::Settings;
use crate::error::KiraError;
use crate::predicate::{CASE_ID, Predicate};

pub const FILE_FIELDS: [&str; 12] = [
    "file_id",
    "file_name",
    "md5sum",
    "file_size",
    "data_type",
    "data_format",
    "cases.case_id",
    "cases.submitter_id",
    "cases.project.project_id",
    "cases.samples.submitter_id",
    "cases.samples.portions.analytes.aliquots.aliquot_id",
    "cases.samples.portions.analytes.aliquots.submitter_id",
];

const PROBE_SIZE: u64 = 10;

#[derive(Clone)]
pub struct GdcHttpClient {
    client: Client,
    base_url: String,
}

impl GdcHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-omics/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::CatalogHttp(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| KiraError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.catalog_url.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, KiraError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying catalog request");
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, "retrying catalog request");
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(KiraError::CatalogHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, KiraError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "GDC request failed".to_string());
        Err(KiraError::CatalogStatus { status, message })
    }

    fn post_json(&self, endpoint: &str, payload: &Value) -> Result<Value, KiraError> {
        let url = self.endpoint(endpoint);
        let response = self.send_with_retries(|| self.client.post(&url).json(payload))?;
        let response = Self::handle_status(response)?;
        let body: Value = response
            .json()
            .map_err(|err| KiraError::MalformedAnswer(err.to_string()))?;
        check_warnings(&body)?;
        Ok(body)
    }

    fn all_records(
        &self,
        endpoint: &str,
        fields: &[&str],
        predicate: &Predicate,
    ) -> Result<Value, KiraError> {
        let probe = self.post_json(
            endpoint,
            &build_payload(Some("json"), 0, PROBE_SIZE, None, Some(predicate)),
        )?;
        let total = pagination_total(&probe)?;
        tracing::debug!(endpoint, total, "catalog records matched");
        if total == 0 {
            return Ok(probe);
        }
        self.post_json(
            endpoint,
            &build_payload(Some("json"), 0, total, Some(fields), Some(predicate)),
        )
    }
}

impl CatalogQuery for GdcHttpClient {
    fn query_files(&self, predicate: &Predicate) -> Result<CatalogAnswer, KiraError> {
        let body = self.all_records("files", &FILE_FIELDS, predicate)?;
        Ok(CatalogAnswer::from_value(body))
    }

    fn query_cases(&self, case_ids: &[String]) -> Result<Value, KiraError> {
        let predicate = Predicate::new().with_field(CASE_ID, case_ids.to_vec());
        let fields = case_fields();
        let fields = fields.iter().map(String::as_str).collect::<Vec<_>>();
        let body = self.all_records("cases", &fields, &predicate)?;
        let hits = body
            .pointer("/data/hits")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let count = hits.as_array().map(Vec::len).unwrap_or(0);
        Ok(json!({ "data": hits, "count": count }))
    }
}

impl FileDownload for GdcHttpClient {
    fn download(&self, file_ids: &[String]) -> Result<Vec<u8>, KiraError> {
        let url = self.endpoint("data");
        let payload = json!({ "ids": file_ids });
        let response = self.send_with_retries(|| self.client.post(&url).json(&payload))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| KiraError::CatalogHttp(err.to_string()))?;
        tracing::debug!(files = file_ids.len(), bytes = bytes.len(), "files downloaded");
        Ok(bytes.to_vec())
    }
}

pub fn build_payload(
    format: Option<&str>,
    from: u64,
    size: u64,
    fields: Option<&[&str]>,
    predicate: Option<&Predicate>,
) -> Value {
    let mut payload = Map::new();
    if let Some(format) = format {
        payload.insert("format".to_string(), json!(format));
    }
    payload.insert("from".to_string(), json!(from));
    payload.insert("size".to_string(), json!(size));
    if let Some(fields) = fields {
        payload.insert("fields".to_string(), json!(fields.join(",")));
    }
    if let Some(predicate) = predicate {
        payload.insert("filters".to_string(), predicate.to_filters());
    }
    Value::Object(payload)
}

pub fn check_warnings(body: &Value) -> Result<(), KiraError> {
    match body.get("warnings") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Object(map)) if map.is_empty() => Ok(()),
        Some(Value::Array(list)) if list.is_empty() => Ok(()),
        Some(other) => Err(KiraError::CatalogWarnings(other.to_string())),
    }
}

fn pagination_total(body: &Value) -> Result<u64, KiraError> {
    body.pointer("/data/pagination/total")
        .and_then(Value::as_u64)
        .ok_or_else(|| KiraError::MalformedAnswer("missing data.pagination.total".to_string()))
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::predicate::ACCESS;

    #[test]
    fn payload_carries_filters() {
        let predicate = Predicate::from_fields([(ACCESS, vec!["open"])]);
        let payload = build_payload(Some("json"), 0, 10, Some(&["file_id"]), Some(&predicate));
        assert_eq!(payload["size"], 10);
        assert_eq!(payload["fields"], "file_id");
        assert_eq!(payload["filters"]["op"], "and");
    }

    #[test]
    fn warnings_are_fatal_unless_empty() {
        assert!(check_warnings(&json!({"warnings": {}})).is_ok());
        let err = check_warnings(&json!({"warnings": {"fields": "bogus"}})).unwrap_err();
        assert_matches!(err, KiraError::CatalogWarnings(_));
    }
}
