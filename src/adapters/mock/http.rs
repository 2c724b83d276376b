//! Mock HTTP client for testing.
//!
//! Returns canned responses by URL and records every request so tests can
//! assert on paths, headers and bodies.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET or POST)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a response (any status)
    Success(Response),
    /// Return a transport error
    Error(HttpError),
}

impl MockResponse {
    /// A response with the given status and JSON body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        MockResponse::Success(Response::new(status, Bytes::from(body.to_string())))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    response: MockResponse,
    delay: Option<Duration>,
}

/// Mock HTTP client for testing.
///
/// Responses are matched by exact URL first, then by the longest configured
/// prefix, then the default.
///
/// # Example
///
/// ```ignore
/// use cure_sync::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.set_response(
///     "https://app.cmscure.com/api/sdk/auth",
///     MockResponse::json(200, serde_json::json!({"token": "t"})),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, Entry>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for a URL (exact or prefix match).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.responses.lock().insert(
            url.to_string(),
            Entry {
                response,
                delay: None,
            },
        );
    }

    /// Set a response that is returned only after `delay`.
    pub fn set_delayed_response(&self, url: &str, response: MockResponse, delay: Duration) {
        self.responses.lock().insert(
            url.to_string(),
            Entry {
                response,
                delay: Some(delay),
            },
        );
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock() = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Recorded requests whose URL contains `fragment`.
    pub fn requests_matching(&self, fragment: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .cloned()
            .collect()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        self.requests.lock().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn lookup(&self, url: &str) -> Option<Entry> {
        let responses = self.responses.lock();

        if let Some(entry) = responses.get(url) {
            return Some(entry.clone());
        }

        let prefix_match = responses
            .iter()
            .filter(|(pattern, _)| url.starts_with(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, entry)| entry.clone());
        if prefix_match.is_some() {
            return prefix_match;
        }

        self.default_response.lock().clone().map(|response| Entry {
            response,
            delay: None,
        })
    }

    async fn respond(&self, url: &str) -> Result<Response, HttpError> {
        let entry = self
            .lookup(url)
            .ok_or_else(|| HttpError::Other(format!("No mock response for URL: {}", url)))?;
        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        match entry.response {
            MockResponse::Success(response) => Ok(response),
            MockResponse::Error(err) => Err(err),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers, None);
        self.respond(url).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.respond(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exact_match_wins_over_prefix() {
        let client = MockHttpClient::new();
        client.set_response("http://x/api", MockResponse::json(500, serde_json::json!({})));
        client.set_response(
            "http://x/api/one",
            MockResponse::json(200, serde_json::json!({"ok": true})),
        );

        let response = client.get("http://x/api/one", &Headers::new()).await.unwrap();
        assert_eq!(response.status, 200);

        let response = client.get("http://x/api/two", &Headers::new()).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_unmatched_url_errors() {
        let client = MockHttpClient::new();
        let result = client.post("http://nowhere", "{}", &Headers::new()).await;
        assert!(matches!(result, Err(HttpError::Other(_))));
    }

    #[tokio::test]
    async fn test_records_requests() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::json(200, serde_json::json!({})));

        let mut headers = Headers::new();
        headers.insert("X-API-Key".to_string(), "k".to_string());
        client
            .post("http://x/a", r#"{"projectId":"p"}"#, &headers)
            .await
            .unwrap();

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].headers.get("X-API-Key"), Some(&"k".to_string()));
        assert_eq!(requests[0].json_body().unwrap()["projectId"], "p");
        assert_eq!(client.requests_matching("/a").len(), 1);
    }

    #[tokio::test]
    async fn test_error_response() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://x",
            MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
        );
        let result = client.get("http://x", &Headers::new()).await;
        assert!(matches!(result, Err(HttpError::ConnectionFailed(_))));
    }
}
