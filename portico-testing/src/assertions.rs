// Test assertions for dispatched requests

use crate::TestResponse;
use portico_core::HttpStatus;

pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status();
    assert_eq!(
        actual,
        expected,
        "Expected status {}, got {} with body: {}",
        expected,
        actual,
        response.body_string()
    );
}

pub fn assert_http_status(response: &TestResponse, expected: HttpStatus) {
    assert_status(response, expected.code());
}

/// Assert that the body deserializes to `expected`
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .body_json()
        .expect("Failed to deserialize response body");
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.body_string();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}'. Body: {}",
        expected,
        body
    );
}

/// Assert that the request was forwarded to `view`
pub fn assert_forwarded_to(response: &TestResponse, view: &str) {
    let forward = response.forward();
    assert_eq!(
        forward.map(|f| f.view.as_str()),
        Some(view),
        "Expected a forward to '{}', got {:?}",
        view,
        forward
    );
}

/// Assert a JSON success envelope and return its `data`
pub fn assert_envelope(response: &TestResponse) -> serde_json::Value {
    let body: serde_json::Value = response
        .body_json()
        .expect("Failed to deserialize response body");
    assert_eq!(body["status"], "success", "Not a success envelope: {}", body);
    assert_eq!(body["code"], 200, "Not a success envelope: {}", body);
    body["data"].clone()
}
