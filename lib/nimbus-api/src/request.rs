//! Request payloads exchanged with a transport

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// HTTP methods the client issues
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    /// Object-store server side copy
    Copy,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Copy => "COPY",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request and response data for a single dispatch
///
/// A request is sent as JSON when `req_value` is set or a JSON response was asked
/// for with [`RequestData::expect_json`]; otherwise `req_body` is sent as raw bytes
/// and the response body is kept as bytes.
#[derive(Clone, Debug, Default)]
pub struct RequestData {
    /// Extra request headers
    pub req_headers: HashMap<String, String>,
    /// Query parameters
    pub params: Vec<(String, String)>,
    /// Acceptable response statuses; empty accepts any 2xx
    pub expected_status: Vec<u16>,
    /// JSON request body
    pub req_value: Option<serde_json::Value>,
    /// Raw request body
    pub req_body: Option<Vec<u8>>,
    /// Decode the response body as JSON into `resp_value`
    pub json_response: bool,

    /// Status of the last response
    pub resp_status: u16,
    /// Headers of the last response, names lowercased
    pub resp_headers: HashMap<String, String>,
    /// Decoded JSON response body
    pub resp_value: Option<serde_json::Value>,
    /// Raw response body
    pub resp_body: Vec<u8>,
}

impl RequestData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `value` as a JSON body
    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self {
            req_value: Some(serde_json::to_value(value)?),
            json_response: true,
            ..Default::default()
        })
    }

    /// Send raw bytes as the body
    pub fn bytes(body: impl Into<Vec<u8>>) -> Self {
        Self {
            req_body: Some(body.into()),
            ..Default::default()
        }
    }

    /// Ask for the response body to be decoded as JSON
    pub fn expect_json(mut self) -> Self {
        self.json_response = true;
        self
    }

    pub fn with_expected_status(mut self, statuses: &[u16]) -> Self {
        self.expected_status = statuses.to_vec();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.req_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn is_json(&self) -> bool {
        self.req_value.is_some() || self.json_response
    }

    /// Whether `status` satisfies the expected statuses
    pub fn accepts_status(&self, status: u16) -> bool {
        if self.expected_status.is_empty() {
            (200..300).contains(&status)
        } else {
            self.expected_status.contains(&status)
        }
    }

    /// Response header lookup, case-insensitive
    pub fn resp_header(&self, name: &str) -> Option<&str> {
        self.resp_headers
            .get(&name.to_lowercase())
            .map(|v| v.as_str())
    }

    /// Deserialize the decoded JSON response
    pub fn resp_json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match &self.resp_value {
            Some(value) => T::deserialize(value),
            None => serde_json::from_slice(&self.resp_body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_strings() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Copy.to_string(), "COPY");
    }

    #[test]
    fn test_accepts_status_defaults_to_2xx() {
        let data = RequestData::new();
        assert!(data.accepts_status(200));
        assert!(data.accepts_status(204));
        assert!(!data.accepts_status(300));
        assert!(!data.accepts_status(404));
    }

    #[test]
    fn test_accepts_status_explicit() {
        let data = RequestData::new().with_expected_status(&[202]);
        assert!(data.accepts_status(202));
        assert!(!data.accepts_status(200));
    }

    #[test]
    fn test_json_request() {
        let data = RequestData::json(&json!({"server": {"name": "a"}})).unwrap();
        assert!(data.is_json());
        assert!(!RequestData::bytes(b"abc".to_vec()).is_json());
        assert!(RequestData::new().expect_json().is_json());
    }

    #[test]
    fn test_resp_json_from_value_or_body() {
        let mut data = RequestData::new();
        data.resp_body = br#"{"a": 1}"#.to_vec();
        let v: serde_json::Value = data.resp_json().unwrap();
        assert_eq!(v["a"], 1);

        data.resp_value = Some(json!({"a": 2}));
        let v: serde_json::Value = data.resp_json().unwrap();
        assert_eq!(v["a"], 2);
    }

    #[test]
    fn test_resp_header_case_insensitive() {
        let mut data = RequestData::new();
        data.resp_headers
            .insert("x-subject-token".to_string(), "tok".to_string());
        assert_eq!(data.resp_header("X-Subject-Token"), Some("tok"));
    }
}
