/*!
 * The connection seam between the transfer engine and the object store
 *
 * The engine never builds HTTP details itself: it fills in a [`Request`]
 * (method, bucket, key, query parameters, body) and hands it to a
 * [`Connection`]. The signed REST transport lives in [`rest`]; an in-memory
 * store used by the test suite lives in [`memory`]. Both honor the same wire
 * shapes, which follow the store's JSON API.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod memory;
pub mod rest;

pub use memory::MemoryConnection;
pub use rest::RestConnection;

/// HTTP method chosen by the engine for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

/// One request against the store, addressed by bucket and optional key
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub bucket: String,
    pub key: Option<String>,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, bucket: impl Into<String>) -> Self {
        Self {
            method,
            bucket: bucket.into(),
            key: None,
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter set on this request.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A fully buffered response from the store.
///
/// Bodies are bounded by the configured part size, so buffering one response
/// never holds more than one part in memory.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The opaque per-part integrity tag, with surrounding quotes stripped.
    pub fn etag(&self) -> Option<String> {
        self.header("etag").map(|t| t.trim_matches('"').to_string())
    }

    /// Decode the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// The external transport contract.
///
/// Implementations must be safe for concurrent use by multiple workers; the
/// engine shares one connection across all part and file tasks.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn make_request(&self, request: Request) -> Result<Response>;
}

/// One key in a listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: String,
    pub size: u64,
}

/// A page of a paginated bucket listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub keys: Vec<KeyRecord>,
    #[serde(default)]
    pub next_marker: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// Body of a successful multipart-initiate response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateResult {
    pub upload_id: String,
}

/// One completed part in a multipart-complete request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPart {
    pub part_number: usize,
    pub etag: String,
}

/// Body of a multipart-complete request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteBody {
    pub object_parts: Vec<ObjectPart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = Request::new(Method::Put, "bkt")
            .key("dir/file")
            .param("upload_id", "u1")
            .param("part_number", "0")
            .body(Bytes::from_static(b"abc"));
        assert_eq!(req.method.as_str(), "PUT");
        assert_eq!(req.key.as_deref(), Some("dir/file"));
        assert_eq!(req.query("part_number"), Some("0"));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn test_response_etag_strips_quotes() {
        let mut headers = HashMap::new();
        headers.insert("ETag".to_string(), "\"abc123\"".to_string());
        let resp = Response { status: 201, headers, body: Bytes::new() };
        assert!(resp.is_success());
        assert_eq!(resp.etag().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_list_page_decode_defaults() {
        let resp = Response {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from_static(b"{\"keys\":[{\"key\":\"a\",\"size\":3}]}"),
        };
        let page: ListPage = resp.json().unwrap();
        assert_eq!(page.keys.len(), 1);
        assert!(!page.has_more);
        assert!(page.next_marker.is_none());
    }
}
