/*!
 * In-memory object store speaking the same wire shapes as the REST transport
 *
 * Used by the unit and integration tests so the whole engine can be exercised
 * hermetically: objects, prefix/marker/limit listing pagination, and multipart
 * sessions all behave like the remote store, and failure injection lets tests
 * drive the abort paths.
 */

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{
    CompleteBody, Connection, InitiateResult, KeyRecord, ListPage, Method, Request, Response,
};
use crate::error::Result;

const DEFAULT_LIST_LIMIT: usize = 200;

#[derive(Default)]
struct Upload {
    bucket: String,
    key: String,
    parts: BTreeMap<usize, Bytes>,
}

#[derive(Default)]
struct Store {
    // BTreeMap keeps listings sorted, which marker pagination relies on.
    buckets: HashMap<String, BTreeMap<String, Bytes>>,
    uploads: HashMap<String, Upload>,
    next_upload_id: u64,
    aborted_uploads: Vec<String>,
    completed_part_orders: Vec<Vec<usize>>,
    fail_put_substring: Option<String>,
}

/// In-memory [`Connection`] for tests
#[derive(Default)]
pub struct MemoryConnection {
    store: Mutex<Store>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(bucket: &str) -> Self {
        let conn = Self::new();
        conn.store
            .lock()
            .unwrap()
            .buckets
            .insert(bucket.to_string(), BTreeMap::new());
        conn
    }

    /// Make every object/part PUT whose key contains `substring` fail with a
    /// server error. Pass `None` to clear.
    pub fn fail_puts_containing(&self, substring: Option<&str>) {
        self.store.lock().unwrap().fail_put_substring = substring.map(String::from);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.store
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .and_then(|b| b.get(key).cloned())
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.store
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Multipart sessions that were neither completed nor aborted.
    pub fn open_upload_count(&self) -> usize {
        self.store.lock().unwrap().uploads.len()
    }

    pub fn aborted_upload_count(&self) -> usize {
        self.store.lock().unwrap().aborted_uploads.len()
    }

    /// Part numbers from the most recent successful complete call, in the
    /// order the manifest listed them.
    pub fn last_completed_part_numbers(&self) -> Option<Vec<usize>> {
        self.store
            .lock()
            .unwrap()
            .completed_part_orders
            .last()
            .cloned()
    }

    fn put_object(store: &mut Store, request: &Request) -> Response {
        let key = request.key.clone().unwrap_or_default();
        if let Some(pat) = &store.fail_put_substring {
            if key.contains(pat.as_str()) {
                return plain(500);
            }
        }
        let Some(bucket) = store.buckets.get_mut(&request.bucket) else {
            return plain(404);
        };
        let body = request.body.clone().unwrap_or_default();
        bucket.insert(key, body);
        with_etag(201, "memory")
    }

    fn put_part(store: &mut Store, request: &Request) -> Response {
        let upload_id = request.query("upload_id").unwrap_or_default().to_string();
        let Some(part_number) = request
            .query("part_number")
            .and_then(|n| n.parse::<usize>().ok())
        else {
            return plain(400);
        };
        let key = request.key.clone().unwrap_or_default();
        if let Some(pat) = &store.fail_put_substring {
            if key.contains(pat.as_str()) {
                return plain(500);
            }
        }
        let Some(upload) = store.uploads.get_mut(&upload_id) else {
            return plain(404);
        };
        let body = request.body.clone().unwrap_or_default();
        upload.parts.insert(part_number, body);
        with_etag(201, &format!("{}-{}", upload_id, part_number))
    }

    fn list_keys(store: &Store, request: &Request) -> Response {
        let Some(bucket) = store.buckets.get(&request.bucket) else {
            return plain(404);
        };
        let prefix = request.query("prefix").unwrap_or_default();
        let marker = request.query("marker").unwrap_or_default();
        let limit = request
            .query("limit")
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(DEFAULT_LIST_LIMIT);

        let matching: Vec<&String> = bucket
            .keys()
            .filter(|k| k.starts_with(prefix) && k.as_str() > marker)
            .collect();
        let page: Vec<KeyRecord> = matching
            .iter()
            .take(limit)
            .map(|k| KeyRecord {
                key: (*k).clone(),
                size: bucket[*k].len() as u64,
            })
            .collect();
        let has_more = matching.len() > page.len();
        let next_marker = if has_more {
            page.last().map(|r| r.key.clone())
        } else {
            None
        };
        json(
            200,
            &ListPage {
                keys: page,
                next_marker,
                has_more,
            },
        )
    }

    fn get_object(store: &Store, request: &Request) -> Response {
        let key = request.key.as_deref().unwrap_or_default();
        let Some(body) = store
            .buckets
            .get(&request.bucket)
            .and_then(|b| b.get(key))
        else {
            return plain(404);
        };
        // Honor a byte-range header of the form "bytes=start-end" (inclusive).
        let range = request
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("range"))
            .map(|(_, v)| v.as_str());
        match range.and_then(parse_range) {
            Some((start, end)) => {
                let end = (end + 1).min(body.len() as u64);
                if start >= end {
                    return plain(416);
                }
                Response {
                    status: 206,
                    headers: HashMap::new(),
                    body: body.slice(start as usize..end as usize),
                }
            }
            None => Response {
                status: 200,
                headers: HashMap::new(),
                body: body.clone(),
            },
        }
    }

    fn initiate_upload(store: &mut Store, request: &Request) -> Response {
        if !store.buckets.contains_key(&request.bucket) {
            return plain(404);
        }
        store.next_upload_id += 1;
        let upload_id = format!("upload-{}", store.next_upload_id);
        store.uploads.insert(
            upload_id.clone(),
            Upload {
                bucket: request.bucket.clone(),
                key: request.key.clone().unwrap_or_default(),
                parts: BTreeMap::new(),
            },
        );
        json(200, &InitiateResult { upload_id })
    }

    fn complete_upload(store: &mut Store, request: &Request) -> Response {
        let upload_id = request.query("upload_id").unwrap_or_default().to_string();
        let Some(upload) = store.uploads.remove(&upload_id) else {
            return plain(404);
        };
        let Ok(manifest) =
            serde_json::from_slice::<CompleteBody>(request.body.as_deref().unwrap_or_default())
        else {
            return plain(400);
        };
        let mut assembled = Vec::new();
        let mut order = Vec::with_capacity(manifest.object_parts.len());
        for listed in &manifest.object_parts {
            let Some(data) = upload.parts.get(&listed.part_number) else {
                return plain(400);
            };
            assembled.extend_from_slice(data);
            order.push(listed.part_number);
        }
        store.completed_part_orders.push(order);
        if let Some(bucket) = store.buckets.get_mut(&upload.bucket) {
            bucket.insert(upload.key.clone(), Bytes::from(assembled));
        }
        plain(201)
    }

    fn abort_upload(store: &mut Store, request: &Request) -> Response {
        let upload_id = request.query("upload_id").unwrap_or_default().to_string();
        if store.uploads.remove(&upload_id).is_some() {
            store.aborted_uploads.push(upload_id);
            plain(204)
        } else {
            plain(404)
        }
    }

    fn delete(store: &mut Store, request: &Request) -> Response {
        match &request.key {
            Some(key) => {
                let Some(bucket) = store.buckets.get_mut(&request.bucket) else {
                    return plain(404);
                };
                if bucket.remove(key).is_some() {
                    plain(204)
                } else {
                    plain(404)
                }
            }
            None => match store.buckets.get(&request.bucket) {
                Some(objects) if !objects.is_empty() => plain(409),
                Some(_) => {
                    store.buckets.remove(&request.bucket);
                    plain(204)
                }
                None => plain(404),
            },
        }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn make_request(&self, request: Request) -> Result<Response> {
        let mut store = self.store.lock().unwrap();
        let response = match (request.method, request.key.is_some()) {
            (Method::Put, false) => {
                store
                    .buckets
                    .entry(request.bucket.clone())
                    .or_default();
                plain(201)
            }
            (Method::Put, true) if request.query("upload_id").is_some() => {
                Self::put_part(&mut store, &request)
            }
            (Method::Put, true) => Self::put_object(&mut store, &request),
            (Method::Get, false) => Self::list_keys(&store, &request),
            (Method::Get, true) => Self::get_object(&store, &request),
            (Method::Head, false) => {
                if store.buckets.contains_key(&request.bucket) {
                    plain(200)
                } else {
                    plain(404)
                }
            }
            (Method::Head, true) => {
                let key = request.key.as_deref().unwrap_or_default();
                match store.buckets.get(&request.bucket).and_then(|b| b.get(key)) {
                    Some(body) => {
                        let mut resp = plain(200);
                        resp.headers
                            .insert("Content-Length".to_string(), body.len().to_string());
                        resp
                    }
                    None => plain(404),
                }
            }
            (Method::Post, true) if request.query("uploads").is_some() => {
                Self::initiate_upload(&mut store, &request)
            }
            (Method::Post, true) => Self::complete_upload(&mut store, &request),
            (Method::Post, false) => plain(400),
            (Method::Delete, true) if request.query("upload_id").is_some() => {
                Self::abort_upload(&mut store, &request)
            }
            (Method::Delete, _) => Self::delete(&mut store, &request),
        };
        Ok(response)
    }
}

fn parse_range(header: &str) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn plain(status: u16) -> Response {
    Response {
        status,
        headers: HashMap::new(),
        body: Bytes::new(),
    }
}

fn with_etag(status: u16, tag: &str) -> Response {
    let mut headers = HashMap::new();
    headers.insert("ETag".to_string(), format!("\"{}\"", tag));
    Response {
        status,
        headers,
        body: Bytes::new(),
    }
}

fn json<T: serde::Serialize>(status: u16, value: &T) -> Response {
    Response {
        status,
        headers: HashMap::new(),
        body: Bytes::from(serde_json::to_vec(value).expect("wire types serialize")),
    }
}
