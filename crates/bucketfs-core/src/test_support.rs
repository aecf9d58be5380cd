//! In-memory [`ObjectStore`] for unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use bucketfs_client::{
    ClientError, ListOptions, MetadataMap, ObjectListResponse, ObjectMetadataResponse,
    ObjectStore, RequestBody, Response,
};
use bucketfs_xml::{CommonPrefix, ListBucketResult, ObjectEntry};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Flat key space with S3 listing semantics and call counters.
#[derive(Debug, Default)]
pub(crate) struct MemoryObjectStore {
    pub objects: Mutex<BTreeMap<String, StoredObject>>,
    pub metadata_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub bucket_calls: AtomicUsize,
    /// Latency added to metadata lookups.
    pub metadata_delay: Option<Duration>,
    /// Latency added to each listing page.
    pub list_delay: Option<Duration>,
    /// Server-side cap on page size.
    pub max_page: Option<usize>,
    /// Make bucket operations fail.
    pub fail_buckets: bool,
}

fn ok() -> Response {
    Response {
        status: StatusCode::OK,
        amz_id_2: None,
        request_id: None,
    }
}

fn not_found(key: &str) -> ClientError {
    ClientError::Http {
        status: StatusCode::NOT_FOUND,
        message: format!("<Error><Code>NoSuchKey</Code><Key>{key}</Key></Error>"),
        code: Some("NoSuchKey".to_owned()),
        request_id: None,
        headers: HeaderMap::new(),
    }
}

enum Item {
    Key(String, u64),
    Prefix(String),
}

impl MemoryObjectStore {
    pub fn with_objects(keys: &[&str]) -> Self {
        let store = Self::default();
        for key in keys {
            store.insert(key, "data");
        }
        store
    }

    pub fn insert(&self, key: &str, body: &str) {
        self.objects.lock().insert(
            key.to_owned(),
            StoredObject {
                body: Bytes::from(body.to_owned()),
                content_type: None,
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().get(key).cloned()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn create_bucket(&self, _bucket: &str) -> Result<Response, ClientError> {
        self.bucket_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_buckets {
            return Err(ClientError::Transport("connection refused".to_owned()));
        }
        Ok(ok())
    }

    fn delete_bucket(&self, _bucket: &str) -> Result<Response, ClientError> {
        Ok(ok())
    }

    fn bucket_exists(&self, _bucket: &str) -> Result<bool, ClientError> {
        self.bucket_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_buckets {
            return Err(ClientError::Transport("connection refused".to_owned()));
        }
        Ok(false)
    }

    fn list_bucket(
        &self,
        bucket: &str,
        options: ListOptions<'_>,
    ) -> Result<ObjectListResponse, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            thread::sleep(delay);
        }
        let prefix = options.prefix.unwrap_or("");
        let marker = options.marker.unwrap_or("");
        let limit = options
            .max_keys
            .map_or(usize::MAX, |n| n as usize)
            .min(self.max_page.unwrap_or(usize::MAX));

        let mut items: Vec<Item> = Vec::new();
        for (key, object) in self.objects.lock().iter() {
            if !key.starts_with(prefix) || key.as_str() <= marker {
                continue;
            }
            let rolled = options.delimiter.and_then(|d| {
                key[prefix.len()..]
                    .find(d)
                    .map(|idx| key[..prefix.len() + idx + d.len()].to_owned())
            });
            match rolled {
                Some(p) if p.as_str() <= marker => {}
                Some(p) => {
                    if !matches!(items.last(), Some(Item::Prefix(last)) if *last == p) {
                        items.push(Item::Prefix(p));
                    }
                }
                None => items.push(Item::Key(key.clone(), object.body.len() as u64)),
            }
        }

        let is_truncated = items.len() > limit;
        items.truncate(limit);

        let mut result = ListBucketResult {
            name: bucket.to_owned(),
            prefix: prefix.to_owned(),
            marker: marker.to_owned(),
            delimiter: options.delimiter.map(ToOwned::to_owned),
            is_truncated,
            ..ListBucketResult::default()
        };
        for item in items {
            match item {
                Item::Key(key, size) => result.contents.push(ObjectEntry {
                    key,
                    size,
                    ..ObjectEntry::default()
                }),
                Item::Prefix(prefix) => result.common_prefixes.push(CommonPrefix { prefix }),
            }
        }

        Ok(ObjectListResponse {
            response: ok(),
            result,
        })
    }

    fn put(
        &self,
        _bucket: &str,
        key: &str,
        _metadata: &[(&str, &str)],
        content: RequestBody,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let content_type = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| (*value).to_owned());
        let body = content.into_bytes()?;
        self.objects
            .lock()
            .insert(key.to_owned(), StoredObject { body, content_type });
        Ok(ok())
    }

    fn get_metadata(&self, _bucket: &str, key: &str) -> Option<ObjectMetadataResponse> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.metadata_delay {
            thread::sleep(delay);
        }
        let object = self.object(key)?;
        Some(ObjectMetadataResponse {
            response: ok(),
            last_modified: None,
            content_type: object.content_type,
            content_length: object.body.len() as u64,
            metadata: MetadataMap::default(),
        })
    }

    fn get_content(&self, _bucket: &str, key: &str) -> Result<Bytes, ClientError> {
        self.object(key).map(|o| o.body).ok_or_else(|| not_found(key))
    }

    fn delete(&self, _bucket: &str, key: &str) -> Result<Response, ClientError> {
        self.objects.lock().remove(key);
        Ok(ok())
    }

    fn direct_url(&self, bucket: &str, key: &str, expires_in: Duration) -> String {
        format!(
            "https://objects.test/{bucket}/{key}?expires={}",
            expires_in.as_secs()
        )
    }
}
