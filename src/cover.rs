//! Cover data URLs and the bounded cover cache.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Bounded cache mapping a cover path to a previously built data URL.
///
/// Eviction is strictly insertion-ordered: once the cache is full the
/// oldest-inserted entry goes first, and a cache hit does not refresh an
/// entry's position. Re-inserting an existing path updates the value in
/// place without moving it. Entries are never invalidated when the file on
/// disk changes; the cache lives for the process lifetime only.
pub struct CoverCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

struct CacheInner {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl CoverCache {
    /// Default number of cached covers.
    pub const DEFAULT_CAPACITY: usize = 10;

    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
        }
    }

    /// Look up the data URL cached for `path`.
    pub fn get(&self, path: &str) -> Option<String> {
        self.inner.lock().entries.get(path).cloned()
    }

    /// Insert or update the data URL for `path`, evicting the
    /// oldest-inserted entry while over capacity.
    pub fn put(&self, path: &str, data_url: String) {
        let mut inner = self.inner.lock();

        if inner.entries.insert(path.to_string(), data_url).is_none() {
            inner.order.push_back(path.to_string());
        }

        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CoverCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Build a `data:` URL for raw image bytes.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}
