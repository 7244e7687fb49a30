use std::collections::HashMap;
use std::fmt;

/// Handle to an in-memory image, valid until revoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Registry of live blob URLs.
///
/// Every URL handed out must be passed back to [`BlobStore::revoke`] exactly
/// once; the counters make leaks and double frees visible.
#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: HashMap<BlobUrl, Blob>,
    created: u64,
    revoked: u64,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, bytes: Vec<u8>, mime: &str) -> BlobUrl {
        let url = BlobUrl(format!("blob:poll-filter/{}", uuid::Uuid::new_v4()));
        log::debug!("Created {url} ({} bytes, {mime})", bytes.len());
        self.blobs.insert(
            url.clone(),
            Blob {
                bytes,
                mime: mime.to_string(),
            },
        );
        self.created += 1;
        url
    }

    /// Release a URL. Returns false if it was unknown or already revoked.
    pub fn revoke(&mut self, url: &BlobUrl) -> bool {
        if self.blobs.remove(url).is_some() {
            self.revoked += 1;
            log::debug!("Revoked {url}");
            true
        } else {
            log::warn!("Revoke of unknown blob {url}");
            false
        }
    }

    pub fn get(&self, url: &BlobUrl) -> Option<&Blob> {
        self.blobs.get(url)
    }

    pub fn live(&self) -> usize {
        self.blobs.len()
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn revoked(&self) -> u64 {
        self.revoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoke_is_counted_once() {
        let mut store = BlobStore::new();
        let url = store.create(vec![1, 2, 3], "image/png");
        assert_eq!(store.live(), 1);
        assert_eq!(store.get(&url).unwrap().mime, "image/png");

        assert!(store.revoke(&url));
        assert!(!store.revoke(&url));
        assert_eq!(store.revoked(), 1);
        assert_eq!(store.live(), 0);
        assert!(store.get(&url).is_none());
    }

    #[test]
    fn urls_are_unique() {
        let mut store = BlobStore::new();
        let a = store.create(Vec::new(), "image/jpeg");
        let b = store.create(Vec::new(), "image/jpeg");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("blob:"));
        assert_eq!(store.created(), 2);
    }
}
