//! Generic single-key-space TTL cache
//!
//! Every external catalog lookup goes through one of these to respect rate
//! limits and amortize cost. The lock protects the entry table only, never a
//! fetch in flight: two callers racing the same cold key will both execute
//! their fetch, and the write path double-checks so the later result does not
//! clobber a fresher entry. That duplicate fetch is an accepted limitation,
//! traded for never holding a lock across a network call.

use crate::ResolverResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct CacheEntry<T> {
	value: T,
	fetched_at: Instant,
}

/// String-keyed in-memory cache with a per-cache TTL.
pub struct TtlCache<T> {
	entries: RwLock<HashMap<String, CacheEntry<T>>>,
	ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
	pub fn new(ttl: Duration) -> Self {
		Self {
			entries: RwLock::new(HashMap::new()),
			ttl,
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	fn get_live(&self, key: &str) -> Option<T> {
		let entries = self.entries.read().expect("cache lock poisoned");
		entries
			.get(key)
			.filter(|e| e.fetched_at.elapsed() < self.ttl)
			.map(|e| e.value.clone())
	}

	/// Pre-populates an entry, primarily for test fixtures.
	pub fn seed(&self, key: impl Into<String>, value: T) {
		let mut entries = self.entries.write().expect("cache lock poisoned");
		entries.insert(
			key.into(),
			CacheEntry { value, fetched_at: Instant::now() },
		);
	}

	/// Returns the live cached value for `key`, or runs `fetch` and caches
	/// its result. A failed or cancelled fetch caches nothing and leaves any
	/// previous entry untouched.
	pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> ResolverResult<T>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = ResolverResult<T>>,
	{
		if let Some(value) = self.get_live(key) {
			return Ok(value);
		}

		let value = fetch().await?;

		let mut entries = self.entries.write().expect("cache lock poisoned");
		// A concurrent fetch may have landed first; keep the fresher entry.
		if let Some(existing) = entries.get(key) {
			if existing.fetched_at.elapsed() < self.ttl {
				return Ok(existing.value.clone());
			}
		}
		entries.insert(
			key.to_string(),
			CacheEntry { value: value.clone(), fetched_at: Instant::now() },
		);
		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ResolverError;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[tokio::test]
	async fn live_entry_skips_fetch() {
		let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
		let calls = AtomicUsize::new(0);

		let fetch = || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Ok(7)
		};
		assert_eq!(cache.get_or_fetch("k", fetch).await.unwrap(), 7);

		let fetch = || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Ok(8)
		};
		assert_eq!(cache.get_or_fetch("k", fetch).await.unwrap(), 7);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn expired_entry_refetches() {
		let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(20));
		cache.seed("k", 1);
		tokio::time::sleep(Duration::from_millis(40)).await;

		let value = cache.get_or_fetch("k", || async { Ok(2) }).await.unwrap();
		assert_eq!(value, 2);
	}

	#[tokio::test]
	async fn failed_fetch_is_not_cached() {
		let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(20));
		cache.seed("k", 1);
		tokio::time::sleep(Duration::from_millis(40)).await;

		let err = cache
			.get_or_fetch("k", || async {
				Err::<u32, _>(ResolverError::invalid_response("boom"))
			})
			.await;
		assert!(err.is_err());

		// the next successful fetch populates normally
		let value = cache.get_or_fetch("k", || async { Ok(3) }).await.unwrap();
		assert_eq!(value, 3);
	}

	#[tokio::test]
	async fn distinct_keys_fetch_independently() {
		let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
		assert_eq!(cache.get_or_fetch("a", || async { Ok(1) }).await.unwrap(), 1);
		assert_eq!(cache.get_or_fetch("b", || async { Ok(2) }).await.unwrap(), 2);
		assert_eq!(cache.get_or_fetch("a", || async { Ok(9) }).await.unwrap(), 1);
	}
}
