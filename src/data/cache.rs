use std::time::{Duration, Instant};

use anyhow::Result;

use super::model::CustomerTable;

/// Freshness window for a fetched table.
pub const FETCH_TTL: Duration = Duration::from_secs(600);

/// Read-through cache for the fetched table, owned by the calling layer.
/// The filter engine has no awareness of it; it only ever sees the table.
#[derive(Debug)]
pub struct CachedTable {
    ttl: Duration,
    entry: Option<(Instant, CustomerTable)>,
}

impl Default for CachedTable {
    fn default() -> Self {
        Self::new(FETCH_TTL)
    }
}

impl CachedTable {
    pub fn new(ttl: Duration) -> Self {
        CachedTable { ttl, entry: None }
    }

    /// Return the cached table, fetching through `fetch` when the entry is
    /// missing or older than the TTL. A failed fetch returns the error and
    /// keeps the previous entry internally; the next read simply retries.
    pub fn get_or_fetch<F>(&mut self, fetch: F) -> Result<&CustomerTable>
    where
        F: FnOnce() -> Result<CustomerTable>,
    {
        self.get_or_fetch_at(Instant::now(), fetch)
    }

    fn get_or_fetch_at<F>(&mut self, now: Instant, fetch: F) -> Result<&CustomerTable>
    where
        F: FnOnce() -> Result<CustomerTable>,
    {
        if !self.is_fresh_at(now) {
            let table = fetch()?;
            log::debug!("table cache refreshed: {} rows", table.len());
            self.entry = Some((now, table));
        }
        // The branch above guarantees an entry on the success path.
        match &self.entry {
            Some((_, table)) => Ok(table),
            None => unreachable!("cache entry populated on fetch"),
        }
    }

    /// Whether a cached entry exists and is within its freshness window.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    fn is_fresh_at(&self, now: Instant) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|(at, _)| now.duration_since(*at) < self.ttl)
    }

    /// Drop the cached entry so the next read re-fetches.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, CustomerTable};

    fn table(tag: i64) -> CustomerTable {
        let row = [("tag".to_string(), CellValue::Integer(tag))]
            .into_iter()
            .collect();
        CustomerTable::new(vec!["tag".into()], vec![row])
    }

    #[test]
    fn second_read_within_ttl_does_not_refetch() {
        let mut cache = CachedTable::new(Duration::from_secs(600));
        let t0 = Instant::now();

        let first = cache.get_or_fetch_at(t0, || Ok(table(1))).unwrap().clone();
        let second = cache
            .get_or_fetch_at(t0 + Duration::from_secs(599), || {
                panic!("must not refetch inside the freshness window")
            })
            .unwrap()
            .clone();
        assert_eq!(first, second);
    }

    #[test]
    fn stale_entry_refetches() {
        let mut cache = CachedTable::new(Duration::from_secs(600));
        let t0 = Instant::now();

        cache.get_or_fetch_at(t0, || Ok(table(1))).unwrap();
        let refreshed = cache
            .get_or_fetch_at(t0 + Duration::from_secs(600), || Ok(table(2)))
            .unwrap();
        assert_eq!(*refreshed.value(0, "tag"), CellValue::Integer(2));
    }

    #[test]
    fn failed_refresh_surfaces_the_error_and_retries() {
        let mut cache = CachedTable::new(Duration::from_secs(1));
        let t0 = Instant::now();

        cache.get_or_fetch_at(t0, || Ok(table(1))).unwrap();
        let err = cache
            .get_or_fetch_at(t0 + Duration::from_secs(5), || {
                Err(anyhow::anyhow!("connection refused"))
            })
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));

        // The next read retries the fetch and succeeds.
        let refreshed = cache
            .get_or_fetch_at(t0 + Duration::from_secs(6), || Ok(table(2)))
            .unwrap();
        assert_eq!(*refreshed.value(0, "tag"), CellValue::Integer(2));
    }

    #[test]
    fn invalidate_forces_a_refetch() {
        let mut cache = CachedTable::new(Duration::from_secs(600));
        let t0 = Instant::now();

        cache.get_or_fetch_at(t0, || Ok(table(1))).unwrap();
        cache.invalidate();
        assert!(!cache.is_fresh());
        let fresh = cache.get_or_fetch_at(t0, || Ok(table(3))).unwrap();
        assert_eq!(*fresh.value(0, "tag"), CellValue::Integer(3));
    }
}
