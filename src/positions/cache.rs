use alloy::primitives::Address;
use chrono::Utc;
use dashmap::DashMap;

use crate::model::Position;

/// Default position cache TTL in seconds.
const DEFAULT_TTL_SECS: i64 = 120;

/// In-process TTL store for position reads.
///
/// Writers replace the full value under a key, readers tolerate staleness
/// up to the TTL; no further locking is needed. Allowances are never
/// cached — only position unions pass through here.
pub struct PositionCache {
    entries: DashMap<String, CacheEntry>,
    ttl_secs: i64,
}

struct CacheEntry {
    expires_at_ms: i64,
    positions: Vec<Position>,
}

impl PositionCache {
    pub fn new(ttl_secs: i64) -> Self {
        PositionCache {
            entries: DashMap::new(),
            ttl_secs,
        }
    }

    /// Cache key: wallet plus the sorted chain set, so `[1, 10]` and
    /// `[10, 1]` share an entry.
    pub fn key(wallet: Address, chains: &[u64]) -> String {
        let mut sorted = chains.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let chains: Vec<String> = sorted.iter().map(|c| c.to_string()).collect();
        format!("{wallet}:{}", chains.join(","))
    }

    pub fn get(&self, key: &str) -> Option<Vec<Position>> {
        let entry = self.entries.get(key)?;
        if Utc::now().timestamp_millis() >= entry.expires_at_ms {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.positions.clone())
    }

    pub fn set(&self, key: String, positions: Vec<Position>) {
        self.entries.insert(
            key,
            CacheEntry {
                expires_at_ms: Utc::now().timestamp_millis() + self.ttl_secs * 1000,
                positions,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl Default for PositionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}
