//! Cache statistics

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// Entries dropped because their HMAC did not verify
    pub signature_failures: u64,
    pub serialization_errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "hits: {}, misses: {}, hit rate: {:.1}%, sets: {}, signature failures: {}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.sets,
            self.signature_failures
        )
    }
}
