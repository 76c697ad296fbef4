use std::sync::Arc;

use serde::Deserialize;

use crate::addr::{self, IndexBits};
use crate::error::ComposeResult;
use crate::latency::Cycles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementPolicy {
    Lru,
}

/// Geometry and access parameters for one cache array, before the address
/// partitioning has been resolved.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CacheParams {
    pub size_bytes: u64,
    pub assoc: u64,
    pub data_banks: u32,
    pub tag_banks: u32,
    pub data_access_latency: Cycles,
    pub tag_access_latency: Cycles,
    pub resource_stalls: bool,
}

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            size_bytes: 64 * 1024,
            assoc: 4,
            data_banks: 4,
            tag_banks: 4,
            data_access_latency: 4,
            tag_access_latency: 4,
            resource_stalls: false,
        }
    }
}

impl CacheParams {
    pub fn sized(size_bytes: u64, assoc: u64) -> Self {
        Self {
            size_bytes,
            assoc,
            ..Self::default()
        }
    }
}

/// One cache array with its resolved set-index bit range. Immutable once
/// built; a controller owns it and shares it with its sequencer via `Arc`.
#[derive(Debug, Clone)]
pub struct Cache {
    pub size_bytes: u64,
    pub assoc: u64,
    pub index: IndexBits,
    pub data_banks: u32,
    pub tag_banks: u32,
    pub data_access_latency: Cycles,
    pub tag_access_latency: Cycles,
    pub replacement: ReplacementPolicy,
    pub resource_stalls: bool,
}

impl Cache {
    /// Builds a cache whose index field starts `select_bits` above the block
    /// offset. `select_bits = 0` for unsharded caches; a sharded level passes
    /// the width of its shard-select field so the two levels agree on the
    /// address decomposition.
    pub fn build(
        params: &CacheParams,
        cacheline_bytes: u64,
        select_bits: u32,
    ) -> ComposeResult<Arc<Self>> {
        let sets = addr::num_sets(params.size_bytes, params.assoc, cacheline_bytes)?;
        let base = addr::index_bits(cacheline_bytes, sets)?;
        Ok(Arc::new(Self {
            size_bytes: params.size_bytes,
            assoc: params.assoc,
            index: IndexBits {
                start: base.start + select_bits,
                width: base.width,
            },
            data_banks: params.data_banks,
            tag_banks: params.tag_banks,
            data_access_latency: params.data_access_latency,
            tag_access_latency: params.tag_access_latency,
            replacement: ReplacementPolicy::Lru,
            resource_stalls: params.resource_stalls,
        }))
    }

    pub fn num_sets(&self) -> u64 {
        self.index.num_sets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_resolves_index_range_from_geometry() {
        // 64kB, 4-way, 128B lines -> 128 sets starting at bit 7.
        let cache = Cache::build(&CacheParams::sized(64 * 1024, 4), 128, 0).unwrap();
        assert_eq!(cache.num_sets(), 128);
        assert_eq!(cache.index.start, 7);
        assert_eq!(cache.index.width, 7);
        assert_eq!(cache.replacement, ReplacementPolicy::Lru);
    }

    #[test]
    fn select_bits_offset_the_index_start() {
        let flat = Cache::build(&CacheParams::sized(256 * 1024, 16), 128, 0).unwrap();
        let sharded = Cache::build(&CacheParams::sized(256 * 1024, 16), 128, 2).unwrap();
        assert_eq!(sharded.index.start, flat.index.start + 2);
        assert_eq!(sharded.index.width, flat.index.width);
    }

    #[test]
    fn bad_geometry_fails_before_construction() {
        assert!(Cache::build(&CacheParams::sized(0, 4), 128, 0).is_err());
        assert!(Cache::build(&CacheParams::sized(64 * 1024, 4), 96, 0).is_err());
    }
}
