use crate::error::{ComposeError, ComposeResult};

/// The contiguous bit field of a physical address that a cache uses for
/// set-index decoding. A physical address decomposes, from bit 0 upward,
/// into block-offset bits, optional shard-select bits, the per-cache index
/// field described here, and tag bits above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IndexBits {
    pub start: u32,
    pub width: u32,
}

impl IndexBits {
    pub fn end(&self) -> u32 {
        self.start + self.width
    }

    pub fn num_sets(&self) -> u64 {
        1u64 << self.width
    }
}

fn log2_exact(what: &str, value: u64) -> ComposeResult<u32> {
    if value == 0 || !value.is_power_of_two() {
        return Err(ComposeError::InvalidConfig(format!(
            "{} must be a non-zero power of two, got {}",
            what, value
        )));
    }
    Ok(value.trailing_zeros())
}

/// Width of the block-offset field for a given cacheline size.
pub fn block_offset_bits(cacheline_bytes: u64) -> ComposeResult<u32> {
    log2_exact("cacheline size", cacheline_bytes)
}

/// Index field for an unsharded cache: it begins immediately above the
/// block-offset bits.
pub fn index_bits(cacheline_bytes: u64, num_sets: u64) -> ComposeResult<IndexBits> {
    Ok(IndexBits {
        start: block_offset_bits(cacheline_bytes)?,
        width: log2_exact("set count", num_sets)?,
    })
}

/// Width of the shard-select field routing between `num_shards` parallel
/// shards of one level.
pub fn shard_select_bits(num_shards: u64) -> ComposeResult<u32> {
    log2_exact("shard count", num_shards)
}

/// Index field for one shard of a sharded level. The shard-select bits sit
/// directly above the block offset and are consumed by the routing decision
/// before the shard sees the address, so the per-shard index begins above
/// them.
pub fn sharded_index_bits(
    cacheline_bytes: u64,
    num_shards: u64,
    sets_per_shard: u64,
) -> ComposeResult<IndexBits> {
    let select = shard_select_bits(num_shards)?;
    let base = index_bits(cacheline_bytes, sets_per_shard)?;
    Ok(IndexBits {
        start: base.start + select,
        width: base.width,
    })
}

/// Set count implied by a cache's capacity, associativity and line size.
pub fn num_sets(size_bytes: u64, assoc: u64, cacheline_bytes: u64) -> ComposeResult<u64> {
    if assoc == 0 || cacheline_bytes == 0 {
        return Err(ComposeError::InvalidConfig(format!(
            "cache geometry {}B/{}-way/{}B-line has a zero field",
            size_bytes, assoc, cacheline_bytes
        )));
    }
    let way_bytes = assoc * cacheline_bytes;
    if size_bytes == 0 || size_bytes % way_bytes != 0 {
        return Err(ComposeError::InvalidConfig(format!(
            "cache size {}B is not a multiple of {} ways x {}B lines",
            size_bytes, assoc, cacheline_bytes
        )));
    }
    let sets = size_bytes / way_bytes;
    if !sets.is_power_of_two() {
        return Err(ComposeError::InvalidConfig(format!(
            "cache size {}B yields {} sets, which is not a power of two",
            size_bytes, sets
        )));
    }
    Ok(sets)
}
