use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::Value;

use crate::latency::Cycles;

/// A TOML-backed config section. Missing sections fall back to defaults
/// with a warning, so a partial config file still composes.
pub trait Config: DeserializeOwned + Default {
    const SECTION: &'static str;

    fn from_section(section: Option<&Value>) -> Self {
        match section {
            Some(value) => value
                .clone()
                .try_into()
                .expect("cannot deserialize config section"),
            None => {
                warn!("config section [{}] not found, using defaults", Self::SECTION);
                Self::default()
            }
        }
    }

    fn from_table(table: &toml::Table) -> Self {
        Self::from_section(table.get(Self::SECTION))
    }
}

/// Device-side architectural parameters: leaf core count and the cache
/// geometry of every level the composer builds.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct GpuParams {
    /// Number of leaf clients (shader cores), each with a private L1.
    pub num_cores: usize,
    pub cacheline_bytes: u64,
    pub l1_size: u64,
    pub l1_assoc: u64,
    /// Depth of the per-core request buffer; bounds both sequencer
    /// outstanding requests and L1 TBEs.
    pub l1_buf_depth: usize,
    pub num_l2_shards: usize,
    /// Capacity of one L2 shard, not of the whole level.
    pub l2_size: u64,
    pub l2_assoc: u64,
    pub l2_resource_stalls: bool,
    pub l2_tbes: usize,
    pub pagewalk_cache_size: u64,
    pub pagewalk_cache_assoc: u64,
    pub copy_engine_outstanding: usize,
    pub copy_engine_tbes: usize,
}

impl Config for GpuParams {
    const SECTION: &'static str = "gpu";
}

impl Default for GpuParams {
    fn default() -> Self {
        Self {
            num_cores: 8,
            cacheline_bytes: 128,
            l1_size: 64 * 1024,
            l1_assoc: 4,
            l1_buf_depth: 24,
            num_l2_shards: 4,
            l2_size: 1024 * 1024,
            l2_assoc: 16,
            l2_resource_stalls: false,
            l2_tbes: 256,
            pagewalk_cache_size: 8 * 1024,
            pagewalk_cache_assoc: 16,
            copy_engine_outstanding: 64,
            copy_engine_tbes: 256,
        }
    }
}

/// Interconnect cost constants, all in cache-side cycles. The per-hop and
/// access costs carry the GPU-to-cache cycle ratio explicitly instead of
/// leaving it implied by the clock domains.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct NocParams {
    /// One interconnect hop between the leaf level and the shared level.
    pub per_hop_latency: Cycles,
    /// Shared-L2 array access on the response path.
    pub l2_access_latency: Cycles,
    /// Shared level to backing store, a fixed multi-hop path.
    pub mem_noc_latency: Cycles,
    /// Leaf-level fast-path hit.
    pub l1_hit_latency: Cycles,
    pub l2_hit_latency: Cycles,
    pub pagewalk_response_latency: Cycles,
    pub cluster_int_bw: u32,
    pub cluster_ext_bw: u32,
    pub deadlock_threshold: u64,
}

impl Config for NocParams {
    const SECTION: &'static str = "noc";
}

impl Default for NocParams {
    fn default() -> Self {
        Self {
            per_hop_latency: 45,
            l2_access_latency: 30,
            mem_noc_latency: 125,
            l1_hit_latency: 1,
            l2_hit_latency: 15,
            pagewalk_response_latency: 1,
            cluster_int_bw: 32,
            cluster_ext_bw: 32,
            deadlock_threshold: 2_000_000,
        }
    }
}

/// Shape of the synthesized CPU-side system used when no real machine
/// assembly supplies one.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct HostParams {
    pub num_cpus: usize,
    pub num_directories: usize,
    pub num_dmas: usize,
    pub l1_size: u64,
    pub l1_assoc: u64,
    pub outstanding: usize,
    pub tbes: usize,
}

impl Config for HostParams {
    const SECTION: &'static str = "host";
}

impl Default for HostParams {
    fn default() -> Self {
        Self {
            num_cpus: 1,
            num_directories: 1,
            num_dmas: 0,
            l1_size: 32 * 1024,
            l1_assoc: 8,
            outstanding: 16,
            tbes: 256,
        }
    }
}

/// Everything the composer needs for one build.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposerConfig {
    pub gpu: GpuParams,
    pub noc: NocParams,
}

impl ComposerConfig {
    pub fn from_table(table: &toml::Table) -> Self {
        Self {
            gpu: GpuParams::from_table(table),
            noc: NocParams::from_table(table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let table: toml::Table = toml::from_str("").unwrap();
        let gpu = GpuParams::from_table(&table);
        assert_eq!(gpu.num_cores, 8);
        assert_eq!(gpu.cacheline_bytes, 128);
        let noc = NocParams::from_table(&table);
        assert_eq!(noc.per_hop_latency, 45);
        assert_eq!(noc.mem_noc_latency, 125);
    }

    #[test]
    fn sections_override_field_by_field() {
        let table: toml::Table = toml::from_str(
            r#"
            [gpu]
            num_cores = 16
            num_l2_shards = 8

            [noc]
            per_hop_latency = 10
            "#,
        )
        .unwrap();
        let cfg = ComposerConfig::from_table(&table);
        assert_eq!(cfg.gpu.num_cores, 16);
        assert_eq!(cfg.gpu.num_l2_shards, 8);
        // untouched fields keep their defaults
        assert_eq!(cfg.gpu.l1_size, 64 * 1024);
        assert_eq!(cfg.noc.per_hop_latency, 10);
        assert_eq!(cfg.noc.l2_access_latency, 30);
    }
}
