//! Front door of the composer: turns one [`ComposerConfig`] plus an
//! externally built CPU-side system into a finished [`Topology`]. One pass
//! of pure construction; a failed build returns an error before any partial
//! structure escapes.

use log::info;

use crate::assemble::{assemble, DeviceLevels, Topology};
use crate::cache::CacheParams;
use crate::cluster::ClusterBandwidth;
use crate::config::ComposerConfig;
use crate::controller::{ControllerKind, ControllerLatency};
use crate::error::{ComposeError, ComposeResult};
use crate::factory::{ControllerFactory, LevelParams, SequencerParams};
use crate::integrate::ExternalSystem;
use crate::latency::{dance_hall_hops, noc_latency, round_trip};

/// Access latency of the page-walk cache arrays; slower than the streaming
/// L1/L2 arrays.
const PW_CACHE_ACCESS_LATENCY: u64 = 8;

pub fn compose(config: &ComposerConfig, external: ExternalSystem) -> ComposeResult<Topology> {
    let gpu = &config.gpu;
    let noc = &config.noc;
    if gpu.num_cores == 0 {
        return Err(ComposeError::InvalidConfig(
            "gpu.num_cores must be at least 1".into(),
        ));
    }

    // The leaf level and the shared level sit across a dance-hall
    // interconnect whose hop count follows the leaf client count. The same
    // crossing cost applies on the issue and the return path.
    let hops = dance_hall_hops(gpu.num_cores);
    let leaf_noc = noc_latency(noc.per_hop_latency, hops);

    let leaf = LevelParams {
        kind: ControllerKind::CoreL1,
        cache: CacheParams {
            size_bytes: gpu.l1_size,
            assoc: gpu.l1_assoc,
            ..CacheParams::default()
        },
        latency: ControllerLatency {
            issue: leaf_noc,
            response: 0,
            hit: noc.l1_hit_latency,
        },
        tbe_capacity: gpu.l1_buf_depth,
    };
    let shared = LevelParams {
        kind: ControllerKind::SharedL2,
        cache: CacheParams {
            size_bytes: gpu.l2_size,
            assoc: gpu.l2_assoc,
            resource_stalls: gpu.l2_resource_stalls,
            ..CacheParams::default()
        },
        latency: ControllerLatency {
            issue: noc.mem_noc_latency,
            response: round_trip(noc.l2_access_latency, noc.per_hop_latency, hops),
            hit: noc.l2_hit_latency,
        },
        tbe_capacity: gpu.l2_tbes,
    };
    let page_walker = LevelParams {
        kind: ControllerKind::PageWalker,
        cache: CacheParams {
            size_bytes: gpu.pagewalk_cache_size,
            assoc: gpu.pagewalk_cache_assoc,
            data_access_latency: PW_CACHE_ACCESS_LATENCY,
            tag_access_latency: PW_CACHE_ACCESS_LATENCY,
            ..CacheParams::default()
        },
        latency: ControllerLatency {
            issue: leaf_noc,
            response: noc.pagewalk_response_latency,
            hit: noc.pagewalk_response_latency,
        },
        tbe_capacity: gpu.l1_buf_depth,
    };
    let copy_engine = LevelParams {
        kind: ControllerKind::CopyEngine,
        cache: CacheParams::default(),
        latency: ControllerLatency::default(),
        tbe_capacity: gpu.copy_engine_tbes,
    };

    let seq = SequencerParams {
        max_outstanding: gpu.l1_buf_depth,
        deadlock_threshold: noc.deadlock_threshold,
        supports_inst_fetch: true,
    };
    let ce_seq = SequencerParams {
        max_outstanding: gpu.copy_engine_outstanding,
        ..seq
    };

    info!(
        "composing device hierarchy: {} cores, {} L2 shards, {} hops x {} cycles",
        gpu.num_cores, gpu.num_l2_shards, hops, noc.per_hop_latency
    );

    let mut factory = ControllerFactory::new(external.num_clients());
    let device = DeviceLevels {
        leaves: factory.build_leaf_level(&leaf, &seq, gpu.num_cores, gpu.cacheline_bytes)?,
        page_walker: Some(factory.build_page_walker(&page_walker, &seq, gpu.cacheline_bytes)?),
        copy_engine: Some(factory.build_copy_engine(&copy_engine, &ce_seq, gpu.cacheline_bytes)?),
        shared: factory.build_shared_level(&shared, gpu.num_l2_shards, gpu.cacheline_bytes)?,
    };

    assemble(
        external,
        device,
        ClusterBandwidth {
            internal: noc.cluster_int_bw,
            external: noc.cluster_ext_bw,
        },
    )
}
