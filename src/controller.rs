use std::sync::Arc;

use crate::cache::Cache;
use crate::latency::Cycles;

/// Globally unique controller id, assigned once during assembly and unique
/// across every controller kind in the topology.
pub type CntrlId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Per-core device-side L1, one per leaf client.
    CoreL1,
    /// One shard of the shared device L2.
    SharedL2,
    /// Shared page-walk controller serving MMU traffic.
    PageWalker,
    /// Copy-engine endpoint; its cache is a placeholder.
    CopyEngine,
    /// CPU-side controller supplied by the external collaborator.
    CpuCore,
    Directory,
    Dma,
}

/// Signaling latencies of one controller, all in the same abstract cycle
/// unit the interconnect model uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ControllerLatency {
    /// Issue path toward the next level.
    pub issue: Cycles,
    /// Response path back from the next level.
    pub response: Cycles,
    /// Local hit, seen only by the fast path.
    pub hit: Cycles,
}

/// The cache arrays a controller fronts. Most kinds use a single unified
/// array; the page walker aggregates split I/D arrays plus a small private
/// backing array under one controller.
#[derive(Debug, Clone)]
pub enum CacheAttachment {
    Unified(Arc<Cache>),
    Split {
        icache: Arc<Cache>,
        dcache: Arc<Cache>,
        backing: Arc<Cache>,
    },
}

impl CacheAttachment {
    /// The array used for data-side address decoding.
    pub fn data_side(&self) -> &Arc<Cache> {
        match self {
            CacheAttachment::Unified(cache) => cache,
            CacheAttachment::Split { dcache, .. } => dcache,
        }
    }
}

/// The addressable coherence-protocol unit for one cache or DMA endpoint.
/// The protocol transition logic itself lives elsewhere; the composer only
/// carries the unit's identity, capacity and latency parameters.
///
/// `version` numbers controllers within their own kind; `id` is the global
/// namespace. Keeping the two in separate fields avoids the cross-kind
/// collisions an overloaded field invites when assembly order changes.
#[derive(Debug, Clone)]
pub struct Controller {
    pub kind: ControllerKind,
    pub version: usize,
    /// `None` until the assembler runs; external controllers arrive with
    /// their final id already set.
    pub id: Option<CntrlId>,
    /// Bound on concurrently in-flight coherence transactions.
    pub tbe_capacity: usize,
    pub latency: ControllerLatency,
    pub caches: CacheAttachment,
    /// Position of the owned sequencer in the topology's sequencer list,
    /// wired during assembly. Shared levels have none.
    pub sequencer: Option<usize>,
}

impl Controller {
    pub fn new(
        kind: ControllerKind,
        version: usize,
        tbe_capacity: usize,
        latency: ControllerLatency,
        caches: CacheAttachment,
    ) -> Self {
        Self {
            kind,
            version,
            id: None,
            tbe_capacity,
            latency,
            caches,
            sequencer: None,
        }
    }
}

/// Per-client request-issuing endpoint. Owned by exactly one controller;
/// `controller` is the non-owning back-reference, filled in once the owning
/// controller's global id exists.
#[derive(Debug, Clone)]
pub struct Sequencer {
    /// Client index, unique across the whole system. External clients come
    /// first; device-side clients continue the numbering.
    pub version: usize,
    pub max_outstanding: usize,
    pub deadlock_threshold: u64,
    pub icache: Arc<Cache>,
    pub dcache: Arc<Cache>,
    pub supports_inst_fetch: bool,
    pub controller: Option<CntrlId>,
}
