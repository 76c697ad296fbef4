use std::sync::Arc;

use log::debug;

use crate::addr;
use crate::cache::{Cache, CacheParams};
use crate::controller::{
    CacheAttachment, Controller, ControllerKind, ControllerLatency, Sequencer,
};
use crate::error::{ComposeError, ComposeResult};

/// Placeholder geometry for the copy-engine cache, which satisfies the
/// common controller contract but decodes no addresses.
const CE_CACHE_BYTES: u64 = 4096;
const CE_CACHE_ASSOC: u64 = 2;

/// Small fixed arrays the page-walk controller needs besides its data-side
/// cache: a token I-side array and a private backing array.
const PW_STUB_BYTES: u64 = 512;
const PW_STUB_ASSOC: u64 = 2;

/// Parameters shared by every controller of one hierarchy level.
#[derive(Debug, Clone, Copy)]
pub struct LevelParams {
    pub kind: ControllerKind,
    pub cache: CacheParams,
    pub latency: ControllerLatency,
    pub tbe_capacity: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SequencerParams {
    pub max_outstanding: usize,
    pub deadlock_threshold: u64,
    pub supports_inst_fetch: bool,
}

/// Builds the cache, controller and sequencer entities of each hierarchy
/// level. The factory owns the running client index so sequencer versions
/// stay globally unique across levels; each build call is otherwise pure.
#[derive(Debug)]
pub struct ControllerFactory {
    next_client_index: usize,
}

impl ControllerFactory {
    /// `first_client_index` continues the numbering after the last
    /// externally supplied client.
    pub fn new(first_client_index: usize) -> Self {
        Self {
            next_client_index: first_client_index,
        }
    }

    pub fn next_client_index(&self) -> usize {
        self.next_client_index
    }

    fn take_client_index(&mut self) -> usize {
        let version = self.next_client_index;
        self.next_client_index += 1;
        version
    }

    fn check_level(level: &LevelParams, count: usize) -> ComposeResult<()> {
        if count == 0 {
            return Err(ComposeError::InvalidConfig(format!(
                "{:?} level requested with zero controllers",
                level.kind
            )));
        }
        if level.tbe_capacity == 0 {
            return Err(ComposeError::InvalidConfig(format!(
                "{:?} level requested with zero TBEs",
                level.kind
            )));
        }
        Ok(())
    }

    fn sequencer(&mut self, icache: Arc<Cache>, dcache: Arc<Cache>, params: &SequencerParams) -> Sequencer {
        Sequencer {
            version: self.take_client_index(),
            max_outstanding: params.max_outstanding,
            deadlock_threshold: params.deadlock_threshold,
            icache,
            dcache,
            supports_inst_fetch: params.supports_inst_fetch,
            controller: None,
        }
    }

    /// The symmetric per-client leaf level: one unified cache, one
    /// controller and one sequencer per index, returned in index order.
    /// Index order matches the order the assembler later numbers them in.
    pub fn build_leaf_level(
        &mut self,
        level: &LevelParams,
        seq: &SequencerParams,
        count: usize,
        cacheline_bytes: u64,
    ) -> ComposeResult<Vec<(Controller, Sequencer)>> {
        Self::check_level(level, count)?;
        let mut pairs = Vec::with_capacity(count);
        for version in 0..count {
            let cache = Cache::build(&level.cache, cacheline_bytes, 0)?;
            let cntrl = Controller::new(
                level.kind,
                version,
                level.tbe_capacity,
                level.latency,
                CacheAttachment::Unified(Arc::clone(&cache)),
            );
            let seq = self.sequencer(Arc::clone(&cache), cache, seq);
            pairs.push((cntrl, seq));
        }
        debug!(
            "built {} {:?} leaf controllers, client indices now at {}",
            count, level.kind, self.next_client_index
        );
        Ok(pairs)
    }

    /// A shared level split into `count` parallel shards. Each shard's index
    /// field starts above the shard-select bits so the leaf and shard caches
    /// agree on the address decomposition. Shards have no clients of their
    /// own, hence no sequencers.
    pub fn build_shared_level(
        &self,
        level: &LevelParams,
        count: usize,
        cacheline_bytes: u64,
    ) -> ComposeResult<Vec<Controller>> {
        Self::check_level(level, count)?;
        let select_bits = addr::shard_select_bits(count as u64)?;
        let mut shards = Vec::with_capacity(count);
        for version in 0..count {
            let cache = Cache::build(&level.cache, cacheline_bytes, select_bits)?;
            shards.push(Controller::new(
                level.kind,
                version,
                level.tbe_capacity,
                level.latency,
                CacheAttachment::Unified(cache),
            ));
        }
        Ok(shards)
    }

    /// The single shared page-walk controller. It aggregates a data-side
    /// walk cache, a token I-side array and a small private backing array
    /// under one controller; its sequencer reads both roles through the
    /// data-side cache.
    pub fn build_page_walker(
        &mut self,
        level: &LevelParams,
        seq: &SequencerParams,
        cacheline_bytes: u64,
    ) -> ComposeResult<(Controller, Sequencer)> {
        Self::check_level(level, 1)?;
        let dcache = Cache::build(&level.cache, cacheline_bytes, 0)?;
        let stub = CacheParams::sized(PW_STUB_BYTES, PW_STUB_ASSOC);
        let icache = Cache::build(&stub, cacheline_bytes, 0)?;
        let backing = Cache::build(&stub, cacheline_bytes, 0)?;
        let cntrl = Controller::new(
            level.kind,
            0,
            level.tbe_capacity,
            level.latency,
            CacheAttachment::Split {
                icache,
                dcache: Arc::clone(&dcache),
                backing,
            },
        );
        let seq = self.sequencer(Arc::clone(&dcache), dcache, seq);
        Ok((cntrl, seq))
    }

    /// The copy-engine endpoint. Its cache is a placeholder that satisfies
    /// the controller contract; callers must not read meaning into its
    /// fields. The sequencer serves no instruction fetches.
    pub fn build_copy_engine(
        &mut self,
        level: &LevelParams,
        seq: &SequencerParams,
        cacheline_bytes: u64,
    ) -> ComposeResult<(Controller, Sequencer)> {
        Self::check_level(level, 1)?;
        let cache = Cache::build(
            &CacheParams::sized(CE_CACHE_BYTES, CE_CACHE_ASSOC),
            cacheline_bytes,
            0,
        )?;
        let cntrl = Controller::new(
            level.kind,
            0,
            level.tbe_capacity,
            level.latency,
            CacheAttachment::Unified(Arc::clone(&cache)),
        );
        let seq = self.sequencer(
            Arc::clone(&cache),
            cache,
            &SequencerParams {
                supports_inst_fetch: false,
                ..*seq
            },
        );
        Ok((cntrl, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheParams;

    fn leaf_level() -> LevelParams {
        LevelParams {
            kind: ControllerKind::CoreL1,
            cache: CacheParams::sized(64 * 1024, 4),
            latency: ControllerLatency {
                issue: 135,
                response: 0,
                hit: 1,
            },
            tbe_capacity: 24,
        }
    }

    fn shared_level() -> LevelParams {
        LevelParams {
            kind: ControllerKind::SharedL2,
            cache: CacheParams::sized(1024 * 1024, 16),
            latency: ControllerLatency {
                issue: 125,
                response: 165,
                hit: 15,
            },
            tbe_capacity: 256,
        }
    }

    fn seq_params() -> SequencerParams {
        SequencerParams {
            max_outstanding: 24,
            deadlock_threshold: 2_000_000,
            supports_inst_fetch: true,
        }
    }

    #[test]
    fn leaf_level_numbers_clients_after_the_external_prefix() {
        let mut factory = ControllerFactory::new(2);
        let pairs = factory
            .build_leaf_level(&leaf_level(), &seq_params(), 4, 128)
            .unwrap();
        assert_eq!(pairs.len(), 4);
        for (i, (cntrl, seq)) in pairs.iter().enumerate() {
            assert_eq!(cntrl.kind, ControllerKind::CoreL1);
            assert_eq!(cntrl.version, i);
            assert_eq!(cntrl.id, None);
            assert_eq!(seq.version, 2 + i);
            // unified cache: both roles read the same array
            assert!(Arc::ptr_eq(&seq.icache, &seq.dcache));
        }
        assert_eq!(factory.next_client_index(), 6);
    }

    #[test]
    fn shard_index_fields_exclude_the_select_bits() {
        let factory = ControllerFactory::new(0);
        let shards = factory.build_shared_level(&shared_level(), 4, 128).unwrap();
        assert_eq!(shards.len(), 4);
        for (i, shard) in shards.iter().enumerate() {
            assert_eq!(shard.version, i);
            // block offset [0,7), shard select [7,9), index from bit 9
            assert_eq!(shard.caches.data_side().index.start, 9);
            assert!(shard.sequencer.is_none());
        }
    }

    #[test]
    fn page_walker_reads_both_roles_through_the_data_side() {
        let mut factory = ControllerFactory::new(5);
        let level = LevelParams {
            kind: ControllerKind::PageWalker,
            cache: CacheParams::sized(8 * 1024, 16),
            latency: ControllerLatency {
                issue: 135,
                response: 1,
                hit: 1,
            },
            tbe_capacity: 24,
        };
        let (cntrl, seq) = factory
            .build_page_walker(&level, &seq_params(), 128)
            .unwrap();
        assert_eq!(seq.version, 5);
        match &cntrl.caches {
            CacheAttachment::Split { dcache, .. } => {
                assert!(Arc::ptr_eq(dcache, &seq.icache));
                assert!(Arc::ptr_eq(dcache, &seq.dcache));
            }
            other => panic!("expected split attachment, got {:?}", other),
        }
    }

    #[test]
    fn copy_engine_sequencer_skips_instruction_fetches() {
        let mut factory = ControllerFactory::new(0);
        let level = LevelParams {
            kind: ControllerKind::CopyEngine,
            cache: CacheParams::default(),
            latency: ControllerLatency::default(),
            tbe_capacity: 256,
        };
        let (cntrl, seq) = factory
            .build_copy_engine(&level, &seq_params(), 128)
            .unwrap();
        assert_eq!(cntrl.kind, ControllerKind::CopyEngine);
        assert!(!seq.supports_inst_fetch);
    }

    #[test]
    fn zero_counts_and_zero_tbes_are_rejected() {
        let mut factory = ControllerFactory::new(0);
        assert!(factory
            .build_leaf_level(&leaf_level(), &seq_params(), 0, 128)
            .is_err());
        let mut bad = leaf_level();
        bad.tbe_capacity = 0;
        assert!(factory
            .build_leaf_level(&bad, &seq_params(), 2, 128)
            .is_err());
        assert!(factory.build_shared_level(&shared_level(), 0, 128).is_err());
    }
}
