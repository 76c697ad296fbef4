use std::sync::Arc;

use crate::cache::{Cache, CacheParams};
use crate::config::HostParams;
use crate::controller::{
    CacheAttachment, Controller, ControllerKind, ControllerLatency, Sequencer,
};
use crate::error::ComposeResult;

/// Deadlock threshold of the synthesized CPU-side sequencers; device-side
/// sequencers carry their own, much larger, threshold.
const HOST_DEADLOCK_THRESHOLD: u64 = 500_000;

/// The contract with the machine-assembly collaborator: everything the CPU
/// side already built, handed over as data. CPU controllers arrive with
/// their global ids final; directory and DMA controllers are renumbered by
/// the assembler. The sequencer list order is preserved verbatim as the
/// prefix of the merged topology's client ordering.
#[derive(Debug)]
pub struct ExternalSystem {
    pub sequencers: Vec<Sequencer>,
    pub cpu_controllers: Vec<Controller>,
    pub directories: Vec<Controller>,
    pub dmas: Vec<Controller>,
}

impl ExternalSystem {
    pub fn empty() -> Self {
        Self {
            sequencers: Vec::new(),
            cpu_controllers: Vec::new(),
            directories: Vec::new(),
            dmas: Vec::new(),
        }
    }

    pub fn num_clients(&self) -> usize {
        self.sequencers.len()
    }
}

/// Fabricates a CPU-side system of the shape the real machine assembly
/// would deliver: one L1 controller and sequencer per CPU with final ids
/// `0..num_cpus`, plus unnumbered directory and DMA controllers. Lets the
/// binary and tests exercise the merge without the real collaborator.
pub fn synthesize_host(params: &HostParams, cacheline_bytes: u64) -> ComposeResult<ExternalSystem> {
    let mut sequencers = Vec::with_capacity(params.num_cpus);
    let mut cpu_controllers = Vec::with_capacity(params.num_cpus);
    for version in 0..params.num_cpus {
        let cache = Cache::build(
            &CacheParams::sized(params.l1_size, params.l1_assoc),
            cacheline_bytes,
            0,
        )?;
        let mut cntrl = Controller::new(
            ControllerKind::CpuCore,
            version,
            params.tbes,
            ControllerLatency {
                issue: 0,
                response: 0,
                hit: 1,
            },
            CacheAttachment::Unified(Arc::clone(&cache)),
        );
        cntrl.id = Some(version);
        cntrl.sequencer = Some(version);
        sequencers.push(Sequencer {
            version,
            max_outstanding: params.outstanding,
            deadlock_threshold: HOST_DEADLOCK_THRESHOLD,
            icache: Arc::clone(&cache),
            dcache: cache,
            supports_inst_fetch: true,
            controller: Some(version),
        });
        cpu_controllers.push(cntrl);
    }

    let stub = |kind, version| -> ComposeResult<Controller> {
        let cache = Cache::build(&CacheParams::sized(4096, 2), cacheline_bytes, 0)?;
        Ok(Controller::new(
            kind,
            version,
            params.tbes,
            ControllerLatency::default(),
            CacheAttachment::Unified(cache),
        ))
    };
    let mut directories = Vec::with_capacity(params.num_directories);
    for version in 0..params.num_directories {
        directories.push(stub(ControllerKind::Directory, version)?);
    }
    let mut dmas = Vec::with_capacity(params.num_dmas);
    for version in 0..params.num_dmas {
        dmas.push(stub(ControllerKind::Dma, version)?);
    }

    Ok(ExternalSystem {
        sequencers,
        cpu_controllers,
        directories,
        dmas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(num_cpus: usize) -> HostParams {
        HostParams {
            num_cpus,
            ..HostParams::default()
        }
    }

    #[test]
    fn host_cpu_ids_and_client_indices_are_final() {
        let host = synthesize_host(&shape(4), 128).unwrap();
        assert_eq!(host.num_clients(), 4);
        for (i, cntrl) in host.cpu_controllers.iter().enumerate() {
            assert_eq!(cntrl.kind, ControllerKind::CpuCore);
            assert_eq!(cntrl.id, Some(i));
            assert_eq!(host.sequencers[i].version, i);
            assert_eq!(host.sequencers[i].controller, Some(i));
        }
    }

    #[test]
    fn directories_and_dmas_arrive_unnumbered() {
        let host = synthesize_host(
            &HostParams {
                num_cpus: 1,
                num_directories: 2,
                num_dmas: 1,
                ..HostParams::default()
            },
            128,
        )
        .unwrap();
        assert_eq!(host.directories.len(), 2);
        assert_eq!(host.dmas.len(), 1);
        for cntrl in host.directories.iter().chain(host.dmas.iter()) {
            assert_eq!(cntrl.id, None);
        }
    }

    #[test]
    fn empty_host_has_no_clients() {
        let host = synthesize_host(&shape(0), 128).unwrap();
        assert_eq!(host.num_clients(), 0);
        assert!(host.cpu_controllers.is_empty());
        let empty = ExternalSystem::empty();
        assert_eq!(empty.num_clients(), 0);
    }
}
