use std::collections::HashSet;

use log::info;

use crate::cluster::{Cluster, ClusterBandwidth};
use crate::controller::{CntrlId, Controller, Sequencer};
use crate::error::{ComposeError, ComposeResult};
use crate::integrate::ExternalSystem;

/// The device-side levels produced by the factory, not yet numbered or
/// clustered.
#[derive(Debug)]
pub struct DeviceLevels {
    pub leaves: Vec<(Controller, Sequencer)>,
    pub page_walker: Option<(Controller, Sequencer)>,
    pub copy_engine: Option<(Controller, Sequencer)>,
    pub shared: Vec<Controller>,
}

impl DeviceLevels {
    pub fn num_controllers(&self) -> usize {
        self.leaves.len()
            + self.shared.len()
            + self.page_walker.is_some() as usize
            + self.copy_engine.is_some() as usize
    }
}

/// The finished, immutable topology handed to the execution component.
/// Sequencer order is the client-visible ordering; downstream consumers
/// index clients by position.
#[derive(Debug)]
pub struct Topology {
    pub root: Cluster,
    pub sequencers: Vec<Sequencer>,
    pub directories: Vec<CntrlId>,
    pub dmas: Vec<CntrlId>,
}

impl Topology {
    pub fn controllers(&self) -> Vec<&Controller> {
        self.root.controllers()
    }

    pub fn controller(&self, id: CntrlId) -> Option<&Controller> {
        self.root.find(id)
    }

    pub fn num_controllers(&self) -> usize {
        self.root.controllers().len()
    }
}

/// Seeds the global id counter from the externally numbered controllers.
/// Internal ids are assigned monotonically above the external maximum, so
/// the only possible collision is inside the external set itself and it is
/// caught here, before any id is handed out.
fn seed_id_counter(external: &[Controller]) -> ComposeResult<CntrlId> {
    let mut seen = HashSet::new();
    let mut next = 0;
    for cntrl in external {
        let id = cntrl.id.ok_or_else(|| {
            ComposeError::InvalidConfig(format!(
                "external {:?} controller version {} has no id",
                cntrl.kind, cntrl.version
            ))
        })?;
        if !seen.insert(id) {
            return Err(ComposeError::DuplicateId(id));
        }
        next = next.max(id + 1);
    }
    Ok(next)
}

/// Merges the externally built CPU-side system with the device-side levels
/// into one topology: a single root cluster, one global controller-id space
/// and one client-ordered sequencer sequence.
///
/// Ids are assigned in a fixed order for reproducibility: external
/// controllers keep theirs, then leaves, page walker, copy engine, shared
/// shards, directories and DMA controllers continue the counter. The id
/// values are stable only for identical inputs; consumers treat them as
/// opaque.
pub fn assemble(
    external: ExternalSystem,
    device: DeviceLevels,
    bandwidth: ClusterBandwidth,
) -> ComposeResult<Topology> {
    if device.num_controllers() == 0 {
        return Err(ComposeError::EmptyTopology { level: "device" });
    }

    let ExternalSystem {
        sequencers: mut all_sequencers,
        cpu_controllers,
        directories,
        dmas,
    } = external;
    let mut next_id = seed_id_counter(&cpu_controllers)?;

    let DeviceLevels {
        leaves,
        page_walker,
        copy_engine,
        shared,
    } = device;

    // Number the new controllers: leaves, page walker, copy engine, then
    // shared shards. Client sequencers are appended in the same pass so
    // their order matches the leaf index order.
    let wire = |(mut cntrl, mut seq): (Controller, Sequencer),
                    sequencers: &mut Vec<Sequencer>,
                    next_id: &mut CntrlId| {
        cntrl.id = Some(*next_id);
        *next_id += 1;
        seq.controller = cntrl.id;
        cntrl.sequencer = Some(sequencers.len());
        sequencers.push(seq);
        cntrl
    };

    let mut leaf_cntrls = Vec::with_capacity(leaves.len());
    for pair in leaves {
        leaf_cntrls.push(wire(pair, &mut all_sequencers, &mut next_id));
    }
    let pw_cntrl = page_walker.map(|pair| wire(pair, &mut all_sequencers, &mut next_id));
    let ce_cntrl = copy_engine.map(|pair| wire(pair, &mut all_sequencers, &mut next_id));

    let mut shared_cntrls = Vec::with_capacity(shared.len());
    for mut shard in shared {
        shard.id = Some(next_id);
        next_id += 1;
        shared_cntrls.push(shard);
    }

    // Device cluster: leaves directly, one nested cluster per shared shard,
    // then the page-walk and copy-engine controllers.
    let mut device_cluster = Cluster::new("gpu", bandwidth);
    for cntrl in leaf_cntrls {
        device_cluster.add_controller(cntrl);
    }
    for shard in shared_cntrls {
        let mut shard_cluster =
            Cluster::new(format!("l2_shard{}", shard.version), bandwidth);
        shard_cluster.add_controller(shard);
        device_cluster.add_cluster(shard_cluster);
    }
    if let Some(cntrl) = pw_cntrl {
        device_cluster.add_controller(cntrl);
    }
    if let Some(cntrl) = ce_cntrl {
        device_cluster.add_controller(cntrl);
    }

    // Root cluster: CPU side first, then the device cluster, then the
    // directory and DMA controllers as direct members.
    let mut root = Cluster::new("system", bandwidth);
    if !cpu_controllers.is_empty() {
        let mut cpu_cluster = Cluster::new("cpu", bandwidth);
        for cntrl in cpu_controllers {
            cpu_cluster.add_controller(cntrl);
        }
        root.add_cluster(cpu_cluster);
    }
    root.add_cluster(device_cluster);

    let mut directory_ids = Vec::with_capacity(directories.len());
    for mut cntrl in directories {
        cntrl.id = Some(next_id);
        directory_ids.push(next_id);
        next_id += 1;
        root.add_controller(cntrl);
    }
    let mut dma_ids = Vec::with_capacity(dmas.len());
    for mut cntrl in dmas {
        cntrl.id = Some(next_id);
        dma_ids.push(next_id);
        next_id += 1;
        root.add_controller(cntrl);
    }

    let topology = Topology {
        root,
        sequencers: all_sequencers,
        directories: directory_ids,
        dmas: dma_ids,
    };
    info!(
        "assembled topology: {} controllers, {} sequencers, id space 0..{}",
        topology.num_controllers(),
        topology.sequencers.len(),
        next_id
    );
    Ok(topology)
}
