use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use toml::Table;

use topofuse::addr::IndexBits;
use topofuse::cluster::{Cluster, ClusterMember};
use topofuse::compose::compose;
use topofuse::config::{ComposerConfig, Config, HostParams};
use topofuse::controller::{Controller, ControllerKind, ControllerLatency};
use topofuse::integrate::synthesize_host;
use topofuse::Topology;

#[derive(Parser)]
#[command(version, about)]
struct TopofuseArgs {
    #[arg(help = "Path to config.toml; defaults apply when omitted")]
    config_path: Option<PathBuf>,
    #[arg(long, help = "Override number of device cores")]
    num_cores: Option<usize>,
    #[arg(long, help = "Override number of shared L2 shards")]
    l2_shards: Option<usize>,
    #[arg(long, help = "Override number of host CPUs")]
    num_cpus: Option<usize>,
    #[arg(long, help = "Dump the topology as JSON instead of a tree")]
    json: bool,
}

#[derive(Serialize)]
struct ControllerSummary {
    id: usize,
    kind: ControllerKind,
    version: usize,
    tbe_capacity: usize,
    latency: ControllerLatency,
    index: IndexBits,
    sequencer: Option<usize>,
}

#[derive(Serialize)]
struct SequencerSummary {
    version: usize,
    controller: Option<usize>,
    max_outstanding: usize,
    supports_inst_fetch: bool,
}

#[derive(Serialize)]
struct TopologySummary {
    controllers: Vec<ControllerSummary>,
    sequencers: Vec<SequencerSummary>,
    directories: Vec<usize>,
    dmas: Vec<usize>,
}

impl TopologySummary {
    fn new(topology: &Topology) -> Self {
        Self {
            controllers: topology
                .controllers()
                .into_iter()
                .map(|cntrl| ControllerSummary {
                    id: cntrl.id.unwrap_or_default(),
                    kind: cntrl.kind,
                    version: cntrl.version,
                    tbe_capacity: cntrl.tbe_capacity,
                    latency: cntrl.latency,
                    index: cntrl.caches.data_side().index,
                    sequencer: cntrl.sequencer,
                })
                .collect(),
            sequencers: topology
                .sequencers
                .iter()
                .map(|seq| SequencerSummary {
                    version: seq.version,
                    controller: seq.controller,
                    max_outstanding: seq.max_outstanding,
                    supports_inst_fetch: seq.supports_inst_fetch,
                })
                .collect(),
            directories: topology.directories.clone(),
            dmas: topology.dmas.clone(),
        }
    }
}

fn print_controller(cntrl: &Controller, depth: usize) {
    let index = cntrl.caches.data_side().index;
    println!(
        "{:indent$}{:?} v{} id={} tbes={} issue={} resp={} hit={} index=[{},{})",
        "",
        cntrl.kind,
        cntrl.version,
        cntrl.id.unwrap_or_default(),
        cntrl.tbe_capacity,
        cntrl.latency.issue,
        cntrl.latency.response,
        cntrl.latency.hit,
        index.start,
        index.end(),
        indent = depth * 2,
    );
}

fn print_cluster(cluster: &Cluster, depth: usize) {
    println!(
        "{:indent$}cluster '{}' bw={}/{}",
        "",
        cluster.name,
        cluster.bandwidth.internal,
        cluster.bandwidth.external,
        indent = depth * 2,
    );
    for member in cluster.members() {
        match member {
            ClusterMember::Controller(cntrl) => print_controller(cntrl, depth + 1),
            ClusterMember::Cluster(nested) => print_cluster(nested, depth + 1),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let argv = TopofuseArgs::parse();
    let table: Table = match &argv.config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&raw).context("cannot parse config toml")?
        }
        None => Table::new(),
    };

    let mut config = ComposerConfig::from_table(&table);
    let mut host = HostParams::from_table(&table);

    // argv overrides beat the toml sections
    config.gpu.num_cores = argv.num_cores.unwrap_or(config.gpu.num_cores);
    config.gpu.num_l2_shards = argv.l2_shards.unwrap_or(config.gpu.num_l2_shards);
    host.num_cpus = argv.num_cpus.unwrap_or(host.num_cpus);

    let external = synthesize_host(&host, config.gpu.cacheline_bytes)?;
    let topology = compose(&config, external)?;

    if argv.json {
        println!("{}", serde_json::to_string_pretty(&TopologySummary::new(&topology))?);
    } else {
        print_cluster(&topology.root, 0);
        println!(
            "{} controllers, {} sequencers, {} directories, {} dma endpoints",
            topology.num_controllers(),
            topology.sequencers.len(),
            topology.directories.len(),
            topology.dmas.len(),
        );
    }
    Ok(())
}
