use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::controllers::node_lister::NodeStore;
use crate::controllers::reservation::{NodeEvent, ReservationController};
use crate::errors::NodeReserveError;
use crate::reservation::{ReservationCache, ReservationEntry};
use crate::scheduler::plugins::Status;
use crate::scheduler::{NodeSelection, RejectedNode};
use crate::scheduler::node_info::NodeInfo;
use crate::scheduler::pod_scheduler::PodScheduler;
use crate::spec::node_helpers::node_annotations;
use clap::{Args, Parser, Subcommand};
use k8s_openapi::api::core::v1::{Node as K8sNode, Pod};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tabled::Tabled;
use tabled::settings::Style;

#[derive(Debug, Parser)]
#[command(name = "node-reserve")]
#[command(about = "Node resource reservations for pod admission", long_about = None, arg_required_else_help = true, version)]
struct Cli {
    #[arg(long, long_help = "Configuration for node-reserve.", default_value = DEFAULT_CONFIG_PATH, env = "NODE_RESERVE_CONFIG")]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(long_about = "Show the reservations declared on a node manifest")]
    Reservations(ReservationsArgs),
    #[command(long_about = "Check which nodes would admit a pod")]
    Check(CheckArgs),
}

#[derive(Debug, Clone, Args)]
struct ReservationsArgs {
    #[arg(long_help = "Node manifest (yaml).")]
    node: String,
}

#[derive(Debug, Clone, Args)]
struct CheckArgs {
    #[arg(long = "node", required = true, long_help = "Node manifest (yaml). Can be repeated.")]
    nodes: Vec<String>,
    #[arg(long, long_help = "Manifest of the pod to place (yaml).")]
    pod: String,
    #[arg(long, long_help = "Pods already bound to the nodes, as a multi-document yaml file. Pods are matched to nodes by spec.nodeName.")]
    running: Option<String>,
}

#[derive(Tabled)]
#[tabled(rename_all = "UPPERCASE")]
struct ReservationRow {
    owner_type: String,
    owner_uid: String,
    pod: String,
    resource: String,
    quantity: i64,
}

fn read_manifest<T: DeserializeOwned>(path: &str) -> Result<T, NodeReserveError> {
    let path = shellexpand::tilde(path).to_string();
    let contents = std::fs::read_to_string(&path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

fn read_manifests<T: DeserializeOwned>(path: &str) -> Result<Vec<T>, NodeReserveError> {
    let path = shellexpand::tilde(path).to_string();
    let contents = std::fs::read_to_string(&path)?;
    let mut objects = vec![];
    for document in serde_yaml::Deserializer::from_str(&contents) {
        objects.push(T::deserialize(document)?);
    }
    Ok(objects)
}

fn reservations(config: &Config, args: ReservationsArgs) -> Result<(), NodeReserveError> {
    let node: K8sNode = read_manifest(&args.node)?;
    let name = node.metadata.name.clone().unwrap_or_default();

    let source = config.reservation_source();
    let Some(declarations) = source.decode(node_annotations(&node))? else {
        println!("node {} declares no reservations", name);
        return Ok(());
    };

    let rows: Vec<_> = declarations
        .iter()
        .flat_map(|d| {
            d.reserved_resources.iter().map(|r| ReservationRow {
                owner_type: d.owner_type.clone(),
                owner_uid: d.owner_uid.clone(),
                pod: d.pod_name.clone(),
                resource: r.resource_type.clone(),
                quantity: r.quantity,
            })
        })
        .collect();

    let mut table = tabled::Table::new(rows);
    table.with(Style::empty());
    println!("{}", table);

    let ReservationEntry {
        milli_cpu,
        memory,
        ephemeral_storage,
    } = ReservationEntry::from_declarations(&declarations);
    println!(
        "\nreserved on {}: cpu={}m memory={} ephemeral-storage={}",
        name, milli_cpu, memory, ephemeral_storage
    );
    Ok(())
}

async fn check(config: &Config, args: CheckArgs) -> Result<(), NodeReserveError> {
    let mut nodes = args
        .nodes
        .iter()
        .map(|path| read_manifest::<K8sNode>(path))
        .collect::<Result<Vec<_>, _>>()?;
    let pod: Pod = read_manifest(&args.pod)?;
    let running: Vec<Pod> = match &args.running {
        Some(path) => read_manifests(path)?,
        None => vec![],
    };

    let cache = Arc::new(ReservationCache::new());
    let store = Arc::new(NodeStore::new());
    let controller = ReservationController::new(cache.clone(), store.clone(), config);
    for node in &nodes {
        store.upsert(node.clone());
        controller.handle(&NodeEvent::Added(node.clone()));
    }
    // nodes whose reservations are unknown cannot be judged
    let failed = controller.drain().await;
    nodes.retain(|n| !failed.iter().any(|(key, _)| Some(key) == n.metadata.name.as_ref()));

    let infos = nodes
        .into_iter()
        .map(|node| {
            let name = node.metadata.name.clone();
            let pods = running
                .iter()
                .filter(|p| p.spec.as_ref().and_then(|s| s.node_name.as_ref()) == name.as_ref())
                .cloned()
                .collect();
            NodeInfo::new(node, pods)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scheduler = PodScheduler::with_reservations(cache);
    let mut selection = scheduler.choose_nodes(&infos, &pod);
    selection.rejected.extend(failed.into_iter().map(|(node_name, err)| RejectedNode {
        node_name,
        status: Status::Error(err.to_string()),
    }));
    print_selection(&pod, &selection);
    Ok(())
}

fn print_selection(pod: &Pod, selection: &NodeSelection) {
    let pod_name = pod.metadata.name.as_deref().unwrap_or_default();
    if selection.feasible.is_empty() {
        println!("pod {} fits on no node", pod_name);
    }
    for node_name in &selection.feasible {
        println!("✔ {}", node_name);
    }
    for rejected in &selection.rejected {
        println!("✖ {}: {}", rejected.node_name, rejected.status.reasons().join(", "));
    }
}

async fn node_reserve_with_args(args: Cli) -> Result<(), NodeReserveError> {
    let config = Config::load(&args.config)?;
    match args.command {
        Commands::Reservations(args) => reservations(&config, args),
        Commands::Check(args) => check(&config, args).await,
    }
}

pub async fn node_reserve() -> Result<(), NodeReserveError> {
    let args = Cli::parse();
    node_reserve_with_args(args).await
}
