pub mod cycle_state;
pub mod node_info;
pub mod node_resource_match;
pub mod plugins;
pub mod pod_scheduler;

use crate::scheduler::plugins::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedNode {
    pub node_name: String,
    pub status: Status,
}

/// Outcome of filtering the candidate nodes for one pod. Nodes are not ranked.
#[derive(Debug, Clone, Default)]
pub struct NodeSelection {
    pub feasible: Vec<String>,
    pub rejected: Vec<RejectedNode>,
}
