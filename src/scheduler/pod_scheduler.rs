use crate::reservation::ReservationCache;
use crate::scheduler::cycle_state::CycleState;
use crate::scheduler::node_info::NodeInfo;
use crate::scheduler::node_resource_match::NodeResourceMatch;
use crate::scheduler::plugins::{Filter, PreFilter, Status};
use crate::scheduler::{NodeSelection, RejectedNode};
use itertools::{Either, Itertools};
use k8s_openapi::api::core::v1::Pod;
use log::debug;
use std::sync::Arc;

/// Runs one scheduling cycle's pre-filter and filter phases for a pod. Filters
/// run for all nodes at once, one thread per node.
pub struct PodScheduler {
    pre_filters: Vec<Arc<dyn PreFilter>>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PodScheduler {
    pub fn new(pre_filters: Vec<Arc<dyn PreFilter>>, filters: Vec<Arc<dyn Filter>>) -> Self {
        Self {
            pre_filters,
            filters,
        }
    }

    pub fn with_reservations(cache: Arc<ReservationCache>) -> Self {
        let fit = Arc::new(NodeResourceMatch::new(cache));
        let pre_filter: Arc<dyn PreFilter> = fit.clone();
        let filter: Arc<dyn Filter> = fit;
        Self::new(vec![pre_filter], vec![filter])
    }

    pub fn choose_nodes(&self, nodes: &[NodeInfo], pod: &Pod) -> NodeSelection {
        let mut state = CycleState::new();

        for pre_filter in &self.pre_filters {
            let status = pre_filter.pre_filter(&mut state, pod);
            if !status.is_success() {
                debug!("pre-filter {} aborted the cycle: {:?}", pre_filter.name(), status);
                return NodeSelection {
                    feasible: vec![],
                    rejected: vec![RejectedNode {
                        node_name: "*".to_string(),
                        status,
                    }],
                };
            }
        }

        let state = &state;
        let results: Vec<(String, Status)> = std::thread::scope(|s| {
            let handles: Vec<_> = nodes
                .iter()
                .map(|n| (n.node_name().to_string(), s.spawn(move || self.run_filters(state, pod, n))))
                .collect();

            handles
                .into_iter()
                .map(|(node_name, handle)| {
                    let status = handle
                        .join()
                        .unwrap_or_else(|_| Status::Error("filter panicked".to_string()));
                    (node_name, status)
                })
                .collect()
        });

        let (feasible, rejected): (Vec<_>, Vec<_>) =
            results
                .into_iter()
                .partition_map(|(node_name, status)| match status {
                    Status::Success => Either::Left(node_name),
                    status => Either::Right(RejectedNode { node_name, status }),
                });

        NodeSelection { feasible, rejected }
    }

    fn run_filters(&self, state: &CycleState, pod: &Pod, node: &NodeInfo) -> Status {
        for filter in &self.filters {
            let status = filter.filter(state, pod, node);
            if !status.is_success() {
                return status;
            }
        }
        Status::Success
    }
}
