use crate::reservation::ReservationCache;
use crate::scheduler::cycle_state::{CycleState, StateData, StateLookup};
use crate::scheduler::node_info::NodeInfo;
use crate::scheduler::plugins::{Filter, Plugin, PreFilter, Status};
use crate::spec::pod_helpers::{get_requests, owner_uid};
use crate::spec::resource::{Resource, ResourceName};
use k8s_openapi::api::core::v1::Pod;
use log::debug;
use std::sync::Arc;

pub const NAME: &str = "noderesourcematch-plugin";

const PRE_FILTER_STATE_KEY: &str = "PreFilternoderesourcematch-plugin";

/// The pod's aggregated request, computed once per cycle in pre-filter.
#[derive(Debug, Clone)]
struct PreFilterState(Resource);

impl StateData for PreFilterState {}

/// InsufficientResource describes what kind of resource limit is hit and caused the pod to not
/// fit the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientResource {
    pub resource_name: ResourceName,
    pub reason: &'static str,
    pub requested: i64,
    pub used: i64,
    pub capacity: i64,
}

/// Checks that a node has room for the pod once the capacity reserved on it is
/// taken out, letting an owner's pods onto the node holding its reservation.
pub struct NodeResourceMatch {
    cache: Arc<ReservationCache>,
}

impl NodeResourceMatch {
    pub fn new(cache: Arc<ReservationCache>) -> Self {
        Self { cache }
    }
}

impl Plugin for NodeResourceMatch {
    fn name(&self) -> &str {
        NAME
    }
}

impl PreFilter for NodeResourceMatch {
    fn pre_filter(&self, state: &mut CycleState, pod: &Pod) -> Status {
        let spec = match pod.spec.as_ref() {
            Some(spec) => spec,
            None => return Status::Error("pod spec is empty".to_string()),
        };

        match get_requests(spec) {
            Ok(request) => {
                state.write(PRE_FILTER_STATE_KEY, PreFilterState(request));
                Status::Success
            }
            Err(e) => Status::Error(e.to_string()),
        }
    }
}

impl Filter for NodeResourceMatch {
    fn filter(&self, state: &CycleState, pod: &Pod, node: &NodeInfo) -> Status {
        let request = match state.read::<PreFilterState>(PRE_FILTER_STATE_KEY) {
            StateLookup::Present(s) => &s.0,
            // pre-filter wasn't run for this cycle
            StateLookup::Absent => {
                return Status::Error(format!(
                    "error reading {:?} from cycle state: not found",
                    PRE_FILTER_STATE_KEY
                ));
            }
            StateLookup::WrongShape => {
                return Status::Error(format!(
                    "{:?} in cycle state is not a {} pre-filter state",
                    PRE_FILTER_STATE_KEY, NAME
                ));
            }
        };

        let insufficient = fits_request(request, owner_uid(pod), node, &self.cache);
        if insufficient.is_empty() {
            return Status::Success;
        }

        // keep all failure reasons
        Status::Unschedulable(insufficient.iter().map(|r| r.reason.to_string()).collect())
    }
}

/// Every way the request does not fit on the node. Empty means it fits.
pub fn fits_request(
    request: &Resource,
    owner_uid: Option<&str>,
    node: &NodeInfo,
    cache: &ReservationCache,
) -> Vec<InsufficientResource> {
    let mut insufficient = Vec::with_capacity(4);

    let allowed_pod_number = node.allocatable.allowed_pod_number;
    let running = node.pods().len() as i64;
    if running + 1 > allowed_pod_number {
        insufficient.push(InsufficientResource {
            resource_name: ResourceName::Pods,
            reason: "Too many pods",
            requested: 1,
            used: running,
            capacity: allowed_pod_number,
        });
    }

    if request.is_zero() {
        return insufficient;
    }

    let node_name = node.node_name();
    if let Some(uid) = owner_uid {
        if cache.is_reserved_for(uid, node_name) {
            debug!("owner {} holds a reservation on {}, skipping resource checks", uid, node_name);
            return insufficient;
        }
    }

    let reserved = cache.reserved_on(node_name);
    let allocatable = &node.allocatable;
    let requested = &node.requested;

    let dimensions = [
        (
            ResourceName::Cpu,
            "Insufficient cpu",
            request.milli_cpu,
            requested.milli_cpu,
            reserved.milli_cpu,
            allocatable.milli_cpu,
        ),
        (
            ResourceName::Memory,
            "Insufficient memory",
            request.memory,
            requested.memory,
            reserved.memory,
            allocatable.memory,
        ),
        (
            ResourceName::EphemeralStorage,
            "Insufficient ephemeral-storage",
            request.ephemeral_storage,
            requested.ephemeral_storage,
            reserved.ephemeral_storage,
            allocatable.ephemeral_storage,
        ),
    ];

    for (resource_name, reason, want, in_use, held, capacity) in dimensions {
        let used = in_use.saturating_add(held);
        if want > capacity.saturating_sub(used) {
            insufficient.push(InsufficientResource {
                resource_name,
                reason,
                requested: want,
                used,
                capacity,
            });
        }
    }

    insufficient
}
