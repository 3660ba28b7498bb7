use crate::scheduler::cycle_state::CycleState;
use crate::scheduler::node_info::NodeInfo;
use k8s_openapi::api::core::v1::Pod;

//*
// NOTE: the plugin system is inspired by the Kubernetes scheduler plugin system.

// Copyright 2019 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
// */

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Outcome of a plugin call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The node cannot run the pod. Holds every reason, in the order found.
    Unschedulable(Vec<String>),
    /// Something went wrong in the scheduler itself, not a placement decision.
    Error(String),
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    pub fn reasons(&self) -> Vec<String> {
        match self {
            Status::Success => vec![],
            Status::Unschedulable(reasons) => reasons.clone(),
            Status::Error(message) => vec![message.clone()],
        }
    }
}

/// These plugins are used to pre-process info about the Pod, or to check certain conditions that
/// the cluster or the Pod must meet. They are called once per pod per scheduling cycle. If a
/// PreFilter plugin returns anything but success, the scheduling cycle is aborted.
pub trait PreFilter: Plugin {
    fn pre_filter(&self, state: &mut CycleState, pod: &Pod) -> Status;
}

/// These plugins are used to filter out nodes that cannot run the Pod. For each node, the scheduler
/// will call filter plugins in their configured order. If any filter plugin marks the node as
/// infeasible, the remaining plugins will not be called for that node. Nodes may be evaluated
/// concurrently, so filters must not block.
pub trait Filter: Plugin {
    fn filter(&self, state: &CycleState, pod: &Pod, node: &NodeInfo) -> Status;
}
