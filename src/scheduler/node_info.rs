use crate::spec::node_helpers::{get_node_alloc, get_node_requests};
use crate::spec::pod_helpers;
use crate::spec::resource::Resource;
use k8s_openapi::api::core::v1::{Node as K8sNode, Pod};

/// Snapshot of a node as the scheduler sees it: what it can hold, what the
/// pods already on it request, and the pods themselves.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    node: K8sNode,
    pods: Vec<Pod>,
    pub allocatable: Resource,
    pub requested: Resource,
}

impl NodeInfo {
    pub fn new(node: K8sNode, pods: Vec<Pod>) -> Result<Self, pod_helpers::Error> {
        let allocatable = get_node_alloc(&node)?;
        let requested = get_node_requests(&pods)?;
        Ok(Self {
            node,
            pods,
            allocatable,
            requested,
        })
    }

    pub fn node_name(&self) -> &str {
        self.node.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::objects::{node, pod};

    #[test]
    fn should_build_snapshot() {
        let info = NodeInfo::new(
            node("node-a", "4", "8Gi", "110"),
            vec![pod("a", "1", "1Gi"), pod("b", "500m", "")],
        )
        .unwrap();

        assert_eq!(info.node_name(), "node-a");
        assert_eq!(info.pods().len(), 2);
        assert_eq!(info.allocatable.milli_cpu, 4000);
        assert_eq!(info.allocatable.allowed_pod_number, 110);
        assert_eq!(info.requested.milli_cpu, 1500);
        assert_eq!(info.requested.memory, 1024 * 1024 * 1024);
    }
}
