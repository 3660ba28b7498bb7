use k8s_openapi::api::core::v1::Node as K8sNode;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Read access to the latest known version of each node.
pub trait NodeLister: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<K8sNode>>;
}

/// Node objects keyed by name, kept current from node events.
#[derive(Default)]
pub struct NodeStore {
    nodes: RwLock<HashMap<String, Arc<K8sNode>>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the node under its name. Nodes without a name are ignored.
    pub fn upsert(&self, node: K8sNode) -> Option<Arc<K8sNode>> {
        let name = node.metadata.name.clone()?;
        let node = Arc::new(node);
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, node.clone());
        Some(node)
    }

    pub fn delete(&self, name: &str) -> Option<Arc<K8sNode>> {
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeLister for NodeStore {
    fn get(&self, name: &str) -> Option<Arc<K8sNode>> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
