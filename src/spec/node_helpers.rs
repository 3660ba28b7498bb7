use crate::spec::pod_helpers;
use crate::spec::pod_helpers::get_requests;
use crate::spec::resource::Resource;
use k8s_openapi::api::core::v1::{Node as K8sNode, Pod};
use std::collections::BTreeMap;

/// get the sum of the requests of the pods on the node
pub fn get_node_requests(pods: &[Pod]) -> Result<Resource, pod_helpers::Error> {
    let mut total = Resource::default();

    for p in pods {
        let spec = match p.spec.as_ref() {
            None => continue,
            Some(spec) => spec,
        };
        total.add(&get_requests(spec)?);
    }
    Ok(total)
}

/// get the allocatable resources of a node from its status, including the pod ceiling
pub fn get_node_alloc(n: &K8sNode) -> Result<Resource, pod_helpers::Error> {
    match n.status.as_ref().and_then(|s| s.allocatable.as_ref()) {
        None => Ok(Resource::default()),
        Some(allocatable) => Resource::from_resource_list(allocatable),
    }
}

pub fn node_annotations(n: &K8sNode) -> &BTreeMap<String, String> {
    static EMPTY: BTreeMap<String, String> = BTreeMap::new();
    n.metadata.annotations.as_ref().unwrap_or(&EMPTY)
}
