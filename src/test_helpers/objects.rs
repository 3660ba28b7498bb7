use k8s_openapi::api::core::v1::{
    Container, Node as K8sNode, NodeStatus as K8sNodeStatus, Pod, PodSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

pub fn resources(list: &[(&str, &str)]) -> BTreeMap<String, Quantity> {
    list.iter()
        .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
        .collect()
}

#[allow(unused)]
pub fn node(name: &str, cpu: &str, memory: &str, pods: &str) -> K8sNode {
    K8sNode {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: None,
        status: Some(K8sNodeStatus {
            allocatable: Some(resources(&[
                ("cpu", cpu),
                ("memory", memory),
                ("ephemeral-storage", "100Gi"),
                ("pods", pods),
            ])),
            ..Default::default()
        }),
    }
}

/// a pod with a single container requesting cpu and memory; empty strings leave
/// the request out
#[allow(unused)]
pub fn pod(name: &str, cpu: &str, memory: &str) -> Pod {
    let requests: Vec<_> = [("cpu", cpu), ("memory", memory)]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                resources: Some(ResourceRequirements {
                    requests: Some(resources(&requests)),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: None,
    }
}

pub trait WithAnnotation {
    #[allow(unused)]
    fn with_annotation(self, key: &str, value: &str) -> Self;
}

impl WithAnnotation for K8sNode {
    fn with_annotation(self, key: &str, value: &str) -> Self {
        let mut node = self;
        node.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        node
    }
}

pub trait WithOwner {
    #[allow(unused)]
    fn with_owner(self, uid: &str) -> Self;
}

impl WithOwner for Pod {
    fn with_owner(self, uid: &str) -> Self {
        let mut pod = self;
        pod.metadata
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(OwnerReference {
                api_version: "apps/v1".to_string(),
                kind: "ReplicaSet".to_string(),
                name: format!("owner-{}", uid),
                uid: uid.to_string(),
                ..Default::default()
            });
        pod
    }
}

/// a reservation annotation value reserving cpu and memory for each owner
#[allow(unused)]
pub fn reservation_json(entries: &[(&str, &str, &str)]) -> String {
    let items: Vec<_> = entries
        .iter()
        .map(|(uid, cpu, memory)| {
            serde_json::json!({
                "owner_type": "ReplicaSet",
                "owner_uid": uid,
                "pod_name": format!("pod-{}", uid),
                "reserved_resources": [
                    {"resource_type": "cpu", "reserved_quantity": cpu},
                    {"resource_type": "memory", "reserved_quantity": memory},
                ],
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}
