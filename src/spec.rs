pub mod node_helpers;
pub mod pod_helpers;
pub mod resource;
