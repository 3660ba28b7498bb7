use crate::spec::pod_helpers::{self, parse_quantity};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::Serialize;
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// The resource names accounted for in their own dimension. Anything else in a
/// resource list is treated as a scalar resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum ResourceName {
    #[strum(serialize = "cpu")]
    Cpu,
    #[strum(serialize = "memory")]
    Memory,
    #[strum(serialize = "ephemeral-storage")]
    EphemeralStorage,
    #[strum(serialize = "pods")]
    Pods,
}

/// Compute resources in their accounting units: cpu in millis, memory and
/// ephemeral storage in bytes, scalar resources in whole units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub milli_cpu: i64,
    pub memory: i64,
    pub ephemeral_storage: i64,
    pub allowed_pod_number: i64,
    pub scalar_resources: BTreeMap<String, i64>,
}

impl Resource {
    pub fn from_resource_list(list: &BTreeMap<String, Quantity>) -> Result<Self, pod_helpers::Error> {
        let mut resource = Resource::default();
        for (name, quantity) in list {
            let value = parse_quantity(name, quantity)?;
            match name.parse::<ResourceName>() {
                Ok(ResourceName::Cpu) => resource.milli_cpu += value,
                Ok(ResourceName::Memory) => resource.memory += value,
                Ok(ResourceName::EphemeralStorage) => resource.ephemeral_storage += value,
                Ok(ResourceName::Pods) => resource.allowed_pod_number += value,
                Err(_) => {
                    *resource.scalar_resources.entry(name.clone()).or_insert(0) += value;
                }
            }
        }
        Ok(resource)
    }

    pub fn add(&mut self, other: &Resource) {
        self.milli_cpu = self.milli_cpu.saturating_add(other.milli_cpu);
        self.memory = self.memory.saturating_add(other.memory);
        self.ephemeral_storage = self.ephemeral_storage.saturating_add(other.ephemeral_storage);
        self.allowed_pod_number = self.allowed_pod_number.saturating_add(other.allowed_pod_number);
        for (name, value) in &other.scalar_resources {
            let entry = self.scalar_resources.entry(name.clone()).or_insert(0);
            *entry = entry.saturating_add(*value);
        }
    }

    /// element-wise max
    pub fn set_max(&mut self, other: &Resource) {
        self.milli_cpu = self.milli_cpu.max(other.milli_cpu);
        self.memory = self.memory.max(other.memory);
        self.ephemeral_storage = self.ephemeral_storage.max(other.ephemeral_storage);
        self.allowed_pod_number = self.allowed_pod_number.max(other.allowed_pod_number);
        for (name, value) in &other.scalar_resources {
            let entry = self.scalar_resources.entry(name.clone()).or_insert(0);
            *entry = (*entry).max(*value);
        }
    }

    /// true when nothing at all is requested: cpu, memory, ephemeral storage and
    /// every scalar resource are zero
    pub fn is_zero(&self) -> bool {
        self.milli_cpu == 0
            && self.memory == 0
            && self.ephemeral_storage == 0
            && self.scalar_resources.values().all(|v| *v == 0)
    }
}
