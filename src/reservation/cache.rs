use crate::reservation::declaration::ReservationDeclaration;
use crate::spec::resource::ResourceName;
use log::warn;
use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Capacity reserved on one node, summed over every declaration attached to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReservationEntry {
    pub milli_cpu: i64,
    pub memory: i64,
    pub ephemeral_storage: i64,
}

impl ReservationEntry {
    /// Projects the declarations onto cpu, memory and ephemeral-storage; other
    /// resource types are not tracked.
    pub fn from_declarations(declarations: &[ReservationDeclaration]) -> Self {
        let mut entry = ReservationEntry::default();
        for reserved in declarations.iter().flat_map(|d| &d.reserved_resources) {
            match reserved.resource_type.parse::<ResourceName>() {
                Ok(ResourceName::Cpu) => {
                    entry.milli_cpu = entry.milli_cpu.saturating_add(reserved.quantity)
                }
                Ok(ResourceName::Memory) => {
                    entry.memory = entry.memory.saturating_add(reserved.quantity)
                }
                Ok(ResourceName::EphemeralStorage) => {
                    entry.ephemeral_storage =
                        entry.ephemeral_storage.saturating_add(reserved.quantity)
                }
                _ => {}
            }
        }
        entry
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, ReservationEntry>,
    // owner uid -> node name
    owners: HashMap<String, String>,
}

impl CacheState {
    fn owners_on(&self, node_name: &str) -> BTreeSet<&str> {
        self.owners
            .iter()
            .filter(|(_, n)| n.as_str() == node_name)
            .map(|(uid, _)| uid.as_str())
            .collect()
    }

    fn remove_owners_on(&mut self, node_name: &str) {
        self.owners.retain(|_, n| n != node_name);
    }
}

/// Reserved capacity per node and the node each owner holds a reservation on.
///
/// Written by the reservation controller only; read concurrently by the filter.
/// Every write swaps a node's entry and its owner assignments under one write
/// lock, so readers see either the old or the new state of a node.
#[derive(Default)]
pub struct ReservationCache {
    state: RwLock<CacheState>,
}

impl ReservationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, node_name: &str) -> Option<ReservationEntry> {
        self.read().entries.get(node_name).copied()
    }

    /// reserved capacity on the node, zero when nothing is cached
    pub fn reserved_on(&self, node_name: &str) -> ReservationEntry {
        self.get(node_name).unwrap_or_default()
    }

    pub fn owner_node(&self, owner_uid: &str) -> Option<String> {
        self.read().owners.get(owner_uid).cloned()
    }

    pub fn is_reserved_for(&self, owner_uid: &str, node_name: &str) -> bool {
        self.read()
            .owners
            .get(owner_uid)
            .is_some_and(|n| n == node_name)
    }

    /// owner uids assigned to the node, sorted
    pub fn owners_on(&self, node_name: &str) -> Vec<String> {
        self.read()
            .owners_on(node_name)
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the node's entry and the owner assignments it contributes.
    /// Assignments held by other nodes are kept, unless an owner moved to this
    /// node. Returns false when nothing changed.
    pub fn apply<I>(&self, node_name: &str, entry: ReservationEntry, owner_uids: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let owner_uids: BTreeSet<String> = owner_uids
            .into_iter()
            .map(Into::into)
            .filter(|uid: &String| !uid.is_empty())
            .collect();

        let mut state = self.write();

        let unchanged = state.entries.get(node_name) == Some(&entry)
            && state.owners_on(node_name).into_iter().eq(owner_uids.iter().map(String::as_str));
        if unchanged {
            return false;
        }

        state.remove_owners_on(node_name);
        for uid in owner_uids {
            if let Some(previous) = state.owners.insert(uid.clone(), node_name.to_string()) {
                warn!(
                    "owner {} moved its reservation from node {} to node {}",
                    uid, previous, node_name
                );
            }
        }
        state.entries.insert(node_name.to_string(), entry);
        true
    }

    /// Evicts the node's entry and its owner assignments. Returns false when
    /// nothing was cached for the node.
    pub fn remove(&self, node_name: &str) -> bool {
        let mut state = self.write();
        let had_owners = state.owners.values().any(|n| n == node_name);
        state.remove_owners_on(node_name);
        state.entries.remove(node_name).is_some() || had_owners
    }
}
