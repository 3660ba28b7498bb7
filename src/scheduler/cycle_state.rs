use std::any::Any;
use std::collections::HashMap;

/// Data a plugin keeps in the cycle state.
pub trait StateData: Any + Send + Sync {}

/// Result of reading typed data back out of the cycle state.
#[derive(Debug, PartialEq, Eq)]
pub enum StateLookup<'a, T> {
    Present(&'a T),
    Absent,
    /// something is stored under the key, but not a `T`
    WrongShape,
}

/// Key/value store shared by the phases of one scheduling cycle for one pod.
/// Written during pre-filter, read during filter.
#[derive(Default)]
pub struct CycleState {
    storage: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write<T: StateData>(&mut self, key: &str, data: T) {
        self.storage.insert(key.to_string(), Box::new(data));
    }

    pub fn read<T: StateData>(&self, key: &str) -> StateLookup<'_, T> {
        match self.storage.get(key) {
            None => StateLookup::Absent,
            Some(data) => match data.downcast_ref::<T>() {
                Some(data) => StateLookup::Present(data),
                None => StateLookup::WrongShape,
            },
        }
    }
}
