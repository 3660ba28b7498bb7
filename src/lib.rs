pub mod config;
pub mod controllers;
pub mod errors;
mod node_reserve;
pub mod reservation;
pub mod scheduler;
pub mod spec;

#[cfg(test)]
mod test_helpers;

pub use node_reserve::node_reserve;
