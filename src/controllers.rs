pub mod node_lister;
pub mod reservation;
pub mod work_queue;
