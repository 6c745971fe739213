pub mod graph;
pub mod plan;
pub mod record;
pub mod target;
