//! Table-level operations, one module per aggregate.

mod analyses;
mod classifications;
mod maintenance;
mod pose_results;
mod training;
