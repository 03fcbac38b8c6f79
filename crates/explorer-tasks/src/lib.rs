//! Task orchestration for the Project Explorer build.
//!
//! Tasks are registered by name with the names of the tasks that must finish
//! before them. Registration rejects cycles immediately; running a target
//! executes its transitive predecessors in waves, each task at most once.

mod graph;
mod runner;

pub use graph::{Task, TaskError, TaskGraph, TaskGraphBuilder, TaskListing};
pub use runner::{FailurePolicy, RunReport, Runner, TaskExecutor};
