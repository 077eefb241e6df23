//! Dependency graph: builder, topological sort and cycle validation.
//!
//! The graph is derived state. It is rebuilt from the task tree whenever the
//! tree shape or the relation set changes and is never edited in place.

mod builder;
mod sorting;
mod validate;

pub use builder::DependencyGraph;
pub use sorting::{topological_sort, GraphError};
pub use validate::{check_move, check_predecessor, CycleError};
