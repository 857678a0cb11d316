use crate::{
    graph::{GraphNode, TaskGraph},
    types::{HashMap, HashSet, TaskId},
};
use rustc_hash::FxBuildHasher;
use thiserror::Error;
use tracing::debug;

/// Error kind for graph compilation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// A task declares a dependency on an identifier that no registered
    /// task has.
    #[error("task `{task}` depends on {dependency:?}, which is not registered")]
    MissingDependency {
        /// Name of the task declaring the dependency.
        task: String,
        /// The identifier missing from the task table.
        dependency: TaskId,
    },
}

impl TaskGraph {
    /// Compile the pending task table into an executable graph.
    ///
    /// For every registered task, one [`GraphNode`] is allocated holding the
    /// task's identity, callable, payload and an owned copy of its
    /// dependency identifiers, with execution state reset to pending. Entry
    /// nodes (nodes no other node depends on) are then recomputed.
    ///
    /// Compilation is all-or-nothing: every referenced dependency is
    /// validated against the task table before any new node becomes
    /// observable, and on failure the previously built graph, if any, stays
    /// intact and executable. On success, the new graph replaces the old one
    /// and all claim state starts over; this is the only way to reset
    /// execution state.
    ///
    /// Cycles are not detected. A cyclic task set still compiles and
    /// produces an entry-node list; executing such a graph has unspecified
    /// behavior and may silently under-execute.
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingDependency`] if a task names a dependency absent
    /// from the pending table.
    pub fn build(&mut self) -> Result<(), BuildError> {
        let mut nodes = HashMap::with_capacity_and_hasher(self.tasks.len(), FxBuildHasher);
        let mut depended_upon = HashSet::with_capacity_and_hasher(self.tasks.len(), FxBuildHasher);

        for (&id, task) in &self.tasks {
            for dependency in task.dependencies() {
                if !self.tasks.contains_key(&dependency) {
                    return Err(BuildError::MissingDependency {
                        task: task.name().to_owned(),
                        dependency,
                    });
                }
                depended_upon.insert(dependency);
            }
            nodes.insert(id, GraphNode::compile(task));
        }

        let entry_nodes: Vec<TaskId> = self
            .tasks
            .keys()
            .filter(|id| !depended_upon.contains(*id))
            .copied()
            .collect();

        debug!(
            nodes = nodes.len(),
            entry_nodes = entry_nodes.len(),
            "task graph built"
        );

        self.nodes = nodes;
        self.entry_nodes = entry_nodes;
        Ok(())
    }
}
