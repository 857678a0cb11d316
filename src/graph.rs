mod build;
mod execute;

/// Error returned by `TaskGraph::build` when the pending task set is
/// inconsistent.
pub use crate::graph::build::BuildError;
use crate::{
    callable::{CallableRef, UserData},
    sync::{AtomicU8, Ordering},
    task::Task,
    types::{task_id, HashMap, IndexMap, TaskId},
};
use derive_more::Debug;

/// Execution states of a compiled node, held in [`GraphNode::state`].
///
/// `PENDING -> CLAIMED` is a compare-and-swap won by exactly one visit per
/// build; `CLAIMED -> COMPLETED` is a plain store by the winner. Only a
/// rebuild resets a node to `PENDING`.
const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const COMPLETED: u8 = 2;

/// Compiled, execution-time representation of one registered task.
///
/// Nodes are created by [`TaskGraph::build`] and are read-only for the
/// duration of a run except for their own `state` word, which is the single
/// point of mutation during execution.
#[must_use]
#[derive(Debug)]
pub(crate) struct GraphNode {
    task_id: TaskId,
    #[debug(skip)]
    work: CallableRef,
    #[debug(skip)]
    data: UserData,
    /// Identifiers this node waits on, copied from the task's dependency
    /// set. Order carries no meaning.
    dependencies: Vec<TaskId>,
    state: AtomicU8,
}

impl GraphNode {
    fn compile(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            work: task.work(),
            data: task.data(),
            dependencies: task.dependencies().collect(),
            state: AtomicU8::new(PENDING),
        }
    }

    /// Claim the node for execution.
    ///
    /// Exactly one visit per build wins this transition, whether visits race
    /// from different dependents or from different worker threads; every
    /// other visit observes the claim and backs off without re-running the
    /// task or re-visiting its dependencies.
    fn claim(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CLAIMED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn complete(&self) {
        self.state.store(COMPLETED, Ordering::Release);
    }

    fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED
    }
}

/// Dependency-graph task scheduler.
///
/// Tasks are registered into a pending table, compiled into an executable
/// node table by [`TaskGraph::build`], and run either on the calling thread
/// ([`TaskGraph::run_sequential`]) or across a fixed worker pool
/// ([`TaskGraph::run_parallel`]). Each node executes exactly once per build
/// no matter how many other nodes depend on it or how many threads reach it
/// concurrently.
///
/// *Entry nodes* are the nodes no other node depends on: the final targets
/// whose execution transitively pulls in everything they need. They are
/// recomputed on every build.
///
/// Registering or removing tasks after a build does not affect the compiled
/// graph; call [`TaskGraph::build`] again before the next run. A stale graph
/// must never be executed.
#[must_use]
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: IndexMap<TaskId, Task>,
    nodes: HashMap<TaskId, GraphNode>,
    entry_nodes: Vec<TaskId>,
}

impl TaskGraph {
    /// An empty scheduler with no registered tasks and no compiled graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, keyed by its identifier.
    ///
    /// Registering a task whose identifier is already present replaces the
    /// prior entry. Last write wins; this is the intended re-registration
    /// behavior, not an error.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.insert(task.id(), task);
    }

    /// Remove the task named `name` from the pending table.
    ///
    /// No-op if no such task is registered. A previously built graph is not
    /// affected; tasks that still name the removed identifier as a
    /// dependency will fail the next [`TaskGraph::build`].
    pub fn remove_task(&mut self, name: &str) {
        self.remove_task_id(task_id(name));
    }

    /// Remove the task identified by `id` from the pending table.
    ///
    /// No-op if no such task is registered.
    pub fn remove_task_id(&mut self, id: TaskId) {
        self.tasks.swap_remove(&id);
    }

    /// The registered task with identifier `id`, if any.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Number of registered tasks in the pending table.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Identifiers of the entry nodes of the most recent build.
    ///
    /// Empty if the graph has never been built.
    #[must_use]
    pub fn entry_nodes(&self) -> &[TaskId] {
        &self.entry_nodes
    }

    /// Number of nodes in the most recently built graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether every node of the most recent build has finished executing.
    ///
    /// Trivially true for an empty or never-built graph.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.nodes.values().all(GraphNode::is_completed)
    }
}
