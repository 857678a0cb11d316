use crate::{
    callable::{CallableRef, UserData},
    graph::{GraphNode, TaskGraph},
    pool::WorkerPool,
};
use tracing::{debug, trace};

impl TaskGraph {
    /// Execute the most recently built graph on the calling thread.
    ///
    /// Each entry node is visited depth-first in post-order: a node's
    /// dependencies execute before the node itself. Dependencies of one node
    /// are visited in their listed order, but that order carries no meaning
    /// and independent siblings may be reordered by a future build; callers
    /// must not rely on it.
    ///
    /// Every node executes at most once per build. Running an already fully
    /// executed graph again is a no-op; rebuild to reset execution state.
    /// Running a never-built graph is likewise a no-op.
    pub fn run_sequential(&self) {
        debug!(entry_nodes = self.entry_nodes.len(), "sequential run");
        for id in &self.entry_nodes {
            self.visit(&self.nodes[id]);
        }
    }

    /// Execute the most recently built graph on a worker pool.
    ///
    /// One unit of work per entry node is submitted to `pool`, then this
    /// function returns without waiting; call [`WorkerPool::drain`] to
    /// observe completion. A dependency shared between entry-node subtrees
    /// runs synchronously on whichever worker reaches it first; the atomic
    /// claim on each node guarantees it cannot run twice even when several
    /// workers reach it concurrently.
    ///
    /// # Safety
    ///
    /// The submitted work holds pointers to this graph and its nodes. Until
    /// `pool.drain()` returns, the graph must not be moved, mutated
    /// (including [`TaskGraph::add_task`]/[`TaskGraph::build`]) or dropped,
    /// and every instance and payload bound into the registered tasks must
    /// satisfy the liveness contract of [`CallableRef::bound`] for the
    /// pool's threads.
    pub unsafe fn run_parallel(&self, pool: &WorkerPool) {
        debug!(
            entry_nodes = self.entry_nodes.len(),
            workers = pool.worker_count(),
            "parallel run"
        );
        // SAFETY: The caller keeps the graph alive and unmoved until the
        // pool drains, which bounds the lifetime of every invocation of
        // this binding.
        let work = unsafe { CallableRef::bound(self, Self::visit_entry) };
        for id in &self.entry_nodes {
            pool.submit(work, UserData::from_ref(&self.nodes[id]));
        }
    }

    /// Pool-side entry point: one submitted unit of work per entry node.
    fn visit_entry(&self, data: UserData) {
        // SAFETY: `run_parallel` created `data` from a node of this graph,
        // and its contract keeps the node table alive and unmodified until
        // the pool drains.
        let node = unsafe { data.as_ref::<GraphNode>() }.expect("TaskGraph::visit_entry: no node");
        self.visit(node);
    }

    fn visit(&self, node: &GraphNode) {
        if !node.claim() {
            // Claimed by another visit, possibly on another thread. Its
            // dependencies are that visit's responsibility.
            return;
        }
        trace!(task = ?node.task_id, "claimed");
        for dependency in &node.dependencies {
            // Present by construction: `build` validated every dependency
            // against the task table.
            self.visit(&self.nodes[dependency]);
        }
        node.work.invoke(node.data);
        node.complete();
        trace!(task = ?node.task_id, "completed");
    }
}
