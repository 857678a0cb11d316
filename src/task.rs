use crate::{
    callable::{CallableRef, UserData},
    types::{task_id, HashSet, TaskId},
};
use derive_more::Debug;

/// A named unit of work.
///
/// A task pairs a human-readable name (hashed once into a [`TaskId`] at
/// construction) with the callable to run, an opaque payload to pass to it,
/// and the set of identifiers of the tasks that must run before it. Tasks
/// carry no execution state; that lives in the node table compiled by
/// [`TaskGraph::build`](crate::graph::TaskGraph::build).
///
/// Dependencies may be added incrementally until the task is handed to the
/// graph; its identity never changes.
#[must_use]
#[derive(Debug, Clone)]
pub struct Task {
    name: String,
    id: TaskId,
    #[debug(skip)]
    work: CallableRef,
    #[debug(skip)]
    data: UserData,
    dependencies: HashSet<TaskId>,
}

impl Task {
    /// Create a task with no payload.
    pub fn new(name: impl Into<String>, work: CallableRef) -> Self {
        Self::with_data(name, work, UserData::NONE)
    }

    /// Create a task whose callable receives `data` on execution.
    pub fn with_data(name: impl Into<String>, work: CallableRef, data: UserData) -> Self {
        let name = name.into();
        let id = task_id(&name);
        Self {
            name,
            id,
            work,
            data,
            dependencies: HashSet::default(),
        }
    }

    /// Name of the task.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the task, derived from its name.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Payload passed to the callable on execution.
    #[must_use]
    pub fn data(&self) -> UserData {
        self.data
    }

    /// The callable run when the task executes.
    pub fn work(&self) -> CallableRef {
        self.work
    }

    /// Identifiers of the tasks this one waits on, in no particular order.
    pub fn dependencies(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.dependencies.iter().copied()
    }

    /// Number of declared dependencies.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Declare that the task named `name` must run before this one.
    ///
    /// The name is hashed internally; the referenced task does not need to
    /// be registered yet. Declaring the same dependency twice is a no-op.
    pub fn depends_on(&mut self, name: &str) {
        self.depends_on_id(task_id(name));
    }

    /// Declare that the task identified by `id` must run before this one.
    pub fn depends_on_id(&mut self, id: TaskId) {
        self.dependencies.insert(id);
    }

    /// Invoke the task's callable with `data`.
    ///
    /// # Panics
    ///
    /// Panics if the task was constructed with an unbound [`CallableRef`].
    pub fn execute(&self, data: UserData) {
        self.work.invoke(data);
    }
}
