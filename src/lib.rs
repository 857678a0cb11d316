//! Dependency-graph task scheduler with exactly-once parallel execution.
//!
//! This crate schedules named units of work with "must run before"
//! relationships between them. It:
//! - Compiles registered tasks into a compact node table decoupled from the
//!   task objects, validating every declared dependency at build time.
//! - Computes entry nodes (tasks nothing else depends on) as the natural
//!   roots of a depth-first, post-order traversal.
//! - Runs the graph either on the calling thread or across a fixed pool of
//!   worker threads, guaranteeing each node executes exactly once per build
//!   via an atomic claim, even under concurrent traversal.
//!
//! Key modules:
//! - `types`: task identifiers and the pure name-to-identifier hash.
//! - `callable`: `CallableRef`, a fixed-size, non-owning, type-erased
//!   handle to a free function or an instance method, plus the opaque
//!   `UserData` payload.
//! - `task`: named, hashable units of work with dependency sets.
//! - `graph`: the `TaskGraph` builder, the compiled node table, and the
//!   sequential/parallel executors.
//! - `pool`: `WorkerPool`, a fixed-size thread pool with a shared FIFO
//!   queue and blocking drain.
//!
//! Quick start:
//! 1. Create `Task`s, each wrapping a `CallableRef` and optionally a
//!    payload, and declare dependencies by name or identifier.
//! 2. Register them in a `TaskGraph` and call `build`, which fails if a
//!    dependency names an unregistered task.
//! 3. Call `run_sequential`, or submit to a `WorkerPool` with
//!    `run_parallel` and wait on `WorkerPool::drain`.
//!
//! A dependency always finishes before its dependent starts within a
//! traversal, and a node shared by several dependents runs exactly once no
//! matter how many threads reach it. The scheduler does not detect cycles:
//! a cyclic task set builds successfully and executing it has unspecified
//! behavior. Rebuilding is the only way to reset execution state; re-running
//! a fully executed graph is a no-op.

/// Type-erased callables and the opaque user-data payload.
///
/// Defines `CallableRef` (fixed-size, non-owning binding over a free
/// function or an `(instance, method)` pair) and `UserData` (the
/// pointer-sized payload handed back to work items at execution time).
pub mod callable;
/// The task graph: registration, compilation and execution.
///
/// Contains the `TaskGraph` builder with its pending task table, the
/// compiled node table with per-node atomic claim state, entry-node
/// computation, and the sequential and pool-backed executors.
pub mod graph;
/// Fixed-size worker pool with a shared FIFO queue.
///
/// Workers park on an empty queue and wake on submission; `drain` blocks
/// until the submission-based outstanding-work count reaches zero.
pub mod pool;
mod sync;
/// Named, hashable units of work.
///
/// Defines `Task`, which pairs a name-derived identifier with a callable,
/// a payload and a set of dependency identifiers.
pub mod task;
/// Task identifiers and hashing.
///
/// Provides `TaskId` and the pure `task_id` function mapping names to
/// identifiers, usable before the named task is registered.
pub mod types;
