#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use taskdag::callable::{CallableRef, UserData};
use taskdag::graph::{BuildError, TaskGraph};
use taskdag::pool::WorkerPool;
use taskdag::task::Task;
use taskdag::types::task_id;

/// Shared journal of executions, one entry per task invocation.
struct Journal {
    log: Mutex<Vec<&'static str>>,
}

impl Journal {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
        })
    }

    fn entries(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    fn position(&self, name: &str) -> usize {
        self.entries()
            .iter()
            .position(|entry| *entry == name)
            .unwrap_or_else(|| panic!("task `{name}` never executed"))
    }

    fn count_of(&self, name: &str) -> usize {
        self.entries()
            .iter()
            .filter(|&&entry| entry == name)
            .count()
    }
}

struct Probe {
    name: &'static str,
    journal: Arc<Journal>,
}

fn record(data: UserData) {
    // SAFETY: Every probe outlives the run it is registered for.
    let probe = unsafe { data.as_ref::<Probe>() }.unwrap();
    probe.journal.log.lock().unwrap().push(probe.name);
}

/// One probe per name. The vector is fully built before any pointer into it
/// is taken.
fn probes(names: &[&'static str], journal: &Arc<Journal>) -> Vec<Probe> {
    names
        .iter()
        .map(|&name| Probe {
            name,
            journal: Arc::clone(journal),
        })
        .collect()
}

fn recorded_task(name: &'static str, probe: &Probe) -> Task {
    Task::with_data(name, CallableRef::new(record), UserData::from_ref(probe))
}

fn count(data: UserData) {
    // SAFETY: Every counter outlives the run it is registered for.
    let counter = unsafe { data.as_ref::<AtomicUsize>() }.unwrap();
    counter.fetch_add(1, Ordering::Relaxed);
}

fn counted_task(name: &'static str, counter: &AtomicUsize) -> Task {
    Task::with_data(name, CallableRef::new(count), UserData::from_ref(counter))
}

#[test]
fn entry_nodes_and_execution_order() {
    let journal = Journal::new();
    let probes = probes(&["start", "hello", "goodbye", "exit"], &journal);

    let mut graph = TaskGraph::new();
    graph.add_task(recorded_task("start", &probes[0]));
    let mut hello = recorded_task("hello", &probes[1]);
    hello.depends_on("start");
    graph.add_task(hello);
    graph.add_task(recorded_task("goodbye", &probes[2]));
    let mut exit = recorded_task("exit", &probes[3]);
    exit.depends_on("hello");
    exit.depends_on("goodbye");
    graph.add_task(exit);

    graph.build().unwrap();
    assert_eq!(graph.entry_nodes(), [task_id("exit")]);
    assert_eq!(graph.node_count(), 4);

    graph.run_sequential();

    assert_eq!(journal.entries().len(), 4);
    for name in ["start", "hello", "goodbye", "exit"] {
        assert_eq!(journal.count_of(name), 1, "{name}");
    }
    assert!(journal.position("start") < journal.position("hello"));
    assert!(journal.position("hello") < journal.position("exit"));
    assert!(journal.position("goodbye") < journal.position("exit"));
    assert!(graph.is_finished());
}

#[test]
fn diamond_runs_shared_dependency_once() {
    let journal = Journal::new();
    let probes = probes(&["a", "b", "c", "d"], &journal);

    let mut graph = TaskGraph::new();
    let mut a = recorded_task("a", &probes[0]);
    a.depends_on("b");
    a.depends_on("c");
    let mut b = recorded_task("b", &probes[1]);
    b.depends_on("d");
    let mut c = recorded_task("c", &probes[2]);
    c.depends_on("d");
    graph.add_task(a);
    graph.add_task(b);
    graph.add_task(c);
    graph.add_task(recorded_task("d", &probes[3]));

    graph.build().unwrap();
    assert_eq!(graph.entry_nodes(), [task_id("a")]);

    graph.run_sequential();

    for name in ["a", "b", "c", "d"] {
        assert_eq!(journal.count_of(name), 1, "{name}");
    }
    assert!(journal.position("d") < journal.position("b"));
    assert!(journal.position("d") < journal.position("c"));
    assert!(journal.position("b") < journal.position("a"));
    assert!(journal.position("c") < journal.position("a"));
}

#[test]
fn missing_dependency_fails_build_and_keeps_prior_graph() {
    let done = AtomicUsize::new(0);

    let mut graph = TaskGraph::new();
    graph.add_task(counted_task("solid", &done));
    graph.build().unwrap();

    let mut broken = counted_task("broken", &done);
    broken.depends_on("missing");
    graph.add_task(broken);

    let err = graph.build().unwrap_err();
    match &err {
        BuildError::MissingDependency { task, dependency } => {
            assert_eq!(task, "broken");
            assert_eq!(*dependency, task_id("missing"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("broken"));

    // The failed build must not have replaced the compiled graph.
    assert_eq!(graph.node_count(), 1);
    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 1);
}

#[test]
fn reregistration_is_last_write_wins() {
    let first = AtomicUsize::new(0);
    let second = AtomicUsize::new(0);

    let mut graph = TaskGraph::new();
    graph.add_task(counted_task("job", &first));
    graph.add_task(counted_task("job", &second));
    assert_eq!(graph.task_count(), 1);

    graph.build().unwrap();
    graph.run_sequential();

    assert_eq!(first.load(Ordering::Relaxed), 0);
    assert_eq!(second.load(Ordering::Relaxed), 1);
}

#[test]
fn rerun_without_rebuild_is_a_noop() {
    let done = AtomicUsize::new(0);

    let mut graph = TaskGraph::new();
    graph.add_task(counted_task("once", &done));
    graph.build().unwrap();

    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 1);
    assert!(graph.is_finished());

    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 1);
}

#[test]
fn rebuild_resets_execution_state() {
    let done = AtomicUsize::new(0);

    let mut graph = TaskGraph::new();
    let mut dependent = counted_task("dependent", &done);
    dependent.depends_on("base");
    graph.add_task(dependent);
    graph.add_task(counted_task("base", &done));

    graph.build().unwrap();
    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 2);

    // Unchanged task set; a rebuild alone resets every claim.
    graph.build().unwrap();
    assert!(!graph.is_finished());
    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 4);
}

#[test]
fn removing_a_depended_upon_task_fails_next_build() {
    let done = AtomicUsize::new(0);

    let mut graph = TaskGraph::new();
    graph.add_task(counted_task("base", &done));
    let mut dependent = counted_task("dependent", &done);
    dependent.depends_on("base");
    graph.add_task(dependent);

    graph.remove_task("not-registered");
    assert_eq!(graph.task_count(), 2);

    graph.remove_task("base");
    assert_eq!(graph.task_count(), 1);
    assert!(graph.task(task_id("base")).is_none());
    assert!(graph.task(task_id("dependent")).is_some());
    assert!(matches!(
        graph.build(),
        Err(BuildError::MissingDependency { .. })
    ));

    graph.add_task(counted_task("base", &done));
    graph.build().unwrap();
    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 2);
}

#[test]
fn tasks_added_after_build_need_a_rebuild() {
    let done = AtomicUsize::new(0);

    let mut graph = TaskGraph::new();
    graph.add_task(counted_task("compiled", &done));
    graph.build().unwrap();

    graph.add_task(counted_task("late", &done));
    assert_eq!(graph.node_count(), 1);

    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 1);

    graph.build().unwrap();
    graph.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 3);
}

#[test]
fn empty_and_unbuilt_graphs_run_as_noops() {
    let mut graph = TaskGraph::new();
    graph.run_sequential();
    graph.build().unwrap();
    graph.run_sequential();
    assert_eq!(graph.node_count(), 0);
    assert!(graph.entry_nodes().is_empty());
    assert!(graph.is_finished());

    let done = AtomicUsize::new(0);
    let mut unbuilt = TaskGraph::new();
    unbuilt.add_task(counted_task("pending", &done));
    unbuilt.run_sequential();
    assert_eq!(done.load(Ordering::Relaxed), 0);
}

#[test]
fn parallel_run_executes_shared_dependencies_exactly_once() {
    const TRIALS: usize = 100;
    let names = ["e0", "e1", "e2", "e3", "m0", "m1", "base"];

    let pool = WorkerPool::new(4);
    let counters: Vec<AtomicUsize> = names.iter().map(|_| AtomicUsize::new(0)).collect();

    let mut graph = TaskGraph::new();
    for (&name, counter) in names.iter().zip(&counters) {
        let mut task = counted_task(name, counter);
        match name {
            "e0" | "e1" | "e2" | "e3" => {
                task.depends_on("m0");
                task.depends_on("m1");
            }
            "m0" | "m1" => task.depends_on("base"),
            _ => {}
        }
        graph.add_task(task);
    }

    for trial in 1..=TRIALS {
        graph.build().unwrap();
        assert_eq!(graph.entry_nodes().len(), 4);
        // SAFETY: The graph stays alive and untouched until the drain below
        // returns; counters outlive the pool.
        unsafe { graph.run_parallel(&pool) };
        pool.drain();
        assert!(graph.is_finished());
        for (name, counter) in names.iter().zip(&counters) {
            assert_eq!(counter.load(Ordering::Relaxed), trial, "{name}");
        }
    }
}

#[test]
fn parallel_run_orders_dependencies_within_a_traversal() {
    let journal = Journal::new();
    let probes = probes(&["start", "hello", "goodbye", "exit"], &journal);

    let pool = WorkerPool::new(2);
    let mut graph = TaskGraph::new();
    graph.add_task(recorded_task("start", &probes[0]));
    let mut hello = recorded_task("hello", &probes[1]);
    hello.depends_on("start");
    graph.add_task(hello);
    graph.add_task(recorded_task("goodbye", &probes[2]));
    let mut exit = recorded_task("exit", &probes[3]);
    exit.depends_on("hello");
    exit.depends_on("goodbye");
    graph.add_task(exit);
    graph.build().unwrap();

    // SAFETY: The graph stays alive and untouched until the drain below
    // returns; probes outlive the pool.
    unsafe { graph.run_parallel(&pool) };
    pool.drain();

    assert_eq!(journal.entries().len(), 4);
    assert!(journal.position("start") < journal.position("hello"));
    assert!(journal.position("hello") < journal.position("exit"));
    assert!(journal.position("goodbye") < journal.position("exit"));
}

struct Gate {
    release: Mutex<mpsc::Receiver<()>>,
}

fn wait_for_gate(data: UserData) {
    // SAFETY: The gate outlives the run it is registered for.
    let gate = unsafe { data.as_ref::<Gate>() }.unwrap();
    gate.release.lock().unwrap().recv().unwrap();
}

#[test]
fn parallel_run_returns_before_work_completes() {
    let (sender, receiver) = mpsc::channel();
    let gate = Gate {
        release: Mutex::new(receiver),
    };

    let pool = WorkerPool::new(1);
    let mut graph = TaskGraph::new();
    graph.add_task(Task::with_data(
        "gated",
        CallableRef::new(wait_for_gate),
        UserData::from_ref(&gate),
    ));
    graph.build().unwrap();

    // Returns while the submitted work is still blocked on the gate; a
    // blocking submission would deadlock here.
    // SAFETY: The graph stays alive and untouched until the drain below
    // returns; the gate outlives the pool.
    unsafe { graph.run_parallel(&pool) };
    // Counted at submission, whether the worker has dequeued it or not.
    assert_eq!(pool.pending(), 1);
    sender.send(()).unwrap();
    pool.drain();
    assert_eq!(pool.pending(), 0);
    assert!(graph.is_finished());
}
