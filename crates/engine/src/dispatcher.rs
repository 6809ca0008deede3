//! Dispatcher — the single routing authority between producers and the
//! worker pool.
//!
//! Routing contract for serialized items: a path counts as busy while it
//! has items assigned, queued, or running anywhere in the pool. A second
//! serialized item for a busy path goes to the same worker's private
//! queue, guaranteeing at most one concurrent execution per path. When
//! no worker is idle the dispatcher blocks on completions rather than
//! dropping the item; only a full private queue drops work.

use std::collections::HashMap;
use std::sync::Arc;

use sundial_domain::work_item::WorkItem;
use tokio::sync::mpsc;

use crate::stats::EngineStats;
use crate::worker::Completion;

/// In-flight bookkeeping for one serialized path.
struct Assignment {
    worker: usize,
    /// Items assigned, queued, or running. The entry is dropped when
    /// this reaches zero.
    pending: usize,
}

enum DispatcherState {
    AwaitItem,
    Route(WorkItem),
    AwaitIdle(WorkItem),
}

pub(crate) struct Dispatcher {
    work_rx: mpsc::Receiver<WorkItem>,
    completion_rx: mpsc::Receiver<Completion>,
    workers: Vec<mpsc::Sender<WorkItem>>,
    /// Items assigned but not yet completed, per worker. A worker is
    /// idle when its count is zero.
    outstanding: Vec<usize>,
    assignments: HashMap<String, Assignment>,
    stats: Arc<EngineStats>,
}

impl Dispatcher {
    pub(crate) fn new(
        work_rx: mpsc::Receiver<WorkItem>,
        completion_rx: mpsc::Receiver<Completion>,
        workers: Vec<mpsc::Sender<WorkItem>>,
        stats: Arc<EngineStats>,
    ) -> Self {
        let outstanding = vec![0; workers.len()];
        Self {
            work_rx,
            completion_rx,
            workers,
            outstanding,
            assignments: HashMap::new(),
            stats,
        }
    }

    /// Drive the state machine until every producer has dropped its
    /// sender. Worker queues are closed by dropping `self` afterwards,
    /// which lets the workers drain and exit.
    pub(crate) async fn run(mut self) {
        let mut state = DispatcherState::AwaitItem;
        loop {
            state = match state {
                DispatcherState::AwaitItem => tokio::select! {
                    item = self.work_rx.recv() => match item {
                        Some(item) => DispatcherState::Route(item),
                        None => break,
                    },
                    completion = self.completion_rx.recv() => {
                        match completion {
                            Some(completion) => self.complete(completion),
                            None => break,
                        }
                        DispatcherState::AwaitItem
                    }
                },
                DispatcherState::Route(item) => self.route(item),
                DispatcherState::AwaitIdle(item) => match self.completion_rx.recv().await {
                    Some(completion) => {
                        self.complete(completion);
                        DispatcherState::Route(item)
                    }
                    None => break,
                },
            };
        }
        tracing::debug!("dispatcher exited");
    }

    fn route(&mut self, item: WorkItem) -> DispatcherState {
        if item.serialized {
            let key = item.path.key();
            if let Some(assignment) = self.assignments.get_mut(&key) {
                let worker = assignment.worker;
                match self.workers[worker].try_send(item) {
                    Ok(()) => {
                        assignment.pending += 1;
                        self.outstanding[worker] += 1;
                    }
                    Err(error) => {
                        let item = error.into_inner();
                        tracing::warn!(
                            path = %item.path,
                            worker,
                            "serialized queue full, dropping item",
                        );
                        self.stats.record_dropped();
                    }
                }
                return DispatcherState::AwaitItem;
            }
        }
        let Some(worker) = self.outstanding.iter().position(|&count| count == 0) else {
            return DispatcherState::AwaitIdle(item);
        };
        let serialized_key = item.serialized.then(|| item.path.key());
        match self.workers[worker].try_send(item) {
            Ok(()) => {
                self.outstanding[worker] += 1;
                if let Some(key) = serialized_key {
                    self.assignments.insert(key, Assignment { worker, pending: 1 });
                }
            }
            Err(error) => {
                // An idle worker's queue is empty, so this only fires
                // when the worker is gone.
                tracing::warn!(path = %error.into_inner().path, worker, "worker queue unavailable, dropping item");
                self.stats.record_dropped();
            }
        }
        DispatcherState::AwaitItem
    }

    fn complete(&mut self, completion: Completion) {
        self.outstanding[completion.worker] = self.outstanding[completion.worker].saturating_sub(1);
        if let Some(key) = completion.serialized_key
            && let Some(assignment) = self.assignments.get_mut(&key)
        {
            assignment.pending -= 1;
            if assignment.pending == 0 {
                self.assignments.remove(&key);
            }
        }
    }
}
