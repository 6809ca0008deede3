//! Worker — executes work items from its private queue.
//!
//! Each worker is an explicit state machine driven by one loop:
//! `WaitForWork -> Process -> Reset -> WaitForWork`. Action failures are
//! caught and counted per item; a panicking action is isolated in its
//! own task so the worker itself survives and resets.

use std::sync::Arc;

use sundial_domain::work_item::{WorkItem, WorkItemKind};
use tokio::sync::mpsc;

use crate::ports::{ActionEngine, Invocation};
use crate::stats::EngineStats;

/// Sent to the dispatcher after every processed item so it can keep its
/// idle and serialization bookkeeping current.
#[derive(Debug)]
pub(crate) struct Completion {
    pub worker: usize,
    /// Present for serialized items: the path key whose assignment
    /// count should be decremented.
    pub serialized_key: Option<String>,
}

enum WorkerState {
    WaitForWork,
    Process(WorkItem),
    Reset(Completion),
}

pub(crate) struct Worker<A> {
    index: usize,
    action_engine: Arc<A>,
    stats: Arc<EngineStats>,
}

impl<A: ActionEngine + Send + Sync + 'static> Worker<A> {
    pub(crate) fn new(index: usize, action_engine: Arc<A>, stats: Arc<EngineStats>) -> Self {
        Self {
            index,
            action_engine,
            stats,
        }
    }

    /// Drive the state machine until the queue is closed and drained.
    pub(crate) async fn run(
        self,
        mut queue: mpsc::Receiver<WorkItem>,
        completions: mpsc::Sender<Completion>,
    ) {
        let mut state = WorkerState::WaitForWork;
        loop {
            state = match state {
                WorkerState::WaitForWork => match queue.recv().await {
                    Some(item) => WorkerState::Process(item),
                    None => break,
                },
                WorkerState::Process(item) => WorkerState::Reset(self.process(item).await),
                WorkerState::Reset(completion) => {
                    // Err means the dispatcher already exited; keep
                    // draining the local queue regardless.
                    let _ = completions.send(completion).await;
                    match queue.try_recv() {
                        Ok(item) => WorkerState::Process(item),
                        Err(mpsc::error::TryRecvError::Empty) => WorkerState::WaitForWork,
                        Err(mpsc::error::TryRecvError::Disconnected) => break,
                    }
                }
            };
        }
        tracing::debug!(worker = self.index, "worker exited");
    }

    async fn process(&self, item: WorkItem) -> Completion {
        let serialized_key = item.serialized.then(|| item.path.key());
        let path = item.path.clone();
        let invocation = match item.kind {
            WorkItemKind::Scheduled => Invocation::Scheduled,
            WorkItemKind::Triggered => Invocation::Triggered,
        };
        if item.loggable {
            tracing::info!(%path, %invocation, worker = self.index, "executing event");
        }
        let action_engine = Arc::clone(&self.action_engine);
        // Run the action in its own task so a panicking action engine
        // cannot take the worker loop down with it.
        let task = tokio::spawn(async move {
            action_engine
                .invoke(&item.path, invocation, item.payload.as_ref())
                .await
        });
        match task.await {
            Ok(Ok(())) => self.stats.record_executed(),
            Ok(Err(error)) => {
                tracing::warn!(%path, %invocation, %error, "event action failed");
                self.stats.record_failed();
            }
            Err(join_error) => {
                if join_error.is_panic() {
                    tracing::error!(%path, %invocation, "event action panicked");
                }
                self.stats.record_failed();
            }
        }
        Completion {
            worker: self.index,
            serialized_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sundial_domain::error::SundialError;
    use sundial_domain::path::EventPath;
    use sundial_domain::payload::EventPayload;
    use sundial_domain::work_item::WorkItem;
    use tokio::sync::mpsc;

    use crate::ports::{ActionEngine, Invocation};
    use crate::stats::EngineStats;

    use super::Worker;

    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    struct FakeEngine {
        invoked: AtomicUsize,
        behavior: Behavior,
    }

    impl FakeEngine {
        fn new(behavior: Behavior) -> Self {
            Self {
                invoked: AtomicUsize::new(0),
                behavior,
            }
        }
    }

    impl ActionEngine for FakeEngine {
        async fn invoke(
            &self,
            _path: &EventPath,
            _invocation: Invocation,
            _payload: Option<&EventPayload>,
        ) -> Result<(), SundialError> {
            self.invoked.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => Err(SundialError::Engine("action failed".to_string())),
                Behavior::Panic => panic!("action panicked"),
            }
        }
    }

    fn item(raw: &str) -> WorkItem {
        WorkItem::scheduled(EventPath::parse(raw).unwrap())
    }

    async fn run_items(behavior: Behavior, items: Vec<WorkItem>) -> (Arc<FakeEngine>, Arc<EngineStats>, usize) {
        let engine = Arc::new(FakeEngine::new(behavior));
        let stats = Arc::new(EngineStats::default());
        let (queue_tx, queue_rx) = mpsc::channel(16);
        let (completion_tx, mut completion_rx) = mpsc::channel(16);
        let worker = Worker::new(0, Arc::clone(&engine), Arc::clone(&stats));
        let task = tokio::spawn(worker.run(queue_rx, completion_tx));
        let count = items.len();
        for item in items {
            queue_tx.send(item).await.unwrap();
        }
        let mut completions = 0;
        while completions < count {
            completion_rx.recv().await.unwrap();
            completions += 1;
        }
        drop(queue_tx);
        task.await.unwrap();
        (engine, stats, completions)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_process_items_and_report_completions() {
        let (engine, stats, completions) =
            run_items(Behavior::Succeed, vec![item("/a"), item("/b")]).await;
        assert_eq!(engine.invoked.load(Ordering::SeqCst), 2);
        assert_eq!(completions, 2);
        assert_eq!(stats.snapshot().executed, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_survive_failing_action() {
        let (engine, stats, _) =
            run_items(Behavior::Fail, vec![item("/a"), item("/b"), item("/c")]).await;
        assert_eq!(engine.invoked.load(Ordering::SeqCst), 3);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.failed, 3);
        assert_eq!(snapshot.executed, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_survive_panicking_action() {
        let (engine, stats, completions) =
            run_items(Behavior::Panic, vec![item("/a"), item("/b")]).await;
        assert_eq!(engine.invoked.load(Ordering::SeqCst), 2);
        assert_eq!(completions, 2);
        assert_eq!(stats.snapshot().failed, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_tag_completion_with_serialized_key() {
        let engine = Arc::new(FakeEngine::new(Behavior::Succeed));
        let stats = Arc::new(EngineStats::default());
        let (queue_tx, queue_rx) = mpsc::channel(4);
        let (completion_tx, mut completion_rx) = mpsc::channel(4);
        let worker = Worker::new(3, engine, stats);
        let task = tokio::spawn(worker.run(queue_rx, completion_tx));

        let mut serialized = item("/Siren/Main");
        serialized.serialized = true;
        queue_tx.send(serialized).await.unwrap();
        let completion = completion_rx.recv().await.unwrap();
        assert_eq!(completion.worker, 3);
        assert_eq!(completion.serialized_key.as_deref(), Some("/siren/main"));

        drop(queue_tx);
        task.await.unwrap();
    }
}
