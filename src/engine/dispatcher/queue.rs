use std::{collections::{HashMap, VecDeque, hash_map::Entry}, sync::{Arc, atomic::{AtomicU64, Ordering}}};

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};

use crate::engine::commands::{commands::CommandDescriptor, invocation::ParsedInvocation};

pub type Job = BoxFuture<'static, ()>;

/// Shared execution slots for async commands. Unbounded when built without a limit.
#[derive(Clone, Default)]
pub struct WorkerPool {
    permits: Option<Arc<Semaphore>>,
}

impl WorkerPool {
    pub fn new(max_workers: Option<usize>) -> Self {
        WorkerPool { permits: max_workers.map(|n| Arc::new(Semaphore::new(n.max(1)))) }
    }

    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.permits {
            Some(permits) => permits.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    pub fn spawn(&self, job: Job) {
        let pool = self.clone();
        tokio::spawn(async move {
            let _permit = pool.acquire().await;
            job.await;
        });
    }
}

pub struct QueueEntry {
    pub command: Arc<CommandDescriptor>,
    pub invocation: Arc<ParsedInvocation>,
    pub order: u64,
    job: Job,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainStats {
    pub active_queues: usize,
    pub pending: usize,
    pub enqueued: u64,
    pub drains_started: u64,
    pub executed: u64,
    pub failed: u64,
}

/// FIFO queues per ordering key, each drained by exactly one task.
///
/// A key is present while its drain task runs. The drain task removes it under the same
/// lock `enqueue` appends under, and only after finding the queue empty.
pub struct OrderedQueues {
    queues: Mutex<HashMap<String, VecDeque<QueueEntry>>>,
    sequence: AtomicU64,
    drains: AtomicU64,
    pool: WorkerPool,
}

impl OrderedQueues {
    pub fn new(pool: WorkerPool) -> Self {
        OrderedQueues {
            queues: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            drains: AtomicU64::new(0),
            pool,
        }
    }

    /// Appends a job for `key`, starting a drain task if none is running. Returns the
    /// job's enqueue order.
    pub async fn enqueue(self: &Arc<Self>, key: String, command: Arc<CommandDescriptor>, invocation: Arc<ParsedInvocation>, job: Job) -> u64 {
        let mut queues = self.queues.lock().await;
        let order = self.sequence.fetch_add(1, Ordering::SeqCst);
        let entry = QueueEntry { command, invocation, order, job };

        let created = match queues.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().push_back(entry);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(VecDeque::from([entry]));
                true
            }
        };
        drop(queues);

        if created {
            self.drains.fetch_add(1, Ordering::SeqCst);
            debug!("Starting drain for ordering key `{}`", key);
            tokio::spawn(self.clone().drain(key));
        }

        order
    }

    async fn drain(self: Arc<Self>, key: String) {
        loop {
            let entry = {
                let mut queues = self.queues.lock().await;
                let Some(queue) = queues.get_mut(&key) else {
                    break;
                };
                match queue.pop_front() {
                    Some(entry) => entry,
                    None => {
                        queues.remove(&key);
                        break;
                    }
                }
            };

            trace!("Running `{}` #{} for key `{}`", entry.command.path, entry.order, key);
            let _permit = self.pool.acquire().await;
            entry.job.await;
        }

        debug!("Drain for ordering key `{}` finished", key);
    }

    pub async fn snapshot(&self) -> (usize, usize) {
        let queues = self.queues.lock().await;
        (queues.len(), queues.values().map(VecDeque::len).sum())
    }

    pub fn enqueued(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn drains_started(&self) -> u64 {
        self.drains.load(Ordering::SeqCst)
    }
}
