use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};

type Task = Box<dyn FnOnce() + Send>;

/// Fixed pool of worker threads consuming scheduler tasks from a channel.
/// Dropping the pool closes the channel and joins every worker.
pub(crate) struct WorkerPool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn new(worker_count: usize) -> Self {
        let (sender, receiver) = unbounded::<Task>();

        let mut workers = Vec::with_capacity(worker_count);
        for worker_index in 0..worker_count {
            let receiver = receiver.clone();
            let worker = thread::Builder::new()
                .name(format!("rewind-worker-{worker_index}"))
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        task();
                    }
                })
                .unwrap_or_else(|error| panic!("failed to spawn worker thread: {error}"));
            workers.push(worker);
        }

        Self {
            sender: Some(sender),
            workers,
        }
    }

    pub(crate) fn execute(&self, task: Task) {
        if let Some(sender) = &self.sender {
            // send only fails when every receiver is gone, i.e. during teardown
            let _ = sender.send(task);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
