use std::collections::VecDeque;

use tracing::trace;

/// Admits tasks in submission order while fewer than `limit` are running.
///
/// The scheduler never runs anything itself: [`advance`](Self::advance) and
/// [`on_result`](Self::on_result) return the tasks the caller must start now.
pub(crate) struct TaskScheduler<T> {
    pending: VecDeque<(usize, T)>,
    limit: usize,
    running: usize,
    completed: usize,
    total: usize,
}

impl<T> TaskScheduler<T> {
    /// A scheduler over `tasks`, indexed by submission order. A zero limit is treated as one.
    pub fn new(tasks: impl IntoIterator<Item = T>, limit: usize) -> Self {
        let pending: VecDeque<_> = tasks.into_iter().enumerate().collect();
        TaskScheduler {
            total: pending.len(),
            pending,
            limit: limit.max(1),
            running: 0,
            completed: 0,
        }
    }

    /// Tasks to start now.
    pub fn advance(&mut self) -> Vec<(usize, T)> {
        let mut to_run = vec![];
        while self.running < self.limit {
            let Some(task) = self.pending.pop_front() else {
                break;
            };
            to_run.push(task);
            self.running += 1;
        }
        trace!(
            started = to_run.len(),
            running = self.running,
            pending = self.pending.len()
        );
        to_run
    }

    /// Records one finished task and returns the tasks it frees room for.
    pub fn on_result(&mut self) -> Vec<(usize, T)> {
        self.running = self.running.saturating_sub(1);
        self.completed += 1;
        self.advance()
    }

    /// Every task ran and reported.
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}
