//! Bounded parallel execution.
//!
//! [`run_bounded`] runs every task on its own thread with at most `limit` in flight, and
//! reports each result on the calling thread as soon as it arrives. Completion order is not
//! guaranteed. A panicking task is reported as an `Err` holding the panic message and never
//! stalls the pool.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{mpsc, Arc},
    thread,
};

use tracing::{error, instrument, trace};

use crate::{outcome::panic_message, scheduler::TaskScheduler};

/// Result of one task: its return value, or the message of its panic.
pub type TaskResult<R> = Result<R, String>;

/// Runs `work` on every task with at most `limit` tasks running at once.
///
/// `on_complete(index, result)` is called exactly once per task, on the calling thread, where
/// `index` is the task's position in `tasks`. A zero limit is treated as one. A task whose
/// worker thread cannot be spawned is reported as an `Err`.
#[instrument(skip(tasks, work, on_complete))]
pub fn run_bounded<T, R, W, C>(tasks: Vec<T>, limit: usize, work: W, mut on_complete: C)
where
    T: Send + 'static,
    R: Send + 'static,
    W: Fn(T) -> R + Send + Sync + 'static,
    C: FnMut(usize, TaskResult<R>),
{
    let work = Arc::new(work);
    let mut scheduler = TaskScheduler::new(tasks, limit);
    let (tx_result, rx_result) = mpsc::channel::<(usize, TaskResult<R>)>();

    let spawn = |index: usize, task: T| -> std::io::Result<()> {
        let work = Arc::clone(&work);
        let tx_result = tx_result.clone();
        thread::Builder::new()
            .name(format!("task-{index}"))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| (*work)(task)))
                    .map_err(|payload| panic_message(payload.as_ref()));
                let _ = tx_result.send((index, result));
            })
            .map(|_| ())
    };

    let mut batch = scheduler.advance();
    loop {
        for (index, task) in batch {
            if let Err(e) = spawn(index, task) {
                error!("could not spawn worker for task {index}: {e}");
                let _ = tx_result.send((index, Err(format!("could not spawn worker: {e}"))));
            }
        }
        // not finished <=> some task running <=> a result to receive
        if scheduler.is_finished() {
            break;
        }
        let Ok((index, result)) = rx_result.recv() else {
            error!("result channel closed while tasks were running");
            break;
        };
        trace!(index, ok = result.is_ok(), "task finished");
        on_complete(index, result);
        batch = scheduler.on_result();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[test]
    fn never_exceeds_the_limit() {
        const TASKS: usize = 20;
        const LIMIT: usize = 3;

        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (live_w, peak_w) = (Arc::clone(&live), Arc::clone(&peak));

        let mut seen = vec![false; TASKS];
        run_bounded(
            (0..TASKS).collect(),
            LIMIT,
            move |n: usize| {
                let now = live_w.fetch_add(1, Ordering::SeqCst) + 1;
                peak_w.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5 + (n % 4) as u64 * 3));
                live_w.fetch_sub(1, Ordering::SeqCst);
                n * 2
            },
            |index, result| {
                assert_eq!(result, Ok(index * 2));
                assert!(!seen[index], "task {index} reported twice");
                seen[index] = true;
            },
        );

        assert!(seen.iter().all(|s| *s));
        assert!(peak.load(Ordering::SeqCst) <= LIMIT);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panics_are_reported() {
        let mut results = vec![None; 4];
        run_bounded(
            vec![1, 2, 3, 4],
            2,
            |n: u32| {
                if n == 3 {
                    panic!("three is bad");
                }
                n
            },
            |index, result| results[index] = Some(result),
        );

        assert_eq!(results[0], Some(Ok(1)));
        assert_eq!(results[2], Some(Err("three is bad".to_string())));
        assert_eq!(results[3], Some(Ok(4)));
    }

    #[test]
    fn empty_task_list() {
        let mut calls = 0;
        run_bounded(Vec::<u8>::new(), 2, |n| n, |_, _| calls += 1);
        assert_eq!(calls, 0);
    }
}
