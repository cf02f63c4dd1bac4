use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Single-threaded source of delayed and repeating continuations.
pub trait Scheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle;
    fn schedule_repeating(&self, period: Duration, task: Box<dyn FnMut()>) -> TaskHandle;
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle {
        (**self).schedule_once(delay, task)
    }

    fn schedule_repeating(&self, period: Duration, task: Box<dyn FnMut()>) -> TaskHandle {
        (**self).schedule_repeating(period, task)
    }
}

/// Cancels a scheduled task. Dropping the handle leaves the task scheduled.
#[must_use = "dropping a TaskHandle does not cancel the task"]
pub struct TaskHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TaskHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        TaskHandle {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

enum Task {
    Once(Box<dyn FnOnce()>),
    Repeating { period: Duration, task: Box<dyn FnMut()> },
}

struct Entry {
    seq: u64,
    due: Duration,
    cancelled: Rc<Cell<bool>>,
    task: Task,
}

#[derive(Default)]
struct Queue {
    now: Duration,
    next_seq: u64,
    entries: Vec<Entry>,
}

impl Queue {
    fn push(&mut self, due: Duration, cancelled: Rc<Cell<bool>>, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            seq,
            due,
            cancelled,
            task,
        });
    }

    fn pop_due(&mut self, until: Duration) -> Option<Entry> {
        self.entries.retain(|entry| !entry.cancelled.get());
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= until)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(pos, _)| pos)?;
        Some(self.entries.swap_remove(pos))
    }
}

/// Virtual-time scheduler. Nothing runs until [`ManualScheduler::advance`] is called.
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<Queue>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    /// Number of tasks still scheduled and not cancelled.
    pub fn pending(&self) -> usize {
        self.queue
            .borrow()
            .entries
            .iter()
            .filter(|entry| !entry.cancelled.get())
            .count()
    }

    /// Runs every task falling due within `by`, in due order, then moves
    /// the clock to the end of the window. Tasks may schedule more tasks.
    pub fn advance(&self, by: Duration) {
        let until = self.now() + by;
        loop {
            let next = self.queue.borrow_mut().pop_due(until);
            let Some(entry) = next else {
                break;
            };
            self.queue.borrow_mut().now = entry.due;
            match entry.task {
                Task::Once(task) => task(),
                Task::Repeating { period, mut task } => {
                    task();
                    if !entry.cancelled.get() {
                        self.queue.borrow_mut().push(
                            entry.due + period,
                            entry.cancelled,
                            Task::Repeating { period, task },
                        );
                    }
                }
            }
        }
        self.queue.borrow_mut().now = until;
    }

    fn enqueue(&self, delay: Duration, task: Task) -> TaskHandle {
        let cancelled = Rc::new(Cell::new(false));
        let mut queue = self.queue.borrow_mut();
        let due = queue.now + delay;
        queue.push(due, cancelled.clone(), task);
        TaskHandle::new(move || cancelled.set(true))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle {
        self.enqueue(delay, Task::Once(task))
    }

    fn schedule_repeating(&self, period: Duration, task: Box<dyn FnMut()>) -> TaskHandle {
        self.enqueue(period, Task::Repeating { period, task })
    }
}
