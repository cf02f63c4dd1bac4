use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use super::scheduler::{Scheduler, TaskHandle};

/// Runs continuations on the thread-default glib main context, next to the
/// GTK widgets that render the board.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlibScheduler;

impl Scheduler for GlibScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle {
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let source = glib::timeout_add_local_once(delay, move || {
            flag.set(true);
            task();
        });
        // A fired one-shot source is already gone; removing it again panics.
        TaskHandle::new(move || {
            if !fired.get() {
                source.remove();
            }
        })
    }

    fn schedule_repeating(&self, period: Duration, mut task: Box<dyn FnMut()>) -> TaskHandle {
        let source = glib::timeout_add_local(period, move || {
            task();
            glib::ControlFlow::Continue
        });
        TaskHandle::new(move || source.remove())
    }
}
