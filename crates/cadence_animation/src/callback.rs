//! One-shot callbacks scheduled on a timeline

/// A nullary callback owned by a timeline
pub type TimelineCallback = Box<dyn FnMut()>;

/// A callback that fires once when its timeline reaches `start_time`
pub struct CallbackItem {
    start_time: f64,
    callback: TimelineCallback,
    executed: bool,
}

impl CallbackItem {
    pub fn new(callback: TimelineCallback, start_time: f64) -> Self {
        Self {
            start_time,
            callback,
            executed: false,
        }
    }

    /// Fire the callback if `time` has reached its start time and it has not
    /// fired since the last reset. Returns `true` if it fired.
    pub fn evaluate(&mut self, time: f64) -> bool {
        if self.executed || time < self.start_time {
            return false;
        }

        // Marked first, so a callback that panics is not retried next tick
        self.executed = true;
        (self.callback)();
        true
    }

    pub fn reset(&mut self) {
        self.executed = false;
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }
}

impl std::fmt::Debug for CallbackItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackItem")
            .field("start_time", &self.start_time)
            .field("executed", &self.executed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;

    #[test]
    fn test_fires_once_after_start_time() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut item = CallbackItem::new(Box::new(move || counter.set(counter.get() + 1)), 100.0);

        assert!(!item.evaluate(99.0));
        assert!(item.evaluate(150.0));
        assert!(!item.evaluate(200.0));
        assert_eq!(calls.get(), 1);
        assert!(item.is_executed());
    }

    #[test]
    fn test_reset_rearms() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut item = CallbackItem::new(Box::new(move || counter.set(counter.get() + 1)), 0.0);

        item.evaluate(0.0);
        item.reset();
        item.evaluate(0.0);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_panicking_callback_is_not_retried() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut item = CallbackItem::new(
            Box::new(move || {
                counter.set(counter.get() + 1);
                panic!("callback failure");
            }),
            0.0,
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| item.evaluate(10.0)));
        assert!(result.is_err());
        assert!(item.is_executed());
        assert!(!item.evaluate(20.0));
        assert_eq!(calls.get(), 1);
    }
}
