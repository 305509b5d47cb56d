use crate::tick::Tick;

/// A task waiting for its tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred<T> {
    pub due: Tick,
    order: u64,
    pub task: T,
}

/// Zero-delay deferral queue.
///
/// Tasks are plain values (usually a command enum) rather than closures so the
/// owner can execute them with full mutable access to its own state.
///
/// Ordering contract: due tasks are released in `(due, insertion_order)` order.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Tick,
    next_order: u64,
    pending: Vec<Deferred<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Tick::default(),
            next_order: 0,
            pending: Vec::new(),
        }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    /// Queues `task` for the next tick.
    pub fn defer(&mut self, task: T) {
        self.defer_by(1, task);
    }

    /// Queues `task` to run `ticks` ticks from now. Zero is treated as one: a
    /// deferred task never runs inside the call that queued it.
    pub fn defer_by(&mut self, ticks: u64, task: T) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.pending.push(Deferred {
            due: self.now.after(ticks.max(1)),
            order,
            task,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advances one tick and hands back every task that became due.
    pub fn advance(&mut self) -> Vec<T> {
        self.now = self.now.next();
        let now = self.now;

        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|d| d.due <= now);
        self.pending = waiting;

        due.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.order.cmp(&b.order)));
        if !due.is_empty() {
            tracing::trace!(tick = now.0, released = due.len(), "deferred tasks due");
        }
        due.into_iter().map(|d| d.task).collect()
    }

    /// Drops every queued task without running it.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::Scheduler;
    use crate::tick::Tick;

    #[test]
    fn deferred_tasks_wait_for_next_tick() {
        let mut sched = Scheduler::new();
        sched.defer("a");
        assert_eq!(sched.pending_count(), 1);

        let ran = sched.advance();
        assert_eq!(ran, vec!["a"]);
        assert_eq!(sched.now(), Tick(1));
        assert!(sched.is_idle());
    }

    #[test]
    fn releases_in_insertion_order() {
        let mut sched = Scheduler::new();
        sched.defer("b");
        sched.defer("a");
        sched.defer("c");
        assert_eq!(sched.advance(), vec!["b", "a", "c"]);
    }

    #[test]
    fn later_ticks_stay_queued() {
        let mut sched = Scheduler::new();
        sched.defer_by(2, "late");
        sched.defer_by(0, "soon");
        assert_eq!(sched.advance(), vec!["soon"]);
        assert_eq!(sched.pending_count(), 1);
        assert_eq!(sched.advance(), vec!["late"]);
    }

    #[test]
    fn clear_drops_pending() {
        let mut sched = Scheduler::new();
        sched.defer(1);
        sched.clear();
        assert!(sched.advance().is_empty());
    }
}
