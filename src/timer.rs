use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Duration, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((at, id.0), task);
        self.deadlines.insert(id, at);
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let at = self.deadlines.remove(&id)?;
        self.pending.remove(&(at, id.0))
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(at, _)| *at)
    }

    /// Pops the earliest task due at or before `now`. Equal deadlines fire in scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Option<T> {
        let (&(at, seq), _) = self.pending.iter().next()?;
        if at > now {
            return None;
        }
        self.deadlines.remove(&TimerId(seq));
        self.pending.remove(&(at, seq))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn should_fire_in_deadline_order() {
        // given
        let mut timers = TimerQueue::new();
        timers.schedule(ms(50), "late");
        timers.schedule(ms(10), "early");
        timers.schedule(ms(10), "early_second");

        // when
        let mut fired = vec![];
        while let Some(task) = timers.pop_due(ms(100)) {
            fired.push(task);
        }

        // then
        assert_eq!(fired, vec!["early", "early_second", "late"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn should_not_fire_before_deadline() {
        // given
        let mut timers = TimerQueue::new();
        timers.schedule(ms(30), ());

        // then
        assert!(timers.pop_due(ms(29)).is_none());
        assert_eq!(timers.next_deadline(), Some(ms(30)));
        assert!(timers.pop_due(ms(30)).is_some());
    }

    #[test]
    fn should_cancel_pending_timers() {
        // given
        let mut timers = TimerQueue::new();
        let id = timers.schedule(ms(30), "task");

        // when
        let cancelled = timers.cancel(id);

        // then
        assert_eq!(cancelled, Some("task"));
        assert!(timers.pop_due(ms(100)).is_none());
        assert_eq!(timers.cancel(id), None);
    }
}
