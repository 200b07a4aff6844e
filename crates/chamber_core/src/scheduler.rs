//! Cancelable one-shot and repeating timers owned by a level session.
//!
//! Timers are keyed against the session's simulated clock (milliseconds) and
//! fire only when the session polls them at the start of a tick, so a
//! callback can never run in the middle of an update. Firing hands back the
//! timer's payload; the owner decides what it means.
//!
//! Teardown cancels everything, so nothing scheduled by one level can fire
//! into the next.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<E> {
    id: TimerId,
    deadline_ms: f64,
    interval_ms: Option<f64>,
    event: E,
}

#[derive(Debug, Clone)]
pub struct Scheduler<E> {
    timers: Vec<Timer<E>>,
    next_id: u64,
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule_once(&mut self, now_ms: f64, delay_ms: f64, event: E) -> TimerId {
        self.push(now_ms + delay_ms.max(0.0), None, event)
    }

    /// A repeating timer first fires one interval after `now_ms`.
    pub fn schedule_repeating(&mut self, now_ms: f64, interval_ms: f64, event: E) -> TimerId {
        // A zero interval would fire forever within a single poll.
        let interval = interval_ms.max(1.0);
        self.push(now_ms + interval, Some(interval), event)
    }

    fn push(&mut self, deadline_ms: f64, interval_ms: Option<f64>, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            deadline_ms,
            interval_ms,
            event,
        });
        id
    }

    /// Returns whether a live timer was removed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) {
        if !self.timers.is_empty() {
            log::debug!("Cancelling {} outstanding timer(s)", self.timers.len());
        }
        self.timers.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    /// Collect every firing due at `now_ms`, ordered by deadline (ties by
    /// scheduling order). One-shot timers are removed; repeating timers are
    /// rescheduled and may fire several times if the clock jumped.
    pub fn poll(&mut self, now_ms: f64) -> Vec<(TimerId, E)> {
        let mut fired: Vec<(f64, TimerId, E)> = Vec::new();
        for timer in &mut self.timers {
            while timer.deadline_ms <= now_ms {
                fired.push((timer.deadline_ms, timer.id, timer.event.clone()));
                match timer.interval_ms {
                    Some(interval) => timer.deadline_ms += interval,
                    None => break,
                }
            }
        }
        self.timers
            .retain(|t| t.interval_ms.is_some() || t.deadline_ms > now_ms);
        fired.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        fired.into_iter().map(|(_, id, event)| (id, event)).collect()
    }
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
