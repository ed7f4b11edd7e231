use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use bevy_ecs::prelude::*;

// ============================================================================
// Handles
// ============================================================================

/// Identifies one scheduled timer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

// ============================================================================
// Queue Entries
// ============================================================================

struct TimerEntry<A> {
    action: A,
    interval: f64,
    repeat: bool,
    // Sequence number of the queue entry that currently represents this timer.
    seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    fire_time: f64,
    seq: u64,
    handle: TimerHandle,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior: earliest fire time first, then FIFO.
        other
            .fire_time
            .total_cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Timers on a simulated clock. A timer hands its action back once the clock
/// reaches its fire time, and the clock only moves when the owner advances it,
/// so every action comes back on the frame loop's thread in fire-time order.
#[derive(Resource)]
pub struct Scheduler<A: Send + Sync + 'static> {
    now: f64,
    next_handle: u64,
    next_seq: u64,
    timers: HashMap<TimerHandle, TimerEntry<A>>,
    queue: BinaryHeap<Pending>,
}

impl<A: Clone + Send + Sync + 'static> Scheduler<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_handle: 0,
            next_seq: 0,
            timers: HashMap::new(),
            queue: BinaryHeap::new(),
        }
    }

    // Current simulated time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `action` to fire after `initial_delay` (or after `interval` when
    /// the delay is `None` or negative), then every `interval` while `repeat`.
    /// A repeating timer with a non-positive interval fires once.
    pub fn schedule(&mut self, action: A, interval: f32, repeat: bool, initial_delay: Option<f32>) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let interval = f64::from(interval);
        let delay = match initial_delay {
            Some(delay) if delay >= 0.0 => f64::from(delay),
            _ => interval.max(0.0),
        };

        let seq = self.push(handle, self.now + delay);
        self.timers.insert(
            handle,
            TimerEntry {
                action,
                interval,
                repeat: repeat && interval > 0.0,
                seq,
            },
        );
        handle
    }

    // Convenience for a single delayed callback.
    pub fn schedule_once(&mut self, action: A, delay: f32) -> TimerHandle {
        self.schedule(action, delay, false, Some(delay))
    }

    // Cancel a timer. Returns whether it was still pending; cancelling twice is harmless.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    #[must_use]
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to its
    /// fire time. Repeating timers are re-queued before the action is returned,
    /// so the caller may cancel them from inside the callback.
    pub fn pop_due(&mut self, until: f64) -> Option<(TimerHandle, A)> {
        while let Some(next) = self.queue.peek().copied() {
            if next.fire_time > until {
                return None;
            }
            self.queue.pop();

            let Some(entry) = self.timers.get(&next.handle) else {
                continue; // cancelled
            };
            if entry.seq != next.seq {
                continue; // superseded
            }

            self.now = self.now.max(next.fire_time);
            let action = entry.action.clone();
            if entry.repeat {
                let fire_time = next.fire_time + entry.interval;
                let seq = self.push(next.handle, fire_time);
                if let Some(entry) = self.timers.get_mut(&next.handle) {
                    entry.seq = seq;
                }
            } else {
                self.timers.remove(&next.handle);
            }
            return Some((next.handle, action));
        }
        None
    }

    // Move the clock forward without firing anything.
    pub fn advance_to(&mut self, time: f64) {
        self.now = self.now.max(time);
    }

    // Advance by `delta` seconds and collect every fire in order, catching up
    // on repeating timers whose interval is shorter than `delta`.
    pub fn advance(&mut self, delta: f32) -> Vec<(TimerHandle, A)> {
        let until = self.now + f64::from(delta);
        let mut fired = Vec::new();
        while let Some(fire) = self.pop_due(until) {
            fired.push(fire);
        }
        self.advance_to(until);
        fired
    }

    fn push(&mut self, handle: TimerHandle, fire_time: f64) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Pending { fire_time, seq, handle });
        seq
    }
}

impl<A: Clone + Send + Sync + 'static> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}
