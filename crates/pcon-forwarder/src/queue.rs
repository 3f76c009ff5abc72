//! Link queues with CoDel-style congestion detection.
//!
//! A [`LinkQueue`] guards one egress link. The PCON variant runs the CoDel
//! control law but never drops for it; instead it raises an "ok to mark"
//! signal that the strategy samples when it touches the link, so congestion
//! is carried as an explicit mark on returning Data rather than as loss.
//! The CoDel variant drops on the same cadence; FIFO has no control law.
//! All variants tail-drop on overflow.
//!
//! ## Control law (per dequeue)
//!
//! ```text
//! sojourn < target, or backlog under one MTU
//!     → clear first_above_time, leave dropping state
//! sojourn ≥ target, first_above_time unset
//!     → arm first_above_time = now + interval
//! sojourn ≥ target, now ≥ first_above_time
//!     → enter dropping state; signal fires now, then every interval/√count
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use quanta::Instant;
use tracing::trace;

use crate::config::{QueueConfig, QueueKind};

/// Backlog below one MTU counts as an empty queue for the control law.
pub const MTU_BYTES: usize = 1500;

/// Queue fill fraction above which the link counts as highly congested.
pub const HIGH_CONG_QUEUE_PCT: f64 = 0.9;

/// Sojourn continuously over target for this long counts as highly congested.
pub const HIGH_CONG_DELAY: Duration = Duration::from_secs(1);

struct Queued<T> {
    item: T,
    bytes: usize,
    enqueued_at: Instant,
}

/// A bounded egress queue with an optional CoDel control law.
pub struct LinkQueue<T> {
    kind: QueueKind,
    target: Duration,
    interval: Duration,
    max_packets: usize,

    buf: VecDeque<Queued<T>>,
    bytes: usize,

    // CoDel control block
    first_above_time: Option<Instant>,
    drop_next: Option<Instant>,
    count: u32,
    dropping: bool,
    /// Since when the sojourn samples have been continuously over target.
    sojourn_over_since: Option<Instant>,

    // Counters
    tail_drops: u64,
    codel_drops: u64,
    marks: u64,
}

impl<T> LinkQueue<T> {
    pub fn new(config: &QueueConfig) -> Self {
        LinkQueue {
            kind: config.kind,
            target: config.target(),
            interval: config.interval(),
            max_packets: config.max_packets,
            buf: VecDeque::new(),
            bytes: 0,
            first_above_time: None,
            drop_next: None,
            count: 0,
            dropping: false,
            sojourn_over_since: None,
            tail_drops: 0,
            codel_drops: 0,
            marks: 0,
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn tail_drops(&self) -> u64 {
        self.tail_drops
    }

    pub fn codel_drops(&self) -> u64 {
        self.codel_drops
    }

    pub fn marks(&self) -> u64 {
        self.marks
    }

    pub fn in_dropping_state(&self) -> bool {
        self.dropping
    }

    /// Timestamp the packet and append it, or hand it back on overflow.
    pub fn enqueue(&mut self, item: T, bytes: usize, now: Instant) -> Result<(), T> {
        if self.buf.len() >= self.max_packets {
            self.tail_drops += 1;
            return Err(item);
        }
        self.buf.push_back(Queued {
            item,
            bytes,
            enqueued_at: now,
        });
        self.bytes += bytes;
        Ok(())
    }

    /// Pop the next packet for the link, running the control law on its
    /// sojourn time. The CoDel variant may consume packets here.
    pub fn dequeue(&mut self, now: Instant) -> Option<T> {
        loop {
            let q = self.buf.pop_front()?;
            self.bytes -= q.bytes;
            if self.kind == QueueKind::Fifo {
                return Some(q.item);
            }
            let sojourn = now.duration_since(q.enqueued_at);
            self.observe_sojourn(sojourn, now);
            if self.kind == QueueKind::Codel && self.take_due_signal(now) {
                self.codel_drops += 1;
                trace!(sojourn_ms = sojourn.as_millis() as u64, "codel drop");
                continue;
            }
            return Some(q.item);
        }
    }

    /// Whether the next packet touching this link should be congestion
    /// marked. Sampling a pending mark consumes it, which is what paces the
    /// marks to the control-law cadence. Only the PCON variant ever marks.
    pub fn ok_to_mark(&mut self, now: Instant) -> bool {
        if self.kind != QueueKind::Pcon {
            return false;
        }
        if self.take_due_signal(now) {
            self.marks += 1;
            true
        } else {
            false
        }
    }

    /// True if the queue holds at least `threshold_pct` of its packet cap.
    pub fn is_queue_over_limit(&self, threshold_pct: f64) -> bool {
        self.buf.len() as f64 >= threshold_pct * self.max_packets as f64
    }

    /// How long sojourn samples have been continuously over target.
    pub fn time_over_limit(&self, now: Instant) -> Duration {
        self.sojourn_over_since
            .map_or(Duration::ZERO, |since| now.duration_since(since))
    }

    /// Queue nearly full, or queuing delay over target for a long stretch.
    pub fn is_highly_congested(&self, now: Instant) -> bool {
        self.is_queue_over_limit(HIGH_CONG_QUEUE_PCT)
            || self.time_over_limit(now) >= HIGH_CONG_DELAY
    }

    fn observe_sojourn(&mut self, sojourn: Duration, now: Instant) {
        if sojourn < self.target || self.bytes < MTU_BYTES {
            self.first_above_time = None;
            self.sojourn_over_since = None;
            if self.dropping {
                self.dropping = false;
                self.drop_next = None;
            }
            return;
        }

        if self.sojourn_over_since.is_none() {
            self.sojourn_over_since = Some(now);
        }
        match self.first_above_time {
            None => {
                self.first_above_time = Some(now + self.interval);
            }
            Some(first_above) if now >= first_above && !self.dropping => {
                self.dropping = true;
                self.count = 0;
                // signal available immediately on entry
                self.drop_next = Some(now);
            }
            _ => {}
        }
    }

    /// Consume the control-law signal if it is due, rescheduling the next
    /// one at `interval / sqrt(count)`.
    fn take_due_signal(&mut self, now: Instant) -> bool {
        if !self.dropping {
            return false;
        }
        match self.drop_next {
            Some(due) if now >= due => {
                self.count += 1;
                self.drop_next = Some(now + self.interval.div_f64((self.count as f64).sqrt()));
                true
            }
            _ => false,
        }
    }
}
