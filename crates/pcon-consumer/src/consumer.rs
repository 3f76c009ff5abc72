//! Window-paced Interest sender.
//!
//! The consumer keeps `in_flight` Interests outstanding, bounded by the BIC
//! window. Returning Data grows the window; congestion marks shrink it —
//! with the conservative rule, a marked NACK or a timeout costs at most one
//! decrease per round trip (`high_data > recovery_point` gates the next
//! one). AQM-driven marks bypass the gate: the marking queue already paces
//! them.
//!
//! The pacer is sans-I/O: the embedding loop calls [`PconConsumer::next_send`]
//! until it stops yielding Interests, feeds [`PconConsumer::on_data`] as
//! responses arrive, and runs [`PconConsumer::check_timeouts`] on a timer.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use pcon_core::env::env_u64;
use pcon_core::name::Name;
use pcon_core::packet::{Data, Interest};
use pcon_core::tag::NackType;
use quanta::Instant;
use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use tracing::{debug, info, warn};

use crate::rtt::{MeanDeviation, RttEstimate};
use crate::window::BicWindow;

/// Upper bound on the empty-window backoff.
const EMPTY_WINDOW_BACKOFF: Duration = Duration::from_millis(500);

/// Consumer tunables.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Initial window, and the floor the window never falls under.
    pub initial_window: u32,
    /// Multiplicative decrease factor.
    pub beta: f64,
    /// React to congestion marks at all.
    pub react_to_cong_marks: bool,
    /// At most one decrease per round trip for NACKs and timeouts.
    pub conservative_window_adaptation: bool,
    /// Reset the window to its initial value on timeout.
    pub set_initial_window_on_timeout: bool,
    /// Cap on the RTO backoff multiplier.
    pub max_multiplier: u16,
    /// RTO floor. Deployments behind marking queues run a higher floor so
    /// the AQM signal arrives before the timer fires.
    pub min_rto: Duration,
    /// Expected payload size per Data packet, in bytes.
    pub payload_size: u32,
    /// Megabytes to request; negative means unbounded (use `seq_max`).
    pub max_size_mb: f64,
    /// Highest sequence number to request when `max_size_mb` is negative.
    pub seq_max: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            initial_window: 1,
            beta: 0.5,
            react_to_cong_marks: true,
            conservative_window_adaptation: true,
            set_initial_window_on_timeout: false,
            max_multiplier: 8,
            min_rto: Duration::from_millis(200),
            payload_size: 1040,
            max_size_mb: -1.0,
            seq_max: u64::MAX,
        }
    }
}

impl ConsumerConfig {
    /// Defaults overridden by `MIN_RTO` (milliseconds).
    pub fn from_env() -> Self {
        let d = Self::default();
        ConsumerConfig {
            min_rto: Duration::from_millis(env_u64("MIN_RTO", d.min_rto.as_millis() as u64)),
            ..d
        }
    }

    /// Number of sequences to request: derived from `max_size_mb` and the
    /// payload size when a size is given, `seq_max` otherwise.
    pub fn effective_seq_max(&self) -> u64 {
        if self.max_size_mb < 0.0 {
            self.seq_max
        } else {
            (1.0 + self.max_size_mb * 1024.0 * 1024.0 / self.payload_size as f64).floor() as u64
        }
    }
}

/// What the pacer wants to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDecision {
    /// Put this Interest on the wire now.
    Send(Interest),
    /// Window is full; wait for Data or a timeout.
    Wait,
    /// Window ran empty (safety valve); retry after this delay.
    Backoff(Duration),
    /// Everything requested and everything answered.
    Finished,
}

pub struct PconConsumer<R: RttEstimate = MeanDeviation> {
    config: ConsumerConfig,
    prefix: Name,
    window: BicWindow,
    rtt: R,
    rng: SmallRng,

    in_flight: u32,
    /// Next fresh sequence number.
    seq: u64,
    seq_max: u64,
    /// Highest sequence seen in returning Data.
    high_data: u64,
    /// Sequences past this point belong to the current recovery epoch.
    recovery_point: u64,

    /// Sequences waiting to be re-requested.
    retx: BTreeSet<u64>,
    /// Outstanding sequences and when they were sent.
    pending: HashMap<u64, Instant>,

    init: bool,
}

impl PconConsumer<MeanDeviation> {
    pub fn new(prefix: Name, config: ConsumerConfig) -> Self {
        Self::with_estimator(prefix, config, MeanDeviation::new())
    }
}

impl<R: RttEstimate> PconConsumer<R> {
    pub fn with_estimator(prefix: Name, config: ConsumerConfig, rtt: R) -> Self {
        let seq_max = config.effective_seq_max();
        PconConsumer {
            window: BicWindow::new(config.initial_window as f64, config.beta),
            prefix,
            rtt,
            rng: SmallRng::seed_from_u64(rand::random()),
            in_flight: 0,
            seq: 0,
            seq_max,
            high_data: 0,
            recovery_point: 0,
            retx: BTreeSet::new(),
            pending: HashMap::new(),
            init: false,
            config,
        }
    }

    pub fn cwnd(&self) -> f64 {
        self.window.cwnd()
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn high_data(&self) -> u64 {
        self.high_data
    }

    pub fn recovery_point(&self) -> u64 {
        self.recovery_point
    }

    pub fn rtt(&self) -> &R {
        &self.rtt
    }

    pub fn is_finished(&self) -> bool {
        self.seq >= self.seq_max && self.pending.is_empty() && self.retx.is_empty()
    }

    /// Decide the next send. Retransmissions go first, then fresh sequences,
    /// as long as the window has room.
    pub fn next_send(&mut self, now: Instant) -> SendDecision {
        if self.window.cwnd() <= 0.0 {
            // Not reachable while the initial-window clamp holds; kept as a
            // safety valve.
            warn!("window ran empty, backing off");
            return SendDecision::Backoff(self.rtt.retransmit_timeout().min(EMPTY_WINDOW_BACKOFF));
        }
        if (self.in_flight as f64) >= self.window.cwnd() {
            return SendDecision::Wait;
        }

        let seq = if let Some(&seq) = self.retx.iter().next() {
            self.retx.remove(&seq);
            seq
        } else if self.seq < self.seq_max {
            let seq = self.seq;
            self.seq += 1;
            seq
        } else if self.pending.is_empty() {
            return SendDecision::Finished;
        } else {
            return SendDecision::Wait;
        };

        self.in_flight += 1;
        self.pending.insert(seq, now);
        SendDecision::Send(Interest::new(
            self.prefix.with_sequence(seq),
            self.rng.random(),
        ))
    }

    /// A Data (or NACK) came back for one of our Interests.
    pub fn on_data(&mut self, data: &Data, now: Instant) {
        if !self.init {
            self.init = true;
            self.rtt.set_min_rto(self.config.min_rto);
            self.rtt.set_max_multiplier(self.config.max_multiplier);
            info!(
                min_rto_ms = self.config.min_rto.as_millis() as u64,
                max_multiplier = self.config.max_multiplier,
                "consumer started"
            );
        }

        let Some(seq) = data.name.sequence() else {
            warn!(name = %data.name, "data without sequence component");
            return;
        };

        if self.high_data < seq {
            self.high_data = seq;
        }

        let has_cong_mark = data.cong_mark() != 0;
        let nack_type = data.nack_type();

        if nack_type.is_nack() {
            debug!(seq, ?nack_type, "NACK, queueing retransmission");
            self.retx.insert(seq);
            self.pending.remove(&seq);
        } else if let Some(sent_at) = self.pending.remove(&seq) {
            self.rtt.on_ack(now.duration_since(sent_at));
        }

        if (has_cong_mark || nack_type == NackType::Mark) && self.config.react_to_cong_marks {
            // AQM marks are already paced by the queue; only the NACK path
            // is limited to one decrease per round trip.
            if has_cong_mark || !self.config.conservative_window_adaptation {
                self.window_decrease(false);
            } else if self.high_data > self.recovery_point {
                self.recovery_point = self.seq;
                self.window_decrease(false);
            }
        } else {
            self.window.increase();
        }

        self.window.clamp_to_initial();
        if self.in_flight > 0 {
            self.in_flight -= 1;
        }
    }

    /// Expire outstanding Interests past the RTO. Returns the timed-out
    /// sequences (already queued for retransmission).
    pub fn check_timeouts(&mut self, now: Instant) -> Vec<u64> {
        let rto = self.rtt.retransmit_timeout();
        let mut expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, &sent_at)| now.duration_since(sent_at) >= rto)
            .map(|(&seq, _)| seq)
            .collect();
        expired.sort_unstable();
        for &seq in &expired {
            self.pending.remove(&seq);
            self.on_timeout(seq, now);
        }
        expired
    }

    fn on_timeout(&mut self, seq: u64, _now: Instant) {
        warn!(
            seq,
            rto_ms = self.rtt.retransmit_timeout().as_millis() as u64,
            "interest timed out"
        );

        if self.in_flight > 0 {
            self.in_flight -= 1;
        }

        if !self.config.conservative_window_adaptation {
            self.window_decrease(self.config.set_initial_window_on_timeout);
        } else if self.high_data > self.recovery_point {
            self.recovery_point = self.seq;
            self.window_decrease(self.config.set_initial_window_on_timeout);
        }
        self.window.clamp_to_initial();

        self.rtt.on_timeout();
        self.retx.insert(seq);
    }

    fn window_decrease(&mut self, reset_to_initial: bool) {
        debug!(
            from = self.window.cwnd(),
            to = self.window.cwnd() * self.config.beta,
            "window decrease"
        );
        self.window.decrease(reset_to_initial);
    }
}
