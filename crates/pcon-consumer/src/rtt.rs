//! Retransmission-timeout estimation.
//!
//! The pacer only needs the small interface in [`RttEstimate`]; the
//! [`MeanDeviation`] implementation is the classic smoothed-RTT-plus-
//! four-deviations estimator with an RTO floor and capped exponential
//! backoff.

use std::time::Duration;

/// What the Interest pacer asks of an RTT estimator.
pub trait RttEstimate {
    /// Floor for the retransmission timeout.
    fn set_min_rto(&mut self, min_rto: Duration);
    /// Cap on the backoff multiplier applied after consecutive timeouts.
    fn set_max_multiplier(&mut self, max_multiplier: u16);
    /// Current retransmission timeout.
    fn retransmit_timeout(&self) -> Duration;
    /// Feed one round-trip sample from a satisfied Interest.
    fn on_ack(&mut self, rtt: Duration);
    /// A timeout fired; back the RTO off.
    fn on_timeout(&mut self);
}

/// SRTT/RTTVAR estimator: `rto = max(min_rto, srtt + 4·rttvar) × backoff`.
#[derive(Debug, Clone)]
pub struct MeanDeviation {
    srtt: Option<Duration>,
    rttvar: Duration,
    min_rto: Duration,
    multiplier: u32,
    max_multiplier: u16,
}

impl MeanDeviation {
    pub fn new() -> Self {
        MeanDeviation {
            srtt: None,
            rttvar: Duration::ZERO,
            min_rto: Duration::from_millis(200),
            multiplier: 1,
            max_multiplier: 8,
        }
    }

    pub fn srtt(&self) -> Option<Duration> {
        self.srtt
    }
}

impl Default for MeanDeviation {
    fn default() -> Self {
        Self::new()
    }
}

impl RttEstimate for MeanDeviation {
    fn set_min_rto(&mut self, min_rto: Duration) {
        self.min_rto = min_rto;
    }

    fn set_max_multiplier(&mut self, max_multiplier: u16) {
        self.max_multiplier = max_multiplier;
    }

    fn retransmit_timeout(&self) -> Duration {
        let base = match self.srtt {
            Some(srtt) => (srtt + 4 * self.rttvar).max(self.min_rto),
            None => self.min_rto,
        };
        base * self.multiplier
    }

    fn on_ack(&mut self, rtt: Duration) {
        match self.srtt {
            None => {
                self.srtt = Some(rtt);
                self.rttvar = rtt / 2;
            }
            Some(srtt) => {
                let delta = if srtt > rtt { srtt - rtt } else { rtt - srtt };
                self.rttvar = (3 * self.rttvar + delta) / 4;
                self.srtt = Some((7 * srtt + rtt) / 8);
            }
        }
        self.multiplier = 1;
    }

    fn on_timeout(&mut self) {
        self.multiplier = (self.multiplier * 2).min(self.max_multiplier as u32);
    }
}
