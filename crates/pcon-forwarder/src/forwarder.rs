//! Pipeline glue.
//!
//! A [`Forwarder`] owns the tables, the faces with their egress queues and
//! the strategy, and runs the Interest/Data pipelines in NFD order. All
//! entry points are driven from one event loop; the embedding runtime calls
//! [`Forwarder::poll_transmit`] to drain egress queues onto the wire and
//! [`Forwarder::sweep_expired`] on a timer.

use pcon_core::name::Name;
use pcon_core::packet::{Data, Interest};
use quanta::Instant;
use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use tracing::{debug, warn};

use crate::config::ForwarderConfig;
use crate::face::{Face, FaceId, FaceTable, OutPacket};
use crate::queue::LinkQueue;
use crate::strategy::{ForwardingInfo, PconStrategy, StrategyAction};
use crate::tables::fib::Fib;
use crate::tables::measurements::Measurements;
use crate::tables::pit::Pit;
use crate::trace::FwTraceHandle;

pub struct Forwarder {
    node_id: u32,
    faces: FaceTable,
    fib: Fib,
    pit: Pit,
    measurements: Measurements,
    strategy: PconStrategy,
    rng: SmallRng,
    dropped_no_route: u64,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    pub fn with_seed(config: ForwarderConfig, seed: u64) -> Self {
        Forwarder {
            node_id: config.node_id,
            faces: FaceTable::new(config.queue.clone()),
            fib: Fib::new(),
            pit: Pit::new(),
            measurements: Measurements::new(),
            strategy: PconStrategy::with_seed(config.node_id, config.strategy, seed),
            rng: SmallRng::seed_from_u64(seed ^ 0x9E37_79B9),
            dropped_no_route: 0,
        }
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.add(face);
    }

    pub fn add_route(&mut self, prefix: Name, face: FaceId) {
        self.fib.add_next_hop(prefix, face);
    }

    pub fn set_trace(&mut self, handle: FwTraceHandle) {
        self.strategy.set_trace(handle);
    }

    /// Current forwarding split for a prefix, if the strategy has seen it.
    pub fn forwarding_info(&self, prefix: &Name) -> Option<&ForwardingInfo> {
        self.measurements.get(prefix).and_then(|e| e.info.as_ref())
    }

    /// Drop a prefix from the measurement table, and with it the split.
    pub fn evict_prefix(&mut self, prefix: &Name) {
        self.measurements.evict(prefix);
    }

    pub fn pit(&self) -> &Pit {
        &self.pit
    }

    pub fn queue(&self, face: FaceId) -> Option<&LinkQueue<OutPacket>> {
        self.faces.queue(face)
    }

    pub fn queue_mut(&mut self, face: FaceId) -> Option<&mut LinkQueue<OutPacket>> {
        self.faces.queue_mut(face)
    }

    pub fn dropped_no_route(&self) -> u64 {
        self.dropped_no_route
    }

    /// Whether the egress link toward `face` is in the highly-congested
    /// regime (queue nearly full, or delay over target for a long stretch).
    pub fn is_highly_congested(&self, face: FaceId, now: Instant) -> bool {
        self.faces
            .queue(face)
            .is_some_and(|q| q.is_highly_congested(now))
    }

    /// Incoming Interest pipeline.
    pub fn on_interest(&mut self, in_face: FaceId, interest: Interest, now: Instant) {
        let Some(fib_entry) = self.fib.lookup(&interest.name) else {
            self.dropped_no_route += 1;
            warn!(node = self.node_id, in_face, name = %interest.name, "no route, dropping interest");
            return;
        };

        let pit_entry = self.pit.entry_mut(&interest.name);
        pit_entry.insert_or_renew_in_record(in_face, interest.nonce, now, interest.lifetime);

        let actions = self.strategy.after_receive_interest(
            &mut self.faces,
            &mut self.measurements,
            fib_entry,
            pit_entry,
            in_face,
            now,
        );

        for action in actions {
            if let StrategyAction::SendInterest { face, new_nonce, probe } = action {
                let nonce = if new_nonce { self.rng.random() } else { interest.nonce };
                pit_entry.insert_or_renew_out_record(face, nonce, now, interest.lifetime);
                let out = Interest {
                    name: interest.name.clone(),
                    nonce,
                    lifetime: interest.lifetime,
                };
                if probe {
                    debug!(node = self.node_id, face, name = %out.name, "probing alternate path");
                }
                Self::enqueue_on(&mut self.faces, face, OutPacket::Interest(out), now);
            }
        }
    }

    /// Incoming Data pipeline: satisfy the PIT entry and fan the Data out to
    /// every pending downstream with the merged congestion tag.
    pub fn on_data(&mut self, in_face: FaceId, data: Data, now: Instant) {
        let Some(pit_entry) = self.pit.get_mut(&data.name) else {
            debug!(node = self.node_id, in_face, name = %data.name, "unsolicited data");
            return;
        };

        let actions = self.strategy.before_satisfy_interest(
            &mut self.faces,
            &mut self.measurements,
            pit_entry,
            in_face,
            &data,
            now,
        );

        for action in actions {
            if let StrategyAction::SendData { face, tag } = action {
                let mut out = data.clone();
                out.tag = Some(tag);
                Self::enqueue_on(&mut self.faces, face, OutPacket::Data(out), now);
            }
        }

        self.pit.remove(&data.name);
    }

    /// Timer pipeline: expired PIT entries penalize the strategy's weights
    /// and are dropped. Returns how many entries expired.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let expired = self.pit.take_expired(now);
        for entry in &expired {
            if !entry.out_records.is_empty() {
                self.strategy
                    .before_expire_pending_interest(&mut self.measurements, entry, now);
            }
        }
        expired.len()
    }

    /// Drain the next packet destined for `face`'s link.
    pub fn poll_transmit(&mut self, face: FaceId, now: Instant) -> Option<OutPacket> {
        self.faces.queue_mut(face)?.dequeue(now)
    }

    fn enqueue_on(faces: &mut FaceTable, face: FaceId, pkt: OutPacket, now: Instant) {
        let Some(queue) = faces.queue_mut(face) else {
            warn!(face, "no face for outgoing packet");
            return;
        };
        let bytes = pkt.wire_len();
        if queue.enqueue(pkt, bytes, now).is_err() {
            warn!(face, "egress queue overflow, tail-dropping packet");
        }
    }
}
