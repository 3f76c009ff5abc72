//! The PCON forwarding strategy.
//!
//! Per prefix, the strategy keeps a probability split over upstream faces
//! and picks the egress for each Interest by weighted random draw. Every
//! congestion-marked Data (and, rate-limited, every marked NACK) coming
//! back on a face shifts weight away from that face; a low probing rate
//! keeps the weights of idle paths meaningful.
//!
//! The strategy never touches the wire itself: each operation returns the
//! send actions for the caller to execute, in the order they were decided.

pub mod info;

pub use info::ForwardingInfo;

use pcon_core::packet::Data;
use pcon_core::tag::{CongestionTag, NackType};
use quanta::Instant;
use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use tracing::{debug, info as tinfo, warn};

use crate::config::StrategyConfig;
use crate::face::{FaceId, FaceTable, DOWN_FACE_METRIC};
use crate::tables::fib::{FibEntry, NextHop};
use crate::tables::measurements::Measurements;
use crate::tables::pit::PitEntry;
use crate::trace::FwTraceHandle;

/// Name under which the strategy is selected via NDN management.
pub const STRATEGY_NAME: &str = "ndn:/localhost/nfd/strategy/pcon-strategy/%FD%01";

/// A send decided by the strategy, to be executed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyAction {
    SendInterest {
        face: FaceId,
        new_nonce: bool,
        probe: bool,
    },
    SendData {
        face: FaceId,
        tag: CongestionTag,
    },
}

pub struct PconStrategy {
    config: StrategyConfig,
    node_id: u32,
    rng: SmallRng,
    last_fw_ratio_update: Option<Instant>,
    last_fw_write: Option<Instant>,
    trace: Option<FwTraceHandle>,
}

impl PconStrategy {
    pub fn new(node_id: u32, config: StrategyConfig) -> Self {
        Self::with_seed(node_id, config, rand::random())
    }

    pub fn with_seed(node_id: u32, config: StrategyConfig, seed: u64) -> Self {
        PconStrategy {
            config,
            node_id,
            rng: SmallRng::seed_from_u64(seed),
            last_fw_ratio_update: None,
            last_fw_write: None,
            trace: None,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn set_trace(&mut self, handle: FwTraceHandle) {
        self.trace = Some(handle);
    }

    /// Interest pipeline: resolve the per-prefix split (creating it on first
    /// use), suppress duplicates, pick the egress face, flag congestion on
    /// the PIT entry, and occasionally probe the paths not taken.
    pub fn after_receive_interest(
        &mut self,
        faces: &mut FaceTable,
        measurements: &mut Measurements,
        fib_entry: &FibEntry,
        pit_entry: &mut PitEntry,
        in_face: FaceId,
        now: Instant,
    ) -> Vec<StrategyAction> {
        let entry = measurements.get_or_create(fib_entry.prefix());
        if entry.info.is_none() {
            let mut fresh = ForwardingInfo::new(fib_entry.prefix().clone());
            self.init_forw_map(&mut fresh, fib_entry.next_hops(), faces, now);
            entry.info = Some(fresh);
        }

        let mut want_new_nonce = false;
        if pit_entry.has_unexpired_out_records(now) {
            if pit_entry.has_unexpired_in_record_from_other(in_face, now) {
                // Same name already pending for another downstream.
                debug!(
                    node = self.node_id,
                    in_face,
                    name = %pit_entry.name(),
                    "suppressing interest from new face"
                );
                return Vec::new();
            }
            // Retransmission from the same downstream: forward, but upstream
            // must not collapse it with the earlier Interest.
            want_new_nonce = true;
        }

        let eligible: Vec<FaceId> = fib_entry
            .next_hops()
            .iter()
            .map(|n| n.face)
            .filter(|&f| Self::is_eligible(pit_entry, f, in_face, faces))
            .collect();

        if eligible.is_empty() {
            warn!(
                node = self.node_id,
                in_face,
                name = %pit_entry.name(),
                "no eligible next hops, dropping interest"
            );
            return Vec::new();
        }

        let r: f64 = self.rng.random();

        let out_face = if eligible.len() == 1 {
            eligible[0]
        } else {
            let info = entry
                .info
                .as_ref()
                .expect("forwarding info created on entry");
            let perc_sum: f64 = eligible.iter().map(|&f| info.forw_perc(f)).sum();
            // A zero sum means only the downstream holds weight, which is a
            // routing misconfiguration.
            assert!(
                perc_sum > 0.0,
                "eligible forwarding weights sum to zero for {}",
                info.prefix()
            );

            if self
                .last_fw_write
                .is_none_or(|t| now >= t + self.config.fw_write_interval())
            {
                self.last_fw_write = Some(now);
                self.trace_weights(info, now);
            }

            let mut cum = 0.0;
            let mut chosen = None;
            for &f in &eligible {
                cum += info.forw_perc(f) / perc_sum;
                debug_assert!((0.0..=1.1).contains(&cum), "cumulative weight {cum}");
                if r < cum {
                    chosen = Some(f);
                    break;
                }
            }
            // Float accumulation can end a hair under 1.0; the tail face wins.
            chosen.unwrap_or(eligible[eligible.len() - 1])
        };

        if faces.ok_to_mark(out_face, now) {
            pit_entry.cong_mark = true;
            debug!(
                node = self.node_id,
                name = %pit_entry.name(),
                in_face,
                out_face,
                "egress link congested, marking PIT entry"
            );
        }

        let mut actions = vec![StrategyAction::SendInterest {
            face: out_face,
            new_nonce: want_new_nonce,
            probe: false,
        }];

        if r <= self.config.probing_percentage {
            for &f in &eligible {
                if f != out_face {
                    actions.push(StrategyAction::SendInterest {
                        face: f,
                        new_nonce: true,
                        probe: true,
                    });
                }
            }
        }

        actions
    }

    /// Data pipeline: shift weight away from the face the mark came in on,
    /// then re-tag the Data for every pending downstream with the merged
    /// mark (incoming mark, downstream egress congestion, PIT bit).
    pub fn before_satisfy_interest(
        &mut self,
        faces: &mut FaceTable,
        measurements: &mut Measurements,
        pit_entry: &PitEntry,
        in_face: FaceId,
        data: &Data,
        now: Instant,
    ) -> Vec<StrategyAction> {
        let cong_mark = data.cong_mark();
        let nack_type = data.nack_type();

        let info = measurements
            .find_longest_prefix_match(pit_entry.name())
            .and_then(|e| e.info.as_mut());
        match info {
            None => warn!(
                node = self.node_id,
                name = %pit_entry.name(),
                "no measurement entry for data, skipping weight update"
            ),
            Some(info) => {
                let update_allowed = info.face_count() > 1
                    && !faces.is_local(in_face)
                    && !faces.is_content_store(in_face);
                if update_allowed {
                    // Marked NACKs only adapt the split once per update interval.
                    let mut update_on_nack = false;
                    if nack_type == NackType::Mark
                        && self
                            .last_fw_ratio_update
                            .is_none_or(|t| now >= t + self.config.fw_update_interval())
                    {
                        self.last_fw_ratio_update = Some(now);
                        update_on_nack = true;
                    }

                    if cong_mark != 0 || update_on_nack {
                        let perc = info.forw_perc(in_face);
                        info.reduce(in_face, self.config.change_per_mark * perc);
                        self.trace_weights(info, now);
                    }
                }
            }
        }

        let pit_marked = pit_entry.cong_mark;
        if pit_marked {
            debug!(
                node = self.node_id,
                name = %pit_entry.name(),
                in_face,
                "data matches congestion-marked PIT entry"
            );
        }

        let downstreams: Vec<FaceId> = pit_entry.unexpired_in_records(now).map(|r| r.face).collect();
        let mut actions = Vec::with_capacity(downstreams.len());
        for face in downstreams {
            let downstream_congested = faces.ok_to_mark(face, now);
            let mark = cong_mark
                .max(downstream_congested as i8)
                .max(pit_marked as i8);
            actions.push(StrategyAction::SendData {
                face,
                tag: CongestionTag::new(nack_type, mark, false, false),
            });
        }
        actions
    }

    /// Expiry pipeline: a timed-out Interest costs the front out-record's
    /// face a flat `change_per_mark`, once per expired out-record.
    pub fn before_expire_pending_interest(
        &mut self,
        measurements: &mut Measurements,
        pit_entry: &PitEntry,
        now: Instant,
    ) {
        let Some(entry) = measurements.find_longest_prefix_match(pit_entry.name()) else {
            warn!(
                node = self.node_id,
                name = %pit_entry.name(),
                "no measurement entry for expired interest"
            );
            return;
        };
        let Some(info) = entry.info.as_mut() else {
            warn!(
                node = self.node_id,
                name = %pit_entry.name(),
                "no forwarding info for expired interest"
            );
            return;
        };
        let Some(front) = pit_entry.out_records.first() else {
            return;
        };
        let front_face = front.face;
        for rec in &pit_entry.out_records {
            if info.face_count() > 1 && info.forw_perc(front_face) > 0.0 {
                warn!(
                    node = self.node_id,
                    name = %pit_entry.name(),
                    expired_face = rec.face,
                    penalized_face = front_face,
                    "pending interest timed out"
                );
                info.reduce(front_face, self.config.change_per_mark);
                self.trace_weights(info, now);
            }
        }
    }

    fn is_eligible(
        pit_entry: &PitEntry,
        face_id: FaceId,
        in_face: FaceId,
        faces: &FaceTable,
    ) -> bool {
        if face_id == in_face {
            return false;
        }
        let Some(face) = faces.get(face_id) else {
            return false;
        };
        !pit_entry.violates_scope(face) && face.metric != DOWN_FACE_METRIC
    }

    /// First Interest for a prefix: all weight on the lowest FaceId (the
    /// routing calculator installs shortest paths first), or an equal split
    /// when neither a local face nor the shortest-path default asks for it.
    fn init_forw_map(
        &self,
        info: &mut ForwardingInfo,
        next_hops: &[NextHop],
        faces: &FaceTable,
        now: Instant,
    ) {
        let mut lowest_id = FaceId::MAX;
        let mut local_face_count = 0;
        for n in next_hops {
            if faces.is_local(n.face) {
                local_face_count += 1;
            }
            lowest_id = lowest_id.min(n.face);
        }

        for n in next_hops {
            let perc = if local_face_count > 0 || self.config.init_shortest_path {
                if n.face == lowest_id {
                    1.0
                } else {
                    0.0
                }
            } else {
                1.0 / next_hops.len() as f64
            };
            info.set_forw_perc(n.face, perc);
        }

        tinfo!(
            node = self.node_id,
            prefix = %info.prefix(),
            faces = next_hops.len(),
            "initialized forwarding split"
        );
        self.trace_weights(info, now);
    }

    fn trace_weights(&self, info: &ForwardingInfo, now: Instant) {
        if let Some(trace) = &self.trace {
            for (face, perc) in info.entries() {
                trace.record(now, self.node_id, info.prefix(), face, "forwperc", perc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::face::Face;
    use crate::tables::fib::Fib;
    use pcon_core::name::Name;
    use pcon_core::packet::DEFAULT_INTEREST_LIFETIME;
    use quanta::Clock;
    use std::time::Duration;

    const DOWNSTREAM: FaceId = 90;

    struct Fixture {
        faces: FaceTable,
        fib: Fib,
        measurements: Measurements,
        strategy: PconStrategy,
        clock: Clock,
        mock: std::sync::Arc<quanta::Mock>,
    }

    fn fixture(upstreams: &[FaceId], config: StrategyConfig) -> Fixture {
        let (clock, mock) = Clock::mock();
        let mut faces = FaceTable::new(QueueConfig::default());
        faces.add(Face::new(DOWNSTREAM, "netdev://down", 1, false));
        let mut fib = Fib::new();
        for &f in upstreams {
            faces.add(Face::new(f, format!("netdev://up{f}"), 1, false));
            fib.add_next_hop(Name::from_uri("/app"), f);
        }
        Fixture {
            faces,
            fib,
            measurements: Measurements::new(),
            strategy: PconStrategy::with_seed(0, config, 7),
            clock,
            mock,
        }
    }

    fn receive_interest(fx: &mut Fixture, pit_entry: &mut PitEntry, in_face: FaceId) -> Vec<StrategyAction> {
        let now = fx.clock.now();
        pit_entry.insert_or_renew_in_record(in_face, 1, now, DEFAULT_INTEREST_LIFETIME);
        let fib_entry = fx.fib.lookup(pit_entry.name()).expect("route").clone();
        fx.strategy.after_receive_interest(
            &mut fx.faces,
            &mut fx.measurements,
            &fib_entry,
            pit_entry,
            in_face,
            now,
        )
    }

    fn weights(fx: &Fixture) -> Vec<(FaceId, f64)> {
        fx.measurements
            .get(&Name::from_uri("/app"))
            .and_then(|e| e.info.as_ref())
            .map(|i| i.entries().collect())
            .unwrap_or_default()
    }

    #[test]
    fn strategy_name_is_a_versioned_localhost_name() {
        let name = Name::from_uri(STRATEGY_NAME);
        assert_eq!(name.component(0), Some("localhost"));
        assert_eq!(name.component(3), Some("pcon-strategy"));
        assert_eq!(name.len(), 5, "name carries a version component");
    }

    #[test]
    fn shortest_path_init_puts_all_weight_on_lowest_face_id() {
        let mut fx = fixture(&[12, 5, 9], StrategyConfig::default());
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        let actions = receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        assert_eq!(actions.len(), 1);

        let w = weights(&fx);
        assert_eq!(w, vec![(5, 1.0), (9, 0.0), (12, 0.0)]);
        // all the weight is on face 5, so the draw lands there
        assert_eq!(
            actions[0],
            StrategyAction::SendInterest { face: 5, new_nonce: false, probe: false }
        );
    }

    #[test]
    fn uniform_init_without_shortest_path_or_local_faces() {
        let config = StrategyConfig {
            init_shortest_path: false,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[1, 2, 3], config);
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);

        for (_, p) in weights(&fx) {
            assert!((p - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn local_next_hop_forces_shortest_path_init() {
        let config = StrategyConfig {
            init_shortest_path: false,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[4], config);
        fx.faces.add(Face::new(2, "appface://producer", 0, true));
        fx.fib.add_next_hop(Name::from_uri("/app"), 2);

        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        assert_eq!(weights(&fx), vec![(2, 1.0), (4, 0.0)]);
    }

    #[test]
    fn second_downstream_is_suppressed() {
        let mut fx = fixture(&[1, 2], StrategyConfig::default());
        fx.faces.add(Face::new(91, "netdev://down2", 1, false));

        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        let first = receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        assert_eq!(first.len(), 1);
        let StrategyAction::SendInterest { face, .. } = first[0] else {
            panic!("expected interest send");
        };
        entry.insert_or_renew_out_record(face, 1, fx.clock.now(), DEFAULT_INTEREST_LIFETIME);

        fx.mock.increment(Duration::from_millis(10));
        let second = receive_interest(&mut fx, &mut entry, 91);
        assert!(second.is_empty(), "interest from a new downstream is suppressed");
    }

    #[test]
    fn retransmission_from_same_downstream_gets_new_nonce() {
        let mut fx = fixture(&[1, 2], StrategyConfig::default());
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        let first = receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        let StrategyAction::SendInterest { face, new_nonce, .. } = first[0] else {
            panic!("expected interest send");
        };
        assert!(!new_nonce);
        entry.insert_or_renew_out_record(face, 1, fx.clock.now(), DEFAULT_INTEREST_LIFETIME);

        fx.mock.increment(Duration::from_millis(50));
        let retx = receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        assert_eq!(retx.len(), 1);
        let StrategyAction::SendInterest { new_nonce, .. } = retx[0] else {
            panic!("expected interest send");
        };
        assert!(new_nonce, "retransmission must go out with a fresh nonce");
    }

    #[test]
    fn no_eligible_faces_drops_interest() {
        let mut fx = fixture(&[1], StrategyConfig::default());
        // the only next hop is the incoming face
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        let actions = receive_interest(&mut fx, &mut entry, 1);
        assert!(actions.is_empty());
    }

    #[test]
    fn down_face_metric_excludes_next_hop() {
        let mut fx = fixture(&[1], StrategyConfig::default());
        fx.faces.add(Face::new(2, "netdev://up2", DOWN_FACE_METRIC, false));
        fx.fib.add_next_hop(Name::from_uri("/app"), 2);

        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        let actions = receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        assert_eq!(
            actions,
            vec![StrategyAction::SendInterest { face: 1, new_nonce: false, probe: false }]
        );
    }

    #[test]
    fn scope_check_excludes_remote_faces_for_localhost_names() {
        let mut fx = fixture(&[1], StrategyConfig::default());
        fx.faces.add(Face::new(2, "appface://mgmt", 0, true));
        fx.fib.add_next_hop(Name::from_uri("/localhost/nfd"), 1);
        fx.fib.add_next_hop(Name::from_uri("/localhost/nfd"), 2);

        let mut entry = PitEntry::new(Name::from_uri("/localhost/nfd/status"));
        let now = fx.clock.now();
        entry.insert_or_renew_in_record(DOWNSTREAM, 1, now, DEFAULT_INTEREST_LIFETIME);
        let fib_entry = fx.fib.lookup(entry.name()).unwrap().clone();
        let actions = fx.strategy.after_receive_interest(
            &mut fx.faces,
            &mut fx.measurements,
            &fib_entry,
            &mut entry,
            DOWNSTREAM,
            now,
        );
        assert_eq!(
            actions,
            vec![StrategyAction::SendInterest { face: 2, new_nonce: false, probe: false }]
        );
    }

    #[test]
    fn weighted_draw_respects_degenerate_split() {
        let mut fx = fixture(&[1, 2], StrategyConfig::default());
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);

        // force all the weight onto face 2 and redraw many times
        let info = fx
            .measurements
            .get_or_create(&Name::from_uri("/app"))
            .info
            .as_mut()
            .unwrap();
        info.set_forw_perc(1, 0.0);
        info.set_forw_perc(2, 1.0);

        for seq in 10..40 {
            let mut e = PitEntry::new(Name::from_uri("/app").with_sequence(seq));
            let actions = receive_interest(&mut fx, &mut e, DOWNSTREAM);
            assert_eq!(
                actions,
                vec![StrategyAction::SendInterest { face: 2, new_nonce: false, probe: false }]
            );
        }
    }

    #[test]
    fn probing_copies_interest_to_other_eligible_faces() {
        let config = StrategyConfig {
            probing_percentage: 1.0,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[1, 2, 3], config);
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        let actions = receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        assert_eq!(actions.len(), 3, "chosen face plus two probes");
        let probes: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, StrategyAction::SendInterest { probe: true, new_nonce: true, .. }))
            .collect();
        assert_eq!(probes.len(), 2, "probes carry fresh nonces");
    }

    #[test]
    fn marked_data_shifts_weight_away_from_face() {
        let config = StrategyConfig {
            init_shortest_path: false,
            change_per_mark: 0.2,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[1, 2], config);
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);
        assert_eq!(weights(&fx), vec![(1, 0.5), (2, 0.5)]);

        let data = Data::new(Name::from_uri("/app/1"))
            .with_tag(CongestionTag::new(NackType::None, 1, false, false));
        let now = fx.clock.now();
        fx.strategy.before_satisfy_interest(
            &mut fx.faces,
            &mut fx.measurements,
            &entry,
            1,
            &data,
            now,
        );

        let w = weights(&fx);
        assert!((w[0].1 - 0.4).abs() < 1e-9, "face 1 reduced by 20% of its weight");
        assert!((w[1].1 - 0.6).abs() < 1e-9);
    }

    #[test]
    fn unmarked_data_leaves_weights_alone() {
        let config = StrategyConfig {
            init_shortest_path: false,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[1, 2], config);
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);

        let data = Data::new(Name::from_uri("/app/1"));
        let now = fx.clock.now();
        fx.strategy.before_satisfy_interest(
            &mut fx.faces,
            &mut fx.measurements,
            &entry,
            1,
            &data,
            now,
        );
        assert_eq!(weights(&fx), vec![(1, 0.5), (2, 0.5)]);
    }

    #[test]
    fn nack_updates_are_rate_limited() {
        let config = StrategyConfig {
            init_shortest_path: false,
            change_per_mark: 0.2,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[1, 2], config);
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);

        let nack = Data::new(Name::from_uri("/app/1"))
            .with_tag(CongestionTag::new(NackType::Mark, 0, false, false));

        let now = fx.clock.now();
        fx.strategy
            .before_satisfy_interest(&mut fx.faces, &mut fx.measurements, &entry, 1, &nack, now);
        let after_first = weights(&fx);
        assert!((after_first[0].1 - 0.4).abs() < 1e-9);

        // 50ms later: inside the 110ms update interval, no second update
        fx.mock.increment(Duration::from_millis(50));
        let now = fx.clock.now();
        fx.strategy
            .before_satisfy_interest(&mut fx.faces, &mut fx.measurements, &entry, 1, &nack, now);
        assert_eq!(weights(&fx), after_first);

        // past the interval the next NACK counts again
        fx.mock.increment(Duration::from_millis(70));
        let now = fx.clock.now();
        fx.strategy
            .before_satisfy_interest(&mut fx.faces, &mut fx.measurements, &entry, 1, &nack, now);
        assert!(weights(&fx)[0].1 < after_first[0].1);
    }

    #[test]
    fn benign_nack_never_updates_weights() {
        let config = StrategyConfig {
            init_shortest_path: false,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[1, 2], config);
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);

        let nack = Data::new(Name::from_uri("/app/1"))
            .with_tag(CongestionTag::new(NackType::NoMark, 0, false, false));
        let now = fx.clock.now();
        fx.strategy
            .before_satisfy_interest(&mut fx.faces, &mut fx.measurements, &entry, 1, &nack, now);
        assert_eq!(weights(&fx), vec![(1, 0.5), (2, 0.5)]);
    }

    #[test]
    fn outgoing_tag_merges_incoming_mark_and_pit_bit() {
        let mut fx = fixture(&[1, 2], StrategyConfig::default());
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);

        // incoming mark propagates
        let marked = Data::new(Name::from_uri("/app/1"))
            .with_tag(CongestionTag::new(NackType::None, 1, false, false));
        let now = fx.clock.now();
        let actions = fx.strategy.before_satisfy_interest(
            &mut fx.faces,
            &mut fx.measurements,
            &entry,
            1,
            &marked,
            now,
        );
        assert_eq!(actions.len(), 1);
        let StrategyAction::SendData { face, tag } = &actions[0] else {
            panic!("expected data send");
        };
        assert_eq!(*face, DOWNSTREAM);
        assert_eq!(tag.cong_mark, 1);
        assert!(!tag.high_cong_mark);

        // PIT bit alone also marks the outgoing copy
        entry.cong_mark = true;
        let clean = Data::new(Name::from_uri("/app/1"));
        let actions = fx.strategy.before_satisfy_interest(
            &mut fx.faces,
            &mut fx.measurements,
            &entry,
            1,
            &clean,
            now,
        );
        let StrategyAction::SendData { tag, .. } = &actions[0] else {
            panic!("expected data send");
        };
        assert_eq!(tag.cong_mark, 1, "PIT congestion bit is merged into the tag");
        assert_eq!(tag.nack_type, NackType::None);
    }

    #[test]
    fn missing_measurement_entry_still_forwards_data() {
        let mut fx = fixture(&[1, 2], StrategyConfig::default());
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        let now = fx.clock.now();
        entry.insert_or_renew_in_record(DOWNSTREAM, 1, now, DEFAULT_INTEREST_LIFETIME);

        let data = Data::new(Name::from_uri("/app/1"));
        let actions = fx.strategy.before_satisfy_interest(
            &mut fx.faces,
            &mut fx.measurements,
            &entry,
            1,
            &data,
            now,
        );
        assert_eq!(actions.len(), 1, "missing info skips the update, not the send");
    }

    #[test]
    fn expiry_penalizes_front_out_face_by_flat_amount() {
        let config = StrategyConfig {
            init_shortest_path: false,
            change_per_mark: 0.1,
            ..StrategyConfig::default()
        };
        let mut fx = fixture(&[1, 2], config);
        let mut entry = PitEntry::new(Name::from_uri("/app/1"));
        receive_interest(&mut fx, &mut entry, DOWNSTREAM);

        let now = fx.clock.now();
        entry.insert_or_renew_out_record(2, 1, now, DEFAULT_INTEREST_LIFETIME);
        entry.insert_or_renew_out_record(1, 2, now, DEFAULT_INTEREST_LIFETIME);

        fx.mock.increment(Duration::from_secs(3));
        let now = fx.clock.now();
        fx.strategy
            .before_expire_pending_interest(&mut fx.measurements, &entry, now);

        // the front out-record points at face 2; the flat 0.1 penalty lands
        // there once per out-record
        let w = weights(&fx);
        assert!((w[1].1 - 0.3).abs() < 1e-9, "face 2: 0.5 - 2×0.1");
        assert!((w[0].1 - 0.7).abs() < 1e-9);
    }
}
