//! Per-prefix forwarding weights.
//!
//! One [`ForwardingInfo`] per prefix the strategy has seen, holding the
//! probability each upstream face is chosen for an Interest. The weights
//! always sum to 1 (within ±0.001): every reduction on one face is
//! redistributed equally to the others.

use std::collections::{BTreeMap, BTreeSet};

use pcon_core::name::Name;
use tracing::{error, warn};

use crate::face::FaceId;

/// Tolerated drift band around a weight sum of 1.0.
pub const SUM_TOLERANCE: f64 = 0.001;

/// Forwarding split across upstream faces for one prefix.
///
/// `BTreeMap` keeps face iteration deterministic; the weighted draw depends
/// on a stable iteration order.
#[derive(Debug, Clone)]
pub struct ForwardingInfo {
    prefix: Name,
    forw_perc: BTreeMap<FaceId, f64>,
    disabled_faces: BTreeSet<FaceId>,
}

impl ForwardingInfo {
    pub fn new(prefix: Name) -> Self {
        ForwardingInfo {
            prefix,
            forw_perc: BTreeMap::new(),
            disabled_faces: BTreeSet::new(),
        }
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Current weight of `face`. A face the table has never seen reads as
    /// zero (and is an anomaly worth logging, not crashing on).
    pub fn forw_perc(&self, face: FaceId) -> f64 {
        match self.forw_perc.get(&face) {
            Some(&p) => {
                debug_assert!((0.0..=1.0).contains(&p), "weight out of range: {p}");
                p
            }
            None => {
                error!(face, prefix = %self.prefix, "no forwarding weight for face");
                0.0
            }
        }
    }

    pub fn set_forw_perc(&mut self, face: FaceId, perc: f64) {
        self.forw_perc.insert(face, perc);
    }

    pub fn face_count(&self) -> usize {
        self.forw_perc.len()
    }

    pub fn faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.forw_perc.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (FaceId, f64)> + '_ {
        self.forw_perc.iter().map(|(&f, &p)| (f, p))
    }

    pub fn sum(&self) -> f64 {
        self.forw_perc.values().sum()
    }

    /// Reduce the weight of `face` by at most `change`, handing the freed
    /// share out equally to every other face. No-op on a single-face table.
    pub fn reduce(&mut self, face: FaceId, change: f64) {
        if self.face_count() <= 1 {
            warn!(face, prefix = %self.prefix, "not reducing weight of a single-face split");
            return;
        }

        let current = self.forw_perc(face);
        let reduction = change.min(current);
        let share = reduction / (self.face_count() - 1) as f64;

        for (&f, p) in self.forw_perc.iter_mut() {
            if f == face {
                *p = (*p - reduction).max(0.0);
            } else {
                *p = (*p + share).min(1.0);
            }
        }

        self.check_sum();
    }

    /// Log and renormalize if the weights drifted out of the ±0.001 band.
    fn check_sum(&mut self) {
        let sum = self.sum();
        if !(1.0 - SUM_TOLERANCE..=1.0 + SUM_TOLERANCE).contains(&sum) {
            error!(prefix = %self.prefix, sum, "forwarding weights out of range, renormalizing");
            if sum > 0.0 {
                for p in self.forw_perc.values_mut() {
                    *p /= sum;
                }
            }
        }
    }

    // Bookkeeping for the highly-congested state.

    pub fn disable_face(&mut self, face: FaceId) {
        self.disabled_faces.insert(face);
    }

    pub fn enable_face(&mut self, face: FaceId) {
        self.disabled_faces.remove(&face);
    }

    pub fn is_face_enabled(&self, face: FaceId) -> bool {
        !self.disabled_faces.contains(&face)
    }
}
