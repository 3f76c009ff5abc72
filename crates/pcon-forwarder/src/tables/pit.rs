//! Pending Interest Table.
//!
//! One entry per in-flight Interest name, tracking which downstream faces
//! asked (in-records) and which upstream faces were tried (out-records).
//! The `cong_mark` bit is written by the strategy when the chosen egress
//! link was congested at send time, and read back when the Data returns.

use std::collections::HashMap;
use std::time::Duration;

use pcon_core::name::Name;
use quanta::Instant;

use crate::face::{Face, FaceId};

#[derive(Debug, Clone)]
pub struct InRecord {
    pub face: FaceId,
    pub nonce: u32,
    pub last_renewed: Instant,
    pub expiry: Instant,
}

#[derive(Debug, Clone)]
pub struct OutRecord {
    pub face: FaceId,
    pub nonce: u32,
    pub last_sent: Instant,
    pub expiry: Instant,
}

#[derive(Debug, Clone)]
pub struct PitEntry {
    name: Name,
    pub in_records: Vec<InRecord>,
    pub out_records: Vec<OutRecord>,
    /// Set when the Interest was sent onto a congested egress link.
    pub cong_mark: bool,
}

impl PitEntry {
    pub fn new(name: Name) -> Self {
        PitEntry {
            name,
            in_records: Vec::new(),
            out_records: Vec::new(),
            cong_mark: false,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Record (or renew) the downstream that asked for this name.
    pub fn insert_or_renew_in_record(
        &mut self,
        face: FaceId,
        nonce: u32,
        now: Instant,
        lifetime: Duration,
    ) {
        match self.in_records.iter_mut().find(|r| r.face == face) {
            Some(r) => {
                r.nonce = nonce;
                r.last_renewed = now;
                r.expiry = now + lifetime;
            }
            None => self.in_records.push(InRecord {
                face,
                nonce,
                last_renewed: now,
                expiry: now + lifetime,
            }),
        }
    }

    /// Record (or renew) an upstream this Interest went out on.
    pub fn insert_or_renew_out_record(
        &mut self,
        face: FaceId,
        nonce: u32,
        now: Instant,
        lifetime: Duration,
    ) {
        match self.out_records.iter_mut().find(|r| r.face == face) {
            Some(r) => {
                r.nonce = nonce;
                r.last_sent = now;
                r.expiry = now + lifetime;
            }
            None => self.out_records.push(OutRecord {
                face,
                nonce,
                last_sent: now,
                expiry: now + lifetime,
            }),
        }
    }

    pub fn has_unexpired_out_records(&self, now: Instant) -> bool {
        self.out_records.iter().any(|r| r.expiry > now)
    }

    pub fn has_unexpired_in_records(&self, now: Instant) -> bool {
        self.in_records.iter().any(|r| r.expiry > now)
    }

    /// An unexpired in-record from a downstream other than `face`: the same
    /// Interest is already pending on behalf of somebody else.
    pub fn has_unexpired_in_record_from_other(&self, face: FaceId, now: Instant) -> bool {
        self.in_records
            .iter()
            .any(|r| r.face != face && r.expiry > now)
    }

    pub fn unexpired_in_records(&self, now: Instant) -> impl Iterator<Item = &InRecord> {
        self.in_records.iter().filter(move |r| r.expiry > now)
    }

    /// NDN scope control: `/localhost` names never leave local faces.
    pub fn violates_scope(&self, face: &Face) -> bool {
        self.name.component(0) == Some("localhost") && !face.is_local
    }
}

#[derive(Default)]
pub struct Pit {
    entries: HashMap<Name, PitEntry>,
}

impl Pit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_mut(&mut self, name: &Name) -> &mut PitEntry {
        self.entries
            .entry(name.clone())
            .or_insert_with(|| PitEntry::new(name.clone()))
    }

    pub fn get(&self, name: &Name) -> Option<&PitEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &Name) -> Option<&mut PitEntry> {
        self.entries.get_mut(name)
    }

    pub fn remove(&mut self, name: &Name) -> Option<PitEntry> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry with no live records left.
    pub fn take_expired(&mut self, now: Instant) -> Vec<PitEntry> {
        let expired: Vec<Name> = self
            .entries
            .values()
            .filter(|e| !e.has_unexpired_out_records(now) && !e.has_unexpired_in_records(now))
            .map(|e| e.name.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|name| self.entries.remove(&name))
            .collect()
    }
}
