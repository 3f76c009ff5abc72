//! Face descriptors and the face table.
//!
//! A face is one link endpoint at the router, physical or logical. Each
//! non-local face owns the [`LinkQueue`] guarding its egress link; the
//! embedding runtime drains the queue onto the wire.

use std::collections::HashMap;

use pcon_core::packet::{Data, Interest};
use quanta::Instant;

use crate::config::QueueConfig;
use crate::queue::LinkQueue;

pub type FaceId = u32;

/// Reserved metric value marking an admin-disabled face.
pub const DOWN_FACE_METRIC: u32 = 7;

/// Local URI of the content-store pseudo-face.
pub const CONTENT_STORE_URI: &str = "contentstore://";

/// Static description of a link endpoint.
#[derive(Debug, Clone)]
pub struct Face {
    pub id: FaceId,
    pub local_uri: String,
    pub metric: u32,
    pub is_local: bool,
}

impl Face {
    pub fn new(id: FaceId, local_uri: impl Into<String>, metric: u32, is_local: bool) -> Self {
        Face {
            id,
            local_uri: local_uri.into(),
            metric,
            is_local,
        }
    }

    pub fn is_content_store(&self) -> bool {
        self.local_uri == CONTENT_STORE_URI
    }

    pub fn is_down(&self) -> bool {
        self.metric == DOWN_FACE_METRIC
    }
}

/// A packet headed for a link.
#[derive(Debug, Clone)]
pub enum OutPacket {
    Interest(Interest),
    Data(Data),
}

impl OutPacket {
    pub fn wire_len(&self) -> usize {
        match self {
            OutPacket::Interest(i) => i.wire_len(),
            OutPacket::Data(d) => d.wire_len(),
        }
    }
}

struct FaceEntry {
    face: Face,
    queue: LinkQueue<OutPacket>,
}

/// All faces known to one forwarder, each with its egress queue.
pub struct FaceTable {
    entries: HashMap<FaceId, FaceEntry>,
    queue_config: QueueConfig,
}

impl FaceTable {
    pub fn new(queue_config: QueueConfig) -> Self {
        FaceTable {
            entries: HashMap::new(),
            queue_config,
        }
    }

    /// Register a face; its egress queue uses the table's queue config.
    pub fn add(&mut self, face: Face) {
        let queue = LinkQueue::new(&self.queue_config);
        self.entries.insert(face.id, FaceEntry { face, queue });
    }

    pub fn remove(&mut self, id: FaceId) {
        self.entries.remove(&id);
    }

    pub fn get(&self, id: FaceId) -> Option<&Face> {
        self.entries.get(&id).map(|e| &e.face)
    }

    pub fn queue_mut(&mut self, id: FaceId) -> Option<&mut LinkQueue<OutPacket>> {
        self.entries.get_mut(&id).map(|e| &mut e.queue)
    }

    pub fn queue(&self, id: FaceId) -> Option<&LinkQueue<OutPacket>> {
        self.entries.get(&id).map(|e| &e.queue)
    }

    pub fn is_local(&self, id: FaceId) -> bool {
        self.get(id).is_some_and(|f| f.is_local)
    }

    pub fn is_content_store(&self, id: FaceId) -> bool {
        self.get(id).is_some_and(|f| f.is_content_store())
    }

    /// Whether the egress queue toward `id` currently says to mark.
    pub fn ok_to_mark(&mut self, id: FaceId, now: Instant) -> bool {
        self.queue_mut(id).is_some_and(|q| q.ok_to_mark(now))
    }

    pub fn ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.entries.keys().copied()
    }
}
