//! Per-packet congestion metadata.
//!
//! Every Data (and NACK) flowing back toward the consumer may carry a
//! [`CongestionTag`]. Routers rewrite the tag on the return path, taking the
//! max of their own contribution and the incoming mark, so a mark set
//! anywhere along the path survives to the consumer.
//!
//! ## Wire format (4 bytes)
//!
//! ```text
//! +-----------+-----------+----------------+----------------------+
//! | nackType  | congMark  | highCongMark   | highCongMarkLocal    |
//! |   (i8)    |   (i8)    |   (u8, 0/1)    |      (u8, 0/1)       |
//! +-----------+-----------+----------------+----------------------+
//! ```

use bytes::{Buf, BufMut};

/// Serialized size of a [`CongestionTag`].
pub const TAG_WIRE_LEN: usize = 4;

/// NACK classification carried in the tag.
///
/// `Mark` is an explicit congestion NACK that throttles at the strategy
/// layer; `NoMark` is benign (e.g. no matching content) and must not shrink
/// windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(i8)]
pub enum NackType {
    #[default]
    None = -1,
    NoMark = 17,
    Mark = 23,
}

impl NackType {
    /// Decode from the wire byte. Unknown values collapse to `None`.
    pub fn from_i8(v: i8) -> Self {
        match v {
            17 => NackType::NoMark,
            23 => NackType::Mark,
            _ => NackType::None,
        }
    }

    pub fn as_i8(self) -> i8 {
        self as i8
    }

    /// True for any actual NACK (`NoMark` or `Mark`).
    pub fn is_nack(self) -> bool {
        !matches!(self, NackType::None)
    }
}

/// Congestion metadata attached to Data and NACK packets.
///
/// An absent tag is equivalent to [`CongestionTag::default`]: no NACK, no
/// mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CongestionTag {
    pub nack_type: NackType,
    pub cong_mark: i8,
    pub high_cong_mark: bool,
    pub high_cong_mark_local: bool,
}

impl CongestionTag {
    pub fn new(
        nack_type: NackType,
        cong_mark: i8,
        high_cong_mark: bool,
        high_cong_mark_local: bool,
    ) -> Self {
        CongestionTag {
            nack_type,
            cong_mark,
            high_cong_mark,
            high_cong_mark_local,
        }
    }

    /// True if some queue along the return path declared congestion.
    pub fn is_marked(&self) -> bool {
        self.cong_mark != 0
    }

    /// Encode into a buffer. Panics if fewer than [`TAG_WIRE_LEN`] bytes remain.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i8(self.nack_type.as_i8());
        buf.put_i8(self.cong_mark);
        buf.put_u8(self.high_cong_mark as u8);
        buf.put_u8(self.high_cong_mark_local as u8);
    }

    /// Decode from a buffer. Returns `None` if the buffer is too short.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < TAG_WIRE_LEN {
            return None;
        }
        Some(CongestionTag {
            nack_type: NackType::from_i8(buf.get_i8()),
            cong_mark: buf.get_i8(),
            high_cong_mark: buf.get_u8() != 0,
            high_cong_mark_local: buf.get_u8() != 0,
        })
    }
}
