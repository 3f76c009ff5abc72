//! Minimal Interest and Data carriers.
//!
//! The full NDN packet encoding is an external concern; these structs carry
//! exactly what the congestion-control machinery inspects. A NACK is a Data
//! whose tag carries a NACK type, the same way the reference stack simulates
//! them.

use std::time::Duration;

use crate::name::Name;
use crate::tag::{CongestionTag, NackType, TAG_WIRE_LEN};

/// Default Interest lifetime, which also bounds PIT record expiry.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_secs(2);

/// A request for named content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub nonce: u32,
    pub lifetime: Duration,
}

impl Interest {
    pub fn new(name: Name, nonce: u32) -> Self {
        Interest {
            name,
            nonce,
            lifetime: DEFAULT_INTEREST_LIFETIME,
        }
    }

    /// Approximate wire size, for queue byte accounting.
    pub fn wire_len(&self) -> usize {
        self.name.encoded_len() + 8
    }
}

/// A content response (or, with a NACK-typed tag, a negative response).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub payload_len: usize,
    pub tag: Option<CongestionTag>,
}

impl Data {
    pub fn new(name: Name) -> Self {
        Data {
            name,
            payload_len: 0,
            tag: None,
        }
    }

    pub fn with_payload_len(mut self, payload_len: usize) -> Self {
        self.payload_len = payload_len;
        self
    }

    pub fn with_tag(mut self, tag: CongestionTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Congestion mark carried by the tag; absent tag reads as zero.
    pub fn cong_mark(&self) -> i8 {
        self.tag.map_or(0, |t| t.cong_mark)
    }

    /// NACK type carried by the tag; absent tag reads as `None`.
    pub fn nack_type(&self) -> NackType {
        self.tag.map_or(NackType::None, |t| t.nack_type)
    }

    pub fn is_nack(&self) -> bool {
        self.nack_type().is_nack()
    }

    /// Approximate wire size, for queue byte accounting.
    pub fn wire_len(&self) -> usize {
        self.name.encoded_len() + self.payload_len + TAG_WIRE_LEN + 4
    }
}
