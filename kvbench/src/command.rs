//! Binary encoding of map commands sent to the replicated service.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::workload::Operation;

/// Stores `value` under `key` in the replicated map.
///
/// The wire layout is the key followed by the value, both as big-endian `i64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapCommand {
    /// The key to write.
    pub key: i64,
    /// The new value.
    pub value: i64,
}

impl MapCommand {
    /// Size of an encoded command in bytes.
    pub const ENCODED_LEN: usize = 16;

    /// Serializes the command into its wire representation.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::ENCODED_LEN);
        buf.put_i64(self.key);
        buf.put_i64(self.value);
        buf.freeze()
    }

    /// Parses a command from its wire representation.
    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        if payload.len() != Self::ENCODED_LEN {
            return Err(Error::Decode {
                expected: Self::ENCODED_LEN,
                actual: payload.len(),
            });
        }

        let key = payload.get_i64();
        let value = payload.get_i64();
        Ok(Self { key, value })
    }
}

impl From<Operation> for MapCommand {
    fn from(op: Operation) -> Self {
        Self {
            key: op.key,
            value: op.value,
        }
    }
}
