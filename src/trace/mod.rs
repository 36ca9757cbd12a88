// This module owns the binary profile format: the flat record model (one DecodedRecord
// per dynamic region node with its per-recursion-depth RegionStat blocks), the streaming
// decoder for kremlin.bin and the matching encoder used to produce fixtures. The decoder
// is a pure flat parse; tree semantics live in the forest module.

//! Binary region trace records, decoder and encoder.

pub mod decoder;
pub mod encoder;
pub mod record;

pub use decoder::{decode, decode_bytes, TraceDecoder};
pub use encoder::{encode_records, write_trace, TraceWriter};
pub use record::{DecodedRecord, NodeKind, RegionStat};
