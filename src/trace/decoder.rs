// This module decodes the kremlin.bin profile produced by the instrumented runtime. The
// file is a plain concatenation of records made of little-endian 64-bit fields with no
// header, record count or trailer: end of file at a record boundary terminates the
// stream, anywhere else it is a truncation error. TraceDecoder wraps any reader and
// yields one DecodedRecord per dynamic region node as an iterator, tracking the byte
// offset for diagnostics. Only intra-record validation happens here (node kind range,
// parallel bit, recursion target only on sinks); child references and recursion targets
// are resolved later when the region tree is built.

//! Streaming decoder for binary region traces.

use super::record::{DecodedRecord, NodeKind, RegionStat};
use crate::core::error::{PlanError, PlanResult};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Upper bound on speculative pre-allocation for counted arrays.
const MAX_PREALLOC: usize = 1024;

/// Iterator over the records of a binary trace.
pub struct TraceDecoder<R> {
    reader: R,
    offset: u64,
    failed: bool,
}

impl<R: Read> TraceDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            failed: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the first field of a record, or `None` on a clean end of stream.
    fn first_field(&mut self) -> PlanResult<Option<u64>> {
        let mut buf = [0u8; 8];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.error(format!("read failed: {e}"))),
            }
        }

        match filled {
            0 => Ok(None),
            8 => {
                self.offset += 8;
                Ok(Some(u64::from_le_bytes(buf)))
            }
            n => Err(self.error(format!("truncated record: {n} trailing bytes"))),
        }
    }

    fn field(&mut self, name: &str) -> PlanResult<u64> {
        let mut buf = [0u8; 8];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                self.offset += 8;
                Ok(u64::from_le_bytes(buf))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(self.error(format!("truncated record while reading {name}")))
            }
            Err(e) => Err(self.error(format!("read failed at {name}: {e}"))),
        }
    }

    fn error(&self, reason: String) -> PlanError {
        PlanError::Decode {
            offset: self.offset,
            reason,
        }
    }

    fn read_record(&mut self, uid: u64) -> PlanResult<DecodedRecord> {
        let static_region_id = self.field("static_region_id")?;
        let call_site_id = self.field("call_site_id")?;

        let kind_code = self.field("node_kind")?;
        let kind = NodeKind::from_wire(kind_code).ok_or(PlanError::UnknownNodeKind {
            uid,
            kind: kind_code,
        })?;

        let recursion_target_uid = self.field("recursion_target_uid")?;
        if recursion_target_uid != 0 && kind != NodeKind::RecursionSink {
            return Err(self.error(format!(
                "record {uid} of kind {kind} carries recursion target {recursion_target_uid}"
            )));
        }

        let instance_count = self.field("instance_count")?;
        let parallel_bit = match self.field("parallel_bit")? {
            0 => false,
            1 => true,
            other => return Err(self.error(format!("record {uid} has parallel bit {other}"))),
        };

        let child_count = self.field("child_count")?;
        let mut child_uids = Vec::with_capacity((child_count as usize).min(MAX_PREALLOC));
        for _ in 0..child_count {
            child_uids.push(self.field("child_uid")?);
        }

        let stat_count = self.field("stat_count")?;
        let mut stats = Vec::with_capacity((stat_count as usize).min(MAX_PREALLOC));
        for _ in 0..stat_count {
            stats.push(self.read_stat()?);
        }

        Ok(DecodedRecord {
            uid,
            static_region_id,
            call_site_id,
            kind,
            recursion_target_uid,
            instance_count,
            parallel_bit,
            child_uids,
            stats,
        })
    }

    fn read_stat(&mut self) -> PlanResult<RegionStat> {
        Ok(RegionStat {
            instance_count: self.field("stat.instance_count")?,
            total_work: self.field("stat.total_work")?,
            total_parallel_work: self.field("stat.total_parallel_work")?,
            self_parallel_work: self.field("stat.self_parallel_work")?,
            min_self_parallelism_x100: self.field("stat.min_self_parallelism")?,
            max_self_parallelism_x100: self.field("stat.max_self_parallelism")?,
            total_iterations: self.field("stat.total_iterations")?,
            min_iterations: self.field("stat.min_iterations")?,
            max_iterations: self.field("stat.max_iterations")?,
            recursion_weight: 0.0,
        })
    }
}

impl<R: Read> Iterator for TraceDecoder<R> {
    type Item = PlanResult<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let result = match self.first_field() {
            Ok(None) => return None,
            Ok(Some(uid)) => self.read_record(uid),
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Decode every record of a trace file.
pub fn decode(path: impl AsRef<Path>) -> PlanResult<Vec<DecodedRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PlanError::io(path, e))?;
    let records = TraceDecoder::new(BufReader::new(file)).collect::<PlanResult<Vec<_>>>()?;
    log::info!("Decoded {} trace records from {}", records.len(), path.display());
    Ok(records)
}

/// Decode every record of an in-memory trace.
pub fn decode_bytes(bytes: &[u8]) -> PlanResult<Vec<DecodedRecord>> {
    TraceDecoder::new(bytes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[u64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_empty_stream_is_success() {
        assert!(decode_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_single_record() {
        // uid sid cid kind rtarget count pbit nchildren [children] nstats [stat]
        let bytes = words(&[
            7, 3, 0, 0, 0, 2, 1, 2, 8, 9, 1, //
            2, 1000, 400, 250, 150, 425, 20, 5, 15,
        ]);
        let records = decode_bytes(&bytes).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.uid, 7);
        assert_eq!(record.static_region_id, 3);
        assert!(record.parallel_bit);
        assert_eq!(record.child_uids, vec![8, 9]);
        assert_eq!(record.stats[0].total_work, 1000);
        assert_eq!(record.stats[0].min_self_parallelism(), 1.5);
        assert_eq!(record.stats[0].max_self_parallelism(), 4.25);
        assert_eq!(record.stats[0].self_parallelism(), 4.0);
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let mut bytes = words(&[1, 0, 0, 0, 0, 1, 0, 0, 0]);
        bytes.extend_from_slice(&words(&[2, 0, 0]));
        let err = decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PlanError::Decode { .. }), "{err}");

        let partial = &words(&[1, 0, 0, 0, 0, 1, 0, 0, 0])[..];
        let mut with_tail = partial.to_vec();
        with_tail.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            decode_bytes(&with_tail),
            Err(PlanError::Decode { offset: 72, .. })
        ));
    }

    #[test]
    fn test_unknown_node_kind() {
        let bytes = words(&[4, 0, 0, 3, 0, 1, 0, 0, 0]);
        assert!(matches!(
            decode_bytes(&bytes),
            Err(PlanError::UnknownNodeKind { uid: 4, kind: 3 })
        ));
    }

    #[test]
    fn test_recursion_target_only_on_sinks() {
        let sink = words(&[5, 0, 0, 2, 4, 1, 0, 0, 0]);
        assert_eq!(decode_bytes(&sink).unwrap()[0].recursion_target_uid, 4);

        let normal = words(&[5, 0, 0, 0, 4, 1, 0, 0, 0]);
        assert!(matches!(decode_bytes(&normal), Err(PlanError::Decode { .. })));
    }
}
