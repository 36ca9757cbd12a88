//! Encoder producing the binary trace layout read by [`TraceDecoder`](super::TraceDecoder).
//!
//! Used to build trace fixtures. Re-encoding a decoded record sequence reproduces
//! the decoded bytes exactly: every field, including the self-parallelism
//! extremes kept in hundredths, is carried as the raw 64-bit word.

use super::record::{DecodedRecord, RegionStat};
use crate::core::error::{PlanError, PlanResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes records in trace layout to any sink.
pub struct TraceWriter<W: Write> {
    out: W,
    buffer: Vec<u8>,
    records_written: usize,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buffer: Vec::new(),
            records_written: 0,
        }
    }

    pub fn write_record(&mut self, record: &DecodedRecord) -> std::io::Result<()> {
        self.buffer.clear();
        encode_record(record, &mut self.buffer);
        self.out.write_all(&self.buffer)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush and return the underlying sink.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Append one record in trace layout to `out`.
pub fn encode_record(record: &DecodedRecord, out: &mut Vec<u8>) {
    let mut word = |value: u64| out.extend_from_slice(&value.to_le_bytes());

    word(record.uid);
    word(record.static_region_id);
    word(record.call_site_id);
    word(record.kind.wire_code());
    word(record.recursion_target_uid);
    word(record.instance_count);
    word(u64::from(record.parallel_bit));

    word(record.child_uids.len() as u64);
    for &child in &record.child_uids {
        word(child);
    }

    word(record.stats.len() as u64);
    for stat in &record.stats {
        encode_stat(stat, &mut word);
    }
}

fn encode_stat(stat: &RegionStat, word: &mut impl FnMut(u64)) {
    word(stat.instance_count);
    word(stat.total_work);
    word(stat.total_parallel_work);
    word(stat.self_parallel_work);
    word(stat.min_self_parallelism_x100);
    word(stat.max_self_parallelism_x100);
    word(stat.total_iterations);
    word(stat.min_iterations);
    word(stat.max_iterations);
}

/// Encode records into a fresh byte buffer.
pub fn encode_records(records: &[DecodedRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        encode_record(record, &mut out);
    }
    out
}

/// Write records to a trace file.
pub fn write_trace(path: impl AsRef<Path>, records: &[DecodedRecord]) -> PlanResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| PlanError::io(path, e))?;
    let mut writer = TraceWriter::new(BufWriter::new(file));
    for record in records {
        writer.write_record(record).map_err(|e| PlanError::io(path, e))?;
    }
    log::debug!("Wrote {} trace records to {}", writer.records_written(), path.display());
    writer.finish().map_err(|e| PlanError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::decode_bytes;

    fn words(values: &[u64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_raw_words_survive_re_encoding() {
        let wide = (1u64 << 53) + 1;
        let bytes = words(&[
            1, 0, 0, 0, 0, 1, 0, 0, 1, //
            1, 10, 10, 10, wide, u64::MAX, 0, 0, 0, //
            u64::MAX, 3, 0, 2, 1, u64::MAX, 1, 1, 7, 1, //
            u64::MAX, u64::MAX, u64::MAX, u64::MAX, 1, 2, u64::MAX, 0, u64::MAX,
        ]);

        let records = decode_bytes(&bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].stats[0].min_self_parallelism_x100, wide);
        assert_eq!(records[1].recursion_target_uid, 1);
        assert_eq!(encode_records(&records), bytes);
    }

    #[test]
    fn test_writer_matches_buffer_encoding() {
        let records = vec![
            DecodedRecord::new(4, 2)
                .with_children([5])
                .with_stat(RegionStat::new(3, 900, 300)),
            DecodedRecord::new(5, 3).with_stat(RegionStat::new(3, 300, 300)),
        ];

        let mut writer = TraceWriter::new(Vec::new());
        for record in &records {
            writer.write_record(record).unwrap();
        }
        assert_eq!(writer.records_written(), 2);
        assert_eq!(writer.finish().unwrap(), encode_records(&records));
    }
}
