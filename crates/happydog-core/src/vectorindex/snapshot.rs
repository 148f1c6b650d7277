// On-disk format for the VectorIndex snapshot file (spec.md §6.4):
//
//   header (16 bytes): magic "NPRINTIX" (8B) | dimension: u32 LE | count: u32 LE
//   records: { ordinal_id: u32 LE, vector: [f32; D] LE } *
//
// The read path memory-maps the file (several repos in the wider corpus
// reach for `memmap2` for exactly this append-only binary-record shape);
// the write path opens a plain `std::fs::File`, writes the new record,
// `sync_all()`s it, then rewrites the 16-byte header last — "append-with-
// fsync, header rewritten last" per §6.4.

use crate::error::{CoreError, CoreResult};
use memmap2::Mmap;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

pub const MAGIC: &[u8; 8] = b"NPRINTIX";
const HEADER_SIZE: u64 = 16;

fn record_size(dimension: usize) -> u64 {
    4 + 4 * dimension as u64
}

pub(crate) fn create_empty(path: &Path, dimension: usize) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    write_header(&mut file, dimension as u32, 0)?;
    file.sync_all()?;
    Ok(())
}

fn write_header(file: &mut std::fs::File, dimension: u32, count: u32) -> CoreResult<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(MAGIC)?;
    file.write_all(&dimension.to_le_bytes())?;
    file.write_all(&count.to_le_bytes())?;
    Ok(())
}

/// Load all committed vectors from `path`. A truncated trailing record
/// (partial write from a crash mid-flush) is logged and dropped — the
/// index rolls back to the largest whole-record prefix, per §6.4.
pub(crate) fn load(path: &Path, dimension: usize) -> CoreResult<Vec<Vec<f32>>> {
    let file = OpenOptions::new().read(true).open(path)?;
    let len = file.metadata()?.len();
    if len < HEADER_SIZE {
        return Err(CoreError::VectorIndex(format!(
            "snapshot file {path:?} is shorter than the 16-byte header"
        )));
    }

    // SAFETY: the file is only ever mutated by this process under
    // `VectorIndex`'s single-writer lock, and mmap is used read-only here
    // strictly for the initial load.
    let mmap = unsafe { Mmap::map(&file)? };

    if &mmap[0..8] != MAGIC {
        return Err(CoreError::VectorIndex(format!("snapshot file {path:?} has a bad magic header")));
    }
    let on_disk_dimension = u32::from_le_bytes(mmap[8..12].try_into().unwrap()) as usize;
    if on_disk_dimension != dimension {
        return Err(CoreError::VectorIndex(format!(
            "snapshot file {path:?} has dimension {on_disk_dimension}, expected {dimension}"
        )));
    }
    let header_count = u32::from_le_bytes(mmap[12..16].try_into().unwrap()) as usize;

    let rec_size = record_size(dimension);
    let body = &mmap[HEADER_SIZE as usize..];
    let whole_records = (body.len() as u64 / rec_size) as usize;
    let usable_records = whole_records.min(header_count);

    if whole_records < header_count {
        log::warn!(
            "[vectorindex] {path:?}: header claims {header_count} records but only {whole_records} whole records are present — rolling back to {whole_records}"
        );
    }

    let mut vectors = Vec::with_capacity(usable_records);
    for i in 0..usable_records {
        let start = i * rec_size as usize;
        let record = &body[start..start + rec_size as usize];
        // record[0..4] is the ordinal_id, assumed == i (strictly increasing
        // per spec.md's VectorEntry invariant); we trust the append order
        // rather than re-validating it against the stored id.
        let vector_bytes = &record[4..];
        let vector: Vec<f32> = vector_bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
            .collect();
        vectors.push(vector);
    }

    Ok(vectors)
}

/// Append one `{ordinal_id, vector}` record and fsync, then rewrite the
/// header's count field and fsync again.
pub(crate) fn append_record(path: &Path, ordinal_id: u32, vector: &[f32]) -> CoreResult<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;

    let rec_size = record_size(vector.len());
    let offset = HEADER_SIZE + ordinal_id as u64 * rec_size;

    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&ordinal_id.to_le_bytes())?;
    for component in vector {
        file.write_all(&component.to_le_bytes())?;
    }
    file.sync_all()?;

    let dimension = vector.len() as u32;
    write_header(&mut file, dimension, ordinal_id + 1)?;
    file.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_trailing_record_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.bin");
        create_empty(&path, 2).unwrap();
        append_record(&path, 0, &[1.0, 2.0]).unwrap();

        // Simulate a crash mid-write: truncate the file a few bytes into
        // the second record.
        let rec_size = record_size(2);
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        let good_len = HEADER_SIZE + rec_size;
        file.set_len(good_len + 3).unwrap();
        // Bump the header count to claim a second record exists, as a real
        // crash between write_header(count=2) and the fsync of data might.
        write_header(&mut file, 2, 2).unwrap();

        let vectors = load(&path, 2).unwrap();
        assert_eq!(vectors.len(), 1);
    }
}
