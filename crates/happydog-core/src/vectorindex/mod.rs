// ── VectorIndex (C4) ────────────────────────────────────────────────────
// A durable, content-addressed flat-L2 similarity index over fixed-
// dimension float32 embeddings (spec.md §4.4, on-disk format in §6.4).
//
// Consistency model: single-writer, many-reader, copy-on-write. `add`
// builds a new snapshot off the currently published one, flushes it to
// disk, and only then publishes the new `Arc<Snapshot>` — so a flush
// failure never mutates what readers see (spec.md's "failure between
// add_in_memory and flush requires rolling back" falls out for free: the
// candidate snapshot is simply dropped, the published one is untouched).

mod snapshot;

pub use snapshot::MAGIC;

use crate::error::{CoreError, CoreResult};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
struct Snapshot {
    vectors: Vec<Vec<f32>>,
}

/// Outcome of `VectorIndex::admit`, mirroring spec.md §4.7's decision table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdmitOutcome {
    Success { ordinal_id: u32 },
    Duplicate { nearest_id: u32, distance: f32 },
    Invalid { nearest_id: u32, distance: f32 },
}

pub struct VectorIndex {
    dimension: usize,
    path: PathBuf,
    /// Serializes the read-count → search → add → flush write path.
    /// Held for the duration of one `add`, exactly as spec.md §4.4/§5
    /// requires — readers never take this lock.
    write_gate: Mutex<()>,
    published: RwLock<Arc<Snapshot>>,
}

impl VectorIndex {
    /// Open an existing snapshot file or create an empty one. An empty
    /// index is legal (spec.md "Cold start").
    pub fn open(path: impl Into<PathBuf>, dimension: usize) -> CoreResult<Self> {
        let path = path.into();
        let vectors = if path.exists() {
            snapshot::load(&path, dimension)?
        } else {
            snapshot::create_empty(&path, dimension)?;
            Vec::new()
        };
        Ok(VectorIndex {
            dimension,
            path,
            write_gate: Mutex::new(()),
            published: RwLock::new(Arc::new(Snapshot { vectors })),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.path
    }

    pub fn count(&self) -> usize {
        self.published.read().vectors.len()
    }

    /// L2 nearest-neighbor search against the current published snapshot.
    /// An empty index returns no neighbors.
    pub fn search(&self, query: &[f32], k: usize) -> CoreResult<Vec<(u32, f32)>> {
        self.validate_dimension(query)?;
        let snap = self.published.read().clone();
        let mut scored: Vec<(u32, f32)> = snap
            .vectors
            .iter()
            .enumerate()
            .map(|(ordinal, v)| (ordinal as u32, l2_distance(query, v)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Append one vector and durably persist it. Returns the assigned
    /// `ordinal_id`, which equals the prior `count()`.
    pub fn add(&self, vector: &[f32]) -> CoreResult<u32> {
        self.validate_dimension(vector)?;
        let _guard = self.write_gate.lock();
        let current = self.published.read().clone();
        self.append_and_publish(&current, vector)
    }

    /// The full biometric admission decision phase (spec.md §4.7), run
    /// under the single-writer lock for its entire duration — count,
    /// search, classify, and (on SUCCESS) the caller-supplied commit
    /// callback followed by the actual vector append all happen before the
    /// lock is released. This is what prevents two concurrent admissions
    /// from being classified against the same stale view and assigned the
    /// same `ordinal_id`.
    ///
    /// `on_success` receives the `ordinal_id` the vector WILL be assigned
    /// and must durably commit to that fact (e.g. update the owning Pet
    /// document) before the vector is actually appended — per spec.md's
    /// "database commit precedes vector insert" ordering rationale. If
    /// `on_success` errs, the vector is never appended and the error
    /// propagates; if the append itself then fails, the commit has already
    /// happened and the caller's `ERROR` response triggers an out-of-scope
    /// reconciliation job.
    pub fn admit(
        &self,
        vector: &[f32],
        duplicate_threshold: f32,
        outlier_threshold: f32,
        on_success: impl FnOnce(u32) -> CoreResult<()>,
    ) -> CoreResult<AdmitOutcome> {
        self.validate_dimension(vector)?;
        let _guard = self.write_gate.lock();
        let current = self.published.read().clone();
        let count = current.vectors.len();

        if count == 0 {
            on_success(0)?;
            let ordinal_id = self.append_and_publish(&current, vector)?;
            return Ok(AdmitOutcome::Success { ordinal_id });
        }

        let mut scored: Vec<(u32, f32)> = current
            .vectors
            .iter()
            .enumerate()
            .map(|(ordinal, v)| (ordinal as u32, l2_distance(vector, v)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let (nearest_id, distance) = scored[0];

        if distance <= duplicate_threshold {
            return Ok(AdmitOutcome::Duplicate { nearest_id, distance });
        }
        if distance >= outlier_threshold {
            return Ok(AdmitOutcome::Invalid { nearest_id, distance });
        }

        let ordinal_id = count as u32;
        on_success(ordinal_id)?;
        let ordinal_id = self.append_and_publish(&current, vector)?;
        Ok(AdmitOutcome::Success { ordinal_id })
    }

    /// Shared append path for `add` and `admit`. Caller must already hold
    /// `write_gate` and pass the snapshot it was read under.
    fn append_and_publish(&self, current: &Arc<Snapshot>, vector: &[f32]) -> CoreResult<u32> {
        let ordinal_id = current.vectors.len() as u32;

        // Build the candidate snapshot off the current one (copy-on-write)
        // but do NOT publish it until the flush below succeeds.
        let mut next_vectors = current.vectors.clone();
        next_vectors.push(vector.to_vec());

        snapshot::append_record(&self.path, ordinal_id, vector)?;

        // Flush succeeded — publish. If anything above had failed, we
        // return early and `self.published` is untouched, which is the
        // "roll the in-memory side back to the prior count" behavior
        // spec.md asks for (there was never anything to roll back).
        *self.published.write() = Arc::new(Snapshot { vectors: next_vectors });
        Ok(ordinal_id)
    }

    fn validate_dimension(&self, vector: &[f32]) -> CoreResult<()> {
        if vector.len() != self.dimension {
            return Err(CoreError::VectorIndex(format!(
                "expected dimension {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}
