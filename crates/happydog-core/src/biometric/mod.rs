// ── Biometric Admission Engine (C7) ─────────────────────────────────────
// Orchestrates ObjectStore → detect → embed → VectorIndex search → classify
// → atomic commit to both the Pet document and the persistent vector index
// (spec.md §4.7). Registers at most one nose-print per Pet and guarantees
// global uniqueness across Pets within the configured duplicate threshold.
//
// The nose detector and embedding extractor are the two ML stages the
// original pipeline (`nose_lib/detectors/nose_detector.py`,
// `nose_lib/extractors/extractor.py`) wraps in `NosePrintPipeline`; here
// they are trait objects so tests run against deterministic fakes rather
// than a real model, mirroring the teacher's `AiProvider` trait seam
// (`engine/providers/mod.rs`) for pluggable, Box<dyn Trait>-erased
// third-party backends.

mod model;

pub use model::{testing as fakes, EmbeddingExtractor, NoseDetector};

use crate::docstore::DocStore;
use crate::error::{CoreError, CoreResult};
use crate::model::Pet;
use crate::objectstore::ObjectStore;
use crate::vectorindex::{AdmitOutcome, VectorIndex};
use std::sync::Arc;

/// Response shape mirrors spec.md §6.3's `status` discriminant. `Error` is
/// not a variant here — pipeline failures surface as `Err(CoreError)` and
/// are mapped onto `ERROR` by the out-of-scope HTTP layer, the same seam
/// every other service in this core uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdmissionStatus {
    Success,
    Duplicate,
    InvalidImage,
    AlreadyVerified,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionOutcome {
    pub status: AdmissionStatus,
    pub distance: Option<f32>,
    pub nearest_id: Option<u32>,
    pub ordinal_id: Option<u32>,
}

pub struct BiometricAdmissionService {
    store: Arc<DocStore>,
    objects: Arc<ObjectStore>,
    index: Arc<VectorIndex>,
    detector: Arc<dyn NoseDetector>,
    extractor: Arc<dyn EmbeddingExtractor>,
    duplicate_threshold: f32,
    outlier_threshold: f32,
    transaction_max_retries: u32,
    transaction_backoff_base_ms: u64,
    transaction_backoff_cap_ms: u64,
}

impl BiometricAdmissionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<DocStore>,
        objects: Arc<ObjectStore>,
        index: Arc<VectorIndex>,
        detector: Arc<dyn NoseDetector>,
        extractor: Arc<dyn EmbeddingExtractor>,
        config: &crate::config::Config,
    ) -> Self {
        BiometricAdmissionService {
            store,
            objects,
            index,
            detector,
            extractor,
            duplicate_threshold: config.duplicate_threshold,
            outlier_threshold: config.outlier_threshold,
            transaction_max_retries: config.transaction_max_retries,
            transaction_backoff_base_ms: config.transaction_backoff_base_ms,
            transaction_backoff_cap_ms: config.transaction_backoff_cap_ms,
        }
    }

    /// Admit a nose-print image staged at `staging_key` under `pet_id`.
    /// `staging_key` must live under `nose_prints_staging/{caller_user_id}/`
    /// — the out-of-scope HTTP layer is responsible for handing us a key it
    /// already validated against that namespace at upload time.
    pub fn admit_nose_print(
        &self,
        pet_id: &str,
        caller_user_id: &str,
        staging_key: &str,
    ) -> CoreResult<AdmissionOutcome> {
        let pet: Pet = self
            .store
            .get("pets", pet_id)?
            .ok_or_else(|| CoreError::not_found(format!("pet {pet_id} not found")))?;
        if pet.owner_user_id != caller_user_id {
            return Err(CoreError::forbidden("caller does not own this pet"));
        }
        // Idempotency short-circuit — no ML, no index touch (spec.md §4.7
        // preconditions).
        if pet.is_verified {
            return Ok(AdmissionOutcome {
                status: AdmissionStatus::AlreadyVerified,
                distance: None,
                nearest_id: None,
                ordinal_id: None,
            });
        }

        // ── Read phase: no locks held ───────────────────────────────────
        let image_bytes = self.objects.download(staging_key)?;
        let crop = match self.detector.detect(&image_bytes) {
            Ok(Some(cropped)) => cropped,
            Ok(None) => image_bytes.clone(),
            Err(e) => {
                // A detector miss should not block admission of an
                // otherwise-valid biometric — the extractor tolerates
                // whole-image input (spec.md §4.7 step 2).
                log::warn!("[biometric] nose detector failed for {staging_key}, falling back to full image: {e}");
                image_bytes.clone()
            }
        };
        let vector = self.extractor.extract(&crop)?;

        // ── Decision phase: VectorIndex single-writer lock held for the
        // whole count→search→classify→commit→insert sequence ───────────
        let pet_id_owned = pet_id.to_string();
        let staging_key_owned = staging_key.to_string();
        let store = self.store.clone();
        let objects = self.objects.clone();
        let max_retries = self.transaction_max_retries;
        let backoff_base_ms = self.transaction_backoff_base_ms;
        let backoff_cap_ms = self.transaction_backoff_cap_ms;

        let outcome = self.index.admit(&vector, self.duplicate_threshold, self.outlier_threshold, move |ordinal_id| {
            // spec.md §4.7: make_public, THEN the DocStore transaction,
            // both while the lock is held, both before the vector append.
            let public_url = objects.make_public(&staging_key_owned)?;
            store.transaction(max_retries, backoff_base_ms, backoff_cap_ms, |tx| {
                let mut pet: Pet = tx
                    .get("pets", &pet_id_owned)?
                    .ok_or_else(|| CoreError::not_found(format!("pet {pet_id_owned} not found")))?;
                pet.is_verified = true;
                pet.nose_print_url = Some(public_url.clone());
                pet.vector_index_id = Some(ordinal_id);
                tx.set("pets", &pet_id_owned, &crate::clock::now().to_rfc3339(), &pet)
            })
        })?;

        Ok(match outcome {
            AdmitOutcome::Success { ordinal_id } => AdmissionOutcome {
                status: AdmissionStatus::Success,
                distance: None,
                nearest_id: None,
                ordinal_id: Some(ordinal_id),
            },
            // DUPLICATE carries nearest_id for admin audit but never
            // discloses the owning Pet (spec.md §4.7).
            AdmitOutcome::Duplicate { nearest_id, distance } => AdmissionOutcome {
                status: AdmissionStatus::Duplicate,
                distance: Some(distance),
                nearest_id: Some(nearest_id),
                ordinal_id: None,
            },
            AdmitOutcome::Invalid { nearest_id, distance } => AdmissionOutcome {
                status: AdmissionStatus::InvalidImage,
                distance: Some(distance),
                nearest_id: Some(nearest_id),
                ordinal_id: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Gender, Pet};
    use model::testing::{ConstantEmbeddingExtractor, PassthroughDetector};

    fn seed_pet(store: &DocStore, pet_id: &str, owner: &str) {
        let pet = Pet {
            pet_id: pet_id.to_string(),
            owner_user_id: owner.to_string(),
            name: "Rex".into(),
            gender: Gender::Male,
            breed: "Pug".into(),
            birthdate: crate::clock::today(),
            initial_weight_kg: 8.0,
            is_verified: false,
            nose_print_url: None,
            vector_index_id: None,
            fur_color: None,
            health_concerns: vec![],
        };
        store.set("pets", pet_id, "k", &pet).unwrap();
    }

    fn service(dim: usize) -> (BiometricAdmissionService, Arc<DocStore>, Arc<ObjectStore>, tempfile::TempDir) {
        let store = Arc::new(DocStore::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let objects = Arc::new(ObjectStore::new(dir.path().join("objects"), "https://media.happydog.test"));
        let index = Arc::new(VectorIndex::open(dir.path().join("idx.bin"), dim).unwrap());
        let detector: Arc<dyn NoseDetector> = Arc::new(PassthroughDetector);
        let config = Config { vector_dimension: dim, ..Config::default() };
        let service = BiometricAdmissionService::new(
            store.clone(),
            objects.clone(),
            index,
            detector,
            Arc::new(ConstantEmbeddingExtractor::new(dim)),
            &config,
        );
        (service, store, objects, dir)
    }

    #[test]
    fn cold_admission_succeeds_with_ordinal_zero() {
        let (service, store, objects, _dir) = service(4);
        seed_pet(&store, "pet_a", "user_1");
        objects.write_for_test("nose_prints_staging/user_1/a.jpg", b"nose-a").unwrap();

        let outcome = service.admit_nose_print("pet_a", "user_1", "nose_prints_staging/user_1/a.jpg").unwrap();
        assert_eq!(outcome.status, AdmissionStatus::Success);
        assert_eq!(outcome.ordinal_id, Some(0));

        let pet: Pet = store.get("pets", "pet_a").unwrap().unwrap();
        assert!(pet.is_verified);
        assert_eq!(pet.vector_index_id, Some(0));
        assert!(pet.nose_print_url.is_some());
    }

    #[test]
    fn non_owner_caller_is_forbidden() {
        let (service, store, objects, _dir) = service(4);
        seed_pet(&store, "pet_a", "user_1");
        objects.write_for_test("nose_prints_staging/user_2/a.jpg", b"nose-a").unwrap();

        let err = service.admit_nose_print("pet_a", "user_2", "nose_prints_staging/user_2/a.jpg").unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn already_verified_short_circuits_without_touching_index() {
        let (service, store, objects, _dir) = service(4);
        seed_pet(&store, "pet_a", "user_1");
        objects.write_for_test("nose_prints_staging/user_1/a.jpg", b"nose-a").unwrap();
        service.admit_nose_print("pet_a", "user_1", "nose_prints_staging/user_1/a.jpg").unwrap();
        assert_eq!(service.index.count(), 1);

        let outcome = service.admit_nose_print("pet_a", "user_1", "nose_prints_staging/user_1/a.jpg").unwrap();
        assert_eq!(outcome.status, AdmissionStatus::AlreadyVerified);
        assert_eq!(service.index.count(), 1, "already-verified path must not touch the index");
    }

    #[test]
    fn duplicate_embedding_is_rejected_without_verifying_the_second_pet() {
        let (service, store, objects, _dir) = service(4);
        seed_pet(&store, "pet_a", "user_1");
        seed_pet(&store, "pet_b", "user_2");
        objects.write_for_test("nose_prints_staging/user_1/a.jpg", b"same-embedding").unwrap();
        objects.write_for_test("nose_prints_staging/user_2/b.jpg", b"same-embedding").unwrap();

        service.admit_nose_print("pet_a", "user_1", "nose_prints_staging/user_1/a.jpg").unwrap();
        let outcome = service.admit_nose_print("pet_b", "user_2", "nose_prints_staging/user_2/b.jpg").unwrap();

        assert_eq!(outcome.status, AdmissionStatus::Duplicate);
        assert_eq!(outcome.nearest_id, Some(0));
        let pet_b: Pet = store.get("pets", "pet_b").unwrap().unwrap();
        assert!(!pet_b.is_verified);
        assert_eq!(service.index.count(), 1);
    }
}
