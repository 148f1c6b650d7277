// End-to-end scenarios from spec.md §8, run against an in-memory DocStore,
// a tempdir-backed ObjectStore/VectorIndex, and deterministic ML/third-party
// fakes. One binary for the whole crate's integration surface, mirroring
// the teacher's `[[test]] name = "integration"` convention
// (`src-tauri/Cargo.toml`) adopted to avoid per-file SQLite setup
// duplication.

use happydog_core::biometric::{fakes as biometric_fakes, BiometricAdmissionService};
use happydog_core::clock;
use happydog_core::config::Config;
use happydog_core::docstore::DocStore;
use happydog_core::jobs::{fakes as job_fakes, JobOrchestrator};
use happydog_core::model::{Gender, JobStatus, NotificationType, Pet, SubjectType, User};
use happydog_core::notifications::NotificationService;
use happydog_core::objectstore::{ObjectStore, UploadNamespace};
use happydog_core::pets::PetService;
use happydog_core::social::SocialGraphService;
use happydog_core::vectorindex::VectorIndex;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    store: Arc<DocStore>,
    objects: Arc<ObjectStore>,
    social: Arc<SocialGraphService>,
    pets: PetService,
    biometric: BiometricAdmissionService,
    jobs: Arc<JobOrchestrator>,
    _tempdir: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with_generation_client(Arc::new(job_fakes::CountingGenerationClient::new(
        "https://media.happydog.test/generated",
    )))
}

fn harness_with_generation_client(
    generation_client: Arc<dyn happydog_core::jobs::ImageGenerationClient>,
) -> Harness {
    let config = Config { vector_dimension: 8, ..Config::default() };
    let store = Arc::new(DocStore::open_in_memory().unwrap());
    let tempdir = tempfile::tempdir().unwrap();
    let objects = Arc::new(ObjectStore::new(tempdir.path().join("objects"), "https://media.happydog.test"));
    let index = Arc::new(VectorIndex::open(tempdir.path().join("idx.bin"), config.vector_dimension).unwrap());
    let notifications = Arc::new(NotificationService::new(store.clone()));
    let social = Arc::new(SocialGraphService::new(store.clone(), objects.clone(), notifications.clone(), &config));
    let pets = PetService::new(store.clone(), &config);
    let biometric = BiometricAdmissionService::new(
        store.clone(),
        objects.clone(),
        index.clone(),
        Arc::new(biometric_fakes::PassthroughDetector),
        Arc::new(biometric_fakes::ConstantEmbeddingExtractor::new(config.vector_dimension)),
        &config,
    );
    let jobs = Arc::new(JobOrchestrator::new(
        store.clone(),
        objects.clone(),
        social.clone(),
        notifications.clone(),
        Arc::new(job_fakes::FixedAnalysisClient::new("a happy dog in a sunny yard")),
        generation_client,
        &config,
    ));
    Harness { store, objects, social, pets, biometric, jobs, _tempdir: tempdir }
}

fn seed_user(store: &DocStore, id: &str, nickname: &str) {
    let user = User {
        user_id: id.to_string(),
        external_sub: format!("sub-{id}"),
        email: format!("{id}@example.test"),
        nickname: nickname.to_string(),
        profile_image_url: None,
        fcm_token: None,
        joined_at: clock::now(),
    };
    store.set("users", id, &clock::now().to_rfc3339(), &user).unwrap();
}

fn seed_pet(store: &DocStore, pet_id: &str, owner: &str) {
    let pet = Pet {
        pet_id: pet_id.to_string(),
        owner_user_id: owner.to_string(),
        name: "Rex".into(),
        gender: Gender::Male,
        breed: "Pug".into(),
        birthdate: clock::today(),
        initial_weight_kg: 8.0,
        is_verified: false,
        nose_print_url: None,
        vector_index_id: None,
        fur_color: None,
        health_concerns: vec![],
    };
    store.set("pets", pet_id, "k", &pet).unwrap();
}

fn stage_nose_print(objects: &ObjectStore, user_id: &str, bytes: &[u8]) -> String {
    let signed = objects
        .issue_signed_upload(UploadNamespace::NosePrintsStaging, user_id, "jpg", "image/jpeg")
        .unwrap();
    objects.write_for_test(&signed.key, bytes).unwrap();
    signed.key
}

// ── Scenario 1: cold biometric admission ────────────────────────────────
#[test]
fn scenario_cold_biometric_admission() {
    let h = harness();
    seed_pet(&h.store, "pet_a", "user_1");
    let key = stage_nose_print(&h.objects, "user_1", b"nose-a-bytes");

    let outcome = h.biometric.admit_nose_print("pet_a", "user_1", &key).unwrap();

    assert_eq!(outcome.status, happydog_core::biometric::AdmissionStatus::Success);
    assert_eq!(outcome.ordinal_id, Some(0));
    let pet: Pet = h.store.get("pets", "pet_a").unwrap().unwrap();
    assert!(pet.is_verified);
    assert_eq!(pet.vector_index_id, Some(0));
}

// ── Scenario 2: duplicate rejection ─────────────────────────────────────
#[test]
fn scenario_duplicate_rejection_does_not_disclose_owner() {
    let h = harness();
    seed_pet(&h.store, "pet_a", "user_1");
    seed_pet(&h.store, "pet_b", "user_2");
    let key_a = stage_nose_print(&h.objects, "user_1", b"identical-biometric");
    let key_b = stage_nose_print(&h.objects, "user_2", b"identical-biometric");

    h.biometric.admit_nose_print("pet_a", "user_1", &key_a).unwrap();
    let outcome = h.biometric.admit_nose_print("pet_b", "user_2", &key_b).unwrap();

    assert_eq!(outcome.status, happydog_core::biometric::AdmissionStatus::Duplicate);
    assert_eq!(outcome.nearest_id, Some(0));
    let pet_b: Pet = h.store.get("pets", "pet_b").unwrap().unwrap();
    assert!(!pet_b.is_verified);
}

// ── Scenario 3: already-verified short-circuit ──────────────────────────
#[test]
fn scenario_already_verified_short_circuits() {
    let h = harness();
    seed_pet(&h.store, "pet_a", "user_1");
    let key = stage_nose_print(&h.objects, "user_1", b"nose-a-bytes");
    h.biometric.admit_nose_print("pet_a", "user_1", &key).unwrap();

    let outcome = h.biometric.admit_nose_print("pet_a", "user_1", &key).unwrap();
    assert_eq!(outcome.status, happydog_core::biometric::AdmissionStatus::AlreadyVerified);
}

// ── Scenario 4: like toggle race ────────────────────────────────────────
#[test]
fn scenario_concurrent_like_toggle_leaves_consistent_state() {
    let h = harness();
    seed_user(&h.store, "user_1", "author");
    h.pets
        .register_pet("user_1", "Rex", Gender::Male, "Pug", clock::today(), 8.0, None, vec![])
        .unwrap();

    let key = {
        let signed = h.objects.issue_signed_upload(UploadNamespace::Posts, "user_1", "jpg", "image/jpeg").unwrap();
        h.objects.write_for_test(&signed.key, b"img").unwrap();
        signed.key
    };
    let post = h.social.create_post("user_1", "hello", &[key]).unwrap();

    let social_a = h.social.clone();
    let social_b = h.social.clone();
    let post_id_a = post.post_id.clone();
    let post_id_b = post.post_id.clone();

    let t1 = std::thread::spawn(move || social_a.toggle_like("user_1", SubjectType::Post, &post_id_a));
    let t2 = std::thread::spawn(move || social_b.toggle_like("user_1", SubjectType::Post, &post_id_b));

    let r1 = t1.join().unwrap();
    let r2 = t2.join().unwrap();
    assert!(r1.is_ok() && r2.is_ok());

    let final_post = h.store.get::<happydog_core::model::Post>("posts", &post.post_id).unwrap().unwrap();
    assert!(final_post.like_count == 0 || final_post.like_count == 1);

    let liked = h.social.batch_liked_subject_ids("user_1", SubjectType::Post, &[&post.post_id]).unwrap();
    if final_post.like_count == 1 {
        assert!(liked.contains(&post.post_id));
    } else {
        assert!(!liked.contains(&post.post_id));
    }
}

// ── Scenario 5: cartoon cancel ───────────────────────────────────────────
#[tokio::test]
async fn scenario_cartoon_job_cancel_before_worker_runs() {
    let h = harness();
    seed_user(&h.store, "user_1", "alice");
    let signed = h
        .objects
        .issue_signed_upload(UploadNamespace::CartoonSources, "user_1", "jpg", "image/jpeg")
        .unwrap();
    h.objects.write_for_test(&signed.key, b"dog-photo").unwrap();

    let job = h.jobs.submit("user_1", &signed.key, None).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);

    // On the current-thread test runtime, the spawned worker has not yet
    // been polled at this point — this cancel lands before the worker's
    // first checkpoint read, deterministically.
    let canceled = h.jobs.cancel(&job.job_id, "user_1").unwrap();
    assert_eq!(canceled.status, JobStatus::Canceling);

    // Yield so the worker task runs to its terminal transition.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let final_job = h.jobs.get_job(&job.job_id, "user_1").unwrap();
    assert_eq!(final_job.status, JobStatus::Failed);
    assert_eq!(final_job.error_message.as_deref(), Some("canceled by user"));

    let page: happydog_core::docstore::QueryPage<happydog_core::model::Notification> =
        h.store.query("notifications", &[], 10, None).unwrap();
    assert!(page.docs.iter().any(|n| n.recipient_id == "user_1" && n.notification_type == NotificationType::CartoonFailed));
}

#[tokio::test]
async fn cartoon_job_succeeds_and_creates_a_post() {
    let h = harness();
    seed_user(&h.store, "user_1", "alice");
    h.pets.register_pet("user_1", "Rex", Gender::Male, "Pug", clock::today(), 8.0, None, vec![]).unwrap();
    let signed = h
        .objects
        .issue_signed_upload(UploadNamespace::CartoonSources, "user_1", "jpg", "image/jpeg")
        .unwrap();
    h.objects.write_for_test(&signed.key, b"dog-photo").unwrap();

    let job = h.jobs.submit("user_1", &signed.key, Some("a birthday party".into())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let final_job = h.jobs.get_job(&job.job_id, "user_1").unwrap();
    assert_eq!(final_job.status, JobStatus::Completed);
    assert!(final_job.result_image_url.is_some());

    let page: happydog_core::docstore::QueryPage<happydog_core::model::Post> =
        h.store.query("posts", &[], 10, None).unwrap();
    assert_eq!(page.docs.len(), 1);
}

#[tokio::test]
async fn cartoon_job_generation_failure_transitions_to_failed() {
    let h = harness_with_generation_client(Arc::new(job_fakes::FailingGenerationClient));
    seed_user(&h.store, "user_1", "alice");
    let signed = h
        .objects
        .issue_signed_upload(UploadNamespace::CartoonSources, "user_1", "jpg", "image/jpeg")
        .unwrap();
    h.objects.write_for_test(&signed.key, b"dog-photo").unwrap();

    let job = h.jobs.submit("user_1", &signed.key, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let final_job = h.jobs.get_job(&job.job_id, "user_1").unwrap();
    assert_eq!(final_job.status, JobStatus::Failed);
    assert!(final_job.error_message.is_some());
}

// ── Scenario 6: comment with mention fans out ───────────────────────────
#[test]
fn scenario_comment_with_mention_fans_out() {
    let h = harness();
    seed_user(&h.store, "user_1", "commenter");
    seed_user(&h.store, "user_2", "author");
    seed_user(&h.store, "user_3", "alice");
    h.pets.register_pet("user_2", "Rex", Gender::Male, "Pug", clock::today(), 8.0, None, vec![]).unwrap();
    let key = {
        let signed = h.objects.issue_signed_upload(UploadNamespace::Posts, "user_2", "jpg", "image/jpeg").unwrap();
        h.objects.write_for_test(&signed.key, b"img").unwrap();
        signed.key
    };
    let post = h.social.create_post("user_2", "look at my dog", &[key]).unwrap();

    h.social.create_comment(&post.post_id, "user_1", "@alice nice dog!").unwrap();

    let updated_post: happydog_core::model::Post = h.store.get("posts", &post.post_id).unwrap().unwrap();
    assert_eq!(updated_post.comment_count, 1);

    let page: happydog_core::docstore::QueryPage<happydog_core::model::Notification> =
        h.store.query("notifications", &[], 10, None).unwrap();
    assert_eq!(page.docs.len(), 2);
    let recipients: std::collections::HashSet<_> = page.docs.iter().map(|n| n.recipient_id.clone()).collect();
    assert!(recipients.contains("user_2"));
    assert!(recipients.contains("user_3"));
    assert!(!recipients.contains("user_1"));
}

// ── register_pet + get_pet round trip ────────────────────────────────────
#[test]
fn register_pet_then_get_pet_round_trips_including_care_settings() {
    let h = harness();
    let (pet, settings) = h
        .pets
        .register_pet("user_1", "Daisy", Gender::Female, "Beagle", clock::today(), 10.0, Some("brown".into()), vec![])
        .unwrap();
    let fetched = h.pets.get_pet(&pet.pet_id).unwrap().unwrap();
    assert_eq!(fetched.name, "Daisy");
    let fetched_settings = h.pets.get_care_settings(&pet.pet_id).unwrap().unwrap();
    assert_eq!(fetched_settings.goal_weight_kg, settings.goal_weight_kg);
}

// ── jobs are never deduplicated ──────────────────────────────────────────
#[tokio::test]
async fn two_identical_cartoon_submissions_yield_distinct_job_ids() {
    let h = harness();
    seed_user(&h.store, "user_1", "alice");
    let signed = h
        .objects
        .issue_signed_upload(UploadNamespace::CartoonSources, "user_1", "jpg", "image/jpeg")
        .unwrap();
    h.objects.write_for_test(&signed.key, b"dog-photo").unwrap();

    let job1 = h.jobs.submit("user_1", &signed.key, None).await.unwrap();
    let job2 = h.jobs.submit("user_1", &signed.key, None).await.unwrap();
    assert_ne!(job1.job_id, job2.job_id);
}
