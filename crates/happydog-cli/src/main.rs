// HappyDog operator CLI — exercises the core's services locally without
// standing up the (out-of-scope) HTTP layer. Mirrors the teacher's
// `openpawz` CLI: a thin `clap`-derive wrapper over the core library,
// installing `env_logger` for human-facing diagnostics.

use clap::{Parser, Subcommand};
use happydog_core::biometric::{fakes as biometric_fakes, BiometricAdmissionService};
use happydog_core::clock;
use happydog_core::docstore::DocStore;
use happydog_core::error::CoreResult;
use happydog_core::jobs::{fakes as job_fakes, JobOrchestrator};
use happydog_core::model::{Gender, SubjectType, User};
use happydog_core::notifications::NotificationService;
use happydog_core::objectstore::{ObjectStore, UploadNamespace};
use happydog_core::pets::PetService;
use happydog_core::social::SocialGraphService;
use happydog_core::vectorindex::VectorIndex;
use happydog_core::Config;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "happydog", version, about = "Operator CLI for the HappyDog pet-care backend core")]
struct Cli {
    /// Root directory the local DocStore/ObjectStore/VectorIndex live under.
    #[arg(long, env = "HAPPYDOG_DATA_DIR", default_value = "./happydog-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user document.
    CreateUser { nickname: String, email: String, #[arg(long)] external_sub: Option<String> },

    /// Register a pet (and seed its care settings) for a user.
    RegisterPet {
        owner_user_id: String,
        name: String,
        #[arg(value_enum)]
        gender: GenderArg,
        breed: String,
        /// YYYY-MM-DD
        birthdate: String,
        initial_weight_kg: f64,
        #[arg(long)]
        fur_color: Option<String>,
        #[arg(long = "health-concern")]
        health_concerns: Vec<String>,
    },

    /// Print a pet and its care settings.
    GetPet { pet_id: String },

    /// Stage a local file under `nose_prints_staging/{user_id}/...` and
    /// print the resulting staging key.
    StageNosePrint { user_id: String, file: PathBuf, #[arg(long, default_value = "jpg")] ext: String },

    /// Run the biometric admission pipeline for a staged nose-print.
    SubmitNosePrint { pet_id: String, user_id: String, staging_key: String },

    /// Stage a local file under `posts/{user_id}/...` and print the key.
    StagePostImage { user_id: String, file: PathBuf, #[arg(long, default_value = "jpg")] ext: String },

    /// Create a post from already-staged image keys.
    CreatePost { user_id: String, text: String, image_keys: Vec<String> },

    /// List the most recent posts in the feed.
    Feed { #[arg(long)] viewer: Option<String>, #[arg(long, default_value_t = 10)] limit: i64 },

    /// Toggle a like on a post or comment.
    ToggleLike { user_id: String, #[arg(value_enum)] subject_type: SubjectTypeArg, subject_id: String },

    /// Comment on a post (mentions in `text` fan out automatically).
    CreateComment { post_id: String, author_id: String, text: String },

    /// Stage a local file under `cartoon_sources/{user_id}/...` and print the key.
    StageCartoonSource { user_id: String, file: PathBuf, #[arg(long, default_value = "jpg")] ext: String },

    /// Submit a cartoon-generation job and print the assigned job id.
    SubmitCartoonJob { user_id: String, source_key: String, #[arg(long)] text: Option<String> },

    /// Poll a cartoon job's current status.
    JobStatus { job_id: String, user_id: String },

    /// Request cancellation of a PROCESSING cartoon job.
    CancelJob { job_id: String, user_id: String },

    /// Print the VectorIndex's committed vector count and snapshot path.
    VectorIndexInfo,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum GenderArg {
    Male,
    Female,
}

impl From<GenderArg> for Gender {
    fn from(g: GenderArg) -> Self {
        match g {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SubjectTypeArg {
    Post,
    Comment,
}

impl From<SubjectTypeArg> for SubjectType {
    fn from(s: SubjectTypeArg) -> Self {
        match s {
            SubjectTypeArg::Post => SubjectType::Post,
            SubjectTypeArg::Comment => SubjectType::Comment,
        }
    }
}

struct Core {
    store: Arc<DocStore>,
    objects: Arc<ObjectStore>,
    index: Arc<VectorIndex>,
    config: Config,
    social: Arc<SocialGraphService>,
    pets: PetService,
    biometric: BiometricAdmissionService,
    jobs: Arc<JobOrchestrator>,
}

impl Core {
    fn open(data_dir: &PathBuf) -> CoreResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::from_env();
        let store = Arc::new(DocStore::open(data_dir.join("docstore.sqlite3").to_str().unwrap())?);
        let objects = Arc::new(ObjectStore::new(data_dir.join("objects"), "https://media.happydog.local"));
        let index = Arc::new(VectorIndex::open(data_dir.join("vectorindex.bin"), config.vector_dimension)?);
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
            Arc::new(job_fakes::FixedAnalysisClient::new("a happy dog playing in a sunny yard")),
            Arc::new(job_fakes::CountingGenerationClient::new("https://media.happydog.local/generated")),
            &config,
        ));
        Ok(Core { store, objects, index, config, social, pets, biometric, jobs })
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!("{}", serde_json::to_string_pretty(value).expect("CLI output is always serializable"));
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CoreResult<()> {
    let core = Core::open(&cli.data_dir)?;

    match cli.command {
        Commands::CreateUser { nickname, email, external_sub } => {
            let user = User {
                user_id: clock::new_uuid(),
                external_sub: external_sub.unwrap_or_else(clock::new_uuid),
                email,
                nickname,
                profile_image_url: None,
                fcm_token: None,
                joined_at: clock::now(),
            };
            core.store.set("users", &user.user_id, &user.joined_at.to_rfc3339(), &user)?;
            print_json(&user);
        }

        Commands::RegisterPet { owner_user_id, name, gender, breed, birthdate, initial_weight_kg, fur_color, health_concerns } => {
            let birthdate = chrono::NaiveDate::parse_from_str(&birthdate, "%Y-%m-%d")
                .map_err(|e| happydog_core::CoreError::validation(format!("invalid birthdate: {e}")))?;
            let (pet, settings) = core.pets.register_pet(
                &owner_user_id,
                &name,
                gender.into(),
                &breed,
                birthdate,
                initial_weight_kg,
                fur_color,
                health_concerns,
            )?;
            print_json(&serde_json::json!({ "pet": pet, "care_settings": settings }));
        }

        Commands::GetPet { pet_id } => {
            let pet = core.pets.get_pet(&pet_id)?;
            let settings = core.pets.get_care_settings(&pet_id)?;
            print_json(&serde_json::json!({ "pet": pet, "care_settings": settings }));
        }

        Commands::StageNosePrint { user_id, file, ext } => {
            let bytes = std::fs::read(&file)?;
            let signed = core.objects.issue_signed_upload(UploadNamespace::NosePrintsStaging, &user_id, &ext, "image/jpeg")?;
            core.objects.write_for_test(&signed.key, &bytes)?;
            print_json(&serde_json::json!({ "staging_key": signed.key }));
        }

        Commands::SubmitNosePrint { pet_id, user_id, staging_key } => {
            let outcome = core.biometric.admit_nose_print(&pet_id, &user_id, &staging_key)?;
            print_json(&serde_json::json!({
                "status": format!("{:?}", outcome.status).to_uppercase(),
                "distance": outcome.distance,
                "nearest_id": outcome.nearest_id,
                "ordinal_id": outcome.ordinal_id,
            }));
        }

        Commands::StagePostImage { user_id, file, ext } => {
            let bytes = std::fs::read(&file)?;
            let signed = core.objects.issue_signed_upload(UploadNamespace::Posts, &user_id, &ext, "image/jpeg")?;
            core.objects.write_for_test(&signed.key, &bytes)?;
            print_json(&serde_json::json!({ "staging_key": signed.key }));
        }

        Commands::CreatePost { user_id, text, image_keys } => {
            let post = core.social.create_post(&user_id, &text, &image_keys)?;
            print_json(&post);
        }

        Commands::Feed { viewer, limit } => {
            let page = core.social.feed(Some(limit), None, viewer.as_deref())?;
            let posts: Vec<_> = page
                .posts
                .into_iter()
                .map(|v| serde_json::json!({ "post": v.post, "is_liked": v.is_liked }))
                .collect();
            print_json(&serde_json::json!({ "posts": posts, "next_cursor": page.next_cursor }));
        }

        Commands::ToggleLike { user_id, subject_type, subject_id } => {
            let result = core.social.toggle_like(&user_id, subject_type.into(), &subject_id)?;
            print_json(&serde_json::json!({ "liked": result.liked, "like_count": result.like_count }));
        }

        Commands::CreateComment { post_id, author_id, text } => {
            let comment = core.social.create_comment(&post_id, &author_id, &text)?;
            print_json(&comment);
        }

        Commands::StageCartoonSource { user_id, file, ext } => {
            let bytes = std::fs::read(&file)?;
            let signed = core.objects.issue_signed_upload(UploadNamespace::CartoonSources, &user_id, &ext, "image/jpeg")?;
            core.objects.write_for_test(&signed.key, &bytes)?;
            print_json(&serde_json::json!({ "staging_key": signed.key }));
        }

        Commands::SubmitCartoonJob { user_id, source_key, text } => {
            let job = core.jobs.submit(&user_id, &source_key, text).await?;
            print_json(&job);
        }

        Commands::JobStatus { job_id, user_id } => {
            let job = core.jobs.get_job(&job_id, &user_id)?;
            print_json(&job);
        }

        Commands::CancelJob { job_id, user_id } => {
            let job = core.jobs.cancel(&job_id, &user_id)?;
            print_json(&job);
        }

        Commands::VectorIndexInfo => {
            print_json(&serde_json::json!({
                "count": core.index.count(),
                "dimension": core.config.vector_dimension,
                "snapshot_path": core.index.snapshot_path(),
            }));
        }
    }

    Ok(())
}
