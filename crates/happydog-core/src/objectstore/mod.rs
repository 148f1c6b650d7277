// ── ObjectStore Adapter (C3) ────────────────────────────────────────────
// Hands out bounded-lifetime signed upload URLs, downloads bytes, flips
// blobs to public, deletes blobs. The real deployment fronts a cloud object
// store (GCS/S3-shaped, per `original_source`'s `storage_service.py`); this
// module is a local filesystem stand-in rooted at one directory, used by
// tests and the CLI's scratch mode.

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const SIGNED_URL_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// The five namespaces the biometric/social/job/eye-analysis surfaces are
/// allowed to upload into. Anything else is `InvalidUploadType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadNamespace {
    UserProfiles,
    NosePrintsStaging,
    Posts,
    CartoonSources,
    EyeAnalysisImages,
}

impl UploadNamespace {
    fn prefix(&self) -> &'static str {
        match self {
            UploadNamespace::UserProfiles => "user_profiles",
            UploadNamespace::NosePrintsStaging => "nose_prints_staging",
            UploadNamespace::Posts => "posts",
            UploadNamespace::CartoonSources => "cartoon_sources",
            UploadNamespace::EyeAnalysisImages => "eye_analysis_images",
        }
    }

    pub fn parse(raw: &str) -> CoreResult<Self> {
        match raw {
            "user_profiles" => Ok(UploadNamespace::UserProfiles),
            "nose_prints_staging" => Ok(UploadNamespace::NosePrintsStaging),
            "posts" => Ok(UploadNamespace::Posts),
            "cartoon_sources" => Ok(UploadNamespace::CartoonSources),
            "eye_analysis_images" => Ok(UploadNamespace::EyeAnalysisImages),
            other => Err(CoreError::validation(format!("InvalidUploadType: {other}"))),
        }
    }
}

pub struct SignedUpload {
    pub key: String,
    pub url: String,
    pub method: &'static str,
    pub mime_type: String,
    pub expires_at: SystemTime,
}

/// Local-filesystem ObjectStore. `root` is the on-disk namespace root;
/// `public_base_url` is prefixed onto keys returned by `make_public`.
pub struct ObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        ObjectStore { root: root.into(), public_base_url: public_base_url.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Issue a PUT-bound, 15-minute, single-MIME-type, single-key signed
    /// upload URL. Unknown namespaces are rejected with `InvalidUploadType`.
    pub fn issue_signed_upload(
        &self,
        namespace: UploadNamespace,
        user_id: &str,
        ext: &str,
        mime_type: &str,
    ) -> CoreResult<SignedUpload> {
        let key = format!("{}/{}/{}.{}", namespace.prefix(), user_id, crate::clock::new_uuid(), ext);
        let expires_at = SystemTime::now() + SIGNED_URL_LIFETIME;
        // A real deployment asks the cloud provider's SDK to mint a
        // cryptographically signed URL; locally we just hand back a
        // file:// style reference scoped to this store's root.
        let url = format!("{}/{}?expires={}", self.public_base_url, key, expires_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs());
        Ok(SignedUpload { key, url, method: "PUT", mime_type: mime_type.to_string(), expires_at })
    }

    /// Strongly consistent download. `NotFound` if the key does not exist.
    pub fn download(&self, key: &str) -> CoreResult<Vec<u8>> {
        let path = self.path_for(key);
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::not_found(format!("object not found: {key}")),
            _ => CoreError::Io(e),
        })
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Flip a blob to public. Idempotent — calling twice returns the same
    /// stable URL.
    pub fn make_public(&self, key: &str) -> CoreResult<String> {
        if !self.exists(key) {
            return Err(CoreError::not_found(format!("object not found: {key}")));
        }
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    /// Best-effort delete. Failure is logged and swallowed — callers have
    /// already deleted the controlling document and must not block on
    /// media GC (spec.md §4.3).
    pub fn delete_best_effort(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("[objectstore] best-effort delete failed for {key}: {e}");
            }
        }
    }

    /// Test/CLI helper: write bytes directly under `root`, bypassing the
    /// signed-URL dance (stands in for "the client actually PUT the file").
    pub fn write_for_test(&self, key: &str, bytes: &[u8]) -> CoreResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recover the storage key from a URL previously returned by
    /// `make_public`. Used by callers (e.g. post deletion) that only kept
    /// the public URL around and now need to best-effort-delete the blob.
    pub fn key_from_public_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let prefix = format!("{}/", self.public_base_url);
        url.strip_prefix(&prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ObjectStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (ObjectStore::new(dir.path(), "https://media.happydog.test"), dir)
    }

    #[test]
    fn unknown_namespace_is_rejected() {
        assert!(UploadNamespace::parse("secret_dumps").is_err());
    }

    #[test]
    fn signed_upload_is_bound_to_namespace_and_user() {
        let (store, _dir) = store();
        let signed = store
            .issue_signed_upload(UploadNamespace::NosePrintsStaging, "user_1", "jpg", "image/jpeg")
            .unwrap();
        assert!(signed.key.starts_with("nose_prints_staging/user_1/"));
        assert_eq!(signed.method, "PUT");
    }

    #[test]
    fn download_missing_key_is_not_found() {
        let (store, _dir) = store();
        let err = store.download("nose_prints_staging/u/missing.jpg").unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn make_public_is_idempotent() {
        let (store, _dir) = store();
        store.write_for_test("posts/u1/a.jpg", b"bytes").unwrap();
        let first = store.make_public("posts/u1/a.jpg").unwrap();
        let second = store.make_public("posts/u1/a.jpg").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn delete_best_effort_never_panics_on_missing_file() {
        let (store, _dir) = store();
        store.delete_best_effort("posts/u1/does-not-exist.jpg");
    }
}
