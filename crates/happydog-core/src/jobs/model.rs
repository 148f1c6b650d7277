use crate::error::CoreResult;
use async_trait::async_trait;

/// Produces a textual description of the source image — step 2 of the
/// worker loop (spec.md §4.8).
#[async_trait]
pub trait ImageAnalysisClient: Send + Sync {
    async fn analyze(&self, image_bytes: &[u8]) -> CoreResult<String>;
}

/// Invokes the external cartoon-generation API with the composed prompt,
/// returning a publicly reachable URL to the generated image.
#[async_trait]
pub trait ImageGenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> CoreResult<String>;
}

/// Deterministic fakes for tests and the CLI's scratch mode. Exposed
/// unconditionally so both in-crate tests and an external integration
/// binary can reach them.
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    pub struct FixedAnalysisClient {
        description: String,
    }

    impl FixedAnalysisClient {
        pub fn new(description: impl Into<String>) -> Self {
            FixedAnalysisClient { description: description.into() }
        }
    }

    #[async_trait]
    impl ImageAnalysisClient for FixedAnalysisClient {
        async fn analyze(&self, _image_bytes: &[u8]) -> CoreResult<String> {
            Ok(self.description.clone())
        }
    }

    pub struct FailingAnalysisClient;

    #[async_trait]
    impl ImageAnalysisClient for FailingAnalysisClient {
        async fn analyze(&self, _image_bytes: &[u8]) -> CoreResult<String> {
            Err(crate::error::CoreError::upstream("image_analysis", "analysis model unavailable"))
        }
    }

    /// Returns a counter-suffixed URL on every call and records how many
    /// times it was invoked, for assertions like "the generation API was
    /// never called after cancel".
    pub struct CountingGenerationClient {
        calls: AtomicU32,
        url_prefix: String,
    }

    impl CountingGenerationClient {
        pub fn new(url_prefix: impl Into<String>) -> Self {
            CountingGenerationClient { calls: AtomicU32::new(0), url_prefix: url_prefix.into() }
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageGenerationClient for CountingGenerationClient {
        async fn generate(&self, _prompt: &str) -> CoreResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{}/{}.png", self.url_prefix, n))
        }
    }

    /// Fails every call — used to exercise the circuit breaker and the
    /// PROCESSING → FAILED transition.
    pub struct FailingGenerationClient;

    #[async_trait]
    impl ImageGenerationClient for FailingGenerationClient {
        async fn generate(&self, _prompt: &str) -> CoreResult<String> {
            Err(crate::error::CoreError::upstream("image_generation", "provider returned 500"))
        }
    }

}
