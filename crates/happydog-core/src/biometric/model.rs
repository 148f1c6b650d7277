use crate::error::CoreResult;

/// Crops the subject's nose out of a larger photo. `Ok(None)` means "no nose
/// detected" — the caller falls back to the whole image rather than failing
/// admission outright (spec.md §4.7 step 2).
pub trait NoseDetector: Send + Sync {
    fn detect(&self, image: &[u8]) -> CoreResult<Option<Vec<u8>>>;
}

/// Produces a fixed-dimension embedding from a (possibly already-cropped)
/// nose image.
pub trait EmbeddingExtractor: Send + Sync {
    fn extract(&self, image: &[u8]) -> CoreResult<Vec<f32>>;
}

/// Deterministic fakes for tests and the CLI's scratch mode. Exposed
/// unconditionally (not `#[cfg(test)]`-gated) so both in-crate tests and an
/// external integration binary can reach them.
pub mod testing {
    use super::*;

    /// Never crops — hands the whole image straight to the extractor.
    pub struct PassthroughDetector;

    impl NoseDetector for PassthroughDetector {
        fn detect(&self, _image: &[u8]) -> CoreResult<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    /// Always reports "no nose found", exercising the fallback-to-full-image
    /// path.
    pub struct MissDetector;

    impl NoseDetector for MissDetector {
        fn detect(&self, _image: &[u8]) -> CoreResult<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    /// Always errors, exercising the "detector failed, fall back anyway"
    /// path.
    pub struct FailingDetector;

    impl NoseDetector for FailingDetector {
        fn detect(&self, _image: &[u8]) -> CoreResult<Option<Vec<u8>>> {
            Err(crate::error::CoreError::upstream("nose_detector", "model unavailable"))
        }
    }

    /// Hashes the input bytes into a deterministic fixed-dimension vector —
    /// identical bytes always produce identical embeddings, which is what
    /// the duplicate-detection tests rely on.
    pub struct ConstantEmbeddingExtractor {
        dimension: usize,
    }

    impl ConstantEmbeddingExtractor {
        pub fn new(dimension: usize) -> Self {
            ConstantEmbeddingExtractor { dimension }
        }
    }

    impl EmbeddingExtractor for ConstantEmbeddingExtractor {
        fn extract(&self, image: &[u8]) -> CoreResult<Vec<f32>> {
            let mut seed: u64 = 1469598103934665603;
            for byte in image {
                seed ^= *byte as u64;
                seed = seed.wrapping_mul(1099511628211);
            }
            let mut vector = Vec::with_capacity(self.dimension);
            let mut state = seed;
            for i in 0..self.dimension {
                state = state.wrapping_add((i as u64).wrapping_mul(2654435761));
                let normalized = (state % 1000) as f32 / 1000.0;
                vector.push(normalized);
            }
            Ok(vector)
        }
    }
}
