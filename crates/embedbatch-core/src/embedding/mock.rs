use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::EmbeddingGenerator;
use crate::data::CoreError;

/// Deterministic pseudo-random embeddings seeded from the text.
///
/// Identical text always yields a bit-identical vector with components in `[-1, 1)`.
#[derive(Debug, Clone)]
pub struct MockEmbeddingGenerator {
    dimension: usize,
}

impl MockEmbeddingGenerator {
    pub fn new(dimension: usize) -> Result<Self, CoreError> {
        if dimension == 0 {
            return Err(CoreError::Configuration(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// Synchronous form of `generate_embedding`.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(text_seed(text));
        (0..self.dimension).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }
}

/// `seed = seed * 31 + code_point` over the text, wrapping on overflow.
fn text_seed(text: &str) -> u64 {
    text.chars()
        .fold(0i64, |seed, c| seed.wrapping_mul(31).wrapping_add(c as i64)) as u64
}

#[async_trait]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        Ok(self.embed(text))
    }
}
