use crate::error::AnalysisError;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Maps text to fixed-dimension dense vectors.
///
/// Implementations must be deterministic for identical input and must not
/// require `&mut self`, so one provider instance can be constructed at
/// process start and shared across requests.
pub trait Embedder {
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, AnalysisError>;

    /// Embeds a batch in one call. The default implementation loops; remote
    /// providers should override it with a single batched request.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AnalysisError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Scales `vector` to unit Euclidean norm. Zero vectors are left untouched
/// so they cannot poison inner-product scores with NaN.
pub fn l2_normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Deterministic hashed character-trigram embedder.
///
/// Stands in for a learned sentence encoder behind the same trait; useful in
/// tests and offline runs because identical text always embeds identically.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, AnalysisError> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }
}
