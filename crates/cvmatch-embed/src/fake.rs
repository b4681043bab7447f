use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use cvmatch_core::{Embedder, Result};

/// Hashes whitespace tokens into a fixed number of buckets and L2-normalizes.
/// Texts sharing tokens get a positive cosine; identical texts get identical
/// vectors.
#[derive(Debug, Clone)]
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn deterministic_and_normalized() {
        let e = FakeEmbedder::new(64);
        let a = e.embed("Senior Python developer").unwrap();
        let b = e.embed("senior python DEVELOPER").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn shared_tokens_raise_similarity() {
        let e = FakeEmbedder::new(256);
        let q = e.embed("python django").unwrap();
        let near = e.embed("python django sql").unwrap();
        let far = e.embed("accountant quickbooks").unwrap();
        assert!(cosine(&q, &near) > cosine(&q, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = FakeEmbedder::new(8).embed("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
