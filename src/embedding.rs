use crate::error::Result;

/// Passage text beyond this many characters is not embedded.
pub const MAX_EMBED_CHARS: usize = 512;

/// A deterministic text → vector capability.
///
/// Implementations return L2-normalised vectors of a fixed dimension.
/// `embed` takes `&mut self` so a model can be loaded on first use.
pub trait Embedder {
    /// Identifier of the underlying model, stored alongside cached vectors.
    fn model_id(&self) -> &str;

    /// Embed one text.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;
}

impl<E: Embedder + ?Sized> Embedder for &mut E {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

/// The prefix of `text` that is fed to the embedder.
pub fn embedding_input(text: &str) -> &str {
    match text.char_indices().nth(MAX_EMBED_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Cosine similarity `a·b / (‖a‖‖b‖)`, clamped to `[-1, 1]`.
///
/// Zero vectors and vectors of different lengths score 0.
///
/// # Examples
///
/// ```
/// use docsearch::embedding::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm = l2_norm(a) * l2_norm(b);
    if norm == 0.0 || !norm.is_finite() {
        return 0.0;
    }
    (dot / norm).clamp(-1.0, 1.0)
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
