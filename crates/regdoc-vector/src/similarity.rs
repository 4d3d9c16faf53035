/// Euclidean norm.
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity in `[-1, 1]`. Zero when either vector has no magnitude
/// or the lengths differ.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let denom = magnitude(a) * magnitude(b);
    if denom == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / denom
}

/// Cosine similarity when the query magnitude is already known.
#[inline]
pub fn cosine_with_magnitude(a: &[f32], a_mag: f32, b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let denom = a_mag * magnitude(b);
    if denom == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / denom
}
