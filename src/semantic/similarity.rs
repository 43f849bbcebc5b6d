/// Norm floor so all-zero vectors score 0 instead of dividing by zero.
const NORM_EPSILON: f32 = 1e-9;

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity in [-1, 1]. Vectors of different length are compared
/// over their common prefix; callers filter those out first.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na = l2_norm(a).max(NORM_EPSILON);
    let nb = l2_norm(b).max(NORM_EPSILON);
    dot / (na * nb)
}
