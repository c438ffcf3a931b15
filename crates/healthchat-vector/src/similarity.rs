pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity with optional precomputed magnitudes. Zero-length
/// vectors score 0 against everything.
pub fn cosine_similarity(a: &[f32], b: &[f32], mag_a: Option<f32>, mag_b: Option<f32>) -> f32 {
    let ma = mag_a.unwrap_or_else(|| magnitude(a));
    let mb = mag_b.unwrap_or_else(|| magnitude(b));
    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (ma * mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0], None, None) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0], None, None).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0], None, None), 0.0);
    }
}
