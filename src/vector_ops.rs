use crate::config::{Number, EPSILON};
use wide::f32x8;

/// Inner product of two equal-length vectors using SIMD lanes of 8.
/// For unit-norm inputs this is their cosine similarity.
pub fn dot_product_simd(a: &[Number], b: &[Number]) -> Option<Number> {
    if a.len() != b.len() {
        log::debug!("vector length mismatch: {} vs {}", a.len(), b.len());
        return None;
    }

    let mut dot_product = f32x8::splat(0.0);

    let len = a.len();
    let simd_len = len - (len % 8);

    for i in (0..simd_len).step_by(8) {
        let va = f32x8::new([
            a[i],
            a[i + 1],
            a[i + 2],
            a[i + 3],
            a[i + 4],
            a[i + 5],
            a[i + 6],
            a[i + 7],
        ]);
        let vb = f32x8::new([
            b[i],
            b[i + 1],
            b[i + 2],
            b[i + 3],
            b[i + 4],
            b[i + 5],
            b[i + 6],
            b[i + 7],
        ]);
        dot_product += va * vb;
    }

    let mut scalar_dot_product = dot_product.reduce_add();

    // Handle remaining elements
    for i in simd_len..len {
        scalar_dot_product += a[i] * b[i];
    }

    Some(scalar_dot_product)
}

pub fn l2_norm(vector: &[Number]) -> Number {
    vector.iter().map(|&x| x * x).sum::<Number>().sqrt()
}

/// Scales `vector` to unit length. Vectors with (near) zero magnitude are set to
/// exactly zero so the result is either unit-norm or the all-zero vector.
pub fn normalize_vector(vector: &mut [Number]) {
    let magnitude = l2_norm(vector);
    if magnitude > EPSILON {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    } else {
        vector.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_product_covers_simd_and_tail() {
        let a: Vec<Number> = (1..=11).map(|x| x as Number).collect();
        let b = vec![1.0; 11];
        assert_eq!(dot_product_simd(&a, &b), Some(66.0));
    }

    #[test]
    fn dot_product_rejects_length_mismatch() {
        assert_eq!(dot_product_simd(&[1.0, 2.0], &[1.0]), None);
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        normalize_vector(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < EPSILON);
        assert_eq!(v, vec![0.6, 0.8]);
    }

    #[test]
    fn normalize_zero_vector_stays_zero() {
        let mut v = vec![0.0; 16];
        normalize_vector(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
