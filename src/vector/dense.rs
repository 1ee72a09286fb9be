//! 密ベクトル（`f32`スライス）の基本ベクトル演算
//!
//! Basic vector algebra for dense vectors (`f32` slices).
//!
//! All pairwise operations require equal lengths and fail with
//! [`WordspaceError::Shape`] otherwise. Results are freshly allocated; the
//! inputs are never mutated.

use crate::error::{WordspaceError, WordspaceResult};

fn check_shape(v1: &[f32], v2: &[f32]) -> WordspaceResult<()> {
    if v1.len() != v2.len() {
        return Err(WordspaceError::Shape {
            left: v1.len(),
            right: v2.len(),
        });
    }
    Ok(())
}

/// `v1 + v2`.
pub fn add(v1: &[f32], v2: &[f32]) -> WordspaceResult<Vec<f32>> {
    check_shape(v1, v2)?;
    Ok(v1.iter().zip(v2).map(|(a, b)| a + b).collect())
}

/// `v1 - v2`.
pub fn sub(v1: &[f32], v2: &[f32]) -> WordspaceResult<Vec<f32>> {
    check_shape(v1, v2)?;
    Ok(v1.iter().zip(v2).map(|(a, b)| a - b).collect())
}

/// Element-wise multiplication.
pub fn mul(v1: &[f32], v2: &[f32]) -> WordspaceResult<Vec<f32>> {
    check_shape(v1, v2)?;
    Ok(v1.iter().zip(v2).map(|(a, b)| a * b).collect())
}

/// Multiply with a scalar.
#[must_use]
pub fn scale(v: &[f32], scalar: f32) -> Vec<f32> {
    v.iter().map(|a| a * scalar).collect()
}

/// Dot product (a scalar, not a vector).
pub fn dot(v1: &[f32], v2: &[f32]) -> WordspaceResult<f32> {
    check_shape(v1, v2)?;
    Ok(v1.iter().zip(v2).map(|(a, b)| a * b).sum())
}

/// Choose for each dimension the value with the higher absolute value; ties
/// keep the value from `v1`.
pub fn extrema(v1: &[f32], v2: &[f32]) -> WordspaceResult<Vec<f32>> {
    check_shape(v1, v2)?;
    Ok(v1
        .iter()
        .zip(v2)
        .map(|(a, b)| if a.abs() >= b.abs() { *a } else { *b })
        .collect())
}

/// Average of all vectors in the list. Returns `None` for an empty list; a
/// single-element list returns that vector unchanged.
pub fn average(vectors: &[Vec<f32>]) -> WordspaceResult<Option<Vec<f32>>> {
    let Some(first) = vectors.first() else {
        return Ok(None);
    };
    if vectors.len() == 1 {
        return Ok(Some(first.clone()));
    }

    let mut result = vec![0.0f32; first.len()];
    for v in vectors {
        if v.len() != result.len() {
            return Err(WordspaceError::Shape {
                left: result.len(),
                right: v.len(),
            });
        }
        for (r, x) in result.iter_mut().zip(v) {
            *r += x;
        }
    }
    let n = vectors.len() as f32;
    for r in result.iter_mut() {
        *r /= n;
    }
    Ok(Some(result))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_vec(len: usize) -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-1000.0f32..1000.0f32, len)
    }

    proptest! {
        #[test]
        fn add_commutative(v1 in arb_vec(16), v2 in arb_vec(16)) {
            let ab = add(&v1, &v2).unwrap();
            let ba = add(&v2, &v1).unwrap();
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn dot_with_self_is_norm_squared(v in arb_vec(32)) {
            let d = dot(&v, &v).unwrap();
            let expected: f32 = v.iter().map(|x| x * x).sum();
            prop_assert!((d - expected).abs() < 1e-3 * expected.abs().max(1.0));
        }

        #[test]
        fn sub_then_add_restores(v1 in arb_vec(16), v2 in arb_vec(16)) {
            let diff = sub(&v1, &v2).unwrap();
            let back = add(&diff, &v2).unwrap();
            for (a, b) in back.iter().zip(&v1) {
                prop_assert!((a - b).abs() < 1e-2);
            }
        }
    }
}
