//! 疎ベクトル（素性キーマップ）のベクトル演算
//!
//! Vector algebra for sparse vectors (feature-key maps).
//!
//! Features missing from one operand are treated as zero. All operations
//! allocate a fresh result map except [`scale`] and [`normalize`], which are
//! destructive on their argument and must not be applied to vectors shared
//! with a store without copying first.

use crate::vector::SparseVector;

/// `v1 + v2` over the union of feature keys.
#[must_use]
pub fn add(v1: &SparseVector, v2: &SparseVector) -> SparseVector {
    let mut result = SparseVector::with_capacity(v1.len().max(v2.len()));
    for (k, a) in v1 {
        if !v2.contains_key(k) {
            result.insert(k.clone(), *a);
        }
    }
    for (k, b) in v2 {
        match v1.get(k) {
            Some(a) => result.insert(k.clone(), a + b),
            None => result.insert(k.clone(), *b),
        };
    }
    result
}

/// `v1 - v2`; keys exclusive to `v2` appear negated in the result.
#[must_use]
pub fn sub(v1: &SparseVector, v2: &SparseVector) -> SparseVector {
    let mut result = SparseVector::with_capacity(v1.len().max(v2.len()));
    for (k, a) in v1 {
        match v2.get(k) {
            Some(b) => result.insert(k.clone(), a - b),
            None => result.insert(k.clone(), *a),
        };
    }
    for (k, b) in v2 {
        if !v1.contains_key(k) {
            result.insert(k.clone(), -b);
        }
    }
    result
}

/// Element-wise multiplication over the intersection of feature keys.
#[must_use]
pub fn mul(v1: &SparseVector, v2: &SparseVector) -> SparseVector {
    let mut result = SparseVector::new();
    for (k, a) in v1 {
        if let Some(b) = v2.get(k) {
            result.insert(k.clone(), a * b);
        }
    }
    result
}

/// Multiply with a scalar, in place.
pub fn scale(v: &mut SparseVector, scalar: f32) {
    for value in v.values_mut() {
        *value *= scalar;
    }
}

/// Dot product over the intersection of feature keys.
#[must_use]
pub fn dot(v1: &SparseVector, v2: &SparseVector) -> f32 {
    let mut sp = 0.0;
    for (k, a) in v1 {
        if let Some(b) = v2.get(k) {
            sp += a * b;
        }
    }
    sp
}

/// Choose for each feature the value with the higher absolute value; ties
/// keep the value from `v1`.
#[must_use]
pub fn extrema(v1: &SparseVector, v2: &SparseVector) -> SparseVector {
    let mut result = SparseVector::with_capacity(v1.len().max(v2.len()));
    for (k, a) in v1 {
        match v2.get(k) {
            Some(b) => {
                let chosen = if a.abs() >= b.abs() { *a } else { *b };
                result.insert(k.clone(), chosen);
            }
            None => {
                result.insert(k.clone(), *a);
            }
        }
    }
    for (k, b) in v2 {
        if !v1.contains_key(k) {
            result.insert(k.clone(), *b);
        }
    }
    result
}

/// Average of all vectors in the list: sum per feature, then divide by the
/// list length.
#[must_use]
pub fn average(vectors: &[SparseVector]) -> SparseVector {
    let mut result = SparseVector::new();
    for v in vectors {
        for (k, x) in v {
            *result.entry(k.clone()).or_insert(0.0) += x;
        }
    }
    let n = vectors.len() as f32;
    for value in result.values_mut() {
        *value /= n;
    }
    result
}

/// L2 norm.
#[must_use]
pub fn norm(v: &SparseVector) -> f32 {
    v.values().map(|x| x * x).sum::<f32>().sqrt()
}

/// Convert to unit length, in place.
pub fn normalize(v: &mut SparseVector) {
    let n = norm(v);
    for value in v.values_mut() {
        *value /= n;
    }
}
