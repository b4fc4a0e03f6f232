use ndarray::Array2;

/// Euclidean distance between two points.
#[inline]
pub fn norm(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Pairwise distance matrix.
///
/// Entries involving a slot with `present[i] == false` and the diagonal are
/// zero, so padding never leaks into downstream kernels.
pub fn pairwise(positions: &[[f64; 3]], present: &[bool]) -> Array2<f64> {
    let n = positions.len();
    let mut distances = Array2::zeros((n, n));
    for i in 0..n {
        if !present[i] {
            continue;
        }
        for j in (i + 1)..n {
            if !present[j] {
                continue;
            }
            let r = norm(positions[i], positions[j]);
            distances[[i, j]] = r;
            distances[[j, i]] = r;
        }
    }
    distances
}
