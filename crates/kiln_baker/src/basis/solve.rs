//! Small dense solvers for per-texel normal equations.
//!
//! Matrices are row-major `n x n` slices. Everything runs in f64 since the
//! normal equations square the condition number of the lobe fit.

const RIDGE: f64 = 1e-6;

/// Copies `a` into f64 with a ridge of `RIDGE * trace / n` on the diagonal.
pub fn regularized(a: &[f32], n: usize) -> Vec<f64> {
    let mut m: Vec<f64> = a[..n * n].iter().map(|&v| v as f64).collect();
    let trace: f64 = (0..n).map(|i| m[i * n + i]).sum();
    let ridge = (RIDGE * trace / n.max(1) as f64).max(f64::MIN_POSITIVE);
    for i in 0..n {
        m[i * n + i] += ridge;
    }
    m
}

/// In-place Cholesky factorization. Returns `false` if `a` is not positive definite.
fn cholesky(a: &mut [f64], n: usize) -> bool {
    for j in 0..n {
        let mut d = a[j * n + j];
        for k in 0..j {
            d -= a[j * n + k] * a[j * n + k];
        }
        if d <= 0.0 {
            return false;
        }
        let d = d.sqrt();
        a[j * n + j] = d;
        for i in j + 1..n {
            let mut s = a[i * n + j];
            for k in 0..j {
                s -= a[i * n + k] * a[j * n + k];
            }
            a[i * n + j] = s / d;
        }
    }
    true
}

fn cholesky_substitute(l: &[f64], n: usize, b: &[f64], x: &mut [f64]) {
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l[i * n + k] * x[k];
        }
        x[i] = s / l[i * n + i];
    }
    for i in (0..n).rev() {
        let mut s = x[i];
        for k in i + 1..n {
            s -= l[k * n + i] * x[k];
        }
        x[i] = s / l[i * n + i];
    }
}

/// Solves `a x = b` for symmetric positive definite `a`.
pub fn solve_spd(a: &[f64], b: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut l = a[..n * n].to_vec();
    if !cholesky(&mut l, n) {
        return None;
    }
    let mut x = vec![0.0; n];
    cholesky_substitute(&l, n, b, &mut x);
    Some(x)
}

/// Solves the system restricted to the `set` rows and columns, zero elsewhere.
fn solve_subset(a: &[f64], b: &[f64], n: usize, set: &[usize]) -> Option<Vec<f64>> {
    let m = set.len();
    let mut sub = vec![0.0; m * m];
    let mut rhs = vec![0.0; m];
    for (r, &i) in set.iter().enumerate() {
        rhs[r] = b[i];
        for (c, &j) in set.iter().enumerate() {
            sub[r * m + c] = a[i * n + j];
        }
    }
    let y = solve_spd(&sub, &rhs, m)?;
    let mut z = vec![0.0; n];
    for (r, &i) in set.iter().enumerate() {
        z[i] = y[r];
    }
    Some(z)
}

/// Lawson-Hanson active set NNLS on the normal equations `a x = b`, `x >= 0`.
pub fn nnls(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    const TOLERANCE: f64 = 1e-10;
    let mut x = vec![0.0; n];
    let mut passive: Vec<usize> = Vec::with_capacity(n);

    for _ in 0..3 * n.max(1) {
        // gradient of the residual
        let w: Vec<f64> = (0..n)
            .map(|i| b[i] - (0..n).map(|j| a[i * n + j] * x[j]).sum::<f64>())
            .collect();
        let next = (0..n)
            .filter(|i| !passive.contains(i))
            .max_by(|&i, &j| w[i].total_cmp(&w[j]));
        let Some(j) = next.filter(|&j| w[j] > TOLERANCE) else {
            break;
        };
        passive.push(j);

        loop {
            let Some(z) = solve_subset(a, b, n, &passive) else {
                passive.retain(|&i| i != j);
                return x;
            };
            if passive.iter().all(|&i| z[i] > TOLERANCE) {
                x = z;
                break;
            }
            let alpha = passive
                .iter()
                .filter(|&&i| z[i] <= TOLERANCE)
                .map(|&i| x[i] / (x[i] - z[i]))
                .fold(f64::INFINITY, f64::min);
            let alpha = if alpha.is_finite() { alpha } else { 0.0 };
            for i in 0..n {
                x[i] += alpha * (z[i] - x[i]);
            }
            passive.retain(|&i| x[i] > TOLERANCE);
            for i in 0..n {
                if !passive.contains(&i) {
                    x[i] = 0.0;
                }
            }
            if passive.is_empty() {
                break;
            }
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_spd() {
        let a = [4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0];
        let expected = [1.0, -2.0, 3.0];
        let b: Vec<f64> = (0..3).map(|i| (0..3).map(|j| a[i * 3 + j] * expected[j]).sum()).collect();
        let x = solve_spd(&a, &b, 3).unwrap();
        for (x, e) in x.iter().zip(expected) {
            assert_relative_eq!(*x, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_solve_rejects_indefinite() {
        assert!(solve_spd(&[1.0, 2.0, 2.0, 1.0], &[1.0, 1.0], 2).is_none());
    }

    #[test]
    fn test_regularized_adds_ridge() {
        let m = regularized(&[2.0, 0.0, 0.0, 2.0], 2);
        assert!(m[0] > 2.0 && m[0] < 2.0 + 1e-5);
        assert_eq!(m[1], 0.0);
    }

    #[test]
    fn test_nnls_matches_unconstrained_when_positive() {
        let a = [2.0, 1.0, 1.0, 2.0];
        let x = nnls(&a, &[3.0, 3.0], 2);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nnls_clamps_negative_component() {
        // unconstrained solution is (-1, 2)
        let a = [2.0, 1.0, 1.0, 2.0];
        let x = nnls(&a, &[0.0, 3.0], 2);
        assert_eq!(x[0], 0.0);
        assert_relative_eq!(x[1], 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_nnls_all_negative_is_zero() {
        let x = nnls(&[1.0, 0.0, 0.0, 1.0], &[-1.0, -2.0], 2);
        assert_eq!(x, vec![0.0, 0.0]);
    }
}
