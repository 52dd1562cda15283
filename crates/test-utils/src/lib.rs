//! Test helpers shared by the msuproj crates.
//!
//! - [`GcpGridSpec`] describes a synthetic, optionally skewed GCP grid and
//!   renders it in the GCP file format.
//! - [`TestDataset`] writes an image/GCP pair into a temporary directory.
//! - `assert_approx_eq!` / `assert_coords_approx_eq!` compare floats with
//!   a tolerance.
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, small_pass, TestDataset};
//!
//! let ds = TestDataset::new(small_pass(), 120, 100);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert that two numbers differ by at most `tol`.
///
/// Both sides are widened to `f64`, so mixed `f32`/`f64`/integer
/// operands are accepted. NaN never compares equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tol:expr) => {{
        let (actual, expected, tol) = ($actual as f64, $expected as f64, $tol as f64);
        let delta = (actual - expected).abs();
        assert!(
            delta <= tol,
            "{} = {} is not within {} of {} (off by {})",
            stringify!($actual),
            actual,
            tol,
            expected,
            delta
        );
    }};
}

/// Assert that two coordinate pairs agree component-wise within `tol`.
///
/// ```ignore
/// assert_coords_approx_eq!((row, col), (10.0, 20.0), 1e-6);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($a0:expr, $a1:expr), ($b0:expr, $b1:expr), $tol:expr) => {{
        $crate::assert_approx_eq!($a0, $b0, $tol);
        $crate::assert_approx_eq!($a1, $b1, $tol);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_within_tolerance() {
        assert_approx_eq!(0.30000001_f32, 0.3, 1e-6);
        assert_approx_eq!(-2.5, -2.5000004, 1e-6);
        assert_coords_approx_eq!((55.0, 37.0), (55.0000001, 36.9999999), 1e-6);
    }

    #[test]
    #[should_panic(expected = "is not within")]
    fn test_outside_tolerance() {
        assert_approx_eq!(1.5, 1.0, 0.1);
    }

    #[test]
    #[should_panic(expected = "is not within")]
    fn test_nan_never_matches() {
        assert_approx_eq!(f64::NAN, f64::NAN, 1.0);
    }
}
