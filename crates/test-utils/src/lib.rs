//! Generators, fixtures and float assertions shared by the workspace's
//! test suites.
//!
//! Generators are re-exported at the root; fixtures live in [`fixtures`].

pub mod fixtures;
pub mod generators;

pub use generators::*;

/// Panics unless `|left - right| <= tolerance`. NaN on either side never
/// passes.
///
/// ```
/// test_utils::assert_approx_eq!(0.95_f64.powi(2), 0.9025, 1e-12);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let (left, right, tolerance) = ($left as f64, $right as f64, $tolerance as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= tolerance,
            "assertion failed: {} ≈ {} (diff {} exceeds {})",
            left,
            right,
            diff,
            tolerance
        );
    }};
}
