#![cfg(feature = "ksp")]
//! End-to-end tests of `ShellInverter` on small one-dimensional operators.
//!
//! Every operator here acts along x only, independently for each (y, z) column, so the expected
//! solutions are known in closed form.

use approx::assert_abs_diff_eq;
use invertop::config::OptionsDatabase;
use invertop::error::InvertError;
use invertop::field::{Field, Field3D, Mesh};
use invertop::invertible::{DEFAULT_VERIFY_TOLERANCE, SessionState, ShellInverter};
use invertop::utils::Timings;
use std::sync::Arc;
use std::time::Duration;

fn tight() -> OptionsDatabase {
    OptionsDatabase::from_args(["-invert_ksp_rtol", "1e-12"])
}

/// y_i = x_i + x_{i-1}; x_{-1} is zero, or x_{n-1} when `periodic`.
fn shift_sum(f: &Field3D, periodic: bool) -> Field3D {
    let nx = f.mesh().nx();
    let mut out = f.clone();
    for (x, y, z) in f.indices() {
        let prev = if x > 0 {
            f.get((x - 1, y, z))
        } else if periodic {
            f.get((nx - 1, y, z))
        } else {
            0.0
        };
        out.set((x, y, z), f.get((x, y, z)) + prev);
    }
    out
}

/// y_i = 2 x_i - x_{i-1} - x_{i+1} with zero values beyond both ends.
fn laplacian(f: &Field3D) -> Field3D {
    let nx = f.mesh().nx();
    let mut out = f.clone();
    for (x, y, z) in f.indices() {
        let left = if x > 0 { f.get((x - 1, y, z)) } else { 0.0 };
        let right = if x + 1 < nx { f.get((x + 1, y, z)) } else { 0.0 };
        out.set((x, y, z), 2.0 * f.get((x, y, z)) - left - right);
    }
    out
}

fn unit_pulse(mesh: &Arc<Mesh>) -> Field3D {
    Field3D::from_fn(mesh, |(x, _, _)| if x == 0 { 1.0 } else { 0.0 })
}

#[test]
fn identity_round_trip() {
    let mesh = Mesh::serial(5, 3, 2);
    let mut inv = ShellInverter::<Field3D>::new(&mesh).with_options(OptionsDatabase::new());
    inv.setup().unwrap();
    let b = Field3D::from_fn(&mesh, |(x, y, z)| (x as f64).sin() + 0.5 * y as f64 - z as f64);
    let x = inv.invert(&b).unwrap();
    for idx in b.indices() {
        assert_abs_diff_eq!(x.get(idx), b.get(idx), epsilon = 1e-10);
    }
}

#[test]
fn bidiagonal_shift_recurrence() {
    // x_0 = 1, x_i = -x_{i-1}
    let mesh = Mesh::serial(8, 1, 1);
    let mut inv = ShellInverter::new(&mesh)
        .with_function(|f: &Field3D| shift_sum(f, false))
        .with_options(tight());
    inv.setup().unwrap();
    let x = inv.invert(&unit_pulse(&mesh)).unwrap();
    for i in 0..8 {
        let expected = if i % 2 == 0 { 1.0 } else { -1.0 };
        assert_abs_diff_eq!(x.get((i, 0, 0)), expected, epsilon = 1e-8);
    }
}

#[test]
fn periodic_shift_with_odd_length() {
    // With n odd, I + S is nonsingular and x_i = (-1)^i / 2
    let mesh = Mesh::serial(7, 1, 1);
    let mut inv = ShellInverter::new(&mesh)
        .with_function(|f: &Field3D| shift_sum(f, true))
        .with_options(tight());
    inv.setup().unwrap();
    let x = inv.invert(&unit_pulse(&mesh)).unwrap();
    for i in 0..7 {
        let expected = if i % 2 == 0 { 0.5 } else { -0.5 };
        assert_abs_diff_eq!(x.get((i, 0, 0)), expected, epsilon = 1e-8);
    }
}

#[test]
fn periodic_shift_with_even_length_is_singular() {
    // The alternating vector spans the null space of I + S when n is even
    let mesh = Mesh::serial(8, 1, 1);
    let opts = OptionsDatabase::from_args(["-invert_ksp_rtol", "1e-12", "-invert_ksp_max_it", "200"]);
    let mut inv = ShellInverter::new(&mesh)
        .with_function(|f: &Field3D| shift_sum(f, true))
        .with_options(opts);
    inv.setup().unwrap();
    match inv.invert(&unit_pulse(&mesh)) {
        Err(InvertError::ConvergenceFailure { reason }) => assert!(reason < 0, "reason {reason}"),
        other => panic!("expected ConvergenceFailure, got {other:?}"),
    }
}

#[test]
fn zero_operator_fails_to_converge() {
    let mesh = Mesh::serial(4, 2, 1);
    let mut inv = ShellInverter::new(&mesh)
        .with_function(|f: &Field3D| Field3D::from_fn(f.mesh(), |_| 0.0))
        .with_options(OptionsDatabase::new());
    inv.setup().unwrap();
    let b = Field3D::from_fn(&mesh, |_| 1.0);
    match inv.invert(&b) {
        Err(InvertError::ConvergenceFailure { reason }) => assert!(reason <= 0),
        other => panic!("expected ConvergenceFailure, got {other:?}"),
    }
    // A failed solve leaves the inverter usable
    assert_eq!(inv.state(), SessionState::SetUp);
    assert!(inv.last_solve().is_some_and(|s| !s.converged()));
}

#[test]
fn conjugate_gradient_selected_by_prefix() {
    let n = 12;
    let mesh = Mesh::serial(n, 1, 3);
    let opts = OptionsDatabase::from_args(["-lap_ksp_type", "cg", "-lap_ksp_rtol", "1e-12", "-invert_ksp_type", "bcgs"]);
    let mut inv = ShellInverter::new(&mesh)
        .with_function(laplacian)
        .with_prefix("lap_")
        .with_options(opts);
    inv.setup().unwrap();
    let b = Field3D::from_fn(&mesh, |_| 1.0);
    let x = inv.invert(&b).unwrap();
    for (i, y, z) in x.indices() {
        let expected = ((i + 1) * (n - i)) as f64 / 2.0;
        assert_abs_diff_eq!(x.get((i, y, z)), expected, epsilon = 1e-8);
    }
    // CG converges in at most n steps in exact arithmetic
    assert!(inv.last_solve().is_some_and(|s| s.iterations <= n + 2));
}

#[test]
fn verify_checks_forward_after_inverse() {
    let mesh = Mesh::serial(9, 2, 1);
    let mut inv = ShellInverter::new(&mesh).with_function(laplacian).with_options(tight());
    inv.setup().unwrap();
    let b = Field3D::from_fn(&mesh, |(x, y, _)| (x as f64 * 0.7).cos() + y as f64);
    assert!(inv.verify(&b, DEFAULT_VERIFY_TOLERANCE).unwrap());
    // A zero tolerance can never be met
    assert!(!inv.verify(&b, 0.0).unwrap());
}

#[test]
fn lifecycle_guards() {
    let mesh = Mesh::serial(3, 1, 1);
    let other = Mesh::serial(3, 1, 1);
    let mut inv = ShellInverter::<Field3D>::new(&mesh).with_options(OptionsDatabase::new());
    let b = Field3D::from_fn(&mesh, |_| 1.0);

    assert!(matches!(inv.invert(&b), Err(InvertError::UseBeforeSetup)));
    assert!(matches!(inv.verify(&b, 1e-5), Err(InvertError::UseBeforeSetup)));
    inv.setup().unwrap();
    assert!(matches!(inv.setup(), Err(InvertError::SetupReentry)));

    let foreign = Field3D::from_fn(&other, |_| 1.0);
    assert!(matches!(inv.invert(&foreign), Err(InvertError::MeshMismatch)));
    assert!(matches!(inv.verify(&foreign, 1e-5), Err(InvertError::MeshMismatch)));

    inv.destroy();
    assert!(matches!(inv.invert(&b), Err(InvertError::UseAfterDestroy)));
}

#[test]
fn operator_can_change_after_setup() {
    let mesh = Mesh::serial(4, 1, 1);
    let mut inv = ShellInverter::<Field3D>::new(&mesh).with_options(tight());
    inv.setup().unwrap();
    inv.set_operator_function(|f: &Field3D| Field3D::from_fn(f.mesh(), |idx| 4.0 * f.get(idx)));
    let b = Field3D::from_fn(&mesh, |(x, _, _)| x as f64 + 1.0);
    let x = inv.invert(&b).unwrap();
    for idx in b.indices() {
        assert_abs_diff_eq!(x.get(idx), b.get(idx) / 4.0, epsilon = 1e-10);
    }
    assert_abs_diff_eq!(inv.apply(&b).get((3, 0, 0)), 16.0);
}

#[test]
fn timings_accumulate_per_instance_and_reset() {
    let mesh = Mesh::serial(6, 1, 1);
    let mut a = ShellInverter::new(&mesh).with_function(laplacian).with_options(tight());
    let mut b = ShellInverter::<Field3D>::new(&mesh).with_options(OptionsDatabase::new());
    a.setup().unwrap();
    b.setup().unwrap();
    let rhs = Field3D::from_fn(&mesh, |_| 1.0);
    a.invert(&rhs).unwrap();
    a.invert(&rhs).unwrap();

    let ta = a.report_time();
    assert!(ta.invert > Duration::ZERO);
    assert!(ta.packing <= ta.invert);
    assert_eq!(a.report_time(), Timings::default());

    let tb = b.report_time();
    assert_eq!(tb.invert, Duration::ZERO);
    let total: Timings = [ta, tb].into_iter().sum();
    assert_eq!(total.invert, ta.invert);
    assert_eq!(total.setup, ta.setup + tb.setup);
}
