#![cfg(feature = "ksp")]
//! Matrix-free inversion compared against a dense LU solve.
//!
//! The operator is probed column by column through `apply` to build an explicit `faer` matrix,
//! which is then factored directly. Both solutions must agree.

use approx::assert_abs_diff_eq;
use faer::Mat;
use faer::linalg::solvers::SolveCore;
use invertop::config::OptionsDatabase;
use invertop::field::{Field, Field3D, Mesh};
use invertop::invertible::{ShellInverter, field_to_vector, local_size, vector_to_field};
use rand::Rng;

/// Upwinded advection-diffusion along x: nonsymmetric, diagonally dominant.
fn advection_diffusion(f: &Field3D) -> Field3D {
    let nx = f.mesh().nx();
    let mut out = f.clone();
    for (x, y, z) in f.indices() {
        let left = if x > 0 { f.get((x - 1, y, z)) } else { 0.0 };
        let right = if x + 1 < nx { f.get((x + 1, y, z)) } else { 0.0 };
        out.set((x, y, z), 3.0 * f.get((x, y, z)) - 1.2 * left - 0.5 * right + 0.1 * z as f64 * f.get((x, y, z)));
    }
    out
}

fn solve_with(kind: &str) {
    let mesh = Mesh::serial(10, 1, 2);
    let n = local_size::<Field3D>(&mesh);
    let opts = OptionsDatabase::from_args(["-invert_ksp_type", kind, "-invert_ksp_rtol", "1e-13"]);
    let mut inv = ShellInverter::new(&mesh).with_function(advection_diffusion).with_options(opts);
    inv.setup().unwrap();

    // Probe A e_j for every j
    let mut columns = Vec::with_capacity(n);
    for j in 0..n {
        let mut unit = vec![0.0; n];
        unit[j] = 1.0;
        let mut e = Field3D::<f64>::new(&mesh);
        vector_to_field(&unit, &mut e).unwrap();
        let mut col = vec![0.0; n];
        field_to_vector(&inv.apply(&e), &mut col).unwrap();
        columns.push(col);
    }
    let a = Mat::from_fn(n, n, |i, j| columns[j][i]);

    let mut rng = rand::thread_rng();
    let b_vec: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    let mut b = Field3D::<f64>::new(&mesh);
    vector_to_field(&b_vec, &mut b).unwrap();

    let x = inv.invert(&b).unwrap();
    let mut x_shell = vec![0.0; n];
    field_to_vector(&x, &mut x_shell).unwrap();

    let mut x_direct = b_vec.clone();
    let lu = faer::linalg::solvers::PartialPivLu::new(a.as_ref());
    let x_mat = faer::MatMut::from_column_major_slice_mut(&mut x_direct, n, 1);
    lu.solve_in_place_with_conj(faer::Conj::No, x_mat);
    assert!(x_direct.iter().all(|v| v.is_finite()), "dense reference is not finite");

    for i in 0..n {
        assert_abs_diff_eq!(x_shell[i], x_direct[i], epsilon = 1e-8);
    }
}

#[test]
fn gmres_matches_dense_lu() {
    solve_with("gmres");
}

#[test]
fn bicgstab_matches_dense_lu() {
    solve_with("bcgs");
}
