use criterion::{black_box, Criterion, criterion_group, criterion_main};
use faer::Mat;
use faer::linalg::solvers::SolveCore;
use invertop::config::OptionsDatabase;
use invertop::field::{Field, Field3D, Mesh};
use invertop::invertible::ShellInverter;

fn laplacian(f: &Field3D) -> Field3D {
    let nx = f.mesh().nx();
    let mut out = f.clone();
    for (x, y, z) in f.indices() {
        let left = if x > 0 { f.get((x - 1, y, z)) } else { 0.0 };
        let right = if x + 1 < nx { f.get((x + 1, y, z)) } else { 0.0 };
        out.set((x, y, z), 2.1 * f.get((x, y, z)) - left - right);
    }
    out
}

fn bench_shell_vs_faer(c: &mut Criterion) {
    let n = 200;
    let mesh = Mesh::serial(n, 1, 1);
    let b = Field3D::from_fn(&mesh, |(x, _, _)| (x as f64).cos());

    for kind in ["gmres", "cg", "bcgs"] {
        let opts = OptionsDatabase::from_args(["-invert_ksp_type", kind, "-invert_ksp_rtol", "1e-8"]);
        let mut inv = ShellInverter::new(&mesh).with_function(laplacian).with_options(opts);
        if inv.setup().is_err() {
            continue;
        }
        c.bench_function(&format!("shell {kind}"), |ben| {
            ben.iter(|| {
                let _x = inv.invert(black_box(&b)).unwrap();
            })
        });
    }

    let a = Mat::from_fn(n, n, |i, j| {
        if i == j {
            2.1
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    });
    let rhs: Vec<f64> = (0..n).map(|i| (i as f64).cos()).collect();
    c.bench_function("faer raw LU", |ben| {
        ben.iter(|| {
            let factor = faer::linalg::solvers::PartialPivLu::new(a.as_ref());
            let mut y = rhs.clone();
            let n = y.len();
            let y_mat = faer::MatMut::from_column_major_slice_mut(&mut y, n, 1);
            factor.solve_in_place_with_conj(faer::Conj::No, y_mat);
        })
    });
}

criterion_group!(benches, bench_shell_vs_faer);
criterion_main!(benches);
