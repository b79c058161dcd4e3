use nalgebra::Matrix2;
use rfgap::twiss::Twiss;

fn main() {
    let twiss = Twiss::new(-1.2, 3.5, 2.0e-6);
    println!("{}", twiss);
    println!("gamma: {}", twiss.gamma());
    println!(
        "envelope: {} m, slope {}",
        twiss.envelope_radius(),
        twiss.envelope_slope()
    );
    println!("rotation: {:.4} deg", twiss.compute_rotation().to_degrees());
    println!("semi-axes: {:?}", twiss.compute_semi_axes());
    println!("eigenvectors: {:?}", twiss.compute_eigenvectors());

    // 1 m drift
    let drift = Matrix2::new(1.0, 1.0, 0.0, 1.0);
    let after = twiss.propagate(&drift, 1.0);
    println!("after drift: {}", after);

    // ellipse points x = sqrt(eps beta) cos t, x' = -sqrt(eps/beta)(alpha cos t + sin t)
    let eps = twiss.emittance();
    let (alpha, beta) = (twiss.alpha(), twiss.beta());
    for i in 0..16 {
        let t = std::f64::consts::TAU * i as f64 / 16.0;
        let x = (eps * beta).sqrt() * t.cos();
        let xp = -(eps / beta).sqrt() * (alpha * t.cos() + t.sin());
        println!("{:>14.6e} {:>14.6e}", x, xp);
    }
}
