use rfgap::bunch::Bunch;
use rfgap::config::PROTON_REST_ENERGY;
use rfgap::energy::EnergyVector;
use rfgap::gap::AcceleratingRfGap;
use rfgap::relativistic;
use rfgap::spectrum::FieldSpectrum;
use rfgap::twiss::Twiss;

fn main() {
    let gap = AcceleratingRfGap::new(402.5e6, 1.0e6, FieldSpectrum::uniform_gap(0.02));

    // 0.05 rad by 10 keV rms
    let twiss = Twiss::new(0.0, 5.0e-6, 500.0);
    let centre = EnergyVector::from_degrees(-30.0, 2.5e6);
    let bunch = Bunch::sample(&twiss, centre, 50_000, Some(2024)).unwrap();

    let gains = bunch.cross_gap(&gap, 1.0, PROTON_REST_ENERGY, true);
    let stats = gains.stats().unwrap();

    println!("entrance: {}", bunch.twiss().unwrap());
    println!("exit:     {}", gains.exit_twiss().unwrap());
    println!(
        "mean gains: {}, rms: {}, failures: {}",
        stats.mean_gains, stats.rms_gains, stats.failures
    );

    let (tran, long) =
        relativistic::adiabatic_damping(centre.energy, stats.mean_gains.energy, PROTON_REST_ENERGY);
    println!("adiabatic damping: transverse {:.6}, longitudinal {:.6}", tran, long);
}
