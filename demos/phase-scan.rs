use rfgap::config::PROTON_REST_ENERGY;
use rfgap::gap::{AcceleratingRfGap, GapLocation};
use rfgap::scan::{scan_phases, PhaseScan};
use rfgap::spectrum::FieldSpectrum;

fn main() {
    let gap = AcceleratingRfGap::new(402.5e6, 1.0e6, FieldSpectrum::uniform_gap(0.02));
    let scan = PhaseScan::new(-180.0, 180.0, 73);

    for location in [GapLocation::PreGap, GapLocation::PostGap] {
        let result = scan_phases(&gap, location, 1.0, PROTON_REST_ENERGY, 2.5e6, &scan).unwrap();

        println!("{}", location);
        for row in result.table.outer_iter() {
            println!(
                "{:>8.2} {:>12.6} {:>14.3}",
                row[0].to_degrees(),
                row[1].to_degrees(),
                row[2]
            );
        }
        if let Some(crest) = result.crest() {
            println!(
                "crest: {:.2} deg, {:.3} keV",
                crest.phase_degrees(),
                crest.energy / 1e3
            );
        }
    }
}
