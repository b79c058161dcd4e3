use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use std::io::Write;

use crate::bunch::BunchGains;
use crate::problem::RunSummary;
use crate::scan::ScanResult;
use crate::settings::Settings;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyVector;
    use crate::gap::GapLocation;
    use crate::error::GapError;
    use ndarray::array;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("rfgap-output-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn scan_rows_are_whitespace_separated() {
        let scan = ScanResult {
            location: GapLocation::PreGap,
            energy: 2.5e6,
            table: array![[-0.5, 0.01, 1.0e5], [0.0, 0.02, 2.0e5]],
        };
        let path = scratch("scan.dat");
        write_scan(&path, &scan).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('#'));
        let values: Vec<f64> = lines[2]
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 0.02, 2.0e5]);
    }

    #[test]
    fn bunch_rows_skip_failures() {
        let gains = BunchGains {
            initial: vec![EnergyVector::new(0.1, 2.5e6), EnergyVector::new(0.2, 2.6e6)],
            results: vec![
                Ok(EnergyVector::new(0.01, 1.0e5)),
                Err(GapError::NoConvergence {
                    location: GapLocation::PreGap,
                    iterations: 1,
                    error: 1.0,
                }),
            ],
        };
        let path = scratch("bunch.dat");
        write_bunch(&path, &gains).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let rows: Vec<_> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("0 "));
    }

    #[test]
    fn settings_reload_from_toml() {
        let settings = crate::settings::load_default_config().unwrap();
        let path = scratch("settings.toml");
        write_settings(&path, &settings).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn summary_is_json() {
        let summary = RunSummary {
            location: Some(GapLocation::PostGap),
            initial: EnergyVector::new(-0.5, 2.5e6),
            failure: Some("POSTGAP: failed".to_string()),
            ..Default::default()
        };
        let path = scratch("summary.json");
        write_summary(&path, &summary).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let back: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(back, summary);
    }
}

/// Write a phase scan as rows of `phi0 dphi dW`.
pub fn write_scan(path: &Path, scan: &ScanResult) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "# {} scan at W = {} eV: phi0 [rad] dphi [rad] dW [eV]",
        scan.location, scan.energy
    )?;
    for row in scan.table.outer_iter() {
        for value in row.iter() {
            write!(writer, "{} ", value)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Write converged bunch particles as rows of `index phi W dphi dW`.
pub fn write_bunch(path: &Path, gains: &BunchGains) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "# index phi [rad] W [eV] dphi [rad] dW [eV] ({} failed)",
        gains.failures()
    )?;
    for (index, (initial, result)) in gains.initial.iter().zip(gains.results.iter()).enumerate() {
        if let Ok(g) = result {
            writeln!(
                writer,
                "{} {} {} {} {}",
                index, initial.phase, initial.energy, g.phase, g.energy
            )?;
        }
    }

    Ok(())
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
    Ok(())
}

/// Write the effective settings so a run can be reproduced.
pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    let text = toml::to_string_pretty(settings)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
