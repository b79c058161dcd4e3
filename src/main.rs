use anyhow::Result;
use rfgap::problem::Problem;
use rfgap::{logging, settings};
use tracing::info;

fn main() -> Result<()> {
    let settings = settings::load_config()?;
    logging::init_logging(settings.log_level)?;
    info!("{}", settings);

    let mut problem = Problem::new(settings);

    problem.solve()?;
    problem.writeup()?;

    Ok(())
}
