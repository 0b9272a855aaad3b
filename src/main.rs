use anyhow::Result;
use tracing_subscriber::EnvFilter;

use connect4_census::census::{Census, CensusConfig};

fn main() -> Result<()> {
    // standard output carries the census rows; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut census = Census::new(CensusConfig::default())?;
    census.run()?;
    Ok(())
}
