//! `checksum` - print snapshot checksums without touching any manifest

use anyhow::Result;
use std::path::PathBuf;

use migration_guard::domain::build_snapshots;

use super::read_models;

pub async fn execute(models: PathBuf) -> Result<()> {
    let definitions = read_models(&models).await?;
    let snapshots = build_snapshots(&definitions)?;

    for (name, snapshot) in &snapshots {
        println!("{}  {}", snapshot.checksum, name);
    }
    Ok(())
}
