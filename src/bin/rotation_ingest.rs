use std::path::Path;

use anyhow::{Context, Result};

use nba_gameindex::config::Settings;
use nba_gameindex::dates;
use nba_gameindex::http_cache::HttpCache;
use nba_gameindex::logging;
use nba_gameindex::rotation;

const SAMPLE_ROWS: usize = 40;

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::load()?;

    let load = rotation::load_rotation_grid(&settings.rotations_dir(), &settings.grid())?;
    if load.table.is_empty() {
        println!("No rotation data was collected.");
        return Ok(());
    }

    load.table.write_csv(&settings.rotations_csv)?;

    if settings.sample {
        load.table
            .tail(SAMPLE_ROWS)
            .write_csv(Path::new("rotation_sample.csv"))?;
        let mut cache = HttpCache::open_default();
        let dates_table = dates::load_dates_table(&settings.dates_source, &mut cache)
            .context("error loading dates csv")?;
        dates_table
            .tail(SAMPLE_ROWS)
            .write_csv(Path::new("date_sample.csv"))?;
    }

    println!("Rotation ingest complete");
    println!("Output: {}", settings.rotations_csv.display());
    println!(
        "Files: {} read, {} failed",
        load.files_read, load.files_failed
    );
    println!("Total rows collected: {}", load.table.len());

    Ok(())
}
