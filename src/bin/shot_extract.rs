use std::path::PathBuf;

use anyhow::Result;

use nba_gameindex::config::Settings;
use nba_gameindex::logging;
use nba_gameindex::shots;

const OUTPUT_FILE: &str = "playbyplay_shotdetails.csv";

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::load()?;

    let extract = shots::extract_shot_details(&settings.shots_dir(), &settings.grid())?;
    let out = PathBuf::from(OUTPUT_FILE);
    extract.table.write_csv(&out)?;

    println!("Shot extract complete");
    println!("Output: {}", out.display());
    println!(
        "Files: {} read, {} skipped",
        extract.files_read, extract.files_skipped
    );
    println!("Shots: {}", extract.table.len());

    Ok(())
}
