use anyhow::{Context, Result};

use nba_gameindex::config::Settings;
use nba_gameindex::dates;
use nba_gameindex::gameindex::{self, AssembleOptions, GameIndex};
use nba_gameindex::http_cache::HttpCache;
use nba_gameindex::logging;
use nba_gameindex::rotation;

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::load()?;

    let rotations = rotation::load_rotation_rows(&settings.rotations_csv)
        .context("error loading rotation csv")?;
    let mut cache = HttpCache::open_default();
    let mut dates_table = dates::load_dates_table(&settings.dates_source, &mut cache)
        .context("error loading dates csv")?;
    dates::filter_seasons(&mut dates_table, &settings.seasons);
    let date_rows = dates::parse_date_rows(&dates_table);
    println!("Loaded {} rotation rows and {} date rows", rotations.len(), date_rows.len());

    let index = GameIndex::new(rotations, date_rows);
    let options = AssembleOptions {
        pbp_dir: settings.pbp_dir.clone(),
        output_dir: settings.output_dir.clone(),
        naming: settings.naming(),
        overwrite: settings.force,
    };
    let summary = gameindex::generate_game_files(&index, &options)?;

    println!("Game index complete");
    println!("Output: {}", summary.output_dir.display());
    println!("Games: {}", summary.games_total);
    println!("Written: {}", summary.written);
    println!("Already present: {}", summary.skipped_existing);
    println!("Resolved from play-by-play: {}", summary.pbp_fallbacks);
    if !summary.skipped.is_empty() {
        println!("Skipped: {}", summary.skipped.len());
        for (game_id, reason) in summary.skipped.iter().take(8) {
            println!(" - {game_id}: {reason}");
        }
    }

    Ok(())
}
