use std::path::Path;

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use crate::grid::SeasonGrid;
use crate::table::Table;

pub const SHOT_COLUMNS: &[&str] = &[
    "SHOT_ZONE_RANGE",
    "SHOT_DISTANCE",
    "LOC_X",
    "LOC_Y",
    "GAME_ID",
    "SHOT_ZONE_BASIC",
    "GAME_EVENT_ID",
];

#[derive(Debug, Clone)]
pub struct ShotExtract {
    pub table: Table,
    pub files_read: usize,
    pub files_skipped: usize,
}

/// Pulls [`SHOT_COLUMNS`] out of every `{year}{suffix}/{team_id}.csv` under
/// `team_dir` and stacks the results, walking year, then team, then suffix.
pub fn extract_shot_details(team_dir: &Path, grid: &SeasonGrid) -> Result<ShotExtract> {
    if grid.team_ids.is_empty() {
        return Err(anyhow!("no team ids were loaded; nothing to scan"));
    }

    let mut frames = Vec::new();
    let mut files_skipped = 0usize;
    let mut current_year = None;
    for file in grid.existing_by_team(team_dir) {
        if current_year != Some(file.year) {
            if let Some(year) = current_year {
                info!(year, files = frames.len(), "shot files scanned");
            }
            current_year = Some(file.year);
        }
        let selected = Table::read_csv(&file.path).and_then(|t| t.select(SHOT_COLUMNS));
        match selected {
            Ok(frame) => frames.push(frame),
            Err(err) => {
                warn!(path = %file.path.display(), error = %format!("{err:#}"), "skipping shot file");
                files_skipped += 1;
            }
        }
    }
    if let Some(year) = current_year {
        info!(year, files = frames.len(), "shot files scanned");
    }

    let files_read = frames.len();
    let mut table = Table::concat(frames);
    if table.headers().is_empty() {
        table = Table::new(SHOT_COLUMNS.iter().map(|c| c.to_string()).collect());
    }
    Ok(ShotExtract {
        table,
        files_read,
        files_skipped,
    })
}
