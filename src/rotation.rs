use std::path::Path;

use anyhow::{Result, anyhow};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::grid::SeasonGrid;
use crate::ids::{deserialize_id, deserialize_opt_text};
use crate::table::Table;

pub const SEASON_COLUMN: &str = "season";
pub const TEAM_ID_COLUMN: &str = "team_id";

/// One substitution stint of one player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RotationRow {
    #[serde(rename = "GAME_ID", deserialize_with = "deserialize_id")]
    pub game_id: u64,
    #[serde(rename = "TEAM_ID", deserialize_with = "deserialize_id")]
    pub team_id: u64,
    #[serde(rename = "TEAM_NAME", default)]
    pub team_name: String,
    #[serde(rename = "PERSON_ID", deserialize_with = "deserialize_id")]
    pub person_id: u64,
    #[serde(rename = "PLAYER_FIRST", default)]
    pub first_name: String,
    #[serde(rename = "PLAYER_LAST", default)]
    pub last_name: String,
    #[serde(
        rename = "IN_TIME_REAL",
        default,
        deserialize_with = "deserialize_opt_text"
    )]
    pub in_time_real: Option<String>,
}

impl RotationRow {
    pub fn entry_time(&self) -> Option<f64> {
        self.in_time_real.as_deref()?.parse::<f64>().ok()
    }

    /// On the floor at tip-off.
    pub fn is_starter(&self) -> bool {
        self.entry_time() == Some(0.0)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct RotationLoad {
    pub table: Table,
    pub files_read: usize,
    pub files_failed: usize,
}

/// Reads every `{year}{suffix}/{team_id}.csv` under `rotations_dir`, tags
/// the rows with `season` and `team_id`, and stacks them.
pub fn load_rotation_grid(rotations_dir: &Path, grid: &SeasonGrid) -> Result<RotationLoad> {
    if grid.team_ids.is_empty() {
        return Err(anyhow!("no team ids were loaded; nothing to scan"));
    }

    let mut tables = Vec::new();
    let mut files_failed = 0usize;
    for file in grid.existing(rotations_dir) {
        match Table::read_csv(&file.path) {
            Ok(table) => {
                let tagged = table
                    .with_constant_column(SEASON_COLUMN, &file.season)
                    .with_constant_column(TEAM_ID_COLUMN, &file.team_id.to_string());
                tables.push(tagged);
            }
            Err(err) => {
                debug!(path = %file.path.display(), error = %err, "skipping rotation file");
                files_failed += 1;
            }
        }
    }

    let files_read = tables.len();
    let table = Table::concat(tables);
    info!(files_read, files_failed, rows = table.len(), "rotation grid loaded");
    Ok(RotationLoad {
        table,
        files_read,
        files_failed,
    })
}

pub fn load_rotation_rows(path: &Path) -> Result<Vec<RotationRow>> {
    let table = Table::read_csv(path)?;
    let (rows, dropped) = table.deserialize_lenient::<RotationRow>();
    if dropped > 0 {
        warn!(path = %path.display(), dropped, kept = rows.len(), "dropped undecodable rotation rows");
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::RotationRow;

    fn row(in_time: Option<&str>) -> RotationRow {
        RotationRow {
            game_id: 22400061,
            team_id: 1610612747,
            team_name: "Lakers".to_string(),
            person_id: 2544,
            first_name: "LeBron".to_string(),
            last_name: "James".to_string(),
            in_time_real: in_time.map(|s| s.to_string()),
        }
    }

    #[test]
    fn only_zero_entry_time_is_a_starter() {
        assert!(row(Some("0.0")).is_starter());
        assert!(row(Some("0")).is_starter());
        assert!(!row(Some("0.1")).is_starter());
        assert!(!row(Some("3050.0")).is_starter());
        assert!(!row(Some("n/a")).is_starter());
        assert!(!row(None).is_starter());
    }

    #[test]
    fn full_name_joins_with_space() {
        assert_eq!(row(None).full_name(), "LeBron James");
    }
}
