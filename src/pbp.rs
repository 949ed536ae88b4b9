use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ids::{deserialize_opt_id, deserialize_opt_text};
use crate::table::Table;

/// The few play-by-play columns the game index reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PbpRow {
    #[serde(rename = "SCORE", default, deserialize_with = "deserialize_opt_text")]
    pub score: Option<String>,
    #[serde(
        rename = "HOMEDESCRIPTION",
        default,
        deserialize_with = "deserialize_opt_text"
    )]
    pub home_description: Option<String>,
    #[serde(
        rename = "PLAYER1_TEAM_ID",
        default,
        deserialize_with = "deserialize_opt_id"
    )]
    pub player1_team_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScore {
    pub home: i32,
    pub away: i32,
}

/// Resolves `{game_id}.csv`, then the zero-padded `00{game_id}.csv`.
pub fn find_pbp_file(pbp_dir: &Path, game_id: u64) -> Option<PathBuf> {
    [format!("{game_id}.csv"), format!("00{game_id}.csv")]
        .into_iter()
        .map(|name| pbp_dir.join(name))
        .find(|path| path.is_file())
}

pub fn read_pbp(path: &Path) -> Result<Vec<PbpRow>> {
    let table = Table::read_csv(path)?;
    table
        .deserialize::<PbpRow>()
        .with_context(|| format!("decode play-by-play {}", path.display()))
}

/// Parses `"<home> - <away>"`.
pub fn parse_score(raw: &str) -> Option<FinalScore> {
    let parts = raw.split(" - ").collect::<Vec<_>>();
    let [home, away] = parts.as_slice() else {
        return None;
    };
    Some(FinalScore {
        home: home.trim().parse().ok()?,
        away: away.trim().parse().ok()?,
    })
}

/// The last non-empty score string of the game, if any.
pub fn last_score(rows: &[PbpRow]) -> Option<&str> {
    rows.iter().rev().find_map(|row| row.score.as_deref())
}

pub fn final_score(rows: &[PbpRow]) -> Option<FinalScore> {
    last_score(rows).and_then(parse_score)
}

/// Team of the first home-side event that names a team.
pub fn first_home_team(rows: &[PbpRow]) -> Option<u64> {
    rows.iter()
        .filter(|row| row.home_description.is_some())
        .find_map(|row| row.player1_team_id)
}
