use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::http_cache::HttpCache;
use crate::http_client::http_client;
use crate::ids::{deserialize_id, deserialize_opt_text, normalize_label};
use crate::table::Table;

pub const GAME_DATES_URL: &str =
    "https://raw.githubusercontent.com/gabriel1200/shot_data/refs/heads/master/game_dates.csv";

/// One team's side of one game in the dates export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DateRow {
    #[serde(rename = "GAME_ID", deserialize_with = "deserialize_id")]
    pub game_id: u64,
    #[serde(rename = "TEAM_ID", deserialize_with = "deserialize_id")]
    pub team_id: u64,
    #[serde(default)]
    pub team: String,
    /// Abbreviation of the home team; equals `team` on the home row.
    #[serde(rename = "HTM", default)]
    pub home_marker: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub season: Option<String>,
}

impl DateRow {
    pub fn is_home(&self) -> bool {
        let team = self.team.trim();
        !team.is_empty() && team == self.home_marker.trim()
    }

    /// The away row of a game: a known team that is not the home marker.
    pub fn is_away(&self) -> bool {
        !self.team.trim().is_empty() && !self.is_home()
    }
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Loads the dates CSV from a URL (through the http cache) or a local path.
pub fn load_dates_table(source: &str, cache: &mut HttpCache) -> Result<Table> {
    let table = if is_remote(source) {
        let client = http_client()?;
        let body = cache
            .fetch_text(client, source)
            .with_context(|| format!("fetch dates csv {source}"))?;
        Table::from_csv_str(&body).context("parse dates csv")?
    } else {
        Table::read_csv(Path::new(source))?
    };
    info!(source, rows = table.len(), "dates table loaded");
    Ok(table)
}

/// Keeps rows whose `season` cell is one of `seasons`. No-op when `seasons`
/// is empty or the table carries no season column.
pub fn filter_seasons(table: &mut Table, seasons: &[String]) {
    if seasons.is_empty() {
        return;
    }
    if !table.has_column("season") {
        debug!("dates table has no season column; season filter skipped");
        return;
    }
    let wanted = seasons
        .iter()
        .map(|s| normalize_label(s))
        .collect::<Vec<_>>();
    let before = table.len();
    table.retain_by("season", |cell| wanted.contains(&normalize_label(cell)));
    debug!(before, after = table.len(), "season filter applied");
}

/// Rows that cannot be decoded (blank or non-numeric ids) are dropped with
/// a warning; they could never join a rotation row.
pub fn parse_date_rows(table: &Table) -> Vec<DateRow> {
    let (rows, dropped) = table.deserialize_lenient::<DateRow>();
    if dropped > 0 {
        warn!(dropped, kept = rows.len(), "dropped undecodable dates rows");
    }
    rows
}

/// `YYYYMMDD` to `YYYY-MM-DD`.
pub fn format_game_date(raw: &str) -> Option<String> {
    let label = normalize_label(raw);
    let date = NaiveDate::parse_from_str(&label, "%Y%m%d").ok()?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::{filter_seasons, format_game_date, is_remote, parse_date_rows};
    use crate::table::Table;

    #[test]
    fn formats_compact_dates() {
        assert_eq!(format_game_date("20241022"), Some("2024-10-22".to_string()));
        assert_eq!(format_game_date("20241022.0"), Some("2024-10-22".to_string()));
        assert_eq!(format_game_date("2024-10-22"), None);
        assert_eq!(format_game_date("20241342"), None);
        assert_eq!(format_game_date(""), None);
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://example.test/a.csv"));
        assert!(is_remote("HTTP://example.test/a.csv"));
        assert!(!is_remote("data/game_dates.csv"));
    }

    #[test]
    fn season_filter_keeps_matching_rows() {
        let mut table = Table::from_csv_str(
            "GAME_ID,TEAM_ID,team,HTM,date,season\n\
             1,10,LAL,LAL,20241022,2025.0\n\
             2,11,BOS,BOS,20231024,2024\n",
        )
        .expect("csv");
        filter_seasons(&mut table, &["2025".to_string()]);
        let rows = parse_date_rows(&table);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].game_id, 1);
        assert!(rows[0].is_home());
    }

    #[test]
    fn undecodable_dates_rows_are_dropped() {
        let table = Table::from_csv_str(
            "GAME_ID,TEAM_ID,team,HTM,date\n\
             1,10,LAL,LAL,20241022\n\
             1,11,MIN,LAL,20241022\n\
             1,,???,LAL,20241022\n",
        )
        .expect("csv");
        let rows = parse_date_rows(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].team_id, 11);
    }

    #[test]
    fn season_filter_without_column_is_noop() {
        let mut table = Table::from_csv_str("GAME_ID,TEAM_ID\n1,10\n2,11\n").expect("csv");
        filter_seasons(&mut table, &["2025".to_string()]);
        assert_eq!(table.len(), 2);
    }
}
