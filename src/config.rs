use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::dates::GAME_DATES_URL;
use crate::gameindex::OutputNaming;
use crate::grid::{NBA_TEAM_IDS, SeasonGrid};

pub const DEFAULT_START_YEAR: u16 = 2014;
pub const DEFAULT_END_YEAR: u16 = 2025;

/// Run settings. Command-line flags win over environment variables, which
/// win over the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_root: PathBuf,
    pub rotations_csv: PathBuf,
    pub dates_source: String,
    pub pbp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub start_year: u16,
    pub end_year: u16,
    pub team_ids: Vec<u64>,
    pub seasons: Vec<String>,
    pub pad_ids: bool,
    pub force: bool,
    pub sample: bool,
}

impl Settings {
    /// Reads `.env.local` / `.env`, the process environment and `argv`.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(|key| std::env::var(key).ok(), &args)
    }

    pub fn from_sources(env: impl Fn(&str) -> Option<String>, args: &[String]) -> Result<Self> {
        let pick = |flag: &str, key: &str| {
            arg_value(args, flag).or_else(|| env(key).filter(|v| !v.trim().is_empty()))
        };

        let start_year = match pick("--start-year", "APP_START_YEAR") {
            Some(raw) => parse_year(&raw)?,
            None => DEFAULT_START_YEAR,
        };
        let end_year = match pick("--end-year", "APP_END_YEAR") {
            Some(raw) => parse_year(&raw)?,
            None => DEFAULT_END_YEAR,
        };
        if start_year > end_year {
            return Err(anyhow!("start year {start_year} is after end year {end_year}"));
        }

        let team_ids = match pick("--team-ids", "APP_TEAM_IDS") {
            Some(raw) => parse_ids(&raw),
            None => NBA_TEAM_IDS.to_vec(),
        };
        let seasons = pick("--seasons", "APP_SEASONS")
            .map(|raw| {
                raw.split([',', ';', ' '])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let pad_ids =
            has_flag(args, "--pad-ids") || env("APP_PAD_IDS").is_some_and(|v| is_truthy(&v));

        Ok(Settings {
            data_root: PathBuf::from(
                pick("--data-root", "APP_DATA_ROOT").unwrap_or_else(|| "../shot_data".to_string()),
            ),
            rotations_csv: PathBuf::from(
                pick("--rotations", "APP_ROTATIONS_CSV")
                    .unwrap_or_else(|| "rotations_total.csv".to_string()),
            ),
            dates_source: pick("--dates", "APP_DATES_SOURCE")
                .unwrap_or_else(|| GAME_DATES_URL.to_string()),
            pbp_dir: PathBuf::from(
                pick("--pbp-dir", "APP_PBP_DIR").unwrap_or_else(|| "gamepbp".to_string()),
            ),
            output_dir: PathBuf::from(
                pick("--out-dir", "APP_OUTPUT_DIR").unwrap_or_else(|| "game_info".to_string()),
            ),
            start_year,
            end_year,
            team_ids,
            seasons,
            pad_ids,
            force: has_flag(args, "--force"),
            sample: has_flag(args, "--sample"),
        })
    }

    pub fn grid(&self) -> SeasonGrid {
        SeasonGrid::new(self.start_year..=self.end_year, self.team_ids.clone())
    }

    pub fn naming(&self) -> OutputNaming {
        if self.pad_ids {
            OutputNaming::ZeroPadded
        } else {
            OutputNaming::Plain
        }
    }

    pub fn rotations_dir(&self) -> PathBuf {
        self.data_root.join("rotations")
    }

    pub fn shots_dir(&self) -> PathBuf {
        self.data_root.join("team")
    }
}

/// `--name=value` or `--name value`.
fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_year(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| anyhow!("invalid year {raw:?}"))
}

fn parse_ids(raw: &str) -> Vec<u64> {
    let ids = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .filter(|id| *id != 0)
        .collect::<Vec<_>>();
    dedup_ids(ids)
}

fn dedup_ids(ids: Vec<u64>) -> Vec<u64> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}
