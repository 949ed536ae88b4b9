//! Per-game JSON summaries built from rotation, dates and play-by-play data.
//!
//! Home/away resolution prefers the dates table. When that lookup fails the
//! play-by-play file decides: the team of the first home-side event is home
//! and the other rotation team is away.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dates::{DateRow, format_game_date};
use crate::pbp::{self, FinalScore, PbpRow};
use crate::rotation::RotationRow;

pub const STATUS_FINAL: &str = "Final";

pub fn logo_url(team_id: u64) -> String {
    format!("https://cdn.nba.com/logos/nba/{team_id}/primary/L/logo.svg")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRecord {
    pub name: String,
    pub score: Option<i32>,
    pub logo: String,
}

/// Player id to full name, serialized as a JSON object in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerNames(Vec<(String, String)>);

impl PlayerNames {
    /// Later names for an id replace earlier ones in place.
    pub fn from_rotations(rows: &[&RotationRow]) -> Self {
        let mut seen: HashSet<(u64, &str, &str)> = HashSet::new();
        let mut index: HashMap<u64, usize> = HashMap::new();
        let mut out = Vec::new();
        for row in rows {
            if !seen.insert((row.person_id, row.first_name.as_str(), row.last_name.as_str())) {
                continue;
            }
            let name = row.full_name();
            match index.get(&row.person_id) {
                Some(idx) => out[*idx] = (row.person_id.to_string(), name),
                None => {
                    index.insert(row.person_id, out.len());
                    out.push((row.person_id.to_string(), name));
                }
            }
        }
        Self(out)
    }

    pub fn get(&self, person_id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(id, _)| id == person_id)
            .map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for PlayerNames {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, name) in &self.0 {
            map.serialize_entry(id, name)?;
        }
        map.end()
    }
}

/// The per-game JSON document. Field order is the key order on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    #[serde(rename = "homeTeam")]
    pub home_team: TeamRecord,
    #[serde(rename = "awayTeam")]
    pub away_team: TeamRecord,
    pub game_id: String,
    pub date: String,
    pub status: String,
    pub players: PlayerNames,
    pub starter_on: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    DatesTable,
    PlayByPlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTeams {
    pub home_id: u64,
    pub away_id: u64,
    pub source: Resolution,
}

/// Failure of the dates-table join; triggers the play-by-play fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no home row in dates table")]
    NoHomeRow,
    #[error("no away row in dates table")]
    NoAwayRow,
    #[error("team {0} has no rotation rows")]
    TeamNotInRotation(u64),
}

/// Why a game produced no output file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing rotation/date data")]
    MissingData,
    #[error("dates lookup failed ({lookup}) and play-by-play is unavailable: {detail}")]
    PbpUnavailable { lookup: LookupError, detail: String },
    #[error("no home-side play-by-play event with a team id")]
    NoHomeEvent,
    #[error("only {0} distinct team(s) in rotation data")]
    TooFewTeams(usize),
    #[error("team {0} has no rotation rows")]
    TeamNotInRotation(u64),
    #[error("unparsable date {0:?}")]
    BadDate(String),
    #[error("could not write game file: {0}")]
    WriteFailed(String),
}

/// Play-by-play rows for one game, or why they could not be read.
#[derive(Debug, Clone)]
pub enum PbpSource {
    Loaded(Vec<PbpRow>),
    Unavailable(String),
}

impl PbpSource {
    pub fn load(pbp_dir: &Path, game_id: u64) -> Self {
        let Some(path) = pbp::find_pbp_file(pbp_dir, game_id) else {
            return PbpSource::Unavailable(format!(
                "no play-by-play file for game {game_id} in {}",
                pbp_dir.display()
            ));
        };
        match pbp::read_pbp(&path) {
            Ok(rows) => PbpSource::Loaded(rows),
            Err(err) => PbpSource::Unavailable(format!("{err:#}")),
        }
    }

    pub fn rows(&self) -> Option<&[PbpRow]> {
        match self {
            PbpSource::Loaded(rows) => Some(rows.as_slice()),
            PbpSource::Unavailable(_) => None,
        }
    }
}

fn team_name(rotations: &[&RotationRow], team_id: u64) -> Option<String> {
    rotations
        .iter()
        .find(|r| r.team_id == team_id)
        .map(|r| r.team_name.clone())
}

/// Distinct rotation team ids in first-seen order.
fn rotation_teams(rotations: &[&RotationRow]) -> Vec<u64> {
    let mut out: Vec<u64> = Vec::new();
    for row in rotations {
        if !out.contains(&row.team_id) {
            out.push(row.team_id);
        }
    }
    out
}

pub fn resolve_from_dates(
    dates: &[&DateRow],
    rotations: &[&RotationRow],
) -> Result<(u64, u64), LookupError> {
    let home = dates
        .iter()
        .find(|d| d.is_home())
        .ok_or(LookupError::NoHomeRow)?;
    let away = dates
        .iter()
        .find(|d| d.is_away())
        .ok_or(LookupError::NoAwayRow)?;
    for team_id in [home.team_id, away.team_id] {
        if !rotations.iter().any(|r| r.team_id == team_id) {
            return Err(LookupError::TeamNotInRotation(team_id));
        }
    }
    Ok((home.team_id, away.team_id))
}

pub fn resolve_from_pbp(
    pbp_rows: &[PbpRow],
    rotations: &[&RotationRow],
) -> Result<(u64, u64), SkipReason> {
    let teams = rotation_teams(rotations);
    if teams.len() < 2 {
        return Err(SkipReason::TooFewTeams(teams.len()));
    }
    let home_id = pbp::first_home_team(pbp_rows).ok_or(SkipReason::NoHomeEvent)?;
    if !teams.contains(&home_id) {
        return Err(SkipReason::TeamNotInRotation(home_id));
    }
    // Two distinct teams and home is one of them, so the other is away.
    let away_id = teams[if teams[0] == home_id { 1 } else { 0 }];
    Ok((home_id, away_id))
}

pub fn resolve_teams(
    dates: &[&DateRow],
    rotations: &[&RotationRow],
    pbp_source: &PbpSource,
) -> Result<ResolvedTeams, SkipReason> {
    match resolve_from_dates(dates, rotations) {
        Ok((home_id, away_id)) => Ok(ResolvedTeams {
            home_id,
            away_id,
            source: Resolution::DatesTable,
        }),
        Err(lookup) => {
            debug!(%lookup, "dates lookup failed; trying play-by-play");
            let rows = match pbp_source {
                PbpSource::Loaded(rows) => rows,
                PbpSource::Unavailable(detail) => {
                    return Err(SkipReason::PbpUnavailable {
                        lookup,
                        detail: detail.clone(),
                    });
                }
            };
            let (home_id, away_id) = resolve_from_pbp(rows, rotations)?;
            Ok(ResolvedTeams {
                home_id,
                away_id,
                source: Resolution::PlayByPlay,
            })
        }
    }
}

pub fn starter_ids(rotations: &[&RotationRow]) -> String {
    rotations
        .iter()
        .filter(|r| r.is_starter())
        .map(|r| r.person_id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the record for one game from its already-filtered rows, along
/// with how home and away were decided.
pub fn build_game_record(
    game_id: u64,
    rotations: &[&RotationRow],
    dates: &[&DateRow],
    pbp_source: &PbpSource,
) -> Result<(GameRecord, Resolution), SkipReason> {
    if rotations.is_empty() || dates.is_empty() {
        return Err(SkipReason::MissingData);
    }

    let teams = resolve_teams(dates, rotations, pbp_source)?;
    let home_name =
        team_name(rotations, teams.home_id).ok_or(SkipReason::TeamNotInRotation(teams.home_id))?;
    let away_name =
        team_name(rotations, teams.away_id).ok_or(SkipReason::TeamNotInRotation(teams.away_id))?;

    let date_row = match teams.source {
        Resolution::DatesTable => dates
            .iter()
            .find(|d| d.is_home())
            .copied()
            .unwrap_or(dates[0]),
        Resolution::PlayByPlay => dates[0],
    };
    let date = format_game_date(&date_row.date)
        .ok_or_else(|| SkipReason::BadDate(date_row.date.clone()))?;

    let score = match pbp_source.rows() {
        Some(rows) => {
            let score = pbp::final_score(rows);
            if score.is_none() {
                match pbp::last_score(rows) {
                    Some(raw) => warn!(game_id, raw, "could not parse final score"),
                    None => warn!(game_id, "no scores found in play-by-play"),
                }
            }
            score
        }
        None => {
            warn!(game_id, "play-by-play unavailable; scores left empty");
            None
        }
    };
    let (home_score, away_score) = match score {
        Some(FinalScore { home, away }) => (Some(home), Some(away)),
        None => (None, None),
    };

    let record = GameRecord {
        home_team: TeamRecord {
            name: home_name,
            score: home_score,
            logo: logo_url(teams.home_id),
        },
        away_team: TeamRecord {
            name: away_name,
            score: away_score,
            logo: logo_url(teams.away_id),
        },
        game_id: game_id.to_string(),
        date,
        status: STATUS_FINAL.to_string(),
        players: PlayerNames::from_rotations(rotations),
        starter_on: starter_ids(rotations),
    };
    Ok((record, teams.source))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// `{game_id}.json`
    #[default]
    Plain,
    /// `00{game_id}.json`
    ZeroPadded,
}

impl OutputNaming {
    pub fn file_name(self, game_id: u64) -> String {
        match self {
            OutputNaming::Plain => format!("{game_id}.json"),
            OutputNaming::ZeroPadded => format!("00{game_id}.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub pbp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub naming: OutputNaming,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub games_total: usize,
    pub written: usize,
    pub skipped_existing: usize,
    pub pbp_fallbacks: usize,
    pub skipped: Vec<(u64, SkipReason)>,
}

/// Rotation and date rows grouped by game id.
#[derive(Debug, Default)]
pub struct GameIndex {
    order: Vec<u64>,
    rotations: HashMap<u64, Vec<RotationRow>>,
    dates: HashMap<u64, Vec<DateRow>>,
}

impl GameIndex {
    /// Games are visited in first-seen order of the dates table.
    pub fn new(rotations: Vec<RotationRow>, dates: Vec<DateRow>) -> Self {
        let mut index = GameIndex::default();
        for row in dates {
            if !index.dates.contains_key(&row.game_id) {
                index.order.push(row.game_id);
            }
            index.dates.entry(row.game_id).or_default().push(row);
        }
        for row in rotations {
            index.rotations.entry(row.game_id).or_default().push(row);
        }
        index
    }

    pub fn game_ids(&self) -> &[u64] {
        &self.order
    }

    pub fn rotations_for(&self, game_id: u64) -> Vec<&RotationRow> {
        self.rotations
            .get(&game_id)
            .map(|rows| rows.iter().collect())
            .unwrap_or_default()
    }

    pub fn dates_for(&self, game_id: u64) -> Vec<&DateRow> {
        self.dates
            .get(&game_id)
            .map(|rows| rows.iter().collect())
            .unwrap_or_default()
    }
}

/// Writes one JSON file per game, skipping games whose file already exists
/// unless `overwrite` is set. Per-game failures are logged and counted.
pub fn generate_game_files(index: &GameIndex, options: &AssembleOptions) -> Result<RunSummary> {
    if !options.output_dir.exists() {
        fs::create_dir_all(&options.output_dir).with_context(|| {
            format!("create output dir {}", options.output_dir.display())
        })?;
        info!(dir = %options.output_dir.display(), "created output directory");
    }

    let mut summary = RunSummary {
        output_dir: options.output_dir.clone(),
        games_total: index.game_ids().len(),
        ..Default::default()
    };
    info!(games = summary.games_total, "processing games");

    for &game_id in index.game_ids() {
        let path = options.output_dir.join(options.naming.file_name(game_id));
        if !options.overwrite && path.exists() {
            debug!(game_id, "output exists; skipping");
            summary.skipped_existing += 1;
            continue;
        }

        let rotations = index.rotations_for(game_id);
        let dates = index.dates_for(game_id);
        if rotations.is_empty() || dates.is_empty() {
            warn!(game_id, "skipping game: missing rotation/date data");
            summary.skipped.push((game_id, SkipReason::MissingData));
            continue;
        }

        let pbp = PbpSource::load(&options.pbp_dir, game_id);
        let (record, resolution) = match build_game_record(game_id, &rotations, &dates, &pbp) {
            Ok(built) => built,
            Err(reason) => {
                warn!(game_id, %reason, "skipping game");
                summary.skipped.push((game_id, reason));
                continue;
            }
        };
        if resolution == Resolution::PlayByPlay {
            summary.pbp_fallbacks += 1;
        }

        if let Err(err) = write_game_json(&path, &record) {
            let detail = format!("{err:#}");
            warn!(game_id, error = %detail, "failed to write game file");
            summary.skipped.push((game_id, SkipReason::WriteFailed(detail)));
            continue;
        }
        summary.written += 1;
    }

    info!(
        written = summary.written,
        skipped_existing = summary.skipped_existing,
        skipped = summary.skipped.len(),
        "processing complete"
    );
    Ok(summary)
}

/// UTF-8 JSON with four-space indentation.
pub fn write_game_json(path: &Path, record: &GameRecord) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record
        .serialize(&mut ser)
        .context("serialize game record")?;

    let tmp = path.with_extension("json.tmp");
    let written = fs::File::create(&tmp)
        .with_context(|| format!("create {}", tmp.display()))
        .and_then(|mut file| {
            file.write_all(&buf)
                .with_context(|| format!("write {}", tmp.display()))
        })
        .and_then(|()| {
            fs::rename(&tmp, path).with_context(|| format!("move into {}", path.display()))
        });
    if written.is_err() && tmp.is_file() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::{
        GameRecord, LookupError, OutputNaming, PbpSource, PlayerNames, Resolution, SkipReason,
        TeamRecord, resolve_from_dates, resolve_from_pbp, resolve_teams, starter_ids,
    };
    use crate::dates::DateRow;
    use crate::pbp::PbpRow;
    use crate::rotation::RotationRow;

    const LAL: u64 = 1610612747;
    const MIN: u64 = 1610612750;

    fn rot(team_id: u64, person_id: u64, first: &str, in_time: &str) -> RotationRow {
        RotationRow {
            game_id: 1,
            team_id,
            team_name: (if team_id == LAL { "Lakers" } else { "Timberwolves" }).to_string(),
            person_id,
            first_name: first.to_string(),
            last_name: "X".to_string(),
            in_time_real: Some(in_time.to_string()),
        }
    }

    fn date(team_id: u64, team: &str, htm: &str) -> DateRow {
        DateRow {
            game_id: 1,
            team_id,
            team: team.to_string(),
            home_marker: htm.to_string(),
            date: "20241022".to_string(),
            season: None,
        }
    }

    fn home_event(team_id: u64) -> PbpRow {
        PbpRow {
            home_description: Some("Jump Ball".to_string()),
            player1_team_id: Some(team_id),
            ..Default::default()
        }
    }

    #[test]
    fn dates_resolution_wins_over_play_by_play() {
        let rotations = [rot(LAL, 1, "A", "0.0"), rot(MIN, 2, "B", "0.0")];
        let rotations = rotations.iter().collect::<Vec<_>>();
        let dates = [date(LAL, "LAL", "LAL"), date(MIN, "MIN", "LAL")];
        let dates = dates.iter().collect::<Vec<_>>();
        let pbp = PbpSource::Loaded(vec![home_event(MIN)]);

        let teams = resolve_teams(&dates, &rotations, &pbp).expect("resolves");
        assert_eq!(teams.home_id, LAL);
        assert_eq!(teams.away_id, MIN);
        assert_eq!(teams.source, Resolution::DatesTable);
    }

    #[test]
    fn missing_home_marker_falls_back_to_play_by_play() {
        let rotations = [rot(LAL, 1, "A", "0.0"), rot(MIN, 2, "B", "0.0")];
        let rotations = rotations.iter().collect::<Vec<_>>();
        let dates = [date(LAL, "LAL", ""), date(MIN, "MIN", "")];
        let dates = dates.iter().collect::<Vec<_>>();
        assert_eq!(
            resolve_from_dates(&dates, &rotations),
            Err(LookupError::NoHomeRow)
        );

        let pbp = PbpSource::Loaded(vec![PbpRow::default(), home_event(MIN)]);
        let teams = resolve_teams(&dates, &rotations, &pbp).expect("resolves");
        assert_eq!((teams.home_id, teams.away_id), (MIN, LAL));
        assert_eq!(teams.source, Resolution::PlayByPlay);
    }

    #[test]
    fn fallback_needs_two_rotation_teams() {
        let rotations = [rot(LAL, 1, "A", "0.0")];
        let rotations = rotations.iter().collect::<Vec<_>>();
        assert_eq!(
            resolve_from_pbp(&[home_event(LAL)], &rotations),
            Err(SkipReason::TooFewTeams(1))
        );
    }

    #[test]
    fn fallback_home_must_be_a_rotation_team() {
        let rotations = [rot(LAL, 1, "A", "0.0"), rot(MIN, 2, "B", "0.0")];
        let rotations = rotations.iter().collect::<Vec<_>>();
        assert_eq!(
            resolve_from_pbp(&[home_event(LAL)], &rotations),
            Ok((LAL, MIN))
        );
        assert_eq!(
            resolve_from_pbp(&[home_event(1610612738)], &rotations),
            Err(SkipReason::TeamNotInRotation(1610612738))
        );
    }

    #[test]
    fn fallback_without_pbp_file_is_a_skip() {
        let rotations = [rot(LAL, 1, "A", "0.0"), rot(MIN, 2, "B", "0.0")];
        let rotations = rotations.iter().collect::<Vec<_>>();
        let dates = [date(LAL, "LAL", "BOS")];
        let dates = dates.iter().collect::<Vec<_>>();
        let pbp = PbpSource::Unavailable("missing".to_string());
        let err = resolve_teams(&dates, &rotations, &pbp).expect_err("skips");
        assert!(matches!(err, SkipReason::PbpUnavailable { .. }));
    }

    #[test]
    fn starters_are_zero_entry_rows_in_order() {
        let rotations = [
            rot(LAL, 1, "A", "0.0"),
            rot(LAL, 3, "C", "3050.0"),
            rot(MIN, 2, "B", "0.0"),
            rot(LAL, 1, "A", "4200.0"),
        ];
        let rotations = rotations.iter().collect::<Vec<_>>();
        assert_eq!(starter_ids(&rotations), "1,2");
    }

    #[test]
    fn player_names_dedup_and_keep_order() {
        let rotations = [
            rot(LAL, 9, "Nine", "0.0"),
            rot(LAL, 3, "Three", "0.0"),
            rot(LAL, 9, "Nine", "100.0"),
        ];
        let rotations = rotations.iter().collect::<Vec<_>>();
        let names = PlayerNames::from_rotations(&rotations);
        assert_eq!(names.len(), 2);
        assert_eq!(names.get("9"), Some("Nine X"));
        let json = serde_json::to_string(&names).expect("json");
        assert_eq!(json, r#"{"9":"Nine X","3":"Three X"}"#);
    }

    #[test]
    fn record_keys_keep_fixed_order() {
        let record = GameRecord {
            home_team: TeamRecord {
                name: "Lakers".to_string(),
                score: None,
                logo: super::logo_url(LAL),
            },
            away_team: TeamRecord {
                name: "Timberwolves".to_string(),
                score: Some(98),
                logo: super::logo_url(MIN),
            },
            game_id: "1".to_string(),
            date: "2024-10-22".to_string(),
            status: "Final".to_string(),
            players: PlayerNames::default(),
            starter_on: String::new(),
        };
        let json = serde_json::to_string(&record).expect("json");
        let keys = [
            "\"homeTeam\"",
            "\"awayTeam\"",
            "\"game_id\"",
            "\"date\"",
            "\"status\"",
            "\"players\"",
            "\"starter_on\"",
        ];
        let positions = keys
            .iter()
            .map(|k| json.find(k).expect("key present"))
            .collect::<Vec<_>>();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.contains(r#""score":null"#));
        assert!(json.contains("https://cdn.nba.com/logos/nba/1610612747/primary/L/logo.svg"));
    }

    #[test]
    fn output_naming() {
        assert_eq!(OutputNaming::Plain.file_name(22400061), "22400061.json");
        assert_eq!(
            OutputNaming::ZeroPadded.file_name(22400061),
            "0022400061.json"
        );
    }
}
