use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Directory suffixes under a year: regular season and postseason.
pub const SEASON_SUFFIXES: &[&str] = &["", "ps"];

/// The thirty NBA franchise ids (`1610612737` Atlanta .. `1610612766` Charlotte).
pub const NBA_TEAM_IDS: [u64; 30] = [
    1610612737, 1610612738, 1610612739, 1610612740, 1610612741, 1610612742, 1610612743,
    1610612744, 1610612745, 1610612746, 1610612747, 1610612748, 1610612749, 1610612750,
    1610612751, 1610612752, 1610612753, 1610612754, 1610612755, 1610612756, 1610612757,
    1610612758, 1610612759, 1610612760, 1610612761, 1610612762, 1610612763, 1610612764,
    1610612765, 1610612766,
];

/// A `{root}/{year}{suffix}/{team_id}.csv` layout.
#[derive(Debug, Clone)]
pub struct SeasonGrid {
    pub years: RangeInclusive<u16>,
    pub team_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFile {
    pub year: u16,
    pub season: String,
    pub team_id: u64,
    pub path: PathBuf,
}

impl SeasonGrid {
    pub fn new(years: RangeInclusive<u16>, team_ids: Vec<u64>) -> Self {
        Self { years, team_ids }
    }

    /// Every candidate path, year-major then suffix then team. Files are
    /// not checked for existence.
    pub fn candidates(&self, root: &Path) -> Vec<GridFile> {
        let mut out = Vec::new();
        for year in self.years.clone() {
            for suffix in SEASON_SUFFIXES {
                for team_id in &self.team_ids {
                    out.push(grid_file(root, year, suffix, *team_id));
                }
            }
        }
        out
    }

    /// Year-major then team then suffix, so a team's regular season and
    /// postseason files sit next to each other.
    pub fn candidates_by_team(&self, root: &Path) -> Vec<GridFile> {
        let mut out = Vec::new();
        for year in self.years.clone() {
            for team_id in &self.team_ids {
                for suffix in SEASON_SUFFIXES {
                    out.push(grid_file(root, year, suffix, *team_id));
                }
            }
        }
        out
    }

    pub fn existing(&self, root: &Path) -> Vec<GridFile> {
        only_files(self.candidates(root))
    }

    pub fn existing_by_team(&self, root: &Path) -> Vec<GridFile> {
        only_files(self.candidates_by_team(root))
    }
}

fn grid_file(root: &Path, year: u16, suffix: &str, team_id: u64) -> GridFile {
    let season = format!("{year}{suffix}");
    GridFile {
        year,
        path: root.join(&season).join(format!("{team_id}.csv")),
        season,
        team_id,
    }
}

fn only_files(files: Vec<GridFile>) -> Vec<GridFile> {
    files.into_iter().filter(|f| f.path.is_file()).collect()
}
