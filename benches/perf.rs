use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use nba_gameindex::dates::DateRow;
use nba_gameindex::gameindex::{PbpSource, build_game_record};
use nba_gameindex::pbp::{self, PbpRow};
use nba_gameindex::rotation::RotationRow;
use nba_gameindex::table::Table;

const HOME: u64 = 1610612747;
const AWAY: u64 = 1610612750;

fn sample_rotations() -> Vec<RotationRow> {
    let mut out = Vec::new();
    for (team_id, team_name) in [(HOME, "Lakers"), (AWAY, "Timberwolves")] {
        for slot in 0..13u64 {
            for stint in 0..3u64 {
                out.push(RotationRow {
                    game_id: 22400061,
                    team_id,
                    team_name: team_name.to_string(),
                    person_id: team_id * 100 + slot,
                    first_name: format!("First{slot}"),
                    last_name: format!("Last{slot}"),
                    in_time_real: Some(if slot < 5 && stint == 0 {
                        "0.0".to_string()
                    } else {
                        format!("{}.0", 600 * (slot + stint))
                    }),
                });
            }
        }
    }
    out
}

fn sample_pbp() -> Vec<PbpRow> {
    (0..500u32)
        .map(|i| PbpRow {
            score: (i % 3 == 0).then(|| format!("{} - {}", i / 3, i / 4)),
            home_description: (i % 2 == 0).then(|| "Jump Shot".to_string()),
            player1_team_id: Some(if i % 2 == 0 { HOME } else { AWAY }),
        })
        .collect()
}

fn sample_dates() -> Vec<DateRow> {
    vec![
        DateRow {
            game_id: 22400061,
            team_id: HOME,
            team: "LAL".to_string(),
            home_marker: "LAL".to_string(),
            date: "20241022".to_string(),
            season: Some("2025".to_string()),
        },
        DateRow {
            game_id: 22400061,
            team_id: AWAY,
            team: "MIN".to_string(),
            home_marker: "LAL".to_string(),
            date: "20241022".to_string(),
            season: Some("2025".to_string()),
        },
    ]
}

fn bench_parse_score(c: &mut Criterion) {
    c.bench_function("parse_score", |b| {
        b.iter(|| black_box(pbp::parse_score(black_box("110 - 103"))))
    });
}

fn bench_build_game_record(c: &mut Criterion) {
    let rotations = sample_rotations();
    let rotations = rotations.iter().collect::<Vec<_>>();
    let dates = sample_dates();
    let dates = dates.iter().collect::<Vec<_>>();
    let source = PbpSource::Loaded(sample_pbp());

    c.bench_function("build_game_record", |b| {
        b.iter(|| {
            let built = build_game_record(22400061, &rotations, &dates, &source);
            black_box(built.is_ok());
        })
    });
}

fn bench_pbp_decode(c: &mut Criterion) {
    let mut raw = String::from("GAME_ID,HOMEDESCRIPTION,SCORE,PLAYER1_TEAM_ID\n");
    for i in 0..500 {
        raw.push_str(&format!("22400061,Shot {i},{i} - {i},{HOME}.0\n"));
    }
    c.bench_function("pbp_decode", |b| {
        b.iter(|| {
            let table = Table::from_csv_str(black_box(&raw)).unwrap();
            black_box(table.deserialize::<PbpRow>().unwrap().len());
        })
    });
}

criterion_group!(
    benches,
    bench_parse_score,
    bench_build_game_record,
    bench_pbp_decode
);
criterion_main!(benches);
