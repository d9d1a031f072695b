//! Final standings: ranking, derived times and speeds, rendering.

use std::cmp::Ordering;
use std::io::Write;

use chrono::Duration;
use serde::Serialize;

use crate::config::RaceConfig;
use crate::error::Result;
use crate::model::{CompetitorRecord, Interval, RaceLedger};
use crate::types::format_duration;

/// Where a competitor lands in the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    NotStarted,
    NotFinished,
    Finished(Duration),
}

impl Standing {
    pub fn of(rec: &CompetitorRecord) -> Self {
        if rec.not_started {
            return Standing::NotStarted;
        }
        if rec.not_finished {
            return Standing::NotFinished;
        }
        match (rec.actual_start, rec.elapsed()) {
            (_, Some(elapsed)) => Standing::Finished(elapsed),
            (None, None) => Standing::NotStarted,
            // Still on course when the feed ended.
            (Some(_), None) => Standing::NotFinished,
        }
    }

    fn tier(&self) -> u8 {
        match self {
            Standing::NotStarted => 0,
            Standing::NotFinished => 1,
            Standing::Finished(_) => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Standing::NotStarted => "NotStarted",
            Standing::NotFinished => "NotFinished",
            Standing::Finished(_) => "Finished",
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Standing::Finished(elapsed) => Some(*elapsed),
            _ => None,
        }
    }

    /// Total-time column of the text report.
    pub fn label(&self) -> String {
        match self {
            Standing::NotStarted => "{NotStarted}".to_string(),
            Standing::NotFinished => "{NotFinished}".to_string(),
            Standing::Finished(elapsed) => format_duration(*elapsed),
        }
    }
}

impl PartialOrd for Standing {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Standing {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Standing::Finished(a), Standing::Finished(b)) => a.cmp(b),
            _ => self.tier().cmp(&other.tier()),
        }
    }
}

/// Numeric ids compare as numbers, anything else lexically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[derive(Debug, Clone)]
pub struct Ranked<'a> {
    pub competitor_id: &'a str,
    pub record: &'a CompetitorRecord,
    pub standing: Standing,
}

/// Not started, then not finished, then finishers by elapsed time.
/// Ties break on competitor id.
pub fn rank(ledger: &RaceLedger) -> Vec<Ranked<'_>> {
    let mut ranked: Vec<Ranked<'_>> = ledger
        .records()
        .map(|(id, record)| Ranked {
            competitor_id: id.as_str(),
            record,
            standing: Standing::of(record),
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.standing
            .cmp(&b.standing)
            .then_with(|| compare_ids(a.competitor_id, b.competitor_id))
    });
    ranked
}

/// Course lengths and shooting layout the report needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSettings {
    pub lap_len: f64,
    pub penalty_len: f64,
    pub firing_lines: u32,
}

impl ReportSettings {
    /// Shots fired over the whole race.
    pub fn total_shots(&self) -> u32 {
        5 * self.firing_lines
    }
}

impl From<&RaceConfig> for ReportSettings {
    fn from(cfg: &RaceConfig) -> Self {
        Self {
            lap_len: cfg.lap_len,
            penalty_len: cfg.penalty_len,
            firing_lines: cfg.firing_lines,
        }
    }
}

/// One lap or penalty loop. Both fields are `None` while incomplete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub time: Option<String>,
    pub speed: Option<f64>,
}

impl Segment {
    fn from_interval(interval: &Interval, length: f64) -> Self {
        match interval.duration() {
            Some(d) => Self {
                time: Some(format_duration(d)),
                speed: Some(speed(length, d)),
            },
            None => Self {
                time: None,
                speed: None,
            },
        }
    }

    fn render(&self) -> String {
        match (&self.time, self.speed) {
            (Some(time), Some(speed)) => format!("{{{time}, {speed:.3}}}"),
            _ => "{,}".to_string(),
        }
    }
}

/// Length per second, rounded to three decimals. Zero for an empty span.
pub fn speed(length: f64, d: Duration) -> f64 {
    let secs = d.num_milliseconds() as f64 / 1000.0;
    if secs <= 0.0 {
        return 0.0;
    }
    round_to(length / secs, 3)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let multiplier = 10.0_f64.powi(decimals);
    (value * multiplier).round() / multiplier
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub competitor_id: String,
    #[serde(skip)]
    pub standing: Standing,
    pub status: &'static str,
    pub elapsed_ms: Option<i64>,
    pub total_time: String,
    pub laps: Vec<Segment>,
    pub penalty_loops: Vec<Segment>,
    pub hits: u32,
    pub shots: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReportRow {
    /// `total id [laps] [penalties] hits/shots`
    pub fn render(&self) -> String {
        let laps: Vec<String> = self.laps.iter().map(Segment::render).collect();
        let penalties: Vec<String> = self.penalty_loops.iter().map(Segment::render).collect();
        format!(
            "{} {} [{}] [{}] {}/{}",
            self.total_time,
            self.competitor_id,
            laps.join(", "),
            penalties.join(", "),
            self.hits,
            self.shots
        )
    }
}

pub fn build_report(ledger: &RaceLedger, settings: &ReportSettings) -> Vec<ReportRow> {
    let shots = settings.total_shots();
    rank(ledger)
        .into_iter()
        .map(|ranked| {
            let rec = ranked.record;
            ReportRow {
                competitor_id: ranked.competitor_id.to_string(),
                standing: ranked.standing,
                status: ranked.standing.name(),
                elapsed_ms: ranked.standing.elapsed().map(|d| d.num_milliseconds()),
                total_time: ranked.standing.label(),
                laps: rec
                    .laps
                    .iter()
                    .map(|lap| Segment::from_interval(lap, settings.lap_len))
                    .collect(),
                penalty_loops: rec
                    .penalty_loops
                    .iter()
                    .map(|pl| Segment::from_interval(pl, settings.penalty_len))
                    .collect(),
                hits: rec.hits,
                shots,
                comment: rec.comment.clone(),
            }
        })
        .collect()
}

pub fn render_text<W: Write>(rows: &[ReportRow], out: &mut W) -> Result<()> {
    for row in rows {
        writeln!(out, "{}", row.render())?;
    }
    Ok(())
}

pub fn render_json<W: Write>(rows: &[ReportRow], out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, rows)?;
    writeln!(out)?;
    Ok(())
}
