use std::collections::BTreeMap;
use std::io::BufRead;

use chrono::{Duration, NaiveTime};
use tracing::{debug, error, info, warn};

use crate::config::RaceConfig;
use crate::decoder::decode_line;
use crate::error::{RaceError, Result};
use crate::types::{format_duration, format_time_of_day, Event, EventKind, Payload};

/// A span on course. `end` stays `None` while the interval is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
}

impl Interval {
    fn open(start: NaiveTime) -> Self {
        Self { start, end: None }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Elapsed time, once closed.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }
}

/// Everything the feed told us about one competitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetitorRecord {
    pub registered: bool,
    pub scheduled_start: Option<NaiveTime>,
    pub actual_start: Option<NaiveTime>,
    pub laps: Vec<Interval>,
    pub penalty_loops: Vec<Interval>,
    pub hits: u32,
    pub finish_time: Option<NaiveTime>,
    pub not_started: bool,
    pub not_finished: bool,
    pub comment: Option<String>,
    open_lap: Option<usize>,
    open_penalty: Option<usize>,
}

impl CompetitorRecord {
    pub fn open_lap(&self) -> Option<&Interval> {
        self.open_lap.map(|i| &self.laps[i])
    }

    pub fn open_penalty_loop(&self) -> Option<&Interval> {
        self.open_penalty.map(|i| &self.penalty_loops[i])
    }

    /// `finish - start`, only for competitors who completed every lap.
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.actual_start, self.finish_time) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }
}

/// Owns one record per competitor and interprets the feed, one event at a
/// time, in file order.
#[derive(Debug, Clone)]
pub struct RaceLedger {
    lap_count: usize,
    start_interval: Duration,
    race_start: Option<NaiveTime>,
    records: BTreeMap<String, CompetitorRecord>,
}

impl RaceLedger {
    /// # Arguments
    /// * `lap_count` - Laps a competitor must complete to finish
    /// * `start_interval` - Allowed delay between the drawn and the actual start
    pub fn new(lap_count: usize, start_interval: Duration) -> Self {
        Self {
            lap_count,
            start_interval,
            race_start: None,
            records: BTreeMap::new(),
        }
    }

    pub fn from_config(cfg: &RaceConfig) -> Self {
        let mut ledger = Self::new(cfg.laps, cfg.start_delta);
        ledger.race_start = Some(cfg.start);
        ledger
    }

    pub fn lap_count(&self) -> usize {
        self.lap_count
    }

    pub fn get(&self, competitor_id: &str) -> Option<&CompetitorRecord> {
        self.records.get(competitor_id)
    }

    pub fn records(&self) -> impl Iterator<Item = (&String, &CompetitorRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies one event to its competitor's record, creating the record on
    /// first mention.
    ///
    /// Fails with [`RaceError::MalformedEvent`] when the event cannot follow
    /// the record's current state: closing a lap or penalty loop that is not
    /// open, opening a second penalty loop, or starting twice.
    pub fn apply(&mut self, event: &Event) -> Result<()> {
        let lap_count = self.lap_count;
        let start_interval = self.start_interval;
        let race_start = self.race_start;
        let ts = event.timestamp;
        let id = event.competitor_id.as_str();
        let rec = self.records.entry(event.competitor_id.clone()).or_default();

        match (&event.kind, &event.payload) {
            (EventKind::Registered, _) => rec.registered = true,
            (EventKind::StartTimeDrawn, Payload::StartTime(drawn)) => {
                if race_start.is_some_and(|start| *drawn < start) {
                    warn!(
                        competitor = id,
                        drawn = %format_time_of_day(drawn),
                        "drawn start time is before the race start"
                    );
                }
                rec.scheduled_start = Some(*drawn);
            }
            (EventKind::StartTimeDrawn, _) => {
                return Err(RaceError::malformed(event.to_string(), "draw without a start time"));
            }
            (EventKind::Started, _) => {
                if rec.actual_start.is_some() {
                    return Err(RaceError::malformed(
                        event.to_string(),
                        "competitor has already started",
                    ));
                }
                rec.actual_start = Some(ts);
                if rec.laps.len() < lap_count {
                    rec.laps.push(Interval::open(ts));
                    rec.open_lap = Some(rec.laps.len() - 1);
                }
                if let Some(drawn) = rec.scheduled_start {
                    let late_by = ts - drawn;
                    if late_by > start_interval {
                        rec.not_started = true;
                        rec.comment = Some(format!(
                            "started {} after the drawn start time {}",
                            format_duration(late_by),
                            format_time_of_day(&drawn)
                        ));
                        warn!(
                            competitor = id,
                            late_by = %format_duration(late_by),
                            "disqualified: late start"
                        );
                    }
                }
            }
            (EventKind::TargetHit, _) => rec.hits += 1,
            (EventKind::EnteredPenaltyLoop, _) => {
                if rec.open_penalty.is_some() {
                    return Err(RaceError::malformed(
                        event.to_string(),
                        "penalty loop entered while another is open",
                    ));
                }
                rec.penalty_loops.push(Interval::open(ts));
                rec.open_penalty = Some(rec.penalty_loops.len() - 1);
            }
            (EventKind::LeftPenaltyLoop, _) => {
                let idx = rec.open_penalty.take().ok_or_else(|| {
                    RaceError::malformed(event.to_string(), "no open penalty loop to leave")
                })?;
                rec.penalty_loops[idx].end = Some(ts);
            }
            (EventKind::EndedLap, _) => {
                let idx = rec.open_lap.take().ok_or_else(|| {
                    RaceError::malformed(event.to_string(), "no open lap to end")
                })?;
                rec.laps[idx].end = Some(ts);
                if rec.laps.len() < lap_count {
                    rec.laps.push(Interval::open(ts));
                    rec.open_lap = Some(rec.laps.len() - 1);
                } else {
                    rec.finish_time = Some(ts);
                    info!(competitor = id, "finished");
                }
            }
            (EventKind::CannotContinue, payload) => {
                rec.not_finished = true;
                rec.comment = match payload {
                    Payload::Comment(text) => Some(text.clone()),
                    _ => None,
                };
            }
            (
                EventKind::OnStartLine | EventKind::OnFiringRange | EventKind::LeftFiringRange,
                _,
            ) => {}
            (EventKind::Unknown(code), _) => {
                debug!(code, competitor = id, "ignoring unknown event");
                return Ok(());
            }
        }

        info!("{}", event.describe());
        Ok(())
    }

    /// Decodes and applies every line of `reader`, returning how many events
    /// were applied. Blank lines are skipped.
    ///
    /// A malformed line, including one that is not valid UTF-8, aborts with
    /// its error. A read failure only ends the input: it is logged and the
    /// events read so far stay applied.
    pub fn ingest<R: BufRead>(&mut self, mut reader: R) -> Result<usize> {
        let mut applied = 0;
        let mut line_no = 0;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => line_no += 1,
                Err(e) => {
                    error!(line = line_no + 1, "failed reading events: {e}");
                    break;
                }
            }
            let text = std::str::from_utf8(&buf).map_err(|e| {
                RaceError::malformed(
                    String::from_utf8_lossy(&buf).trim_end(),
                    format!("line {line_no} is not valid UTF-8: {e}"),
                )
            })?;
            let line = text.trim_end_matches(|c| c == '\n' || c == '\r');
            if line.trim().is_empty() {
                continue;
            }
            self.apply(&decode_line(line)?)?;
            applied += 1;
        }
        Ok(applied)
    }
}
