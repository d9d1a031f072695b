use std::fmt;

use chrono::{Duration, NaiveTime, Timelike};

/// Output format for every time-of-day and duration in logs and reports.
pub const TIME_FORMAT: &str = "%H:%M:%S%.3f";
// `%.f` makes the fractional part optional when parsing.
const TIME_PARSE_FORMAT: &str = "%H:%M:%S%.f";

/// Parses `HH:MM:SS` or `HH:MM:SS.mmm` into a time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, TIME_PARSE_FORMAT)
}

/// Parses `HH:MM:SS[.mmm]` as a span: the components are summed, so
/// `00:01:30` is ninety seconds.
pub fn parse_duration(s: &str) -> Result<Duration, chrono::ParseError> {
    parse_time_of_day(s).map(|t| since_midnight(&t))
}

pub fn since_midnight(t: &NaiveTime) -> Duration {
    Duration::seconds(i64::from(t.num_seconds_from_midnight()))
        + Duration::milliseconds(i64::from(t.nanosecond() / 1_000_000))
}

pub fn format_time_of_day(t: &NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Renders a span as `HH:MM:SS.mmm`. Hours are not wrapped at 24.
pub fn format_duration(d: Duration) -> String {
    let total_ms = d.num_milliseconds();
    let sign = if total_ms < 0 { "-" } else { "" };
    let ms = total_ms.unsigned_abs();
    format!(
        "{}{:02}:{:02}:{:02}.{:03}",
        sign,
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1_000) % 60,
        ms % 1_000
    )
}

/// Event codes of the timing feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Registered,
    StartTimeDrawn,
    OnStartLine,
    Started,
    OnFiringRange,
    TargetHit,
    LeftFiringRange,
    EnteredPenaltyLoop,
    LeftPenaltyLoop,
    EndedLap,
    CannotContinue,
    /// Well-formed line with a code outside the known set.
    Unknown(i64),
}

impl EventKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => EventKind::Registered,
            2 => EventKind::StartTimeDrawn,
            3 => EventKind::OnStartLine,
            4 => EventKind::Started,
            5 => EventKind::OnFiringRange,
            6 => EventKind::TargetHit,
            7 => EventKind::LeftFiringRange,
            8 => EventKind::EnteredPenaltyLoop,
            9 => EventKind::LeftPenaltyLoop,
            10 => EventKind::EndedLap,
            11 => EventKind::CannotContinue,
            other => EventKind::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            EventKind::Registered => 1,
            EventKind::StartTimeDrawn => 2,
            EventKind::OnStartLine => 3,
            EventKind::Started => 4,
            EventKind::OnFiringRange => 5,
            EventKind::TargetHit => 6,
            EventKind::LeftFiringRange => 7,
            EventKind::EnteredPenaltyLoop => 8,
            EventKind::LeftPenaltyLoop => 9,
            EventKind::EndedLap => 10,
            EventKind::CannotContinue => 11,
            EventKind::Unknown(code) => *code,
        }
    }
}

/// Kind-specific trailing fields of an event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    StartTime(NaiveTime),
    FiringRange(String),
    Target(String),
    Comment(String),
    /// Trailing fields of an unknown kind, kept for diagnostics.
    Raw(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: NaiveTime,
    pub kind: EventKind,
    pub competitor_id: String,
    pub payload: Payload,
}

impl Event {
    /// Outgoing-log message for this event.
    pub fn describe(&self) -> String {
        let at = format_time_of_day(&self.timestamp);
        let id = &self.competitor_id;
        let message = match (&self.kind, &self.payload) {
            (EventKind::Registered, _) => format!("The competitor({id}) registered"),
            (EventKind::StartTimeDrawn, Payload::StartTime(t)) => format!(
                "The start time for the competitor({id}) was set by a draw to {}",
                format_time_of_day(t)
            ),
            (EventKind::StartTimeDrawn, _) => {
                format!("The start time for the competitor({id}) was set by a draw")
            }
            (EventKind::OnStartLine, _) => format!("The competitor({id}) is on the start line"),
            (EventKind::Started, _) => format!("The competitor({id}) has started"),
            (EventKind::OnFiringRange, Payload::FiringRange(range)) => {
                format!("The competitor({id}) is on the firing range({range})")
            }
            (EventKind::OnFiringRange, _) => format!("The competitor({id}) is on the firing range"),
            (EventKind::TargetHit, Payload::Target(target)) => {
                format!("The target({target}) has been hit by competitor({id})")
            }
            (EventKind::TargetHit, _) => format!("A target has been hit by competitor({id})"),
            (EventKind::LeftFiringRange, _) => {
                format!("The competitor({id}) left the firing range")
            }
            (EventKind::EnteredPenaltyLoop, _) => {
                format!("The competitor({id}) entered the penalty laps")
            }
            (EventKind::LeftPenaltyLoop, _) => {
                format!("The competitor({id}) left the penalty laps")
            }
            (EventKind::EndedLap, _) => format!("The competitor({id}) ended the main lap"),
            (EventKind::CannotContinue, Payload::Comment(comment)) => {
                format!("The competitor({id}) can't continue: {comment}")
            }
            (EventKind::CannotContinue, _) => format!("The competitor({id}) can't continue"),
            (EventKind::Unknown(code), _) => {
                format!("Unknown event {code} for the competitor({id})")
            }
        };
        format!("[{at}] {message}")
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            format_time_of_day(&self.timestamp),
            self.kind.code(),
            self.competitor_id
        )?;
        match &self.payload {
            Payload::None => Ok(()),
            Payload::StartTime(t) => write!(f, " {}", format_time_of_day(t)),
            Payload::FiringRange(s) | Payload::Target(s) | Payload::Comment(s) => {
                write!(f, " {s}")
            }
            Payload::Raw(fields) => {
                for field in fields {
                    write!(f, " {field}")?;
                }
                Ok(())
            }
        }
    }
}
