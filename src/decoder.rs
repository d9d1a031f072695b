//! Turns one line of the timing feed into an [`Event`].
//!
//! Line shape: `[HH:MM:SS.mmm] <kind> <competitor> [extra...]`, fields
//! separated by single spaces.

use tracing::warn;

use crate::error::{RaceError, Result};
use crate::types::{parse_time_of_day, Event, EventKind, Payload};

pub fn decode_line(line: &str) -> Result<Event> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < 3 {
        return Err(RaceError::malformed(
            line,
            "expected at least timestamp, kind and competitor fields",
        ));
    }

    let stamp = fields[0]
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| RaceError::malformed(line, "timestamp is not bracketed"))?;
    let timestamp = parse_time_of_day(stamp)
        .map_err(|e| RaceError::malformed(line, format!("bad timestamp `{stamp}`: {e}")))?;

    let code: i64 = fields[1]
        .parse()
        .map_err(|e| RaceError::malformed(line, format!("bad event kind `{}`: {e}", fields[1])))?;
    let kind = EventKind::from_code(code);

    let competitor_id = fields[2];
    if competitor_id.is_empty() {
        return Err(RaceError::malformed(line, "empty competitor id"));
    }

    let extra = &fields[3..];
    let required = |what: &str| first_field(line, extra, what);

    let payload = match kind {
        EventKind::StartTimeDrawn => {
            let raw = required("drawn start time")?;
            let t = parse_time_of_day(raw)
                .map_err(|e| RaceError::malformed(line, format!("bad start time `{raw}`: {e}")))?;
            Payload::StartTime(t)
        }
        EventKind::OnFiringRange => Payload::FiringRange(required("firing range")?.to_string()),
        EventKind::TargetHit => Payload::Target(required("target")?.to_string()),
        EventKind::CannotContinue => Payload::Comment(extra.join(" ")),
        EventKind::Unknown(code) => {
            warn!(code, line, "unknown event kind");
            Payload::Raw(extra.iter().map(|s| s.to_string()).collect())
        }
        _ => Payload::None,
    };

    Ok(Event {
        timestamp,
        kind,
        competitor_id: competitor_id.to_string(),
        payload,
    })
}

fn first_field<'a>(line: &str, extra: &[&'a str], what: &str) -> Result<&'a str> {
    extra
        .first()
        .copied()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RaceError::malformed(line, format!("missing {what}")))
}
