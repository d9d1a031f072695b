//! Biathlon race results from a timing event feed.
//!
//! Lines are decoded into [`Event`]s, applied in file order to a
//! [`RaceLedger`], and the finished ledger is ranked and rendered by
//! [`report`].

pub mod config;
pub mod decoder;
pub mod error;
pub mod model;
pub mod report;
pub mod types;

pub use config::RaceConfig;
pub use decoder::decode_line;
pub use error::{RaceError, Result};
pub use model::{CompetitorRecord, Interval, RaceLedger};
pub use report::{build_report, rank, render_json, render_text, ReportRow, ReportSettings, Standing};
pub use types::{Event, EventKind, Payload};
