// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use clap::{Arg, ArgMatches, arg, value_parser};
use tokio::io::AsyncReadExt;

/// The output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

impl OutputFormat {
    pub fn arg() -> Arg {
        arg!(--"output-format" <FORMAT> "Output format")
            .value_parser(value_parser!(OutputFormat))
            .default_value("table")
    }

    pub fn from(matches: &ArgMatches) -> Self {
        matches
            .get_one("output-format")
            .copied()
            .unwrap_or(OutputFormat::Table)
    }
}

pub fn arg_verbose() -> Arg {
    arg!(-v --verbose "Show more detailed information")
}

pub fn get_verbose(matches: &ArgMatches) -> bool {
    matches.get_flag("verbose")
}

/// Parses a point in time as unix seconds.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` and `YYYY-MM-DD` in local time, or a bare unix timestamp.
pub fn parse_timestamp(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<i64>() {
        Ok(ts)
    } else if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        Ok(dt.timestamp())
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        local_timestamp(dt)
    } else if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        local_timestamp(date.and_time(chrono::NaiveTime::MIN))
    } else {
        Err(format!(
            "Invalid time '{s}'. Expected RFC 3339, YYYY-MM-DD HH:MM, YYYY-MM-DD or unix seconds"
        ))
    }
}

fn local_timestamp(dt: NaiveDateTime) -> Result<i64, String> {
    Local
        .from_local_datetime(&dt)
        .earliest()
        .map(|t| t.timestamp())
        .ok_or_else(|| format!("Nonexistent local time: {dt}"))
}

/// Formats unix seconds in local time.
pub fn format_timestamp(ts: Option<i64>) -> String {
    ts.and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Reads a payload from a file, or from stdin when the path is `-`.
pub async fn read_payload(path: &Path) -> Result<String, Box<dyn Error>> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        Ok(buf)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
    }
}
