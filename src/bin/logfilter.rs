//! Offline log filter: turns the monitor's free-form price log lines into a
//! structured JSON array for later analysis.
//!
//! Input lines look like (possibly with a tracing prefix in front):
//!
//! ```text
//! Prices updated at 2025-01-04 12:05:00 UTC -> {"bitcoin": {"usd": 91000.0}}
//! ```
//!
//! Output is a pretty-printed JSON array of `{ "ts": <ISO-8601>, "price":
//! <coin -> {currency: value}> }` records. Lines that don't match or don't
//! parse are skipped.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PriceRecord {
    ts: String,
    price: serde_json::Value,
}

fn parse_prices(input: &str) -> Vec<PriceRecord> {
    // Search, not match: tracing prepends its own timestamp and level.
    let re = Regex::new(r"Prices updated at (.*?) UTC -> (.*)").expect("static regex");

    let mut records = Vec::new();
    for line in input.lines() {
        let Some(caps) = re.captures(line.trim()) else {
            continue;
        };

        let Some(ts) = parse_timestamp(&caps[1]) else {
            continue;
        };

        let raw = &caps[2];
        // Older logs wrote Python-style dicts with single quotes.
        let price = match serde_json::from_str::<serde_json::Value>(raw)
            .or_else(|_| serde_json::from_str(&raw.replace('\'', "\"")))
        {
            Ok(v) => v,
            Err(_) => continue,
        };

        records.push(PriceRecord { ts, price });
    }

    records
}

/// Normalizes a log timestamp (UTC, no offset) to ISO-8601.
fn parse_timestamp(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().to_rfc3339())
}

fn read_input() -> io::Result<String> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.as_slice() {
        [] => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        [flag, path] if flag == "-f" || flag == "--file" => fs::read_to_string(path),
        _ => {
            eprintln!("Usage: logfilter [-f <file>]   (default: stdin)");
            process::exit(2);
        }
    }
}

fn main() {
    let input = match read_input() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("logfilter: {e}");
            process::exit(1);
        }
    };

    let records = parse_prices(&input);
    match serde_json::to_string_pretty(&records) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("logfilter: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_matching_lines_and_skips_noise() {
        let input = "\
2025-01-04T12:05:00Z INFO cryptoping: Prices updated at 2025-01-04 12:05:00 UTC -> {\"bitcoin\": {\"usd\": 91000.0}}
some unrelated line
Prices updated at 2025-01-04 12:06:00 UTC -> not json at all
";
        let records = parse_prices(input);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ts, "2025-01-04T12:05:00+00:00");
        assert_eq!(records[0].price["bitcoin"]["usd"], 91000.0);
    }

    #[test]
    fn tolerates_single_quoted_dicts() {
        let input = "Prices updated at 2025-01-04 12:05:00 UTC -> {'sui': {'usd': 2.5}}";
        let records = parse_prices(input);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price["sui"]["usd"], 2.5);
    }

    #[test]
    fn output_is_a_valid_json_array() {
        let input = "Prices updated at 2025-01-04 12:05:00 UTC -> {\"bitcoin\": {\"usd\": 1.0}}";
        let records = parse_prices(input);
        let json = serde_json::to_string(&records).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_array());
        assert_eq!(parsed[0]["ts"], "2025-01-04T12:05:00+00:00");
    }

    #[test]
    fn bad_timestamp_is_skipped() {
        let input = "Prices updated at yesterday UTC -> {\"bitcoin\": {\"usd\": 1.0}}";
        assert!(parse_prices(input).is_empty());
    }
}
