//! Output formatting for nxtctl

use anyhow::Error;
use colored::*;
use nxt_throttle_calibration::{AxisId, SessionState};
use nxt_throttle_session::{AxisUpdate, StatsSnapshot};
use serde_json::json;

pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format error as JSON: {}", e),
    }
}

pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_success(message: &str, json: bool) {
    if json {
        let output = json!({
            "success": true,
            "message": message
        });
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to format success message as JSON: {}", e),
        }
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

pub fn print_warning(message: &str, json: bool) {
    if json {
        let output = json!({
            "success": false,
            "warning": message
        });
        println!("{}", output);
    } else {
        println!("{} {}", "⚠".yellow(), message);
    }
}

/// Setup progress: the state reached and what the user should do next.
pub fn print_setup_state(state: SessionState, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "state": state,
                "prompt": state.prompt(),
            })
        );
    } else {
        println!("{} {}", format!("[{}]", state).cyan(), state.prompt());
    }
}

/// One axis update, a line of JSON or an aligned human-readable row.
pub fn format_update(update: &AxisUpdate, json: bool) -> String {
    if json {
        serde_json::to_string(update).unwrap_or_default()
    } else {
        format!(
            "{:<8} {:>7.1}%  ({} ticks)",
            update.axis.as_str(),
            update.percent,
            update.raw_ticks
        )
    }
}

pub fn print_update(update: &AxisUpdate, json: bool) {
    println!("{}", format_update(update, json));
}

pub fn print_raw_positions(positions: &[(AxisId, Option<i32>)], json: bool) {
    if json {
        let axes: serde_json::Map<String, serde_json::Value> = positions
            .iter()
            .map(|(axis, raw)| (axis.as_str().to_string(), json!(raw)))
            .collect();
        println!("{}", json!({ "success": true, "raw_ticks": axes }));
    } else {
        println!("{}", "Raw rotation counts:".bold());
        for (axis, raw) in positions {
            match raw {
                Some(ticks) => println!("  {:<8} {}", axis.as_str(), ticks),
                None => println!("  {:<8} {}", axis.as_str(), "no reply".yellow()),
            }
        }
    }
}

pub fn print_stats(stats: &StatsSnapshot, json: bool) {
    if json {
        println!("{}", json!({ "stats": stats }));
    } else {
        println!(
            "{} {} queries, {} replies, {} protocol errors, {} I/O errors, {} heartbeats",
            "Session:".dimmed(),
            stats.queries_sent,
            stats.replies_decoded,
            stats.protocol_errors,
            stats.io_errors,
            stats.heartbeats_sent
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_update_human() {
        let update = AxisUpdate {
            axis: AxisId::Yaw,
            raw_ticks: -174,
            percent: 50.0,
        };
        assert_eq!(format_update(&update, false), "yaw         50.0%  (-174 ticks)");
    }

    #[test]
    fn test_format_update_json() -> Result<(), serde_json::Error> {
        let update = AxisUpdate {
            axis: AxisId::Pitch,
            raw_ticks: 12,
            percent: -3.5,
        };
        let value: serde_json::Value = serde_json::from_str(&format_update(&update, true))?;
        assert_eq!(value["axis"], "pitch");
        assert_eq!(value["raw_ticks"], 12);
        assert_eq!(value["percent"], -3.5);
        Ok(())
    }
}
