//! Measurement trace loading
//!
//! A trace is either a JSON array of measurements or one JSON measurement
//! per line. Blank lines and lines starting with `#` are skipped in the
//! line-oriented form.

use anyhow::{Context, Result};
use spd_core::Measurement;
use std::path::Path;

pub fn load_trace(path: &Path) -> Result<Vec<Measurement>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    parse_trace(&content).with_context(|| format!("Invalid trace file {}", path.display()))
}

/// Parse a trace and order it by time; equal timestamps keep file order
pub fn parse_trace(content: &str) -> Result<Vec<Measurement>> {
    let mut measurements: Vec<Measurement> = if content.trim_start().starts_with('[') {
        serde_json::from_str(content).context("Failed to parse measurement array")?
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(index, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse measurement on line {}", index + 1))
            })
            .collect::<Result<_>>()?
    };
    measurements.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spd_core::MetricKind;

    #[test]
    fn test_parse_json_lines() {
        let trace = r#"
# warm-up
{"metric": "cpu_utilization", "value": 0.4, "entity": "vm-1", "time": 2.0}

{"metric": "response_time", "value": 80.0, "entity": "vm-1", "time": 1.0}
"#;
        let measurements = parse_trace(trace).unwrap();
        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].metric, MetricKind::ResponseTime);
        assert_eq!(measurements[1].time, 2.0);
    }

    #[test]
    fn test_parse_array_keeps_order_of_equal_times() {
        let trace = r#"[
            {"metric": "cpu_utilization", "value": 0.1, "time": 5.0},
            {"metric": "cpu_utilization", "value": 0.2, "time": 5.0},
            {"metric": "queue_length", "value": 3, "time": 1.0}
        ]"#;
        let measurements = parse_trace(trace).unwrap();
        let values: Vec<f64> = measurements.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![3.0, 0.1, 0.2]);
        assert_eq!(measurements[0].entity, "");
    }

    #[test]
    fn test_reports_bad_line() {
        let trace = "{\"metric\": \"cpu_utilization\", \"value\": 0.1, \"time\": 1.0}\nnot json\n";
        let error = parse_trace(trace).unwrap_err();
        assert!(format!("{error:#}").contains("line 2"));
    }
}
