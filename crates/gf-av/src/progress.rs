//! Incremental parser for ffmpeg's `-progress pipe:2` output.
//!
//! ffmpeg prints the input `Duration:` in its stream summary, then emits
//! `key=value` blocks terminated by `progress=continue` or `progress=end`.
//! [`ProgressParser`] turns that stream into completion fractions.

/// Stateful line parser producing completion fractions.
///
/// Fractions are `out_time / duration` and are not clamped; ffmpeg can
/// overshoot the container duration slightly.
#[derive(Debug, Default)]
pub struct ProgressParser {
    duration_us: Option<i64>,
    last_out_time_us: Option<i64>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total input duration in microseconds, once seen.
    pub fn duration_us(&self) -> Option<i64> {
        self.duration_us
    }

    /// Feed one stderr line. Returns a fraction at the end of each progress
    /// block whose position can be computed, and `1.0` at `progress=end`.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Duration:") {
            // Only the first input's duration counts.
            if self.duration_us.is_none() {
                self.duration_us = rest
                    .split(',')
                    .next()
                    .and_then(|ts| parse_timestamp_us(ts.trim()));
            }
            return None;
        }

        if let Some(val) = line.strip_prefix("out_time_us=") {
            self.last_out_time_us = val.trim().parse::<i64>().ok();
            return None;
        }

        match line.strip_prefix("progress=") {
            Some("end") => Some(1.0),
            Some(_) => match (self.last_out_time_us, self.duration_us) {
                (Some(out_us), Some(dur)) if dur > 0 => Some(out_us as f64 / dur as f64),
                _ => None,
            },
            None => None,
        }
    }
}

/// Parse `HH:MM:SS.frac` into microseconds. `N/A` and malformed input yield
/// `None`.
fn parse_timestamp_us(ts: &str) -> Option<i64> {
    let mut parts = ts.splitn(3, ':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if seconds.is_sign_negative() {
        return None;
    }
    Some((hours * 3600 + minutes * 60) * 1_000_000 + (seconds * 1_000_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_parsing() {
        assert_eq!(parse_timestamp_us("00:00:02.00"), Some(2_000_000));
        assert_eq!(parse_timestamp_us("01:02:03.50"), Some(3_723_500_000));
        assert_eq!(parse_timestamp_us("N/A"), None);
        assert_eq!(parse_timestamp_us("12"), None);
    }

    #[test]
    fn emits_fractions_per_block() {
        let mut parser = ProgressParser::new();
        let lines = [
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'input-1a2b3c4d.mp4':",
            "  Duration: 00:00:04.00, start: 0.000000, bitrate: 123 kb/s",
            "frame=10",
            "out_time_us=1000000",
            "progress=continue",
            "out_time_us=3000000",
            "progress=continue",
            "out_time_us=4000000",
            "progress=end",
        ];
        let fractions: Vec<f64> = lines.iter().filter_map(|l| parser.feed(l)).collect();
        assert_eq!(fractions, vec![0.25, 0.75, 1.0]);
        assert_eq!(parser.duration_us(), Some(4_000_000));
    }

    #[test]
    fn unknown_duration_only_reports_end() {
        let mut parser = ProgressParser::new();
        assert_eq!(parser.feed("  Duration: N/A, bitrate: N/A"), None);
        assert_eq!(parser.feed("out_time_us=500000"), None);
        assert_eq!(parser.feed("progress=continue"), None);
        assert_eq!(parser.feed("progress=end"), Some(1.0));
    }

    #[test]
    fn out_time_not_available() {
        let mut parser = ProgressParser::new();
        parser.feed("Duration: 00:00:10.00, start: 0.0");
        assert_eq!(parser.feed("out_time_us=N/A"), None);
        assert_eq!(parser.feed("progress=continue"), None);
    }

    #[test]
    fn overshoot_is_passed_through() {
        let mut parser = ProgressParser::new();
        parser.feed("Duration: 00:00:01.00, start: 0.0");
        parser.feed("out_time_us=1100000");
        let f = parser.feed("progress=continue").unwrap();
        assert!(f > 1.0);
    }

    #[test]
    fn second_input_duration_ignored() {
        let mut parser = ProgressParser::new();
        parser.feed("Duration: 00:00:02.00, start: 0.0");
        parser.feed("Duration: 00:00:08.00, start: 0.0");
        assert_eq!(parser.duration_us(), Some(2_000_000));
    }
}
