//! Progress extraction from encoder output.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::VecDeque;

/// Matches the elapsed time field of ffmpeg output, e.g. `time=00:01:02.34`
/// in stats lines and `out_time=00:01:02.340000` in `-progress` lines.
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2})\.(\d{2})").expect("time regex is valid")
});

/// Extracts the elapsed encode time in seconds from one output line.
pub fn parse_elapsed_secs(line: &str) -> Option<f64> {
    let caps = TIME_REGEX.captures(line)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    let hundredths: f64 = caps.get(4)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds + hundredths / 100.0)
}

/// Turns elapsed-time observations into a monotonic percentage.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    duration_secs: f64,
    elapsed_secs: f64,
    percent: f32,
}

impl ProgressTracker {
    /// Creates a tracker for a source of the given duration.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            elapsed_secs: 0.0,
            percent: 0.0,
        }
    }

    /// Feeds one line of output.
    ///
    /// Returns the new percentage only if it grew.
    pub fn observe(&mut self, line: &str) -> Option<f32> {
        let elapsed = parse_elapsed_secs(line)?;
        if elapsed <= self.elapsed_secs {
            return None;
        }
        self.elapsed_secs = elapsed;

        let percent = if self.duration_secs > 0.0 {
            ((elapsed / self.duration_secs) * 100.0).clamp(0.0, 100.0) as f32
        } else {
            0.0
        };

        if percent > self.percent {
            self.percent = percent;
            Some(percent)
        } else {
            None
        }
    }

    /// Marks the encode as complete.
    pub fn complete(&mut self) -> f32 {
        self.percent = 100.0;
        self.percent
    }

    /// Current percentage.
    pub fn percent(&self) -> f32 {
        self.percent
    }

    /// Furthest elapsed time seen, in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// Source duration, in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

/// Keeps the last lines of encoder output for diagnostics.
#[derive(Debug, Clone)]
pub struct OutputTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputTail {
    /// Creates a tail keeping at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Records a line, evicting the oldest one when full.
    pub fn push(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// Joins the kept lines with newlines.
    pub fn render(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stats_line() {
        let line = "frame=  240 fps= 48 q=28.0 size=    1024kB time=00:01:02.34 bitrate= 134.5kbits/s speed=1.9x";
        let secs = parse_elapsed_secs(line).unwrap();
        assert!((secs - 62.34).abs() < 0.001);
    }

    #[test]
    fn test_parse_progress_line() {
        let secs = parse_elapsed_secs("out_time=01:00:00.500000").unwrap();
        assert!((secs - 3600.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_ignores_other_lines() {
        assert!(parse_elapsed_secs("Stream #0:0: Video: h264").is_none());
        assert!(parse_elapsed_secs("out_time=N/A").is_none());
        assert!(parse_elapsed_secs("out_time_ms=1234567").is_none());
        assert!(parse_elapsed_secs("Duration: 00:10:00.00, start: 0.000000").is_none());
    }

    #[test]
    fn test_tracker_percentage() {
        let mut tracker = ProgressTracker::new(100.0);
        assert_eq!(tracker.observe("out_time=00:00:25.00"), Some(25.0));
        assert_eq!(tracker.observe("out_time=00:00:50.00"), Some(50.0));
        assert_eq!(tracker.percent(), 50.0);
        assert!((tracker.elapsed_secs() - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_tracker_is_monotonic() {
        let mut tracker = ProgressTracker::new(100.0);
        assert_eq!(tracker.observe("time=00:00:40.00"), Some(40.0));
        assert_eq!(tracker.observe("time=00:00:30.00"), None);
        assert_eq!(tracker.observe("time=00:00:40.00"), None);
        assert_eq!(tracker.percent(), 40.0);
    }

    #[test]
    fn test_tracker_clamps_to_100() {
        let mut tracker = ProgressTracker::new(10.0);
        assert_eq!(tracker.observe("time=00:00:12.00"), Some(100.0));
        assert_eq!(tracker.observe("time=00:00:15.00"), None);
        assert_eq!(tracker.percent(), 100.0);
    }

    #[test]
    fn test_tracker_complete() {
        let mut tracker = ProgressTracker::new(60.0);
        tracker.observe("time=00:00:30.00");
        assert_eq!(tracker.complete(), 100.0);
    }

    #[test]
    fn test_output_tail_keeps_last_lines() {
        let mut tail = OutputTail::new(2);
        tail.push("one");
        tail.push("two");
        tail.push("three");
        assert_eq!(tail.render(), "two\nthree");
    }

    #[test]
    fn test_output_tail_zero_capacity() {
        let mut tail = OutputTail::new(0);
        tail.push("ignored");
        assert_eq!(tail.render(), "");
    }
}
