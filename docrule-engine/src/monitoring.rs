use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

pub const VALIDATION: &str = "validation";
pub const COMPILATION: &str = "compilation";
pub const EXECUTION: &str = "execution";

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMarker {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: Duration,
}

impl PerformanceMarker {
    pub fn duration_millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

#[derive(Debug)]
struct RunningMarker {
    label: String,
    start: DateTime<Utc>,
    timer: Instant,
}

/// Collects one marker per phase while enabled; does nothing at all while disabled.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    enabled: bool,
    running: Vec<RunningMarker>,
    markers: Vec<PerformanceMarker>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stops recording. Markers collected so far are kept.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.running.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start(&mut self, label: &str) {
        if !self.enabled {
            return;
        }

        self.running.push(RunningMarker {
            label: label.to_string(),
            start: Utc::now(),
            timer: Instant::now(),
        });
    }

    pub fn stop(&mut self, label: &str) {
        if !self.enabled {
            return;
        }

        let position = match self.running.iter().rposition(|marker| marker.label == label) {
            Some(position) => position,
            None => {
                log::warn!("Performance marker {} stopped without being started", label);
                return;
            }
        };

        let running = self.running.remove(position);

        self.markers.push(PerformanceMarker {
            label: running.label,
            start: running.start,
            end: Utc::now(),
            duration: running.timer.elapsed(),
        });
    }

    pub fn markers(&self) -> &[PerformanceMarker] {
        &self.markers
    }

    pub fn reset(&mut self) {
        self.running.clear();
        self.markers.clear();
    }

    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!(
            "{:<4} {:<14} {:<30} {:<30} {:>14}\n",
            "#", "phase", "start", "end", "duration (ms)"
        ));
        report.push_str(&format!("{}\n", "-".repeat(96)));

        for (index, marker) in self.markers.iter().enumerate() {
            report.push_str(&format!(
                "{:<4} {:<14} {:<30} {:<30} {:>14.3}\n",
                index + 1,
                marker.label,
                marker.start.to_rfc3339(),
                marker.end.to_rfc3339(),
                marker.duration_millis()
            ));
        }

        let total: Duration = self.markers.iter().map(|marker| marker.duration).sum();
        report.push_str(&format!("{}\n", "-".repeat(96)));
        report.push_str(&format!(
            "{:<4} {:<14} {:<30} {:<30} {:>14.3}\n",
            "",
            "total",
            "",
            "",
            total.as_secs_f64() * 1000.0
        ));

        report
    }

    pub fn print(&self) {
        print!("{}", self.report());
    }
}
