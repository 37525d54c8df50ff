// Progress notifications: (stage name, percent complete).
// Purely observational; a sink can never fail the cycle.

use tracing::debug;

pub trait ProgressSink {
    fn report(&mut self, stage: &str, percent: u8);
}

/// Closures work as sinks: `|stage, pct| println!("{stage}: {pct}%")`
impl<F> ProgressSink for F
where
    F: FnMut(&str, u8),
{
    fn report(&mut self, stage: &str, percent: u8) {
        self(stage, percent)
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _stage: &str, _percent: u8) {}
}

/// Forwards events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&mut self, stage: &str, percent: u8) {
        debug!(stage, percent, "progress");
    }
}

/// Keeps every event in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedProgress {
    pub events: Vec<(String, u8)>,
}

impl RecordedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages that reached 0%
    pub fn started(&self) -> Vec<&str> {
        self.stages_at(0)
    }

    /// Stages that reached 100%
    pub fn completed(&self) -> Vec<&str> {
        self.stages_at(100)
    }

    fn stages_at(&self, percent: u8) -> Vec<&str> {
        self.events
            .iter()
            .filter(|(_, p)| *p == percent)
            .map(|(stage, _)| stage.as_str())
            .collect()
    }
}

impl ProgressSink for RecordedProgress {
    fn report(&mut self, stage: &str, percent: u8) {
        self.events.push((stage.to_string(), percent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |stage: &str, percent: u8| seen.push(format!("{}:{}", stage, percent));
            sink.report("enum_flags", 0);
            sink.report("enum_flags", 100);
        }
        assert_eq!(seen, vec!["enum_flags:0", "enum_flags:100"]);
    }

    #[test]
    fn test_recorded_progress_started_and_completed() {
        let mut sink = RecordedProgress::new();
        sink.report("a", 0);
        sink.report("a", 100);
        sink.report("b", 0);

        assert_eq!(sink.started(), vec!["a", "b"]);
        assert_eq!(sink.completed(), vec!["a"]);
    }
}
