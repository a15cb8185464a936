//! Progress observer for episode synthesis.

/// Receives `(percent, message)` after each major step.
///
/// Purely observational; called from the synthesis thread only.
pub trait ProgressSink {
    fn report(&mut self, percent: u8, message: &str);
}

impl<F: FnMut(u8, &str)> ProgressSink for F {
    fn report(&mut self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Monotonic front end over an optional sink.
///
/// Percentages never decrease and stay below 100 until [`complete`] is
/// called, so a failed run never reports 100.
///
/// [`complete`]: ProgressReporter::complete
pub struct ProgressReporter<'a> {
    sink: Option<&'a mut dyn ProgressSink>,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: Option<&'a mut dyn ProgressSink>) -> Self {
        Self { sink, last: 0 }
    }

    pub fn silent() -> Self {
        Self::new(None)
    }

    pub fn report(&mut self, percent: u8, message: &str) {
        let percent = percent.min(99).max(self.last);
        self.last = percent;
        if let Some(sink) = self.sink.as_mut() {
            sink.report(percent, message);
        }
    }

    pub fn complete(&mut self, message: &str) {
        self.last = 100;
        if let Some(sink) = self.sink.as_mut() {
            sink.report(100, message);
        }
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_monotonic_below_completion() {
        let mut seen = Vec::new();
        let mut sink = |p: u8, m: &str| seen.push((p, m.to_string()));
        {
            let mut progress = ProgressReporter::new(Some(&mut sink));
            progress.report(40, "a");
            progress.report(10, "b");
            progress.report(100, "c");
            progress.complete("done");
        }
        let percents: Vec<u8> = seen.iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![40, 40, 99, 100]);
        assert_eq!(seen[1].1, "b");
    }

    #[test]
    fn no_sink_is_a_no_op() {
        let mut progress = ProgressReporter::silent();
        progress.report(50, "half");
        assert_eq!(progress.last(), 50);
    }
}
