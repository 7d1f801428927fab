use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

/// Elapsed wall-clock time of a single adapter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sample {
    elapsed: Duration,
}

impl Sample {
    /// Wrap an already measured duration.
    pub const fn from_duration(elapsed: Duration) -> Self {
        Self { elapsed }
    }

    /// Elapsed nanoseconds.
    pub fn nanos(&self) -> u128 {
        self.elapsed.as_nanos()
    }

    /// Elapsed microseconds, truncated.
    pub fn micros(&self) -> u128 {
        self.nanos() / 1000
    }
}

/// Run `op` between two reads of the monotonic clock.
///
/// Only `op` is inside the window; callers prepare keys and format output outside it.
#[inline]
pub fn timed<T>(op: impl FnOnce() -> T) -> (T, Sample) {
    let start = Instant::now();
    let out = op();
    let elapsed = start.elapsed();
    (out, Sample::from_duration(elapsed))
}

/// Writes samples in the fixed line format.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
}

impl<W: Write> Reporter<W> {
    /// Report to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// `Time: <us>us`
    pub fn single(&mut self, sample: Sample) -> io::Result<()> {
        writeln!(self.out, "Time: {}us", sample.micros())
    }

    /// `Time: <us>us (<n> exceptions caught)`
    pub fn counted(&mut self, sample: Sample, exceptions: u64) -> io::Result<()> {
        writeln!(
            self.out,
            "Time: {}us ({} exceptions caught)",
            sample.micros(),
            exceptions
        )
    }

    /// `Time[<index>]: <us>us`
    pub fn indexed(&mut self, index: usize, sample: Sample) -> io::Result<()> {
        writeln!(self.out, "Time[{}]: {}us", index, sample.micros())
    }

    /// Blank line between transactions.
    pub fn separator(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    /// Stub output of the unimplemented `write` verb.
    pub fn not_implemented(&mut self) -> io::Result<()> {
        writeln!(self.out, "Not implemented!")
    }

    /// Flush buffered lines.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{timed, Reporter, Sample};

    #[test]
    fn micros_truncate() {
        assert_eq!(Sample::from_duration(Duration::from_nanos(999)).micros(), 0);
        assert_eq!(Sample::from_duration(Duration::from_nanos(1_999)).micros(), 1);
        assert_eq!(Sample::from_duration(Duration::from_micros(250)).micros(), 250);
    }

    #[test]
    fn timed_returns_result_of_op() {
        let (value, sample) = timed(|| 7);
        assert_eq!(value, 7);
        assert!(sample.nanos() < Duration::from_secs(60).as_nanos());
    }

    #[test]
    fn line_formats() {
        let mut out = Vec::new();
        let mut reporter = Reporter::new(&mut out);
        let sample = Sample::from_duration(Duration::from_nanos(12_345));
        reporter.single(sample).unwrap();
        reporter.counted(sample, 2).unwrap();
        reporter.indexed(0, sample).unwrap();
        reporter.separator().unwrap();
        reporter.not_implemented().unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Time: 12us\nTime: 12us (2 exceptions caught)\nTime[0]: 12us\n\nNot implemented!\n"
        );
    }
}
