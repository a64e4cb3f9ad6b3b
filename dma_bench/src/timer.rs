use std::fmt::Display;
use std::time::{Duration, Instant};

/// Time taken by one measured operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Elapsed(Duration);

impl Elapsed {
    /// Whole and fractional seconds collapsed into one float.
    pub fn seconds(&self) -> f64 {
        self.0.as_secs() as f64 + self.0.subsec_nanos() as f64 / 1e9
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for Elapsed {
    fn from(value: Duration) -> Self {
        Elapsed(value)
    }
}

/// `sec.nnnnnnnnn`
impl Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.0.as_secs(), self.0.subsec_nanos())
    }
}

/// Runs `op` between two monotonic timestamps.
pub fn measure<T>(op: impl FnOnce() -> T) -> (T, Elapsed) {
    let start = Instant::now();
    let out = op();
    let stop = Instant::now();
    (out, Elapsed(stop - start))
}
