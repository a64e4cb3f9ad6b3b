use std::fmt::Display;

use crate::run::RunSummary;
use crate::timer::Elapsed;
use crate::TransferConfig;

/// Final result of a run: transfer size and average bandwidth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputRecord {
    pub size: u64,
    /// Bytes per second.
    pub throughput: f64,
}

impl ThroughputRecord {
    /// Bandwidth scaled to the largest decimal unit it fills at least once.
    pub fn scaled(&self) -> (f64, &'static str) {
        const UNITS: [(f64, &str); 3] = [(1e9, "GB/sec"), (1e6, "MB/sec"), (1e3, "KB/sec")];
        UNITS
            .iter()
            .find(|(scale, _)| self.throughput >= *scale)
            .map(|&(scale, unit)| (self.throughput / scale, unit))
            .unwrap_or((self.throughput, "Bytes/sec"))
    }
}

impl Display for ThroughputRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (value, unit) = self.scaled();
        write!(f, "size={} Average BW = {:.6} {}", self.size, value, unit)
    }
}

/// Presentation side of a run. Only `report` is required; the other hooks
/// exist for the tool's progress lines.
pub trait Reporter {
    fn begin(&mut self, _config: &TransferConfig, _buffer: *const u8, _capacity: usize) {}

    fn iteration(&mut self, _config: &TransferConfig, _index: u64, _elapsed: Elapsed) {}

    fn summary(&mut self, _config: &TransferConfig, _summary: &RunSummary) {}

    fn report(&mut self, size: u64, throughput: f64);
}

/// Collects records instead of printing them.
impl Reporter for Vec<ThroughputRecord> {
    fn report(&mut self, size: u64, throughput: f64) {
        self.push(ThroughputRecord { size, throughput });
    }
}

/// The `dma_test` console output.
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn begin(&mut self, config: &TransferConfig, buffer: *const u8, capacity: usize) {
        if config.verbose() {
            println!(
                "dev {}, address 0x{:x}, size 0x{:x}, offset 0x{:x}, count {}",
                config.device().display(),
                config.address(),
                config.size(),
                config.offset(),
                config.count()
            );
            println!("host buffer 0x{:x} = {:p}", capacity, buffer);
        }
        println!("{} scenario", config.scenario());
    }

    fn iteration(&mut self, config: &TransferConfig, index: u64, elapsed: Elapsed) {
        if config.verbose() {
            let verb = match config.scenario() {
                crate::Scenario::Read => "read",
                crate::Scenario::Write => "write",
            };
            println!(
                "#{}: CLOCK_MONOTONIC {} sec. {} {} bytes",
                index,
                elapsed,
                verb,
                config.size()
            );
        }
    }

    fn summary(&mut self, config: &TransferConfig, summary: &RunSummary) {
        if config.verbose() {
            println!(
                "** Avg time device {}, total time {:.6} sec, avg_time = {:.6} sec, size = {} bytes, BW = {:.6} bytes/sec",
                config.device().display(),
                summary.total_time,
                summary.average_time,
                config.size(),
                summary.throughput
            );
        }
    }

    fn report(&mut self, size: u64, throughput: f64) {
        println!("{}", ThroughputRecord { size, throughput });
    }
}
