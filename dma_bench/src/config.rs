use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::buffer::PAGE_MASK;
use crate::transfer::Direction;
use crate::DmaError;

pub const DEFAULT_DEVICE: &str = "/dev/qdma01000-MM-0";
pub const DEFAULT_SIZE: u64 = 32;
pub const DEFAULT_COUNT: u64 = 1;

pub(crate) const ZERO_SIZE: &str = "transfer size must be at least one byte";
pub(crate) const ZERO_COUNT: &str = "transfer count must be at least one";

/// Direction of the device transfers in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// Device to host, optionally host to output file.
    Read,
    /// Host to device, host buffer pre-filled once from the input file.
    #[default]
    Write,
}

impl Scenario {
    /// Which way the device transfer in each iteration moves data.
    pub fn direction(self) -> Direction {
        match self {
            Scenario::Read => Direction::Read,
            Scenario::Write => Direction::Write,
        }
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scenario::Read => write!(f, "Read"),
            Scenario::Write => write!(f, "Write"),
        }
    }
}

/// Parameters of a single run. Built once, then only read.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    device: PathBuf,
    address: u64,
    size: u64,
    offset: u64,
    count: u64,
    scenario: Scenario,
    infile: Option<PathBuf>,
    outfile: Option<PathBuf>,
    verbose: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig::new(DEFAULT_DEVICE)
    }
}

impl TransferConfig {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        TransferConfig {
            device: device.into(),
            address: 0,
            size: DEFAULT_SIZE,
            offset: 0,
            count: DEFAULT_COUNT,
            scenario: Scenario::default(),
            infile: None,
            outfile: None,
            verbose: false,
        }
    }

    pub fn with_address(mut self, address: u64) -> Self {
        self.address = address;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Only the low 12 bits are kept.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset & PAGE_MASK;
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_infile(mut self, path: impl Into<PathBuf>) -> Self {
        self.infile = Some(path.into());
        self
    }

    pub fn with_outfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.outfile = Some(path.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn infile(&self) -> Option<&Path> {
        self.infile.as_deref()
    }

    pub fn outfile(&self) -> Option<&Path> {
        self.outfile.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn validate(&self) -> Result<(), DmaError> {
        if self.size == 0 {
            return Err(DmaError::InvalidConfig(ZERO_SIZE));
        }
        if self.count == 0 {
            return Err(DmaError::InvalidConfig(ZERO_COUNT));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tool_defaults() {
        let c = TransferConfig::default();
        assert_eq!(c.device(), Path::new(DEFAULT_DEVICE));
        assert_eq!(c.size(), 32);
        assert_eq!(c.count(), 1);
        assert_eq!(c.address(), 0);
        assert_eq!(c.scenario(), Scenario::Write);
        assert!(c.infile().is_none() && c.outfile().is_none());
        assert!(!c.verbose());
    }

    #[test]
    fn scenario_picks_device_direction() {
        assert_eq!(Scenario::Read.direction(), Direction::Read);
        assert_eq!(Scenario::Write.direction(), Direction::Write);
    }

    #[test]
    fn offset_keeps_low_twelve_bits() {
        let config = TransferConfig::default();
        assert_eq!(config.clone().with_offset(4096 + 10).offset(), 10);
        assert_eq!(config.with_offset(0xffff).offset(), 0xfff);
    }

    #[test]
    fn zero_size_or_count_is_rejected() {
        let config = TransferConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.clone().with_size(0).validate().is_err());
        assert!(config.with_count(0).validate().is_err());
    }
}
