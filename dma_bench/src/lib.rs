pub mod buffer;
pub mod config;
pub mod report;
pub mod run;
pub mod timer;
pub mod transfer;

use std::fmt::Display;
use std::io;
use std::path::PathBuf;

pub use buffer::AlignedBuffer;
pub use config::{Scenario, TransferConfig};
pub use report::{Reporter, StdoutReporter, ThroughputRecord};
pub use run::{run, run_device, FsOpener, Opener, RunAccumulator, RunSummary};
pub use timer::{measure, Elapsed};
pub use transfer::{Direction, Endpoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Input,
    Output,
}

impl Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileRole::Input => write!(f, "input"),
            FileRole::Output => write!(f, "output"),
        }
    }
}

#[derive(Debug)]
pub enum DmaError {
    DeviceOpen {
        path: PathBuf,
        source: io::Error,
    },
    FileOpen {
        role: FileRole,
        path: PathBuf,
        source: io::Error,
    },
    Allocation { requested: u64 },
    Transfer(TransferError),
    InvalidConfig(&'static str),
}

impl DmaError {
    /// Negative errno reported as the process result. Every failed or short
    /// transfer is `-EIO`; the OS error stays available through `source()`.
    pub fn errno(&self) -> i32 {
        match self {
            DmaError::DeviceOpen { .. } | DmaError::FileOpen { .. } => -libc::EINVAL,
            DmaError::Allocation { .. } => -libc::ENOMEM,
            DmaError::Transfer(_) => -libc::EIO,
            DmaError::InvalidConfig(_) => -libc::EINVAL,
        }
    }
}

impl Display for DmaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DmaError::DeviceOpen { path, source } => {
                write!(f, "unable to open device {}: {}", path.display(), source)
            }
            DmaError::FileOpen { role, path, source } => {
                let path = path.display();
                write!(f, "unable to open {} file {}: {}", role, path, source)
            }
            DmaError::Allocation { requested } => write!(f, "OOM {}", requested),
            DmaError::Transfer(e) => e.fmt(f),
            DmaError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for DmaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DmaError::DeviceOpen { source, .. } | DmaError::FileOpen { source, .. } => Some(source),
            DmaError::Transfer(e) => e.source(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum TransferFailure {
    /// The call succeeded but moved fewer bytes than requested.
    Short(usize),
    Io(io::Error),
}

/// A positioned read or write that did not move the full request.
#[derive(Debug)]
pub struct TransferError {
    pub target: String,
    pub direction: Direction,
    pub position: u64,
    pub requested: usize,
    pub failure: TransferFailure,
}

impl TransferError {
    pub fn short(
        target: &str,
        direction: Direction,
        position: u64,
        requested: usize,
        moved: usize,
    ) -> Self {
        TransferError {
            target: target.to_owned(),
            direction,
            position,
            requested,
            failure: TransferFailure::Short(moved),
        }
    }

    pub fn io(
        target: &str,
        direction: Direction,
        position: u64,
        requested: usize,
        source: io::Error,
    ) -> Self {
        TransferError {
            target: target.to_owned(),
            direction,
            position,
            requested,
            failure: TransferFailure::Io(source),
        }
    }
}

impl Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.direction {
            Direction::Read => 'R',
            Direction::Write => 'W',
        };
        match &self.failure {
            TransferFailure::Short(moved) => write!(
                f,
                "{}, {} off 0x{:x}, 0x{:x} != 0x{:x}",
                self.target, tag, self.position, moved, self.requested
            ),
            TransferFailure::Io(e) => write!(
                f,
                "{}, {} off 0x{:x}, 0x{:x} bytes failed: {}",
                self.target, tag, self.position, self.requested, e
            ),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.failure {
            TransferFailure::Io(e) => Some(e),
            TransferFailure::Short(_) => None,
        }
    }
}

impl From<TransferError> for DmaError {
    fn from(value: TransferError) -> Self {
        DmaError::Transfer(value)
    }
}
