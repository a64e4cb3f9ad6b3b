use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use log::{debug, warn};

use crate::buffer::AlignedBuffer;
use crate::config::ZERO_COUNT;
use crate::report::{Reporter, StdoutReporter};
use crate::timer::{measure, Elapsed};
use crate::transfer::{fill_from, transfer, write_from_buffer, Direction, Endpoint};
use crate::{DmaError, FileRole, Scenario, TransferConfig, TransferError};

/// Acquires the handles a run works on.
pub trait Opener {
    type Device: Endpoint;
    type File: Endpoint;

    fn open_device(&mut self, path: &Path, scenario: Scenario) -> io::Result<Self::Device>;
    fn open_input(&mut self, path: &Path) -> io::Result<Self::File>;
    fn open_output(&mut self, path: &Path) -> io::Result<Self::File>;
}

/// Opens real device nodes and files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOpener;

impl Opener for FsOpener {
    type Device = File;
    type File = File;

    fn open_device(&mut self, path: &Path, scenario: Scenario) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if scenario == Scenario::Read {
            options.custom_flags(libc::O_NONBLOCK);
        }
        options.open(path)
    }

    fn open_input(&mut self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn open_output(&mut self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(libc::O_SYNC)
            .mode(0o666)
            .open(path)
    }
}

/// Everything a run holds. Fields drop in declaration order, which is the
/// reverse of the order they are acquired in.
struct Session<O: Opener> {
    buffer: AlignedBuffer,
    output: Option<O::File>,
    input: Option<O::File>,
    device: O::Device,
}

impl<O: Opener> Session<O> {
    fn open(config: &TransferConfig, opener: &mut O) -> Result<Self, DmaError> {
        let device = opener
            .open_device(config.device(), config.scenario())
            .map_err(|source| DmaError::DeviceOpen {
                path: config.device().to_owned(),
                source,
            })?;
        debug!("opened device {}", config.device().display());

        let input = match config.infile() {
            Some(path) => {
                let file = opener
                    .open_input(path)
                    .map_err(|source| DmaError::FileOpen {
                        role: FileRole::Input,
                        path: path.to_owned(),
                        source,
                    })?;
                if config.scenario() == Scenario::Read {
                    let path = path.display();
                    warn!("input file {} is ignored in the Read scenario", path);
                }
                Some(file)
            }
            None => None,
        };

        let output = match config.outfile() {
            Some(path) => {
                let file = opener
                    .open_output(path)
                    .map_err(|source| DmaError::FileOpen {
                        role: FileRole::Output,
                        path: path.to_owned(),
                        source,
                    })?;
                if config.scenario() == Scenario::Write {
                    let path = path.display();
                    warn!("output file {} is ignored in the Write scenario", path);
                }
                Some(file)
            }
            None => None,
        };

        let buffer = AlignedBuffer::allocate(config.size(), config.offset())?;

        Ok(Session {
            buffer,
            output,
            input,
            device,
        })
    }
}

impl<O: Opener> Drop for Session<O> {
    fn drop(&mut self) {
        debug!("releasing host buffer and handles");
    }
}

/// Running total of per-iteration times.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunAccumulator {
    total: f64,
    iterations: u64,
}

impl RunAccumulator {
    pub fn record(&mut self, elapsed: Elapsed) {
        self.total += elapsed.seconds();
        self.iterations += 1;
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn average(&self) -> Option<f64> {
        (self.iterations > 0).then(|| self.total / self.iterations as f64)
    }

    /// `size / average`, in bytes per second.
    pub fn throughput(&self, size: u64) -> Option<f64> {
        self.average().map(|avg| size as f64 / avg)
    }

    pub fn finish(&self, size: u64) -> Option<RunSummary> {
        Some(RunSummary {
            iterations: self.iterations,
            total_time: self.total,
            average_time: self.average()?,
            throughput: self.throughput(size)?,
        })
    }
}

/// Outcome of a run that completed every iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub iterations: u64,
    /// Seconds.
    pub total_time: f64,
    /// Seconds.
    pub average_time: f64,
    /// Bytes per second.
    pub throughput: f64,
}

fn output_position(name: &str, index: u64, size: u64) -> Result<u64, TransferError> {
    index.checked_mul(size).ok_or_else(|| {
        TransferError::io(
            name,
            Direction::Write,
            u64::MAX,
            size as usize,
            io::Error::new(io::ErrorKind::InvalidInput, "record offset overflows u64"),
        )
    })
}

/// Runs `config.count()` timed transfers against the device at a fixed
/// address. Any failure aborts the run before the next iteration and no
/// throughput is reported.
pub fn run<O: Opener, R: Reporter>(
    config: &TransferConfig,
    opener: &mut O,
    reporter: &mut R,
) -> Result<RunSummary, DmaError> {
    config.validate()?;
    let mut session = Session::open(config, opener)?;

    let name = config.device().display().to_string();
    let output_name = config
        .outfile()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    if config.scenario() == Scenario::Write {
        if let (Some(input), Some(path)) = (session.input.as_mut(), config.infile()) {
            let input_name = path.display().to_string();
            let filled = fill_from(input, &input_name, &mut session.buffer)?;
            debug!("pre-filled 0x{:x} bytes from {}", filled, input_name);
        }
    }

    reporter.begin(config, session.buffer.as_ptr(), session.buffer.capacity());

    let address = config.address();
    let direction = config.scenario().direction();
    let mut accumulator = RunAccumulator::default();
    for i in 0..config.count() {
        let device = &mut session.device;
        let buffer = &mut session.buffer;
        let (moved, elapsed) = measure(|| transfer(device, &name, buffer, address, direction));
        moved?;
        accumulator.record(elapsed);
        reporter.iteration(config, i, elapsed);

        if direction == Direction::Read {
            if let Some(output) = session.output.as_mut() {
                let pos = output_position(&output_name, i, config.size())?;
                write_from_buffer(output, &output_name, &session.buffer, pos)?;
            }
        }
    }

    let summary = accumulator
        .finish(config.size())
        .ok_or(DmaError::InvalidConfig(ZERO_COUNT))?;
    reporter.summary(config, &summary);
    reporter.report(config.size(), summary.throughput);
    Ok(summary)
}

/// [`run`] against real files, printing to stdout.
pub fn run_device(config: &TransferConfig) -> Result<RunSummary, DmaError> {
    run(config, &mut FsOpener, &mut StdoutReporter)
}
