//! Stub device and handle tracking shared by the run tests.

#![allow(dead_code)]

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dma_bench::{Endpoint, FsOpener, Opener, Scenario};

/// What the scripted device saw.
#[derive(Debug, Default)]
pub struct DeviceLog {
    /// `(position, working view address & 0xfff)` per read.
    pub reads: Vec<(u64, usize)>,
    /// `(position, bytes)` per write.
    pub writes: Vec<(u64, Vec<u8>)>,
}

/// A device that fills every read with its 1-based call number and can be
/// told to come up short on one call.
pub struct ScriptedDevice {
    log: Arc<Mutex<DeviceLog>>,
    calls: usize,
    /// 0-based call that moves one byte less than asked.
    short_at: Option<usize>,
    latency: Duration,
}

impl ScriptedDevice {
    pub fn new(log: Arc<Mutex<DeviceLog>>) -> Self {
        ScriptedDevice {
            log,
            calls: 0,
            short_at: None,
            latency: Duration::from_micros(50),
        }
    }

    pub fn short_at(mut self, call: usize) -> Self {
        self.short_at = Some(call);
        self
    }

    fn step(&mut self, len: usize) -> usize {
        std::thread::sleep(self.latency);
        let call = self.calls;
        self.calls += 1;
        if self.short_at == Some(call) {
            len.saturating_sub(1)
        } else {
            len
        }
    }
}

impl Endpoint for ScriptedDevice {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        let view = buf.as_ptr() as usize & 0xfff;
        self.log.lock().unwrap().reads.push((pos, view));
        let n = self.step(buf.len());
        buf[..n].fill(self.calls as u8);
        Ok(n)
    }

    fn write_at(&mut self, buf: &[u8], pos: u64) -> io::Result<usize> {
        let n = self.step(buf.len());
        let data = buf[..n].to_vec();
        self.log.lock().unwrap().writes.push((pos, data));
        Ok(n)
    }
}

/// What happened to one tracked handle.
#[derive(Debug, Default)]
pub struct Usage {
    pub closes: AtomicUsize,
    pub reads: AtomicUsize,
}

/// Counts reads through the wrapped handle and how many times it is closed.
pub struct Tracked<E> {
    inner: E,
    usage: Arc<Usage>,
}

impl<E> Drop for Tracked<E> {
    fn drop(&mut self) {
        self.usage.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl<E: Endpoint> Endpoint for Tracked<E> {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        self.usage.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_at(buf, pos)
    }

    fn write_at(&mut self, buf: &[u8], pos: u64) -> io::Result<usize> {
        self.inner.write_at(buf, pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Device,
    Input,
    Output,
}

/// Hands out a scripted device and real files, all tracked, and can refuse
/// any one of the opens.
pub struct TestOpener {
    device: Option<ScriptedDevice>,
    fail_at: Option<Step>,
    pub opened: Vec<(Step, Arc<Usage>)>,
    pub device_scenario: Option<Scenario>,
}

impl TestOpener {
    pub fn new(device: ScriptedDevice) -> Self {
        TestOpener {
            device: Some(device),
            fail_at: None,
            opened: Vec::new(),
            device_scenario: None,
        }
    }

    pub fn fail_at(mut self, step: Step) -> Self {
        self.fail_at = Some(step);
        self
    }

    fn track<E>(&mut self, step: Step, inner: E) -> Tracked<E> {
        let usage = Arc::new(Usage::default());
        self.opened.push((step, usage.clone()));
        Tracked { inner, usage }
    }

    fn check(&self, step: Step) -> io::Result<()> {
        if self.fail_at == Some(step) {
            Err(io::Error::from_raw_os_error(libc::ENOENT))
        } else {
            Ok(())
        }
    }

    /// Every handle that was opened has been closed exactly once.
    pub fn assert_all_closed_once(&self) {
        for (step, usage) in &self.opened {
            let closes = usage.closes.load(Ordering::SeqCst);
            assert_eq!(closes, 1, "{:?} handle", step);
        }
    }

    /// Read calls made through the handle opened at `step`, 0 if never opened.
    pub fn reads_of(&self, step: Step) -> usize {
        self.opened
            .iter()
            .filter(|(s, _)| *s == step)
            .map(|(_, usage)| usage.reads.load(Ordering::SeqCst))
            .sum()
    }

    pub fn opened_steps(&self) -> Vec<Step> {
        self.opened.iter().map(|(s, _)| *s).collect()
    }
}

impl Opener for TestOpener {
    type Device = Tracked<ScriptedDevice>;
    type File = Tracked<File>;

    fn open_device(&mut self, _path: &Path, scenario: Scenario) -> io::Result<Self::Device> {
        self.check(Step::Device)?;
        self.device_scenario = Some(scenario);
        let device = self
            .device
            .take()
            .ok_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists))?;
        Ok(self.track(Step::Device, device))
    }

    fn open_input(&mut self, path: &Path) -> io::Result<Self::File> {
        self.check(Step::Input)?;
        let file = FsOpener.open_input(path)?;
        Ok(self.track(Step::Input, file))
    }

    fn open_output(&mut self, path: &Path) -> io::Result<Self::File> {
        self.check(Step::Output)?;
        let file = FsOpener.open_output(path)?;
        Ok(self.track(Step::Output, file))
    }
}
