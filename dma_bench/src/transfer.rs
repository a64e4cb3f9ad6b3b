use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

use log::warn;

use crate::TransferError;

/// Largest count a single read(2)/write(2) moves on Linux.
pub const RW_MAX_SIZE: usize = 0x7fff_f000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Something that can be read and written at explicit byte positions:
/// the device node, or the input/output data files.
pub trait Endpoint {
    /// Reads into `buf` starting at `pos`, returning the bytes moved.
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize>;

    /// Writes `buf` starting at `pos`, returning the bytes moved.
    fn write_at(&mut self, buf: &[u8], pos: u64) -> io::Result<usize>;
}

impl Endpoint for File {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        FileExt::read_at(&*self, buf, pos)
    }

    fn write_at(&mut self, buf: &[u8], pos: u64) -> io::Result<usize> {
        FileExt::write_at(&*self, buf, pos)
    }
}

impl<E: Endpoint + ?Sized> Endpoint for Box<E> {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        (**self).read_at(buf, pos)
    }

    fn write_at(&mut self, buf: &[u8], pos: u64) -> io::Result<usize> {
        (**self).write_at(buf, pos)
    }
}

fn chunk_position(
    name: &str,
    direction: Direction,
    pos: u64,
    done: usize,
    len: usize,
) -> Result<u64, TransferError> {
    pos.checked_add(done as u64).ok_or_else(|| {
        TransferError::io(
            name,
            direction,
            pos,
            len,
            io::Error::new(io::ErrorKind::InvalidInput, "position overflows u64"),
        )
    })
}

/// Fills all of `buf` from `target` at `pos`. Anything less than the full
/// count is an error; nothing is retried.
pub fn read_to_buffer<E: Endpoint + ?Sized>(
    target: &mut E,
    name: &str,
    buf: &mut [u8],
    pos: u64,
) -> Result<usize, TransferError> {
    let mut done = 0;
    for chunk in buf.chunks_mut(RW_MAX_SIZE) {
        let len = chunk.len();
        let at = chunk_position(name, Direction::Read, pos, done, len)?;
        let n = target
            .read_at(chunk, at)
            .map_err(|e| TransferError::io(name, Direction::Read, at, len, e))?;
        if n != len {
            return Err(TransferError::short(name, Direction::Read, at, len, n));
        }
        done += n;
    }
    Ok(done)
}

/// Writes all of `buf` to `target` at `pos`, same rules as [`read_to_buffer`].
pub fn write_from_buffer<E: Endpoint + ?Sized>(
    target: &mut E,
    name: &str,
    buf: &[u8],
    pos: u64,
) -> Result<usize, TransferError> {
    let mut done = 0;
    for chunk in buf.chunks(RW_MAX_SIZE) {
        let len = chunk.len();
        let at = chunk_position(name, Direction::Write, pos, done, len)?;
        let n = target
            .write_at(chunk, at)
            .map_err(|e| TransferError::io(name, Direction::Write, at, len, e))?;
        if n != len {
            return Err(TransferError::short(name, Direction::Write, at, len, n));
        }
        done += n;
    }
    Ok(done)
}

/// One positioned transfer in either direction.
pub fn transfer<E: Endpoint + ?Sized>(
    target: &mut E,
    name: &str,
    buf: &mut [u8],
    pos: u64,
    direction: Direction,
) -> Result<usize, TransferError> {
    match direction {
        Direction::Read => read_to_buffer(target, name, buf, pos),
        Direction::Write => write_from_buffer(target, name, buf, pos),
    }
}

/// Loads a data file from offset 0 into `buf`, stopping early at end of file.
/// Returns how much of `buf` now holds file contents.
pub fn fill_from<E: Endpoint + ?Sized>(
    source: &mut E,
    name: &str,
    buf: &mut [u8],
) -> Result<usize, TransferError> {
    let mut filled = 0;
    while filled < buf.len() {
        let end = buf.len().min(filled + RW_MAX_SIZE);
        match source.read_at(&mut buf[filled..end], filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(TransferError::io(
                    name,
                    Direction::Read,
                    filled as u64,
                    end - filled,
                    e,
                ))
            }
        }
    }
    if filled < buf.len() {
        warn!("{}, read underflow 0x{:x}/0x{:x}", name, filled, buf.len());
    }
    Ok(filled)
}
