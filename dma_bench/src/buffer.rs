use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use log::debug;

use crate::DmaError;

pub const PAGE_SIZE: usize = 4096;
pub const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

/// Page aligned host buffer with one page of slack, so the working view can
/// start anywhere inside the first page.
pub struct AlignedBuffer {
    base: NonNull<u8>,
    layout: Layout,
    offset: usize,
    len: usize,
}

impl AlignedBuffer {
    /// Allocates `size + PAGE_SIZE` bytes on a page boundary. The working view
    /// is `size` bytes starting at `base + (offset & PAGE_MASK)`.
    pub fn allocate(size: u64, offset: u64) -> Result<Self, DmaError> {
        let requested = size.saturating_add(PAGE_SIZE as u64);
        let oom = || DmaError::Allocation { requested };

        let len = usize::try_from(size).map_err(|_| oom())?;
        let total = len.checked_add(PAGE_SIZE).ok_or_else(oom)?;
        let layout = Layout::from_size_align(total, PAGE_SIZE).map_err(|_| oom())?;

        // Zeroed so the view is always initialized memory, even when an input
        // file only fills part of it.
        let base = NonNull::new(unsafe { alloc::alloc_zeroed(layout) }).ok_or_else(oom)?;
        let offset = (offset & PAGE_MASK) as usize;
        debug!(
            "host buffer 0x{:x} at {:p}, working view at +0x{:x}",
            total,
            base.as_ptr(),
            offset
        );

        Ok(AlignedBuffer {
            base,
            layout,
            offset,
            len,
        })
    }

    pub fn base_ptr(&self) -> *const u8 {
        self.base.as_ptr()
    }

    /// Start of the working view.
    pub fn as_ptr(&self) -> *const u8 {
        self.deref().as_ptr()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes actually allocated, slack page included.
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &Self::Target {
        // offset < PAGE_SIZE and the region is len + PAGE_SIZE bytes.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr().add(self.offset), self.len) }
    }
}

impl DerefMut for AlignedBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr().add(self.offset), self.len) }
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.deref()
    }
}

impl AsMut<[u8]> for AlignedBuffer {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.deref_mut()
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}

// The buffer exclusively owns its allocation.
unsafe impl Send for AlignedBuffer {}
