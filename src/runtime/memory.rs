//! Linear memory
//!
//! Every access is bounds-checked against the current byte length before the
//! backing buffer is touched, so a failing load or store never leaves memory
//! partially modified.
//!
//! - Page size: 64KiB
//! - Addresses: 32-bit base plus 32-bit static offset, computed in 64 bits
//! - Growth: fails softly (`-1`) past the declared maximum or the page ceiling

use super::RuntimeError;

/// Page size in bytes.
pub const PAGE_SIZE: usize = 65536;

/// Hard ceiling on pages (4GiB of address space).
pub const MAX_PAGES: u32 = 65536;

#[derive(Debug, Clone)]
pub struct Memory {
    data: Vec<u8>,
    max_pages: Option<u32>,
}

impl Memory {
    /// Allocate `initial_pages` zeroed pages.
    ///
    /// # Errors
    /// - initial size above the declared maximum
    /// - initial or maximum size above [`MAX_PAGES`]
    pub fn new(initial_pages: u32, max_pages: Option<u32>) -> Result<Self, RuntimeError> {
        if initial_pages > MAX_PAGES {
            return Err(RuntimeError::MemoryError(format!(
                "initial size {initial_pages} pages exceeds {MAX_PAGES} pages"
            )));
        }
        if let Some(max) = max_pages {
            if initial_pages > max {
                return Err(RuntimeError::MemoryError(format!(
                    "initial size {initial_pages} pages exceeds declared maximum {max}"
                )));
            }
            if max > MAX_PAGES {
                return Err(RuntimeError::MemoryError(format!(
                    "maximum size {max} pages exceeds {MAX_PAGES} pages"
                )));
            }
        }

        Ok(Memory {
            data: vec![0u8; initial_pages as usize * PAGE_SIZE],
            max_pages,
        })
    }

    /// Current size in pages.
    pub fn size(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Grow by `delta` pages, returning the previous size in pages or `-1`.
    ///
    /// `ceiling` is the engine-wide page limit; the declared maximum, if any,
    /// applies on top of it.
    pub fn grow(&mut self, delta: u32, ceiling: u32) -> i32 {
        let previous = self.size();
        let Some(new_pages) = previous.checked_add(delta) else {
            return -1;
        };
        let limit = self.max_pages.unwrap_or(MAX_PAGES).min(ceiling).min(MAX_PAGES);
        if new_pages > limit {
            return -1;
        }

        let new_len = new_pages as usize * PAGE_SIZE;
        if self.data.try_reserve(new_len - self.data.len()).is_err() {
            return -1;
        }
        self.data.resize(new_len, 0);
        previous as i32
    }

    /// Validate `[addr, addr + width)` and return the start as an index.
    #[inline]
    fn check_bounds(&self, addr: u64, width: usize) -> Result<usize, RuntimeError> {
        let size = self.data.len();
        match addr.checked_add(width as u64) {
            Some(end) if end <= size as u64 => Ok(addr as usize),
            _ => Err(RuntimeError::MemoryOutOfBounds { addr, width, size }),
        }
    }

    /// Read exactly `N` bytes at `addr`.
    pub fn load<const N: usize>(&self, addr: u64) -> Result<[u8; N], RuntimeError> {
        let start = self.check_bounds(addr, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[start..start + N]);
        Ok(out)
    }

    /// Write `bytes` at `addr`; nothing is written when any byte would fall
    /// outside memory.
    pub fn store(&mut self, addr: u64, bytes: &[u8]) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>, RuntimeError> {
        let start = self.check_bounds(addr, len)?;
        Ok(self.data[start..start + len].to_vec())
    }

    pub fn read_u32(&self, addr: u64) -> Result<u32, RuntimeError> {
        Ok(u32::from_le_bytes(self.load::<4>(addr)?))
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> Result<(), RuntimeError> {
        self.store(addr, &value.to_le_bytes())
    }
}
