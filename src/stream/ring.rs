use num_traits::ToPrimitive;

use crate::working_area::WorkingArea;

/// Layout of a ring buffer in target memory.
///
/// ```text
/// offset 0..3  : write pointer (absolute target address, target-endian u32)
/// offset 4..7  : read pointer  (absolute target address, target-endian u32)
/// offset 8..N-1: circular data area
/// ```
///
/// Both pointers always point into the data area. The algorithm's pointer
/// must also sit at a multiple of `block_size` from its start. One block of
/// space is always left unused, so that `wp == rp` unambiguously means
/// "empty". A zero in a pointer word signals that its owner has aborted the
/// transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingBuffer {
    buffer_start: u32,
    buffer_size: u32,
    block_size: u32,
}

impl RingBuffer {
    /// Describe a ring buffer of `buffer_size` bytes (pointer words included)
    /// starting at `buffer_start`.
    ///
    /// `block_size` must be a power of two, and the data area must hold at
    /// least two blocks: with one block of slack reserved, a single block
    /// would never have room for any data.
    pub fn new(buffer_start: u32, buffer_size: u32, block_size: u32) -> Result<Self, &'static str> {
        if !block_size.is_power_of_two() {
            return Err("block size must be a power of two");
        }
        if buffer_size <= 8 {
            return Err("buffer too small for the pointer words");
        }
        if (buffer_size - 8) / 2 < block_size {
            return Err("fifo can't hold two blocks");
        }
        if buffer_start % 4 != 0 {
            return Err("misaligned buffer");
        }
        if buffer_start == 0 || buffer_start.checked_add(buffer_size).is_none() {
            return Err("buffer exceeds the 32-bit address space");
        }

        Ok(RingBuffer {
            buffer_start,
            buffer_size,
            block_size,
        })
    }

    /// Describe a ring buffer spanning an entire working area.
    pub fn from_area<U>(area: &WorkingArea<U>, block_size: u32) -> Result<Self, &'static str>
    where
        U: Copy + ToPrimitive,
    {
        let start = area
            .address()
            .to_u32()
            .ok_or("buffer exceeds the 32-bit address space")?;
        RingBuffer::new(start, area.size(), block_size)
    }

    /// Size of a block, in bytes.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Size of the buffer (pointer words included), in bytes.
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Address of the write pointer word.
    pub fn wp_addr(&self) -> u32 {
        self.buffer_start
    }

    /// Address of the read pointer word.
    pub fn rp_addr(&self) -> u32 {
        self.buffer_start + 4
    }

    /// First address of the data area.
    pub fn fifo_start(&self) -> u32 {
        self.buffer_start + 8
    }

    /// One past the last address of the data area.
    pub fn fifo_end(&self) -> u32 {
        self.buffer_start + self.buffer_size
    }

    /// Returns `true` if `ptr` is a pointer the partner could legitimately
    /// have published.
    pub(crate) fn is_valid_ptr(&self, ptr: u32) -> bool {
        ptr >= self.fifo_start()
            && ptr < self.fifo_end()
            && (ptr - self.fifo_start()) % self.block_size == 0
    }

    /// Bytes the producer may write at `wp` without wrapping, keeping one
    /// block of slack.
    pub(crate) fn write_space(&self, wp: u32, rp: u32) -> u32 {
        if rp > wp {
            (rp - wp).saturating_sub(self.block_size)
        } else if rp > self.fifo_start() {
            self.fifo_end() - wp
        } else {
            (self.fifo_end() - wp).saturating_sub(self.block_size)
        }
    }

    /// Bytes the consumer may read at `rp` without wrapping.
    pub(crate) fn read_space(&self, wp: u32, rp: u32) -> u32 {
        if wp >= rp {
            wp - rp
        } else {
            self.fifo_end() - rp
        }
    }

    /// Advance `ptr` by `len` bytes. Returns the new pointer, and whether it
    /// wrapped back to the start of the data area.
    pub(crate) fn advance(&self, ptr: u32, len: u32) -> (u32, bool) {
        let ptr = ptr + len;
        if ptr >= self.fifo_end() {
            (self.fifo_start(), true)
        } else {
            (ptr, false)
        }
    }
}

/// Shorten large chunks so they end on a word boundary relative to `rp`.
///
/// Applied to every chunk on both paths, and kept exactly as the on-target
/// loaders expect it.
pub(crate) fn trim_chunk(rp: u32, len: u32) -> u32 {
    if len >= 16 {
        len - (rp.wrapping_add(len) & 3)
    } else {
        len
    }
}
