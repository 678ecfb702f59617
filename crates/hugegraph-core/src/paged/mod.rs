//! Paged primitive arrays
//!
//! Large arrays are split into fixed-size pages so that no single allocation
//! has to cover the whole index space. A global index is split into
//! `(page_index, index_in_page)` with a shift and a mask, which is why page
//! sizes are always powers of two.
//!
//! # Layout
//!
//! ```text
//! global index:  | page index (high bits) | index in page (page_shift bits) |
//! page_index    = index >> page_shift
//! index_in_page = index &  page_mask
//! ```
//!
//! [`PageStore`] is the concurrent, write-once build form; [`PagedArray`] is
//! the frozen read-only form owned by a published graph.

mod store;

pub use store::{PageStore, PageValue, PagedArray};

use crate::{Error, Result};

/// Target byte budget of a single page (32KB)
pub const PAGE_SIZE_IN_BYTES: usize = 1 << 15;

/// Size of a single byte element
pub const BYTES_BYTE: usize = 1;
/// Size of an `i32` / `u32` element
pub const BYTES_INT: usize = 4;
/// Size of an `i64` / `u64` element
pub const BYTES_LONG: usize = 8;
/// Size of an `f64` element
pub const BYTES_DOUBLE: usize = 8;
/// Size of a pointer-sized element
pub const BYTES_OBJECT_REF: usize = 8;

/// Largest page table a store may allocate.
pub const MAX_PAGE_COUNT: u64 = i32::MAX as u64;

/// Largest power-of-two element count that fits into [`PAGE_SIZE_IN_BYTES`].
///
/// Elements bigger than the page budget get single-element pages.
pub fn page_size_for(element_size_bytes: usize) -> usize {
    let max_elements = PAGE_SIZE_IN_BYTES / element_size_bytes.max(1);
    if max_elements == 0 {
        return 1;
    }
    1 << (usize::BITS - 1 - max_elements.leading_zeros())
}

/// Number of pages needed to hold `capacity` elements
pub fn num_pages_for(capacity: u64, page_size: usize) -> u64 {
    capacity.div_ceil(page_size as u64)
}

/// Shift/mask addressing for one page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    page_size: usize,
    page_shift: u32,
    page_mask: u64,
}

impl PageLayout {
    /// Layout for an explicit page size, which must be a power of two
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 || !page_size.is_power_of_two() {
            return Err(Error::capacity(format!(
                "page size must be a power of two, got {}",
                page_size
            )));
        }
        Ok(Self {
            page_size,
            page_shift: page_size.trailing_zeros(),
            page_mask: page_size as u64 - 1,
        })
    }

    /// Layout for pages of elements of `element_size_bytes`
    pub fn for_element_size(element_size_bytes: usize) -> Self {
        let page_size = page_size_for(element_size_bytes);
        Self {
            page_size,
            page_shift: page_size.trailing_zeros(),
            page_mask: page_size as u64 - 1,
        }
    }

    /// Elements per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Bits used for the in-page offset
    pub fn page_shift(&self) -> u32 {
        self.page_shift
    }

    /// Page holding `index`
    #[inline]
    pub fn page_index(&self, index: u64) -> usize {
        (index >> self.page_shift) as usize
    }

    /// Offset of `index` inside its page
    #[inline]
    pub fn index_in_page(&self, index: u64) -> usize {
        (index & self.page_mask) as usize
    }

    /// Pages needed for `capacity` elements
    pub fn num_pages(&self, capacity: u64) -> u64 {
        num_pages_for(capacity, self.page_size)
    }

    /// Length of page `page_index` in a store of `capacity` elements; the
    /// last page is trimmed to the remaining elements.
    pub fn page_len(&self, page_index: usize, capacity: u64) -> usize {
        let start = (page_index as u64) << self.page_shift;
        capacity
            .saturating_sub(start)
            .min(self.page_size as u64) as usize
    }
}
