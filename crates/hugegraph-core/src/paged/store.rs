//! Page stores: the concurrent build form and the frozen read form

use super::{MAX_PAGE_COUNT, PageLayout};
use crate::{Error, Result};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU32, AtomicU64, Ordering};

/// Primitive values that can live in a [`PageStore`].
///
/// Every value kind has an atomic cell so that disjoint indices can be
/// written from many threads through a shared reference.
pub trait PageValue: Copy + Default + Send + Sync + 'static {
    /// Atomic cell holding one value
    type Cell: Send + Sync;

    /// Element size used to derive the page size
    const SIZE_BYTES: usize;

    /// Create a cell holding `value`
    fn new_cell(value: Self) -> Self::Cell;

    /// Read a cell
    fn load(cell: &Self::Cell) -> Self;

    /// Write a cell
    fn store(cell: &Self::Cell, value: Self);
}

macro_rules! atomic_page_value {
    ($ty:ty, $cell:ty) => {
        impl PageValue for $ty {
            type Cell = $cell;

            const SIZE_BYTES: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn new_cell(value: Self) -> Self::Cell {
                <$cell>::new(value)
            }

            #[inline]
            fn load(cell: &Self::Cell) -> Self {
                cell.load(Ordering::Acquire)
            }

            #[inline]
            fn store(cell: &Self::Cell, value: Self) {
                cell.store(value, Ordering::Release)
            }
        }
    };
}

atomic_page_value!(u8, AtomicU8);
atomic_page_value!(u32, AtomicU32);
atomic_page_value!(u64, AtomicU64);
atomic_page_value!(i64, AtomicI64);

impl PageValue for f64 {
    type Cell = AtomicU64;

    const SIZE_BYTES: usize = std::mem::size_of::<f64>();

    #[inline]
    fn new_cell(value: Self) -> Self::Cell {
        AtomicU64::new(value.to_bits())
    }

    #[inline]
    fn load(cell: &Self::Cell) -> Self {
        f64::from_bits(cell.load(Ordering::Acquire))
    }

    #[inline]
    fn store(cell: &Self::Cell, value: Self) {
        cell.store(value.to_bits(), Ordering::Release)
    }
}

/// Write-once paged store used while a graph is being built.
///
/// Pages are allocated on first write. Writers to distinct indices never
/// coordinate; the only shared step is the create-if-absent of a page, which
/// `OnceLock` makes atomic. Reading an index on an unallocated page returns
/// the element default.
pub struct PageStore<T: PageValue> {
    pages: Box<[OnceLock<Box<[T::Cell]>>]>,
    layout: PageLayout,
    capacity: u64,
}

impl<T: PageValue> PageStore<T> {
    /// Create a store for `capacity` elements with the default page size for `T`
    pub fn new(capacity: u64) -> Result<Self> {
        Self::with_layout(capacity, PageLayout::for_element_size(T::SIZE_BYTES))
    }

    /// Create a store with an explicit power-of-two page size
    pub fn with_page_size(capacity: u64, page_size: usize) -> Result<Self> {
        Self::with_layout(capacity, PageLayout::new(page_size)?)
    }

    fn with_layout(capacity: u64, layout: PageLayout) -> Result<Self> {
        let num_pages = layout.num_pages(capacity);
        if num_pages > MAX_PAGE_COUNT {
            return Err(Error::capacity(format!(
                "{} elements need {} pages of {} elements, at most {} pages are addressable",
                capacity,
                num_pages,
                layout.page_size(),
                MAX_PAGE_COUNT
            )));
        }

        let pages = (0..num_pages).map(|_| OnceLock::new()).collect();
        Ok(Self {
            pages,
            layout,
            capacity,
        })
    }

    /// Number of addressable elements
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Elements per page
    pub fn page_size(&self) -> usize {
        self.layout.page_size()
    }

    /// Addressing scheme of this store
    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    /// Page that holds `index`
    pub fn page_of(&self, index: u64) -> usize {
        self.layout.page_index(index)
    }

    /// Offset of `index` inside its page
    pub fn offset_of(&self, index: u64) -> usize {
        self.layout.index_in_page(index)
    }

    /// Number of pages in the page table
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of pages that have been materialised
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.get().is_some()).count()
    }

    /// Read the value at `index`
    #[inline]
    pub fn get(&self, index: u64) -> Result<T> {
        self.check(index)?;
        let value = match self.pages[self.layout.page_index(index)].get() {
            Some(page) => T::load(&page[self.layout.index_in_page(index)]),
            None => T::default(),
        };
        Ok(value)
    }

    /// Write `value` at `index`, allocating its page if needed
    #[inline]
    pub fn set(&self, index: u64, value: T) -> Result<()> {
        let cell = self.cell(index)?;
        T::store(cell, value);
        Ok(())
    }

    /// Write a contiguous run of values starting at `start`
    pub fn set_range(&self, start: u64, values: &[T]) -> Result<()> {
        let end = start + values.len() as u64;
        if end > self.capacity {
            return Err(Error::index(end.saturating_sub(1), self.capacity));
        }

        let mut written = 0usize;
        while written < values.len() {
            let index = start + written as u64;
            let page = self.page(self.layout.page_index(index));
            let offset = self.layout.index_in_page(index);
            let chunk = (page.len() - offset).min(values.len() - written);
            for (cell, value) in page[offset..offset + chunk]
                .iter()
                .zip(&values[written..written + chunk])
            {
                T::store(cell, *value);
            }
            written += chunk;
        }
        Ok(())
    }

    /// Allocate every page and set all elements to `value`
    pub fn fill(&self, value: T) {
        for page_index in 0..self.pages.len() {
            for cell in self.page(page_index).iter() {
                T::store(cell, value);
            }
        }
    }

    /// Bytes held by allocated pages
    pub fn memory_usage(&self) -> usize {
        self.pages
            .iter()
            .filter_map(|page| page.get())
            .map(|page| page.len() * T::SIZE_BYTES)
            .sum()
    }

    /// Convert into the immutable read form.
    ///
    /// Pages that were never written are materialised with default values.
    pub fn freeze(self) -> PagedArray<T> {
        let layout = self.layout;
        let capacity = self.capacity;
        let pages = self
            .pages
            .into_vec()
            .into_iter()
            .enumerate()
            .map(|(page_index, page)| match page.into_inner() {
                Some(cells) => cells.iter().map(T::load).collect(),
                None => vec![T::default(); layout.page_len(page_index, capacity)].into_boxed_slice(),
            })
            .collect();

        PagedArray {
            pages,
            layout,
            len: capacity,
        }
    }

    #[inline]
    pub(crate) fn cell(&self, index: u64) -> Result<&T::Cell> {
        self.check(index)?;
        let page = self.page(self.layout.page_index(index));
        Ok(&page[self.layout.index_in_page(index)])
    }

    fn page(&self, page_index: usize) -> &[T::Cell] {
        let len = self.layout.page_len(page_index, self.capacity);
        self.pages[page_index].get_or_init(|| (0..len).map(|_| T::new_cell(T::default())).collect())
    }

    #[inline]
    fn check(&self, index: u64) -> Result<()> {
        if index >= self.capacity {
            return Err(Error::index(index, self.capacity));
        }
        Ok(())
    }
}

impl PageStore<u64> {
    /// Atomically replace `expected` with `new` at `index`.
    ///
    /// Returns the previous value on success and the current value on failure.
    #[inline]
    pub fn compare_and_swap(
        &self,
        index: u64,
        expected: u64,
        new: u64,
    ) -> Result<std::result::Result<u64, u64>> {
        let cell = self.cell(index)?;
        Ok(cell.compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire))
    }
}

impl<T: PageValue + std::fmt::Debug> std::fmt::Debug for PageStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStore")
            .field("capacity", &self.capacity)
            .field("page_size", &self.layout.page_size())
            .field("allocated_pages", &self.allocated_pages())
            .finish()
    }
}

/// Immutable paged array produced by [`PageStore::freeze`]
#[derive(Debug, Clone)]
pub struct PagedArray<T> {
    pages: Vec<Box<[T]>>,
    layout: PageLayout,
    len: u64,
}

impl<T: PageValue> PagedArray<T> {
    /// Copy `values` into a paged array with the default page size for `T`
    pub fn from_slice(values: &[T]) -> Result<Self> {
        let store = PageStore::new(values.len() as u64)?;
        store.set_range(0, values)?;
        Ok(store.freeze())
    }

    /// Read the value at `index`
    #[inline]
    pub fn get(&self, index: u64) -> Result<T> {
        if index >= self.len {
            return Err(Error::index(index, self.len));
        }
        Ok(self.pages[self.layout.page_index(index)][self.layout.index_in_page(index)])
    }

    /// Number of elements
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Addressing scheme of this array
    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    /// Page at `page_index`
    pub fn page(&self, page_index: usize) -> Option<&[T]> {
        self.pages.get(page_index).map(|page| &page[..])
    }

    /// All pages in index order
    pub fn pages(&self) -> impl Iterator<Item = &[T]> {
        self.pages.iter().map(|page| &page[..])
    }

    /// All values in index order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.pages.iter().flat_map(|page| page.iter().copied())
    }

    /// Bytes held by the pages
    pub fn memory_usage(&self) -> usize {
        self.pages.iter().map(|page| page.len() * T::SIZE_BYTES).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_pages_are_allocated_lazily() {
        let store = PageStore::<u64>::with_page_size(1_000, 16).unwrap();
        assert_eq!(store.page_count(), 63);
        assert_eq!(store.allocated_pages(), 0);
        assert_eq!(store.get(999).unwrap(), 0);

        store.set(500, 42).unwrap();
        assert_eq!(store.allocated_pages(), 1);
        assert_eq!(store.get(500).unwrap(), 42);
        assert_eq!(store.memory_usage(), 16 * 8);
    }

    #[test]
    fn test_last_page_is_trimmed() {
        let store = PageStore::<u32>::with_page_size(10, 8).unwrap();
        store.fill(7);
        assert_eq!(store.memory_usage(), 10 * 4);
        let array = store.freeze();
        assert_eq!(array.page(1).unwrap().len(), 2);
        assert_eq!(array.iter().collect::<Vec<_>>(), vec![7; 10]);
    }

    #[test]
    fn test_out_of_range_is_index_error() {
        let store = PageStore::<f64>::new(4).unwrap();
        assert!(matches!(
            store.set(4, 1.0),
            Err(Error::Index { index: 4, len: 4 })
        ));
        assert!(matches!(store.get(17), Err(Error::Index { .. })));

        let array = store.freeze();
        assert!(matches!(array.get(4), Err(Error::Index { .. })));
    }

    #[test]
    fn test_capacity_error_when_page_table_overflows() {
        let result = PageStore::<u64>::with_page_size(u64::MAX, 1);
        assert!(matches!(result, Err(Error::Capacity(_))));
    }

    #[test]
    fn test_set_range_crosses_pages() {
        let store = PageStore::<u8>::with_page_size(20, 4).unwrap();
        let values: Vec<u8> = (1..=10).collect();
        store.set_range(3, &values).unwrap();

        let array = store.freeze();
        assert_eq!(array.get(2).unwrap(), 0);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(array.get(3 + i as u64).unwrap(), *value);
        }
        assert_eq!(array.get(13).unwrap(), 0);
    }

    #[test]
    fn test_set_range_rejects_overflow() {
        let store = PageStore::<u8>::with_page_size(8, 4).unwrap();
        assert!(matches!(
            store.set_range(6, &[1, 2, 3]),
            Err(Error::Index { index: 8, len: 8 })
        ));
    }

    #[test]
    fn test_f64_values_round_trip() {
        let store = PageStore::<f64>::new(3).unwrap();
        store.set(0, -1.5).unwrap();
        store.set(2, f64::NAN).unwrap();
        let array = store.freeze();
        assert_eq!(array.get(0).unwrap(), -1.5);
        assert_eq!(array.get(1).unwrap(), 0.0);
        assert!(array.get(2).unwrap().is_nan());
    }

    #[test]
    fn test_compare_and_swap() {
        let store = PageStore::<u64>::new(2).unwrap();
        store.set(1, 5).unwrap();
        assert_eq!(store.compare_and_swap(1, 5, 3).unwrap(), Ok(5));
        assert_eq!(store.compare_and_swap(1, 5, 9).unwrap(), Err(3));
        assert!(store.compare_and_swap(2, 0, 1).is_err());
    }

    #[test]
    fn test_concurrent_writers_sharing_pages() {
        let store = Arc::new(PageStore::<u64>::with_page_size(4_096, 64).unwrap());
        let threads: Vec<_> = (0..8u64)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    // interleaved indices so every page is touched by every thread
                    let mut index = t;
                    while index < 4_096 {
                        store.set(index, index * 3).unwrap();
                        index += 8;
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let store = Arc::try_unwrap(store).unwrap();
        assert_eq!(store.allocated_pages(), 64);
        let array = store.freeze();
        assert!(array.iter().enumerate().all(|(i, v)| v == i as u64 * 3));
    }

    #[test]
    fn test_from_slice() {
        let array = PagedArray::from_slice(&[3u32, 1, 4, 1, 5]).unwrap();
        assert_eq!(array.len(), 5);
        assert_eq!(array.get(2).unwrap(), 4);
        assert!(!array.is_empty());
    }
}
