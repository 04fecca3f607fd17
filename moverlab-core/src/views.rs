//! Read-only slices over a ranked record list: winners, losers and pages.

use thiserror::Error;

use crate::domain::PerformanceRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("page size must be at least 1")]
    ZeroPageSize,

    #[error("page {page} out of range (1..={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
}

/// The first `n` records of a ranked list.
pub fn winners(records: &[PerformanceRecord], n: usize) -> &[PerformanceRecord] {
    &records[..n.min(records.len())]
}

/// The `n` worst defined records, worst first. Undefined records never appear.
pub fn losers(records: &[PerformanceRecord], n: usize) -> Vec<PerformanceRecord> {
    records
        .iter()
        .rev()
        .filter(|r| r.change.is_defined())
        .take(n)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Result<Self, ViewError> {
        if page_size == 0 {
            return Err(ViewError::ZeroPageSize);
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// At least one page, even for an empty list.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// 1-based page slice.
    pub fn page<'r>(
        &self,
        records: &'r [PerformanceRecord],
        page: usize,
    ) -> Result<&'r [PerformanceRecord], ViewError> {
        let page_count = self.page_count(records.len());
        if page == 0 || page > page_count {
            return Err(ViewError::PageOutOfRange { page, page_count });
        }
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(records.len());
        Ok(&records[start..end])
    }
}
