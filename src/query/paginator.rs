//! # Paginator
//!
//! Slices a record sequence into a bounded page. The whole sequence is
//! counted so `total_count` reflects every filtered record, but only the
//! records inside the window are kept in memory.

use serde::Serialize;

use super::config::QueryConfig;
use super::errors::QueryResult;
use super::record::Record;

/// Effective offset and limit after defaults and clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

/// Derived paging metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Record>,
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
    pub page_info: PageInfo,
    pub next_offset: Option<usize>,
    pub previous_offset: Option<usize>,
}

impl Page {
    fn new(items: Vec<Record>, total_count: usize, window: PageWindow) -> Self {
        let PageWindow { offset, limit } = window;

        let next = offset.saturating_add(limit);
        let next_offset = (next < total_count).then_some(next);
        let previous_offset = (offset > 0).then(|| offset.saturating_sub(limit));

        Self {
            items,
            total_count,
            offset,
            limit,
            page_info: PageInfo {
                current_page: offset / limit + 1,
                page_size: limit,
                total_pages: total_count.div_ceil(limit),
            },
            next_offset,
            previous_offset,
        }
    }

    /// Apply `f` to every record on the page
    pub fn map_items(mut self, f: impl Fn(Record) -> Record) -> Self {
        self.items = self.items.into_iter().map(f).collect();
        self
    }
}

/// Page slicer bound to configured defaults
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    default_limit: usize,
    max_limit: usize,
}

impl Paginator {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            default_limit: config.default_limit.max(1),
            max_limit: config.max_limit.max(config.default_limit.max(1)),
        }
    }

    /// Turn requested values into an effective window.
    ///
    /// Missing or negative offsets become 0. Missing or non-positive limits
    /// become the default; larger limits are clamped to the maximum.
    pub fn window(&self, offset: Option<i64>, limit: Option<i64>) -> PageWindow {
        let offset = match offset {
            Some(o) if o >= 0 => usize::try_from(o).unwrap_or(usize::MAX),
            _ => 0,
        };

        let limit = match limit {
            Some(l) if l > 0 => usize::try_from(l).unwrap_or(usize::MAX).min(self.max_limit),
            _ => self.default_limit,
        };

        PageWindow { offset, limit }
    }

    /// Paginate an infallible sequence
    pub fn paginate<I>(&self, items: I, window: PageWindow) -> Page
    where
        I: IntoIterator<Item = Record>,
    {
        let (page_items, total) = Self::slice(items.into_iter().map(Ok::<_, ()>), window)
            .unwrap_or_default();
        Page::new(page_items, total, window)
    }

    /// Paginate a sequence whose items may fail; the first failure aborts
    pub fn try_paginate<I>(&self, items: I, window: PageWindow) -> QueryResult<Page>
    where
        I: IntoIterator<Item = QueryResult<Record>>,
    {
        let (page_items, total) = Self::slice(items.into_iter(), window)?;
        Ok(Page::new(page_items, total, window))
    }

    fn slice<I, E>(items: I, window: PageWindow) -> Result<(Vec<Record>, usize), E>
    where
        I: Iterator<Item = Result<Record, E>>,
    {
        let end = window.offset.saturating_add(window.limit);
        let mut page = Vec::with_capacity(window.limit.min(64));
        let mut total = 0usize;

        for item in items {
            let record = item?;
            if total >= window.offset && total < end {
                page.push(record);
            }
            total += 1;
        }

        Ok((page, total))
    }
}
