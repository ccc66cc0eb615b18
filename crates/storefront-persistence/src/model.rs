//! Domain model types shared by the services

use serde::{Deserialize, Serialize};

use storefront_common::{PageLink, give_pages};

/// Generic paginated result
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_count: u64,
    pub page_number: u64,
    pub pages_available: u64,
    pub page_items: Vec<T>,
}

// Manual impl so `T` needs no `Default`
impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            total_count: 0,
            page_number: 0,
            pages_available: 0,
            page_items: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    pub fn new(total_count: u64, page_number: u64, page_size: u64, page_items: Vec<T>) -> Self {
        Self {
            total_count,
            page_number,
            pages_available: if page_size > 0 {
                total_count.div_ceil(page_size)
            } else {
                0
            },
            page_items,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Slices an in-memory result set the same way a paged query would.
    pub fn from_vec(all: Vec<T>, page_number: u64, page_size: u64) -> Self {
        let total_count = all.len() as u64;
        let page_number = page_number.max(1);
        let skip = ((page_number - 1) * page_size) as usize;
        let page_items = all
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect();

        Self::new(total_count, page_number, page_size, page_items)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            total_count: self.total_count,
            page_number: self.page_number,
            pages_available: self.pages_available,
            page_items: self.page_items.into_iter().map(f).collect(),
        }
    }

    /// Paginator links for this page.
    pub fn links(&self) -> Vec<PageLink> {
        give_pages(self.page_number, self.pages_available)
    }
}
