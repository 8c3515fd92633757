use crate::error::StoreError;

pub const BOOKS_PER_PAGE: i64 = 10;
pub const AUTHORS_PER_PAGE: i64 = 10;
pub const MY_LOANS_PER_PAGE: i64 = 10;
pub const ALL_LOANS_PER_PAGE: i64 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageNumber {
    /// 1-based.
    Nth(i64),
    Last,
}

/// A requested page together with the listing's fixed page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub number: PageNumber,
    pub size: i64,
}

impl PageRequest {
    pub fn new(number: i64, size: i64) -> Self {
        Self {
            number: PageNumber::Nth(number),
            size,
        }
    }

    pub fn last(size: i64) -> Self {
        Self {
            number: PageNumber::Last,
            size,
        }
    }

    /// Pins the page against the listing's total.
    /// Numbers outside `1..=num_pages(total)` are rejected; an empty listing
    /// still has a first page.
    pub fn resolve(self, total: i64) -> Result<PageSpan, StoreError> {
        let num_pages = num_pages(total, self.size);
        let number = match self.number {
            PageNumber::Last => num_pages,
            PageNumber::Nth(number) if (1..=num_pages).contains(&number) => number,
            PageNumber::Nth(number) => return Err(StoreError::InvalidPage(number)),
        };
        Ok(PageSpan {
            number,
            size: self.size,
        })
    }

    /// Cuts this page out of an already ordered listing.
    pub fn slice<T>(self, items: Vec<T>) -> Result<Page<T>, StoreError> {
        let total = items.len() as i64;
        let span = self.resolve(total)?;
        let items = items
            .into_iter()
            .skip(span.offset() as usize)
            .take(span.size as usize)
            .collect();
        Ok(Page::new(items, span, total))
    }
}

/// A page known to exist in its listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSpan {
    pub number: i64,
    pub size: i64,
}

impl PageSpan {
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

fn num_pages(total: i64, size: i64) -> i64 {
    if total == 0 {
        1
    } else {
        (total + size - 1) / size
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, span: PageSpan, total: i64) -> Self {
        Self {
            items,
            number: span.number,
            size: span.size,
            total,
        }
    }

    pub fn num_pages(&self) -> i64 {
        num_pages(self.total, self.size)
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages() > 1
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_items_split_ten_and_three() {
        let items: Vec<_> = (0..13).collect();
        let first = PageRequest::new(1, 10).slice(items.clone()).unwrap();
        assert_eq!(first.items, (0..10).collect::<Vec<_>>());
        assert_eq!(first.num_pages(), 2);
        assert!(first.is_paginated());
        let second = PageRequest::new(2, 10).slice(items.clone()).unwrap();
        assert_eq!(second.items, vec![10, 11, 12]);
        assert_eq!(second.total, 13);
        assert!(matches!(
            PageRequest::new(3, 10).slice(items),
            Err(StoreError::InvalidPage(3))
        ));
    }

    #[test]
    fn empty_listing_has_one_empty_page() {
        let page = PageRequest::new(1, 20).slice(Vec::<i32>::new()).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.num_pages(), 1);
        assert!(!page.is_paginated());
        assert!(PageRequest::new(2, 20).resolve(0).is_err());
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(PageRequest::new(0, 10).resolve(5).is_err());
        assert!(PageRequest::new(-1, 10).resolve(5).is_err());
        assert_eq!(PageRequest::new(3, 20).resolve(41).unwrap().offset(), 40);
    }

    #[test]
    fn last_page_follows_the_total() {
        let items: Vec<_> = (0..13).collect();
        let last = PageRequest::last(10).slice(items).unwrap();
        assert_eq!(last.number, 2);
        assert_eq!(last.items, vec![10, 11, 12]);
        let empty = PageRequest::last(10).slice(Vec::<i32>::new()).unwrap();
        assert_eq!(empty.number, 1);
    }
}
