use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_PAGE_LIMIT;

/// The `{offset, limit}` pair sent with a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub offset: u32,
    pub limit: NonZeroU32,
}

/// Offset/limit cursor owned by exactly one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    offset: u32,
    limit: NonZeroU32,
}

impl Pager {
    #[must_use]
    pub const fn new(limit: NonZeroU32) -> Self {
        Self { offset: 0, limit }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn advance(&mut self) {
        self.offset = self.offset.saturating_add(self.limit.get());
    }

    /// Undo one `advance`, so a failed load-more can be retried for the same page.
    pub fn rewind(&mut self) {
        self.offset = self.offset.saturating_sub(self.limit.get());
    }

    #[must_use]
    pub const fn cursor(&self) -> PageCursor {
        PageCursor {
            offset: self.offset,
            limit: self.limit,
        }
    }

    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> NonZeroU32 {
        self.limit
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn starts_at_zero_with_default_limit() {
        let pager = Pager::default();
        assert_eq!(pager.offset(), 0);
        assert_eq!(pager.limit().get(), 10);
    }

    #[test]
    fn advance_moves_by_limit() {
        let mut pager = Pager::new(limit(10));
        pager.advance();
        pager.advance();
        assert_eq!(pager.cursor(), PageCursor { offset: 20, limit: limit(10) });
    }

    #[test]
    fn reset_returns_to_first_page() {
        let mut pager = Pager::new(limit(25));
        pager.advance();
        pager.reset();
        assert_eq!(pager.offset(), 0);
    }

    #[test]
    fn rewind_saturates_at_zero() {
        let mut pager = Pager::new(limit(10));
        pager.advance();
        pager.rewind();
        pager.rewind();
        assert_eq!(pager.offset(), 0);
    }
}
