//! Row access for users and pictures.
//!
//! Every read here hides soft-deleted rows. Functions are generic over the
//! connection so they run the same on a pool or inside a transaction.

pub mod picture;
pub mod user;

use crate::config::PaginationConfig;

/// A clamped page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    /// Normalise caller-supplied paging: a page below 1 becomes 1, a size
    /// below 1 becomes the default and a size above the maximum is capped.
    pub fn clamped(page: Option<i64>, size: Option<i64>, config: PaginationConfig) -> Self {
        let page = page.filter(|p| *p >= 1).map_or(1, |p| p as u64);
        let size = match size {
            Some(s) if s >= 1 => (s as u64).min(config.max_size),
            _ => config.default_size,
        };
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
