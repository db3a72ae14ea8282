//! Ingredient pagination
//!
//! Five ingredients per frame image, 1-indexed pages.

/// Ingredients per page
pub const PAGE_SIZE: u32 = 5;

/// Pagination metadata calculated from an item count and a requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed, clamped)
    pub page: u32,
    /// Total number of pages; zero when there are no items
    pub total_pages: u32,
    /// Index of the first item on the page
    pub offset: usize,
}

impl Pagination {
    /// Slice of `items` shown on this page
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = (start + PAGE_SIZE as usize).min(items.len());
        &items[start..end]
    }
}

/// Calculate pagination metadata from total items and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Examples
/// ```
/// use breadcast_frames::pagination::calculate_pagination;
///
/// // 12 ingredients = 3 pages (5 + 5 + 2)
/// let p = calculate_pagination(12, 2);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 5);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(12, 5);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 10);
/// ```
pub fn calculate_pagination(total_items: usize, requested_page: u32) -> Pagination {
    let total_pages = total_items.div_ceil(PAGE_SIZE as usize) as u32;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page as usize - 1) * PAGE_SIZE as usize;

    Pagination {
        page,
        total_pages,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_pages_of_five() {
        let items: Vec<u32> = (1..=12).collect();

        let first = calculate_pagination(items.len(), 1);
        assert_eq!(first.slice(&items), &[1, 2, 3, 4, 5]);

        let second = calculate_pagination(items.len(), 2);
        assert_eq!(second.slice(&items), &[6, 7, 8, 9, 10]);

        let last = calculate_pagination(items.len(), 3);
        assert_eq!(last.slice(&items), &[11, 12]);
        assert_eq!(last.total_pages, 3);
    }

    #[test]
    fn test_pagination_clamps() {
        let p = calculate_pagination(12, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);

        let p = calculate_pagination(12, 5);
        assert_eq!(p.page, 3);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let p = calculate_pagination(10, 3);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.page, 2);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 4);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert!(p.slice::<u32>(&[]).is_empty());
    }
}
