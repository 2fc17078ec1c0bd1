//! Pagination state and page-link computation

use serde::Serialize;

/// Number of page buttons shown around the current page
pub const LINK_WINDOW: u64 = 5;

/// Page position within a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageState {
    /// Current page number (1-indexed)
    pub page_number: u64,
    /// Rows per page, constant per screen
    pub page_size: u64,
    /// Items across all pages
    pub total_items: u64,
}

impl PageState {
    pub fn new(page_size: u64) -> Self {
        Self {
            page_number: 1,
            page_size: page_size.max(1),
            total_items: 0,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(self.page_size)
    }

    /// Offset of the first visible item
    pub fn offset(&self) -> u64 {
        (self.page_number - 1) * self.page_size
    }

    /// Record a new item count and pull the page number back into range
    ///
    /// # Examples
    /// ```
    /// use melodex_console::pagination::PageState;
    ///
    /// let mut state = PageState::new(10);
    /// state.page_number = 3;
    /// state.set_total(25);
    /// assert_eq!(state.page_number, 3);
    ///
    /// state.set_total(12);
    /// assert_eq!(state.page_number, 2); // clamped to last page
    /// ```
    pub fn set_total(&mut self, total_items: u64) {
        self.total_items = total_items;
        self.page_number = self.page_number.max(1).min(self.total_pages().max(1));
    }

    /// Move to `page`; out-of-range requests leave the state untouched
    pub fn goto(&mut self, page: u64) -> bool {
        if page < 1 || page > self.total_pages() || page == self.page_number {
            return false;
        }
        self.page_number = page;
        true
    }

    pub fn reset(&mut self) {
        self.page_number = 1;
    }

    pub fn is_first(&self) -> bool {
        self.page_number <= 1
    }

    pub fn is_last(&self) -> bool {
        self.page_number >= self.total_pages()
    }
}

/// One pagination control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageLink {
    Prev { enabled: bool },
    Page { number: u64, current: bool },
    Ellipsis,
    Next { enabled: bool },
}

impl PageLink {
    pub fn label(&self) -> String {
        match self {
            PageLink::Prev { enabled: true } => "<".to_string(),
            PageLink::Prev { enabled: false } => "(<)".to_string(),
            PageLink::Page { number, current: true } => format!("[{}]", number),
            PageLink::Page { number, .. } => number.to_string(),
            PageLink::Ellipsis => "...".to_string(),
            PageLink::Next { enabled: true } => ">".to_string(),
            PageLink::Next { enabled: false } => "(>)".to_string(),
        }
    }
}

/// Visible slice plus the controls to render under it
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a, T> {
    pub visible: &'a [T],
    pub links: Vec<PageLink>,
}

/// Slice `items` for one page and compute its links
///
/// # Examples
/// ```
/// use melodex_console::pagination::{paginate, PageLink};
///
/// let items: Vec<u32> = (1..=25).collect();
/// let view = paginate(&items, 1, 10);
/// assert_eq!(view.visible, &items[0..10]);
/// assert_eq!(view.links.first(), Some(&PageLink::Prev { enabled: false }));
/// ```
pub fn paginate<T>(items: &[T], page_number: u64, page_size: u64) -> PageView<'_, T> {
    let mut state = PageState::new(page_size);
    state.page_number = page_number.max(1);
    state.set_total(items.len() as u64);

    let start = (state.offset() as usize).min(items.len());
    let end = (start + state.page_size as usize).min(items.len());

    PageView {
        visible: &items[start..end],
        links: page_links(state.page_number, state.total_pages()),
    }
}

/// Page numbers to show: first, last, and a window around `current`,
/// with an ellipsis over every gap
pub fn page_numbers(current: u64, total_pages: u64) -> Vec<Option<u64>> {
    if total_pages == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);

    let (start, end) = if total_pages <= LINK_WINDOW {
        (1, total_pages)
    } else {
        let start = current.saturating_sub(LINK_WINDOW / 2).max(1);
        let start = start.min(total_pages - LINK_WINDOW + 1);
        (start, start + LINK_WINDOW - 1)
    };

    let mut wanted: Vec<u64> = Vec::with_capacity(LINK_WINDOW as usize + 2);
    wanted.push(1);
    wanted.extend(start..=end);
    wanted.push(total_pages);
    wanted.sort_unstable();
    wanted.dedup();

    let mut out = Vec::with_capacity(wanted.len() + 2);
    let mut previous: Option<u64> = None;
    for n in wanted {
        if let Some(p) = previous {
            if n > p + 1 {
                out.push(None);
            }
        }
        out.push(Some(n));
        previous = Some(n);
    }
    out
}

/// Full control row: Prev, numbers/ellipses, Next
pub fn page_links(current: u64, total_pages: u64) -> Vec<PageLink> {
    if total_pages == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);

    let mut links = vec![PageLink::Prev { enabled: current > 1 }];
    links.extend(page_numbers(current, total_pages).into_iter().map(|n| match n {
        Some(number) => PageLink::Page {
            number,
            current: number == current,
        },
        None => PageLink::Ellipsis,
    }));
    links.push(PageLink::Next {
        enabled: current < total_pages,
    });
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(current: u64, total: u64) -> Vec<String> {
        page_numbers(current, total)
            .into_iter()
            .map(|n| n.map(|v| v.to_string()).unwrap_or_else(|| "...".to_string()))
            .collect()
    }

    #[test]
    fn test_scenario_25_items_page_1() {
        let items: Vec<u32> = (1..=25).collect();
        let view = paginate(&items, 1, 10);
        assert_eq!(view.visible, &items[0..10]);
        assert_eq!(
            view.links,
            vec![
                PageLink::Prev { enabled: false },
                PageLink::Page { number: 1, current: true },
                PageLink::Page { number: 2, current: false },
                PageLink::Page { number: 3, current: false },
                PageLink::Next { enabled: true },
            ]
        );
    }

    #[test]
    fn test_last_partial_page() {
        let items: Vec<u32> = (1..=25).collect();
        let view = paginate(&items, 3, 10);
        assert_eq!(view.visible, &items[20..25]);
        assert_eq!(view.links.last(), Some(&PageLink::Next { enabled: false }));
    }

    #[test]
    fn test_empty_list() {
        let items: Vec<u32> = Vec::new();
        let view = paginate(&items, 1, 10);
        assert!(view.visible.is_empty());
        assert!(view.links.is_empty());
    }

    #[test]
    fn test_window_centered() {
        assert_eq!(numbers(10, 20), vec!["1", "...", "8", "9", "10", "11", "12", "...", "20"]);
    }

    #[test]
    fn test_window_shifted_at_start() {
        assert_eq!(numbers(1, 20), vec!["1", "2", "3", "4", "5", "...", "20"]);
        assert_eq!(numbers(2, 20), vec!["1", "2", "3", "4", "5", "...", "20"]);
    }

    #[test]
    fn test_window_shifted_at_end() {
        assert_eq!(numbers(20, 20), vec!["1", "...", "16", "17", "18", "19", "20"]);
        assert_eq!(numbers(19, 20), vec!["1", "...", "16", "17", "18", "19", "20"]);
    }

    #[test]
    fn test_single_page_gap_gets_ellipsis() {
        assert_eq!(numbers(5, 8), vec!["1", "...", "3", "4", "5", "6", "7", "8"]);
    }

    #[test]
    fn test_small_total_shows_all() {
        assert_eq!(numbers(2, 4), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_goto_out_of_range_is_noop() {
        let mut state = PageState::new(10);
        state.set_total(25);
        assert!(!state.goto(0));
        assert!(!state.goto(4));
        assert_eq!(state.page_number, 1);
        assert!(state.goto(3));
        assert_eq!(state.page_number, 3);
    }

    #[test]
    fn test_set_total_zero_resets_to_one() {
        let mut state = PageState::new(10);
        state.set_total(50);
        state.goto(5);
        state.set_total(0);
        assert_eq!(state.page_number, 1);
        assert_eq!(state.total_pages(), 0);
        assert_eq!(state.offset(), 0);
    }

    #[test]
    fn test_zero_page_size_coerced() {
        let state = PageState::new(0);
        assert_eq!(state.page_size, 1);
    }
}
