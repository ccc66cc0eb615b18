//! Utility functions for the storefront
//!
//! Input validators shared by the services and the paginator link builder.

use std::sync::LazyLock;

use chrono::NaiveDate;
use serde::Serialize;

/// Largest integer a browser can send without losing precision (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Largest stock level or line quantity the shop accepts. A line of
/// `MAX_PRICE` items at this quantity stays far inside `i64` cents.
pub const MAX_QUANTITY: i64 = 1_000_000;

static ISO_DATE_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid regex pattern"));

static NAME_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"(?i)^[a-z0-9"'\-_ ]+$"#).expect("Invalid regex pattern")
});

static HEX_COLOR_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new("(?i)^#([0-9A-F]{3}){1,2}$").expect("Invalid regex pattern")
});

static EMAIL_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*$")
        .expect("Invalid regex pattern")
});

/// Parse a `YYYY-MM-DD` date. Returns `None` for anything else, including
/// well-formed strings naming a day that does not exist.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if !ISO_DATE_PATTERN.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn is_iso_date(value: &str) -> bool {
    parse_iso_date(value).is_some()
}

/// Names of promotions and target groups: 3 to 100 characters of letters,
/// digits, quotes, dashes, underscores and spaces.
pub fn is_valid_name(value: &str) -> bool {
    let len = value.chars().count();
    (3..=100).contains(&len) && NAME_PATTERN.is_match(value)
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_PATTERN.is_match(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Strictly positive and representable on the client side.
pub fn is_positive_safe_integer(value: i64) -> bool {
    value > 0 && value <= MAX_SAFE_INTEGER
}

/// A cart or order line quantity: at least one, at most `MAX_QUANTITY`.
pub fn is_valid_quantity(value: i64) -> bool {
    value > 0 && value <= MAX_QUANTITY
}

/// A stock level: zero up to `MAX_QUANTITY`.
pub fn is_valid_stock(value: i64) -> bool {
    (0..=MAX_QUANTITY).contains(&value)
}

/// Case-insensitive substring test used by every list filter.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One entry of a paginator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageLink {
    Page(u64),
    Gap(&'static str),
}

const PAGE_GAP: PageLink = PageLink::Gap("...");

/// Builds the paginator links around `page`: the first and last page are
/// always present together with one page either side of the current one.
/// A hole of a single page is filled in, larger holes become `"..."`.
pub fn give_pages(page: u64, last_page: u64) -> Vec<PageLink> {
    const DELTA: u64 = 1;

    if last_page == 0 {
        return Vec::new();
    }

    let page = page.clamp(1, last_page);
    let left = page.saturating_sub(DELTA);
    let right = page + DELTA;

    let shown: Vec<u64> = (1..=last_page)
        .filter(|i| *i == 1 || *i == last_page || (*i >= left && *i <= right))
        .collect();

    let mut links = Vec::with_capacity(shown.len() + 2);
    let mut previous: Option<u64> = None;

    for i in shown {
        if let Some(prev) = previous {
            if i - prev == 2 {
                links.push(PageLink::Page(prev + 1));
            } else if i - prev > 2 {
                links.push(PAGE_GAP);
            }
        }
        links.push(PageLink::Page(i));
        previous = Some(i);
    }

    links
}

/// Normalises a 1-based page number and returns `(page, offset)`.
pub fn page_offset(page: Option<u64>, page_size: u64) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    (page, (page - 1) * page_size)
}

/// Number of pages needed for `total` rows.
pub fn last_page(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn pages(links: &[PageLink]) -> Vec<String> {
        links
            .iter()
            .map(|l| match l {
                PageLink::Page(p) => p.to_string(),
                PageLink::Gap(g) => g.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_give_pages_small() {
        assert_eq!(pages(&give_pages(1, 1)), vec!["1"]);
        assert_eq!(pages(&give_pages(1, 3)), vec!["1", "2", "3"]);
        assert!(give_pages(1, 0).is_empty());
    }

    #[test]
    fn test_give_pages_gaps() {
        assert_eq!(pages(&give_pages(1, 10)), vec!["1", "2", "...", "10"]);
        assert_eq!(
            pages(&give_pages(5, 10)),
            vec!["1", "...", "4", "5", "6", "...", "10"]
        );
        assert_eq!(pages(&give_pages(10, 10)), vec!["1", "...", "9", "10"]);
    }

    #[test]
    fn test_give_pages_fills_single_hole() {
        // 1 _ 3 4 5 ... : the single missing page 2 is filled in
        assert_eq!(
            pages(&give_pages(4, 10)),
            vec!["1", "2", "3", "4", "5", "...", "10"]
        );
    }

    #[test]
    fn test_give_pages_clamps_page() {
        assert_eq!(give_pages(0, 3), give_pages(1, 3));
        assert_eq!(give_pages(99, 3), give_pages(3, 3));
    }

    #[test]
    fn test_iso_date() {
        assert!(is_iso_date("2024-02-29"));
        assert!(!is_iso_date("2023-02-29"));
        assert!(!is_iso_date("2024-2-9"));
        assert!(!is_iso_date("2024-02-10T00:00:00"));
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("Summer sale"));
        assert!(is_valid_name("Mother's day - 2024"));
        assert!(!is_valid_name("ab"));
        assert!(!is_valid_name("sale!"));
        assert!(!is_valid_name(&"a".repeat(101)));
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#A0b1C2"));
        assert!(!is_hex_color("fff"));
        assert!(!is_hex_color("#ffff"));
        assert!(!is_hex_color("#ggg"));
    }

    #[test]
    fn test_email() {
        assert!(is_email("jane.doe@example.com"));
        assert!(!is_email("jane"));
        assert!(!is_email("jane@"));
    }

    #[test]
    fn test_positive_safe_integer() {
        assert!(is_positive_safe_integer(1));
        assert!(is_positive_safe_integer(MAX_SAFE_INTEGER));
        assert!(!is_positive_safe_integer(0));
        assert!(!is_positive_safe_integer(-3));
        assert!(!is_positive_safe_integer(MAX_SAFE_INTEGER + 1));
    }

    #[test]
    fn test_quantity_limits() {
        assert!(is_valid_quantity(1));
        assert!(is_valid_quantity(MAX_QUANTITY));
        assert!(!is_valid_quantity(0));
        assert!(!is_valid_quantity(MAX_QUANTITY + 1));
        assert!(!is_valid_quantity(10_000_000_000_000));

        assert!(is_valid_stock(0));
        assert!(is_valid_stock(MAX_QUANTITY));
        assert!(!is_valid_stock(-1));
        assert!(!is_valid_stock(MAX_QUANTITY + 1));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(None, 20), (1, 0));
        assert_eq!(page_offset(Some(0), 20), (1, 0));
        assert_eq!(page_offset(Some(3), 20), (3, 40));
        assert_eq!(last_page(41, 20), 3);
        assert_eq!(last_page(0, 20), 0);
    }

    proptest! {
        #[test]
        fn prop_give_pages_always_has_ends(last in 1u64..200, page in 1u64..200) {
            let links = give_pages(page, last);
            prop_assert_eq!(links.first(), Some(&PageLink::Page(1)));
            prop_assert_eq!(links.last(), Some(&PageLink::Page(last)));
            prop_assert!(links.contains(&PageLink::Page(page.min(last))));
        }

        #[test]
        fn prop_give_pages_never_two_gaps_in_a_row(last in 1u64..200, page in 1u64..200) {
            let links = give_pages(page, last);
            for pair in links.windows(2) {
                let both_gaps =
                    matches!(pair[0], PageLink::Gap(_)) && matches!(pair[1], PageLink::Gap(_));
                prop_assert!(!both_gaps);
            }
        }
    }
}
