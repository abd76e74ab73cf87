//! Actions, grouped by resource.
//!
//! Every action takes the calling [`Actor`](cage_perms::Actor) first, checks
//! its flag before touching anything, validates input, mutates through the
//! store and finally notifies the audit sink. Input structs mirror the
//! fields a client submits.

pub mod articles;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod users;

pub use articles::{ArticleListQuery, EditArticle, NewArticle};
pub use comments::NewCommentInput;
pub use users::{ModifyUser, NewUser};

/// Offset and limit for a zero-based `page`. Non-positive pages are the
/// first page and non-positive limits fall back to `default_limit`.
pub(crate) fn window(page: i64, limit: i64, default_limit: u64) -> (u64, u64) {
    let limit = u64::try_from(limit)
        .ok()
        .filter(|l| *l > 0)
        .unwrap_or(default_limit);
    let page = u64::try_from(page).unwrap_or(0);
    (page.saturating_mul(limit), limit)
}

/// Like [`window`] for one-based pages: 0 and 1 are both the first page.
pub(crate) fn window_from_one(page: i64, limit: i64, default_limit: u64) -> (u64, u64) {
    window(page.saturating_sub(1), limit, default_limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamps() {
        assert_eq!(window(0, 10, 20), (0, 10));
        assert_eq!(window(2, 10, 20), (20, 10));
        assert_eq!(window(-3, 0, 20), (0, 20));
        assert_eq!(window(1, -5, 20), (20, 20));
    }

    #[test]
    fn test_window_from_one() {
        assert_eq!(window_from_one(1, 10, 20), (0, 10));
        assert_eq!(window_from_one(0, 10, 20), (0, 10));
        assert_eq!(window_from_one(3, 10, 20), (20, 10));
    }
}
