use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static ALBUM_REVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/?reviews/albums/[^/]+/?$").unwrap());

/// Kind of page, decided from the URL path alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    AlbumReview,
    Other,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::AlbumReview => f.write_str("album-review"),
            PageKind::Other => f.write_str("other"),
        }
    }
}

/// Classify a path such as `/reviews/albums/some-album/`.
pub fn classify(path: &str) -> PageKind {
    if ALBUM_REVIEW_RE.is_match(path) {
        PageKind::AlbumReview
    } else {
        PageKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn album_review_paths() {
        assert_eq!(classify("/reviews/albums/some-album/"), PageKind::AlbumReview);
        assert_eq!(classify("/reviews/albums/some-album"), PageKind::AlbumReview);
        assert_eq!(classify("reviews/albums/x-2024"), PageKind::AlbumReview);
    }

    #[test]
    fn other_paths() {
        assert_eq!(classify("/"), PageKind::Other);
        assert_eq!(classify("/reviews/albums/"), PageKind::Other);
        assert_eq!(classify("/reviews/albums/a/b"), PageKind::Other);
        assert_eq!(classify("/reviews/tracks/some-track/"), PageKind::Other);
        assert_eq!(classify("/news/reviews/albums/some-album/"), PageKind::Other);
    }
}
