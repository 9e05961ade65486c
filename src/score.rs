use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static EXACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(10\.0|10|\d\.\d)$").unwrap());
// No lookaround in `regex`: the token boundaries are consumed instead. A
// neighbouring digit, leading dot or minus sign, or a trailing dot followed by
// a digit means the token is part of a larger number ("10.1", "-1.0", "12.5").
// A sentence-final period is not.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.\-])(10\.0|10|\d\.\d)(?:[^\d.]|\.(?:[^\d]|$)|$)").unwrap()
});

/// A review score in `[0.0, 10.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    /// Out-of-range and non-finite values are rejected, not clamped.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=10.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Extract a score from displayed text.
///
/// Whitespace runs are collapsed first. A whole-string match is preferred; the
/// bounded token search only runs when the text carries extra fragments.
pub fn parse_score(text: &str) -> Option<Score> {
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    let collapsed = collapsed.trim();

    let token = EXACT_RE
        .captures(collapsed)
        .or_else(|| TOKEN_RE.captures(collapsed))
        .and_then(|caps| caps.get(1))?;

    token.as_str().parse::<f64>().ok().and_then(Score::new)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Option<f64> {
        parse_score(text).map(Score::value)
    }

    #[test]
    fn exact_matches() {
        assert_eq!(parsed("7.8"), Some(7.8));
        assert_eq!(parsed("10"), Some(10.0));
        assert_eq!(parsed("10.0"), Some(10.0));
        assert_eq!(parsed("0.0"), Some(0.0));
        assert_eq!(parsed("  \n 8.2 \t\n"), Some(8.2));
    }

    #[test]
    fn token_inside_text() {
        assert_eq!(parsed("Rating: 6.5 / Best New Music"), Some(6.5));
        assert_eq!(parsed("score\n  9.1\n  out of ten"), Some(9.1));
        assert_eq!(parsed("7.8/10"), Some(7.8));
    }

    #[test]
    fn sentence_final_period() {
        assert_eq!(parsed("Rated 7.8."), Some(7.8));
        assert_eq!(parsed("7.8."), Some(7.8));
        assert_eq!(parsed("It scores 10."), Some(10.0));
        assert_eq!(parsed("Score: 6.5..."), Some(6.5));
        assert_eq!(parsed("Rated 7.8.5"), None);
    }

    #[test]
    fn boundary_tokens_rejected() {
        assert_eq!(parsed("10.1"), None);
        assert_eq!(parsed("-1.0"), None);
        assert_eq!(parsed("12.5"), None);
        assert_eq!(parsed("7.85"), None);
        assert_eq!(parsed(""), None);
        assert_eq!(parsed("no score here"), None);
    }

    #[test]
    fn score_range() {
        assert!(Score::new(10.5).is_none());
        assert!(Score::new(-0.1).is_none());
        assert!(Score::new(f64::NAN).is_none());
        assert!(Score::new(0.0).is_some_and(Score::is_zero));
    }

    #[test]
    fn display_has_one_decimal() {
        assert_eq!(Score::new(7.8).unwrap().to_string(), "7.8");
        assert_eq!(Score::new(10.0).unwrap().to_string(), "10.0");
        assert_eq!(Score::new(8.0).unwrap().to_string(), "8.0");
    }
}
