/// DOM anchors the pipeline reads and patches.
///
/// The publisher's markup is versioned and its class names carry generated
/// suffixes, so anchors match by substring (or by a stable test attribute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchors {
    /// Class substring of the floating paywall barrier.
    pub barrier_class: String,
    /// Class substring of the element showing the current score.
    pub score_display_class: String,
    /// Class substring of the container holding the score.
    pub score_box_class: String,
    /// Attribute `(name, value)` marking the article body container.
    pub body_attr: (String, String),
}

const BARRIER_CLASS: &str = "FloatingBarrier";
const SCORE_DISPLAY_CLASS: &str = "Rating";
const SCORE_BOX_CLASS: &str = "ScoreBox";
const BODY_ATTR_NAME: &str = "data-testid";
const BODY_ATTR_VALUE: &str = "BodyWrapper";

impl Default for Anchors {
    fn default() -> Self {
        Self {
            barrier_class: BARRIER_CLASS.to_string(),
            score_display_class: SCORE_DISPLAY_CLASS.to_string(),
            score_box_class: SCORE_BOX_CLASS.to_string(),
            body_attr: (BODY_ATTR_NAME.to_string(), BODY_ATTR_VALUE.to_string()),
        }
    }
}

const USER_AGENT: &str = concat!("paywall_drop/", env!("CARGO_PKG_VERSION"));

/// Settings for one host run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub anchors: Anchors,
    pub user_agent: String,
    /// Whether the host offers a sanitising HTML parser.
    pub sanitizer: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anchors: Anchors::default(),
            user_agent: USER_AGENT.to_string(),
            sanitizer: true,
        }
    }
}
