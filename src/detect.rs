use crate::config::Anchors;
use crate::dom::Document;
use crate::page::{classify, PageKind};
use crate::score::parse_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaywallState {
    Paywalled,
    Open,
}

/// Everything the detector looks at, read from the page in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaywallSignals {
    pub kind: PageKind,
    pub barrier_present: bool,
    /// Text of the score display element, if there is one.
    pub displayed_score: Option<String>,
}

impl PaywallSignals {
    pub fn collect(doc: &Document, anchors: &Anchors) -> Self {
        Self {
            kind: classify(doc.location().path()),
            barrier_present: doc.find_by_class(&anchors.barrier_class).is_some(),
            displayed_score: doc
                .find_by_class(&anchors.score_display_class)
                .map(|id| doc.text_content(id)),
        }
    }
}

/// A barrier element alone is enough. Without one, an album review showing a
/// literal zero score is treated as paywalled: the platform renders "0.0" as
/// a placeholder while content is locked. A genuine 0.0 review is a false
/// positive that is accepted.
pub fn detect(signals: &PaywallSignals) -> PaywallState {
    if signals.barrier_present {
        return PaywallState::Paywalled;
    }
    let zero_score = signals
        .displayed_score
        .as_deref()
        .and_then(parse_score)
        .is_some_and(|score| score.is_zero());
    if signals.kind == PageKind::AlbumReview && zero_score {
        PaywallState::Paywalled
    } else {
        PaywallState::Open
    }
}
