use tracing::debug;

use crate::config::Anchors;
use crate::dom::html::{ImportPolicy, KeepAll};
use crate::dom::{Document, HostCapabilities, NodeId};
use crate::score::Score;

/// Turns reconstructed markup into detached document nodes.
pub trait MarkupInjector: Send + Sync {
    fn name(&self) -> &'static str;
    fn inject(&self, doc: &mut Document, markup: &str) -> Vec<NodeId>;
}

/// Markup comes from a third party, so this is preferred whenever the host
/// can sanitise.
pub struct SanitizingInjector;

/// Fallback for hosts without a sanitiser.
pub struct PlainParsingInjector;

const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template",
];
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction"];

struct Sanitizer;

impl ImportPolicy for Sanitizer {
    fn keep_element(&self, tag: &str) -> bool {
        !DROPPED_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
    }

    fn keep_attribute(&self, name: &str, value: &str) -> bool {
        let name = name.to_ascii_lowercase();
        if name.starts_with("on") {
            return false;
        }
        if URL_ATTRIBUTES.contains(&name.as_str()) {
            return !value.trim_start().to_ascii_lowercase().starts_with("javascript:");
        }
        true
    }
}

impl MarkupInjector for SanitizingInjector {
    fn name(&self) -> &'static str {
        "sanitizing"
    }

    fn inject(&self, doc: &mut Document, markup: &str) -> Vec<NodeId> {
        doc.parse_fragment(markup, &Sanitizer)
    }
}

impl MarkupInjector for PlainParsingInjector {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn inject(&self, doc: &mut Document, markup: &str) -> Vec<NodeId> {
        doc.parse_fragment(markup, &KeepAll)
    }
}

pub fn select_injector(capabilities: &HostCapabilities) -> Box<dyn MarkupInjector> {
    if capabilities.sanitizer {
        Box::new(SanitizingInjector)
    } else {
        Box::new(PlainParsingInjector)
    }
}

/// Which of the two mutations happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub body_replaced: bool,
    pub score_restored: bool,
}

pub struct Patcher {
    injector: Box<dyn MarkupInjector>,
    anchors: Anchors,
}

impl Patcher {
    pub fn new(injector: Box<dyn MarkupInjector>, anchors: Anchors) -> Self {
        debug!(injector = injector.name(), "patcher ready");
        Self { injector, anchors }
    }

    pub fn injector_name(&self) -> &'static str {
        self.injector.name()
    }

    /// Apply both mutations. Each one is skipped when its input or its anchor
    /// is missing, independently of the other.
    pub fn apply(&self, doc: &mut Document, markup: Option<&str>, score: Option<Score>) -> PatchReport {
        PatchReport {
            body_replaced: markup.is_some_and(|m| self.replace_body(doc, m)),
            score_restored: score.is_some_and(|s| self.restore_score(doc, s)),
        }
    }

    pub fn replace_body(&self, doc: &mut Document, markup: &str) -> bool {
        let (name, value) = &self.anchors.body_attr;
        let Some(container) = doc.find_by_attr(name, value) else {
            debug!("body container missing; body left as is");
            return false;
        };
        let nodes = self.injector.inject(doc, markup);
        doc.replace_children(container, nodes);
        true
    }

    pub fn restore_score(&self, doc: &mut Document, score: Score) -> bool {
        let Some(score_box) = doc.find_by_class(&self.anchors.score_box_class) else {
            debug!("score box missing; score left as is");
            return false;
        };
        let target = doc.innermost_last(score_box);
        doc.set_text(target, &score.to_string());
        doc.set_style_property(target, "filter", "none");
        true
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    const PAGE: &str = r#"<html><body>
<div class="ScoreBox-abc"><div class="Rating-x"><p style="filter: blur(4px)">0.0</p></div></div>
<div data-testid="BodyWrapper"><p>Teaser</p><div class="FloatingBarrier">Subscribe</div></div>
</body></html>"#;

    fn doc() -> Document {
        let url = Url::parse("https://example.com/reviews/albums/x/").unwrap();
        Document::parse(url, PAGE)
    }

    fn patcher(capabilities: HostCapabilities) -> Patcher {
        Patcher::new(select_injector(&capabilities), Anchors::default())
    }

    fn body_html(doc: &Document) -> String {
        let body = doc.find_by_attr("data-testid", "BodyWrapper").unwrap();
        doc.inner_html(body)
    }

    #[test]
    fn injector_follows_capability() {
        assert_eq!(patcher(HostCapabilities { sanitizer: true }).injector_name(), "sanitizing");
        assert_eq!(patcher(HostCapabilities { sanitizer: false }).injector_name(), "plain");
    }

    #[test]
    fn body_and_score_applied() {
        let mut doc = doc();
        let report = patcher(HostCapabilities::default()).apply(
            &mut doc,
            Some("<p>Full <em>review</em></p>"),
            Score::new(7.8),
        );
        assert_eq!(report, PatchReport { body_replaced: true, score_restored: true });
        assert_eq!(body_html(&doc), "<p>Full <em>review</em></p>");

        let score_box = doc.find_by_class("ScoreBox").unwrap();
        let inner = doc.innermost_last(score_box);
        assert_eq!(doc.tag(inner), Some("p"));
        assert_eq!(doc.text_content(inner), "7.8");
        assert_eq!(doc.style_property(inner, "filter").as_deref(), Some("none"));
    }

    #[test]
    fn sanitizer_strips_active_content() {
        let mut doc = doc();
        patcher(HostCapabilities { sanitizer: true }).replace_body(
            &mut doc,
            r#"<p onclick="x()">a</p><script>alert(1)</script><a href=" JavaScript:go()">b</a><a href="/ok">c</a>"#,
        );
        assert_eq!(body_html(&doc), r#"<p>a</p><a>b</a><a href="/ok">c</a>"#);
    }

    #[test]
    fn plain_parser_keeps_everything() {
        let mut doc = doc();
        patcher(HostCapabilities { sanitizer: false })
            .replace_body(&mut doc, r#"<p onclick="x()">a</p><script>go()</script>"#);
        assert_eq!(body_html(&doc), r#"<p onclick="x()">a</p><script>go()</script>"#);
    }

    #[test]
    fn missing_anchors_skip_independently() {
        let url = Url::parse("https://example.com/reviews/albums/x/").unwrap();
        let mut doc = Document::parse(url, r#"<body><div class="ScoreBox"><span>0.0</span></div></body>"#);
        let before = doc.to_html();

        let report = patcher(HostCapabilities::default()).apply(&mut doc, Some("<p>x</p>"), None);
        assert_eq!(report, PatchReport::default());
        assert_eq!(doc.to_html(), before);

        let report = patcher(HostCapabilities::default()).apply(&mut doc, Some("<p>x</p>"), Score::new(9.0));
        assert_eq!(report, PatchReport { body_replaced: false, score_restored: true });
        assert!(doc.to_html().contains(r#"<span style="filter: none">9.0</span>"#));
    }
}
