//! Boilerplate stripping and heading segmentation for rendered pages.
//!
//! The cleaner turns a fully rendered document into a condensed Markdown-ish
//! text block: non-content regions are dropped, the remainder is segmented by
//! h2-h4 headings, and only sections with enough body text survive. The
//! heuristic trades recall for precision — un-headed or short content is
//! allowed to fall through to the whole-document fallback or get dropped.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use pagebrief_common::PageContent;

/// A heading section is kept only if its body text is longer than this.
/// Shorter sections are presumed navigational or boilerplate.
const MIN_SECTION_CHARS: usize = 100;

/// Elements that never carry article text.
const STRIP_TAGS: &[&str] = &[
    "style", "script", "head", "footer", "nav", "aside", "img", "iframe", "button",
];

/// Class tokens that mark ad, share, and related-content widgets.
const STRIP_CLASSES: &[&str] = &[
    "ad",
    "advertisement",
    "promo",
    "sidebar",
    "comments",
    "testimonial",
    "like-share",
    "like_share",
    "related-blog",
    "related_blog",
    "related-news",
    "related_news",
    "share-buttons",
    "share_buttons",
    "share-section",
    "share_section",
    "related-articles",
    "related_articles",
    "related-posts",
    "related_posts",
    "newsletter-signup",
    "newsletter_signup",
    "social-media",
    "social_media",
];

const HEADING_TAGS: &[&str] = &["h2", "h3", "h4"];

// Rendered pages sometimes leak styled-component CSS and editor artifacts
// into heading text.
static CSS_LEAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.css-[a-zA-Z0-9_-]+\{[^}]+\}").expect("valid regex"));
static HEADING_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[h[23]\]").expect("valid regex"));
static LIST_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\. ").expect("valid regex"));

/// Condense rendered markup into headed sections of plain text.
///
/// When no heading section survives the length gate, the whole document's
/// flattened text (minus stripped regions) is returned as a last resort.
pub fn condense(html: &str) -> PageContent {
    let doc = Html::parse_document(html);
    let heading_selector = Selector::parse("h2, h3, h4").unwrap();

    let mut sections: Vec<String> = Vec::new();
    for heading in doc.select(&heading_selector) {
        if is_stripped(&heading) || in_stripped_region(&heading) {
            continue;
        }

        let body = section_body(&heading);
        if body.chars().count() <= MIN_SECTION_CHARS {
            continue;
        }

        let marker = match heading.value().name() {
            "h2" => "##",
            "h3" => "###",
            _ => "####",
        };
        let title = scrub_heading(&heading.text().collect::<Vec<_>>().join(" "));
        sections.push(format!("{marker} {title}\n{body}"));
    }

    let text = if sections.is_empty() {
        document_text(&doc)
    } else {
        sections.join("\n\n")
    };

    PageContent::new(text)
}

/// Collect sibling text following a heading, stopping at the next heading.
/// Links flatten to their text; stripped elements contribute nothing.
fn section_body(heading: &ElementRef) -> String {
    let mut out = String::new();
    for sibling in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(sibling) else {
            continue;
        };
        if HEADING_TAGS.contains(&el.value().name()) {
            break;
        }
        collect_text(&el, &mut out);
    }
    squash_whitespace(&out)
}

/// Depth-first text collection that skips stripped subtrees.
fn collect_text(el: &ElementRef, out: &mut String) {
    if is_stripped(el) {
        return;
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(&child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn is_stripped(el: &ElementRef) -> bool {
    let value = el.value();
    if STRIP_TAGS.contains(&value.name()) {
        return true;
    }
    value.classes().any(|class| STRIP_CLASSES.contains(&class))
}

/// True when any ancestor of the element is itself stripped, so headings
/// inside footers or sidebars never open a section.
fn in_stripped_region(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_stripped(&ancestor))
}

fn scrub_heading(raw: &str) -> String {
    let scrubbed = CSS_LEAK_RE.replace_all(raw, "");
    let scrubbed = HEADING_TAG_RE.replace_all(&scrubbed, "");
    let scrubbed = LIST_PREFIX_RE.replace_all(&scrubbed, "");
    squash_whitespace(&scrubbed)
}

/// Whole-document fallback: body text with stripped regions removed.
fn document_text(doc: &Html) -> String {
    let body_selector = Selector::parse("body").unwrap();
    let mut out = String::new();
    if let Some(body) = doc.select(&body_selector).next() {
        collect_text(&body, &mut out);
    }
    squash_whitespace(&out)
}

fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
