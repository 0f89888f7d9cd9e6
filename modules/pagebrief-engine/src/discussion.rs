//! Structured extraction for discussion-thread pages.
//!
//! Rendered discussion markup carries a title, a post body, and a flat list
//! of comment elements. Extraction locates all three, cleans platform chrome
//! (author/age lines, reply buttons) out of the text, and applies the
//! signal-quality gates: removed posts, near-empty bodies, and near-empty
//! comment sets are rejected before an LLM call is spent on them.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use pagebrief_common::{word_count, PageContent, QualityReject};

/// Post bodies shorter than this carry no summarizable signal.
const MIN_POST_CHARS: usize = 100;
/// Combined comment text shorter than this carries no summarizable signal.
const MIN_COMMENT_CHARS: usize = 100;

/// Title shown in place of a post deleted by its author.
const REMOVED_TITLE: &str = "[deleted by user]";

// "username / bullet / Nmo ago" author lines as they appear in rendered
// comment text, one token per line.
static AUTHOR_AGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\n•\n\d+mo ago\n").expect("valid regex"));
static REPLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[Rr]eply\b").expect("valid regex"));

/// Extract a labeled title/post/comments text block from rendered markup.
///
/// The reported word count covers the three cleaned parts, not the labels
/// joining them.
pub fn extract(html: &str) -> Result<PageContent, QualityReject> {
    let doc = Html::parse_document(html);
    let title_selector = Selector::parse("h1").unwrap();
    let post_selector = Selector::parse("div.text-neutral-content").unwrap();
    let comment_selector = Selector::parse("shreddit-comment").unwrap();

    let title = doc
        .select(&title_selector)
        .next()
        .ok_or(QualityReject::NoTitle)?;
    let title_text = element_text(&title);
    let title_text = title_text.trim();
    if title_text == REMOVED_TITLE {
        return Err(QualityReject::Removed);
    }

    let post = doc
        .select(&post_selector)
        .next()
        .ok_or(QualityReject::NoPost)?;
    let post_raw = element_text(&post);
    let post_chars = post_raw.chars().count();
    if post_chars < MIN_POST_CHARS {
        return Err(QualityReject::PostTooShort { chars: post_chars });
    }

    let mut comments = String::new();
    for (i, comment) in doc.select(&comment_selector).enumerate() {
        let raw = element_text(&comment);
        let text = AUTHOR_AGE_RE.replace_all(&raw, "");
        comments.push_str(&format!("Comment{} \n {} \n", i + 1, text.trim()));
    }
    let comment_chars = comments.chars().count();
    if comment_chars < MIN_COMMENT_CHARS {
        return Err(QualityReject::CommentsTooShort {
            chars: comment_chars,
        });
    }

    let post_text = REPLY_RE
        .replace_all(&AUTHOR_AGE_RE.replace_all(&post_raw, ""), "")
        .trim()
        .to_string();
    let comment_text = REPLY_RE.replace_all(&comments, "").to_string();

    let total_words = word_count(title_text) + word_count(&post_text) + word_count(&comment_text);
    let text = format!(
        "RedditPostTitle : {title_text} \n\n RedditPost : {post_text} \n\n RedditComments : {comment_text}"
    );

    Ok(PageContent {
        text,
        word_count: total_words,
    })
}

/// Visible text of an element, one line per text node — close enough to the
/// rendered line structure for the author/age pattern to match.
fn element_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
