//! URL classification. One pure function drives fetch strategy and
//! summarizer routing; every downstream match over [`ContentKind`] is
//! exhaustive.

use url::Url;

/// Content shape of a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Ordinary article or blog page.
    Generic,
    /// Forum thread with a post body and comments (Reddit).
    DiscussionPost,
    /// Platforms we never fetch or summarize (Twitter/X).
    SocialMedia,
}

const DISCUSSION_HOSTS: &[&str] = &["reddit.com", "redd.it"];
const SOCIAL_HOSTS: &[&str] = &["twitter.com", "x.com"];

/// Classify a URL by host. Total: malformed or hostless input is `Generic`.
pub fn classify(url: &str) -> ContentKind {
    let host = match Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
    {
        Some(host) => host,
        None => return ContentKind::Generic,
    };

    if DISCUSSION_HOSTS.iter().any(|d| host_matches(&host, d)) {
        ContentKind::DiscussionPost
    } else if SOCIAL_HOSTS.iter().any(|d| host_matches(&host, d)) {
        ContentKind::SocialMedia
    } else {
        ContentKind::Generic
    }
}

/// True for the domain itself or any subdomain of it.
fn host_matches(host: &str, domain: &str) -> bool {
    host.strip_suffix(domain)
        .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with('.'))
}
