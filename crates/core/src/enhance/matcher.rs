//! Product-mention scanning over agent output.
//!
//! A [`MentionMatcher`] turns a message into a lazy, left-to-right sequence of
//! [`Match`]es. Each match carries the byte span it covers so the enhancer can
//! splice cards without touching anything outside that span.

use std::ops::Range;

use regex::Regex;

use crate::config::MatchStrategy;
use crate::domain::product::Product;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub span: Range<usize>,
    pub candidate: String,
}

pub trait MentionMatcher: Send + Sync {
    fn find_matches<'t>(&'t self, text: &'t str) -> Box<dyn Iterator<Item = Match> + 't>;
}

/// Matches `<tag>Product Name</tag>` elements. The span covers the whole element.
#[derive(Clone, Debug)]
pub struct MarkerMatcher {
    pattern: Regex,
}

impl MarkerMatcher {
    pub fn new(tag: &str) -> Result<Self, regex::Error> {
        let tag = regex::escape(tag.trim());
        let pattern = Regex::new(&format!(r"(?is)<{tag}(?:\s[^>]*)?>(?P<title>.*?)</{tag}\s*>"))?;
        Ok(Self { pattern })
    }
}

impl MentionMatcher for MarkerMatcher {
    fn find_matches<'t>(&'t self, text: &'t str) -> Box<dyn Iterator<Item = Match> + 't> {
        Box::new(self.pattern.captures_iter(text).filter_map(|captures| {
            let whole = captures.get(0)?;
            let candidate = clean_candidate(captures.name("title")?.as_str());
            (!candidate.is_empty()).then(|| Match { span: whole.range(), candidate })
        }))
    }
}

/// Matches loosely delimited titles: optional `**bold**` text ending at
/// ` - Price`, `:`, a line break or the end of the message.
#[derive(Clone, Debug)]
pub struct TitleLineMatcher {
    pattern: Regex,
}

impl TitleLineMatcher {
    pub fn new() -> Result<Self, regex::Error> {
        let pattern = Regex::new(r"(?i)(\*\*)?(?P<title>[^\n*]+?)(\*\*)?( - Price|:|\n|$)")?;
        Ok(Self { pattern })
    }
}

impl MentionMatcher for TitleLineMatcher {
    fn find_matches<'t>(&'t self, text: &'t str) -> Box<dyn Iterator<Item = Match> + 't> {
        Box::new(self.pattern.captures_iter(text).filter_map(|captures| {
            let whole = captures.get(0)?;
            let candidate = clean_candidate(captures.name("title")?.as_str());
            (!candidate.is_empty()).then(|| Match { span: whole.range(), candidate })
        }))
    }
}

pub fn matcher_for(
    strategy: MatchStrategy,
    marker_tag: &str,
) -> Result<Box<dyn MentionMatcher>, regex::Error> {
    Ok(match strategy {
        MatchStrategy::Marker => Box::new(MarkerMatcher::new(marker_tag)?),
        MatchStrategy::TitleLine => Box::new(TitleLineMatcher::new()?),
    })
}

/// Catalog index of the first product whose title contains the candidate or is contained by it,
/// compared case-insensitively.
///
/// The containment test runs in both directions, so short or overlapping names
/// can match the wrong product ("Hat" matches "Red Hat" and "Hat Stand").
/// Products with a blank title never match.
pub fn find_product_position(candidate: &str, catalog: &[Product]) -> Option<usize> {
    let query = candidate.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    catalog.iter().position(|product| {
        let title = product.title.trim().to_lowercase();
        !title.is_empty() && (query.contains(&title) || title.contains(&query))
    })
}

fn clean_candidate(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let decoded = text
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    decoded.trim().trim_matches(|ch: char| ch == '"' || ch == '*').trim().to_string()
}
