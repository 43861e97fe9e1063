//! Anchor patching utilities for built HTML pages.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::href::{HrefRewriter, LinkElement};

/// Anchor start tags plus the spans whose text is never markup: comments, scripts and styles.
///
/// Quoted attribute values may contain `>`. Unterminated inert spans run to the end of the
/// document, matching how browsers treat them.
fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r#"(?is)<!--.*?(?:-->|\z)"#,
            r#"|<script\b(?:[^>"']|"[^"]*"|'[^']*')*>.*?(?:</script\s*>|\z)"#,
            r#"|<style\b(?:[^>"']|"[^"]*"|'[^']*')*>.*?(?:</style\s*>|\z)"#,
            r#"|(?P<anchor><a(?:\s(?:[^>"']|"[^"]*"|'[^']*')*)?>)"#,
        ))
        .expect("invalid markup regex")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("invalid attribute regex")
    })
}

/// Result of rewriting the anchors of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlRewrite {
    /// Document text with rewritten anchors.
    pub text: String,
    /// Number of href values that changed.
    pub links_rewritten: usize,
}

/// `href` attribute value located inside an anchor tag.
#[derive(Debug)]
struct AnchorHref {
    span: Range<usize>,
    value: String,
    dirty: bool,
}

impl LinkElement for AnchorHref {
    fn href(&self) -> &str {
        &self.value
    }

    fn set_href(&mut self, href: String) {
        self.value = href;
        self.dirty = true;
    }
}

/// Collect the `href` values of every anchor start tag outside comments, scripts and styles.
fn collect_anchor_hrefs(document: &str) -> Vec<AnchorHref> {
    let mut anchors = Vec::new();

    for caps in markup_pattern().captures_iter(document) {
        let Some(tag) = caps.name("anchor") else {
            continue;
        };
        // Attributes sit between `<a` and the closing `>`.
        let body_start = tag.start() + 2;
        let body = &document[body_start..tag.end() - 1];

        let href = attribute_pattern()
            .captures_iter(body)
            .find(|attr| attr[1].eq_ignore_ascii_case("href"));
        let Some(value) = href.and_then(|attr| attr.get(2).or(attr.get(3)).or(attr.get(4))) else {
            continue;
        };

        anchors.push(AnchorHref {
            span: body_start + value.start()..body_start + value.end(),
            value: value.as_str().to_string(),
            dirty: false,
        });
    }

    anchors
}

/// Rewrite the internal anchors of an HTML document.
///
/// Only anchors whose href starts with the rewriter's base path are touched, and documents
/// without changes come back byte-identical.
pub fn rewrite_html_links(document: &str, rewriter: &HrefRewriter) -> HtmlRewrite {
    let mut anchors = collect_anchor_hrefs(document);
    let links_rewritten = rewriter.rewrite_links(&mut anchors);

    if links_rewritten == 0 {
        return HtmlRewrite {
            text: document.to_string(),
            links_rewritten,
        };
    }

    let mut text = String::with_capacity(document.len() + links_rewritten * 8);
    let mut cursor = 0;
    for anchor in anchors.iter().filter(|anchor| anchor.dirty) {
        text.push_str(&document[cursor..anchor.span.start]);
        text.push_str(&anchor.value);
        cursor = anchor.span.end;
    }
    text.push_str(&document[cursor..]);

    HtmlRewrite {
        text,
        links_rewritten,
    }
}
