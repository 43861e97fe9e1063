use tracing::{debug, trace};

use super::rules::transform_href;

/// Link-like handle exposing a readable and writable `href`.
pub trait LinkElement {
  /// Current href value.
  fn href(&self) -> &str;
  /// Replace the href value.
  fn set_href(&mut self, href: String);
}

impl LinkElement for String {
  fn href(&self) -> &str {
    self
  }

  fn set_href(&mut self, href: String) {
    *self = href;
  }
}

/// Rewrites internal links that live under a fixed base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HrefRewriter {
  base_path: String,
}

impl HrefRewriter {
  /// Create a rewriter for links starting with `base_path`.
  pub fn new(base_path: impl Into<String>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  /// Prefix identifying rewritable links.
  pub fn base_path(&self) -> &str {
    &self.base_path
  }

  /// Returns `true` when the href is under the base path and should be rewritten.
  pub fn is_in_scope(&self, href: &str) -> bool {
    href.starts_with(&self.base_path)
  }

  /// Apply the rewrite rules to a single href.
  pub fn transform(&self, href: &str) -> String {
    transform_href(href, &self.base_path)
  }

  /// Rewrite every in-scope link, returning how many hrefs were written.
  ///
  /// Links whose rewritten value equals the current one are left alone so callers backed by
  /// a live document do not see redundant mutations.
  pub fn rewrite_links<L: LinkElement>(&self, links: &mut [L]) -> usize {
    let mut written = 0;

    for link in links.iter_mut() {
      if !self.is_in_scope(link.href()) {
        continue;
      }

      let rewritten = self.transform(link.href());
      if rewritten == link.href() {
        trace!(href = link.href(), "link already qualified");
        continue;
      }

      debug!(from = link.href(), to = %rewritten, "rewriting link");
      link.set_href(rewritten);
      written += 1;
    }

    written
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct RecordingLink {
    href: String,
    writes: usize,
  }

  impl RecordingLink {
    fn new(href: &str) -> Self {
      Self {
        href: href.into(),
        writes: 0,
      }
    }
  }

  impl LinkElement for RecordingLink {
    fn href(&self) -> &str {
      &self.href
    }

    fn set_href(&mut self, href: String) {
      self.href = href;
      self.writes += 1;
    }
  }

  #[test]
  fn rewrites_only_links_under_the_base_path() {
    let rewriter = HrefRewriter::new("/src/pages");
    let mut links = vec![
      RecordingLink::new("/src/pages/view-booking"),
      RecordingLink::new("/assets/logo.png"),
      RecordingLink::new("https://example.com/src/pages"),
      RecordingLink::new("/src/pages#workshop"),
    ];

    let written = rewriter.rewrite_links(&mut links);

    assert_eq!(written, 2);
    assert_eq!(links[0].href, "/src/pages/view-booking.html");
    assert_eq!(links[1].href, "/assets/logo.png");
    assert_eq!(links[2].href, "https://example.com/src/pages");
    assert_eq!(links[3].href, "/src/pages/index.html#workshop");
    assert_eq!(links[1].writes, 0);
  }

  #[test]
  fn skips_writes_for_already_qualified_links() {
    let rewriter = HrefRewriter::new("/src/pages");
    let mut links = vec![RecordingLink::new("/src/pages/x.html#y")];

    assert_eq!(rewriter.rewrite_links(&mut links), 0);
    assert_eq!(links[0].writes, 0);
  }

  #[test]
  fn second_pass_writes_nothing() {
    let rewriter = HrefRewriter::new("/docs");
    let mut links = vec![
      String::from("/docs"),
      String::from("/docs/guide#intro"),
      String::from("/other"),
    ];

    assert_eq!(rewriter.rewrite_links(&mut links), 2);
    assert_eq!(rewriter.rewrite_links(&mut links), 0);
    assert_eq!(links, vec![
      "/docs/index.html".to_string(),
      "/docs/guide.html#intro".to_string(),
      "/other".to_string(),
    ]);
  }

  #[test]
  fn prefix_match_is_textual() {
    let rewriter = HrefRewriter::new("/src/pages");
    assert!(rewriter.is_in_scope("/src/pages"));
    assert!(rewriter.is_in_scope("/src/pagesextra"));
    assert!(!rewriter.is_in_scope("src/pages"));
  }
}
