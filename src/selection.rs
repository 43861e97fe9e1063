//! Helpers used to filter which pages a site pass rewrites.
//!
//! Rules are site-relative paths compared segment by segment. A `*` inside a segment matches
//! any run of characters except `/`, and a rule matching a directory also covers every page
//! beneath it. When several rules match a page the one with the most segments decides, and an
//! exclude beats an include of the same depth.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

/// Trait describing selection filters for site pages.
pub trait PageInclusion {
  /// Returns `true` when the page at the site-relative path should be rewritten.
  fn is_included(&self, page_path: &str) -> bool;
}

/// Accepts every page.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPages;

impl PageInclusion for AllPages {
  fn is_included(&self, _page_path: &str) -> bool {
    true
  }
}

/// Default selection file name searched for next to the configuration.
pub const DEFAULT_SELECTION_FILE: &str = "pages.local.json";

#[derive(Debug, Default, Deserialize)]
struct PageSelectionFile {
  #[serde(default)]
  include: Vec<String>,
  #[serde(default)]
  exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
  Include,
  Exclude,
}

/// One compiled path rule.
#[derive(Debug, Clone)]
struct PathRule {
  kind: RuleKind,
  depth: usize,
  matcher: Regex,
}

impl PathRule {
  fn compile(kind: RuleKind, rule: &str) -> Result<Self, PageSelectionError> {
    let invalid = |reason| PageSelectionError::InvalidRule {
      rule: rule.to_string(),
      reason,
    };

    let segments: Vec<&str> = rule.split('/').filter(|segment| !segment.is_empty()).collect();
    if segments.iter().any(|segment| matches!(*segment, "." | "..")) {
      return Err(invalid("relative segments are not allowed"));
    }
    if segments.iter().any(|segment| segment.contains('\\')) {
      return Err(invalid("use `/` to separate segments"));
    }

    let body = segments
      .iter()
      .map(|segment| {
        segment
          .split('*')
          .map(regex::escape)
          .collect::<Vec<_>>()
          .join("[^/]*")
      })
      .collect::<Vec<_>>()
      .join("/");
    let matcher =
      Regex::new(&format!("^{body}(?:/.*)?$")).map_err(|_| invalid("unsupported pattern"))?;

    Ok(Self {
      kind,
      depth: segments.len(),
      matcher,
    })
  }
}

/// Include/exclude rules scoped by site-relative path.
#[derive(Debug, Clone, Default)]
pub struct PageSelection {
  rules: Vec<PathRule>,
  has_includes: bool,
}

/// Errors that can occur while loading the selection configuration.
#[derive(Debug)]
pub enum PageSelectionError {
  /// Failed to read the selection file from disk.
  Read {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// Failed to parse the JSON selection file.
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
  /// A rule cannot name a page inside the site.
  InvalidRule {
    /// Rule as written.
    rule: String,
    /// Why it was rejected.
    reason: &'static str,
  },
}

impl PageSelection {
  /// Load rules from the selection file, treating a missing file as "select everything".
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, PageSelectionError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(Self::default());
      }
      Err(err) => {
        return Err(PageSelectionError::Read {
          path: path.to_path_buf(),
          source: err,
        });
      }
    };

    let file: PageSelectionFile =
      serde_json::from_str(&contents).map_err(|err| PageSelectionError::Parse {
        path: path.to_path_buf(),
        source: err,
      })?;
    Self::from_rules(file.include, file.exclude)
  }

  /// Build a selection from explicit rule lists.
  pub fn from_rules(
    include: impl IntoIterator<Item = String>,
    exclude: impl IntoIterator<Item = String>,
  ) -> Result<Self, PageSelectionError> {
    let mut rules = Vec::new();
    for rule in normalise_list(include) {
      rules.push(PathRule::compile(RuleKind::Include, &rule)?);
    }
    let has_includes = !rules.is_empty();
    for rule in normalise_list(exclude) {
      rules.push(PathRule::compile(RuleKind::Exclude, &rule)?);
    }

    Ok(Self {
      rules,
      has_includes,
    })
  }

  /// Determine whether a page should be rewritten.
  pub fn is_included(&self, page_path: &str) -> bool {
    let page_path = page_path.trim_matches('/');
    let decisive = self
      .rules
      .iter()
      .filter(|rule| rule.matcher.is_match(page_path))
      .max_by_key(|rule| (rule.depth, rule.kind == RuleKind::Exclude));

    match decisive {
      Some(rule) => rule.kind == RuleKind::Include,
      None => !self.has_includes,
    }
  }

  /// Returns true when no filtering rules are active.
  pub fn is_unfiltered(&self) -> bool {
    self.rules.is_empty()
  }
}

impl PageInclusion for PageSelection {
  fn is_included(&self, page_path: &str) -> bool {
    PageSelection::is_included(self, page_path)
  }
}

impl std::fmt::Display for PageSelectionError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Read { path, source } => {
        write!(f, "failed to read {}: {}", path.display(), source)
      }
      Self::Parse { path, source } => {
        write!(f, "failed to parse {}: {}", path.display(), source)
      }
      Self::InvalidRule { rule, reason } => write!(f, "invalid page rule `{rule}`: {reason}"),
    }
  }
}

impl std::error::Error for PageSelectionError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Read { source, .. } => Some(source),
      Self::Parse { source, .. } => Some(source),
      Self::InvalidRule { .. } => None,
    }
  }
}

/// Trim rules and drop blanks and duplicates.
fn normalise_list(values: impl IntoIterator<Item = String>) -> BTreeSet<String> {
  values
    .into_iter()
    .map(|value| value.trim().trim_matches('/').to_string())
    .filter(|value| !value.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn selection(include: &[&str], exclude: &[&str]) -> PageSelection {
    PageSelection::from_rules(
      include.iter().map(|rule| rule.to_string()),
      exclude.iter().map(|rule| rule.to_string()),
    )
    .expect("rules should compile")
  }

  #[test]
  fn defaults_to_including_all_pages() {
    let selection = PageSelection::default();
    assert!(selection.is_included("index.html"));
    assert!(selection.is_unfiltered());
  }

  #[test]
  fn directory_rules_cover_whole_segments_only() {
    let selection = selection(&[], &["drafts", "", " /legacy/ "]);

    assert!(!selection.is_included("drafts/post.html"));
    assert!(!selection.is_included("legacy/old.html"));
    assert!(selection.is_included("drafts-archive/post.html"));
    assert!(selection.is_included("index.html"));
  }

  #[test]
  fn include_rules_restrict_to_their_scope() {
    let selection = selection(&["blog"], &[]);

    assert!(selection.is_included("blog/index.html"));
    assert!(selection.is_included("/blog/2024/post.html"));
    assert!(!selection.is_included("about.html"));
  }

  #[test]
  fn deeper_rules_override_shallower_ones() {
    let selection = selection(
      &["blog", "blog/drafts/launch.html", "about.html"],
      &["blog/drafts", "about.html"],
    );

    assert!(selection.is_included("blog/post.html"));
    assert!(!selection.is_included("blog/drafts/wip.html"));
    assert!(selection.is_included("blog/drafts/launch.html"));
    assert!(!selection.is_included("about.html"));
  }

  #[test]
  fn wildcards_stay_inside_one_segment() {
    let selection = selection(&[], &["*/drafts", "*.htm"]);

    assert!(!selection.is_included("blog/drafts/a.html"));
    assert!(!selection.is_included("news/drafts/b.html"));
    assert!(selection.is_included("blog/archive/drafts.html"));
    assert!(!selection.is_included("legacy.htm"));
    assert!(selection.is_included("blog/legacy.htm"));
    assert!(selection.is_included("legacy.html"));
  }

  #[test]
  fn rule_text_is_matched_literally() {
    let selection = selection(&["docs/v1.0"], &[]);

    assert!(selection.is_included("docs/v1.0/index.html"));
    assert!(!selection.is_included("docs/v100/index.html"));
  }

  #[test]
  fn rejects_rules_that_leave_the_site() {
    let err = PageSelection::from_rules(vec!["../secrets".into()], Vec::new()).unwrap_err();
    assert!(matches!(err, PageSelectionError::InvalidRule { .. }));
    assert!(err.to_string().contains("../secrets"));
  }

  #[test]
  fn load_from_path_returns_default_for_missing_file() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(DEFAULT_SELECTION_FILE);

    let selection =
      PageSelection::load_from_path(&path).expect("missing files should not produce an error");

    assert!(selection.is_unfiltered());
  }

  #[test]
  fn load_from_path_reads_configuration() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(DEFAULT_SELECTION_FILE);
    std::fs::write(&path, r#"{"include": ["docs"], "exclude": ["docs/internal", ""]}"#)
      .expect("failed to write selection file");

    let selection =
      PageSelection::load_from_path(&path).expect("configuration should load successfully");

    assert!(!selection.is_unfiltered());
    assert!(selection.is_included("docs/guide.html"));
    assert!(!selection.is_included("docs/internal/notes.html"));
    assert!(!selection.is_included("index.html"));
  }

  #[test]
  fn load_from_path_reports_parse_errors_with_path() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(DEFAULT_SELECTION_FILE);
    std::fs::write(&path, "{not json").expect("failed to write selection file");

    let err = PageSelection::load_from_path(&path).unwrap_err();
    assert!(matches!(err, PageSelectionError::Parse { .. }));
    assert!(err.to_string().contains(DEFAULT_SELECTION_FILE));
  }
}
