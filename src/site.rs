//! Site pass rewriting the anchors of every page in a built site.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use same_file::is_same_file;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BehaviorConfig;
use crate::href::HrefRewriter;
use crate::html::rewrite_html_links;
use crate::selection::PageInclusion;

/// File recording which output entries a mirrored pass produced.
///
/// Only entries listed here are ever pruned, so anything else living in the output root
/// survives a pass.
pub const OUTPUT_MANIFEST_FILE: &str = ".page-behaviors-output.json";

/// Per-page outcome of a site pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
  /// Page path relative to the site root, using forward slashes.
  pub path: String,
  /// Number of anchors rewritten in the page.
  pub links_rewritten: usize,
}

/// Summary of a site pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteReport {
  /// Pages whose anchors changed.
  pub pages: Vec<PageReport>,
  /// Number of selected pages that were inspected.
  pub pages_scanned: usize,
  /// Number of pages with at least one rewritten anchor.
  pub pages_changed: usize,
  /// Total anchors rewritten across all pages.
  pub links_rewritten: usize,
  /// Non-page files (and unselected pages) installed into a separate output root.
  pub files_mirrored: usize,
  /// Output files from an earlier pass whose source no longer exists.
  pub files_pruned: usize,
  /// Whether the pass ran without touching the filesystem.
  pub dry_run: bool,
}

/// Entries written into the output root by the last mirrored pass.
#[derive(Debug, Default, Serialize, Deserialize)]
struct OutputManifest {
  #[serde(default)]
  files: BTreeSet<String>,
}

/// Walks a site directory and rewrites internal anchors in its pages.
pub struct SiteRewriter<'a, S: PageInclusion> {
  config: &'a BehaviorConfig,
  rewriter: HrefRewriter,
  source_root: PathBuf,
  output_root: PathBuf,
  selection: &'a S,
  dry_run: bool,
}

impl<'a, S: PageInclusion> SiteRewriter<'a, S> {
  /// Create a pass reading from `source_root` and writing to `output_root`.
  ///
  /// Passing the same directory twice rewrites the site in place.
  pub fn new(
    config: &'a BehaviorConfig,
    source_root: impl Into<PathBuf>,
    output_root: impl Into<PathBuf>,
    selection: &'a S,
  ) -> Self {
    Self {
      config,
      rewriter: config.rewriter(),
      source_root: source_root.into(),
      output_root: output_root.into(),
      selection,
      dry_run: false,
    }
  }

  /// Compute the report without writing anything.
  pub fn dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  fn in_place(&self) -> bool {
    self.source_root == self.output_root
      || is_same_file(&self.source_root, &self.output_root).unwrap_or(false)
  }

  /// Run the pass.
  pub fn run(&self) -> Result<SiteReport> {
    if !self.source_root.is_dir() {
      anyhow::bail!("site root {} is not a directory", self.source_root.display());
    }

    let in_place = self.in_place();
    if !in_place && is_nested_within(&self.source_root, &self.output_root) {
      anyhow::bail!(
        "site root {} is inside output root {}; choose an output outside the site",
        self.source_root.display(),
        self.output_root.display()
      );
    }

    let mut files = Vec::new();
    collect_site_files(
      &self.source_root,
      Path::new(""),
      (!in_place).then_some(self.output_root.as_path()),
      &mut files,
    )?;

    info!(
      root = %self.source_root.display(),
      base_path = self.rewriter.base_path(),
      files = files.len(),
      in_place,
      dry_run = self.dry_run,
      "rewriting site links"
    );

    let mut report = SiteReport {
      dry_run: self.dry_run,
      ..SiteReport::default()
    };
    let mut written = BTreeSet::new();

    for relative in files {
      let source = self.source_root.join(&relative);
      let destination = self.output_root.join(&relative);
      let page_path = relative.to_string_lossy().replace('\\', "/");
      let is_page = self.config.is_html_page(&relative) && self.selection.is_included(&page_path);

      if !is_page {
        if !in_place {
          if !self.dry_run {
            ensure_parent(&destination)?;
            install_site_file(&source, &destination)
              .with_context(|| format!("failed to install {}", destination.display()))?;
          }
          report.files_mirrored += 1;
          written.insert(page_path);
        }
        continue;
      }

      let text = fs::read_to_string(&source)
        .with_context(|| format!("failed to read {}", source.display()))?;
      let rewrite = rewrite_html_links(&text, &self.rewriter);
      report.pages_scanned += 1;

      let needs_write = !in_place || rewrite.links_rewritten > 0;
      if needs_write && !self.dry_run {
        ensure_parent(&destination)?;
        write_page(&destination, &rewrite.text)?;
      }
      if !in_place {
        written.insert(page_path.clone());
      }

      if rewrite.links_rewritten > 0 {
        debug!(page = %page_path, links = rewrite.links_rewritten, "page rewritten");
        report.pages_changed += 1;
        report.links_rewritten += rewrite.links_rewritten;
        report.pages.push(PageReport {
          path: page_path,
          links_rewritten: rewrite.links_rewritten,
        });
      }
    }

    if !in_place {
      let previous = load_output_manifest(&self.output_root);
      let stale: Vec<&String> = previous.files.difference(&written).collect();
      report.files_pruned = if self.dry_run {
        stale.len()
      } else {
        let pruned = prune_stale_outputs(&self.output_root, stale)
          .with_context(|| format!("failed to prune {}", self.output_root.display()))?;
        write_output_manifest(&self.output_root, &OutputManifest { files: written })?;
        pruned
      };
    }

    info!(
      pages = report.pages_scanned,
      changed = report.pages_changed,
      links = report.links_rewritten,
      mirrored = report.files_mirrored,
      pruned = report.files_pruned,
      "site pass complete"
    );

    Ok(report)
  }
}

/// Returns `true` when `inner` is `outer` or lives below it.
fn is_nested_within(inner: &Path, outer: &Path) -> bool {
  if inner.starts_with(outer) {
    return true;
  }

  match (inner.canonicalize(), outer.canonicalize()) {
    (Ok(inner), Ok(outer)) => inner.starts_with(outer),
    _ => false,
  }
}

/// Collect site-relative file paths in sorted order, skipping dot-entries and `skip_dir`.
fn collect_site_files(
  root: &Path,
  relative: &Path,
  skip_dir: Option<&Path>,
  files: &mut Vec<PathBuf>,
) -> Result<()> {
  let dir = root.join(relative);
  let mut entries = fs::read_dir(&dir)
    .with_context(|| format!("failed to read directory {}", dir.display()))?
    .collect::<std::io::Result<Vec<_>>>()
    .with_context(|| format!("failed to list {}", dir.display()))?;
  entries.sort_by_key(|entry| entry.file_name());

  for entry in entries {
    let file_name = entry.file_name();
    if file_name.to_string_lossy().starts_with('.') {
      continue;
    }

    let path = entry.path();
    let child_relative = relative.join(&file_name);
    let file_type = entry.file_type()?;

    if file_type.is_dir() {
      if skip_dir.is_some_and(|skip| path == skip || is_same_file(&path, skip).unwrap_or(false)) {
        continue;
      }
      collect_site_files(root, &child_relative, skip_dir, files)?;
    } else if file_type.is_file() {
      files.push(child_relative);
    }
  }

  Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  Ok(())
}

/// Write a page, unlinking any existing destination first so hard-linked sources stay intact.
fn write_page(destination: &Path, text: &str) -> Result<()> {
  match fs::remove_file(destination) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => {
      return Err(err).with_context(|| format!("failed to replace {}", destination.display()));
    }
  }
  fs::write(destination, text)
    .with_context(|| format!("failed to write {}", destination.display()))
}

fn install_site_file(source: &Path, destination: &Path) -> std::io::Result<()> {
  if destination.exists() {
    if is_same_file(source, destination)? {
      return Ok(());
    }
    fs::remove_file(destination)?;
  }

  match fs::hard_link(source, destination) {
    Ok(_) => Ok(()),
    Err(err) => {
      if err.kind() == ErrorKind::AlreadyExists {
        Ok(())
      } else {
        fs::copy(source, destination).map(|_| ())
      }
    }
  }
}

/// Read the manifest of the previous pass. A missing or unreadable manifest prunes nothing.
fn load_output_manifest(output_root: &Path) -> OutputManifest {
  let path = output_root.join(OUTPUT_MANIFEST_FILE);
  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(err) if err.kind() == ErrorKind::NotFound => return OutputManifest::default(),
    Err(err) => {
      warn!(path = %path.display(), error = %err, "output manifest unreadable, nothing pruned");
      return OutputManifest::default();
    }
  };

  serde_json::from_str(&content).unwrap_or_else(|err| {
    warn!(path = %path.display(), error = %err, "output manifest invalid, nothing pruned");
    OutputManifest::default()
  })
}

fn write_output_manifest(output_root: &Path, manifest: &OutputManifest) -> Result<()> {
  let path = output_root.join(OUTPUT_MANIFEST_FILE);
  fs::create_dir_all(output_root)
    .with_context(|| format!("failed to create {}", output_root.display()))?;
  let json = serde_json::to_string_pretty(manifest)?;
  fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Manifest entries must be plain relative paths without `..`, roots or dot-entries.
fn is_prunable_entry(relative: &str) -> bool {
  let path = Path::new(relative);
  !relative.is_empty()
    && path.components().all(|component| match component {
      Component::Normal(name) => !name.to_string_lossy().starts_with('.'),
      _ => false,
    })
}

/// Remove stale files recorded by an earlier pass, then any directories they leave empty.
fn prune_stale_outputs<'s>(
  root: &Path,
  stale: impl IntoIterator<Item = &'s String>,
) -> std::io::Result<usize> {
  let mut pruned = 0;

  for relative in stale {
    if !is_prunable_entry(relative) {
      warn!(entry = %relative, "ignoring unsafe output manifest entry");
      continue;
    }

    let path = root.join(relative);
    match fs::remove_file(&path) {
      Ok(()) => pruned += 1,
      Err(err) if err.kind() == ErrorKind::NotFound => {}
      Err(err) => return Err(err),
    }

    let mut dir = path.parent();
    while let Some(current) = dir {
      if current == root || !current.starts_with(root) || fs::remove_dir(current).is_err() {
        break;
      }
      dir = current.parent();
    }
  }

  Ok(pruned)
}
