/// Extension marker appended to internal paths.
pub const HTML_EXTENSION: &str = ".html";

/// Document served when a link targets the base path itself.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Split an href at the first `#`.
///
/// The fragment keeps its leading `#` and is empty when the href has none, so the two halves
/// always concatenate back to the input.
pub fn split_fragment(href: &str) -> (&str, &str) {
  match href.find('#') {
    Some(index) => href.split_at(index),
    None => (href, ""),
  }
}

/// Rewrite an internal href so it points at the `.html` resource.
///
/// Hrefs that already mention `.html` are returned untouched, which makes the transform
/// idempotent. The bare base path maps to its index document and every other path gets the
/// extension appended in front of the fragment.
pub fn transform_href(href: &str, base_path: &str) -> String {
  if href.contains(HTML_EXTENSION) {
    return href.to_string();
  }

  let (before, fragment) = split_fragment(href);
  let rewritten = if before == base_path {
    format!("{base_path}/{INDEX_DOCUMENT}")
  } else {
    format!("{before}{HTML_EXTENSION}")
  };

  format!("{rewritten}{fragment}")
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: &str = "/src/pages";

  #[test]
  fn appends_extension_to_nested_pages() {
    assert_eq!(
      transform_href("/src/pages/view-booking", BASE),
      "/src/pages/view-booking.html"
    );
    assert_eq!(transform_href("/src/pages/x", BASE), "/src/pages/x.html");
  }

  #[test]
  fn maps_base_path_to_index_document() {
    assert_eq!(transform_href("/src/pages", BASE), "/src/pages/index.html");
  }

  #[test]
  fn preserves_fragments() {
    assert_eq!(
      transform_href("/src/pages/view-booking#test", BASE),
      "/src/pages/view-booking.html#test"
    );
    assert_eq!(
      transform_href("/src/pages#workshop", BASE),
      "/src/pages/index.html#workshop"
    );
  }

  #[test]
  fn keeps_empty_fragment_marker() {
    assert_eq!(transform_href("/src/pages/x#", BASE), "/src/pages/x.html#");
    assert_eq!(transform_href("/src/pages#", BASE), "/src/pages/index.html#");
  }

  #[test]
  fn leaves_qualified_hrefs_untouched() {
    assert_eq!(
      transform_href("/src/pages/x.html#y", BASE),
      "/src/pages/x.html#y"
    );
    assert_eq!(
      transform_href("/src/pages/index.html", BASE),
      "/src/pages/index.html"
    );
  }

  #[test]
  fn trailing_slash_is_not_the_base_path() {
    assert_eq!(transform_href("/src/pages/", BASE), "/src/pages/.html");
  }

  #[test]
  fn passes_unrelated_strings_through_the_same_rules() {
    assert_eq!(transform_href("/about", BASE), "/about.html");
    assert_eq!(transform_href("", BASE), ".html");
    assert_eq!(transform_href("#top", BASE), ".html#top");
  }

  #[test]
  fn is_idempotent() {
    let samples = [
      "/src/pages",
      "/src/pages/view-booking",
      "/src/pages#workshop",
      "/src/pages/a/b#c#d",
      "/src/pages/x.html",
      "relative/page",
      "",
      "#",
      "/src/pagesextra",
    ];

    for sample in samples {
      let once = transform_href(sample, BASE);
      assert_eq!(transform_href(&once, BASE), once, "input {sample:?}");
    }
  }

  #[test]
  fn splits_at_first_hash_only() {
    assert_eq!(split_fragment("/a#b#c"), ("/a", "#b#c"));
    assert_eq!(split_fragment("/a"), ("/a", ""));
    assert_eq!(split_fragment("#"), ("", "#"));
  }
}
