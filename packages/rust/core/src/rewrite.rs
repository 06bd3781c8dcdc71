//! Relative reference rewriting.
//!
//! The reference document sits at `<root_path>index.html`, so its relative
//! `href`/`src` values are relative to that directory. Before its sections are
//! moved into the live page every such value is prefixed with `root_path`.
//! The rule is literal prefixing: `../img/a.png` with `root_path = "../"`
//! becomes `../../img/a.png`. Deployed pages depend on this exact output, so
//! no normalization is attempted.

use pagestitch_dom::Document;
use pagestitch_shared::Result;
use tracing::trace;

/// Attributes that carry resource references.
const REFERENCE_ATTRS: [&str; 2] = ["href", "src"];

/// Prefixes that mark a value as already absolute (or not a path at all).
const ABSOLUTE_PREFIXES: [&str; 4] = ["http", "//", "#", "mailto:"];

/// Whether `value` should be prefixed with the root path.
pub fn is_relative(value: &str) -> bool {
    !ABSOLUTE_PREFIXES.iter().any(|prefix| value.starts_with(prefix))
}

/// Rewrite one attribute value. Returns `None` when it must stay unchanged.
pub fn rewrite_value(root_path: &str, value: &str) -> Option<String> {
    if value.is_empty() || !is_relative(value) {
        return None;
    }
    Some(format!("{root_path}{value}"))
}

/// Rewrite every `href` and `src` in `doc`. Returns the number of attributes changed.
pub fn rewrite_references(doc: &mut Document, root_path: &str) -> Result<usize> {
    let mut rewritten = 0;

    for attr in REFERENCE_ATTRS {
        for node in doc.select_all(&format!("[{attr}]"))? {
            let Some(new_value) = doc
                .attr(node, attr)
                .and_then(|value| rewrite_value(root_path, value))
            else {
                continue;
            };
            trace!(attr, value = %new_value, "rewriting reference");
            if doc.set_attr(node, attr, &new_value) {
                rewritten += 1;
            }
        }
    }

    Ok(rewritten)
}
