//! Host-page globals.
//!
//! Landing pages configure the stitcher by assigning `window.ROOT_PATH`,
//! `window.HERO_IMAGE`, `window.BONUS_COPY` and `window.FORM_ACTION_URL` in an
//! inline script before the loader runs. We read the string-literal
//! assignments so a pre-rendered page honors the same settings.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::StitchOverrides;

/// Extract global assignments from the text of one inline script.
///
/// Later assignments to the same name win. Non-literal right-hand sides
/// (variables, expressions) are ignored.
pub fn scan_globals(script: &str) -> StitchOverrides {
    let mut overrides = StitchOverrides::default();
    merge_globals(&mut overrides, script);
    overrides
}

/// Like [`scan_globals`], folding the result into an existing set.
pub fn merge_globals(overrides: &mut StitchOverrides, script: &str) {
    static ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#"window\.(ROOT_PATH|HERO_IMAGE|BONUS_COPY|FORM_ACTION_URL)\s*=\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)"|`([^`]*)`)"#,
        )
        .expect("valid regex")
    });

    for caps in ASSIGN_RE.captures_iter(script) {
        let value = if let Some(m) = caps.get(2).or_else(|| caps.get(3)) {
            unescape(m.as_str())
        } else if let Some(m) = caps.get(4) {
            // Template literals keep their text as written.
            m.as_str().to_string()
        } else {
            continue;
        };

        let slot = match &caps[1] {
            "ROOT_PATH" => &mut overrides.root_path,
            "HERO_IMAGE" => &mut overrides.hero_image_url,
            "BONUS_COPY" => &mut overrides.bonus_copy_html,
            "FORM_ACTION_URL" => &mut overrides.form_action_url,
            _ => continue,
        };
        tracing::debug!(name = &caps[1], "found host-page global");
        *slot = Some(value);
    }
}

/// Resolve the backslash escapes that appear in quoted JS string literals.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
