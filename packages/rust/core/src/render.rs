//! Reading the host page before a run and preparing it for output after one.

use pagestitch_dom::Document;
use pagestitch_shared::{RenderConfig, Result, StitchOverrides, merge_globals};
use tracing::debug;

use crate::navigation;
use crate::stitcher::StitchReport;

/// Settings the host page assigns to `window.*` in its inline scripts.
pub fn host_overrides(live: &Document) -> StitchOverrides {
    let mut overrides = StitchOverrides::default();
    for script in live.inline_scripts() {
        merge_globals(&mut overrides, &script);
    }
    overrides
}

/// Prepare a stitched page for serialization: drop loader scripts that would
/// stitch it again, and carry smooth scrolling over as an inline script.
pub fn finalize(live: &mut Document, render: &RenderConfig, report: &StitchReport) -> Result<()> {
    let removed = strip_scripts(live, &render.strip_scripts)?;
    if removed > 0 {
        debug!(removed, "removed loader scripts");
    }

    if render.emit_scroll_script && report.scroll_links > 0 {
        navigation::append_scroll_script(live)?;
    }
    Ok(())
}

/// Remove every `<script src>` whose source contains one of `patterns`.
pub fn strip_scripts(live: &mut Document, patterns: &[String]) -> Result<usize> {
    let mut removed = 0;
    for script in live.select_all("script[src]")? {
        let matches = live
            .attr(script, "src")
            .is_some_and(|src| patterns.iter().any(|p| !p.is_empty() && src.contains(p.as_str())));
        if matches {
            live.remove(script);
            removed += 1;
        }
    }
    Ok(removed)
}
