//! Per-page content overrides applied after the sections are injected.

use pagestitch_dom::{Document, NodeId};
use pagestitch_shared::{MarkersConfig, Result};
use tracing::{debug, info};

/// Inline style of the bonus copy heading.
const BONUS_COPY_STYLE: &str = "text-align: center; margin-bottom: 24px; font-size: 1.8rem; \
                                font-weight: bold; color: #578A7C; line-height: 1.4;";

/// Viewport width at and below which soft breaks are shown.
const MOBILE_MAX_WIDTH_PX: u32 = 768;

/// Point the first hero image at `url`. Returns whether an element was found.
pub fn replace_hero_image(live: &mut Document, markers: &MarkersConfig, url: &str) -> bool {
    let Some(hero) = live.elements_with_class(&markers.hero_image).into_iter().next() else {
        debug!(class = %markers.hero_image, "no hero image, skipping override");
        return false;
    };
    live.set_attr(hero, "src", url)
}

/// Insert a heading holding `markup` right before the first package image,
/// and register the soft-break rule in the head.
///
/// Returns the new heading, or `None` if there is no package image.
pub fn insert_bonus_copy(
    live: &mut Document,
    markers: &MarkersConfig,
    markup: &str,
) -> Result<Option<NodeId>> {
    let Some(package) = live.elements_with_class(&markers.package_image).into_iter().next() else {
        debug!(class = %markers.package_image, "no package image, skipping bonus copy");
        return Ok(None);
    };

    let heading = live.create_element(
        "h3",
        &[("class", markers.bonus_copy.as_str()), ("style", BONUS_COPY_STYLE)],
    );
    live.set_inner_html(heading, markup)?;

    let style = live.create_element("style", &[]);
    live.set_text(style, &soft_break_rule(&markers.soft_break));
    let head = live.head()?;
    live.append_child(head, style)?;

    live.insert_before(package, heading)?;
    Ok(Some(heading))
}

/// Stylesheet hiding `.{class}` except on narrow viewports.
pub fn soft_break_rule(class: &str) -> String {
    format!(
        "\n.{class} {{ display: none; }}\n\
         @media (max-width: {MOBILE_MAX_WIDTH_PX}px) {{\n    .{class} {{ display: block; }}\n}}\n"
    )
}

/// Set `action` on every marked form. Returns how many forms were updated.
pub fn replace_form_actions(live: &mut Document, markers: &MarkersConfig, url: &str) -> Result<usize> {
    let mut updated = 0;
    for form in live.select_all("form")? {
        if !live.has_class(form, &markers.form) {
            continue;
        }
        if live.set_attr(form, "action", url) {
            info!(action = url, "form action URL updated");
            updated += 1;
        }
    }
    Ok(updated)
}
