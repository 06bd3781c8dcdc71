//! In-page anchor navigation.

use pagestitch_dom::{ClickHandler, Document};
use pagestitch_shared::Result;

/// Inline script reproducing [`wire_smooth_scroll`] in a browser, for
/// serialized output where registered handlers cannot travel.
pub const SMOOTH_SCROLL_SCRIPT: &str = r##"
document.querySelectorAll('a[href^="#"]').forEach(function (anchor) {
    anchor.addEventListener('click', function (e) {
        e.preventDefault();
        var target = document.getElementById(this.getAttribute('href').substring(1));
        if (target) {
            target.scrollIntoView({ behavior: 'smooth' });
        }
    });
});
"##;

/// Attach a smooth-scroll click handler to every anchor whose `href` starts
/// with `#`. Returns the number of anchors wired.
pub fn wire_smooth_scroll(live: &mut Document) -> Result<usize> {
    let anchors = live.select_all(r##"a[href^="#"]"##)?;
    for &anchor in &anchors {
        live.add_click_listener(anchor, ClickHandler::SmoothScroll);
    }
    Ok(anchors.len())
}

/// Append [`SMOOTH_SCROLL_SCRIPT`] to the end of the body.
pub fn append_scroll_script(live: &mut Document) -> Result<()> {
    let script = live.create_element("script", &[]);
    live.set_text(script, SMOOTH_SCROLL_SCRIPT);
    let body = live.body()?;
    live.append_child(body, script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagestitch_dom::{Scroll, ScrollBehavior};

    const PAGE: &str = r##"<html><body>
        <nav><a href="#form">申し込む</a><a href="#missing">?</a><a href="../privacy.html">privacy</a><a href="#">top</a></nav>
        <section id="form"><form></form></section>
    </body></html>"##;

    #[test]
    fn matching_fragment_scrolls_smoothly() {
        let mut live = Document::parse(PAGE);
        assert_eq!(wire_smooth_scroll(&mut live).unwrap(), 3);

        let anchors = live.select_all("nav a").unwrap();
        let section = live.element_by_id("form").unwrap();
        let outcome = live.click(anchors[0]);
        assert!(outcome.default_prevented);
        assert_eq!(
            outcome.scroll,
            Some(Scroll {
                target: section,
                behavior: ScrollBehavior::Smooth
            })
        );
    }

    #[test]
    fn unmatched_fragment_only_suppresses_navigation() {
        let mut live = Document::parse(PAGE);
        wire_smooth_scroll(&mut live).unwrap();
        let anchors = live.select_all("nav a").unwrap();

        for anchor in [anchors[1], anchors[3]] {
            let outcome = live.click(anchor);
            assert!(outcome.default_prevented);
            assert!(outcome.scroll.is_none());
        }
    }

    #[test]
    fn other_links_are_not_wired() {
        let mut live = Document::parse(PAGE);
        wire_smooth_scroll(&mut live).unwrap();
        let anchors = live.select_all("nav a").unwrap();
        assert_eq!(live.listener_count(anchors[2]), 0);
        assert!(!live.click(anchors[2]).default_prevented);
    }

    #[test]
    fn scroll_script_is_last_in_body() {
        let mut live = Document::parse(PAGE);
        append_scroll_script(&mut live).unwrap();
        let body = live.body().unwrap();
        let last = *live.child_elements(body).last().unwrap();
        assert_eq!(live.tag_name(last), Some("script"));
        assert!(live.text(last).contains("scrollIntoView"));
    }
}
