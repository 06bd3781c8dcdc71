//! The stitching pipeline: stylesheets → fetch → rewrite → inject → overrides → navigation.

use serde::Serialize;
use tracing::{debug, error, info, instrument};
use url::Url;

use pagestitch_dom::Document;
use pagestitch_fetch::{Fetcher, resolve};
use pagestitch_shared::{
    AppConfig, MarkersConfig, Result, StitchConfig, StitchError, StylesheetsConfig,
};

use crate::{navigation, overrides, rewrite};

/// Sections moved from the reference document, in append order.
pub const SECTIONS: [&str; 3] = ["header", "main", "footer"];

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StitchStatus {
    /// Every step ran.
    Completed,
    /// The reference document could not be used; the failure renderer ran.
    Degraded { error: String },
}

/// Summary of what a run changed in the live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StitchReport {
    pub status: StitchStatus,
    /// Resolved location of the reference document.
    pub reference_url: Option<String>,
    /// Stylesheet links added to the head.
    pub stylesheets: usize,
    /// `href`/`src` attributes rewritten in the reference document.
    pub rewritten: usize,
    /// Sections appended to the body, in order.
    pub sections: Vec<String>,
    /// Source of the re-created validation script, if any.
    pub validation_script: Option<String>,
    pub hero_replaced: bool,
    pub bonus_copy_inserted: bool,
    pub forms_updated: usize,
    /// In-page anchors given a smooth-scroll handler.
    pub scroll_links: usize,
}

impl StitchReport {
    fn new() -> Self {
        Self {
            status: StitchStatus::Completed,
            reference_url: None,
            stylesheets: 0,
            rewritten: 0,
            sections: Vec::new(),
            validation_script: None,
            hero_replaced: false,
            bonus_copy_inserted: false,
            forms_updated: 0,
            scroll_links: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, StitchStatus::Degraded { .. })
    }
}

// ---------------------------------------------------------------------------
// Failure rendering
// ---------------------------------------------------------------------------

/// Renders the degraded page after a failed run.
pub trait FailureRenderer {
    fn render_failure(&self, live: &mut Document, error: &StitchError);
}

/// Replace the whole body with a single paragraph holding `message`.
///
/// The message is inserted as markup, so it may carry inline tags.
#[derive(Debug, Clone)]
pub struct ReplaceBody {
    pub message: String,
}

impl FailureRenderer for ReplaceBody {
    fn render_failure(&self, live: &mut Document, _error: &StitchError) {
        let body = match live.body() {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "cannot render failure message");
                return;
            }
        };
        live.clear_children(body);
        let paragraph = live.create_element("p", &[]);
        let rendered = live
            .append_child(body, paragraph)
            .and_then(|()| live.set_inner_html(paragraph, &self.message));
        if let Err(e) = rendered {
            error!(error = %e, "cannot render failure message");
        }
    }
}

// ---------------------------------------------------------------------------
// Stitcher
// ---------------------------------------------------------------------------

/// Composes a landing page from its sibling reference document.
#[derive(Debug, Clone)]
pub struct Stitcher {
    config: StitchConfig,
    markers: MarkersConfig,
    stylesheets: StylesheetsConfig,
    failure: ReplaceBody,
    fetcher: Fetcher,
}

impl Stitcher {
    /// Build a stitcher from the app config and the resolved per-page options.
    pub fn new(app: &AppConfig, config: StitchConfig) -> Result<Self> {
        Ok(Self {
            config,
            markers: app.markers.clone(),
            stylesheets: app.stylesheets.clone(),
            failure: ReplaceBody {
                message: app.render.failure_message.clone(),
            },
            fetcher: Fetcher::new(&app.fetch)?,
        })
    }

    /// Stitch `live`, located at `page_url`, rendering the configured failure
    /// message if the reference document cannot be used.
    pub async fn run(&self, live: &mut Document, page_url: &Url) -> StitchReport {
        self.run_with(live, page_url, &self.failure).await
    }

    /// Like [`Stitcher::run`] with a caller-supplied failure renderer.
    ///
    /// Runs once, in order, with no retry. Any error after the stylesheets
    /// are injected ends the run: it is logged, `renderer` is invoked, and the
    /// report is marked degraded.
    #[instrument(skip_all, fields(page = %page_url, root_path = %self.config.root_path()))]
    pub async fn run_with(
        &self,
        live: &mut Document,
        page_url: &Url,
        renderer: &dyn FailureRenderer,
    ) -> StitchReport {
        let mut report = StitchReport::new();

        if let Err(e) = self.stitch(live, page_url, &mut report).await {
            error!(error = %e, "error loading content");
            renderer.render_failure(live, &e);
            report.status = StitchStatus::Degraded {
                error: e.to_string(),
            };
            return report;
        }

        info!(
            sections = ?report.sections,
            rewritten = report.rewritten,
            scroll_links = report.scroll_links,
            "page stitched"
        );
        report
    }

    async fn stitch(&self, live: &mut Document, page_url: &Url, report: &mut StitchReport) -> Result<()> {
        // 1. Stylesheets go in before the fetch so styling is available early.
        report.stylesheets = self.inject_stylesheets(live)?;

        // 2. The only suspension point.
        let reference_url = resolve(page_url, &self.config.reference_path())?;
        report.reference_url = Some(reference_url.to_string());
        let source = self.fetcher.fetch(&reference_url).await?;
        let mut reference = Document::parse(&source);

        // 3. Whole-document rewrite, so moved sections carry corrected references.
        report.rewritten = rewrite::rewrite_references(&mut reference, self.config.root_path())?;

        // 4. Sections and validation script.
        self.inject_sections(live, &mut reference, report)?;

        // 5–7. Overrides.
        if let Some(url) = self.config.hero_image_url() {
            report.hero_replaced = overrides::replace_hero_image(live, &self.markers, url);
        }
        if let Some(markup) = self.config.bonus_copy_html() {
            report.bonus_copy_inserted =
                overrides::insert_bonus_copy(live, &self.markers, markup)?.is_some();
        }
        if let Some(url) = self.config.form_action_url() {
            report.forms_updated = overrides::replace_form_actions(live, &self.markers, url)?;
        }

        // 8. Navigation.
        report.scroll_links = navigation::wire_smooth_scroll(live)?;

        Ok(())
    }

    /// Append the local stylesheet, then the remote ones, to the head.
    fn inject_stylesheets(&self, live: &mut Document) -> Result<usize> {
        let head = live.head()?;
        let local = format!("{}{}", self.config.root_path(), self.stylesheets.local);
        let hrefs = std::iter::once(local.as_str())
            .chain(self.stylesheets.remote.iter().map(String::as_str));

        let mut count = 0;
        for href in hrefs {
            let link = live.create_element("link", &[("rel", "stylesheet"), ("href", href)]);
            live.append_child(head, link)?;
            count += 1;
        }
        debug!(count, "stylesheets injected");
        Ok(count)
    }

    fn inject_sections(
        &self,
        live: &mut Document,
        reference: &mut Document,
        report: &mut StitchReport,
    ) -> Result<()> {
        // Locate everything before moving anything: the validation script may
        // live inside one of the sections.
        let mut found = Vec::new();
        for tag in SECTIONS {
            match reference.select_first(tag)? {
                Some(node) => found.push((tag, node)),
                None => debug!(tag, "section missing from reference document"),
            }
        }
        let validation_src = self.find_validation_script(reference)?;

        // Adopted as one batch: a section nested inside an earlier one (an
        // article footer inside main) is detached from it and moves alone.
        let body = live.body()?;
        let nodes: Vec<_> = found.iter().map(|&(_, node)| node).collect();
        let adopted = live.adopt_all(reference, &nodes);
        for ((tag, _), adopted) in found.into_iter().zip(adopted) {
            if let Some(adopted) = adopted {
                live.append_child(body, adopted)?;
                report.sections.push(tag.to_string());
            }
        }

        // A script node parsed elsewhere would not run if merely moved, so a
        // fresh element is created.
        if let Some(src) = validation_src {
            let script = live.create_element("script", &[("src", src.as_str())]);
            live.append_child(body, script)?;
            report.validation_script = Some(src);
        }
        Ok(())
    }

    fn find_validation_script(&self, reference: &Document) -> Result<Option<String>> {
        let marker = &self.markers.validation_script;
        for script in reference.select_all("script[src]")? {
            if let Some(src) = reference.attr(script, "src") {
                if src.contains(marker.as_str()) {
                    return Ok(Some(src.to_string()));
                }
            }
        }
        debug!(%marker, "no validation script in reference document");
        Ok(None)
    }
}
