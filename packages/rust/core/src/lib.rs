//! Content stitching for landing pages.
//!
//! A landing page ships with an (almost) empty body. Its content comes from
//! a sibling reference document at `<root_path>index.html`: the reference's
//! `header`, `main` and `footer` are moved into the page after their relative
//! references are rewritten, then per-page overrides are applied.
//!
//! This crate provides:
//! - [`Stitcher`] — the ordered, run-once pipeline
//! - [`rewrite`] — literal root-path prefixing of `href`/`src`
//! - [`overrides`] — hero image, bonus copy and form action overrides
//! - [`navigation`] — smooth-scroll wiring for in-page anchors
//! - [`render`] — host-page globals and output preparation

pub mod navigation;
pub mod overrides;
pub mod render;
pub mod rewrite;
pub mod stitcher;

pub use stitcher::{
    FailureRenderer, ReplaceBody, SECTIONS, StitchReport, StitchStatus, Stitcher,
};

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pagestitch_dom::{Document, ScrollBehavior};
    use pagestitch_shared::{AppConfig, StitchConfig, StitchError};
    use url::Url;

    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    async fn serve_reference(body: Option<String>) -> wiremock::MockServer {
        let server = wiremock::MockServer::start().await;
        let response = match body {
            Some(body) => wiremock::ResponseTemplate::new(200).set_body_string(body),
            None => wiremock::ResponseTemplate::new(404),
        };
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/index.html"))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn page_url(server: &wiremock::MockServer) -> Url {
        Url::parse(&format!("{}/spring-b/", server.uri())).unwrap()
    }

    /// Config as the landing page fixture declares it.
    fn host_config(live: &Document) -> StitchConfig {
        let mut config = StitchConfig::default();
        config.apply(&render::host_overrides(live));
        config
    }

    fn body_tags(live: &Document) -> Vec<String> {
        let body = live.body().unwrap();
        live.child_elements(body)
            .into_iter()
            .filter_map(|n| live.tag_name(n).map(String::from))
            .collect()
    }

    #[tokio::test]
    async fn stitches_reference_into_landing_page() {
        let server = serve_reference(Some(load_fixture("reference-index.html"))).await;
        let mut live = Document::parse(&load_fixture("landing.html"));
        let config = host_config(&live);

        let stitcher = Stitcher::new(&AppConfig::default(), config).unwrap();
        let report = stitcher.run(&mut live, &page_url(&server)).await;

        assert_eq!(report.status, StitchStatus::Completed);
        assert_eq!(report.sections, vec!["header", "main", "footer"]);
        assert_eq!(body_tags(&live), vec!["script", "header", "main", "footer", "script"]);
        assert_eq!(report.rewritten, 8);
        assert_eq!(report.reference_url.as_deref(), Some(format!("{}/index.html", server.uri()).as_str()));

        // Stylesheets: local first, then the three remote ones.
        let links = live.select_all("head > link[rel=stylesheet]").unwrap();
        assert_eq!(links.len(), 4);
        assert_eq!(live.attr(links[0], "href"), Some("../style.css"));
        assert!(live.attr(links[1], "href").unwrap().starts_with("https://my937p.com/p/format_css"));
        assert!(live.attr(links[3], "href").unwrap().contains("myasp-ui-form.css"));

        // References now resolve from the landing page's directory.
        let voice = live.select_first("#voice img").unwrap().unwrap();
        assert_eq!(live.attr(voice, "src"), Some("../images/voice-01.jpg"));
        let badge = live.select_all("#voice img").unwrap()[1];
        assert_eq!(live.attr(badge, "src"), Some("https://cdn.example.com/badge.png"));
        let footer_links = live.select_all("footer a").unwrap();
        let hrefs: Vec<_> = footer_links.iter().map(|&a| live.attr(a, "href").unwrap()).collect();
        assert_eq!(
            hrefs,
            vec!["../privacy.html", "mailto:support@example.com", "../../company/", "//partner.example.com/"]
        );

        // Fresh validation script at the end of the body.
        let last = *live.child_elements(live.body().unwrap()).last().unwrap();
        assert_eq!(live.attr(last, "src"), Some("https://my937p.com/js/validation.js?v=2"));
        assert_eq!(report.validation_script.as_deref(), Some("https://my937p.com/js/validation.js?v=2"));

        // Overrides.
        assert!(report.hero_replaced);
        let hero = live.elements_with_class("hero-image")[0];
        assert_eq!(live.attr(hero, "src"), Some("../images/hero-b.jpg"));

        assert!(report.bonus_copy_inserted);
        let heading = live.select_first("h3.bonus-copy").unwrap().unwrap();
        assert_eq!(live.inner_html(heading), r#"今なら<br class="sp-br">限定特典つき"#);
        let package = live.elements_with_class("form-section-image")[0];
        let siblings = live.child_elements(live.parent(package).unwrap());
        let pos = siblings.iter().position(|&n| n == package).unwrap();
        assert_eq!(siblings[pos - 1], heading);
        assert!(live.select_first("head > style").unwrap().is_some());

        assert_eq!(report.forms_updated, 1);
        let form = live.select_first("form.myForm").unwrap().unwrap();
        assert_eq!(live.attr(form, "action"), Some("https://my937p.com/p/r/VARIANT_B"));

        // Navigation.
        assert_eq!(report.scroll_links, 2);
        let nav = live.select_all("header nav a").unwrap();
        let outcome = live.click(nav[0]);
        assert!(outcome.default_prevented);
        let scroll = outcome.scroll.unwrap();
        assert_eq!(scroll.target, live.element_by_id("form").unwrap());
        assert_eq!(scroll.behavior, ScrollBehavior::Smooth);
    }

    #[tokio::test]
    async fn not_found_replaces_body_with_failure_message() {
        let server = serve_reference(None).await;
        let mut live = Document::parse(&load_fixture("landing.html"));
        let config = host_config(&live);

        let stitcher = Stitcher::new(&AppConfig::default(), config).unwrap();
        let report = stitcher.run(&mut live, &page_url(&server)).await;

        assert!(report.is_degraded());
        match &report.status {
            StitchStatus::Degraded { error } => assert!(error.contains("404")),
            StitchStatus::Completed => panic!("expected degraded run"),
        }
        let body = live.body().unwrap();
        assert_eq!(live.inner_html(body), "<p>コンテンツの読み込みに失敗しました。</p>");
        assert!(live.select_first("header, main, footer").unwrap().is_none());
        // Stylesheets were injected before the fetch and stay.
        assert_eq!(report.stylesheets, 4);
        assert_eq!(live.select_all("head > link").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_sections_and_markers_are_skipped() {
        let reference = r##"<html><head></head><body>
            <main><p>only main</p><a href="#nowhere">jump</a></main>
        </body></html>"##;
        let server = serve_reference(Some(reference.to_string())).await;
        let mut live = Document::parse("<html><head></head><body></body></html>");

        let config = StitchConfig {
            hero_image_url: Some("hero.jpg".into()),
            bonus_copy_html: Some("<b>bonus</b>".into()),
            form_action_url: Some("https://forms.example.com/x".into()),
            ..StitchConfig::default()
        };
        let stitcher = Stitcher::new(&AppConfig::default(), config).unwrap();
        let report = stitcher.run(&mut live, &page_url(&server)).await;

        assert_eq!(report.status, StitchStatus::Completed);
        assert_eq!(report.sections, vec!["main"]);
        assert_eq!(body_tags(&live), vec!["main"]);
        assert_eq!(report.validation_script, None);
        assert!(!report.hero_replaced);
        assert!(!report.bonus_copy_inserted);
        assert_eq!(report.forms_updated, 0);
        assert!(live.select_first("head > style").unwrap().is_none());

        let anchor = live.select_first("main a").unwrap().unwrap();
        let outcome = live.click(anchor);
        assert!(outcome.default_prevented);
        assert!(outcome.scroll.is_none());
    }

    #[tokio::test]
    async fn footer_nested_in_main_moves_once() {
        let reference = "<html><head></head><body><main><article><p>a</p><footer>article-foot</footer></article></main><footer>site-foot</footer></body></html>";
        let server = serve_reference(Some(reference.to_string())).await;
        let mut live = Document::parse("<html><head></head><body></body></html>");

        let stitcher = Stitcher::new(&AppConfig::default(), StitchConfig::default()).unwrap();
        let report = stitcher.run(&mut live, &page_url(&server)).await;

        assert_eq!(report.status, StitchStatus::Completed);
        assert_eq!(report.sections, vec!["main", "footer"]);
        let body = live.body().unwrap();
        let html = live.inner_html(body);
        assert_eq!(html.matches("article-foot").count(), 1);
        assert!(!html.contains("site-foot"));
        assert_eq!(
            html,
            "<main><article><p>a</p></article></main><footer>article-foot</footer>"
        );
    }

    #[tokio::test]
    async fn without_overrides_reference_content_is_kept() {
        let server = serve_reference(Some(load_fixture("reference-index.html"))).await;
        let mut live = Document::parse("<html><head></head><body></body></html>");

        let stitcher = Stitcher::new(&AppConfig::default(), StitchConfig::default()).unwrap();
        let report = stitcher.run(&mut live, &page_url(&server)).await;

        assert_eq!(report.status, StitchStatus::Completed);
        let hero = live.elements_with_class("hero-image")[0];
        assert_eq!(live.attr(hero, "src"), Some("../images/hero.jpg"));
        assert!(live.select_first("h3").unwrap().is_none());
        let form = live.select_first("form.myForm").unwrap().unwrap();
        assert_eq!(live.attr(form, "action"), Some("https://my937p.com/p/r/DEFAULT"));
    }

    #[tokio::test]
    async fn custom_failure_renderer_is_invoked_once() {
        struct Recording(RefCell<Vec<String>>);
        impl FailureRenderer for Recording {
            fn render_failure(&self, _live: &mut Document, error: &StitchError) {
                self.0.borrow_mut().push(error.to_string());
            }
        }

        let server = serve_reference(None).await;
        let mut live = Document::parse("<html><body><p>kept</p></body></html>");
        let stitcher = Stitcher::new(&AppConfig::default(), StitchConfig::default()).unwrap();
        let recording = Recording(RefCell::new(Vec::new()));

        let report = stitcher.run_with(&mut live, &page_url(&server), &recording).await;

        assert!(report.is_degraded());
        assert_eq!(recording.0.borrow().len(), 1);
        assert!(live.select_first("p").unwrap().is_some());
    }

    #[tokio::test]
    async fn stitches_from_disk_and_finalizes_output() {
        let dir = std::env::temp_dir().join(format!("pagestitch-core-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("spring-b")).unwrap();
        std::fs::write(dir.join("index.html"), load_fixture("reference-index.html")).unwrap();
        let page_path = dir.join("spring-b").join("index.html");
        std::fs::write(&page_path, load_fixture("landing.html")).unwrap();

        let page = Url::from_file_path(&page_path).unwrap();
        let mut live = Document::parse(&std::fs::read_to_string(&page_path).unwrap());
        let app = AppConfig::default();
        let stitcher = Stitcher::new(&app, host_config(&live)).unwrap();

        let report = stitcher.run(&mut live, &page).await;
        assert_eq!(report.status, StitchStatus::Completed);

        render::finalize(&mut live, &app.render, &report).unwrap();
        let html = live.to_html();
        assert!(!html.contains("content-loader.js"));
        assert!(html.contains("scrollIntoView"));
        assert!(html.contains(r#"src="../images/package.png""#));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
