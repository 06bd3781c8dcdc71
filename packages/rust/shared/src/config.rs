//! Application configuration for pagestitch.
//!
//! User config lives at `~/.pagestitch/pagestitch.toml`.
//! CLI flags override host-page globals, which override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, StitchError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pagestitch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagestitch";

/// Root path used when none is configured.
pub const DEFAULT_ROOT_PATH: &str = "../";

/// Name of the reference document, relative to the root path.
pub const REFERENCE_DOCUMENT: &str = "index.html";

// ---------------------------------------------------------------------------
// Config structs (matching pagestitch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-page stitch settings.
    #[serde(default)]
    pub stitch: StitchConfig,

    /// Marker classes and selector hooks.
    #[serde(default)]
    pub markers: MarkersConfig,

    /// Stylesheets injected into the live head.
    #[serde(default)]
    pub stylesheets: StylesheetsConfig,

    /// Reference document retrieval.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output rendering.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[stitch]` section: the options a host page supplies before stitching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchConfig {
    /// Prefix prepended to relative references and to `index.html`.
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Replacement `src` for the hero image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image_url: Option<String>,

    /// Trusted markup for the bonus copy heading. Inserted verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_copy_html: Option<String>,

    /// Replacement `action` for marked forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_action_url: Option<String>,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            hero_image_url: None,
            bonus_copy_html: None,
            form_action_url: None,
        }
    }
}

fn default_root_path() -> String {
    DEFAULT_ROOT_PATH.into()
}

impl StitchConfig {
    /// Layer `overrides` on top of this config. Unset and empty values are ignored.
    pub fn apply(&mut self, overrides: &StitchOverrides) {
        if let Some(root) = non_empty(&overrides.root_path) {
            self.root_path = root.to_string();
        }
        if let Some(url) = non_empty(&overrides.hero_image_url) {
            self.hero_image_url = Some(url.to_string());
        }
        if let Some(html) = non_empty(&overrides.bonus_copy_html) {
            self.bonus_copy_html = Some(html.to_string());
        }
        if let Some(url) = non_empty(&overrides.form_action_url) {
            self.form_action_url = Some(url.to_string());
        }
    }

    /// The configured root path, falling back to [`DEFAULT_ROOT_PATH`] when empty.
    pub fn root_path(&self) -> &str {
        if self.root_path.is_empty() {
            DEFAULT_ROOT_PATH
        } else {
            &self.root_path
        }
    }

    /// Relative location of the reference document (`<root_path>index.html`).
    pub fn reference_path(&self) -> String {
        format!("{}{REFERENCE_DOCUMENT}", self.root_path())
    }

    pub fn hero_image_url(&self) -> Option<&str> {
        non_empty(&self.hero_image_url)
    }

    pub fn bonus_copy_html(&self) -> Option<&str> {
        non_empty(&self.bonus_copy_html)
    }

    pub fn form_action_url(&self) -> Option<&str> {
        non_empty(&self.form_action_url)
    }
}

/// A partial [`StitchConfig`] from a higher-precedence source
/// (host-page globals or CLI flags).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StitchOverrides {
    pub root_path: Option<String>,
    pub hero_image_url: Option<String>,
    pub bonus_copy_html: Option<String>,
    pub form_action_url: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// `[markers]` section: class names and substrings used purely as selector hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkersConfig {
    #[serde(default = "default_hero_marker")]
    pub hero_image: String,

    #[serde(default = "default_package_marker")]
    pub package_image: String,

    #[serde(default = "default_form_marker")]
    pub form: String,

    /// Class toggled by the responsive rule registered with the bonus copy.
    #[serde(default = "default_soft_break")]
    pub soft_break: String,

    /// Class given to the injected bonus copy heading.
    #[serde(default = "default_bonus_copy_class")]
    pub bonus_copy: String,

    /// Substring identifying the validation script's `src`.
    #[serde(default = "default_validation_script")]
    pub validation_script: String,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            hero_image: default_hero_marker(),
            package_image: default_package_marker(),
            form: default_form_marker(),
            soft_break: default_soft_break(),
            bonus_copy: default_bonus_copy_class(),
            validation_script: default_validation_script(),
        }
    }
}

fn default_hero_marker() -> String {
    "hero-image".into()
}
fn default_package_marker() -> String {
    "form-section-image".into()
}
fn default_form_marker() -> String {
    "myForm".into()
}
fn default_soft_break() -> String {
    "sp-br".into()
}
fn default_bonus_copy_class() -> String {
    "bonus-copy".into()
}
fn default_validation_script() -> String {
    "validation.js".into()
}

/// `[stylesheets]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesheetsConfig {
    /// Local stylesheet, relative to the root path. Injected first.
    #[serde(default = "default_local_stylesheet")]
    pub local: String,

    /// Absolute stylesheet URLs, injected after the local one in this order.
    #[serde(default = "default_remote_stylesheets")]
    pub remote: Vec<String>,
}

impl Default for StylesheetsConfig {
    fn default() -> Self {
        Self {
            local: default_local_stylesheet(),
            remote: default_remote_stylesheets(),
        }
    }
}

fn default_local_stylesheet() -> String {
    "style.css".into()
}

fn default_remote_stylesheets() -> Vec<String> {
    vec![
        "https://my937p.com/p/format_css?item_id=HDAPYctM&format=div&form_align=&label_align=&radio_float=&checkbox_float=&label_width=0&input_width=0&theme_name=3_7&ver=3".into(),
        "https://my937p.com/p/mobile_css?item_id=HDAPYctM&format=div&form_align=&label_align=&radio_float=&checkbox_float=&label_width=0&input_width=0&theme_name=3_7&ver=3".into(),
        "https://my937p.com/css/form/myasp-ui-form.css?d=20250810224710".into(),
    ]
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed when fetching over HTTP.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Body content shown when the reference document cannot be fetched.
    #[serde(default = "default_failure_message")]
    pub failure_message: String,

    /// Append an inline script reproducing smooth-scroll handling in the output.
    #[serde(default = "default_true")]
    pub emit_scroll_script: bool,

    /// Scripts whose `src` contains any of these are removed from the output.
    #[serde(default = "default_strip_scripts")]
    pub strip_scripts: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            failure_message: default_failure_message(),
            emit_scroll_script: true,
            strip_scripts: default_strip_scripts(),
        }
    }
}

fn default_failure_message() -> String {
    "コンテンツの読み込みに失敗しました。".into()
}
fn default_true() -> bool {
    true
}
fn default_strip_scripts() -> Vec<String> {
    vec!["content-loader.js".into()]
}

impl AppConfig {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            return Err(StitchError::config("fetch.timeout_secs must be greater than 0"));
        }
        for href in &self.stylesheets.remote {
            Url::parse(href).map_err(|e| {
                StitchError::config(format!("stylesheets.remote entry '{href}' is not an absolute URL: {e}"))
            })?;
        }
        let markers = [
            ("hero_image", &self.markers.hero_image),
            ("package_image", &self.markers.package_image),
            ("form", &self.markers.form),
            ("soft_break", &self.markers.soft_break),
            ("bonus_copy", &self.markers.bonus_copy),
        ];
        for (name, class) in markers {
            if class.is_empty() || class.contains(char::is_whitespace) {
                return Err(StitchError::config(format!(
                    "markers.{name} must be a single class name, got '{class}'"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagestitch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StitchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pagestitch/pagestitch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StitchError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| StitchError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    init_config_in(&dir)
}

/// Write a default config file into `dir`, creating it if needed.
pub fn init_config_in(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| StitchError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| StitchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| StitchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("root_path"));
        assert!(toml_str.contains("form-section-image"));
        assert!(!toml_str.contains("hero_image_url"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[stitch]
hero_image_url = "images/hero-b.jpg"

[markers]
form = "signupForm"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.stitch.root_path, "../");
        assert_eq!(config.stitch.hero_image_url(), Some("images/hero-b.jpg"));
        assert_eq!(config.markers.form, "signupForm");
        assert_eq!(config.markers.hero_image, "hero-image");
        assert_eq!(config.stylesheets.remote.len(), 3);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.render.emit_scroll_script);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = StitchConfig {
            root_path: String::new(),
            hero_image_url: Some(String::new()),
            bonus_copy_html: None,
            form_action_url: Some("https://forms.example.com/submit".into()),
        };
        assert_eq!(config.root_path(), "../");
        assert_eq!(config.reference_path(), "../index.html");
        assert_eq!(config.hero_image_url(), None);
        assert_eq!(config.form_action_url(), Some("https://forms.example.com/submit"));
    }

    #[test]
    fn overrides_layer_on_top() {
        let mut config = StitchConfig {
            hero_image_url: Some("a.jpg".into()),
            ..StitchConfig::default()
        };
        config.apply(&StitchOverrides {
            root_path: Some("../../".into()),
            hero_image_url: Some(String::new()),
            bonus_copy_html: Some("<b>bonus</b>".into()),
            form_action_url: None,
        });
        assert_eq!(config.root_path, "../../");
        assert_eq!(config.hero_image_url.as_deref(), Some("a.jpg"));
        assert_eq!(config.bonus_copy_html.as_deref(), Some("<b>bonus</b>"));
        assert_eq!(config.form_action_url, None);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stylesheets.remote.push("relative/style.css".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not an absolute URL"));

        let mut config = AppConfig::default();
        config.markers.hero_image = "hero image".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn init_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("pagestitch-config-{}", uuid::Uuid::now_v7()));
        let path = init_config_in(&dir).expect("init");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.stitch, StitchConfig::default());
        assert_eq!(config.render.strip_scripts, vec!["content-loader.js".to_string()]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
