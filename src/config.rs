use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::GalleryKind;

const DEFAULT_ENV_PREFIX: &str = "BETTERDC";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub base_url: BaseUrlConfig,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            base_url: BaseUrlConfig::default(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_domain() -> String {
    ".dcinside.com".into()
}

fn default_user_agent() -> String {
    format!("betterdc/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaseUrlConfig {
    #[serde(default = "default_minor_base")]
    pub minor: String,
    #[serde(default = "default_regular_base")]
    pub regular: String,
}

impl BaseUrlConfig {
    pub fn for_kind(&self, kind: GalleryKind) -> &str {
        match kind {
            GalleryKind::Minor => &self.minor,
            GalleryKind::Regular => &self.regular,
        }
    }
}

impl Default for BaseUrlConfig {
    fn default() -> Self {
        Self {
            minor: default_minor_base(),
            regular: default_regular_base(),
        }
    }
}

fn default_minor_base() -> String {
    "https://gall.dcinside.com/mgallery/board".into()
}

fn default_regular_base() -> String {
    "https://gall.dcinside.com/board".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavigationConfig {
    #[serde(default = "default_post_list_selector")]
    pub post_list_selector: String,
    #[serde(default = "default_post_id_attribute")]
    pub post_id_attribute: String,
    #[serde(default = "default_button_offset")]
    pub button_offset: i32,
    #[serde(default = "default_container_id")]
    pub container_id: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            post_list_selector: default_post_list_selector(),
            post_id_attribute: default_post_id_attribute(),
            button_offset: default_button_offset(),
            container_id: default_container_id(),
        }
    }
}

fn default_post_list_selector() -> String {
    r#".ub-content.us-post[data-type^="icon_recom"]"#.into()
}

fn default_post_id_attribute() -> String {
    "data-no".into()
}

fn default_button_offset() -> i32 {
    100
}

fn default_container_id() -> String {
    "betterdc-nav-container".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    #[serde(default = "default_filter_container")]
    pub container_selector: String,
    #[serde(default = "default_image_selector")]
    pub image_selector: String,
    #[serde(default = "default_video_selector")]
    pub video_selector: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            container_selector: default_filter_container(),
            image_selector: default_image_selector(),
            video_selector: default_video_selector(),
        }
    }
}

fn default_filter_container() -> String {
    "div.view_content_wrap .writing_view_box .write_div".into()
}

fn default_image_selector() -> String {
    r#"img:not([alt="매니저 차단 이미지"]):not(.written_dccon)"#.into()
}

fn default_video_selector() -> String {
    "video".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeConfig {
    #[serde(default = "default_volume_percent")]
    pub default_percent: u8,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            default_percent: default_volume_percent(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_volume_percent() -> u8 {
    10
}

fn default_cookie_name() -> String {
    "video_v".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.site.domain.is_empty() {
        base.site.domain = other.site.domain;
    }
    if !other.site.base_url.minor.is_empty() {
        base.site.base_url.minor = other.site.base_url.minor;
    }
    if !other.site.base_url.regular.is_empty() {
        base.site.base_url.regular = other.site.base_url.regular;
    }
    if !other.site.user_agent.is_empty() {
        base.site.user_agent = other.site.user_agent;
    }
    if !other.site.timeout.is_zero() {
        base.site.timeout = other.site.timeout;
    }

    if !other.navigation.post_list_selector.is_empty() {
        base.navigation.post_list_selector = other.navigation.post_list_selector;
    }
    if !other.navigation.post_id_attribute.is_empty() {
        base.navigation.post_id_attribute = other.navigation.post_id_attribute;
    }
    base.navigation.button_offset = other.navigation.button_offset;
    if !other.navigation.container_id.is_empty() {
        base.navigation.container_id = other.navigation.container_id;
    }

    if !other.filter.container_selector.is_empty() {
        base.filter.container_selector = other.filter.container_selector;
    }
    if !other.filter.image_selector.is_empty() {
        base.filter.image_selector = other.filter.image_selector;
    }
    if !other.filter.video_selector.is_empty() {
        base.filter.video_selector = other.filter.video_selector;
    }

    base.volume.default_percent = other.volume.default_percent.min(100);
    if !other.volume.cookie_name.is_empty() {
        base.volume.cookie_name = other.volume.cookie_name;
    }

    if other.settings_path.is_some() {
        base.settings_path = other.settings_path;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "site.domain" => cfg.site.domain = value,
        "site.base_url.minor" => cfg.site.base_url.minor = value,
        "site.base_url.regular" => cfg.site.base_url.regular = value,
        "site.user_agent" => cfg.site.user_agent = value,
        "site.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.site.timeout = duration;
            }
        }
        "navigation.post_list_selector" => cfg.navigation.post_list_selector = value,
        "navigation.post_id_attribute" => cfg.navigation.post_id_attribute = value,
        "navigation.button_offset" => {
            if let Ok(parsed) = value.parse::<i32>() {
                cfg.navigation.button_offset = parsed;
            }
        }
        "navigation.container_id" => cfg.navigation.container_id = value,
        "filter.container_selector" => cfg.filter.container_selector = value,
        "filter.image_selector" => cfg.filter.image_selector = value,
        "filter.video_selector" => cfg.filter.video_selector = value,
        "volume.default_percent" => {
            if let Ok(parsed) = value.parse::<u8>() {
                cfg.volume.default_percent = parsed.min(100);
            }
        }
        "volume.cookie_name" => cfg.volume.cookie_name = value,
        "settings_path" => cfg.settings_path = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("betterdc").join("config.yaml"))
}
