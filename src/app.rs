use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cache::ListingCache;
use crate::config::{self, Config};
use crate::context::PageContext;
use crate::fetcher::{FetcherConfig, HttpFetcher, PostExtractor};
use crate::filter::FilterState;
use crate::logger::{self, LogSink, Severity, TracingSink};
use crate::presenter::{Navigator, Presenter};
use crate::resolver::Resolver;
use crate::storage::{self, Settings};
use crate::volume::VolumeCookie;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve and print the prev/next navigator for a post page.
    Navigate { url: String, html: bool },
    /// Show the persisted settings, applying any changes first.
    Settings {
        volume: Option<u32>,
        filter_enabled: Option<bool>,
    },
}

pub fn parse_args<I, S>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = None;
    let mut html = false;
    let mut show_settings = false;
    let mut volume = None;
    let mut filter_enabled = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_ref() {
            "--html" => html = true,
            "--settings" => show_settings = true,
            "--volume" => {
                let value = args.next().context("--volume needs a value")?;
                let parsed = value
                    .as_ref()
                    .parse::<u32>()
                    .with_context(|| format!("invalid volume {:?}", value.as_ref()))?;
                volume = Some(parsed);
            }
            "--filter" => {
                let value = args.next().context("--filter needs on or off")?;
                filter_enabled = Some(match value.as_ref() {
                    "on" | "true" | "1" => true,
                    "off" | "false" | "0" => false,
                    other => bail!("invalid filter value {other:?}, expected on or off"),
                });
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            value => {
                if url.replace(value.to_string()).is_some() {
                    bail!("only one post url may be given");
                }
            }
        }
    }

    if show_settings || volume.is_some() || filter_enabled.is_some() {
        if url.is_some() {
            bail!("settings flags cannot be combined with a post url");
        }
        return Ok(Command::Settings {
            volume,
            filter_enabled,
        });
    }

    match url {
        Some(url) => Ok(Command::Navigate { url, html }),
        None => bail!("missing post url (see --help)"),
    }
}

pub fn run<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    logger::init();
    let command = parse_args(args)?;
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Navigate { url, html } => {
            let settings = load_settings(&cfg)?;
            let sink: Arc<dyn LogSink> = Arc::new(TracingSink);
            let visit = visit(&cfg, &settings, &url, ListingCache::in_memory(), sink)?;
            if html {
                if !visit.navigator.is_empty() {
                    writeln!(out, "{}", visit.navigator.render_html())?;
                }
            } else {
                write!(out, "{}", visit.navigator.render_text())?;
            }
        }
        Command::Settings {
            volume,
            filter_enabled,
        } => {
            let settings = update_settings(&cfg, volume, filter_enabled)?;
            writeln!(
                out,
                "filter: {}",
                if settings.filter_enabled { "on" } else { "off" }
            )?;
            writeln!(out, "volume: {}%", settings.volume)?;
            writeln!(out, "cookie: {}", VolumeCookie::from_settings(&cfg, &settings))?;
        }
    }
    Ok(())
}

/// What a post page is set up with: the navigator plus the media filter and
/// player volume taken from the stored settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PageVisit {
    pub navigator: Navigator,
    pub filter: FilterState,
    pub volume_cookie: VolumeCookie,
}

pub fn visit(
    cfg: &Config,
    settings: &Settings,
    url: &str,
    cache: ListingCache,
    sink: Arc<dyn LogSink>,
) -> Result<PageVisit> {
    let filter = FilterState::initial(settings);
    let volume_cookie = VolumeCookie::from_settings(cfg, settings);
    sink.emit(
        "visit",
        Severity::Info,
        &format!("filter: {}, cookie: {volume_cookie}", filter.as_str()),
    );

    let mut navigator = navigate(cfg, url, cache, sink)?;
    navigator.set_data("filter", filter.as_str());
    navigator.set_data("volume-cookie", volume_cookie.to_string());
    Ok(PageVisit {
        navigator,
        filter,
        volume_cookie,
    })
}

/// Resolves the navigator for the post at `url`. Pages outside the
/// recommended listing get an empty navigator.
pub fn navigate(
    cfg: &Config,
    url: &str,
    cache: ListingCache,
    sink: Arc<dyn LogSink>,
) -> Result<Navigator> {
    let ctx = PageContext::from_url(url).context("read page context")?;
    let mut navigator = Navigator::new(cfg);

    sink.emit(
        "navigate",
        Severity::Info,
        &format!("galleryType: {}", ctx.kind.as_str()),
    );
    if !ctx.mode.is_recommended() {
        sink.emit("navigate", Severity::Info, "not a recommended listing, skipping");
        return Ok(navigator);
    }

    let fetcher = HttpFetcher::new(
        FetcherConfig::from_config(cfg, ctx.kind),
        PostExtractor::from_config(cfg)?,
        cache.clone(),
        sink.clone(),
    )?;
    let resolver = Resolver::new(Arc::new(fetcher), cache, sink.clone());

    let key = ctx.listing_key();
    let neighbors = resolver.resolve(&key, &ctx.post);
    if neighbors.is_degraded() {
        tracing::warn!(
            unresolved = neighbors.unresolved.len(),
            "navigation incomplete, some listings were unavailable"
        );
    }

    let presenter = Presenter::new(cfg.site.base_url.for_kind(ctx.kind), key);
    presenter.present(&neighbors, &mut navigator)?;
    for link in navigator.links() {
        sink.emit("navigate", Severity::Success, &format!("type: {}", link.direction.as_str()));
    }
    Ok(navigator)
}

pub fn load_settings(cfg: &Config) -> Result<Settings> {
    update_settings(cfg, None, None)
}

/// Loads the persisted settings, writes the requested changes and returns
/// what is stored afterwards.
pub fn update_settings(
    cfg: &Config,
    volume: Option<u32>,
    filter_enabled: Option<bool>,
) -> Result<Settings> {
    let defaults = Settings {
        volume: cfg.volume.default_percent,
        ..Settings::default()
    };
    let (store, mut settings) = storage::Store::open(storage::Options {
        path: cfg.settings_path.clone(),
        defaults,
    })
    .context("open settings")?;

    if let Some(volume) = volume {
        store.set_volume(volume)?;
    }
    if let Some(enabled) = filter_enabled {
        store.set_filter_enabled(enabled)?;
    }
    if volume.is_some() || filter_enabled.is_some() {
        settings = store.load(defaults)?;
    }
    store.close()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::RecordingSink;
    use tempfile::tempdir;

    #[test]
    fn parses_navigate_and_settings_commands() {
        assert_eq!(
            parse_args(["--html", "https://gall.dcinside.com/board/view/?id=g&no=1"]).unwrap(),
            Command::Navigate {
                url: "https://gall.dcinside.com/board/view/?id=g&no=1".into(),
                html: true,
            }
        );
        assert_eq!(
            parse_args(["--volume", "40", "--filter", "off"]).unwrap(),
            Command::Settings {
                volume: Some(40),
                filter_enabled: Some(false),
            }
        );
        assert_eq!(
            parse_args(["--settings"]).unwrap(),
            Command::Settings {
                volume: None,
                filter_enabled: None,
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(Vec::<String>::new()).is_err());
        assert!(parse_args(["--volume"]).is_err());
        assert!(parse_args(["--volume", "loud"]).is_err());
        assert!(parse_args(["--filter", "maybe"]).is_err());
        assert!(parse_args(["--bogus"]).is_err());
        assert!(parse_args(["a", "b"]).is_err());
        assert!(parse_args(["--settings", "https://x/?id=g&no=1"]).is_err());
    }

    #[test]
    fn non_recommended_page_skips_network() {
        let sink = Arc::new(RecordingSink::new());
        let mut cfg = Config::default();
        cfg.site.base_url.regular = "http://127.0.0.1:1/board".into();
        let navigator = navigate(
            &cfg,
            "https://gall.dcinside.com/board/view/?id=g&no=1&page=2",
            ListingCache::in_memory(),
            sink.clone(),
        )
        .unwrap();
        assert!(navigator.is_empty());
        assert_eq!(sink.count(Severity::Warn), 0);
        assert_eq!(sink.count(Severity::Info), 2);
    }

    #[test]
    fn visit_applies_stored_settings() {
        let sink = Arc::new(RecordingSink::new());
        let settings = Settings {
            filter_enabled: false,
            volume: 35,
        };
        let visit = visit(
            &Config::default(),
            &settings,
            "https://gall.dcinside.com/board/view/?id=g&no=1",
            ListingCache::in_memory(),
            sink.clone(),
        )
        .unwrap();
        assert_eq!(visit.filter, FilterState::Disabled);
        assert_eq!(visit.volume_cookie.pair(), "video_v=0.35");
        assert_eq!(
            visit.navigator.render_html(),
            "<div id=\"betterdc-nav-container\" data-filter=\"off\" data-volume-cookie=\"video_v=0.35; domain=.dcinside.com; path=/\"></div>"
        );
        assert_eq!(sink.count(Severity::Info), 3);
        assert!(sink.events()[0].detail.contains("filter: off"));
    }

    #[test]
    fn settings_round_trip_through_store() {
        let dir = tempdir().unwrap();
        let cfg = Config {
            settings_path: Some(dir.path().join("settings.db")),
            ..Config::default()
        };
        let initial = load_settings(&cfg).unwrap();
        assert_eq!(initial, Settings::default());

        let changed = update_settings(&cfg, Some(55), Some(false)).unwrap();
        assert_eq!(changed.volume, 55);
        assert!(!changed.filter_enabled);

        assert!(update_settings(&cfg, Some(101), None).is_err());
        assert_eq!(load_settings(&cfg).unwrap(), changed);
    }
}
