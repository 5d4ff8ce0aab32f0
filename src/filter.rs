use std::collections::HashSet;
use std::hash::Hash;

use anyhow::{anyhow, Result};
use scraper::{Html, Selector};

use crate::config::FilterConfig;
use crate::storage::Settings;
use crate::watch::Watch;

/// Selectors a host uses to answer [`MediaElement`] queries.
#[derive(Debug, Clone)]
pub struct MediaSelectors {
    /// Image or video inside the post body container.
    pub in_body: Selector,
    /// Image or video regardless of where it sits.
    pub media: Selector,
}

impl MediaSelectors {
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let container = &config.container_selector;
        let in_body = format!(
            "{container} {}, {container} {}",
            config.image_selector, config.video_selector
        );
        let media = format!("{}, {}", config.image_selector, config.video_selector);
        Ok(Self {
            in_body: parse_selector(&in_body)?,
            media: parse_selector(&media)?,
        })
    }

    /// Every media element in `html`, in document order.
    pub fn scan(&self, html: &str) -> Vec<DocumentMedia> {
        let document = Html::parse_document(html);
        let in_body: HashSet<_> = document
            .select(&self.in_body)
            .map(|element| element.id())
            .collect();
        document
            .select(&self.media)
            .enumerate()
            .map(|(index, element)| DocumentMedia {
                index,
                in_body: in_body.contains(&element.id()),
            })
            .collect()
    }
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|err| anyhow!("invalid media selector {raw:?}: {err}"))
}

/// A media element as the host page exposes it.
pub trait MediaElement {
    type Handle: Clone + Eq + Hash + Send + Sync + 'static;

    fn handle(&self) -> Self::Handle;

    /// The element, or one of its ancestors, matches a media selector inside
    /// the post body container.
    fn matches_in_body(&self) -> bool;

    /// The element matches the image or video selector on its own. Still
    /// answerable after the page swapped the element out of the tree.
    fn matches_media(&self) -> bool;
}

/// Media element of a parsed page. Its handle is its position among the
/// page's media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentMedia {
    index: usize,
    in_body: bool,
}

impl MediaElement for DocumentMedia {
    type Handle = usize;

    fn handle(&self) -> usize {
        self.index
    }

    fn matches_in_body(&self) -> bool {
        self.in_body
    }

    fn matches_media(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Media is blurred; a context menu on media lifts it.
    Armed,
    /// Blur is lifted for good, including for media added later.
    Released,
    /// The user turned the filter off.
    Disabled,
}

impl FilterState {
    /// Where a freshly loaded page starts.
    pub fn initial(settings: &Settings) -> Self {
        if settings.filter_enabled {
            FilterState::Armed
        } else {
            FilterState::Disabled
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterState::Armed => "armed",
            FilterState::Released => "released",
            FilterState::Disabled => "off",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMenu<H> {
    /// Not ours; the browser menu opens as usual.
    Ignored,
    /// Default menu suppressed; these elements were unblurred.
    Released(Vec<H>),
}

/// Blur on post media, lifted by right-clicking any of it.
#[derive(Debug)]
pub struct MediaFilter<H> {
    state: FilterState,
    watch: Watch<H>,
}

impl<H: Clone + Eq + Hash + Send + Sync + 'static> MediaFilter<H> {
    /// `is_body_media` decides whether a later-added handle is post media.
    pub fn new(
        settings: &Settings,
        is_body_media: impl Fn(&H) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: FilterState::initial(settings),
            watch: Watch::new(is_body_media),
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// `target` is what was right-clicked; `current` is every media element
    /// in the post body right now.
    pub fn on_context_menu<E>(&mut self, target: &E, current: &[E]) -> ContextMenu<H>
    where
        E: MediaElement<Handle = H>,
    {
        if self.state != FilterState::Armed {
            return ContextMenu::Ignored;
        }
        if !target.matches_in_body() && !target.matches_media() {
            return ContextMenu::Ignored;
        }

        let released: Vec<H> = current
            .iter()
            .filter(|element| element.matches_in_body())
            .map(MediaElement::handle)
            .collect();
        self.watch.mark_seen(released.iter().cloned());
        self.state = FilterState::Released;
        tracing::info!(count = released.len(), "filter removed by contextmenu");
        ContextMenu::Released(released)
    }

    /// Elements to unblur from a batch of newly added nodes. Nothing fires
    /// until the filter has been released.
    pub fn on_nodes_added(&mut self, added: impl IntoIterator<Item = H>) -> Vec<H> {
        if self.state != FilterState::Released {
            return Vec::new();
        }
        self.watch.observe(added)
    }
}
