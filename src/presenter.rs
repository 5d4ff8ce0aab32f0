use anyhow::{Context, Result};
use url::Url;

use crate::config::Config;
use crate::listing::ListingKey;
use crate::resolver::{Direction, NeighborResult, Neighbors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub direction: Direction,
    pub label: &'static str,
    pub class_name: &'static str,
    pub href: String,
}

impl NavLink {
    pub fn label_for(direction: Direction) -> &'static str {
        match direction {
            Direction::Previous => "이전글",
            Direction::Next => "다음글",
        }
    }

    pub fn class_for(direction: Direction) -> &'static str {
        match direction {
            Direction::Previous => "btnPrev",
            Direction::Next => "btnNext",
        }
    }
}

/// The fixed container the links live in. It sits `offset` pixels left of
/// the main content column and follows it when the layout changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    container_id: String,
    offset: i32,
    left: Option<i32>,
    links: Vec<NavLink>,
    data: Vec<(String, String)>,
}

impl Navigator {
    pub fn new(config: &Config) -> Self {
        Self {
            container_id: config.navigation.container_id.clone(),
            offset: config.navigation.button_offset,
            left: None,
            links: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Next goes on top, previous at the bottom. A second link for the same
    /// direction replaces the first.
    pub fn add(&mut self, link: NavLink) {
        self.links.retain(|existing| existing.direction != link.direction);
        match link.direction {
            Direction::Next => self.links.insert(0, link),
            Direction::Previous => self.links.push(link),
        }
    }

    /// Call with the main column's left edge whenever the viewport or layout
    /// changes. `None` means the column is not on the page.
    pub fn reposition(&mut self, main_left: Option<i32>) {
        if let Some(left) = main_left {
            self.left = Some(left - self.offset);
        }
    }

    /// Rendered as `data-<name>` on the container. Setting a name again
    /// overwrites it.
    pub fn set_data(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.data.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value,
            None => self.data.push((name.to_string(), value)),
        }
    }

    pub fn left(&self) -> Option<i32> {
        self.left
    }

    pub fn links(&self) -> &[NavLink] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn render_text(&self) -> String {
        self.links
            .iter()
            .map(|link| format!("{}\t{}\n", link.label, link.href))
            .collect()
    }

    pub fn render_html(&self) -> String {
        let style = match self.left {
            Some(left) => format!(" style=\"left: {left}px\""),
            None => String::new(),
        };
        let mut html = format!(
            "<div id=\"{}\"{style}",
            html_escape::encode_double_quoted_attribute(&self.container_id)
        );
        for (name, value) in &self.data {
            html.push_str(&format!(
                " data-{name}=\"{}\"",
                html_escape::encode_double_quoted_attribute(value)
            ));
        }
        html.push('>');
        for link in &self.links {
            html.push_str(&format!(
                "<a href=\"{}\" class=\"{}\">{}</a>",
                html_escape::encode_double_quoted_attribute(&link.href),
                link.class_name,
                html_escape::encode_text(link.label),
            ));
        }
        html.push_str("</div>");
        html
    }
}

/// Builds view links for resolved neighbors of one listing.
#[derive(Debug, Clone)]
pub struct Presenter {
    base_url: String,
    listing: ListingKey,
}

impl Presenter {
    pub fn new(base_url: &str, listing: ListingKey) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            listing,
        }
    }

    /// `<base>/view/?id=<gallery>&no=<post>[&exception_mode=..][&search_head=..]&page=<page>`
    pub fn view_url(&self, neighbor: &NeighborResult) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/view/", self.base_url))
            .with_context(|| format!("invalid view base url {:?}", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("id", &self.listing.gallery_id);
            query.append_pair("no", neighbor.post.as_str());
            for (name, value) in self.listing.filter_params() {
                query.append_pair(name, &value);
            }
            query.append_pair("page", &neighbor.page.to_string());
        }
        Ok(url)
    }

    pub fn link(&self, neighbor: &NeighborResult) -> Result<NavLink> {
        Ok(NavLink {
            direction: neighbor.direction,
            label: NavLink::label_for(neighbor.direction),
            class_name: NavLink::class_for(neighbor.direction),
            href: self.view_url(neighbor)?.to_string(),
        })
    }

    /// Absent directions produce no link.
    pub fn present(&self, neighbors: &Neighbors, navigator: &mut Navigator) -> Result<()> {
        for neighbor in neighbors.iter() {
            let link = self.link(neighbor)?;
            tracing::debug!(direction = neighbor.direction.as_str(), href = %link.href, "nav link");
            navigator.add(link);
        }
        Ok(())
    }
}
