use std::fmt;

use serde::{Deserialize, Serialize};

pub const RECOMMEND_MODE: &str = "recommend";

/// Identifier of a single post inside a gallery. Only listing position gives
/// posts an order; the value itself is never compared numerically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Recommended,
}

impl FilterMode {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(RECOMMEND_MODE) => FilterMode::Recommended,
            _ => FilterMode::All,
        }
    }

    pub fn is_recommended(&self) -> bool {
        matches!(self, FilterMode::Recommended)
    }
}

/// One page of one filtered listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub gallery_id: String,
    pub page: u32,
    pub mode: FilterMode,
    pub category: Option<String>,
}

impl ListingKey {
    pub fn new(gallery_id: impl Into<String>, page: u32) -> Self {
        Self {
            gallery_id: gallery_id.into(),
            page,
            mode: FilterMode::default(),
            category: None,
        }
    }

    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Same listing, different page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Query parameters shared by listing and view URLs, in the order the
    /// site emits them.
    pub fn filter_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.mode.is_recommended() {
            params.push(("exception_mode", RECOMMEND_MODE.to_string()));
        }
        if let Some(category) = &self.category {
            params.push(("search_head", category.clone()));
        }
        params
    }

    /// Session storage key, e.g. `postList_baseball_3&exception_mode=recommend`.
    pub fn storage_key(&self) -> String {
        let mut key = format!("postList_{}_{}", self.gallery_id, self.page);
        for (name, value) in self.filter_params() {
            key.push_str(&format!("&{name}={value}"));
        }
        key
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} page {}", self.gallery_id, self.page)?;
        if self.mode.is_recommended() {
            f.write_str(" (recommended)")?;
        }
        if let Some(category) = &self.category {
            write!(f, " category {category}")?;
        }
        Ok(())
    }
}

/// Post ids of one listing page, newest first, exactly as the document
/// listed them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingPage {
    posts: Vec<PostId>,
}

impl ListingPage {
    pub fn new(posts: Vec<PostId>) -> Self {
        Self { posts }
    }

    pub fn posts(&self) -> &[PostId] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn position(&self, post: &PostId) -> Option<usize> {
        self.posts.iter().position(|candidate| candidate == post)
    }

    pub fn get(&self, index: usize) -> Option<&PostId> {
        self.posts.get(index)
    }

    pub fn first(&self) -> Option<&PostId> {
        self.posts.first()
    }

    pub fn last(&self) -> Option<&PostId> {
        self.posts.last()
    }
}

impl<S: Into<PostId>> FromIterator<S> for ListingPage {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
