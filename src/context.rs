use std::collections::HashMap;

use url::Url;

use crate::listing::{FilterMode, ListingKey, PostId};

const MINOR_GALLERY_SEGMENT: &str = "/mgallery/";

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("invalid page url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("page url has no `{0}` parameter")]
    MissingParam(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GalleryKind {
    Minor,
    Regular,
}

impl GalleryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GalleryKind::Minor => "minor",
            GalleryKind::Regular => "regular",
        }
    }
}

/// What the address of the post being viewed tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub kind: GalleryKind,
    pub gallery_id: String,
    pub post: PostId,
    pub page: u32,
    pub mode: FilterMode,
    pub category: Option<String>,
}

impl PageContext {
    pub fn from_url(raw: &str) -> Result<Self, ContextError> {
        let url = Url::parse(raw)?;
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        let kind = if url.path().contains(MINOR_GALLERY_SEGMENT) {
            GalleryKind::Minor
        } else {
            GalleryKind::Regular
        };

        let gallery_id = non_empty(&params, "id").ok_or(ContextError::MissingParam("id"))?;
        let post = non_empty(&params, "no").ok_or(ContextError::MissingParam("no"))?;

        // Missing, zero or garbage page numbers all mean the first page.
        let page = params
            .get("page")
            .and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1);

        let mode = FilterMode::from_param(params.get("exception_mode").map(String::as_str));
        let category = non_empty(&params, "search_head");

        Ok(Self {
            kind,
            gallery_id,
            post: PostId::new(post),
            page,
            mode,
            category,
        })
    }

    pub fn listing_key(&self) -> ListingKey {
        ListingKey::new(self.gallery_id.clone(), self.page)
            .with_mode(self.mode)
            .with_category(self.category.clone())
    }
}

fn non_empty(params: &HashMap<String, String>, name: &str) -> Option<String> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
