use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use scraper::{Html, Selector};
use url::Url;

use crate::cache::ListingCache;
use crate::config::Config;
use crate::context::GalleryKind;
use crate::listing::{ListingKey, ListingPage, PostId};
use crate::logger::{LogSink, Severity};

#[derive(Debug, thiserror::Error)]
#[error("fetch failed for {key}: {source}")]
pub struct FetchError {
    pub key: ListingKey,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl FetchError {
    pub fn new(key: &ListingKey, source: anyhow::Error) -> Self {
        Self {
            key: key.clone(),
            source: source.into(),
        }
    }
}

/// Anything that can produce a listing page for a key.
pub trait ListingSource: Send + Sync {
    fn fetch(&self, key: &ListingKey) -> Result<ListingPage, FetchError>;
}

/// How recommended posts are picked out of a listing document.
#[derive(Debug, Clone)]
pub struct PostExtractor {
    selector: Selector,
    attribute: String,
}

impl PostExtractor {
    pub fn new(selector: &str, attribute: &str) -> Result<Self> {
        let selector = Selector::parse(selector)
            .map_err(|err| anyhow!("invalid post selector {selector:?}: {err}"))?;
        Ok(Self {
            selector,
            attribute: attribute.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.navigation.post_list_selector,
            &config.navigation.post_id_attribute,
        )
    }

    /// Document order is kept. Matching rows without the attribute are
    /// skipped rather than turned into empty ids.
    pub fn extract(&self, html: &str) -> ListingPage {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .filter_map(|element| element.value().attr(&self.attribute))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(PostId::from)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl FetcherConfig {
    pub fn from_config(config: &Config, kind: GalleryKind) -> Self {
        Self {
            base_url: config.site.base_url.for_kind(kind).to_string(),
            user_agent: config.site.user_agent.clone(),
            timeout: config.site.timeout,
            http_client: None,
        }
    }
}

/// Fetches listing pages over HTTP and records every success in the cache.
pub struct HttpFetcher {
    http: HttpClient,
    user_agent: String,
    base_url: String,
    extractor: PostExtractor,
    cache: ListingCache,
    sink: Arc<dyn LogSink>,
}

impl HttpFetcher {
    pub fn new(
        config: FetcherConfig,
        extractor: PostExtractor,
        cache: ListingCache,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("build listing HTTP client")?,
        };
        Ok(Self {
            http,
            user_agent: config.user_agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            extractor,
            cache,
            sink,
        })
    }

    pub fn listing_url(&self, key: &ListingKey) -> Result<Url> {
        listing_url(&self.base_url, key)
    }

    fn fetch_page(&self, key: &ListingKey) -> Result<ListingPage> {
        let url = self.listing_url(key)?;
        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .with_context(|| format!("request {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {status}"));
        }

        let body = response.text().context("read listing body")?;
        Ok(self.extractor.extract(&body))
    }
}

impl ListingSource for HttpFetcher {
    fn fetch(&self, key: &ListingKey) -> Result<ListingPage, FetchError> {
        let page = self
            .fetch_page(key)
            .map_err(|err| FetchError::new(key, err))?;
        self.cache.put(key, &page);
        self.sink.emit(
            "fetch_listing",
            Severity::Success,
            &format!("page: {} ({} posts)", key.page, page.len()),
        );
        Ok(page)
    }
}

/// `<base>/lists/?id=<gallery>[&exception_mode=recommend][&search_head=<c>]&page=<n>`
pub fn listing_url(base_url: &str, key: &ListingKey) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/lists/", base_url.trim_end_matches('/')))
        .with_context(|| format!("invalid listing base url {base_url:?}"))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("id", &key.gallery_id);
        for (name, value) in key.filter_params() {
            query.append_pair(name, &value);
        }
        query.append_pair("page", &key.page.to_string());
    }
    Ok(url)
}
