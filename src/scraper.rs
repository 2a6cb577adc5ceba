/// file: src/scraper.rs
/// description: Search page fetch, embedded payload location, and result assembly.
/// Scraper: fetches the search results page, cuts the embedded JSON
/// assignment out of the HTML and turns it into a bounded list of videos.
///
/// No retries and no caching: every call goes to the upstream site once.
use crate::config::SearchConfig;
use crate::extract::parse_video_renderer;
use crate::models::{AppError, VideoResult};
use crate::normalize::{Locale, PT_BR};
use crate::scan::{VIDEO_RENDERER_KEY, find_renderers};
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Start of the JavaScript assignment carrying the results payload.
pub const PAYLOAD_START: &str = "var ytInitialData = ";
/// End of that assignment.
pub const PAYLOAD_END: &str = ";</script>";

// ---------------------------------------------------------------------------
// HTTP scraper
// ---------------------------------------------------------------------------

pub struct HttpScraper {
    client: Client,
    config: SearchConfig,
}

impl HttpScraper {
    pub fn new(config: &SearchConfig) -> Result<Self, AppError> {
        let mut builder = Client::builder().user_agent(&config.user_agent);

        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            config: config.clone(),
        })
    }

    pub fn search_url(&self, query: &str) -> Result<Url, AppError> {
        let raw = format!(
            "{}/results?search_query={}&hl={}",
            self.config.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.config.locale),
        );
        Ok(Url::parse(&raw)?)
    }

    /// GETs `url` and returns the body. Non-2xx statuses are errors.
    pub async fn fetch(&self, url: Url) -> Result<String, AppError> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, &self.config.accept_language)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus(status.as_u16()));
        }

        Ok(resp.text().await?)
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// The JSON text between [`PAYLOAD_START`] and the first [`PAYLOAD_END`] after
/// it. `None` when either delimiter is missing or nothing sits between them.
pub fn embedded_payload(html: &str) -> Option<&str> {
    let start = html.find(PAYLOAD_START)? + PAYLOAD_START.len();
    let rest = &html[start..];
    let end = rest.find(PAYLOAD_END)?;
    let payload = &rest[..end];
    if payload.is_empty() { None } else { Some(payload) }
}

/// Runs the extractor over every renderer in discovery order and stops as
/// soon as `max` results are collected.
pub fn collect_videos(data: &Value, max: usize, locale: &Locale) -> Vec<VideoResult> {
    let mut videos = Vec::with_capacity(max);
    if max == 0 {
        return videos;
    }

    for renderer in find_renderers(data, VIDEO_RENDERER_KEY) {
        match parse_video_renderer(renderer, locale) {
            Some(video) => videos.push(video),
            None => debug!(
                video_id = renderer.get("videoId").and_then(|v| v.as_str()),
                "Skipping renderer without id or title"
            ),
        }
        if videos.len() >= max {
            break;
        }
    }

    videos
}

/// Parses an already-fetched search page.
pub fn videos_from_html(
    html: &str,
    max: usize,
    locale: &Locale,
) -> Result<Vec<VideoResult>, AppError> {
    let Some(payload) = embedded_payload(html) else {
        debug!("Search page has no embedded results payload");
        return Ok(Vec::new());
    };

    let data: Value = serde_json::from_str(payload)?;
    Ok(collect_videos(&data, max, locale))
}

// ---------------------------------------------------------------------------
// Top-level Scraper
// ---------------------------------------------------------------------------

pub struct Scraper {
    pub http: HttpScraper,
    locale: &'static Locale,
}

impl Scraper {
    pub fn new(cfg: &SearchConfig) -> Result<Self, AppError> {
        debug!(
            base_url = %cfg.base_url,
            locale = %cfg.locale,
            timeout_seconds = ?cfg.timeout_seconds,
            "Search scraper settings"
        );

        Ok(Self {
            http: HttpScraper::new(cfg)?,
            locale: Locale::for_tag(&cfg.locale).unwrap_or(&PT_BR),
        })
    }

    /// Fetches results for `query`, returning at most `max` videos.
    pub async fn search(&self, query: &str, max: usize) -> Result<Vec<VideoResult>, AppError> {
        let url = self.http.search_url(query)?;
        let html = self.http.fetch(url).await?;
        let videos = videos_from_html(&html, max, self.locale)?;
        info!(query, max, found = videos.len(), "Search page processed");
        Ok(videos)
    }
}
