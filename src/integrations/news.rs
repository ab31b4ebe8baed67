//! Esports headlines pulled from an RSS feed, cached in memory.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const MAX_ITEMS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    /// Publication time as "HH:MM", empty when the feed date is unreadable.
    pub time: String,
}

#[derive(Debug)]
struct Cached {
    items: Vec<NewsItem>,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct NewsFeed {
    http: reqwest::Client,
    url: String,
    cache: Mutex<Option<Cached>>,
    refresh: tokio::sync::Mutex<()>,
}

impl NewsFeed {
    pub fn new(url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            url: url.to_string(),
            cache: Mutex::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// Cached headlines when fresh, otherwise a new fetch. A failed fetch
    /// falls back to stale cache, then to a fixed list. Concurrent callers
    /// share a single fetch.
    pub async fn latest(&self) -> Vec<NewsItem> {
        if let Some(items) = self.cached(Instant::now(), false) {
            return items;
        }

        let _refresh = self.refresh.lock().await;
        if let Some(items) = self.cached(Instant::now(), false) {
            return items;
        }

        match self.fetch().await {
            Ok(items) => {
                debug!(count = items.len(), "Fetched news feed");
                *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(Cached {
                    items: items.clone(),
                    fetched_at: Instant::now(),
                });
                items
            }
            Err(e) => {
                warn!("News feed fetch failed: {e}");
                self.cached(Instant::now(), true)
                    .unwrap_or_else(fallback_items)
            }
        }
    }

    fn cached(&self, now: Instant, allow_stale: bool) -> Option<Vec<NewsItem>> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|c| allow_stale || now.duration_since(c.fetched_at) < CACHE_TTL)
            .map(|c| c.items.clone())
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Integration(format!("RSS fetch failed: {status}")));
        }
        let xml = response.text().await?;
        parse_feed(&xml)
    }
}

#[derive(Default)]
struct ItemFields {
    title: String,
    link: String,
    pub_date: String,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    PubDate,
}

/// Extracts the first items of an RSS document.
pub fn parse_feed(xml: &str) -> Result<Vec<NewsItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ItemFields> = None;
    let mut field: Option<Field> = None;
    let mut seen = 0;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Integration(format!("invalid RSS: {e}")))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"item" => current = Some(ItemFields::default()),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"link" if current.is_some() => field = Some(Field::Link),
                b"pubDate" if current.is_some() => field = Some(Field::PubDate),
                _ => {}
            },
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::Integration(format!("invalid RSS text: {e}")))?;
                push_text(current.as_mut(), field, &text);
            }
            Event::CData(c) => {
                let bytes = c.into_inner();
                push_text(current.as_mut(), field, &String::from_utf8_lossy(&bytes));
            }
            Event::End(e) => match e.name().as_ref() {
                b"item" => {
                    if let Some(fields) = current.take() {
                        seen += 1;
                        if !fields.title.is_empty() && !fields.link.is_empty() {
                            items.push(NewsItem {
                                time: format_pub_date(&fields.pub_date),
                                title: fields.title,
                                url: fields.link,
                            });
                        }
                        if seen >= MAX_ITEMS {
                            break;
                        }
                    }
                }
                b"title" | b"link" | b"pubDate" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn push_text(current: Option<&mut ItemFields>, field: Option<Field>, text: &str) {
    let (Some(item), Some(field)) = (current, field) else {
        return;
    };
    let target = match field {
        Field::Title => &mut item.title,
        Field::Link => &mut item.link,
        Field::PubDate => &mut item.pub_date,
    };
    target.push_str(text.trim());
}

/// Renders an RFC 2822 date as "HH:MM" in the feed's own offset.
fn format_pub_date(s: &str) -> String {
    chrono::DateTime::parse_from_rfc2822(s.trim())
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn fallback_items() -> Vec<NewsItem> {
    [
        ("CS2 Update: Release Notes", "Now"),
        ("Major: Qualifiers Update", "1h ago"),
        ("S2 Performance Patch", "2h ago"),
        ("Pro League Season 19", "3h ago"),
    ]
    .into_iter()
    .map(|(title, time)| NewsItem {
        title: title.to_string(),
        url: "https://www.hltv.org".to_string(),
        time: time.to_string(),
    })
    .collect()
}
