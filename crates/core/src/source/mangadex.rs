//! MangaDex API client.
//!
//! MangaDex notes:
//! - `createdAtSince` takes a timezone-less `YYYY-MM-DDTHH:MM:SS` value (UTC)
//! - list endpoints cap `limit` at 100, the chapter feed at 500
//! - page images are resolved through the at-home server endpoint

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{
    chapter_label, pick_title, CatalogItem, CatalogQuery, ChildItem, ListPage, LocalizedText,
};
use super::{CatalogSource, SourceError};
use crate::config::SourceConfig;

const MAX_LIST_LIMIT: u32 = 100;
const MAX_FEED_LIMIT: u32 = 500;
const CREATED_SINCE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// MangaDex catalog client.
pub struct MangaDexSource {
    client: Client,
    base_url: String,
    preferred_locale: String,
    translated_languages: Vec<String>,
}

impl MangaDexSource {
    /// Create a new client.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            preferred_locale: config.preferred_locale.clone(),
            translated_languages: config.translated_languages.clone(),
        })
    }

    /// Issue a GET and decode the JSON body, mapping HTTP statuses to errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if status == 429 {
            warn!("MangaDex rate limit exceeded on {}", path);
            return Err(SourceError::RateLimitExceeded);
        }
        if status == 404 {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| {
            SourceError::ParseError(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    fn to_catalog_item(&self, manga: MdManga) -> CatalogItem {
        CatalogItem {
            title: pick_title(
                &manga.attributes.title,
                &manga.attributes.alt_titles,
                &self.preferred_locale,
            ),
            id: manga.id,
            created_at: manga.attributes.created_at,
            updated_at: manga.attributes.updated_at,
        }
    }
}

#[async_trait]
impl CatalogSource for MangaDexSource {
    async fn list_catalog(
        &self,
        query: &CatalogQuery,
    ) -> Result<ListPage<CatalogItem>, SourceError> {
        let limit = query.limit.min(MAX_LIST_LIMIT);
        let created_since = query
            .created_since
            .format(CREATED_SINCE_FORMAT)
            .to_string();

        debug!(
            "MangaDex list manga: createdAtSince={}, limit={}, offset={}",
            created_since, limit, query.offset
        );

        let response: MdCollection<MdManga> = self
            .get_json(
                "/manga",
                &[
                    ("createdAtSince", created_since),
                    ("order[createdAt]", "asc".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", query.offset.to_string()),
                ],
            )
            .await?;

        Ok(ListPage {
            total: response.total,
            limit: response.limit,
            offset: response.offset,
            items: response
                .data
                .into_iter()
                .map(|m| self.to_catalog_item(m))
                .collect(),
        })
    }

    async fn list_child_items(
        &self,
        catalog_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ListPage<ChildItem>, SourceError> {
        let limit = limit.min(MAX_FEED_LIMIT);

        debug!(
            "MangaDex chapter feed: manga={}, limit={}, offset={}",
            catalog_id, limit, offset
        );

        let mut query = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("order[volume]", "asc".to_string()),
            ("order[chapter]", "asc".to_string()),
        ];
        for lang in &self.translated_languages {
            query.push(("translatedLanguage[]", lang.clone()));
        }

        let response: MdCollection<MdChapter> = self
            .get_json(&format!("/manga/{}/feed", catalog_id), &query)
            .await?;

        Ok(ListPage {
            total: response.total,
            limit: response.limit,
            offset: response.offset,
            items: response
                .data
                .into_iter()
                .map(|c| ChildItem {
                    label: chapter_label(
                        c.attributes.title.as_deref(),
                        c.attributes.chapter.as_deref(),
                    ),
                    id: c.id,
                    catalog_id: catalog_id.to_string(),
                    chapter: c.attributes.chapter,
                    volume: c.attributes.volume,
                    translated_language: c.attributes.translated_language,
                })
                .collect(),
        })
    }

    async fn list_content_units(&self, child_id: &str) -> Result<Vec<String>, SourceError> {
        debug!("MangaDex at-home server: chapter={}", child_id);

        let response: MdAtHome = self
            .get_json(&format!("/at-home/server/{}", child_id), &[])
            .await?;

        Ok(response.page_urls())
    }

    async fn list_recently_updated(&self, limit: u32) -> Result<Vec<CatalogItem>, SourceError> {
        let limit = limit.min(MAX_LIST_LIMIT);

        debug!("MangaDex recently updated: limit={}", limit);

        let response: MdCollection<MdManga> = self
            .get_json(
                "/manga",
                &[
                    ("order[updatedAt]", "desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(response
            .data
            .into_iter()
            .map(|m| self.to_catalog_item(m))
            .collect())
    }
}

// ============================================================================
// MangaDex API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct MdCollection<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    limit: u32,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct MdManga {
    id: String,
    attributes: MdMangaAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MdMangaAttributes {
    #[serde(default)]
    title: LocalizedText,
    #[serde(default)]
    alt_titles: Vec<LocalizedText>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MdChapter {
    id: String,
    attributes: MdChapterAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MdChapterAttributes {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    translated_language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MdAtHome {
    base_url: String,
    chapter: MdAtHomeChapter,
}

#[derive(Debug, Deserialize)]
struct MdAtHomeChapter {
    hash: String,
    #[serde(default)]
    data: Vec<String>,
}

impl MdAtHome {
    fn page_urls(&self) -> Vec<String> {
        let base = self.base_url.trim_end_matches('/');
        self.chapter
            .data
            .iter()
            .map(|file| format!("{}/data/{}/{}", base, self.chapter.hash, file))
            .collect()
    }
}
