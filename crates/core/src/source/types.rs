//! Types exchanged with the remote catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Titles keyed by locale code (`"en"`, `"ja-ro"`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl LocalizedText {
    /// Create from `(locale, text)` pairs.
    pub fn from_pairs<I, L, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(l, t)| (l.into(), t.into()))
                .collect(),
        )
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }

    /// First non-empty entry in locale order.
    pub fn first(&self) -> Option<&str> {
        self.0.values().map(String::as_str).find(|t| !t.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }
}

/// Pick a display title: preferred locale in the main title, then in the
/// alternative titles, then the first main title, then the first alternative.
pub fn pick_title(title: &LocalizedText, alt_titles: &[LocalizedText], preferred: &str) -> String {
    title
        .get(preferred)
        .or_else(|| alt_titles.iter().find_map(|alt| alt.get(preferred)))
        .or_else(|| title.first())
        .or_else(|| alt_titles.iter().find_map(|alt| alt.first()))
        .unwrap_or_default()
        .to_string()
}

/// A top-level catalog entry (a series).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    /// Remote identifier.
    pub id: String,
    /// Display title, already resolved through the locale fallback.
    pub title: String,
    /// Creation time on the remote; drives ordering and the watermark.
    pub created_at: DateTime<Utc>,
    /// Last modification on the remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A chapter of a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChildItem {
    pub id: String,
    pub catalog_id: String,
    /// Human-readable label (title, else ordinal based).
    pub label: String,
    /// Chapter number as published (may be fractional, e.g. "10.5").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_language: Option<String>,
}

/// Build a chapter label from its optional title and number.
pub fn chapter_label(title: Option<&str>, chapter: Option<&str>) -> String {
    match (
        title.map(str::trim).filter(|t| !t.is_empty()),
        chapter.map(str::trim).filter(|c| !c.is_empty()),
    ) {
        (Some(title), _) => title.to_string(),
        (None, Some(chapter)) => format!("Chapter {}", chapter),
        (None, None) => "Oneshot".to_string(),
    }
}

/// One offset/limit page of a remote listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// Total matching entries declared by the remote.
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

impl<T> ListPage<T> {
    /// Whether entries exist beyond this page.
    pub fn has_more(&self) -> bool {
        self.total > self.offset.saturating_add(self.limit)
    }
}

/// Query for the creation-ordered catalog listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Inclusive lower bound on creation time.
    pub created_since: DateTime<Utc>,
    pub limit: u32,
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_title_prefers_locale() {
        let title = LocalizedText::from_pairs([("ja", "ワンピース"), ("en", "One Piece")]);
        assert_eq!(pick_title(&title, &[], "en"), "One Piece");
    }

    #[test]
    fn test_pick_title_falls_back_to_alt_titles() {
        let title = LocalizedText::from_pairs([("ja-ro", "Shingeki no Kyojin")]);
        let alts = vec![
            LocalizedText::from_pairs([("fr", "L'Attaque des Titans")]),
            LocalizedText::from_pairs([("en", "Attack on Titan")]),
        ];
        assert_eq!(pick_title(&title, &alts, "en"), "Attack on Titan");
    }

    #[test]
    fn test_pick_title_falls_back_to_first_available() {
        let title = LocalizedText::from_pairs([("ko", "나 혼자만 레벨업"), ("ja", "俺だけレベルアップな件")]);
        // BTreeMap order: "ja" < "ko"
        assert_eq!(pick_title(&title, &[], "en"), "俺だけレベルアップな件");
    }

    #[test]
    fn test_pick_title_ignores_blank_entries() {
        let title = LocalizedText::from_pairs([("en", "  "), ("it", "Titolo")]);
        assert_eq!(pick_title(&title, &[], "en"), "Titolo");
        assert_eq!(pick_title(&LocalizedText::default(), &[], "en"), "");
    }

    #[test]
    fn test_chapter_label() {
        assert_eq!(chapter_label(Some("The Beginning"), Some("1")), "The Beginning");
        assert_eq!(chapter_label(Some(""), Some("10.5")), "Chapter 10.5");
        assert_eq!(chapter_label(None, None), "Oneshot");
    }

    #[test]
    fn test_list_page_has_more() {
        let page: ListPage<()> = ListPage {
            items: vec![],
            total: 1200,
            limit: 500,
            offset: 500,
        };
        assert!(page.has_more());

        let last: ListPage<()> = ListPage {
            items: vec![],
            total: 1000,
            limit: 500,
            offset: 500,
        };
        assert!(!last.has_more());
    }
}
