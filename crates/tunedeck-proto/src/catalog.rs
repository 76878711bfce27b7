//! Catalog query parameters and result decoding.
//!
//! The server pages results by reading one row more than the page size: if
//! the extra row doesn't exist it appends a terminal `{"eof": ...}` element
//! instead. That sentinel is the only reliable "last page" signal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::track::Track;

pub const PAGE_SIZE: usize = 10;

const ARTIST_FIELDS: &[&str] = &["artist"];
const ALBUM_FIELDS: &[&str] = &["album"];
const TITLE_ORDER: &[&str] = &["tracknum", "title"];

/// The three independently paged catalog lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Artist,
    Album,
    Title,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Artist, ListKind::Album, ListKind::Title];

    /// Server-side ordering requested for this list.
    pub fn order_fields(&self) -> &'static [&'static str] {
        match self {
            ListKind::Artist => ARTIST_FIELDS,
            ListKind::Album => ALBUM_FIELDS,
            ListKind::Title => TITLE_ORDER,
        }
    }

    /// Projection requested for this list; `None` means every field.
    pub fn projection(&self) -> Option<&'static [&'static str]> {
        match self {
            ListKind::Artist => Some(ARTIST_FIELDS),
            ListKind::Album => Some(ALBUM_FIELDS),
            ListKind::Title => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ListKind::Artist => 0,
            ListKind::Album => 1,
            ListKind::Title => 2,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListKind::Artist => "artist",
            ListKind::Album => "album",
            ListKind::Title => "title",
        })
    }
}

/// Substring filters; an empty string matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilters {
    pub artist: String,
    pub album: String,
    pub title: String,
}

impl CatalogFilters {
    pub fn get(&self, list: ListKind) -> &str {
        match list {
            ListKind::Artist => &self.artist,
            ListKind::Album => &self.album,
            ListKind::Title => &self.title,
        }
    }

    pub fn set(&mut self, list: ListKind, text: impl Into<String>) {
        let text = text.into();
        match list {
            ListKind::Artist => self.artist = text,
            ListKind::Album => self.album = text,
            ListKind::Title => self.title = text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub list: ListKind,
    pub page: usize,
    pub page_size: usize,
    pub filters: CatalogFilters,
}

impl CatalogRequest {
    pub fn new(list: ListKind, page: usize, filters: CatalogFilters) -> Self {
        Self {
            list,
            page,
            page_size: PAGE_SIZE,
            filters,
        }
    }

    /// Query-string pairs for `GET /songmeta`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("pagesize", self.page_size.to_string()),
            ("page", self.page.to_string()),
            ("artist", self.filters.artist.clone()),
            ("album", self.filters.album.clone()),
            ("title", self.filters.title.clone()),
            ("order", self.list.order_fields().join(",")),
        ];
        if let Some(fields) = self.list.projection() {
            pairs.push(("fields", fields.join(",")));
        }
        pairs
    }
}

/// One decoded page. `tracks` never contains the sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub tracks: Vec<Track>,
    pub is_last: bool,
}

impl CatalogPage {
    /// Decode the raw row array. A row carrying an `eof` key marks the end of
    /// results and is dropped from the data.
    pub fn from_rows(rows: Vec<Value>) -> Result<Self, serde_json::Error> {
        let mut page = CatalogPage::default();
        for row in rows {
            if row.get("eof").is_some() {
                page.is_last = true;
                continue;
            }
            page.tracks.push(serde_json::from_value(row)?);
        }
        Ok(page)
    }

    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        let rows: Vec<Value> = serde_json::from_str(body)?;
        Self::from_rows(rows)
    }

    /// The display values of this page for `list`: artist names, album
    /// names, or (for titles) the track titles.
    pub fn values(&self, list: ListKind) -> Vec<String> {
        self.tracks
            .iter()
            .map(|t| match list {
                ListKind::Artist => t.artist.clone(),
                ListKind::Album => t.album.clone(),
                ListKind::Title => t.title.clone(),
            })
            .collect()
    }
}
