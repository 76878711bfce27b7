//! Catalog browsing: three independently paged, filterable lists (artists,
//! albums, titles) over the server's `/songmeta` endpoint.
//!
//! `CatalogLists` is sans-IO. It decides which page each list should show,
//! hands out `(CatalogRequest, seq)` pairs for the session to run through
//! `CatalogClient`, and drops any response whose `seq` is no longer the
//! latest for its list.

use tracing::{debug, warn};
use tunedeck_proto::catalog::{CatalogFilters, CatalogPage, CatalogRequest, ListKind};
use tunedeck_proto::track::Track;

use crate::error::ClientError;
use crate::paging::PagingMemory;
use crate::selection::{SelectableList, SelectionError};

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn query(&self, request: &CatalogRequest) -> Result<CatalogPage, ClientError> {
        let url = format!("{}/songmeta", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&request.query_pairs())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                route: "/songmeta".to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(CatalogPage::decode(&body)?)
    }
}

/// Page bookkeeping for one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPaging {
    page: usize,
    /// Highest page proven to exist, learned from the eof sentinel.
    last_known_page: Option<usize>,
    is_last: bool,
    seq: u64,
}

impl ListPaging {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn is_last(&self) -> bool {
        self.is_last
    }

    pub fn last_known_page(&self) -> Option<usize> {
        self.last_known_page
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Bound `page` to `[0, last_known_page]`.
    pub fn clamp(&self, page: usize) -> usize {
        match self.last_known_page {
            Some(last) => page.min(last),
            None => page,
        }
    }

    /// Move to `page` (unclamped) and return the sequence number of the
    /// request that will fetch it.
    fn issue(&mut self, page: usize) -> u64 {
        self.page = page;
        self.seq += 1;
        self.seq
    }

    fn is_current(&self, seq: u64) -> bool {
        seq == self.seq
    }

    /// The result set changed; what we knew about its extent is void.
    fn invalidate(&mut self) {
        self.last_known_page = None;
        self.is_last = false;
    }

    /// Update from a fresh page. Returns the page to fall back to when the
    /// request landed past the end of the results.
    fn record(&mut self, page: &CatalogPage) -> Option<usize> {
        self.is_last = page.is_last;
        if !page.is_last {
            if self.last_known_page.is_some_and(|last| self.page >= last) {
                self.last_known_page = None;
            }
            return None;
        }
        if page.tracks.is_empty() && self.page > 0 {
            let back = self.page - 1;
            self.last_known_page = Some(back);
            return Some(back);
        }
        self.last_known_page = Some(self.page);
        None
    }
}

/// A query the session should run, tagged with its list's sequence number.
pub type PendingQuery = (CatalogRequest, u64);

#[derive(Debug, Clone)]
pub struct CatalogLists {
    filters: CatalogFilters,
    page_size: usize,
    artists: SelectableList<String>,
    albums: SelectableList<String>,
    titles: SelectableList<Track>,
    paging: [ListPaging; 3],
    memory: [PagingMemory; 3],
}

impl CatalogLists {
    pub fn new(page_size: usize) -> Self {
        Self {
            filters: CatalogFilters::default(),
            page_size,
            artists: SelectableList::default(),
            albums: SelectableList::default(),
            titles: SelectableList::default(),
            paging: Default::default(),
            memory: Default::default(),
        }
    }

    pub fn filters(&self) -> &CatalogFilters {
        &self.filters
    }

    pub fn paging(&self, list: ListKind) -> &ListPaging {
        &self.paging[list.index()]
    }

    pub fn memory(&self, list: ListKind) -> &PagingMemory {
        &self.memory[list.index()]
    }

    pub fn artists(&self) -> &SelectableList<String> {
        &self.artists
    }

    pub fn albums(&self) -> &SelectableList<String> {
        &self.albums
    }

    pub fn titles(&self) -> &SelectableList<Track> {
        &self.titles
    }

    fn request(&mut self, list: ListKind, page: usize) -> PendingQuery {
        let seq = self.paging[list.index()].issue(page);
        let mut request = CatalogRequest::new(list, page, self.filters.clone());
        request.page_size = self.page_size;
        (request, seq)
    }

    /// Re-query every list at its current page.
    pub fn refresh_all(&mut self) -> Vec<PendingQuery> {
        ListKind::ALL
            .iter()
            .map(|&list| {
                let page = self.paging[list.index()].page();
                self.request(list, page)
            })
            .collect()
    }

    /// The catalog itself changed (a scan finished): forget remembered pages
    /// and extents, then re-query.
    pub fn catalog_changed(&mut self) -> Vec<PendingQuery> {
        for list in ListKind::ALL {
            self.memory[list.index()].reset();
            self.paging[list.index()].invalidate();
        }
        self.refresh_all()
    }

    /// New text for one list's filter. Every list is re-queried, since each
    /// filter narrows all three. The edited list starts from the page its
    /// memory holds for the new length; the others restart at page 0.
    pub fn set_filter(&mut self, list: ListKind, text: &str) -> Vec<PendingQuery> {
        if self.filters.get(list) == text {
            return Vec::new();
        }
        self.filters.set(list, text);

        let len = text.chars().count();
        let seeded = self.memory[list.index()].page_for(len);
        self.memory[list.index()].record_page(len, seeded);

        self.reseed_pages(Some((list, seeded)))
    }

    pub fn clear_filters(&mut self) -> Vec<PendingQuery> {
        self.filters = CatalogFilters::default();
        for memory in &mut self.memory {
            memory.reset();
        }
        self.reseed_pages(None)
    }

    fn reseed_pages(&mut self, edited: Option<(ListKind, usize)>) -> Vec<PendingQuery> {
        ListKind::ALL
            .iter()
            .map(|&list| {
                let page = match edited {
                    Some((kind, seeded)) if kind == list => seeded,
                    _ => 0,
                };
                self.paging[list.index()].invalidate();
                self.request(list, page)
            })
            .collect()
    }

    /// Step `delta` pages. Nothing is requested when the clamped page equals
    /// the current one.
    pub fn change_page(&mut self, list: ListKind, delta: i64) -> Option<PendingQuery> {
        let paging = &self.paging[list.index()];
        let current = paging.page();
        let wanted = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            current.saturating_add(delta as usize)
        };
        let mut target = paging.clamp(wanted);
        if paging.is_last() && target > current {
            target = current;
        }
        if target == current {
            return None;
        }

        let len = self.filters.get(list).chars().count();
        self.memory[list.index()].record_page(len, target);
        Some(self.request(list, target))
    }

    /// Apply a query result. Returns a follow-up query when the page turned
    /// out to be past the end.
    pub fn on_page(
        &mut self,
        list: ListKind,
        seq: u64,
        result: Result<CatalogPage, ClientError>,
    ) -> Option<PendingQuery> {
        if !self.paging[list.index()].is_current(seq) {
            debug!("dropping stale {} page (seq {})", list, seq);
            return None;
        }
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!("{} query failed: {}", list, e);
                return None;
            }
        };

        if let Some(back) = self.paging[list.index()].record(&page) {
            debug!("{} page past the end; falling back to {}", list, back);
            let len = self.filters.get(list).chars().count();
            self.memory[list.index()].record_page(len, back);
            return Some(self.request(list, back));
        }

        match list {
            ListKind::Artist => self.artists.replace(page.values(list)),
            ListKind::Album => self.albums.replace(page.values(list)),
            ListKind::Title => self.titles.replace(page.tracks),
        }
        None
    }

    pub fn select(&mut self, list: ListKind, index: usize) -> Result<(), SelectionError> {
        match list {
            ListKind::Artist => self.artists.select(index),
            ListKind::Album => self.albums.select(index),
            ListKind::Title => self.titles.select(index),
        }
    }

    pub fn unselect(&mut self, list: ListKind, index: usize) -> Result<(), SelectionError> {
        match list {
            ListKind::Artist => self.artists.unselect(index),
            ListKind::Album => self.albums.unselect(index),
            ListKind::Title => self.titles.unselect(index),
        }
    }

    pub fn toggle(&mut self, list: ListKind, index: usize) -> Result<bool, SelectionError> {
        match list {
            ListKind::Artist => self.artists.toggle(index),
            ListKind::Album => self.albums.toggle(index),
            ListKind::Title => self.titles.toggle(index),
        }
    }

    pub fn select_only(&mut self, list: ListKind, index: usize) -> Result<(), SelectionError> {
        match list {
            ListKind::Artist => self.artists.select_only(index),
            ListKind::Album => self.albums.select_only(index),
            ListKind::Title => self.titles.select_only(index),
        }
    }

    pub fn clear_selection(&mut self, list: ListKind) {
        match list {
            ListKind::Artist => self.artists.clear_selection(),
            ListKind::Album => self.albums.clear_selection(),
            ListKind::Title => self.titles.clear_selection(),
        }
    }

    pub fn count_selected(&self, list: ListKind) -> usize {
        match list {
            ListKind::Artist => self.artists.count_selected(),
            ListKind::Album => self.albums.count_selected(),
            ListKind::Title => self.titles.count_selected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(n: usize, is_last: bool) -> CatalogPage {
        CatalogPage {
            tracks: (0..n)
                .map(|i| Track {
                    path: format!("t{}.mp3", i),
                    title: format!("T{}", i),
                    ..Track::default()
                })
                .collect(),
            is_last,
        }
    }

    fn artists(names: &[&str], is_last: bool) -> CatalogPage {
        CatalogPage {
            tracks: names
                .iter()
                .map(|n| Track {
                    artist: n.to_string(),
                    ..Track::default()
                })
                .collect(),
            is_last,
        }
    }

    #[test]
    fn test_clamp_to_last_known_page() {
        let mut lists = CatalogLists::new(10);
        let mut q = lists.refresh_all();
        let (_, seq) = q.remove(2);

        // Walk the title list forward to page 2, which carries the sentinel.
        lists.on_page(ListKind::Title, seq, Ok(titles(10, false)));
        let (_, seq) = lists.change_page(ListKind::Title, 1).unwrap();
        lists.on_page(ListKind::Title, seq, Ok(titles(10, false)));
        let (_, seq) = lists.change_page(ListKind::Title, 1).unwrap();
        lists.on_page(ListKind::Title, seq, Ok(titles(4, true)));

        let paging = lists.paging(ListKind::Title);
        assert_eq!(paging.page(), 2);
        assert!(paging.is_last());
        assert_eq!(paging.clamp(5), 2);

        // Asking for three pages further is a no-op, not a request for page 5.
        assert!(lists.change_page(ListKind::Title, 3).is_none());
        assert_eq!(lists.titles().len(), 4);
    }

    #[test]
    fn test_page_past_end_falls_back() {
        let mut lists = CatalogLists::new(10);
        lists.refresh_all();
        let (req, seq) = lists.change_page(ListKind::Artist, 5).unwrap();
        assert_eq!(req.page, 5);

        let (retry, _) = lists
            .on_page(ListKind::Artist, seq, Ok(artists(&[], true)))
            .unwrap();
        assert_eq!(retry.page, 4);
        assert_eq!(lists.paging(ListKind::Artist).last_known_page(), Some(4));
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut lists = CatalogLists::new(10);
        let first = lists.refresh_all();
        let (_, old_seq) = first[0].clone();
        let second = lists.set_filter(ListKind::Artist, "lo");
        let (_, new_seq) = second[0].clone();

        lists.on_page(ListKind::Artist, old_seq, Ok(artists(&["Abba"], true)));
        assert!(lists.artists().is_empty());

        lists.on_page(ListKind::Artist, new_seq, Ok(artists(&["Low"], true)));
        assert_eq!(lists.artists().items(), &["Low".to_string()]);
    }

    #[test]
    fn test_filter_change_requeries_all_lists_with_remembered_pages() {
        let mut lists = CatalogLists::new(10);
        lists.refresh_all();

        // Reach page 3 of titles with filter "wa".
        lists.set_filter(ListKind::Title, "wa");
        for _ in 0..3 {
            lists.change_page(ListKind::Title, 1);
        }
        assert_eq!(lists.memory(ListKind::Title).page_for(2), 3);

        // Typing narrows to "wat": nothing remembered, page 0.
        let queries = lists.set_filter(ListKind::Title, "wat");
        assert_eq!(queries.len(), 3);
        let title = queries.iter().find(|(r, _)| r.list == ListKind::Title).unwrap();
        assert_eq!(title.0.page, 0);
        assert_eq!(title.0.filters.title, "wat");

        // Deleting back to "wa" restores page 3.
        let queries = lists.set_filter(ListKind::Title, "wa");
        let title = queries.iter().find(|(r, _)| r.list == ListKind::Title).unwrap();
        assert_eq!(title.0.page, 3);

        // Unchanged text issues nothing.
        assert!(lists.set_filter(ListKind::Title, "wa").is_empty());
    }

    #[test]
    fn test_filter_change_restarts_other_lists_at_first_page() {
        let mut lists = CatalogLists::new(10);
        lists.refresh_all();
        lists.change_page(ListKind::Artist, 2);
        assert_eq!(lists.paging(ListKind::Artist).page(), 2);

        // The title filter narrows the artist results too; page 2 may be gone.
        let queries = lists.set_filter(ListKind::Title, "x");
        let artist = queries.iter().find(|(r, _)| r.list == ListKind::Artist).unwrap();
        assert_eq!(artist.0.page, 0);
        assert_eq!(lists.paging(ListKind::Artist).page(), 0);
        // What the artist list remembered for its own filter is untouched.
        assert_eq!(lists.memory(ListKind::Artist).page_for(0), 2);
    }

    #[test]
    fn test_catalog_changed_forgets_memory() {
        let mut lists = CatalogLists::new(10);
        lists.refresh_all();
        lists.change_page(ListKind::Album, 2);
        assert_eq!(lists.memory(ListKind::Album).page_for(0), 2);

        let queries = lists.catalog_changed();
        assert_eq!(queries.len(), 3);
        assert!(lists.memory(ListKind::Album).is_empty());
        assert_eq!(lists.paging(ListKind::Album).last_known_page(), None);
    }

    #[test]
    fn test_selection_survives_refresh() {
        let mut lists = CatalogLists::new(10);
        let q = lists.refresh_all();
        lists.on_page(ListKind::Title, q[2].1, Ok(titles(3, true)));
        lists.select(ListKind::Title, 1).unwrap();

        let q = lists.refresh_all();
        lists.on_page(ListKind::Title, q[2].1, Ok(titles(5, true)));
        assert_eq!(lists.titles().selected_indexes(), vec![1]);
        assert_eq!(lists.count_selected(ListKind::Title), 1);
        assert!(lists.select(ListKind::Artist, 0).is_err());
    }
}
