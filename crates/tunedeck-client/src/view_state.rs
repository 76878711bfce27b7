//! The client's mirror of the remote player, and everything derived from it.
//!
//! `ViewState` is the only owner of session state. It never performs I/O:
//! inputs arrive as method calls carrying the current `Instant`, and any
//! request it wants made comes back as an `Effect` for the session to run.

use std::time::{Duration, Instant};

use tracing::{debug, warn};
use tunedeck_proto::catalog::{CatalogPage, CatalogRequest, ListKind};
use tunedeck_proto::command::{CommandReply, PlayerCommand};
use tunedeck_proto::config::SyncConfig;
use tunedeck_proto::push::{PushMessage, RepeatMode, ScanProgress, TransportState};
use tunedeck_proto::track::{QueueEntry, Track, TrackMeta};

use crate::catalog::{CatalogLists, PendingQuery};
use crate::display;
use crate::error::ClientError;
use crate::event_channel::ConnectionState;
use crate::seek::{OffsetGate, SeekCoordinator};
use crate::selection::{Keyed, SelectableList, SelectionError};
use crate::throttle::Throttler;

/// Lists the user can select in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListId {
    Artist,
    Album,
    Title,
    Queue,
    Recent,
}

/// Lists mirrored from push messages rather than fetched from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalList {
    Queue,
    Recent,
}

/// Where selection intents for a `ListId` are applied.
enum ListTarget {
    Catalog(ListKind),
    Local(LocalList),
}

impl ListId {
    fn target(self) -> ListTarget {
        match self {
            ListId::Artist => ListTarget::Catalog(ListKind::Artist),
            ListId::Album => ListTarget::Catalog(ListKind::Album),
            ListId::Title => ListTarget::Catalog(ListKind::Title),
            ListId::Queue => ListTarget::Local(LocalList::Queue),
            ListId::Recent => ListTarget::Local(LocalList::Recent),
        }
    }
}

impl From<ListKind> for ListId {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Artist => ListId::Artist,
            ListKind::Album => ListId::Album,
            ListKind::Title => ListId::Title,
        }
    }
}

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    Load(String),
    /// Slider movement; coalesced before it reaches the server.
    SetVolume(u8),
    /// Seek bar being dragged: shown locally, nothing sent.
    SeekPreview(i64),
    /// Seek bar released at a position.
    SeekRelease(i64),
    Enqueue(String),
    EnqueueSelectedTitles,
    /// Shift the selected queue entries up (negative) or down.
    MoveSelected(i32),
    MoveSelectedToTop,
    RemoveSelected,
    ClearQueue,
    SetRepeatMode(RepeatMode),
    CycleRepeatMode,
    StartScan,
    SetFilter(ListKind, String),
    ClearFilters,
    ChangePage(ListKind, i64),
    RefreshCatalog,
    Select(ListId, usize),
    Unselect(ListId, usize),
    ToggleSelected(ListId, usize),
    SelectOnly(ListId, usize),
    ClearSelection(ListId),
}

/// Work for the session: a request to run, with its result fed back in.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Command(PlayerCommand),
    Query(CatalogRequest, u64),
}

impl From<PendingQuery> for Effect {
    fn from((request, seq): PendingQuery) -> Self {
        Effect::Query(request, seq)
    }
}

/// The loaded track with its display strings worked out once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    pub bitrate: Option<u32>,
    pub sec_per_sample: Option<f64>,
    /// `"44.1 kHz"`, empty when the rate is unknown.
    pub khz: String,
    /// Track length as `MM:SS` / `H:MM:SS`, empty when unknown.
    pub duration_text: String,
}

impl From<TrackMeta> for NowPlaying {
    fn from(meta: TrackMeta) -> Self {
        let khz = meta.track.rate.map(display::rate_to_khz).unwrap_or_default();
        let duration_text = meta
            .track
            .duration
            .map(display::duration_to_time)
            .unwrap_or_default();
        Self {
            track: meta.track,
            bitrate: meta.bitrate,
            sec_per_sample: meta.sec_per_sample,
            khz,
            duration_text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScanStatus {
    #[default]
    Idle,
    /// Asked for, no progress seen yet.
    Requested,
    Scanning { last: ScanProgress },
}

impl ScanStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, ScanStatus::Idle)
    }
}

/// One list element as the renderer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub item: T,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub rows: Vec<Row<T>>,
    pub selected_count: usize,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            selected_count: 0,
        }
    }
}

impl<T: Keyed + Clone> From<&SelectableList<T>> for ListView<T> {
    fn from(list: &SelectableList<T>) -> Self {
        let selected = list.selected_indexes();
        let rows = list
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| Row {
                item: item.clone(),
                selected: selected.binary_search(&i).is_ok(),
            })
            .collect();
        Self {
            rows,
            selected_count: selected.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogListView<T> {
    pub list: ListView<T>,
    pub filter: String,
    pub page: usize,
    pub is_last: bool,
}

/// Everything the rendering layer needs, detached from `ViewState`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSnapshot {
    pub connection: ConnectionState,
    pub connected: bool,
    pub state: TransportState,
    pub now_playing: Option<NowPlaying>,
    /// Shown position: the drag preview, the pending seek target, or the
    /// server's offset.
    pub position: i64,
    pub max_position: i64,
    pub position_text: String,
    pub duration_text: String,
    pub khz: String,
    pub volume: u8,
    pub repeat_mode: RepeatMode,
    pub seek_pending: bool,
    pub is_playing: bool,
    pub is_paused: bool,
    pub has_track: bool,
    pub can_play: bool,
    pub can_pause: bool,
    pub can_seek: bool,
    pub queue_empty: bool,
    pub scan: ScanStatus,
    pub scan_active: bool,
    pub last_error: Option<String>,
    pub queue: ListView<QueueEntry>,
    pub recent: ListView<Track>,
    pub artists: CatalogListView<String>,
    pub albums: CatalogListView<String>,
    pub titles: CatalogListView<Track>,
}

pub struct ViewState {
    connection: ConnectionState,
    state: TransportState,
    now_playing: Option<NowPlaying>,
    position: i64,
    max_position: i64,
    drag_position: Option<i64>,
    volume: u8,
    /// Last volume the server reported or accepted.
    confirmed_volume: u8,
    repeat_mode: RepeatMode,
    scan: ScanStatus,
    last_error: Option<String>,
    queue: SelectableList<QueueEntry>,
    recent: SelectableList<Track>,
    catalog: CatalogLists,
    seek: SeekCoordinator,
    volume_throttle: Throttler<u8>,
    seek_throttle: Throttler<i64>,
}

impl ViewState {
    pub fn new(sync: &SyncConfig) -> Self {
        Self::with_timing(sync.throttle(), sync.seek_grace(), sync.page_size)
    }

    pub fn with_timing(throttle: Duration, seek_grace: Duration, page_size: usize) -> Self {
        Self {
            connection: ConnectionState::Connecting,
            state: TransportState::Empty,
            now_playing: None,
            position: 0,
            max_position: 0,
            drag_position: None,
            volume: 0,
            confirmed_volume: 0,
            repeat_mode: RepeatMode::default(),
            scan: ScanStatus::Idle,
            last_error: None,
            queue: SelectableList::default(),
            recent: SelectableList::default(),
            catalog: CatalogLists::new(page_size),
            seek: SeekCoordinator::new(seek_grace),
            volume_throttle: Throttler::new(throttle),
            seek_throttle: Throttler::new(throttle),
        }
    }

    pub fn catalog(&self) -> &CatalogLists {
        &self.catalog
    }

    pub fn queue(&self) -> &SelectableList<QueueEntry> {
        &self.queue
    }

    pub fn recent(&self) -> &SelectableList<Track> {
        &self.recent
    }

    /// Track the push channel. A scan whose end was missed while the channel
    /// was down is treated as finished on reopen: the full status sent to a
    /// new connection carries no scan field, and a scan still running reports
    /// progress again on its own.
    pub fn set_connection(&mut self, state: ConnectionState) -> Vec<Effect> {
        if self.connection == state {
            return Vec::new();
        }
        debug!("connection: {:?} -> {:?}", self.connection, state);
        let reopened = state.is_open() && !self.connection.is_open();
        self.connection = state;

        if reopened && self.scan.is_active() {
            debug!("channel reopened during a scan; refreshing catalog");
            self.scan = ScanStatus::Idle;
            return queries(self.catalog.catalog_changed());
        }
        Vec::new()
    }

    /// Dispatch every field present in `msg`, in a fixed order. Returns the
    /// catalog refresh a finished scan calls for.
    pub fn apply_push(&mut self, msg: &PushMessage, now: Instant) -> Vec<Effect> {
        debug!("push: {:?}", msg.field_names());
        let mut effects = Vec::new();

        if let Some(volume) = msg.volume {
            self.confirmed_volume = volume;
            // A slider still settling wins over the echo of an older value.
            if !self.volume_throttle.is_armed() {
                self.volume = volume;
            }
        }
        if let Some(size) = msg.size {
            if size != self.max_position {
                self.max_position = size;
            }
        }
        if let Some(offset) = msg.offset {
            self.on_offset(offset, now);
        }
        if let Some(meta) = &msg.meta {
            self.now_playing = meta.clone().map(NowPlaying::from);
        }
        if let Some(scan) = &msg.scan {
            effects.extend(self.on_scan(scan.clone()));
        }
        if let Some(state) = msg.state {
            self.state = state;
            if state == TransportState::Empty {
                self.now_playing = None;
            }
        }
        if let Some(queue) = &msg.queue {
            self.queue.replace(queue.clone());
        }
        if let Some(recent) = &msg.recent {
            self.recent.replace(recent.clone());
        }
        if let Some(mode) = msg.repeat_mode {
            self.repeat_mode = mode;
        }
        if let Some(error) = &msg.error {
            if !error.is_empty() {
                warn!("player reported: {}", error);
                self.last_error = Some(error.clone());
            }
        }
        effects
    }

    fn on_offset(&mut self, offset: i64, now: Instant) {
        match self.seek.on_offset(offset, now) {
            OffsetGate::Apply => {
                if offset != self.position {
                    self.position = offset;
                }
            }
            OffsetGate::Suppress => {
                debug!("offset {} suppressed while seek is pending", offset);
            }
        }
    }

    fn on_scan(&mut self, scan: Option<ScanProgress>) -> Vec<Effect> {
        match scan {
            Some(progress) => {
                self.scan = ScanStatus::Scanning { last: progress };
                Vec::new()
            }
            None if self.scan.is_active() => {
                debug!("scan finished; refreshing catalog");
                self.scan = ScanStatus::Idle;
                self.catalog
                    .catalog_changed()
                    .into_iter()
                    .map(Effect::from)
                    .collect()
            }
            None => Vec::new(),
        }
    }

    pub fn apply_intent(&mut self, intent: Intent, now: Instant) -> Vec<Effect> {
        let command = |c: PlayerCommand| vec![Effect::Command(c)];
        match intent {
            Intent::Play => command(PlayerCommand::Play),
            Intent::Pause => command(PlayerCommand::Pause),
            Intent::TogglePlayPause => {
                if self.state == TransportState::Playing {
                    command(PlayerCommand::Pause)
                } else {
                    command(PlayerCommand::Play)
                }
            }
            Intent::Stop => command(PlayerCommand::Stop),
            Intent::Load(path) => command(PlayerCommand::Load { path }),
            Intent::SetVolume(volume) => {
                let volume = volume.min(100);
                self.volume = volume;
                self.volume_throttle.arm(volume, now);
                Vec::new()
            }
            Intent::SeekPreview(position) => {
                self.drag_position = Some(self.clamp_position(position));
                Vec::new()
            }
            Intent::SeekRelease(position) => {
                let target = self.clamp_position(position);
                self.drag_position = None;
                self.seek.begin(target, now);
                self.position = target;
                self.seek_throttle.arm(target, now);
                Vec::new()
            }
            Intent::Enqueue(path) => command(PlayerCommand::Enqueue { path }),
            Intent::EnqueueSelectedTitles => self
                .catalog
                .titles()
                .selected_items()
                .into_iter()
                .map(|t| {
                    Effect::Command(PlayerCommand::Enqueue {
                        path: t.path.clone(),
                    })
                })
                .collect(),
            Intent::MoveSelected(delta) => self.queue_command(|indexes| PlayerCommand::Move {
                indexes,
                delta: delta.signum(),
            }),
            Intent::MoveSelectedToTop => {
                self.queue_command(|indexes| PlayerCommand::MoveToTop { indexes })
            }
            Intent::RemoveSelected => {
                self.queue_command(|indexes| PlayerCommand::Remove { indexes })
            }
            Intent::ClearQueue => command(PlayerCommand::ClearQueue),
            Intent::SetRepeatMode(mode) => command(PlayerCommand::SetRepeatMode(mode)),
            Intent::CycleRepeatMode => {
                command(PlayerCommand::SetRepeatMode(self.repeat_mode.cycle()))
            }
            Intent::StartScan => {
                if !self.scan.is_active() {
                    self.scan = ScanStatus::Requested;
                }
                command(PlayerCommand::StartScan)
            }
            Intent::SetFilter(list, text) => queries(self.catalog.set_filter(list, &text)),
            Intent::ClearFilters => queries(self.catalog.clear_filters()),
            Intent::ChangePage(list, delta) => {
                queries(self.catalog.change_page(list, delta).into_iter().collect())
            }
            Intent::RefreshCatalog => queries(self.catalog.refresh_all()),
            Intent::Select(list, index) => {
                let result = match list.target() {
                    ListTarget::Catalog(kind) => self.catalog.select(kind, index),
                    ListTarget::Local(local) => self.local_list(local, |l| l.select(index)),
                };
                log_selection(list, result);
                Vec::new()
            }
            Intent::Unselect(list, index) => {
                let result = match list.target() {
                    ListTarget::Catalog(kind) => self.catalog.unselect(kind, index),
                    ListTarget::Local(local) => self.local_list(local, |l| l.unselect(index)),
                };
                log_selection(list, result);
                Vec::new()
            }
            Intent::ToggleSelected(list, index) => {
                let result = match list.target() {
                    ListTarget::Catalog(kind) => self.catalog.toggle(kind, index).map(|_| ()),
                    ListTarget::Local(local) => {
                        self.local_list(local, |l| l.toggle(index).map(|_| ()))
                    }
                };
                log_selection(list, result);
                Vec::new()
            }
            Intent::SelectOnly(list, index) => {
                let result = match list.target() {
                    ListTarget::Catalog(kind) => self.catalog.select_only(kind, index),
                    ListTarget::Local(local) => self.local_list(local, |l| l.select_only(index)),
                };
                log_selection(list, result);
                Vec::new()
            }
            Intent::ClearSelection(list) => {
                match list.target() {
                    ListTarget::Catalog(kind) => self.catalog.clear_selection(kind),
                    ListTarget::Local(LocalList::Queue) => self.queue.clear_selection(),
                    ListTarget::Local(LocalList::Recent) => self.recent.clear_selection(),
                }
                Vec::new()
            }
        }
    }

    /// Run `op` on the queue or recent list. Both share the same selection
    /// operations but hold different element types.
    fn local_list(
        &mut self,
        list: LocalList,
        op: impl Fn(&mut dyn LocalSelection) -> Result<(), SelectionError>,
    ) -> Result<(), SelectionError> {
        match list {
            LocalList::Queue => op(&mut self.queue),
            LocalList::Recent => op(&mut self.recent),
        }
    }

    fn queue_command(&self, build: impl FnOnce(Vec<usize>) -> PlayerCommand) -> Vec<Effect> {
        let indexes = self.queue.selected_indexes();
        if indexes.is_empty() {
            debug!("queue command ignored: nothing selected");
            return Vec::new();
        }
        vec![Effect::Command(build(indexes))]
    }

    fn clamp_position(&self, position: i64) -> i64 {
        if self.max_position > 0 {
            position.clamp(0, self.max_position)
        } else {
            position.max(0)
        }
    }

    /// Fire any throttled control whose quiet period has passed.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(volume) = self.volume_throttle.poll(now) {
            effects.push(Effect::Command(PlayerCommand::SetVolume(volume)));
        }
        if let Some(target) = self.seek_throttle.poll(now) {
            effects.push(Effect::Command(PlayerCommand::Seek(target)));
        }
        effects
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.volume_throttle.deadline(), self.seek_throttle.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn on_command_result(
        &mut self,
        command: &PlayerCommand,
        result: Result<CommandReply, ClientError>,
    ) {
        match result {
            Ok(CommandReply::Volume(volume)) => {
                let volume = volume.min(100);
                self.confirmed_volume = volume;
                if !self.volume_throttle.is_armed() {
                    self.volume = volume;
                }
            }
            Ok(CommandReply::Loaded { size }) => self.max_position = size,
            Ok(CommandReply::Done) => {
                if let PlayerCommand::SetVolume(volume) = command {
                    self.confirmed_volume = *volume;
                }
            }
            Err(e) => {
                if e.is_transport() {
                    warn!("command {} not delivered: {}", command, e);
                } else {
                    warn!("command {} rejected: {}", command, e);
                }
                self.last_error = Some(format!("{}: {}", command, e));
                match command {
                    PlayerCommand::Seek(_) => self.seek.seek_failed(),
                    PlayerCommand::SetVolume(_) if !self.volume_throttle.is_armed() => {
                        self.volume = self.confirmed_volume;
                    }
                    PlayerCommand::StartScan if self.scan == ScanStatus::Requested => {
                        self.scan = ScanStatus::Idle;
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn on_catalog_page(
        &mut self,
        list: ListKind,
        seq: u64,
        result: Result<CatalogPage, ClientError>,
    ) -> Vec<Effect> {
        self.catalog
            .on_page(list, seq, result)
            .into_iter()
            .map(Effect::from)
            .collect()
    }

    fn shown_position(&self) -> i64 {
        match (self.drag_position, self.seek.pending()) {
            (Some(drag), _) => drag,
            (None, Some(pending)) => pending.target,
            (None, None) => self.position,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let has_track = self.now_playing.is_some();
        let is_playing = self.state == TransportState::Playing;
        let is_paused = self.state == TransportState::Paused;
        let position = self.shown_position();
        let sec_per_sample = self.now_playing.as_ref().and_then(|n| n.sec_per_sample);
        let catalog = &self.catalog;

        ViewSnapshot {
            connection: self.connection,
            connected: self.connection.is_open(),
            state: self.state,
            now_playing: self.now_playing.clone(),
            position,
            max_position: self.max_position,
            position_text: display::position_to_time(position, sec_per_sample),
            duration_text: self
                .now_playing
                .as_ref()
                .map(|n| n.duration_text.clone())
                .unwrap_or_default(),
            khz: self
                .now_playing
                .as_ref()
                .map(|n| n.khz.clone())
                .unwrap_or_default(),
            volume: self.volume,
            repeat_mode: self.repeat_mode,
            seek_pending: self.seek.is_pending(),
            is_playing,
            is_paused,
            has_track,
            can_play: !is_playing && (has_track || !self.queue.is_empty()),
            can_pause: is_playing,
            can_seek: has_track && self.max_position > 0,
            queue_empty: self.queue.is_empty(),
            scan: self.scan.clone(),
            scan_active: self.scan.is_active(),
            last_error: self.last_error.clone(),
            queue: ListView::from(&self.queue),
            recent: ListView::from(&self.recent),
            artists: catalog_view(catalog, ListKind::Artist, catalog.artists()),
            albums: catalog_view(catalog, ListKind::Album, catalog.albums()),
            titles: catalog_view(catalog, ListKind::Title, catalog.titles()),
        }
    }
}

/// Selection operations shared by the queue and recent lists.
trait LocalSelection {
    fn select(&mut self, index: usize) -> Result<(), SelectionError>;
    fn unselect(&mut self, index: usize) -> Result<(), SelectionError>;
    fn toggle(&mut self, index: usize) -> Result<bool, SelectionError>;
    fn select_only(&mut self, index: usize) -> Result<(), SelectionError>;
}

impl<T: Keyed> LocalSelection for SelectableList<T> {
    fn select(&mut self, index: usize) -> Result<(), SelectionError> {
        SelectableList::select(self, index)
    }

    fn unselect(&mut self, index: usize) -> Result<(), SelectionError> {
        SelectableList::unselect(self, index)
    }

    fn toggle(&mut self, index: usize) -> Result<bool, SelectionError> {
        SelectableList::toggle(self, index)
    }

    fn select_only(&mut self, index: usize) -> Result<(), SelectionError> {
        SelectableList::select_only(self, index)
    }
}

fn queries(pending: Vec<PendingQuery>) -> Vec<Effect> {
    pending.into_iter().map(Effect::from).collect()
}

fn log_selection(list: ListId, result: Result<(), SelectionError>) {
    if let Err(e) = result {
        warn!("selection on {:?} ignored: {}", list, e);
    }
}

fn catalog_view<T: Keyed + Clone>(
    catalog: &CatalogLists,
    kind: ListKind,
    list: &SelectableList<T>,
) -> CatalogListView<T> {
    let paging = catalog.paging(kind);
    CatalogListView {
        list: ListView::from(list),
        filter: catalog.filters().get(kind).to_string(),
        page: paging.page(),
        is_last: paging.is_last(),
    }
}
