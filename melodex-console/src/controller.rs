//! List view controller
//!
//! One controller drives one screen through the closed loop
//! fetch → filter → paginate → render → act. All view state lives in the
//! controller; nothing is global, so any number of screens can run side by
//! side.
//!
//! Every operation catches its own failures: the error becomes a notice on
//! the event bus and the controller stays usable. Overlapping loads are
//! ordered by a generation counter; a response is applied only if no newer
//! load has started since it was issued.

use melodex_common::{
    Error, ErrorKind, EventBus, NoticeLevel, Payload, Phase, Record, ViewEvent,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::actions::{ActionBinder, ActionKind, Confirm};
use crate::filter::{self, Criteria};
use crate::form::EditForm;
use crate::pagination::{page_links, paginate, PageLink, PageState};
use crate::render::{build_rows, ListView, RenderDiff, RowKey, RowView};
use crate::screens::{Paging, ScreenSpec};
use crate::source::{ListQuery, RecordSource, Review};

/// Result of one load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Response applied and rendered
    Applied { rows: usize },
    /// A newer load started first; this response was dropped
    Stale,
    /// Load failed; the list was cleared and a notice published
    Failed(ErrorKind),
}

/// Result of triggering a row action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Edit(Option<EditForm>),
    Done(bool),
    Play(Option<String>),
}

/// Read-only copy of the controller state
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub screen: &'static str,
    pub phase: Phase,
    pub page: PageState,
    pub total_pages: u64,
    pub links: Vec<PageLink>,
    pub rows: Vec<RowView>,
    pub selection: Vec<i64>,
    pub criteria: Vec<(String, String)>,
}

impl Snapshot {
    pub fn row_ids(&self) -> Vec<i64> {
        self.rows.iter().filter_map(|r| r.key.id()).collect()
    }
}

struct ViewState {
    phase: Phase,
    /// Everything fetched (client paging) or the current page (server paging)
    records: Vec<Record>,
    /// `records` after client-side filtering
    filtered: Vec<Record>,
    criteria: Criteria,
    page: PageState,
    selection: BTreeSet<i64>,
    view: ListView,
    binder: ActionBinder,
    links: Vec<PageLink>,
}

pub struct ListController<S: RecordSource> {
    screen: &'static ScreenSpec,
    source: Arc<S>,
    events: EventBus,
    confirm: Arc<dyn Confirm>,
    generation: AtomicU64,
    state: Mutex<ViewState>,
}

impl<S: RecordSource> ListController<S> {
    pub fn new(
        screen: &'static ScreenSpec,
        source: Arc<S>,
        events: EventBus,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self {
            screen,
            source,
            events,
            confirm,
            generation: AtomicU64::new(0),
            state: Mutex::new(ViewState {
                phase: Phase::Idle,
                records: Vec::new(),
                filtered: Vec::new(),
                criteria: Criteria::new(),
                page: PageState::new(screen.page_size),
                selection: BTreeSet::new(),
                view: ListView::new(),
                binder: ActionBinder::new(),
                links: Vec::new(),
            }),
        }
    }

    pub fn screen(&self) -> &'static ScreenSpec {
        self.screen
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn snapshot(&self) -> Snapshot {
        let st = self.state.lock().await;
        Snapshot {
            screen: self.screen.name,
            phase: st.phase,
            page: st.page,
            total_pages: st.page.total_pages(),
            links: st.links.clone(),
            rows: st.view.rows().to_vec(),
            selection: st.selection.iter().copied().collect(),
            criteria: st.criteria.query_params(),
        }
    }

    /// Text table of the current rows plus the page controls
    pub async fn render_text(&self) -> String {
        let st = self.state.lock().await;
        let mut out = st.view.to_table(self.screen.columns);
        if st.view.is_empty() {
            out.push_str("(no records)\n");
        }
        if !st.links.is_empty() {
            let links: Vec<String> = st.links.iter().map(PageLink::label).collect();
            out.push_str(&format!(
                "{}  ({} total)\n",
                links.join(" "),
                st.page.total_items
            ));
        }
        out
    }

    pub async fn actions_for(&self, id: i64) -> Vec<ActionKind> {
        self.state.lock().await.binder.actions_for(id).to_vec()
    }

    /// Total bind operations so far
    pub async fn bind_ops(&self) -> u64 {
        self.state.lock().await.binder.bind_ops()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Full reload: fetch, clear the selection, re-render
    pub async fn refresh(&self) -> LoadOutcome {
        self.load(true).await
    }

    async fn load(&self, clear_selection: bool) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = {
            let mut st = self.state.lock().await;
            self.set_phase(&mut st, Phase::Loading);
            ListQuery {
                criteria: self.screen.server_filter.then(|| st.criteria.clone()),
                page: (self.screen.paging == Paging::Server)
                    .then(|| (st.page.page_number, st.page.page_size)),
            }
        };

        debug!(screen = self.screen.name, generation, page = ?query.page, "Loading records");
        let result = self.source.list(&query).await;

        let mut st = self.state.lock().await;
        let latest = self.generation.load(Ordering::SeqCst);
        if generation != latest {
            debug!(
                screen = self.screen.name,
                generation, latest, "Dropping stale response"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(payload) => {
                if clear_selection {
                    st.selection.clear();
                }
                self.apply_payload(&mut st, payload);
                self.set_phase(&mut st, Phase::Loaded);
                self.render(&mut st);
                self.set_phase(&mut st, Phase::Idle);
                LoadOutcome::Applied {
                    rows: st.view.len(),
                }
            }
            Err(e) => {
                st.records.clear();
                st.filtered.clear();
                st.page.set_total(0);
                self.render(&mut st);
                self.set_phase(&mut st, Phase::Errored);
                self.set_phase(&mut st, Phase::Idle);
                drop(st);
                self.report(&e);
                LoadOutcome::Failed(e.kind())
            }
        }
    }

    fn apply_payload(&self, st: &mut ViewState, payload: Payload) {
        st.records = payload.items;
        st.filtered = if self.screen.server_filter {
            st.records.clone()
        } else {
            filter::apply(&st.records, &st.criteria, self.screen.filters)
        };

        match (self.screen.paging, payload.page) {
            (Paging::Server, Some(meta)) => {
                let size = st.page.page_size;
                let total = meta.total.unwrap_or_else(|| {
                    meta.pages
                        .saturating_sub(1)
                        .saturating_mul(size)
                        .saturating_add(st.filtered.len() as u64)
                });
                st.page.page_number = meta.page_num;
                st.page.set_total(total);
            }
            (Paging::Server, None) => {
                // Backend ignored paging and sent a bare list: one page of it
                st.page.page_number = 1;
                st.page.set_total(st.filtered.len() as u64);
            }
            (Paging::Client, _) => {
                st.page.set_total(st.filtered.len() as u64);
            }
        }
    }

    /// Slice the current page and reconcile rows; rebinding only touches
    /// rows that appeared or disappeared
    fn render(&self, st: &mut ViewState) -> RenderDiff {
        let visible: &[Record] = match self.screen.paging {
            Paging::Server => {
                let end = (st.page.page_size as usize).min(st.filtered.len());
                &st.filtered[..end]
            }
            Paging::Client => {
                paginate(&st.filtered, st.page.page_number, st.page.page_size).visible
            }
        };

        let rows = build_rows(visible, self.screen.columns, &st.selection, st.page.offset());
        let diff = st.view.reconcile(rows);
        st.binder.sync(&diff, self.screen.row_actions);
        st.links = page_links(st.page.page_number, st.page.total_pages());

        self.events.emit_lossy(ViewEvent::Rendered {
            screen: self.screen.name.to_string(),
            rows: st.view.len(),
            page: st.page.page_number,
            total_pages: st.page.total_pages(),
            timestamp: chrono::Utc::now(),
        });
        diff
    }

    fn set_phase(&self, st: &mut ViewState, phase: Phase) {
        st.phase = phase;
        self.events.emit_lossy(ViewEvent::PhaseChanged {
            screen: self.screen.name.to_string(),
            phase,
            timestamp: chrono::Utc::now(),
        });
    }

    // ------------------------------------------------------------------
    // Filtering and navigation
    // ------------------------------------------------------------------

    /// Change one criterion; resets to page 1
    ///
    /// Returns `false` when the effective criteria did not change.
    pub async fn set_criterion(&self, key: &str, value: &str) -> bool {
        let mut st = self.state.lock().await;
        if !st.criteria.set(key, value) {
            return false;
        }
        self.criteria_changed(st).await;
        true
    }

    /// Replace all criteria; resets to page 1
    pub async fn set_criteria(&self, criteria: Criteria) -> bool {
        let mut st = self.state.lock().await;
        if st.criteria == criteria {
            return false;
        }
        st.criteria = criteria;
        self.criteria_changed(st).await;
        true
    }

    /// Set the initial criteria without fetching; the next load uses them
    pub async fn seed_criteria(&self, criteria: Criteria) {
        let mut st = self.state.lock().await;
        st.criteria = criteria;
        st.page.reset();
    }

    async fn criteria_changed(&self, mut st: tokio::sync::MutexGuard<'_, ViewState>) {
        st.page.reset();
        if self.screen.server_filter {
            drop(st);
            self.load(true).await;
        } else {
            st.filtered = filter::apply(&st.records, &st.criteria, self.screen.filters);
            let total = st.filtered.len() as u64;
            st.page.set_total(total);
            self.render(&mut st);
        }
    }

    /// Go to `page`; out-of-range pages are ignored
    pub async fn goto_page(&self, page: u64) -> bool {
        let mut st = self.state.lock().await;
        if !st.page.goto(page) {
            debug!(screen = self.screen.name, page, "Ignoring page request");
            return false;
        }
        match self.screen.paging {
            Paging::Server => {
                drop(st);
                self.load(false).await;
            }
            Paging::Client => {
                self.render(&mut st);
            }
        }
        true
    }

    pub async fn next_page(&self) -> bool {
        let next = self.state.lock().await.page.page_number + 1;
        self.goto_page(next).await
    }

    pub async fn prev_page(&self) -> bool {
        let prev = self.state.lock().await.page.page_number.saturating_sub(1);
        self.goto_page(prev).await
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Toggle a visible row's checkbox; returns whether it is now selected
    pub async fn toggle_select(&self, id: i64) -> bool {
        let mut st = self.state.lock().await;
        if st.view.row(RowKey::Id(id)).is_none() {
            return false;
        }
        let selected = if st.selection.remove(&id) {
            false
        } else {
            st.selection.insert(id);
            true
        };
        self.render(&mut st);
        selected
    }

    /// Select a visible row; selecting it again keeps it selected
    pub async fn select(&self, id: i64) -> bool {
        let mut st = self.state.lock().await;
        if st.view.row(RowKey::Id(id)).is_none() {
            return false;
        }
        if st.selection.insert(id) {
            self.render(&mut st);
        }
        true
    }

    pub async fn select_all_visible(&self) {
        let mut st = self.state.lock().await;
        let ids: Vec<i64> = st.view.keys().filter_map(|k| k.id()).collect();
        st.selection.extend(ids);
        self.render(&mut st);
    }

    pub async fn clear_selection(&self) {
        let mut st = self.state.lock().await;
        st.selection.clear();
        self.render(&mut st);
    }

    // ------------------------------------------------------------------
    // Row actions
    // ------------------------------------------------------------------

    async fn is_bound(&self, id: i64, kind: ActionKind) -> bool {
        let bound = self.state.lock().await.binder.is_bound(id, kind);
        if !bound {
            debug!(screen = self.screen.name, id, action = kind.label(), "No such row action");
        }
        bound
    }

    /// Dispatch an action bound to a row
    pub async fn trigger(&self, id: i64, kind: ActionKind) -> ActionResult {
        match kind {
            ActionKind::Edit => ActionResult::Edit(self.edit(id).await),
            ActionKind::Delete => ActionResult::Done(self.delete(id).await),
            ActionKind::Approve => ActionResult::Done(self.review(id, Review::Approve).await),
            ActionKind::Reject => ActionResult::Done(self.review(id, Review::Reject).await),
            ActionKind::Play => ActionResult::Play(self.play(id).await),
        }
    }

    /// Edit form for a row, from row data or a fresh fetch
    pub async fn edit(&self, id: i64) -> Option<EditForm> {
        if !self.is_bound(id, ActionKind::Edit).await {
            return None;
        }
        let record = if self.screen.fresh_edit {
            match self.source.get(id).await {
                Ok(record) => record,
                Err(e) => {
                    self.report(&e);
                    return None;
                }
            }
        } else {
            self.find_record(id).await?
        };
        Some(EditForm::from_record(&record, self.screen.form))
    }

    /// Empty form for creating a record
    pub fn new_form(&self) -> EditForm {
        EditForm::blank(self.screen.form)
    }

    /// Validate and submit a form, then reload
    pub async fn save(&self, form: &EditForm) -> bool {
        if let Err(e) = form.validate(self.screen.form) {
            self.report(&e);
            return false;
        }
        match self.source.save(form).await {
            Ok(()) => {
                info!(screen = self.screen.name, id = ?form.id, "Saved record");
                self.notify(NoticeLevel::Success, "Saved");
                self.load(true).await;
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    /// Confirm, delete one record, reload
    ///
    /// Deleting the only row on a page past the first steps back one page.
    pub async fn delete(&self, id: i64) -> bool {
        if !self.is_bound(id, ActionKind::Delete).await {
            return false;
        }
        let prompt = format!("Delete {} #{}?", self.screen.title.to_lowercase(), id);
        if !self.confirm.confirm(&prompt) {
            return false;
        }

        match self.source.delete(id).await {
            Ok(()) => {
                {
                    let mut st = self.state.lock().await;
                    if st.view.len() == 1 && st.page.page_number > 1 {
                        st.page.page_number -= 1;
                    }
                    st.selection.remove(&id);
                }
                info!(screen = self.screen.name, id, "Deleted record");
                self.notify(NoticeLevel::Success, "Deleted");
                self.load(false).await;
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    /// Confirm, delete every selected record in one call, reload from page 1
    pub async fn batch_delete(&self) -> bool {
        let ids: Vec<i64> = self.state.lock().await.selection.iter().copied().collect();
        if ids.is_empty() {
            self.report(&Error::Validation(
                "Select at least one record to delete".to_string(),
            ));
            return false;
        }
        let prompt = format!(
            "Delete {} selected {}?",
            ids.len(),
            self.screen.title.to_lowercase()
        );
        if !self.confirm.confirm(&prompt) {
            return false;
        }

        match self.source.delete_many(&ids).await {
            Ok(()) => {
                {
                    let mut st = self.state.lock().await;
                    st.selection.clear();
                    st.page.reset();
                }
                info!(screen = self.screen.name, count = ids.len(), "Batch deleted records");
                self.notify(NoticeLevel::Success, format!("Deleted {} records", ids.len()));
                self.load(true).await;
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    pub async fn approve(&self, id: i64) -> bool {
        self.review(id, Review::Approve).await
    }

    pub async fn reject(&self, id: i64) -> bool {
        self.review(id, Review::Reject).await
    }

    async fn review(&self, id: i64, review: Review) -> bool {
        let kind = match review {
            Review::Approve => ActionKind::Approve,
            Review::Reject => ActionKind::Reject,
        };
        if !self.is_bound(id, kind).await {
            return false;
        }
        match self.source.review(id, review).await {
            Ok(()) => {
                info!(screen = self.screen.name, id, ?review, "Reviewed record");
                let text = match review {
                    Review::Approve => "Approved",
                    Review::Reject => "Rejected",
                };
                self.notify(NoticeLevel::Success, text);
                self.load(false).await;
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    /// Resolve a row's audio URL and announce it
    pub async fn play(&self, id: i64) -> Option<String> {
        if !self.is_bound(id, ActionKind::Play).await {
            return None;
        }
        let field = self.screen.media_field?;
        let path = self
            .find_record(id)
            .await
            .and_then(|r| r.get_str(field))
            .filter(|p| !p.trim().is_empty());

        match path {
            Some(path) => {
                let url = self.source.media_url(&path);
                self.events.emit_lossy(ViewEvent::PlayRequested {
                    screen: self.screen.name.to_string(),
                    record_id: id,
                    url: url.clone(),
                    timestamp: chrono::Utc::now(),
                });
                Some(url)
            }
            None => {
                self.notify(NoticeLevel::Warning, "No audio file for this record");
                None
            }
        }
    }

    /// Upload a file with progress events, then reload
    pub async fn upload(&self, file: &Path) -> bool {
        let events = self.events.clone();
        let screen = self.screen.name.to_string();
        let progress = Arc::new(move |sent: u64, total: u64| {
            events.emit_lossy(ViewEvent::UploadProgress {
                screen: screen.clone(),
                sent,
                total,
                timestamp: chrono::Utc::now(),
            });
        });

        match self.source.upload(file, progress).await {
            Ok(()) => {
                info!(screen = self.screen.name, file = %file.display(), "Uploaded file");
                self.notify(NoticeLevel::Success, "Upload complete");
                self.load(true).await;
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    async fn find_record(&self, id: i64) -> Option<Record> {
        self.state
            .lock()
            .await
            .filtered
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned()
    }

    // ------------------------------------------------------------------
    // Notices
    // ------------------------------------------------------------------

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.events
            .emit_lossy(ViewEvent::notice(self.screen.name, level, message));
    }

    /// Turn an error into a notice; auth failures also ask for a new login
    fn report(&self, error: &Error) {
        warn!(
            screen = self.screen.name,
            kind = ?error.kind(),
            error = %error,
            "Operation failed"
        );
        let level = match error.kind() {
            ErrorKind::Validation => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        self.notify(level, error.user_message());
        if error.is_auth() {
            self.events.emit_lossy(ViewEvent::AuthRequired {
                screen: self.screen.name.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }
    }
}
