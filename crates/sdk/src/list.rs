//! Generic resource list engine.
//!
//! One engine, many presentations: the article table, the user table, and
//! the stats widgets all bind to a [`ListController`] parameterized by
//! entity kind instead of re-implementing fetch/filter/paginate. The
//! controller owns the materialized collection; filtered and paged views
//! are pure functions of it and are never stored, so they cannot desync.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ refresh() ┌─────────┐  success   ┌───────┐
//! │ Idle │ ────────▶ │ Loading │ ─────────▶ │ Ready │ ◀─┐
//! └──────┘           └─────────┘            └───────┘   │ mutation
//!                         │ transport failure   │       │ settles
//!                         ▼                     ▼       │ (rollback
//!                    ┌───────┐             row mutating │  on failure)
//!                    │ Error │                  └───────┘
//!                    └───────┘  (previous rows retained)
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use masthead_types::Resource;
use parking_lot::Mutex;

use crate::error::{BusySnafu, MissingRecordSnafu, Result};

/// Fetch and mutation access to one entity collection.
///
/// The engine consumes only this: a data-fetch function and an
/// action-dispatch function. Concrete sources wrap the typed API.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// The entity kind this source serves.
    type Item: Resource;

    /// Fetches the full collection.
    async fn fetch_all(&self) -> Result<Vec<Self::Item>>;

    /// Applies a status action to one record; returns the authoritative
    /// updated record.
    async fn apply_action(
        &self,
        id: &str,
        action: <Self::Item as Resource>::Action,
    ) -> Result<Self::Item>;
}

/// A source whose records can be deleted.
#[async_trait]
pub trait RemovableSource: CollectionSource {
    /// Deletes one record.
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Lifecycle phase of a list instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPhase {
    /// No fetch has happened yet.
    #[default]
    Idle,
    /// A full-collection fetch is in flight.
    Loading,
    /// The collection is materialized.
    Ready,
    /// The last fetch failed; any previously fetched rows are retained.
    Error,
}

/// Snapshot export: the currently filtered rows in stable insertion order
/// with a fixed column layout. The CSV/clipboard rendering is the
/// presentation layer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Fixed column order.
    pub columns: &'static [&'static str],
    /// One row per filtered record, aligned with `columns`.
    pub rows: Vec<Vec<String>>,
}

/// The view model a presentation binds to. Derived on demand; never stored.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    /// Rows of the current page.
    pub rows: Vec<T>,
    /// Current page, clamped into the valid range.
    pub page: usize,
    /// Total pages for the current filter (at least 1).
    pub page_count: usize,
    /// Items per page.
    pub page_size: usize,
    /// Current search string.
    pub query: String,
    /// Records matching the current filter.
    pub matched: usize,
    /// Records in the full collection.
    pub total: usize,
    /// Lifecycle phase.
    pub phase: ListPhase,
    /// Message from the last failed full-collection fetch.
    pub error: Option<String>,
    /// Ids with a mutation in flight.
    pub mutating: HashSet<String>,
    /// Per-row errors from failed mutations.
    pub row_errors: HashMap<String, String>,
}

impl<T> ListView<T> {
    /// Whether the given record has a mutation in flight.
    #[must_use]
    pub fn is_mutating(&self, id: &str) -> bool {
        self.mutating.contains(id)
    }

    /// The recoverable error for one row, if its last mutation failed.
    #[must_use]
    pub fn row_error(&self, id: &str) -> Option<&str> {
        self.row_errors.get(id).map(String::as_str)
    }
}

// ============================================================================
// Pure Derivations
// ============================================================================

/// Case-insensitive multi-field substring filter.
///
/// An entity matches if any of its searchable fields contains the trimmed,
/// lower-cased query as a substring; an empty or whitespace-only query
/// matches everything. Linear scan over rows and fields, fine at
/// admin-dashboard scale (hundreds to low thousands of rows), a scaling
/// limit beyond that.
pub fn filter<'a, T: Resource>(all: &'a [T], query: &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return all.iter().collect();
    }
    all.iter()
        .filter(|item| {
            item.searchable_fields().iter().any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Total pages for a filtered length; at least 1 so page clamping is always
/// well-defined.
#[must_use]
pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

/// Clamps a 1-indexed page into `[1, page_count]`.
#[must_use]
pub fn clamp_page(page: usize, len: usize, page_size: usize) -> usize {
    page.clamp(1, page_count(len, page_size))
}

/// Slices one page out of the filtered view, clamping the page first.
pub fn paginate<T>(filtered: &[T], page: usize, page_size: usize) -> &[T] {
    let page_size = page_size.max(1);
    let page = clamp_page(page, filtered.len(), page_size);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(filtered.len());
    &filtered[start..end]
}

// ============================================================================
// Controller
// ============================================================================

#[derive(Debug)]
struct ListState<T> {
    all: Vec<T>,
    query: String,
    page: usize,
    page_size: usize,
    phase: ListPhase,
    error: Option<String>,
    mutating: HashSet<String>,
    row_errors: HashMap<String, String>,
}

/// Generic engine over one entity collection: fetch-and-cache, search,
/// pagination, and single-record optimistic mutation with rollback.
#[derive(Debug)]
pub struct ListController<S: CollectionSource> {
    source: S,
    state: Mutex<ListState<S::Item>>,
}

impl<S: CollectionSource> ListController<S> {
    /// Creates an idle controller with the given page size.
    #[must_use]
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            source,
            state: Mutex::new(ListState {
                all: Vec::new(),
                query: String::new(),
                page: 1,
                page_size: page_size.max(1),
                phase: ListPhase::Idle,
                error: None,
                mutating: HashSet::new(),
                row_errors: HashMap::new(),
            }),
        }
    }

    /// Re-fetches the full collection through the gateway.
    ///
    /// On success the collection is replaced wholesale, except rows with a
    /// mutation in flight, which keep their in-memory value so a refresh
    /// never clobbers an optimistic write. The page resets to 1 only when
    /// the previous collection was empty, so background refreshes don't
    /// yank the user away mid-browse.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: returned without entering the `Error` phase;
    ///   session teardown owns that UX
    /// - `Transport`: the phase becomes `Error` with the message retained
    ///   and the previous rows intact (stale-but-available over blank)
    pub async fn refresh(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.phase = ListPhase::Loading;
        }
        match self.source.fetch_all().await {
            Ok(mut fetched) => {
                let mut state = self.state.lock();
                let was_empty = state.all.is_empty();
                for record in &mut fetched {
                    if state.mutating.contains(record.id())
                        && let Some(current) = state.all.iter().find(|r| r.id() == record.id())
                    {
                        *record = current.clone();
                    }
                }
                state.all = fetched;
                if was_empty {
                    state.page = 1;
                }
                state.phase = ListPhase::Ready;
                state.error = None;
                Ok(())
            }
            Err(err) if err.is_unauthorized() => {
                let mut state = self.state.lock();
                state.phase = if state.all.is_empty() { ListPhase::Idle } else { ListPhase::Ready };
                Err(err)
            }
            Err(err) => {
                let mut state = self.state.lock();
                state.phase = ListPhase::Error;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Updates the search string. Resets to page 1: page validity depends on
    /// the filtered length, which changes with the query.
    pub fn set_query(&self, query: impl Into<String>) {
        let mut state = self.state.lock();
        state.query = query.into();
        state.page = 1;
    }

    /// Moves to the given 1-indexed page. Out-of-range values are clamped
    /// when the view is derived.
    pub fn set_page(&self, page: usize) {
        self.state.lock().page = page.max(1);
    }

    /// Changes the page size and resets to page 1.
    pub fn set_page_size(&self, page_size: usize) {
        let mut state = self.state.lock();
        state.page_size = page_size.max(1);
        state.page = 1;
    }

    /// Applies a status action to one record through the optimistic-update
    /// protocol: the in-memory record is updated immediately and marked
    /// mutating, then the mutation is issued. On success the server's
    /// returned representation replaces the optimistic write (the server is
    /// authoritative); on failure the record reverts to its pre-mutation
    /// value and a per-row error is recorded; other rows stay interactive.
    ///
    /// # Errors
    ///
    /// - `Busy`: a mutation for this id is already in flight; rejected
    ///   immediately, never queued
    /// - `MissingRecord`: the id is not in the fetched collection
    /// - `Unauthorized` / `Transport`: the mutation failed; the record has
    ///   been rolled back
    pub async fn set_action(
        &self,
        id: &str,
        action: <S::Item as Resource>::Action,
    ) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            if state.mutating.contains(id) {
                return BusySnafu { id }.fail();
            }
            let Some(record) = state.all.iter_mut().find(|r| r.id() == id) else {
                return MissingRecordSnafu { id }.fail();
            };
            let previous = record.clone();
            record.apply_action(action);
            state.row_errors.remove(id);
            state.mutating.insert(id.to_owned());
            previous
        };

        let outcome = self.source.apply_action(id, action).await;

        let mut state = self.state.lock();
        state.mutating.remove(id);
        match outcome {
            Ok(authoritative) => {
                if let Some(record) = state.all.iter_mut().find(|r| r.id() == id) {
                    *record = authoritative;
                }
                Ok(())
            }
            Err(err) => {
                if let Some(record) = state.all.iter_mut().find(|r| r.id() == id) {
                    *record = previous;
                }
                if !err.is_unauthorized() {
                    state.row_errors.insert(id.to_owned(), err.to_string());
                }
                Err(err)
            }
        }
    }

    /// Deletes one record. Destructive, so confirm-then-apply: the record
    /// leaves the collection only on confirmed backend success, never
    /// optimistically.
    ///
    /// # Errors
    ///
    /// `Busy` when the record has a mutation in flight; `MissingRecord` when
    /// the id is unknown; otherwise the backend failure, with the row left
    /// in place.
    pub async fn remove(&self, id: &str) -> Result<()>
    where
        S: RemovableSource,
    {
        {
            let mut state = self.state.lock();
            if state.mutating.contains(id) {
                return BusySnafu { id }.fail();
            }
            if !state.all.iter().any(|r| r.id() == id) {
                return MissingRecordSnafu { id }.fail();
            }
            state.mutating.insert(id.to_owned());
        }

        let outcome = self.source.remove(id).await;

        let mut state = self.state.lock();
        state.mutating.remove(id);
        match outcome {
            Ok(()) => {
                state.all.retain(|r| r.id() != id);
                state.row_errors.remove(id);
                Ok(())
            }
            Err(err) => {
                if !err.is_unauthorized() {
                    state.row_errors.insert(id.to_owned(), err.to_string());
                }
                Err(err)
            }
        }
    }

    /// Derives the current view model: filtered, clamped, paged.
    #[must_use]
    pub fn view(&self) -> ListView<S::Item> {
        let state = self.state.lock();
        let filtered = filter(&state.all, &state.query);
        let page = clamp_page(state.page, filtered.len(), state.page_size);
        let rows =
            paginate(&filtered, page, state.page_size).iter().map(|r| (*r).clone()).collect();
        ListView {
            rows,
            page,
            page_count: page_count(filtered.len(), state.page_size),
            page_size: state.page_size,
            query: state.query.clone(),
            matched: filtered.len(),
            total: state.all.len(),
            phase: state.phase,
            error: state.error.clone(),
            mutating: state.mutating.clone(),
            row_errors: state.row_errors.clone(),
        }
    }

    /// Exports the currently filtered (not paged) rows in stable insertion
    /// order with the entity's fixed column layout. Pure; no network.
    #[must_use]
    pub fn export_snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        let filtered = filter(&state.all, &state.query);
        Snapshot {
            columns: <S::Item as Resource>::export_columns(),
            rows: filtered.iter().map(|r| r.export_row()).collect(),
        }
    }

    /// The materialized collection, for pure derivations (stats) over the
    /// same data the views show.
    #[must_use]
    pub fn collection(&self) -> Vec<S::Item> {
        self.state.lock().all.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use chrono::{TimeZone, Utc};
    use masthead_types::{ActionTag, Article, ArticleId};
    use proptest::prelude::*;
    use tokio::sync::oneshot;

    use super::*;
    use crate::error::SdkError;

    fn article(id: &str, title: &str, tag: ActionTag) -> Article {
        Article {
            id: ArticleId::new(id),
            title: title.to_owned(),
            meta: String::new(),
            author_name: Some("Ada Obi".to_owned()),
            category: "News".to_owned(),
            action_tag: tag,
            published_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            updated_at: None,
            views: 0,
        }
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n).map(|i| article(&format!("a{i}"), &format!("Article {i}"), ActionTag::Active)).collect()
    }

    /// Source driven by scripted outcomes, with optional gates that hold an
    /// action open until the test releases it.
    #[derive(Debug, Default)]
    struct ScriptedSource {
        fetches: Mutex<VecDeque<Result<Vec<Article>>>>,
        actions: Mutex<VecDeque<Result<Article>>>,
        removals: Mutex<VecDeque<Result<()>>>,
        gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    }

    impl ScriptedSource {
        fn push_fetch(&self, outcome: Result<Vec<Article>>) {
            self.fetches.lock().push_back(outcome);
        }

        fn push_action(&self, outcome: Result<Article>) {
            self.actions.lock().push_back(outcome);
        }

        fn push_removal(&self, outcome: Result<()>) {
            self.removals.lock().push_back(outcome);
        }

        fn gate_next_action(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl CollectionSource for ScriptedSource {
        type Item = Article;

        async fn fetch_all(&self) -> Result<Vec<Article>> {
            self.fetches.lock().pop_front().expect("unscripted fetch")
        }

        async fn apply_action(&self, _id: &str, _action: ActionTag) -> Result<Article> {
            let gate = self.gates.lock().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.actions.lock().pop_front().expect("unscripted action")
        }
    }

    #[async_trait]
    impl RemovableSource for ScriptedSource {
        async fn remove(&self, _id: &str) -> Result<()> {
            self.removals.lock().pop_front().expect("unscripted removal")
        }
    }

    fn controller(source: ScriptedSource) -> ListController<ScriptedSource> {
        ListController::new(source, 5)
    }

    async fn ready_controller(rows: Vec<Article>) -> ListController<ScriptedSource> {
        let source = ScriptedSource::default();
        source.push_fetch(Ok(rows));
        let controller = controller(source);
        controller.refresh().await.unwrap();
        controller
    }

    fn transport(message: &str) -> SdkError {
        SdkError::Transport { status: Some(500), message: message.to_owned() }
    }

    // ------------------------------------------------------------------
    // Pure derivations
    // ------------------------------------------------------------------

    #[test]
    fn test_empty_query_matches_everything() {
        let all = articles(7);
        assert_eq!(filter(&all, "").len(), 7);
        assert_eq!(filter(&all, "   ").len(), 7);
    }

    #[test]
    fn test_search_is_case_insensitive_and_order_preserving() {
        let all = vec![
            article("a1", "Design in Lagos", ActionTag::Active),
            article("a2", "Finance Weekly", ActionTag::Active),
            article("a3", "Lagos Traffic Report", ActionTag::Active),
        ];
        let hits = filter(&all, "lagos");
        let ids: Vec<&str> = hits.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a1", "a3"]);
    }

    #[test]
    fn test_search_covers_all_fields() {
        let mut a = article("a1", "Untitled", ActionTag::Active);
        a.category = "Culture".to_owned();
        let all = vec![a];
        assert_eq!(filter(&all, "culture").len(), 1);
        assert_eq!(filter(&all, "ada").len(), 1);
        assert_eq!(filter(&all, "nomatch").len(), 0);
    }

    #[test]
    fn test_pagination_slices() {
        let all = articles(12);
        assert_eq!(paginate(&all, 1, 5).len(), 5);
        assert_eq!(paginate(&all, 2, 5).len(), 5);
        assert_eq!(paginate(&all, 3, 5).len(), 2);
        assert_eq!(page_count(12, 5), 3);
    }

    #[test]
    fn test_pagination_clamps_out_of_range_pages() {
        let all = articles(12);
        // Beyond the last page clamps down; zero clamps up.
        assert_eq!(paginate(&all, 99, 5).len(), 2);
        assert_eq!(paginate(&all, 0, 5).len(), 5);
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let all: Vec<Article> = Vec::new();
        assert_eq!(page_count(0, 5), 1);
        assert!(paginate(&all, 1, 5).is_empty());
    }

    proptest! {
        #[test]
        fn prop_filter_is_a_subset_with_matching_fields(
            titles in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..40),
            query in "[a-zA-Z]{0,4}",
        ) {
            let all: Vec<Article> = titles
                .iter()
                .enumerate()
                .map(|(i, t)| article(&format!("a{i}"), t, ActionTag::Active))
                .collect();
            let hits = filter(&all, &query);
            prop_assert!(hits.len() <= all.len());
            if query.trim().is_empty() {
                prop_assert_eq!(hits.len(), all.len());
            } else {
                let needle = query.trim().to_lowercase();
                for hit in hits {
                    prop_assert!(
                        hit.searchable_fields().iter().any(|f| f.to_lowercase().contains(&needle))
                    );
                }
            }
        }

        #[test]
        fn prop_pages_concatenate_to_filtered(
            len in 0usize..60,
            page_size in 1usize..10,
        ) {
            let all = articles(len);
            let mut reassembled = Vec::new();
            for page in 1..=page_count(all.len(), page_size) {
                let slice = paginate(&all, page, page_size);
                prop_assert!(slice.len() <= page_size);
                reassembled.extend(slice.iter().cloned());
            }
            prop_assert_eq!(reassembled, all);
        }
    }

    // ------------------------------------------------------------------
    // Controller lifecycle
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_refresh_materializes_collection() {
        let controller = ready_controller(articles(3)).await;
        let view = controller.view();
        assert_eq!(view.phase, ListPhase::Ready);
        assert_eq!(view.total, 3);
        assert_eq!(view.page, 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_stale_rows() {
        let controller = ready_controller(articles(3)).await;
        controller.source.push_fetch(Err(transport("backend down")));
        let err = controller.refresh().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        let view = controller.view();
        assert_eq!(view.phase, ListPhase::Error);
        assert_eq!(view.error.as_deref(), Some("transport error: backend down"));
        assert_eq!(view.total, 3, "previous rows must survive a failed refresh");
    }

    #[tokio::test]
    async fn test_refresh_unauthorized_stays_silent() {
        let controller = ready_controller(articles(3)).await;
        controller.source.push_fetch(Err(SdkError::Unauthorized));
        let err = controller.refresh().await.unwrap_err();
        assert!(err.is_unauthorized());
        let view = controller.view();
        assert_eq!(view.phase, ListPhase::Ready, "teardown owns the UX, not the list");
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn test_background_refresh_keeps_page() {
        let controller = ready_controller(articles(12)).await;
        controller.set_page(2);
        controller.source.push_fetch(Ok(articles(12)));
        controller.refresh().await.unwrap();
        assert_eq!(controller.view().page, 2);
    }

    #[tokio::test]
    async fn test_first_refresh_resets_page() {
        let source = ScriptedSource::default();
        source.push_fetch(Ok(articles(12)));
        let controller = controller(source);
        controller.set_page(3);
        controller.refresh().await.unwrap();
        assert_eq!(controller.view().page, 1);
    }

    #[tokio::test]
    async fn test_query_shrink_clamps_page() {
        let controller = ready_controller(articles(12)).await;
        controller.set_page(3);
        assert_eq!(controller.view().page, 3);
        // 3 matches at page_size 5 → a single page.
        controller.set_query("Article 1");
        let view = controller.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.matched, 3); // "Article 1", "Article 10", "Article 11"
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_set_action_accepts_server_representation() {
        let controller = ready_controller(articles(3)).await;
        let mut returned = article("a1", "Article 1 (edited)", ActionTag::Spot);
        returned.views = 99;
        controller.source.push_action(Ok(returned.clone()));
        controller.set_action("a1", ActionTag::Spot).await.unwrap();
        let view = controller.view();
        let row = view.rows.iter().find(|r| r.id.as_str() == "a1").unwrap();
        assert_eq!(row, &returned, "server representation is authoritative");
        assert!(!view.is_mutating("a1"));
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back_only_that_row() {
        let controller = ready_controller(articles(3)).await;
        controller.source.push_action(Err(transport("nope")));
        let err = controller.set_action("a1", ActionTag::Suspend).await.unwrap_err();
        assert!(!err.is_busy());
        let view = controller.view();
        let row = view.rows.iter().find(|r| r.id.as_str() == "a1").unwrap();
        assert_eq!(row.action_tag, ActionTag::Active, "rolled back to pre-mutation value");
        assert!(view.row_error("a1").is_some());
        for other in view.rows.iter().filter(|r| r.id.as_str() != "a1") {
            assert_eq!(other.action_tag, ActionTag::Active);
            assert!(view.row_error(other.id.as_str()).is_none());
        }
    }

    #[tokio::test]
    async fn test_second_mutation_for_same_id_is_busy() {
        let controller = std::sync::Arc::new(ready_controller(articles(3)).await);
        let release = controller.source.gate_next_action();
        controller.source.push_action(Ok(article("a1", "Article 1", ActionTag::Spot)));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_action("a1", ActionTag::Spot).await })
        };
        // Let the first mutation take the row lock.
        while !controller.view().is_mutating("a1") {
            tokio::task::yield_now().await;
        }

        let err = controller.set_action("a1", ActionTag::Feat).await.unwrap_err();
        assert!(err.is_busy());

        // An unrelated row stays interactive.
        controller.source.push_action(Ok(article("a2", "Article 2", ActionTag::Feat)));
        controller.set_action("a2", ActionTag::Feat).await.unwrap();

        release.send(()).unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(
            controller.view().rows.iter().find(|r| r.id.as_str() == "a1").unwrap().action_tag,
            ActionTag::Spot,
            "busy rejection must not affect the first mutation's outcome"
        );
    }

    #[tokio::test]
    async fn test_unknown_record_is_rejected() {
        let controller = ready_controller(articles(3)).await;
        let err = controller.set_action("ghost", ActionTag::Spot).await.unwrap_err();
        assert!(matches!(err, SdkError::MissingRecord { .. }));
    }

    #[tokio::test]
    async fn test_refresh_does_not_clobber_mutating_row() {
        let controller = std::sync::Arc::new(ready_controller(articles(3)).await);
        let release = controller.source.gate_next_action();
        controller.source.push_action(Ok(article("a1", "Article 1", ActionTag::Spot)));

        let mutation = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_action("a1", ActionTag::Spot).await })
        };
        while !controller.view().is_mutating("a1") {
            tokio::task::yield_now().await;
        }

        // A refresh racing the mutation returns the old tag for a1.
        controller.source.push_fetch(Ok(articles(3)));
        controller.refresh().await.unwrap();
        let row = controller.collection().into_iter().find(|r| r.id.as_str() == "a1").unwrap();
        assert_eq!(row.action_tag, ActionTag::Spot, "optimistic write survives the refresh");

        release.send(()).unwrap();
        mutation.await.unwrap().unwrap();
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_remove_applies_only_on_confirmed_success() {
        let controller = ready_controller(articles(3)).await;

        controller.source.push_removal(Err(transport("locked")));
        let err = controller.remove("a1").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(controller.view().total, 3, "destructive actions are never optimistic");

        controller.source.push_removal(Ok(()));
        controller.remove("a1").await.unwrap();
        let view = controller.view();
        assert_eq!(view.total, 2);
        assert!(!view.rows.iter().any(|r| r.id.as_str() == "a1"));
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_export_covers_filtered_not_paged() {
        let controller = ready_controller(articles(12)).await;
        controller.set_page(2);
        let snapshot = controller.export_snapshot();
        assert_eq!(snapshot.rows.len(), 12);
        assert_eq!(snapshot.columns, Article::export_columns());
    }

    #[tokio::test]
    async fn test_export_uses_fallback_labels() {
        let mut partial = article("a1", "No byline", ActionTag::Active);
        partial.author_name = None;
        let controller = ready_controller(vec![partial]).await;
        let snapshot = controller.export_snapshot();
        assert_eq!(snapshot.rows[0][1], "Unknown Author");
    }
}
