//! Owner of the applied snapshot: serializes update cycles against one surface
use crate::config::AdapterConfig;
use crate::delegate::{EditingStyle, ListDataSource, ListDelegate, Noop, SurfaceEvent};
use crate::diff_engine::{DiffEngine, ScriptSummary};
use crate::errors::ReconcileError;
use crate::reconciler::{ApplyReport, Reconciler};
use crate::registry::{CellRegistry, CellView, ModelableCell, SupplementaryKind, TextSupplementaryView};
use crate::snapshot::Snapshot;
use crate::surface::{Completion, ListSurface, SurfaceError};
use crate::types::{BatchId, IndexPath, Item, Section, Size, next_batch_id};
use log::{debug, info, warn};
use std::marker::PhantomData;
use std::rc::Rc;

/// Result of handing a snapshot to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The surface finished synchronously and the snapshot is the new baseline.
    Applied(ApplyReport),
    /// The batch is running; call [`ListAdapter::complete`] when it ends.
    InFlight(BatchId),
    /// Another batch is running; the snapshot will start after it.
    /// `superseded` is set when an older queued snapshot was dropped.
    Queued { superseded: bool },
}

/// A deferred batch that finished successfully.
#[derive(Debug)]
pub struct Completed {
    pub report: ApplyReport,
    /// Outcome of starting the queued snapshot, if there was one.
    pub next: Option<Result<Submission, ReconcileError>>,
}

#[derive(Debug)]
struct InFlight {
    batch: BatchId,
    snapshot: Snapshot,
    summary: ScriptSummary,
    placeholders: usize,
}

/// Drives a [`ListSurface`] from declarative snapshots.
///
/// The adapter is neither `Send` nor `Sync`: it lives on the context that
/// owns the surface, and at most one batch is in flight at a time.
pub struct ListAdapter<S: ListSurface> {
    surface: S,
    registry: CellRegistry,
    delegate: Box<dyn ListDelegate>,
    data_source: Box<dyn ListDataSource>,
    config: AdapterConfig,
    baseline: Snapshot,
    in_flight: Option<InFlight>,
    queued: Option<Snapshot>,
    _affinity: PhantomData<Rc<()>>,
}

impl<S: ListSurface> ListAdapter<S> {
    pub fn new(surface: S, registry: CellRegistry) -> Self {
        ListAdapter {
            surface,
            registry,
            delegate: Box::new(Noop),
            data_source: Box::new(Noop),
            config: AdapterConfig::default(),
            baseline: Snapshot::new(),
            in_flight: None,
            queued: None,
            _affinity: PhantomData,
        }
    }

    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_delegate(mut self, delegate: impl ListDelegate + 'static) -> Self {
        self.delegate = Box::new(delegate);
        self
    }

    pub fn with_data_source(mut self, data_source: impl ListDataSource + 'static) -> Self {
        self.data_source = Box::new(data_source);
        self
    }

    /// The last snapshot the surface confirmed.
    pub fn snapshot(&self) -> &Snapshot {
        &self.baseline
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    pub fn in_flight_batch(&self) -> Option<BatchId> {
        self.in_flight.as_ref().map(|f| f.batch)
    }

    pub fn queued(&self) -> Option<&Snapshot> {
        self.queued.as_ref()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn registry(&self) -> &CellRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CellRegistry {
        &mut self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Register a cell type under its default kind.
    pub fn register_cell<C: ModelableCell>(&mut self) -> Result<(), ReconcileError> {
        self.registry.register::<C>()
    }

    /// Bring the surface to `snapshot`.
    ///
    /// Duplicate identities are reported here, before anything is queued or
    /// any surface call is made.
    pub fn submit(&mut self, snapshot: Snapshot) -> Result<Submission, ReconcileError> {
        snapshot.validate()?;

        if let Some(in_flight) = &self.in_flight {
            let superseded = match self.queued.replace(snapshot) {
                Some(dropped) => {
                    warn!(
                        "ListAdapter: snapshot {} coalesced away while {} is in flight",
                        dropped.id(),
                        in_flight.batch
                    );
                    true
                }
                None => false,
            };
            return Ok(Submission::Queued { superseded });
        }

        // A queue left behind by a failed batch is older than `snapshot`.
        if let Some(stale) = self.queued.take() {
            warn!(
                "ListAdapter: queued snapshot {} superseded by {}",
                stale.id(),
                snapshot.id()
            );
        }

        self.run_cycle(snapshot)
    }

    /// Completion signal of a deferred batch.
    ///
    /// On success the batch's snapshot becomes the baseline and the queued
    /// snapshot, if any, starts. On failure the baseline stays where it was.
    pub fn complete(
        &mut self,
        batch: BatchId,
        result: Result<(), SurfaceError>,
    ) -> Result<Completed, ReconcileError> {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.batch == batch => in_flight,
            other => {
                let expected = other.as_ref().map(|f| f.batch);
                self.in_flight = other;
                return Err(ReconcileError::BatchMismatch {
                    expected,
                    got: batch,
                });
            }
        };

        match result {
            Ok(()) => {
                let report = self.commit(
                    in_flight.snapshot,
                    Some(batch),
                    in_flight.summary,
                    in_flight.placeholders,
                );
                let next = self.queued.take().map(|queued| self.run_cycle(queued));
                Ok(Completed { report, next })
            }
            Err(source) => {
                self.drop_queue_after_failure(batch);
                Err(ReconcileError::WidgetApplyFailure { batch, source })
            }
        }
    }

    /// Start the queued snapshot if nothing is in flight. Only needed when
    /// `discard_queued_on_failure` is off and a batch failed.
    pub fn resume(&mut self) -> Option<Result<Submission, ReconcileError>> {
        if self.in_flight.is_some() {
            return None;
        }
        let queued = self.queued.take()?;
        Some(self.run_cycle(queued))
    }

    /// Replace the surface content with `snapshot` without diffing, e.g.
    /// after a `WidgetApplyFailure`.
    pub fn resynchronize(&mut self, snapshot: Snapshot) -> Result<ApplyReport, ReconcileError> {
        if self.in_flight.is_some() {
            return Err(ReconcileError::CycleInFlight);
        }
        snapshot.validate()?;

        let (sections, placeholders) =
            Reconciler::new(&self.registry, self.config.unresolved_kind, false)
                .with_delegate(self.delegate.as_mut())
                .realize_snapshot(&snapshot)?;

        if let Some(dropped) = self.queued.take() {
            warn!(
                "ListAdapter: queued snapshot {} dropped by resynchronize",
                dropped.id()
            );
        }

        info!(
            "ListAdapter: resynchronizing to {} ({} sections)",
            snapshot.id(),
            sections.len()
        );
        let summary = ScriptSummary {
            section_inserts: sections.len(),
            ..ScriptSummary::default()
        };
        self.surface.reload_data(sections);
        Ok(self.commit(snapshot, None, summary, placeholders))
    }

    fn run_cycle(&mut self, snapshot: Snapshot) -> Result<Submission, ReconcileError> {
        let batch = next_batch_id();

        let (summary, dispatch) = {
            let engine = DiffEngine::new(&self.baseline, &snapshot)?;
            let script = engine.diff();
            let summary = script.summary();
            if script.is_empty() {
                (summary, None)
            } else {
                let dispatch = Reconciler::new(
                    &self.registry,
                    self.config.unresolved_kind,
                    self.config.animating_differences,
                )
                .with_delegate(self.delegate.as_mut())
                .apply(&engine, &script, &mut self.surface, batch)?;
                (summary, Some(dispatch))
            }
        };

        let Some(dispatch) = dispatch else {
            debug!("ListAdapter: {} has no changes", snapshot.id());
            return Ok(Submission::Applied(self.commit(snapshot, None, summary, 0)));
        };

        match dispatch.completion {
            Completion::Finished(Ok(())) => Ok(Submission::Applied(self.commit(
                snapshot,
                Some(batch),
                summary,
                dispatch.placeholders,
            ))),
            Completion::Finished(Err(source)) => {
                self.drop_queue_after_failure(batch);
                Err(ReconcileError::WidgetApplyFailure { batch, source })
            }
            Completion::Deferred => {
                debug!("ListAdapter: {} in flight for {}", batch, snapshot.id());
                self.in_flight = Some(InFlight {
                    batch,
                    snapshot,
                    summary,
                    placeholders: dispatch.placeholders,
                });
                Ok(Submission::InFlight(batch))
            }
        }
    }

    fn commit(
        &mut self,
        snapshot: Snapshot,
        batch: Option<BatchId>,
        summary: ScriptSummary,
        placeholders: usize,
    ) -> ApplyReport {
        let report = ApplyReport {
            batch,
            snapshot: snapshot.id(),
            summary,
            placeholders,
        };
        info!(
            "ListAdapter: baseline {} -> {}",
            self.baseline.id(),
            snapshot.id()
        );
        debug!(
            "ListAdapter: {}",
            serde_json::to_string(&report).unwrap_or_default()
        );
        self.baseline = snapshot;
        report
    }

    fn drop_queue_after_failure(&mut self, batch: BatchId) {
        if !self.config.discard_queued_on_failure {
            return;
        }
        if let Some(dropped) = self.queued.take() {
            warn!(
                "ListAdapter: {} failed, queued snapshot {} discarded",
                batch,
                dropped.id()
            );
        }
    }

    /// The arrangement the surface is showing: the in-flight snapshot while
    /// a batch animates, the baseline otherwise.
    pub fn presented(&self) -> &Snapshot {
        presented(&self.in_flight, &self.baseline)
    }

    /// Forward a surface event to the delegate or data source.
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        let snapshot = presented(&self.in_flight, &self.baseline);
        let delegate = self.delegate.as_mut();

        let item_event = move |path: IndexPath| {
            let item = snapshot.item_at(path);
            if item.is_none() {
                warn!("ListAdapter: event for unknown index path {}", path);
            }
            item.map(|item| (item, path))
        };

        match event {
            SurfaceEvent::WillDisplayCell(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.will_display(item, at);
                }
            }
            SurfaceEvent::DidEndDisplayingCell(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.did_end_displaying(item, at);
                }
            }
            SurfaceEvent::Select(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.did_select(item, at);
                }
            }
            SurfaceEvent::Deselect(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.did_deselect(item, at);
                }
            }
            SurfaceEvent::Highlight(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.did_highlight(item, at);
                }
            }
            SurfaceEvent::Unhighlight(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.did_unhighlight(item, at);
                }
            }
            SurfaceEvent::PrimaryAction(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.perform_primary_action(item, at);
                }
            }
            SurfaceEvent::WillDisplayContextMenu(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.will_display_context_menu(item, at);
                }
            }
            SurfaceEvent::WillEndContextMenu(path) => {
                if let Some((item, at)) = item_event(path) {
                    delegate.will_end_context_menu_interaction(item, at);
                }
            }
            SurfaceEvent::WillDisplaySupplementary { kind, section } => {
                match snapshot.section_at(section) {
                    Some(s) => delegate.will_display_supplementary(s, kind, section),
                    None => warn!("ListAdapter: {} for unknown section {}", kind.as_str(), section),
                }
            }
            SurfaceEvent::DidEndDisplayingSupplementary { kind, section } => {
                match snapshot.section_at(section) {
                    Some(s) => delegate.did_end_displaying_supplementary(s, kind, section),
                    None => warn!("ListAdapter: {} for unknown section {}", kind.as_str(), section),
                }
            }
            SurfaceEvent::Prefetch(paths) => {
                let (items, paths) = resolve_all(snapshot, &paths);
                if !items.is_empty() {
                    self.data_source.prefetch(&items, &paths);
                }
            }
            SurfaceEvent::CancelPrefetch(paths) => {
                let (items, paths) = resolve_all(snapshot, &paths);
                if !items.is_empty() {
                    self.data_source.cancel_prefetch(&items, &paths);
                }
            }
        }
    }

    /// Size of the item at `path`: the data source's answer, else the cell's.
    pub fn size_for(&self, path: IndexPath) -> Option<Size> {
        let item = self.presented().item_at(path)?;
        self.data_source.size(item, path).or_else(|| {
            let context = self.surface.context();
            self.registry.resolve(item.kind())?.size(item.model(), &context)
        })
    }

    pub fn estimated_size_for(&self, path: IndexPath) -> Option<Size> {
        let item = self.presented().item_at(path)?;
        self.data_source.estimated_size(item, path).or_else(|| {
            let context = self.surface.context();
            self.registry
                .resolve(item.kind())?
                .estimated_size(item.model(), &context)
        })
    }

    pub fn indentation_level_for(&self, path: IndexPath) -> usize {
        let Some(item) = self.presented().item_at(path) else {
            return 0;
        };
        let context = self.surface.context();
        self.registry
            .resolve(item.kind())
            .map_or(0, |factory| factory.indentation_level(item.model(), &context))
    }

    /// Header or footer view of section `index`: the data source's, else a
    /// text view when the section has the matching text.
    pub fn supplementary_view(
        &mut self,
        index: usize,
        kind: SupplementaryKind,
    ) -> Option<Box<dyn CellView>> {
        let section = presented(&self.in_flight, &self.baseline).section_at(index)?;
        let mut view = self
            .data_source
            .supplementary_view(section, kind, index)
            .or_else(|| {
                let text = supplementary_text(section, kind)?;
                let mut view = TextSupplementaryView::default();
                view.set_model(text.to_string());
                Some(Box::new(view) as Box<dyn CellView>)
            })?;
        self.delegate
            .modify_supplementary(view.as_mut(), section, kind, index);
        Some(view)
    }

    pub fn supplementary_size(&self, index: usize, kind: SupplementaryKind) -> Option<Size> {
        let section = self.presented().section_at(index)?;
        let text = supplementary_text(section, kind)?.to_string();
        TextSupplementaryView::size(&text, &self.surface.context())
    }

    pub fn section_index_titles(&self) -> Option<Vec<String>> {
        self.data_source.section_index_titles()
    }

    pub fn can_move(&self, path: IndexPath) -> bool {
        self.presented()
            .item_at(path)
            .is_some_and(|item| self.data_source.can_move(item, path))
    }

    /// Tell the data source the user moved an item. The adapter does not
    /// change its baseline; the caller submits the reordered snapshot.
    pub fn move_item(&mut self, from: IndexPath, to: IndexPath) {
        let snapshot = presented(&self.in_flight, &self.baseline);
        match snapshot.item_at(from) {
            Some(item) => self.data_source.move_item(item, from, to),
            None => warn!("ListAdapter: move from unknown index path {}", from),
        }
    }

    pub fn can_edit(&self, path: IndexPath) -> bool {
        self.presented()
            .item_at(path)
            .is_some_and(|item| self.data_source.can_edit(item, path))
    }

    pub fn commit_edit(&mut self, path: IndexPath, style: EditingStyle) {
        let snapshot = presented(&self.in_flight, &self.baseline);
        match snapshot.item_at(path) {
            Some(item) => self.data_source.commit_edit(item, style, path),
            None => warn!("ListAdapter: edit at unknown index path {}", path),
        }
    }
}

fn presented<'s>(in_flight: &'s Option<InFlight>, baseline: &'s Snapshot) -> &'s Snapshot {
    in_flight.as_ref().map_or(baseline, |f| &f.snapshot)
}

fn supplementary_text(section: &Section, kind: SupplementaryKind) -> Option<&str> {
    match kind {
        SupplementaryKind::Header => section.header.as_deref(),
        SupplementaryKind::Footer => section.footer.as_deref(),
    }
}

fn resolve_all(snapshot: &Snapshot, paths: &[IndexPath]) -> (Vec<Item>, Vec<IndexPath>) {
    paths
        .iter()
        .filter_map(|&path| snapshot.item_at(path).map(|item| (item.clone(), path)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnresolvedKindPolicy;
    use crate::memory_surface::{MemorySurface, SurfaceCall};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct TextCell {
        text: Option<&'static str>,
    }

    impl ModelableCell for TextCell {
        type Model = &'static str;

        fn set_model(&mut self, model: &'static str) {
            self.text = Some(model);
        }

        fn model(&self) -> Option<&&'static str> {
            self.text.as_ref()
        }

        fn size(model: &&'static str, _context: &crate::types::SurfaceContext) -> Option<Size> {
            Some(Size::new(10.0, model.len() as f64))
        }
    }

    fn text(s: &'static str) -> Item {
        Item::new("text", s)
    }

    fn section(id: &str, items: &[&'static str]) -> Section {
        Section::new(id).with_items(items.iter().copied().map(text))
    }

    fn adapter(surface: MemorySurface) -> ListAdapter<MemorySurface> {
        let mut registry = CellRegistry::new();
        registry.register_as::<TextCell>("text").unwrap();
        ListAdapter::new(surface, registry)
    }

    #[derive(Default)]
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ListDelegate for Recorder {
        fn did_select(&mut self, item: &Item, at: IndexPath) {
            let text = item.model_as::<&'static str>().copied().unwrap_or("?");
            self.log.borrow_mut().push(format!("select {} {}", text, at));
        }

        fn will_display_supplementary(&mut self, section: &Section, kind: SupplementaryKind, _at: usize) {
            self.log
                .borrow_mut()
                .push(format!("{} {}", kind.as_str(), section.id));
        }
    }

    impl ListDataSource for Recorder {
        fn prefetch(&mut self, items: &[Item], _at: &[IndexPath]) {
            self.log.borrow_mut().push(format!("prefetch {}", items.len()));
        }

        fn can_move(&self, _item: &Item, at: IndexPath) -> bool {
            at.section == 0
        }
    }

    #[test]
    fn synchronous_submit_commits_baseline() {
        let mut adapter = adapter(MemorySurface::new());
        let snapshot = Snapshot::from_sections([section("A", &["a", "b"])]);
        let id = snapshot.id();

        let submission = adapter.submit(snapshot).unwrap();

        let Submission::Applied(report) = submission else {
            panic!("expected Applied");
        };
        assert_eq!(report.snapshot, id);
        assert_eq!(report.summary.section_inserts, 1);
        assert!(report.batch.is_some());
        assert_eq!(adapter.snapshot().id(), id);
        assert_eq!(adapter.surface().arrangement(), adapter.snapshot().arrangement());
    }

    #[test]
    fn empty_script_commits_without_touching_surface() {
        let mut adapter = adapter(MemorySurface::new());
        let first = Snapshot::from_sections([section("A", &["a"])]);
        let mut second = first.clone();
        second.append_items("A", []).unwrap();
        adapter.submit(first).unwrap();
        adapter.surface_mut().clear_calls();

        let submission = adapter.submit(second).unwrap();

        assert!(matches!(submission, Submission::Applied(ApplyReport { batch: None, .. })));
        assert!(adapter.surface().calls().is_empty());
    }

    #[test]
    fn duplicate_identity_is_refused_before_queueing() {
        let mut adapter = adapter(MemorySurface::new());
        let bad = Snapshot::from_sections([section("A", &["x", "x"])]);

        let err = adapter.submit(bad).unwrap_err();

        assert!(matches!(err, ReconcileError::DuplicateIdentity { .. }));
        assert!(adapter.surface().calls().is_empty());
        assert!(adapter.snapshot().is_empty());
    }

    #[test]
    fn submissions_during_a_batch_coalesce_to_the_latest() {
        let mut adapter = adapter(MemorySurface::new().with_deferred_completion());
        let s1 = Snapshot::from_sections([section("A", &["a"])]);
        let s2 = Snapshot::from_sections([section("A", &["a", "b"])]);
        let s3 = Snapshot::from_sections([section("A", &["c", "a"])]);
        let s3_id = s3.id();

        let Submission::InFlight(batch) = adapter.submit(s1).unwrap() else {
            panic!("expected InFlight");
        };
        assert_eq!(adapter.submit(s2).unwrap(), Submission::Queued { superseded: false });
        assert_eq!(adapter.submit(s3).unwrap(), Submission::Queued { superseded: true });
        assert!(!adapter.is_idle());
        assert!(adapter.snapshot().is_empty());

        let (done, result) = adapter.surface_mut().take_completion().unwrap();
        assert_eq!(done, batch);
        let completed = adapter.complete(done, result).unwrap();
        assert_eq!(completed.report.batch, Some(batch));

        let Some(Ok(Submission::InFlight(next))) = completed.next else {
            panic!("expected the queued snapshot to start");
        };
        let (done, result) = adapter.surface_mut().take_completion().unwrap();
        assert_eq!(done, next);
        let completed = adapter.complete(done, result).unwrap();
        assert!(completed.next.is_none());

        assert!(adapter.is_idle());
        assert_eq!(adapter.snapshot().id(), s3_id);
        assert_eq!(adapter.surface().arrangement(), adapter.snapshot().arrangement());
    }

    #[test]
    fn completion_for_another_batch_is_a_mismatch() {
        let mut adapter = adapter(MemorySurface::new().with_deferred_completion());
        let Submission::InFlight(batch) = adapter
            .submit(Snapshot::from_sections([section("A", &["a"])]))
            .unwrap()
        else {
            panic!("expected InFlight");
        };

        let err = adapter.complete(BatchId(batch.0 + 1000), Ok(())).unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::BatchMismatch { expected: Some(b), .. } if b == batch
        ));
        assert_eq!(adapter.in_flight_batch(), Some(batch));
    }

    #[test]
    fn failed_batch_keeps_baseline_and_drops_queue() {
        let mut adapter = adapter(MemorySurface::new().with_deferred_completion());
        let Submission::InFlight(batch) = adapter
            .submit(Snapshot::from_sections([section("A", &["a"])]))
            .unwrap()
        else {
            panic!("expected InFlight");
        };
        adapter
            .submit(Snapshot::from_sections([section("B", &["b"])]))
            .unwrap();

        let err = adapter
            .complete(batch, Err(SurfaceError::Rejected("boom".into())))
            .unwrap_err();

        assert!(matches!(err, ReconcileError::WidgetApplyFailure { .. }));
        assert!(err.requires_resync());
        assert!(adapter.is_idle());
        assert!(adapter.queued().is_none());
        assert!(adapter.snapshot().is_empty());
    }

    #[test]
    fn failed_batch_can_keep_queue_for_resume() {
        let config = AdapterConfig {
            discard_queued_on_failure: false,
            ..AdapterConfig::default()
        };
        let mut adapter = adapter(MemorySurface::new()).with_config(config);
        adapter
            .surface_mut()
            .fail_next_batch(SurfaceError::Rejected("boom".into()));

        let err = adapter
            .submit(Snapshot::from_sections([section("A", &["a"])]))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::WidgetApplyFailure { .. }));
        assert!(adapter.resume().is_none());

        let target = Snapshot::from_sections([section("A", &["a", "b"])]);
        let report = adapter.resynchronize(target.clone()).unwrap();
        assert_eq!(report.batch, None);
        assert_eq!(adapter.surface().arrangement(), target.arrangement());
        assert!(matches!(
            adapter.surface().calls().last(),
            Some(SurfaceCall::ReloadData)
        ));
    }

    #[test]
    fn kept_queue_resumes_after_failure() {
        let config = AdapterConfig {
            discard_queued_on_failure: false,
            ..AdapterConfig::default()
        };
        let mut adapter =
            adapter(MemorySurface::new().with_deferred_completion()).with_config(config);
        adapter
            .surface_mut()
            .fail_next_batch(SurfaceError::Rejected("boom".into()));
        let Submission::InFlight(batch) = adapter
            .submit(Snapshot::from_sections([section("A", &["a"])]))
            .unwrap()
        else {
            panic!("expected InFlight");
        };
        let queued = Snapshot::from_sections([section("A", &["b"])]);
        let queued_id = queued.id();
        adapter.submit(queued).unwrap();
        let (done, result) = adapter.surface_mut().take_completion().unwrap();
        assert_eq!(done, batch);
        adapter.complete(done, result).unwrap_err();
        assert_eq!(adapter.queued().map(Snapshot::id), Some(queued_id));

        let Some(Ok(Submission::InFlight(next))) = adapter.resume() else {
            panic!("expected the kept snapshot to start");
        };
        let (done, result) = adapter.surface_mut().take_completion().unwrap();
        assert_eq!(done, next);
        adapter.complete(done, result).unwrap();

        assert_eq!(adapter.snapshot().id(), queued_id);
    }

    #[test]
    fn newer_submission_supersedes_queue_kept_after_failure() {
        let config = AdapterConfig {
            discard_queued_on_failure: false,
            ..AdapterConfig::default()
        };
        let mut adapter =
            adapter(MemorySurface::new().with_deferred_completion()).with_config(config);
        adapter
            .surface_mut()
            .fail_next_batch(SurfaceError::Rejected("boom".into()));
        let Submission::InFlight(first) = adapter
            .submit(Snapshot::from_sections([section("A", &["a"])]))
            .unwrap()
        else {
            panic!("expected InFlight");
        };
        adapter
            .submit(Snapshot::from_sections([section("A", &["stale"])]))
            .unwrap();
        let (done, result) = adapter.surface_mut().take_completion().unwrap();
        assert_eq!(done, first);
        adapter.complete(done, result).unwrap_err();

        let latest = Snapshot::from_sections([section("A", &["latest"])]);
        let latest_id = latest.id();
        let Submission::InFlight(second) = adapter.submit(latest).unwrap() else {
            panic!("expected InFlight");
        };
        assert!(adapter.queued().is_none());

        let (done, result) = adapter.surface_mut().take_completion().unwrap();
        assert_eq!(done, second);
        let completed = adapter.complete(done, result).unwrap();

        assert!(completed.next.is_none());
        assert_eq!(adapter.snapshot().id(), latest_id);
        assert_eq!(adapter.surface().arrangement(), adapter.snapshot().arrangement());
    }

    #[test]
    fn resynchronize_refuses_while_in_flight() {
        let mut adapter = adapter(MemorySurface::new().with_deferred_completion());
        adapter
            .submit(Snapshot::from_sections([section("A", &["a"])]))
            .unwrap();

        let err = adapter.resynchronize(Snapshot::new()).unwrap_err();

        assert!(matches!(err, ReconcileError::CycleInFlight));
    }

    #[test]
    fn unresolved_kind_policy_from_config() {
        let config = AdapterConfig {
            unresolved_kind: UnresolvedKindPolicy::Placeholder,
            ..AdapterConfig::default()
        };
        let mut adapter = adapter(MemorySurface::new()).with_config(config);
        let snapshot = Snapshot::from_sections([
            Section::new("A").with_items([Item::new("image", 1u8)]),
        ]);

        let Submission::Applied(report) = adapter.submit(snapshot).unwrap() else {
            panic!("expected Applied");
        };

        assert_eq!(report.placeholders, 1);
    }

    #[test]
    fn events_resolve_against_presented_snapshot() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut adapter = adapter(MemorySurface::new().with_deferred_completion())
            .with_delegate(Recorder { log: log.clone() })
            .with_data_source(Recorder { log: log.clone() });
        adapter
            .submit(Snapshot::from_sections([
                section("A", &["a", "b"]).with_header("Letters"),
            ]))
            .unwrap();

        adapter.handle_event(SurfaceEvent::Select(IndexPath::new(0, 1)));
        adapter.handle_event(SurfaceEvent::Select(IndexPath::new(4, 0)));
        adapter.handle_event(SurfaceEvent::WillDisplaySupplementary {
            kind: SupplementaryKind::Header,
            section: 0,
        });
        adapter.handle_event(SurfaceEvent::Prefetch(vec![
            IndexPath::new(0, 0),
            IndexPath::new(0, 9),
        ]));

        assert_eq!(
            *log.borrow(),
            vec![
                "select b [0, 1]".to_string(),
                "header A".to_string(),
                "prefetch 1".to_string(),
            ]
        );
    }

    #[derive(Default)]
    struct Tweaks {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ListDelegate for Tweaks {
        fn modify_cell(&mut self, _cell: &mut dyn CellView, item: &Item, at: IndexPath) {
            let text = item.model_as::<&'static str>().copied().unwrap_or("?");
            self.log.borrow_mut().push(format!("cell {} {}", text, at));
        }

        fn modify_supplementary(
            &mut self,
            view: &mut dyn CellView,
            section: &Section,
            kind: SupplementaryKind,
            _at: usize,
        ) {
            if let Some(text) = view.downcast_mut::<TextSupplementaryView>() {
                let label = format!("{} ({})", text.text().unwrap_or_default(), section.id);
                text.set_model(label);
            }
            self.log.borrow_mut().push(format!("{} {}", kind.as_str(), section.id));
        }
    }

    #[test]
    fn delegate_modifies_realized_cells_and_supplementaries() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut adapter =
            adapter(MemorySurface::new()).with_delegate(Tweaks { log: log.clone() });

        adapter
            .submit(Snapshot::from_sections([
                section("A", &["a"]).with_header("Letters"),
            ]))
            .unwrap();
        adapter
            .submit(Snapshot::from_sections([
                section("A", &["a", "b"]).with_header("Letters"),
            ]))
            .unwrap();
        adapter
            .resynchronize(Snapshot::from_sections([section("B", &["c"])]))
            .unwrap();
        assert!(adapter.supplementary_view(0, SupplementaryKind::Header).is_none());
        adapter
            .resynchronize(Snapshot::from_sections([
                section("C", &[]).with_header("Empty"),
            ]))
            .unwrap();
        let header = adapter
            .supplementary_view(0, SupplementaryKind::Header)
            .unwrap();

        assert_eq!(
            header.downcast_ref::<TextSupplementaryView>().and_then(|v| v.text()),
            Some("Empty (C)")
        );
        assert_eq!(
            *log.borrow(),
            vec![
                "cell a [0, 0]".to_string(),
                "cell b [0, 1]".to_string(),
                "cell c [0, 0]".to_string(),
                "header C".to_string(),
            ]
        );
    }

    struct Estimates;

    impl ListDataSource for Estimates {
        fn estimated_size(&self, _item: &Item, _at: IndexPath) -> Option<Size> {
            Some(Size::new(10.0, 50.0))
        }
    }

    #[test]
    fn data_source_estimate_takes_precedence_over_cell() {
        let mut adapter = adapter(MemorySurface::new()).with_data_source(Estimates);
        adapter
            .submit(Snapshot::from_sections([section("A", &["abc"])]))
            .unwrap();

        assert_eq!(
            adapter.estimated_size_for(IndexPath::new(0, 0)),
            Some(Size::new(10.0, 50.0))
        );
        assert_eq!(adapter.size_for(IndexPath::new(0, 0)), Some(Size::new(10.0, 3.0)));
    }

    #[test]
    fn sizing_and_supplementary_queries() {
        let mut adapter = adapter(MemorySurface::new().with_width(320.0))
            .with_data_source(Recorder::default());
        adapter
            .submit(Snapshot::from_sections([
                section("A", &["abc"]).with_footer("end"),
            ]))
            .unwrap();

        assert_eq!(adapter.size_for(IndexPath::new(0, 0)), Some(Size::new(10.0, 3.0)));
        assert_eq!(adapter.estimated_size_for(IndexPath::new(0, 0)), Some(Size::new(10.0, 3.0)));
        assert_eq!(adapter.size_for(IndexPath::new(0, 5)), None);
        assert_eq!(adapter.indentation_level_for(IndexPath::new(0, 0)), 0);

        assert!(adapter.supplementary_view(0, SupplementaryKind::Header).is_none());
        let footer = adapter.supplementary_view(0, SupplementaryKind::Footer).unwrap();
        assert_eq!(
            footer.downcast_ref::<TextSupplementaryView>().and_then(|v| v.text()),
            Some("end")
        );
        assert_eq!(
            adapter.supplementary_size(0, SupplementaryKind::Footer),
            Some(Size::new(320.0, TextSupplementaryView::HEIGHT))
        );

        assert!(adapter.can_move(IndexPath::new(0, 0)));
        assert!(!adapter.can_edit(IndexPath::new(0, 0)));
        assert_eq!(adapter.section_index_titles(), None);
    }
}
