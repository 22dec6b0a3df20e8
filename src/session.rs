use crate::{
    beamline::Beamline,
    element::{Element, ElementId},
    error::BeamlineError,
    persistence::Store,
    schema::SchemaCatalog,
    validate, watchpoint, SCHEMA,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

pub const BEAMLINE_MODEL: &str = "beamline";
pub const SIMULATION_MODEL: &str = "simulation";

/// The complete editable state: the beamline sequence plus the named
/// auxiliary models (simulation settings, report configurations). One
/// working copy and one baseline copy of this exist per session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    #[serde(default)]
    pub beamline: Beamline,
    #[serde(flatten)]
    pub named: HashMap<String, Value>,
}

impl ModelSet {
    /// Configured distance from the source, when the simulation model
    /// carries one. Form values may arrive as strings.
    pub fn source_distance(&self) -> Option<f64> {
        match self.named.get(SIMULATION_MODEL)?.get("distanceFromSource")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn model_equals(&self, other: &Self, name: &str) -> bool {
        if name == BEAMLINE_MODEL {
            self.beamline == other.beamline
        } else {
            self.named.get(name) == other.named.get(name)
        }
    }
}

/// One editing session: working copy, last-committed baseline, and the
/// session-scoped selection state. All mutations are synchronous and run to
/// completion; the session is never shared across threads of control.
///
/// The session is Dirty whenever a tracked model differs from the baseline
/// and returns to Clean only through [`EditorSession::commit`] or
/// [`EditorSession::rollback`].
#[derive(Clone, Debug)]
pub struct EditorSession {
    catalog: SchemaCatalog,
    models: ModelSet,
    saved: ModelSet,
    active: Option<ElementId>,
    editable: bool,
}

impl EditorSession {
    pub fn new(state: ModelSet) -> Self {
        Self::with_catalog(state, SCHEMA.clone())
    }

    pub fn with_catalog(state: ModelSet, catalog: SchemaCatalog) -> Self {
        Self {
            catalog,
            saved: state.clone(),
            models: state,
            active: None,
            editable: true,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn saved(&self) -> &ModelSet {
        &self.saved
    }

    pub fn beamline(&self) -> &Beamline {
        &self.models.beamline
    }

    /// Direct mutable access for per-element edit forms. Edits become visible
    /// to dirty-checking immediately; there is no change notification.
    pub fn beamline_mut(&mut self) -> &mut Beamline {
        &mut self.models.beamline
    }

    pub fn model(&self, name: &str) -> Option<&Value> {
        self.models.named.get(name)
    }

    pub fn set_model(&mut self, name: &str, value: Value) {
        assert!(
            name != BEAMLINE_MODEL,
            "the beamline sequence is not a named model"
        );
        self.models.named.insert(name.to_owned(), value);
    }

    /// Fresh element template for a type the catalog knows.
    pub fn new_element(&self, type_tag: &str) -> Option<Element> {
        Element::from_template(&self.catalog, type_tag)
    }

    /// Drop appended at the end of the sequence. Watch elements get their
    /// report model created eagerly here; pruning waits for commit.
    pub fn add_element(&mut self, template: Element) -> ElementId {
        let is_watch = template.is_watch();
        let source = self.models.source_distance();
        let id = self.models.beamline.add(template, source);
        if is_watch {
            self.create_watch_report(id);
        }
        id
    }

    /// Drop into the gap at `index`.
    pub fn insert_element_at(&mut self, index: usize, template: Element) -> ElementId {
        let is_watch = template.is_watch();
        let source = self.models.source_distance();
        let id = self.models.beamline.insert_at(index, template, source);
        if is_watch {
            self.create_watch_report(id);
        }
        id
    }

    /// Reorder an existing element; see [`Beamline::move_to`].
    pub fn move_element(&mut self, index: usize, id: ElementId) {
        self.models.beamline.move_to(index, id);
    }

    /// Remove by id. The element's report model, if any, stays until commit.
    pub fn remove_element(&mut self, id: ElementId) -> Element {
        if self.active == Some(id) {
            self.active = None;
        }
        self.models.beamline.remove(id)
    }

    pub fn remove_active(&mut self) -> Option<Element> {
        self.active.map(|id| self.remove_element(id))
    }

    // Selection. At most one element editor is open at a time; clearing
    // before setting keeps observers from seeing two active items mid-update.

    pub fn active(&self) -> Option<ElementId> {
        self.active
    }

    pub fn active_item(&self) -> Option<&Element> {
        self.active.and_then(|id| self.models.beamline.by_id(id))
    }

    pub fn set_active(&mut self, id: Option<ElementId>) {
        self.active = None;
        if let Some(id) = id {
            assert!(
                self.models.beamline.by_id(id).is_some(),
                "set_active() on unknown element id {id}"
            );
            self.active = Some(id);
        }
    }

    pub fn active_item_title(&self) -> String {
        self.active_item()
            .map(|item| item.title.clone())
            .unwrap_or_default()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    // Validation is advisory: it never blocks a mutation, and blocking
    // commit on an invalid beamline is the caller's convention.

    pub fn is_active_item_valid(&self) -> bool {
        validate::is_item_valid(self.active_item(), &self.catalog)
    }

    pub fn is_beamline_valid(&self) -> bool {
        validate::is_beamline_valid(&self.models.beamline, &self.catalog)
    }

    /// Model names whose changes belong to this editor: the sequence itself
    /// plus every watchpoint report known to either copy.
    pub fn tracked_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for name in self.models.named.keys().chain(self.saved.named.keys()) {
            if watchpoint::is_watchpoint_report_name(name) {
                names.insert(name.clone());
            }
        }
        let mut tracked = vec![BEAMLINE_MODEL.to_string()];
        tracked.extend(names);
        tracked
    }

    pub fn is_dirty(&self, tracked: &[&str]) -> bool {
        tracked
            .iter()
            .any(|name| !self.models.model_equals(&self.saved, name))
    }

    /// Commit boundary: sort the sequence by position, run the caller's
    /// pre-save hook, prune orphaned watchpoint reports, persist, and make
    /// the working copy the new baseline. A failed save returns the error
    /// with the session still Dirty so the user can retry; nothing retries
    /// automatically. A Clean session commits as a no-op.
    ///
    /// The sort can reorder elements, so index-based references are stale
    /// afterwards; re-resolve through [`Beamline::index_of`].
    pub fn commit<S: Store + ?Sized>(
        &mut self,
        tracked: &[&str],
        store: &mut S,
        pre_save: impl FnOnce(&mut ModelSet),
    ) -> Result<(), BeamlineError> {
        if !self.is_dirty(tracked) {
            return Ok(());
        }
        self.models.beamline.sort_by_position();
        pre_save(&mut self.models);
        watchpoint::reconcile(&self.models.beamline, &mut self.models.named);
        store.save(&self.models)?;

        watchpoint::reconcile(&self.models.beamline, &mut self.saved.named);
        for name in tracked {
            self.copy_model(name, CopyDirection::WorkingToBaseline);
        }
        let report_names: Vec<String> = self
            .models
            .named
            .keys()
            .filter(|name| watchpoint::is_watchpoint_report_name(name))
            .cloned()
            .collect();
        for name in report_names {
            self.copy_model(&name, CopyDirection::WorkingToBaseline);
        }
        Ok(())
    }

    /// Discard the entire pending edit set for the tracked models and clear
    /// the selection. Coarse-grained: there is no per-operation undo.
    pub fn rollback(&mut self, tracked: &[&str]) {
        for name in tracked {
            self.copy_model(name, CopyDirection::BaselineToWorking);
        }
        self.active = None;
    }

    fn create_watch_report(&mut self, id: ElementId) {
        let report = watchpoint::new_watchpoint_report(&self.models.named, &self.catalog);
        self.models
            .named
            .insert(watchpoint::watchpoint_report_name(id), report);
    }

    fn copy_model(&mut self, name: &str, direction: CopyDirection) {
        let (from, to) = match direction {
            CopyDirection::WorkingToBaseline => (&self.models, &mut self.saved),
            CopyDirection::BaselineToWorking => (&self.saved, &mut self.models),
        };
        if name == BEAMLINE_MODEL {
            to.beamline = from.beamline.clone();
        } else {
            match from.named.get(name) {
                Some(value) => {
                    let value = value.clone();
                    to.named.insert(name.to_owned(), value);
                }
                None => {
                    to.named.remove(name);
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum CopyDirection {
    WorkingToBaseline,
    BaselineToWorking,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::watchpoint::watchpoint_report_name;

    fn session() -> EditorSession {
        EditorSession::new(ModelSet::default())
    }

    fn lens(session: &EditorSession) -> Element {
        session.new_element("lens").unwrap()
    }

    #[test]
    fn test_first_drop_without_source_distance() {
        let mut session = session();
        let id = session.insert_element_at(0, lens(&session));
        assert_eq!(id, ElementId(1));
        assert_eq!(session.beamline().get(0).position, 20.0);
    }

    #[test]
    fn test_first_drop_uses_simulation_distance() {
        let mut session = session();
        session.set_model(
            SIMULATION_MODEL,
            serde_json::json!({ "distanceFromSource": 17.5 }),
        );
        session.add_element(lens(&session));
        assert_eq!(session.beamline().get(0).position, 17.5);
    }

    #[test]
    fn test_watch_drop_creates_report_eagerly() {
        let mut session = session();
        let id = session.add_element(session.new_element("watch").unwrap());
        let report = session.model(&watchpoint_report_name(id)).unwrap();
        assert_eq!(report["colorMap"], Value::from("viridis"));
    }

    #[test]
    fn test_mutation_makes_session_dirty() {
        let mut session = session();
        assert!(!session.is_dirty(&[BEAMLINE_MODEL]));
        session.add_element(lens(&session));
        assert!(session.is_dirty(&[BEAMLINE_MODEL]));
    }

    #[test]
    fn test_field_edit_makes_session_dirty_and_rollback_reverts() {
        let mut store = MemoryStore::new();
        let mut session = session();
        let id = session.add_element(lens(&session));
        session
            .commit(&[BEAMLINE_MODEL], &mut store, |_| {})
            .unwrap();
        assert!(!session.is_dirty(&[BEAMLINE_MODEL]));

        session
            .beamline_mut()
            .by_id_mut(id)
            .unwrap()
            .set_field("horizontalFocalLength", Value::from(9.9));
        assert!(session.is_dirty(&[BEAMLINE_MODEL]));

        session.rollback(&[BEAMLINE_MODEL]);
        assert!(!session.is_dirty(&[BEAMLINE_MODEL]));
        assert_eq!(
            session.beamline().by_id(id).unwrap().field("horizontalFocalLength"),
            Some(&Value::from(3))
        );
    }

    #[test]
    fn test_commit_sorts_by_position() {
        let mut store = MemoryStore::new();
        let mut session = session();
        let a = session.add_element(lens(&session));
        let b = session.add_element(lens(&session));
        session.beamline_mut().by_id_mut(b).unwrap().position = 1.0;
        session
            .commit(&[BEAMLINE_MODEL], &mut store, |_| {})
            .unwrap();
        // index-based references are stale now; re-resolve by id
        assert_eq!(session.beamline().index_of(b), Some(0));
        assert_eq!(session.beamline().index_of(a), Some(1));
        assert_eq!(store.state().beamline, session.models().beamline);
    }

    #[test]
    fn test_commit_on_clean_session_is_a_no_op() {
        let mut store = MemoryStore::new();
        let mut session = session();
        session.add_element(lens(&session));
        session
            .commit(&[BEAMLINE_MODEL], &mut store, |_| {})
            .unwrap();
        let before = session.models().clone();
        let mut hook_ran = false;
        session
            .commit(&[BEAMLINE_MODEL], &mut store, |_| hook_ran = true)
            .unwrap();
        assert_eq!(session.models(), &before);
        assert_eq!(session.saved(), &before);
        assert!(!hook_ran);
    }

    #[test]
    fn test_commit_runs_pre_save_hook() {
        let mut store = MemoryStore::new();
        let mut session = session();
        session.add_element(lens(&session));
        session
            .commit(&[BEAMLINE_MODEL], &mut store, |models| {
                models
                    .named
                    .insert("propagation".to_string(), serde_json::json!([1, 0]));
            })
            .unwrap();
        assert!(store.state().named.contains_key("propagation"));
    }

    #[test]
    fn test_removed_watch_report_is_pruned_at_commit_only() {
        let mut store = MemoryStore::new();
        let mut session = session();
        let watch = session.add_element(session.new_element("watch").unwrap());
        let keeper = session.add_element(session.new_element("watch").unwrap());
        let report_name = watchpoint_report_name(watch);
        let tracked = session.tracked_names();
        let tracked: Vec<&str> = tracked.iter().map(String::as_str).collect();
        session.commit(&tracked, &mut store, |_| {}).unwrap();

        session.remove_element(watch);
        // lazy pruning: the orphan survives until the commit boundary
        assert!(session.model(&report_name).is_some());
        session.commit(&tracked, &mut store, |_| {}).unwrap();
        assert!(session.model(&report_name).is_none());
        assert!(session.saved().named.get(&report_name).is_none());
        assert!(session
            .model(&watchpoint_report_name(keeper))
            .is_some());
    }

    #[test]
    fn test_non_watch_removal_leaves_reports_alone() {
        let mut store = MemoryStore::new();
        let mut session = session();
        let watch = session.add_element(session.new_element("watch").unwrap());
        let lens_id = session.add_element(lens(&session));
        let tracked = session.tracked_names();
        let tracked: Vec<&str> = tracked.iter().map(String::as_str).collect();
        session.commit(&tracked, &mut store, |_| {}).unwrap();

        session.remove_element(lens_id);
        session.commit(&tracked, &mut store, |_| {}).unwrap();
        assert!(session.model(&watchpoint_report_name(watch)).is_some());
    }

    #[test]
    fn test_failed_save_leaves_session_dirty() {
        let mut store = MemoryStore::new();
        let mut session = session();
        session.add_element(lens(&session));
        store.fail_next_save = true;
        let err = session.commit(&[BEAMLINE_MODEL], &mut store, |_| {});
        assert!(err.is_err());
        assert!(session.is_dirty(&[BEAMLINE_MODEL]));
        // retry after the transient failure succeeds and cleans the session
        session
            .commit(&[BEAMLINE_MODEL], &mut store, |_| {})
            .unwrap();
        assert!(!session.is_dirty(&[BEAMLINE_MODEL]));
    }

    #[test]
    fn test_rollback_discards_whole_edit_set() {
        let mut session = session();
        session.add_element(lens(&session));
        let watch = session.add_element(session.new_element("watch").unwrap());
        let tracked = session.tracked_names();
        let tracked: Vec<&str> = tracked.iter().map(String::as_str).collect();
        session.rollback(&tracked);
        assert!(!session.is_dirty(&tracked));
        assert!(session.beamline().is_empty());
        assert!(session.model(&watchpoint_report_name(watch)).is_none());
    }

    #[test]
    fn test_selection_clears_before_set() {
        let mut session = session();
        let a = session.add_element(lens(&session));
        let b = session.add_element(lens(&session));
        session.set_active(Some(a));
        assert_eq!(session.active(), Some(a));
        session.set_active(Some(b));
        assert_eq!(session.active(), Some(b));
        session.set_active(None);
        assert_eq!(session.active(), None);
        assert_eq!(session.active_item_title(), "");
    }

    #[test]
    fn test_remove_active() {
        let mut session = session();
        let a = session.add_element(lens(&session));
        session.set_active(Some(a));
        let removed = session.remove_active().unwrap();
        assert_eq!(removed.id, Some(a));
        assert_eq!(session.active(), None);
        assert!(session.remove_active().is_none());
    }

    #[test]
    fn test_tracked_names_cover_both_copies() {
        let mut store = MemoryStore::new();
        let mut session = session();
        let committed = session.add_element(session.new_element("watch").unwrap());
        let tracked = session.tracked_names();
        let tracked: Vec<&str> = tracked.iter().map(String::as_str).collect();
        session.commit(&tracked, &mut store, |_| {}).unwrap();

        session.remove_element(committed);
        let fresh = session.add_element(session.new_element("watch").unwrap());
        let names = session.tracked_names();
        assert!(names.contains(&BEAMLINE_MODEL.to_string()));
        assert!(names.contains(&watchpoint_report_name(committed)));
        assert!(names.contains(&watchpoint_report_name(fresh)));
    }
}
