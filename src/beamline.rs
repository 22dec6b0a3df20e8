use crate::{
    element::{Element, ElementId, ELLIPSOID_MIRROR_TYPE},
    position,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The ordered working sequence of beamline elements. This is the single
/// source of layout truth for a session and is mutated in place; array order
/// and position values are independent facts that [`Beamline::sort_by_position`]
/// reconciles at the commit boundary.
///
/// Out-of-range indices and unknown ids are caller bugs and panic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Beamline {
    elements: Vec<Element>,
}

impl Beamline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn get(&self, index: usize) -> &Element {
        &self.elements[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Element {
        &mut self.elements[index]
    }

    pub fn by_id(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == Some(id))
    }

    pub fn by_id_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == Some(id))
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == Some(id))
    }

    pub fn max_id(&self) -> u64 {
        self.elements
            .iter()
            .filter_map(|e| e.id)
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
    }

    pub fn watch_items(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.is_watch())
    }

    /// Append a fresh drop at the end of the sequence. Assigns the next id,
    /// the append position, and type-specific defaults. The template must not
    /// carry an id yet.
    pub fn add(&mut self, template: Element, source_distance: Option<f64>) -> ElementId {
        assert!(
            template.id.is_none(),
            "add() requires a fresh template, got id {:?}",
            template.id
        );
        let id = ElementId(self.max_id() + 1);
        let mut item = template;
        item.id = Some(id);
        item.position = position::append_position(&self.elements, source_distance);
        if item.element_type == ELLIPSOID_MIRROR_TYPE {
            item.set_field("firstFocusLength", Value::from(item.position));
        }
        self.elements.push(item);
        id
    }

    /// Fresh drop into the gap at `index`: append, then relocate and derive
    /// the position from the new neighbors.
    pub fn insert_at(
        &mut self,
        index: usize,
        template: Element,
        source_distance: Option<f64>,
    ) -> ElementId {
        assert!(
            index <= self.elements.len(),
            "insert index {index} out of range for length {}",
            self.elements.len()
        );
        let id = self.add(template, source_distance);
        let last = self.elements.len() - 1;
        if index < last {
            let item = self.elements.remove(last);
            self.elements.insert(index, item);
        }
        self.reposition(index.min(last));
        id
    }

    /// Reorder an existing element to `index`. The target index is given in
    /// pre-removal coordinates and is adjusted when the source slot precedes
    /// it. Singleton sequences skip the position recompute.
    pub fn move_to(&mut self, index: usize, id: ElementId) {
        assert!(
            index <= self.elements.len(),
            "move index {index} out of range for length {}",
            self.elements.len()
        );
        let curr = match self.index_of(id) {
            Some(i) => i,
            None => panic!("move_to() on unknown element id {id}"),
        };
        let mut index = index;
        if curr < index {
            index -= 1;
        }
        let item = self.elements.remove(curr);
        self.elements.insert(index, item);
        self.reposition(index);
    }

    /// Delete the element at `index`. Neighboring positions are left alone,
    /// and any derived report model survives until the next commit.
    pub fn remove_at(&mut self, index: usize) -> Element {
        self.elements.remove(index)
    }

    pub fn remove(&mut self, id: ElementId) -> Element {
        let index = match self.index_of(id) {
            Some(i) => i,
            None => panic!("remove() on unknown element id {id}"),
        };
        self.remove_at(index)
    }

    /// Stable ascending sort by position; equal positions keep their array
    /// order. Runs once per commit, never during interactive editing.
    pub fn sort_by_position(&mut self) {
        self.elements
            .sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    fn reposition(&mut self, index: usize) {
        if self.elements.len() > 1 {
            self.elements[index].position = position::placed_position(&self.elements, index);
        }
    }
}
