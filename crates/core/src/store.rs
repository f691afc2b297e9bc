//! Authoritative in-memory collection of editable elements
//!
//! Elements are kept in insertion order, so creation order doubles as the
//! serializer's stable drawing order. Mutations on unknown ids are tolerated
//! as logged no-ops; racing UI events after a delete must not error.

use crate::element::{ElementId, ElementPatch, TextElement};

/// Whole-state snapshot of the store, the unit the history manager stacks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreSnapshot {
    elements: Vec<TextElement>,
}

/// Element collection plus the single-selection state.
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: Vec<TextElement>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, mark it selected, and deselect any previous selection.
    pub fn add(&mut self, mut element: TextElement) -> ElementId {
        let id = element.id;
        element.selected = true;
        for existing in &mut self.elements {
            existing.selected = false;
        }
        self.elements.push(element);
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&TextElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Apply a partial update. Returns false (logged) if the id is unknown.
    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(element) => {
                patch.apply(element);
                true
            }
            None => {
                log::debug!("update ignored: no element {id:?}");
                false
            }
        }
    }

    /// Remove an element. Returns false (logged) if the id is unknown.
    pub fn delete(&mut self, id: ElementId) -> bool {
        match self.elements.iter().position(|e| e.id == id) {
            Some(index) => {
                self.elements.remove(index);
                true
            }
            None => {
                log::debug!("delete ignored: no element {id:?}");
                false
            }
        }
    }

    /// Select one element (deselecting all others) or clear the selection.
    pub fn select(&mut self, id: Option<ElementId>) {
        for element in &mut self.elements {
            element.selected = Some(element.id) == id;
        }
    }

    /// Reposition an element's center; called continuously during a drag, so
    /// it never commits history by itself.
    pub fn move_to(&mut self, id: ElementId, x: f32, y: f32) -> bool {
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(element) => {
                element.move_to(x, y);
                true
            }
            None => {
                log::debug!("move ignored: no element {id:?}");
                false
            }
        }
    }

    pub fn selected_id(&self) -> Option<ElementId> {
        self.elements.iter().find(|e| e.selected).map(|e| e.id)
    }

    /// All elements, in creation order.
    pub fn elements(&self) -> &[TextElement] {
        &self.elements
    }

    /// Elements on one page, in creation order.
    pub fn page_elements(&self, page_number: u32) -> Vec<&TextElement> {
        self.elements.iter().filter(|e| e.page_number == page_number).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot { elements: self.elements.clone() }
    }

    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.elements = snapshot.elements;
    }
}
