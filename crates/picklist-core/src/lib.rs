//! Dependent picklist order checking and canonical sorting for Custom Objects.

mod field;

use std::cmp::Ordering;

use object_xml::{parse_document, serialize_document, Document, Node, ParseError};
use tracing::debug;

pub use field::{
    classify, Field, OpaqueField, PicklistField, ValueSetting, FIELDS_TAG, PICKLIST_TYPE,
};
use field::{VALUE_SETTINGS_TAG, VALUE_SET_TAG};

/// Order two entries by `valueName` using ordinal (code point) comparison.
///
/// Controlling values are never consulted; entries with equal names compare
/// equal.
pub fn compare_value_name(a: &ValueSetting, b: &ValueSetting) -> Ordering {
    a.value_name.cmp(&b.value_name)
}

/// True when `settings` is in non-decreasing `valueName` order.
pub fn is_sorted(settings: &[ValueSetting]) -> bool {
    settings
        .windows(2)
        .all(|pair| compare_value_name(&pair[0], &pair[1]) != Ordering::Greater)
}

#[derive(Debug, Clone)]
struct Slot {
    /// Index of the `fields` element in the root's child list.
    position: usize,
    field: Field,
}

/// A validated Custom Object document.
///
/// Construction classifies every `fields` element up front so malformed
/// dependent picklists are rejected before any check or rewrite runs.
#[derive(Debug, Clone)]
pub struct CustomObject {
    document: Document,
    slots: Vec<Slot>,
}

impl CustomObject {
    /// Classify the fields of an already parsed document.
    pub fn from_document(document: Document) -> Result<Self, ParseError> {
        let mut slots = Vec::new();
        for (position, node) in document.root.children.iter().enumerate() {
            let Node::Element(element) = node else {
                continue;
            };
            if element.name != FIELDS_TAG {
                continue;
            }
            slots.push(Slot {
                position,
                field: classify(element)?,
            });
        }
        debug!(
            fields = slots.len(),
            dependent = slots
                .iter()
                .filter(|slot| slot.field.as_dependent_picklist().is_some())
                .count(),
            "classified custom object fields"
        );
        Ok(Self { document, slots })
    }

    /// Parse and classify XML text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::from_document(parse_document(text)?)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Classified fields in document order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.slots.iter().map(|slot| &slot.field)
    }

    /// Dependent picklists in document order.
    pub fn dependent_picklists(&self) -> impl Iterator<Item = &PicklistField> {
        self.fields().filter_map(Field::as_dependent_picklist)
    }

    /// True when every dependent picklist has its `valueSettings` in
    /// canonical order. Stops at the first unsorted field.
    pub fn is_canonical(&self) -> bool {
        self.dependent_picklists().all(|field| {
            let sorted = is_sorted(&field.value_settings);
            if !sorted {
                debug!(field = field.display_name(), "valueSettings out of order");
            }
            sorted
        })
    }

    /// All dependent picklists whose `valueSettings` are out of order.
    pub fn unsorted_fields(&self) -> impl Iterator<Item = &PicklistField> {
        self.dependent_picklists()
            .filter(|field| !is_sorted(&field.value_settings))
    }

    /// Stable-sort the `valueSettings` of every dependent picklist.
    ///
    /// Entries are permuted among the positions they already occupy inside
    /// their `valueSet`; every other node keeps its place. Idempotent.
    pub fn sort_in_place(&mut self) -> &mut Self {
        let CustomObject { document, slots } = self;
        for slot in slots.iter_mut() {
            let Field::DependentPicklist(field) = &mut slot.field else {
                continue;
            };
            if is_sorted(&field.value_settings) {
                continue;
            }
            let Some(value_set) = document.root.children[slot.position]
                .as_element_mut()
                .and_then(|element| element.child_mut(VALUE_SET_TAG))
            else {
                continue;
            };

            let positions: Vec<usize> = value_set
                .children
                .iter()
                .enumerate()
                .filter(|(_, node)| {
                    matches!(node, Node::Element(element) if element.name == VALUE_SETTINGS_TAG)
                })
                .map(|(index, _)| index)
                .collect();
            if positions.len() != field.value_settings.len() {
                continue;
            }

            let mut entries: Vec<(ValueSetting, Node)> = field
                .value_settings
                .drain(..)
                .zip(positions.iter().map(|&index| {
                    std::mem::replace(&mut value_set.children[index], Node::Text(String::new()))
                }))
                .collect();
            entries.sort_by(|a, b| compare_value_name(&a.0, &b.0));
            debug!(
                field = field.display_name(),
                entries = entries.len(),
                "sorted valueSettings"
            );

            for (index, (setting, node)) in positions.into_iter().zip(entries) {
                value_set.children[index] = node;
                field.value_settings.push(setting);
            }
        }
        self
    }

    /// Render the document with [`serialize_document`].
    pub fn to_xml_string(&self) -> String {
        serialize_document(&self.document)
    }
}
