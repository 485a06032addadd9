//! Entry points for hosts that keep Custom Object metadata files in canonical
//! dependent picklist order.
//!
//! A host (editor integration, CLI, pre-commit hook) decides when to call
//! [`check_sorted`] and, if the user agrees, replaces the file content with
//! the output of [`produce_sorted_text`].

pub use object_xml::{
    parse_document, serialize_document, Document, Element, Node, ParseError, METADATA_NAMESPACE,
    ROOT_ELEMENT, XML_DECLARATION,
};
pub use picklist_core::{
    classify, compare_value_name, is_sorted, CustomObject, Field, OpaqueField, PicklistField,
    ValueSetting,
};

use tracing::debug;

/// Return `true` when every dependent picklist in `text` already lists its
/// `valueSettings` in canonical order.
pub fn check_sorted(text: &str) -> Result<bool, ParseError> {
    let object = CustomObject::parse(text)?;
    let sorted = object.is_canonical();
    debug!(sorted, "checked custom object");
    Ok(sorted)
}

/// Re-serialize `text` with every dependent picklist's `valueSettings` sorted.
///
/// Content that is not a dependent picklist mapping is carried over; only the
/// layout is normalised.
pub fn produce_sorted_text(text: &str) -> Result<String, ParseError> {
    let mut object = CustomObject::parse(text)?;
    Ok(object.sort_in_place().to_xml_string())
}
