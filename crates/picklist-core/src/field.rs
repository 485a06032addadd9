//! Typed view over the `fields` elements of a Custom Object.

use object_xml::{Element, ParseError};

/// Tag of the per-field elements directly under the root.
pub const FIELDS_TAG: &str = "fields";
/// `type` value selecting picklist fields.
pub const PICKLIST_TYPE: &str = "Picklist";
pub(crate) const VALUE_SET_TAG: &str = "valueSet";
pub(crate) const VALUE_SETTINGS_TAG: &str = "valueSettings";
const CONTROLLING_FIELD_TAG: &str = "controllingField";
const VALUE_NAME_TAG: &str = "valueName";
const CONTROLLING_FIELD_VALUE_TAG: &str = "controllingFieldValue";

/// A classified `fields` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Picklist whose `valueSet` names a controlling field.
    DependentPicklist(PicklistField),
    /// Anything else; carried through untouched.
    Opaque(OpaqueField),
}

impl Field {
    /// The field API name, when the element declares one.
    pub fn full_name(&self) -> Option<&str> {
        match self {
            Field::DependentPicklist(field) => field.full_name.as_deref(),
            Field::Opaque(field) => field.full_name.as_deref(),
        }
    }

    /// The dependent picklist payload, if this field is one.
    pub fn as_dependent_picklist(&self) -> Option<&PicklistField> {
        match self {
            Field::DependentPicklist(field) => Some(field),
            Field::Opaque(_) => None,
        }
    }
}

/// A field that is not subject to ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueField {
    pub full_name: Option<String>,
    /// Raw `type` discriminator, if present.
    pub field_type: Option<String>,
}

/// Dependent picklist metadata extracted from a `fields` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PicklistField {
    pub full_name: Option<String>,
    /// API name of the controlling field.
    pub controlling_field: String,
    /// Mappings in document order.
    pub value_settings: Vec<ValueSetting>,
}

impl PicklistField {
    /// Display name used in logs and reports.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("<unnamed>")
    }
}

/// One `valueSettings` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSetting {
    /// Sort key.
    pub value_name: String,
    /// Controlling values for which `value_name` is valid.
    pub controlling_field_values: Vec<String>,
}

/// Classify a `fields` element.
///
/// Only a `Picklist` with a `valueSet` carrying `controllingField` becomes a
/// [`Field::DependentPicklist`]; a missing `valueSet` or `controllingField`
/// is a selection rule, not an error. Entries of a dependent picklist must
/// each carry exactly one `valueName`, otherwise [`ParseError::Shape`] is
/// returned.
pub fn classify(element: &Element) -> Result<Field, ParseError> {
    let full_name = element.child_text("fullName");
    let field_type = element.child_text("type");

    let Some((value_set, controlling)) = dependent_value_set(element, field_type.as_deref())
    else {
        return Ok(Field::Opaque(OpaqueField {
            full_name,
            field_type,
        }));
    };

    let name = full_name.as_deref().unwrap_or("<unnamed>");
    let controlling_field = controlling
        .text()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            ParseError::Shape(format!("controllingField of field {name} is not a text value"))
        })?;
    let value_settings = value_set
        .children_named(VALUE_SETTINGS_TAG)
        .enumerate()
        .map(|(index, entry)| value_setting(entry, name, index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Field::DependentPicklist(PicklistField {
        full_name,
        controlling_field,
        value_settings,
    }))
}

fn dependent_value_set<'a>(
    element: &'a Element,
    field_type: Option<&str>,
) -> Option<(&'a Element, &'a Element)> {
    if field_type != Some(PICKLIST_TYPE) {
        return None;
    }
    let value_set = element.child(VALUE_SET_TAG)?;
    let controlling = value_set.child(CONTROLLING_FIELD_TAG)?;
    Some((value_set, controlling))
}

fn value_setting(entry: &Element, field: &str, index: usize) -> Result<ValueSetting, ParseError> {
    let mut names = entry.children_named(VALUE_NAME_TAG);
    let value_name = match (names.next(), names.next()) {
        (Some(name), None) => scalar(name, field, index)?,
        (None, _) => {
            return Err(ParseError::Shape(format!(
                "valueSettings #{index} of field {field} has no valueName"
            )))
        }
        (Some(_), Some(_)) => {
            return Err(ParseError::Shape(format!(
                "valueSettings #{index} of field {field} has more than one valueName"
            )))
        }
    };
    let controlling_field_values = entry
        .children_named(CONTROLLING_FIELD_VALUE_TAG)
        .map(|value| scalar(value, field, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ValueSetting {
        value_name,
        controlling_field_values,
    })
}

fn scalar(element: &Element, field: &str, index: usize) -> Result<String, ParseError> {
    element
        .text()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            ParseError::Shape(format!(
                "{} in valueSettings #{index} of field {field} is not a text value",
                element.name
            ))
        })
}
