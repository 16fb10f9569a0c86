//! Structural field-presence inspection.
//!
//! Inspectable records describe their own fields through [`Inspect`]: a name,
//! whether the field is part of the serialized document and whether it may be
//! omitted, plus a borrowed view of its value. One generic walker applies the
//! reporting policy to any such record.

use tracing::debug;

use crate::manifest::result::{ManifestResult, ValidationError};

/// A record whose fields can be walked by the inspector.
pub trait Inspect {
    fn fields(&self) -> Vec<Field<'_>>;
}

/// Static metadata for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// False for fields with no serialization metadata. They still count
    /// towards their parent's emptiness but are never reported.
    pub serialized: bool,
    pub required: bool,
}

impl FieldDescriptor {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            serialized: true,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            serialized: true,
            required: false,
        }
    }

    pub const fn internal(name: &'static str) -> Self {
        Self {
            name,
            serialized: false,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Record,
    Sequence,
    Map,
    String,
    Numeric,
    Reference,
    Timestamp,
}

impl FieldKind {
    /// Name used in presence messages.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Record | Self::Timestamp => "struct",
            _ => "field",
        }
    }
}

/// Borrowed view of a field value, reduced to what emptiness needs.
#[derive(Clone, Copy)]
pub enum FieldValue<'a> {
    Record(&'a dyn Inspect),
    Sequence(usize),
    Map(usize),
    String(&'a str),
    /// Raw JSON text; the literal `null` counts as empty.
    RawJson(&'a str),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    /// Optional reference: `true` when a value is held.
    Reference(bool),
    /// Opaque time record, never walked: `true` when set.
    Timestamp(bool),
}

impl FieldValue<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Record(_) => FieldKind::Record,
            Self::Sequence(_) => FieldKind::Sequence,
            Self::Map(_) => FieldKind::Map,
            Self::String(_) | Self::RawJson(_) => FieldKind::String,
            Self::Integer(_) | Self::Unsigned(_) | Self::Float(_) => FieldKind::Numeric,
            Self::Reference(_) => FieldKind::Reference,
            Self::Timestamp(_) => FieldKind::Timestamp,
        }
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(value: &'a String) -> Self {
        Self::String(value)
    }
}

impl<'a, T> From<&'a Vec<T>> for FieldValue<'a> {
    fn from(value: &'a Vec<T>) -> Self {
        Self::Sequence(value.len())
    }
}

impl<'a, K, V> From<&'a std::collections::BTreeMap<K, V>> for FieldValue<'a> {
    fn from(value: &'a std::collections::BTreeMap<K, V>) -> Self {
        Self::Map(value.len())
    }
}

impl<'a, T> From<&'a Option<T>> for FieldValue<'a> {
    fn from(value: &'a Option<T>) -> Self {
        Self::Reference(value.is_some())
    }
}

impl From<&i32> for FieldValue<'_> {
    fn from(value: &i32) -> Self {
        Self::Integer(i64::from(*value))
    }
}

impl From<&i64> for FieldValue<'_> {
    fn from(value: &i64) -> Self {
        Self::Integer(*value)
    }
}

impl From<&u64> for FieldValue<'_> {
    fn from(value: &u64) -> Self {
        Self::Unsigned(*value)
    }
}

impl From<&f64> for FieldValue<'_> {
    fn from(value: &f64) -> Self {
        Self::Float(*value)
    }
}

/// A descriptor paired with the current value of the field.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    pub descriptor: FieldDescriptor,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    pub fn required(name: &'static str, value: impl Into<FieldValue<'a>>) -> Self {
        Self {
            descriptor: FieldDescriptor::required(name),
            value: value.into(),
        }
    }

    pub fn optional(name: &'static str, value: impl Into<FieldValue<'a>>) -> Self {
        Self {
            descriptor: FieldDescriptor::optional(name),
            value: value.into(),
        }
    }

    pub fn internal(name: &'static str, value: impl Into<FieldValue<'a>>) -> Self {
        Self {
            descriptor: FieldDescriptor::internal(name),
            value: value.into(),
        }
    }
}

/// Recursive emptiness.
///
/// Numeric zero is indistinguishable from an unset number: a port explicitly
/// set to `0` is reported as missing.
pub fn is_empty(value: &FieldValue<'_>) -> bool {
    match *value {
        FieldValue::Sequence(len) | FieldValue::Map(len) => len == 0,
        FieldValue::String(text) => text.is_empty(),
        FieldValue::RawJson(raw) => raw.is_empty() || raw == "null",
        FieldValue::Integer(number) => number == 0,
        FieldValue::Unsigned(number) => number == 0,
        FieldValue::Float(number) => number == 0.0,
        FieldValue::Reference(present) | FieldValue::Timestamp(present) => !present,
        FieldValue::Record(record) => record.fields().iter().all(|field| is_empty(&field.value)),
    }
}

/// Inspects a document root, which must be a record.
pub fn inspect_value(root: FieldValue<'_>) -> ManifestResult {
    match root {
        FieldValue::Record(record) => inspect(record),
        other => ManifestResult::single(ValidationError::invalid_document(format!(
            "document root is a {:?}, not a record",
            other.kind()
        ))),
    }
}

pub fn inspect(root: &dyn Inspect) -> ManifestResult {
    let mut result = ManifestResult::default();
    inspect_into(root, &mut result);
    result
}

/// Appends the findings for `root` to an existing result.
pub fn inspect_into(root: &dyn Inspect, result: &mut ManifestResult) {
    let (errors, warnings) = (result.errors.len(), result.warnings.len());
    walk(root, "", result);
    debug!(
        errors = result.errors.len() - errors,
        warnings = result.warnings.len() - warnings,
        "inspected field presence"
    );
}

fn walk(record: &dyn Inspect, parent: &str, result: &mut ManifestResult) {
    for field in record.fields() {
        let descriptor = field.descriptor;
        if !descriptor.serialized {
            continue;
        }

        let path = if parent.is_empty() {
            descriptor.name.to_string()
        } else {
            format!("{parent}.{}", descriptor.name)
        };
        let empty = is_empty(&field.value);
        report(result, field.value.kind().type_name(), &path, empty, descriptor.required);

        if let FieldValue::Record(nested) = field.value {
            if !empty {
                walk(nested, &path, result);
            }
        }
    }
}

fn report(result: &mut ManifestResult, type_name: &str, path: &str, empty: bool, required: bool) {
    if !empty {
        return;
    }
    if !required {
        result.push(ValidationError::optional_field_missing(path, type_name));
    } else if path != "Status" {
        result.push(ValidationError::mandatory_field_missing(path, type_name));
    }
}
