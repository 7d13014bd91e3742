//! Update path flattening
//!
//! Turns a partially populated record into the flat `dotted.path -> value`
//! map that becomes the payload of a `$set` update.
//!
//! Records are described by [`UpdateRecord`], a self-describing tree of
//! tagged fields. Each field is a scalar leaf, a nested record, or a sequence
//! of records. Any `serde::Serialize` struct can be turned into that tree with
//! [`UpdateRecord::from_serialize`]; the serialized field names act as tags.
//! Only structs and sequences of structs are descended into. A map field
//! (`HashMap`, `BTreeMap`, `bson::Document`) is a leaf and is set whole.
//!
//! Rules, applied to fields in declaration order:
//! - a present nested record is walked with prefix `<prefix>.<tag>`; an absent
//!   one contributes nothing
//! - every element of a present sequence is walked with prefix
//!   `<prefix>.<tag>.$`, so all elements share the same positional marker and
//!   later elements overwrite earlier ones on colliding paths
//! - a scalar is emitted under `<prefix>.<tag>` unless it holds its zero value
//!
//! The leading separator of each emitted path is stripped. Empty tags are kept
//! as empty segments, which can yield paths such as `".x"` or `"a."`.

use bson::{Bson, Document as BsonDocument};
use serde::Serialize;

use crate::shape::{shape_of, Shape};
use crate::{BasiliskError, Result};

/// Flattened `$set` payload: dotted path to non-zero leaf value.
pub type PathValueMap = BsonDocument;

const PATH_SEPARATOR: char = '.';
const POSITIONAL_MARKER: &str = "$";

/// Value held by a single field of an [`UpdateRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    /// Leaf value, skipped when zero
    Scalar(Bson),
    /// Nested record; `None` is an absent reference
    Record(Option<UpdateRecord>),
    /// Sequence of nested records; `None` is an absent reference
    Sequence(Option<Vec<UpdateRecord>>),
}

impl UpdateValue {
    /// Classifies a raw BSON value by its shape alone.
    fn from_bson(value: &Bson) -> Self {
        match value {
            Bson::Document(doc) => UpdateValue::Record(Some(UpdateRecord::from_document(doc))),
            Bson::Array(items) if items.iter().all(|item| matches!(item, Bson::Document(_))) => {
                let elements = items
                    .iter()
                    .filter_map(Bson::as_document)
                    .map(UpdateRecord::from_document)
                    .collect();
                UpdateValue::Sequence(Some(elements))
            }
            other => UpdateValue::Scalar(other.clone()),
        }
    }

    /// Classifies a serialized field using the outline of its Rust value.
    ///
    /// Special BSON types (ObjectId, DateTime, ...) serialize as structs but
    /// never convert to a document, so they stay scalars.
    fn from_shaped(value: &Bson, shape: &Shape) -> Self {
        match (value, shape) {
            (Bson::Document(doc), Shape::Record(_)) => {
                UpdateValue::Record(Some(UpdateRecord::from_shaped(doc, shape)))
            }
            (Bson::Array(items), Shape::Sequence(shapes))
                if items.len() == shapes.len()
                    && items
                        .iter()
                        .zip(shapes)
                        .all(|pair| matches!(pair, (Bson::Document(_), Shape::Record(_)))) =>
            {
                let elements = items
                    .iter()
                    .zip(shapes)
                    .filter_map(|(item, shape)| {
                        item.as_document()
                            .map(|doc| UpdateRecord::from_shaped(doc, shape))
                    })
                    .collect();
                UpdateValue::Sequence(Some(elements))
            }
            _ => UpdateValue::Scalar(value.clone()),
        }
    }
}

impl From<UpdateRecord> for UpdateValue {
    fn from(record: UpdateRecord) -> Self {
        UpdateValue::Record(Some(record))
    }
}

impl From<Vec<UpdateRecord>> for UpdateValue {
    fn from(records: Vec<UpdateRecord>) -> Self {
        UpdateValue::Sequence(Some(records))
    }
}

/// A tagged field inside an [`UpdateRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateField {
    tag: String,
    value: UpdateValue,
}

impl UpdateField {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> &UpdateValue {
        &self.value
    }
}

/// Record-shaped update document: an ordered list of tagged fields.
///
/// # Example
///
/// ```
/// use basilisk_mongodb::{flatten, UpdateRecord};
///
/// let update = UpdateRecord::new()
///     .scalar("user_id", "1")
///     .sequence("items", Some(vec![UpdateRecord::new().scalar("type", 2)]));
///
/// let paths = flatten(&update);
/// assert_eq!(paths.get_str("user_id").unwrap(), "1");
/// assert_eq!(paths.get_i32("items.$.type").unwrap(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRecord {
    fields: Vec<UpdateField>,
}

impl UpdateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field with an arbitrary value
    pub fn field(mut self, tag: impl Into<String>, value: impl Into<UpdateValue>) -> Self {
        self.fields.push(UpdateField {
            tag: tag.into(),
            value: value.into(),
        });
        self
    }

    /// Append a scalar leaf
    pub fn scalar(self, tag: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.field(tag, UpdateValue::Scalar(value.into()))
    }

    /// Append a nested record, `None` meaning an absent reference
    pub fn record(self, tag: impl Into<String>, record: Option<UpdateRecord>) -> Self {
        self.field(tag, UpdateValue::Record(record))
    }

    /// Append a sequence of records, `None` meaning an absent reference
    pub fn sequence(self, tag: impl Into<String>, elements: Option<Vec<UpdateRecord>>) -> Self {
        self.field(tag, UpdateValue::Sequence(elements))
    }

    pub fn fields(&self) -> impl Iterator<Item = &UpdateField> {
        self.fields.iter()
    }

    /// Build the update tree from a raw BSON document.
    ///
    /// A raw document carries no struct/map distinction, so every nested
    /// document becomes a record. Arrays whose elements are all documents
    /// (including empty arrays) become sequences. Everything else, null
    /// included, is a scalar leaf.
    pub fn from_document(doc: &BsonDocument) -> Self {
        let fields = doc
            .iter()
            .map(|(key, value)| UpdateField {
                tag: key.clone(),
                value: UpdateValue::from_bson(value),
            })
            .collect();
        Self { fields }
    }

    fn from_shaped(doc: &BsonDocument, shape: &Shape) -> Self {
        let fields = doc
            .iter()
            .map(|(key, value)| UpdateField {
                tag: key.clone(),
                value: match shape.field(key) {
                    Some(field_shape) => UpdateValue::from_shaped(value, field_shape),
                    None => UpdateValue::Scalar(value.clone()),
                },
            })
            .collect();
        Self { fields }
    }

    /// Build the update tree from any serializable record.
    ///
    /// Field tags are the serialized field names, so `#[serde(rename = "...")]`
    /// chooses the path segment and `#[serde(skip)]` hides a field. Struct
    /// fields are walked; map fields are kept whole. A top-level map is
    /// accepted and each of its entries is a leaf.
    ///
    /// # Errors
    /// Returns `Validation` if the value is null or does not serialize to a
    /// record, and `Serialization` if BSON serialization fails.
    pub fn from_serialize<T: Serialize + ?Sized>(document: &T) -> Result<Self> {
        match bson::to_bson(document)? {
            Bson::Document(doc) => Ok(Self::from_shaped(&doc, &shape_of(document)?)),
            Bson::Null => Err(BasiliskError::Validation(
                "Update document cannot be null".to_string(),
            )),
            other => Err(BasiliskError::Validation(format!(
                "Update document must be a record, got {:?}",
                other.element_type()
            ))),
        }
    }
}

/// Flatten an update record into its `$set` payload.
///
/// An all-zero record yields an empty map, which callers treat as a no-op
/// update. No cycle detection is performed; the tree is plain data.
pub fn flatten(record: &UpdateRecord) -> PathValueMap {
    let mut paths = PathValueMap::new();
    collect_paths(record, "", &mut paths);
    paths
}

/// Serialize `document` and flatten it into its `$set` payload.
///
/// # Errors
/// Same as [`UpdateRecord::from_serialize`].
pub fn flatten_document<T: Serialize + ?Sized>(document: &T) -> Result<PathValueMap> {
    Ok(flatten(&UpdateRecord::from_serialize(document)?))
}

fn collect_paths(record: &UpdateRecord, prefix: &str, paths: &mut PathValueMap) {
    for field in &record.fields {
        match &field.value {
            UpdateValue::Record(Some(child)) => {
                let child_prefix = format!("{prefix}{PATH_SEPARATOR}{}", field.tag);
                collect_paths(child, &child_prefix, paths);
            }
            UpdateValue::Sequence(Some(elements)) => {
                let child_prefix = format!(
                    "{prefix}{PATH_SEPARATOR}{}{PATH_SEPARATOR}{POSITIONAL_MARKER}",
                    field.tag
                );
                for element in elements {
                    collect_paths(element, &child_prefix, paths);
                }
            }
            UpdateValue::Record(None) | UpdateValue::Sequence(None) => {}
            UpdateValue::Scalar(value) => {
                if is_zero(value) {
                    continue;
                }
                let full_path = format!("{prefix}{PATH_SEPARATOR}{}", field.tag);
                paths.insert(strip_root(&full_path), value.clone());
            }
        }
    }
}

/// Drop everything up to and including the first separator.
fn strip_root(path: &str) -> &str {
    match path.find(PATH_SEPARATOR) {
        Some(index) => &path[index + PATH_SEPARATOR.len_utf8()..],
        None => path,
    }
}

/// Returns true if `value` is the zero value of its BSON type.
///
/// Doubles compare by bit pattern, so `-0.0` is not zero.
pub fn is_zero(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => true,
        Bson::String(s) => s.is_empty(),
        Bson::Boolean(b) => !b,
        Bson::Int32(i) => *i == 0,
        Bson::Int64(i) => *i == 0,
        Bson::Double(f) => f.to_bits() == 0,
        Bson::Array(items) => items.is_empty(),
        Bson::Document(doc) => doc.is_empty(),
        Bson::Binary(binary) => binary.bytes.is_empty(),
        Bson::ObjectId(oid) => oid.bytes() == [0u8; 12],
        Bson::DateTime(dt) => dt.timestamp_millis() == 0,
        Bson::Timestamp(ts) => ts.time == 0 && ts.increment == 0,
        Bson::Decimal128(d) => d.bytes() == [0u8; 16],
        _ => false,
    }
}
