//! Entity codec
//!
//! Every entity is flattened into an ordered list of [`Value`]s, one per
//! [`Column`]. The relational backend binds those as typed columns; the
//! key/value backend writes them as hash fields, a plain string for
//! [`Layout::Scalar`] kinds, or one JSON object for [`Layout::Blob`] kinds,
//! always using [`Value::to_text`] / [`Value::parse`].

use crate::error::{Result, StorageError};
use crate::keys::Kind;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    /// Hash field name in the key/value backend
    pub field: &'static str,
    /// Column name in the relational backend
    pub column: &'static str,
    pub ty: ColumnType,
}

impl Column {
    pub const fn text(field: &'static str, column: &'static str) -> Self {
        Self {
            field,
            column,
            ty: ColumnType::Text,
        }
    }

    pub const fn int(field: &'static str, column: &'static str) -> Self {
        Self {
            field,
            column,
            ty: ColumnType::Int,
        }
    }

    pub const fn bool(field: &'static str, column: &'static str) -> Self {
        Self {
            field,
            column,
            ty: ColumnType::Bool,
        }
    }
}

/// How a kind is laid out in the key/value backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One hash per record, one field per column
    Hash,
    /// One string key holding the single column
    Scalar,
    /// One string key holding every field as a JSON object
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            Value::Int(number) => number.to_string(),
            Value::Bool(flag) => String::from(if *flag { "1" } else { "0" }),
        }
    }

    /// Parses the text form written by [`Value::to_text`]
    pub fn parse(ty: ColumnType, raw: &str) -> std::result::Result<Value, String> {
        match ty {
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
            ColumnType::Int => raw
                .parse()
                .map(Value::Int)
                .map_err(|_| format!("{raw:?} is not an integer")),
            ColumnType::Bool => match raw {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                _ => Err(format!("{raw:?} is not a boolean")),
            },
        }
    }
}

/// An entity the storage layer can persist
pub trait Record: Sized + Send + Sync + 'static {
    const KIND: Kind;
    const LAYOUT: Layout = Layout::Hash;
    const COLUMNS: &'static [Column];

    /// Values in `COLUMNS` order
    fn encode(&self) -> Vec<Value>;

    /// Rebuilds the record stored under `id` from values in `COLUMNS` order
    fn decode(id: &str, values: Vec<Value>) -> Result<Self>;

    /// Absolute unix time after which the backend may drop the record on its
    /// own. Only a hint: the garbage collector stays authoritative.
    fn expires_at(&self) -> Option<i64> {
        None
    }
}

/// Decodes a key/value hash into a record
pub fn from_hash<R: Record>(id: &str, mut hash: HashMap<String, String>) -> Result<R> {
    let mut values = Vec::with_capacity(R::COLUMNS.len());
    for column in R::COLUMNS {
        let raw = hash
            .remove(column.field)
            .ok_or_else(|| missing_field::<R>(id, column.field))?;
        let value = Value::parse(column.ty, &raw)
            .map_err(|reason| StorageError::decode(R::KIND.name(), id, reason))?;
        values.push(value);
    }
    R::decode(id, values)
}

/// Decodes a scalar key/value entry into a record
pub fn from_scalar<R: Record>(id: &str, raw: &str) -> Result<R> {
    let column = R::COLUMNS
        .first()
        .ok_or_else(|| StorageError::decode(R::KIND.name(), id, "kind has no columns"))?;
    let value = Value::parse(column.ty, raw)
        .map_err(|reason| StorageError::decode(R::KIND.name(), id, reason))?;
    R::decode(id, vec![value])
}

/// Field name to text form, as stored under a [`Layout::Blob`] key
pub fn to_blob<R: Record>(record: &R) -> String {
    let fields: BTreeMap<&str, String> = R::COLUMNS
        .iter()
        .zip(record.encode())
        .map(|(column, value)| (column.field, value.to_text()))
        .collect();
    // a map of strings always serializes
    serde_json::to_string(&fields).unwrap_or_default()
}

/// Decodes a [`Layout::Blob`] value into a record
pub fn from_blob<R: Record>(id: &str, raw: &str) -> Result<R> {
    let fields: HashMap<String, String> = serde_json::from_str(raw)
        .map_err(|err| StorageError::decode(R::KIND.name(), id, format!("invalid blob: {err}")))?;
    from_hash(id, fields)
}

fn missing_field<R: Record>(id: &str, field: &str) -> StorageError {
    StorageError::decode(R::KIND.name(), id, format!("missing field {field:?}"))
}

/// Takes decoded values back out in column order
pub(crate) struct Reader {
    kind: Kind,
    id: String,
    values: std::vec::IntoIter<Value>,
}

impl Reader {
    pub(crate) fn new(kind: Kind, id: &str, values: Vec<Value>) -> Self {
        Self {
            kind,
            id: id.to_string(),
            values: values.into_iter(),
        }
    }

    pub(crate) fn text(&mut self) -> Result<String> {
        match self.values.next() {
            Some(Value::Text(text)) => Ok(text),
            other => Err(self.mismatch("text", other)),
        }
    }

    pub(crate) fn int(&mut self) -> Result<i64> {
        match self.values.next() {
            Some(Value::Int(number)) => Ok(number),
            other => Err(self.mismatch("integer", other)),
        }
    }

    pub(crate) fn flag(&mut self) -> Result<bool> {
        match self.values.next() {
            Some(Value::Bool(flag)) => Ok(flag),
            other => Err(self.mismatch("boolean", other)),
        }
    }

    fn mismatch(&self, expected: &str, found: Option<Value>) -> StorageError {
        let reason = match found {
            Some(value) => format!("expected {expected}, found {value:?}"),
            None => format!("expected {expected}, found end of record"),
        };
        StorageError::decode(self.kind.name(), &self.id, reason)
    }
}
