//! Record schemas: the declared mapping from record fields to bindings
//!
//! A record type implements [`Record`] and lists its fields once. Each
//! field carries a binding tag (see [`crate::tag`]) and a typed setter, so
//! decoding never needs runtime reflection.
//!
//! ```
//! use excelbind::{Record, SchemaBuilder};
//!
//! #[derive(Debug, Default)]
//! struct Address {
//!     city: String,
//! }
//!
//! impl Record for Address {
//!     fn describe(schema: &mut SchemaBuilder<Self>) {
//!         schema.field("city", "City", |r: &mut Self, v| r.city = v);
//!     }
//! }
//!
//! #[derive(Debug, Default)]
//! struct Customer {
//!     id: u64,
//!     name: String,
//!     address: Address,
//!     notes: String,
//! }
//!
//! impl Record for Customer {
//!     fn describe(schema: &mut SchemaBuilder<Self>) {
//!         schema
//!             .field("id", "ID,required", |r: &mut Self, v| r.id = v)
//!             .field("name", "col=B", |r: &mut Self, v| r.name = v)
//!             .embed("address", |r: &mut Self| &mut r.address)
//!             .field("notes", "-", |r: &mut Self, v| r.notes = v);
//!     }
//! }
//! ```

use crate::coerce::{FieldKind, FieldValue};
use crate::error::{CoerceError, ExcelError, Result};
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A record shape that rows can be decoded into
///
/// Every row starts from `Self::default()`; unbound and empty optional
/// fields keep their default value.
pub trait Record: Default + Send + 'static {
    /// Declare the record's fields in order
    fn describe(schema: &mut SchemaBuilder<Self>);
}

type Setter<T> =
    Box<dyn Fn(&mut T, &str, Option<&str>) -> std::result::Result<(), CoerceError> + Send + Sync>;

/// Location of a field inside a (possibly nested) record
///
/// Embedded records contribute their own fields; the path keeps the full
/// chain of declaration indices so flattened fields never alias the
/// embedding field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    names: Vec<&'static str>,
    indices: Vec<usize>,
}

impl FieldPath {
    fn root(name: &'static str, index: usize) -> Self {
        FieldPath {
            names: vec![name],
            indices: vec![index],
        }
    }

    fn nested(mut self, parent: &'static str, parent_index: usize) -> Self {
        self.names.insert(0, parent);
        self.indices.insert(0, parent_index);
        self
    }

    /// Field names from the outermost record inwards
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Declaration indices from the outermost record inwards
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names.join("."))
    }
}

pub(crate) struct FieldDef<T> {
    pub(crate) path: FieldPath,
    pub(crate) tag: String,
    pub(crate) kind: FieldKind,
    pub(crate) setter: Setter<T>,
}

/// Collects field declarations for one record type
pub struct SchemaBuilder<T> {
    fields: Vec<FieldDef<T>>,
    declared: usize,
    problems: Vec<String>,
}

impl<T: 'static> SchemaBuilder<T> {
    fn new() -> Self {
        SchemaBuilder {
            fields: Vec::new(),
            declared: 0,
            problems: Vec::new(),
        }
    }

    /// Declare a field bound by `tag`, assigned through `set`
    ///
    /// A tag of `""` or `"-"` declares the field but leaves it unbound.
    pub fn field<V, F>(&mut self, name: &'static str, tag: &str, set: F) -> &mut Self
    where
        V: FieldValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let index = self.next_index();
        self.fields.push(FieldDef {
            path: FieldPath::root(name, index),
            tag: tag.to_string(),
            kind: V::kind(),
            setter: Box::new(move |record: &mut T, raw: &str, layout: Option<&str>| {
                set(record, V::coerce(raw, layout)?);
                Ok(())
            }),
        });
        self
    }

    /// Flatten the fields of an embedded record into this one
    ///
    /// The embedded fields are spliced in at this position, keeping their
    /// own order.
    pub fn embed<U, F>(&mut self, name: &'static str, access: F) -> &mut Self
    where
        U: Record,
        F: Fn(&mut T) -> &mut U + Send + Sync + 'static,
    {
        let index = self.next_index();
        let mut inner = SchemaBuilder::<U>::new();
        U::describe(&mut inner);

        for problem in inner.problems {
            self.problems.push(format!("{}.{}", name, problem));
        }
        if inner.declared == 0 {
            self.problems
                .push(format!("embedded record '{}' declares no fields", name));
        }

        let access = Arc::new(access);
        for def in inner.fields {
            let access = Arc::clone(&access);
            let setter = def.setter;
            self.fields.push(FieldDef {
                path: def.path.nested(name, index),
                tag: def.tag,
                kind: def.kind,
                setter: Box::new(move |record: &mut T, raw: &str, layout: Option<&str>| {
                    setter((*access)(record), raw, layout)
                }),
            });
        }
        self
    }

    fn next_index(&mut self) -> usize {
        let index = self.declared;
        self.declared += 1;
        index
    }

    fn finish(self) -> Result<Schema<T>> {
        let mut problems = self.problems;
        if self.declared == 0 {
            problems.push("record declares no fields".to_string());
        }

        let mut seen = HashSet::new();
        for def in &self.fields {
            let path = def.path.to_string();
            if !seen.insert(path.clone()) {
                problems.push(format!("field '{}' declared twice", path));
            }
        }

        if !problems.is_empty() {
            return Err(ExcelError::InvalidTarget(format!(
                "{}: {}",
                std::any::type_name::<T>(),
                problems.join("; ")
            )));
        }

        Ok(Schema {
            fields: self.fields,
        })
    }
}

/// Flattened field list of one record type
pub struct Schema<T> {
    fields: Vec<FieldDef<T>>,
}

impl<T: Record> Schema<T> {
    /// Build the schema by running `T::describe`
    pub fn build() -> Result<Self> {
        let mut builder = SchemaBuilder::new();
        T::describe(&mut builder);
        builder.finish()
    }
}

impl<T> Schema<T> {
    /// Number of flattened fields, bound or not
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flattened fields in declaration order: path, tag and kind
    pub fn fields(&self) -> impl Iterator<Item = (&FieldPath, &str, &FieldKind)> + '_ {
        self.fields
            .iter()
            .map(|def| (&def.path, def.tag.as_str(), &def.kind))
    }

    pub(crate) fn def(&self, index: usize) -> &FieldDef<T> {
        &self.fields[index]
    }

    pub(crate) fn defs(&self) -> &[FieldDef<T>] {
        &self.fields
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.fields
                    .iter()
                    .map(|def| format!("{} [{}] {:?}", def.path, def.kind, def.tag)),
            )
            .finish()
    }
}

/// Built schemas keyed by record type
///
/// Owned by a [`crate::Document`], so a schema is described once per open
/// document no matter how many sheets or sessions decode that type.
#[derive(Default)]
pub struct SchemaCache {
    schemas: IndexMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schema for `T`, built on first use
    pub fn get_or_build<T: Record>(&mut self) -> Result<Arc<Schema<T>>> {
        let key = TypeId::of::<T>();
        if let Some(entry) = self.schemas.get(&key) {
            if let Ok(schema) = Arc::clone(entry).downcast::<Schema<T>>() {
                return Ok(schema);
            }
        }

        let schema = Arc::new(Schema::<T>::build()?);
        let entry: Arc<dyn Any + Send + Sync> = schema.clone();
        self.schemas.insert(key, entry);
        Ok(schema)
    }

    /// Number of record types cached
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn clear(&mut self) {
        self.schemas.clear();
    }
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache")
            .field("types", &self.schemas.len())
            .finish()
    }
}
