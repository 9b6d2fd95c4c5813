//! Entity descriptors and dynamic records
//!
//! The engine never inspects types at runtime. Instead every entity type
//! carries an explicit descriptor: a static field list plus accessors that
//! move member values in and out of a [`Record`], the ordered field map the
//! dynamic core operates on. The [`impl_entity!`](crate::impl_entity) macro
//! writes the descriptor for plain structs.

use crate::error::Result;
use crate::types::{Row, Value};

/// Ordered field name to value mapping for one object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create an empty record with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Build a record from a result-set row, preserving column order
    pub fn from_row(row: &Row) -> Self {
        Self {
            fields: row
                .columns()
                .iter()
                .cloned()
                .zip(row.values().iter().cloned())
                .collect(),
        }
    }

    /// Number of fields
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    /// Replace a field value, appending if the field is not present
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }

    /// Get a field value by exact name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Per-type descriptor bridging a concrete struct and the dynamic [`Record`]
/// representation.
///
/// Built once per type at declaration time; the engine reuses it for
/// table-valued projection, output-group decomposition, and result
/// materialization without any per-call type inspection.
pub trait Entity: Default {
    /// Type name, used by the table-valued parameter naming template
    fn type_name() -> &'static str;

    /// Field names in declaration order
    fn field_names() -> &'static [&'static str];

    /// Decompose into a record, one field per public member
    fn to_record(&self) -> Record;

    /// Write one field, converting the value into the member type.
    ///
    /// A field name that matches no member is an error: result-set columns
    /// must line up with the entity's fields.
    fn apply(&mut self, field: &str, value: Value) -> Result<()>;

    /// Reconstruct an instance from a record
    fn from_record(record: &Record) -> Result<Self> {
        let mut item = Self::default();
        for (name, value) in record.iter() {
            item.apply(name, value.clone())?;
        }
        Ok(item)
    }
}

/// Collection of records tagged with their element type, the projection
/// source for table-valued parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySet {
    /// Element type name (drives the TVP naming template)
    pub element_type: String,
    /// Column set shared by every record, in field-declaration order
    pub columns: Vec<String>,
    /// The projected elements
    pub items: Vec<Record>,
}

impl EntitySet {
    /// Project a slice of entities into a set
    pub fn from_entities<E: Entity>(items: &[E]) -> Self {
        Self {
            element_type: E::type_name().to_owned(),
            columns: E::field_names().iter().map(|n| (*n).to_owned()).collect(),
            items: items.iter().map(Entity::to_record).collect(),
        }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert every record back into a typed entity
    pub fn into_entities<E: Entity>(self) -> Result<Vec<E>> {
        self.items.iter().map(E::from_record).collect()
    }
}

/// Implement [`Entity`] for a plain struct.
///
/// Every listed field type must implement `Into<Value>` (by clone) and
/// [`FromValue`](crate::types::FromValue).
///
/// ```
/// use sprocket::impl_entity;
///
/// #[derive(Debug, Default, Clone, PartialEq)]
/// struct User {
///     id: i32,
///     name: String,
/// }
///
/// impl_entity!(User { id: i32, name: String });
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ident { $($field:ident : $ftype:ty),+ $(,)? }) => {
        impl $crate::entity::Entity for $ty {
            fn type_name() -> &'static str {
                stringify!($ty)
            }

            fn field_names() -> &'static [&'static str] {
                &[$(stringify!($field)),+]
            }

            fn to_record(&self) -> $crate::entity::Record {
                let mut record = $crate::entity::Record::new();
                $(record.push(
                    stringify!($field),
                    $crate::types::Value::from(self.$field.clone()),
                );)+
                record
            }

            fn apply(
                &mut self,
                field: &str,
                value: $crate::types::Value,
            ) -> $crate::error::Result<()> {
                match field {
                    $(stringify!($field) => {
                        self.$field =
                            <$ftype as $crate::types::FromValue>::from_value(value)?;
                        Ok(())
                    })+
                    _ => Err($crate::error::Error::unknown_field(
                        <Self as $crate::entity::Entity>::type_name(),
                        field,
                    )),
                }
            }
        }
    };
}
