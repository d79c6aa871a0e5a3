use std::collections::BTreeMap;

use bss_repr::{ParseError, ScalarType, ScalarValue};
use serde_json::Value;
use thiserror::Error;

/// One column of a table's primary key, in catalog-declared order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub scalar_type: ScalarType,
}

impl KeyColumn {
    pub fn new(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar_type,
        }
    }
}

/// One field of a table's row shape, as carried in `Payload` JSON.
///
/// Distinct from [`KeyColumn`]: a key column names a `RecordId` segment,
/// while a row field names a JSON object key, and the two need not agree
/// — `customer_uid` keys `RecordId`, but the payload itself may carry
/// that same column as `customerUid`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowField {
    pub name: String,
    pub scalar_type: ScalarType,
}

impl RowField {
    pub fn new(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar_type,
        }
    }
}

/// A registered table: its name, the ordered columns of its primary key,
/// and the row fields a `Payload` for it may carry (§4.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub table_name: String,
    pub key_columns: Vec<KeyColumn>,
    pub fields: Vec<RowField>,
}

impl EntitySchema {
    pub fn new(table_name: impl Into<String>, key_columns: Vec<KeyColumn>) -> Self {
        Self {
            table_name: table_name.into(),
            key_columns,
            fields: Vec::new(),
        }
    }

    /// Declares the table's row shape: every field a payload for this
    /// table may carry, and the scalar type it must match.
    pub fn with_fields(mut self, fields: Vec<RowField>) -> Self {
        self.fields = fields;
        self
    }

    fn field_type(&self, name: &str) -> Option<ScalarType> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.scalar_type)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("table {0:?} is not registered in the entity catalog")]
    UnknownTable(String),
    #[error("key parse failed for table {table:?}: {source}")]
    Key {
        table: String,
        #[source]
        source: ParseError,
    },
    #[error("row payload for table {table:?} is not a JSON object")]
    RowNotAnObject { table: String },
    #[error("field {field:?} is not declared in the row schema for table {table:?}")]
    UnknownField { table: String, field: String },
    #[error("field {field:?} on table {table:?} does not match its declared type {scalar_type:?}")]
    FieldTypeMismatch {
        table: String,
        field: String,
        scalar_type: ScalarType,
    },
}

/// Table-name -> schema registry. Lookups are case-insensitive (§4.1).
#[derive(Clone, Debug, Default)]
pub struct EntityCatalog {
    schemas: BTreeMap<String, EntitySchema>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: EntitySchema) -> &mut Self {
        self.schemas
            .insert(schema.table_name.to_ascii_lowercase(), schema);
        self
    }

    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, table_name: &str) -> Option<&EntitySchema> {
        self.schemas.get(&table_name.to_ascii_lowercase())
    }

    pub fn tables(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.values()
    }

    /// Splits `record_id` by comma and converts each segment to the
    /// declared scalar type, validating arity first.
    pub fn parse_key(
        &self,
        schema: &EntitySchema,
        record_id: &str,
    ) -> Result<Vec<ScalarValue>, CatalogError> {
        let segments: Vec<&str> = record_id.split(',').collect();
        if segments.len() != schema.key_columns.len() {
            return Err(CatalogError::Key {
                table: schema.table_name.clone(),
                source: ParseError::ArityMismatch {
                    expected: schema.key_columns.len(),
                    found: segments.len(),
                },
            });
        }
        segments
            .iter()
            .zip(schema.key_columns.iter())
            .enumerate()
            .map(|(i, (raw, col))| {
                bss_repr::parse_segment(col.scalar_type, i, raw).map_err(|source| {
                    CatalogError::Key {
                        table: schema.table_name.clone(),
                        source,
                    }
                })
            })
            .collect()
    }

    /// Joins already-parsed key segments back into the comma-separated
    /// `RecordId` form (the inverse of [`Self::parse_key`]).
    pub fn format_key(values: &[ScalarValue]) -> String {
        values
            .iter()
            .map(ScalarValue::to_record_segment)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Validates an incoming change's payload against `schema`'s declared
    /// row fields before the applier merges it into storage (§4.1, §3:
    /// "if Payload is present it must deserialize against the catalog
    /// schema for TableName").
    pub fn deserialize(&self, schema: &EntitySchema, payload: &Value) -> Result<Value, CatalogError> {
        self.validate_row(schema, payload)?;
        Ok(payload.clone())
    }

    /// The inverse direction: validates a row read back from storage
    /// against the same schema before it is handed out as a download
    /// payload.
    pub fn serialize(&self, schema: &EntitySchema, row: &Value) -> Result<Value, CatalogError> {
        self.validate_row(schema, row)?;
        Ok(row.clone())
    }

    fn validate_row(&self, schema: &EntitySchema, value: &Value) -> Result<(), CatalogError> {
        let Value::Object(map) = value else {
            return Err(CatalogError::RowNotAnObject {
                table: schema.table_name.clone(),
            });
        };
        for (field, field_value) in map {
            let Some(scalar_type) = schema.field_type(field) else {
                return Err(CatalogError::UnknownField {
                    table: schema.table_name.clone(),
                    field: field.clone(),
                });
            };
            if !bss_repr::value_matches(scalar_type, field_value) {
                return Err(CatalogError::FieldTypeMismatch {
                    table: schema.table_name.clone(),
                    field: field.clone(),
                    scalar_type,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customers_schema() -> EntitySchema {
        EntitySchema::new("customers", vec![KeyColumn::new("customer_uid", ScalarType::Uuid)])
            .with_fields(vec![
                RowField::new("name", ScalarType::String),
                RowField::new("age", ScalarType::Integer),
            ])
    }

    fn fn_catalog() -> EntityCatalog {
        EntityCatalog::new().with(customers_schema())
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let catalog = fn_catalog();
        assert!(catalog.resolve("Customers").is_some());
        assert!(catalog.resolve("CUSTOMERS").is_some());
        assert!(catalog.resolve("orders").is_none());
    }

    #[test]
    fn parse_key_rejects_wrong_arity() {
        let catalog = fn_catalog();
        let schema = catalog.resolve("customers").unwrap();
        let err = catalog.parse_key(schema, "a,b").unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Key {
                source: ParseError::ArityMismatch { expected: 1, found: 2 },
                ..
            }
        ));
    }

    #[test]
    fn composite_keys_round_trip_through_format_key() {
        let schema = EntitySchema::new(
            "order_items",
            vec![
                KeyColumn::new("order_uid", ScalarType::String),
                KeyColumn::new("line_no", ScalarType::Integer),
            ],
        );
        let catalog = EntityCatalog::new().with(schema.clone());
        let values = catalog.parse_key(&schema, "O_1,3").unwrap();
        assert_eq!(values, vec![
            ScalarValue::String("O_1".into()),
            ScalarValue::Integer(3),
        ]);
        assert_eq!(EntityCatalog::format_key(&values), "O_1,3");
    }

    #[test]
    fn deserialize_accepts_a_payload_matching_the_declared_fields() {
        let catalog = fn_catalog();
        let schema = catalog.resolve("customers").unwrap();
        let payload = json!({"name": "Ada", "age": 30});
        assert_eq!(catalog.deserialize(schema, &payload).unwrap(), payload);
    }

    #[test]
    fn deserialize_rejects_a_field_not_declared_on_the_table() {
        let catalog = fn_catalog();
        let schema = catalog.resolve("customers").unwrap();
        let payload = json!({"name": "Ada", "ssn": "000-00-0000"});
        assert!(matches!(
            catalog.deserialize(schema, &payload).unwrap_err(),
            CatalogError::UnknownField { field, .. } if field == "ssn"
        ));
    }

    #[test]
    fn deserialize_rejects_a_field_whose_value_does_not_match_its_scalar_type() {
        let catalog = fn_catalog();
        let schema = catalog.resolve("customers").unwrap();
        let payload = json!({"age": "thirty"});
        assert!(matches!(
            catalog.deserialize(schema, &payload).unwrap_err(),
            CatalogError::FieldTypeMismatch { field, .. } if field == "age"
        ));
    }

    #[test]
    fn deserialize_rejects_a_non_object_payload() {
        let catalog = fn_catalog();
        let schema = catalog.resolve("customers").unwrap();
        assert!(matches!(
            catalog.deserialize(schema, &json!("not-an-object")).unwrap_err(),
            CatalogError::RowNotAnObject { .. }
        ));
    }

    #[test]
    fn serialize_round_trips_a_valid_row() {
        let catalog = fn_catalog();
        let schema = catalog.resolve("customers").unwrap();
        let row = json!({"name": "Ada"});
        assert_eq!(catalog.serialize(schema, &row).unwrap(), row);
    }
}
