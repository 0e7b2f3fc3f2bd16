//! Value Mapper
//!
//! Walks a decoded [`StructValue`] against a struct declaration and produces
//! an [`OutputTree`] keyed by field name. Enum fields become labels, nested
//! struct fields are mapped recursively and everything else passes through.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{trace, warn};

use crate::error::{Result, ThriftyError};
use crate::registry::SchemaRegistry;
use crate::schema::{BaseType, FieldDef, FieldType, StructDef};
use crate::wire::{Scalar, StructValue, Value};

/// Default nesting limit for both mapping and wire reading
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Number of suggestions attached to an unknown struct error
const SUGGESTION_LIMIT: usize = 3;

/// What to emit for a pass-through field that is absent from the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Leave the key out
    #[default]
    Omit,
    /// Emit the key with a `null` value
    Null,
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPolicy::Omit => write!(f, "omit"),
            MissingPolicy::Null => write!(f, "null"),
        }
    }
}

impl FromStr for MissingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "omit" => Ok(MissingPolicy::Omit),
            "null" => Ok(MissingPolicy::Null),
            other => Err(format!("unknown missing-field policy '{}' (expected omit or null)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    pub max_depth: usize,
    pub missing: MissingPolicy,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            missing: MissingPolicy::default(),
        }
    }
}

// =============================================================================
// Output tree
// =============================================================================

/// A mapped field value
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    /// Pass-through wire value
    Wire(Value),
    /// Enum label
    Enum(String),
    Struct(OutputTree),
    Null,
}

/// Named fields in declaration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputTree {
    entries: Vec<(String, OutputValue)>,
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: OutputValue) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for OutputTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for OutputValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            OutputValue::Wire(value) => value.serialize(serializer),
            OutputValue::Enum(label) => serializer.serialize_str(label),
            OutputValue::Struct(tree) => tree.serialize(serializer),
            OutputValue::Null => serializer.serialize_unit(),
        }
    }
}

// =============================================================================
// Mapper
// =============================================================================

/// Maps decoded values onto the declarations of a [`SchemaRegistry`]
#[derive(Debug, Clone, Copy)]
pub struct ValueMapper<'r> {
    registry: &'r SchemaRegistry,
    options: MapOptions,
}

impl<'r> ValueMapper<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            options: MapOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Map `value` as an instance of struct `root`.
    ///
    /// `root` may be bare (`Account`) or qualified (`sh.batch.schema.Account`).
    pub fn map(&self, root: &str, value: &Value) -> Result<OutputTree> {
        let def = self.registry.resolve_struct(root).ok_or_else(|| self.unknown_struct(root))?;
        self.map_root(def, value)
    }

    /// Like [`map`](Self::map), but an unknown root yields an empty tree
    pub fn map_or_empty(&self, root: &str, value: &Value) -> Result<OutputTree> {
        match self.registry.resolve_struct(root) {
            Some(def) => self.map_root(def, value),
            None => {
                warn!(root, "struct not found in IDL, returning empty object");
                Ok(OutputTree::new())
            }
        }
    }

    fn map_root(&self, def: &StructDef, value: &Value) -> Result<OutputTree> {
        let fields = value.as_struct().ok_or_else(|| ThriftyError::FieldTypeMismatch {
            struct_name: def.name.clone(),
            field: "<root>".to_string(),
            expected: "struct",
            found: value.kind(),
        })?;

        let mut path = vec![def.name.clone()];
        let tree = self.map_struct(def, fields, &mut path)?;
        trace!(root = %def.name, fields = tree.len(), "mapped struct");
        Ok(tree)
    }

    fn map_struct(&self, def: &StructDef, value: &StructValue, path: &mut Vec<String>) -> Result<OutputTree> {
        let mut tree = OutputTree::new();
        for field in &def.fields {
            let wire = value.get(field.id);
            match self.registry.resolve_type(&field.field_type) {
                FieldType::Named(name) => {
                    let mapped = self.map_named(def, field, name, wire, path)?;
                    tree.push(field.name.clone(), mapped);
                }
                field_type => match (wire, self.options.missing) {
                    (Some(v), _) => {
                        tree.push(field.name.clone(), OutputValue::Wire(self.pass_through(field_type, v)))
                    }
                    (None, MissingPolicy::Null) => tree.push(field.name.clone(), OutputValue::Null),
                    (None, MissingPolicy::Omit) => {}
                },
            }
        }
        Ok(tree)
    }

    fn map_named(
        &self,
        def: &StructDef,
        field: &FieldDef,
        name: &str,
        wire: Option<&Value>,
        path: &mut Vec<String>,
    ) -> Result<OutputValue> {
        if let Some(enum_def) = self.registry.resolve_enum(name) {
            let ordinal = wire
                .and_then(Value::as_enum_ordinal)
                .ok_or_else(|| mismatch(def, field, "i32", wire))?;
            let label = enum_def.label(ordinal).ok_or_else(|| ThriftyError::UnknownEnumOrdinal {
                enum_name: enum_def.name.clone(),
                field: format!("{}.{}", def.name, field.name),
                ordinal,
            })?;
            return Ok(OutputValue::Enum(label.to_string()));
        }

        let nested_def = self
            .registry
            .resolve_struct(name)
            .ok_or_else(|| self.unknown_struct(name))?;
        let nested = wire
            .and_then(Value::as_struct)
            .ok_or_else(|| mismatch(def, field, "struct", wire))?;

        path.push(field.name.clone());
        // The root is not counted
        if path.len() - 1 > self.options.max_depth {
            return Err(ThriftyError::RecursionLimitExceeded {
                limit: self.options.max_depth,
                path: path.join("."),
            });
        }
        let tree = self.map_struct(nested_def, nested, path)?;
        path.pop();
        Ok(OutputValue::Struct(tree))
    }

    /// Copy a pass-through value, turning strings declared `binary` into bytes
    fn pass_through(&self, field_type: &FieldType, value: &Value) -> Value {
        match (self.registry.resolve_type(field_type), value) {
            (FieldType::Base(BaseType::Binary), Value::Scalar(Scalar::String(s))) => {
                Value::Scalar(Scalar::Binary(s.clone().into_bytes()))
            }
            (FieldType::List(inner) | FieldType::Set(inner), Value::List(items)) => {
                Value::List(items.iter().map(|item| self.pass_through(inner, item)).collect())
            }
            (FieldType::Map(key_type, value_type), Value::Map(entries)) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (self.pass_through(key_type, k), self.pass_through(value_type, v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    fn unknown_struct(&self, name: &str) -> ThriftyError {
        ThriftyError::UnknownStruct {
            name: name.to_string(),
            suggestions: self.registry.suggest(name, SUGGESTION_LIMIT),
        }
    }
}

fn mismatch(def: &StructDef, field: &FieldDef, expected: &'static str, wire: Option<&Value>) -> ThriftyError {
    ThriftyError::FieldTypeMismatch {
        struct_name: def.name.clone(),
        field: field.name.clone(),
        expected,
        found: wire.map(Value::kind).unwrap_or("nothing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Scalar;

    const SCHEMA: &str = r#"
        namespace go sh.batch.schema

        typedef ClientType Kind
        typedef Address Location

        enum ClientType {
            UNSET = 0,
            WEB = 1,
            MOBILE = 2
        }

        struct Address {
            1: string street
            2: string city
        }

        struct Account {
            1: i32 id
            2: string first_name
            3: string last_name
            4: string email
            5: ClientType client_type
            6: Address address
        }

        struct Aliased {
            1: Kind kind
            2: Location location
        }

        struct Node {
            1: i32 value
            2: Node next
        }

        struct Dangling {
            1: Missing missing
        }
    "#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::build(SCHEMA).unwrap()
    }

    fn string(s: &str) -> Value {
        Value::Scalar(Scalar::String(s.to_string()))
    }

    fn address() -> Value {
        StructValue::from_iter([(1, string("1 Infinite Loop")), (2, string("Cupertino"))]).into()
    }

    fn account() -> StructValue {
        StructValue::from_iter([
            (1, Value::Scalar(Scalar::I32(348590795))),
            (2, string("Gopher")),
            (3, string("Golang")),
            (4, string("gopher@golang.org")),
            (5, Value::Scalar(Scalar::I32(1))),
            (6, address()),
        ])
    }

    fn to_json(tree: &OutputTree) -> String {
        serde_json::to_string(tree).unwrap()
    }

    #[test]
    fn test_map_account() {
        let registry = registry();
        let tree = ValueMapper::new(&registry)
            .map("Account", &account().into())
            .unwrap();

        assert_eq!(
            tree.keys().collect::<Vec<_>>(),
            vec!["id", "first_name", "last_name", "email", "client_type", "address"]
        );
        assert_eq!(tree.get("client_type"), Some(&OutputValue::Enum("WEB".into())));
        assert_eq!(
            to_json(&tree),
            r#"{"id":348590795,"first_name":"Gopher","last_name":"Golang","email":"gopher@golang.org","client_type":"WEB","address":{"street":"1 Infinite Loop","city":"Cupertino"}}"#
        );
    }

    #[test]
    fn test_extra_wire_fields_ignored() {
        let registry = registry();
        let mut value = account();
        value.insert(99, string("unknown"));
        let tree = ValueMapper::new(&registry).map("Account", &value.into()).unwrap();
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_missing_policy() {
        let registry = registry();
        let value: Value = StructValue::from_iter([
            (1, Value::Scalar(Scalar::I32(1))),
            (5, Value::Scalar(Scalar::I32(0))),
            (6, address()),
        ])
        .into();

        let omitted = ValueMapper::new(&registry).map("Account", &value).unwrap();
        assert_eq!(
            omitted.keys().collect::<Vec<_>>(),
            vec!["id", "client_type", "address"]
        );

        let nulled = ValueMapper::new(&registry)
            .with_options(MapOptions {
                missing: MissingPolicy::Null,
                ..MapOptions::default()
            })
            .map("Account", &value)
            .unwrap();
        assert_eq!(nulled.len(), 6);
        assert_eq!(nulled.get("email"), Some(&OutputValue::Null));
        assert!(to_json(&nulled).contains(r#""email":null"#));
    }

    #[test]
    fn test_unknown_enum_ordinal() {
        let registry = registry();
        let mut value = account();
        value.insert(5, Value::Scalar(Scalar::I32(9)));

        match ValueMapper::new(&registry).map("Account", &value.into()).unwrap_err() {
            ThriftyError::UnknownEnumOrdinal { enum_name, field, ordinal } => {
                assert_eq!(enum_name, "ClientType");
                assert_eq!(field, "Account.client_type");
                assert_eq!(ordinal, 9);
            }
            other => panic!("Expected UnknownEnumOrdinal, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_shape_mismatch() {
        let registry = registry();
        let mut value = account();
        value.insert(5, string("WEB"));

        match ValueMapper::new(&registry).map("Account", &value.into()).unwrap_err() {
            ThriftyError::FieldTypeMismatch { field, expected, found, .. } => {
                assert_eq!(field, "client_type");
                assert_eq!(expected, "i32");
                assert_eq!(found, "string");
            }
            other => panic!("Expected FieldTypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_nested_struct() {
        let registry = registry();
        let mut value = account();
        value.fields.remove(&6);

        let err = ValueMapper::new(&registry).map("Account", &value.into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'Account.address' expected struct on the wire, found nothing"
        );
    }

    #[test]
    fn test_nested_struct_wrong_shape() {
        let registry = registry();
        let mut value = account();
        value.insert(6, Value::Scalar(Scalar::I32(5)));

        match ValueMapper::new(&registry).map("Account", &value.into()).unwrap_err() {
            ThriftyError::FieldTypeMismatch { struct_name, field, expected, found } => {
                assert_eq!(struct_name, "Account");
                assert_eq!(field, "address");
                assert_eq!(expected, "struct");
                assert_eq!(found, "i32");
            }
            other => panic!("Expected FieldTypeMismatch, got {:?}", other),
        }

        let mut value = account();
        value.insert(6, Value::List(vec![address()]));
        let err = ValueMapper::new(&registry).map("Account", &value.into()).unwrap_err();
        assert!(matches!(
            err,
            ThriftyError::FieldTypeMismatch { expected: "struct", found: "list", .. }
        ));
    }

    #[test]
    fn test_typedef_aliases_resolved() {
        let registry = registry();
        let value: Value = StructValue::from_iter([
            (1, Value::Scalar(Scalar::I32(2))),
            (2, address()),
        ])
        .into();

        let tree = ValueMapper::new(&registry).map("Aliased", &value).unwrap();
        assert_eq!(
            to_json(&tree),
            r#"{"kind":"MOBILE","location":{"street":"1 Infinite Loop","city":"Cupertino"}}"#
        );
    }

    #[test]
    fn test_unknown_root() {
        let registry = registry();
        let mapper = ValueMapper::new(&registry);
        let value: Value = account().into();

        match mapper.map("Acount", &value).unwrap_err() {
            ThriftyError::UnknownStruct { name, suggestions } => {
                assert_eq!(name, "Acount");
                assert_eq!(suggestions.first().map(String::as_str), Some("Account"));
            }
            other => panic!("Expected UnknownStruct, got {:?}", other),
        }

        assert!(mapper.map_or_empty("Acount", &value).unwrap().is_empty());
    }

    #[test]
    fn test_qualified_root() {
        let registry = registry();
        let tree = ValueMapper::new(&registry)
            .map("sh.batch.schema.Account", &account().into())
            .unwrap();
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_unknown_nested_struct_fails_in_lenient_mode() {
        let registry = registry();
        let value: Value =
            StructValue::from_iter([(1, StructValue::new().into())]).into();

        let err = ValueMapper::new(&registry)
            .map_or_empty("Dangling", &value)
            .unwrap_err();
        assert!(matches!(err, ThriftyError::UnknownStruct { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn test_binary_fields_encoded_as_base64() {
        let registry = SchemaRegistry::build(
            "typedef binary Blob\nstruct Avatar { 1: binary data 2: list<Blob> parts 3: string name }",
        )
        .unwrap();
        let value: Value = StructValue::from_iter([
            (1, string("\u{1}\u{2}\u{3}")),
            (2, Value::List(vec![string("hi")])),
            (3, string("\u{1}")),
        ])
        .into();

        let tree = ValueMapper::new(&registry).map("Avatar", &value).unwrap();
        assert_eq!(
            to_json(&tree),
            r#"{"data":"AQID","parts":["aGk="],"name":"\u0001"}"#
        );
    }

    #[test]
    fn test_root_must_be_struct() {
        let registry = registry();
        let err = ValueMapper::new(&registry)
            .map("Account", &string("nope"))
            .unwrap_err();
        assert!(matches!(err, ThriftyError::FieldTypeMismatch { found: "string", .. }));
    }

    #[test]
    fn test_recursion_limit() {
        let registry = registry();
        // Root plus three nested nodes; the innermost has no `next`
        let mut chain: Value = StructValue::from_iter([(1, Value::Scalar(Scalar::I32(0)))]).into();
        for depth in 1..=3 {
            chain = StructValue::from_iter([
                (1, Value::Scalar(Scalar::I32(depth))),
                (2, chain),
            ])
            .into();
        }
        let options = |max_depth| MapOptions {
            max_depth,
            ..MapOptions::default()
        };

        match ValueMapper::new(&registry)
            .with_options(options(2))
            .map("Node", &chain)
            .unwrap_err()
        {
            ThriftyError::RecursionLimitExceeded { limit, path } => {
                assert_eq!(limit, 2);
                assert_eq!(path, "Node.next.next.next");
            }
            other => panic!("Expected RecursionLimitExceeded, got {:?}", other),
        }

        let err = ValueMapper::new(&registry)
            .with_options(options(3))
            .map("Node", &chain)
            .unwrap_err();
        assert!(matches!(err, ThriftyError::FieldTypeMismatch { found: "nothing", .. }));
    }
}
