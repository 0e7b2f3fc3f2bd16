//! Schema Registry
//!
//! Builds an immutable structural model from one or more IDL documents.
//! Documents are merged in ascending id order; when two documents declare
//! the same name the later one wins and a warning is logged. Includes are
//! recorded but never followed: callers supply every document needed to
//! resolve the names they reference.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;
use serde::Serialize;
use tracing::{debug, warn};

use crate::checksum::Fingerprint;
use crate::error::Result;
use crate::idl::{self, Definition, Document};
use crate::names::{include_prefix, split_qualified_name};
use crate::schema::{EnumDef, FieldType, StructDef, TypedefDef};

/// Document id used by [`SchemaRegistry::build`]
pub const DEFAULT_DOCUMENT_ID: &str = "schema.thrift";

/// A `namespace <scope> <name>` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    pub scope: String,
    pub name: String,
}

/// Headers of one merged document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DocumentInfo {
    /// Namespace declarations in declaration order
    pub namespaces: Vec<Namespace>,
    /// Include paths, recorded but not resolved
    pub includes: Vec<String>,
}

impl DocumentInfo {
    /// The document's namespace: the `*` scope if declared, else the first one
    pub fn namespace(&self) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|ns| ns.scope == "*")
            .or_else(|| self.namespaces.first())
            .map(|ns| ns.name.as_str())
    }

    fn from_document(doc: &Document) -> Self {
        Self {
            namespaces: doc
                .namespaces()
                .map(|(scope, name)| Namespace {
                    scope: scope.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            includes: doc.includes().map(String::from).collect(),
        }
    }
}

/// The queryable model built from IDL documents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaRegistry {
    namespace: Option<String>,
    structs: BTreeMap<String, StructDef>,
    enums: BTreeMap<String, EnumDef>,
    typedefs: BTreeMap<String, TypedefDef>,
    documents: BTreeMap<String, DocumentInfo>,
    recursive_structs: BTreeSet<String>,
    fingerprint: Fingerprint,
}

impl SchemaRegistry {
    /// Build a registry from a single document
    pub fn build(source: &str) -> Result<Self> {
        Self::build_document(DEFAULT_DOCUMENT_ID, source)
    }

    /// Build a registry from a single document with an explicit id.
    ///
    /// The id's file stem is the document's include prefix, so
    /// `incfile.thrift` makes `incfile.Account` resolvable.
    pub fn build_document(document_id: &str, source: &str) -> Result<Self> {
        Self::build_merged([(document_id, source)])
    }

    /// Build one registry from many documents keyed by document id
    pub fn build_merged<I, K, V>(documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let sources: BTreeMap<String, String> = documents
            .into_iter()
            .map(|(id, source)| (id.as_ref().to_string(), source.as_ref().to_string()))
            .collect();

        let fingerprint =
            Fingerprint::from_documents(sources.iter().map(|(id, src)| (id.as_str(), src.as_str())));

        // Parse everything before merging anything: no partial registries
        let mut parsed = Vec::with_capacity(sources.len());
        for (id, source) in &sources {
            parsed.push((id.as_str(), idl::parse(id, source)?));
        }

        let mut registry = Self {
            namespace: None,
            structs: BTreeMap::new(),
            enums: BTreeMap::new(),
            typedefs: BTreeMap::new(),
            documents: BTreeMap::new(),
            recursive_structs: BTreeSet::new(),
            fingerprint,
        };

        for (id, doc) in parsed {
            registry.merge_document(id, doc);
        }
        registry.recursive_structs = registry.find_recursive_structs();

        debug!(
            fingerprint = registry.fingerprint.short(),
            documents = registry.documents.len(),
            structs = registry.structs.len(),
            enums = registry.enums.len(),
            typedefs = registry.typedefs.len(),
            "built schema registry"
        );
        if !registry.recursive_structs.is_empty() {
            debug!(structs = ?registry.recursive_structs, "schema contains recursive structs");
        }

        Ok(registry)
    }

    fn merge_document(&mut self, id: &str, doc: Document) {
        let info = DocumentInfo::from_document(&doc);
        if let Some(ns) = info.namespace() {
            self.namespace = Some(ns.to_string());
        }
        self.documents.insert(id.to_string(), info);

        for definition in doc.definitions {
            match definition {
                Definition::Struct(def) => {
                    if let Some(previous) = self.structs.insert(def.name.clone(), def) {
                        warn_replaced("struct", &previous.name, &previous.document, id);
                    }
                }
                Definition::Enum(def) => {
                    if let Some(previous) = self.enums.insert(def.name.clone(), def) {
                        warn_replaced("enum", &previous.name, &previous.document, id);
                    }
                }
                Definition::Typedef(def) => {
                    if let Some(previous) = self.typedefs.insert(def.alias.clone(), def) {
                        warn_replaced("typedef", &previous.alias, &previous.document, id);
                    }
                }
                Definition::Const(constant) => {
                    debug!(constant = %constant.name, document = id, "ignoring constant");
                }
                Definition::Service { name, .. } => {
                    debug!(service = %name, document = id, "ignoring service");
                }
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Namespace of the last merged document that declared one
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Fingerprint of the source documents
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn structs(&self) -> &BTreeMap<String, StructDef> {
        &self.structs
    }

    pub fn enums(&self) -> &BTreeMap<String, EnumDef> {
        &self.enums
    }

    pub fn typedefs(&self) -> &BTreeMap<String, TypedefDef> {
        &self.typedefs
    }

    pub fn documents(&self) -> &BTreeMap<String, DocumentInfo> {
        &self.documents
    }

    /// Structs that take part in a reference cycle
    pub fn recursive_structs(&self) -> &BTreeSet<String> {
        &self.recursive_structs
    }

    /// Get a struct by its exact declared name
    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    /// Get an enum by its exact declared name
    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// Get a typedef by its exact alias
    pub fn typedef(&self, alias: &str) -> Option<&TypedefDef> {
        self.typedefs.get(alias)
    }

    // =========================================================================
    // Name resolution
    // =========================================================================

    /// Find a struct by exact or qualified name (`ns.Name` / `include.Name`)
    pub fn resolve_struct(&self, name: &str) -> Option<&StructDef> {
        self.resolve(&self.structs, name, |def| &def.document)
    }

    /// Find an enum by exact or qualified name
    pub fn resolve_enum(&self, name: &str) -> Option<&EnumDef> {
        self.resolve(&self.enums, name, |def| &def.document)
    }

    /// Find a typedef by exact or qualified alias
    pub fn resolve_typedef(&self, alias: &str) -> Option<&TypedefDef> {
        self.resolve(&self.typedefs, alias, |def| &def.document)
    }

    /// Follow typedef aliases until a non-alias type is reached.
    ///
    /// Alias cycles stop at the last alias visited.
    pub fn resolve_type<'a>(&'a self, field_type: &'a FieldType) -> &'a FieldType {
        let mut current = field_type;
        for _ in 0..=self.typedefs.len() {
            match current.named().and_then(|name| self.resolve_typedef(name)) {
                Some(def) => current = &def.target,
                None => break,
            }
        }
        current
    }

    fn resolve<'a, T>(
        &'a self,
        map: &'a BTreeMap<String, T>,
        name: &str,
        document_of: impl Fn(&T) -> &String,
    ) -> Option<&'a T> {
        if let Some(def) = map.get(name) {
            return Some(def);
        }
        let (bare, qualifier) = split_qualified_name(name).ok()?;
        map.get(&bare)
            .filter(|def| self.qualifier_matches(document_of(*def), &qualifier))
    }

    fn qualifier_matches(&self, document_id: &str, qualifier: &str) -> bool {
        if include_prefix(document_id) == qualifier {
            return true;
        }
        self.documents
            .get(document_id)
            .map(|info| info.namespaces.iter().any(|ns| ns.name == qualifier))
            .unwrap_or(false)
    }

    /// Struct names similar to `name`, best match first
    pub fn suggest(&self, name: &str, limit: usize) -> Vec<String> {
        let query = split_qualified_name(name)
            .map(|(bare, _)| bare)
            .unwrap_or_else(|_| name.to_string());

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, &String)> = self
            .structs
            .keys()
            .filter_map(|candidate| {
                matcher
                    .fuzzy_match(candidate, &query)
                    .map(|score| (score, candidate))
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        results
            .into_iter()
            .take(limit)
            .map(|(_, name)| name.clone())
            .collect()
    }

    // =========================================================================
    // Analysis
    // =========================================================================

    /// Struct names reachable from a field type through containers and typedefs
    fn struct_references(&self, field_type: &FieldType, out: &mut BTreeSet<String>, depth: usize) {
        if depth > self.typedefs.len() + 1 {
            return;
        }
        for name in field_type.referenced_names() {
            if let Some(def) = self.resolve_typedef(name) {
                self.struct_references(&def.target, out, depth + 1);
            } else if let Some(def) = self.resolve_struct(name) {
                out.insert(def.name.clone());
            }
        }
    }

    fn find_recursive_structs(&self) -> BTreeSet<String> {
        let mut graph: DiGraph<&str, ()> = DiGraph::with_capacity(self.structs.len(), 0);
        let indices: HashMap<&str, _> = self
            .structs
            .keys()
            .map(|name| (name.as_str(), graph.add_node(name.as_str())))
            .collect();

        for (name, def) in &self.structs {
            let mut targets = BTreeSet::new();
            for field in &def.fields {
                self.struct_references(&field.field_type, &mut targets, 0);
            }
            for target in &targets {
                if let (Some(&from), Some(&to)) = (indices.get(name.as_str()), indices.get(target.as_str())) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut recursive = BTreeSet::new();
        for scc in kosaraju_scc(&graph) {
            let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if cyclic {
                recursive.extend(scc.iter().map(|idx| graph[*idx].to_string()));
            }
        }
        recursive
    }
}

fn warn_replaced(kind: &str, name: &str, previous_document: &str, document: &str) {
    warn!(
        kind = kind,
        declaration = name,
        previous = previous_document,
        replacement = document,
        "duplicate declaration, later document wins"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThriftyError;
    use crate::schema::BaseType;

    const COMPLEX: &str = r#"
        namespace go sh.batch.schema

        typedef i64 USD

        enum ClientType {
            UNSET = 0,
            WEB = 1,
            MOBILE = 2
        }

        const i32 MAX_RETRIES = 3

        struct Address {
            1: string street
            2: string city
        }

        struct Account {
            1: i32 id
            2: string name
            3: ClientType client_type
            4: Address address
            5: USD balance
        }

        union Contact {
            1: string email
            2: string phone
        }
    "#;

    #[test]
    fn test_build_complex() {
        let registry = SchemaRegistry::build(COMPLEX).unwrap();

        assert_eq!(registry.namespace(), Some("sh.batch.schema"));
        assert_eq!(registry.structs().len(), 3);
        assert_eq!(registry.enums().len(), 1);
        assert_eq!(registry.typedefs().len(), 1);
        assert!(registry.typedef("USD").is_some());
        assert_eq!(
            registry.enum_def("ClientType").and_then(|e| e.label(0)),
            Some("UNSET")
        );
        assert!(registry.recursive_structs().is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = SchemaRegistry::build(COMPLEX).unwrap();
        let second = SchemaRegistry::build(COMPLEX).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_syntax_error_aborts_build() {
        let err = SchemaRegistry::build_merged([
            ("good.thrift", "struct A { 1: i32 id }"),
            ("bad.thrift", "struct B { 1: i32 }"),
        ])
        .unwrap_err();

        match err {
            ThriftyError::SchemaSyntax { document, line, .. } => {
                assert_eq!(document, "bad.thrift");
                assert_eq!(line, 1);
            }
            other => panic!("Expected SchemaSyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_deeply_nested_schema_is_a_syntax_error() {
        let source = format!(
            "const list<i32> X = {}{}",
            "[".repeat(200_000),
            "]".repeat(200_000)
        );
        let err = SchemaRegistry::build(&source).unwrap_err();
        assert!(matches!(err, ThriftyError::SchemaSyntax { .. }));
    }

    #[test]
    fn test_merge_documents() {
        let registry = SchemaRegistry::build_merged([
            (
                "incfile.thrift",
                "namespace * incfile\nstruct Address { 1: string city }",
            ),
            (
                "main.thrift",
                "include \"incfile.thrift\"\nnamespace go sh.batch.schema\nstruct Account { 1: incfile.Address address }",
            ),
        ])
        .unwrap();

        assert_eq!(registry.structs().len(), 2);
        assert_eq!(registry.namespace(), Some("sh.batch.schema"));
        assert_eq!(
            registry.documents()["main.thrift"].includes,
            vec!["incfile.thrift".to_string()]
        );
        assert_eq!(
            registry.documents()["incfile.thrift"].namespace(),
            Some("incfile")
        );
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let registry = SchemaRegistry::build_merged([
            ("b.thrift", "struct Account { 1: i32 id 2: string email }"),
            ("a.thrift", "struct Account { 1: i32 id }"),
        ])
        .unwrap();

        let account = registry.struct_def("Account").unwrap();
        assert_eq!(account.document, "b.thrift");
        assert_eq!(account.fields.len(), 2);
    }

    #[test]
    fn test_merge_order_independent_of_input_order() {
        let forward = SchemaRegistry::build_merged([
            ("a.thrift", "struct A { 1: i32 id }"),
            ("b.thrift", "struct B { 1: i32 id }"),
        ])
        .unwrap();
        let reverse = SchemaRegistry::build_merged([
            ("b.thrift", "struct B { 1: i32 id }"),
            ("a.thrift", "struct A { 1: i32 id }"),
        ])
        .unwrap();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_resolve_qualified_names() {
        let registry = SchemaRegistry::build_merged([
            (
                "incfile.thrift",
                "namespace go sh.batch.schema\nstruct Account { 1: i32 id }\nenum Kind { A = 1 }",
            ),
            ("other.thrift", "struct Other { 1: i32 id }"),
        ])
        .unwrap();

        assert!(registry.resolve_struct("Account").is_some());
        assert!(registry.resolve_struct("incfile.Account").is_some());
        assert!(registry.resolve_struct("sh.batch.schema.Account").is_some());
        assert!(registry.resolve_struct("other.Account").is_none());
        assert!(registry.resolve_struct("Missing").is_none());
        assert!(registry.resolve_enum("incfile.Kind").is_some());
    }

    #[test]
    fn test_resolve_type_through_typedefs() {
        let registry = SchemaRegistry::build(
            r#"
            typedef i64 Cents
            typedef Cents USD
            typedef Account Owner
            struct Account { 1: USD balance 2: Owner owner }
            "#,
        )
        .unwrap();

        let account = registry.struct_def("Account").unwrap();
        assert_eq!(
            registry.resolve_type(&account.fields[0].field_type),
            &FieldType::Base(BaseType::I64)
        );
        assert_eq!(
            registry.resolve_type(&account.fields[1].field_type),
            &FieldType::Named("Account".into())
        );
    }

    #[test]
    fn test_resolve_type_alias_cycle() {
        let registry = SchemaRegistry::build("typedef B A\ntypedef A B").unwrap();
        let named = FieldType::Named("A".into());
        let resolved = registry.resolve_type(&named);
        assert!(matches!(resolved, FieldType::Named(_)));
    }

    #[test]
    fn test_recursive_structs() {
        let registry = SchemaRegistry::build(
            r#"
            typedef list<Node> Children
            struct Node { 1: i32 value 2: Children children }
            struct Ping { 1: Pong pong }
            struct Pong { 1: Ping ping }
            struct Leaf { 1: i32 value }
            "#,
        )
        .unwrap();

        let recursive: Vec<_> = registry.recursive_structs().iter().cloned().collect();
        assert_eq!(recursive, vec!["Node", "Ping", "Pong"]);
    }

    #[test]
    fn test_suggest() {
        let registry = SchemaRegistry::build(COMPLEX).unwrap();
        let suggestions = registry.suggest("Acount", 3);
        assert_eq!(suggestions.first().map(String::as_str), Some("Account"));
        assert!(registry.suggest("zzz", 3).is_empty());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRegistry>();
    }
}
