//! # Definition Graph
//!
//! Lexical resolution of `Ref`/`This`/`Cyclic` nodes and the reachability
//! pass that both evaluators run before touching a value.
//!
//! ## Environments
//!
//! A [`Frame`] is one `Cyclic` definition table linked to its enclosing
//! frame. An [`Env`] is the innermost frame plus the definition currently
//! being evaluated (the target of `This`). A `Ref` searches frames from the
//! innermost outward, then the external [`References`]. A resolved
//! [`Definition`] remembers the frame it was found in, so its body resolves
//! siblings lexically no matter where the reference came from.
//!
//! Definitions are identified by [`DefKey`]: the address of the table node
//! plus the name. Two tables that happen to share entry names never alias.
//!
//! ## Analysis
//!
//! [`analyze`] walks the root and every transitively reachable definition
//! exactly once and fails with a [`ConfigurationError`] for anything that
//! would make evaluation impossible: unresolved references, unbound `This`,
//! missing cyclic entries, unregistered custom kinds (per policy), patterns
//! that do not compile, and reference cycles that return to a definition
//! without descending into a property, element or entry of the value.
//! The last rule is what lets every structural walk terminate on the depth
//! of the value.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::config::{EngineConfig, UnknownKindPolicy};
use crate::error::ConfigurationError;
use crate::pointer;
use crate::registry::Registry;
use crate::schema::{Additional, Definitions, Kind, RecordKey, References, Schema};

/// Table address used for external references.
pub const EXTERNAL_TABLE: usize = 0;

/// Identity of a definition: table address plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefKey {
    pub table: usize,
    pub name: String,
}

/// One cyclic definition table in the lexical chain.
#[derive(Debug)]
pub struct Frame {
    table: Schema,
    parent: Option<Arc<Frame>>,
}

impl Frame {
    fn defs(&self) -> Option<&Definitions> {
        match self.table.kind() {
            Kind::Cyclic(cyclic) => Some(&cyclic.defs),
            _ => None,
        }
    }
}

/// A resolved definition together with its lexical frame.
#[derive(Debug)]
pub struct Definition {
    pub key: DefKey,
    pub schema: Schema,
    frame: Option<Arc<Frame>>,
}

impl Definition {
    pub fn name(&self) -> &str {
        &self.key.name
    }
}

/// The lexical environment of a schema node.
#[derive(Debug, Clone, Default)]
pub struct Env {
    frame: Option<Arc<Frame>>,
    this: Option<Arc<Definition>>,
}

impl Env {
    /// The environment of a root schema: no frames, no current definition.
    pub fn root() -> Self {
        Self::default()
    }

    /// The environment for evaluating `def`'s body.
    pub fn inside(def: &Arc<Definition>) -> Self {
        Self {
            frame: def.frame.clone(),
            this: Some(def.clone()),
        }
    }

    /// The definition `This` refers to.
    pub fn this(&self) -> Option<&Arc<Definition>> {
        self.this.as_ref()
    }

    /// Resolve a `Ref` name lexically, then against `references`.
    pub fn resolve(&self, name: &str, references: &References) -> Option<Arc<Definition>> {
        let mut frame = self.frame.as_ref();
        while let Some(current) = frame {
            if let Some(schema) = current.defs().and_then(|defs| defs.get(name)) {
                return Some(Arc::new(Definition {
                    key: DefKey {
                        table: current.table.addr(),
                        name: name.to_string(),
                    },
                    schema: schema.clone(),
                    frame: Some(current.clone()),
                }));
            }
            frame = current.parent.as_ref();
        }
        references.get(name).map(|schema| {
            Arc::new(Definition {
                key: DefKey {
                    table: EXTERNAL_TABLE,
                    name: name.to_string(),
                },
                schema: schema.clone(),
                frame: None,
            })
        })
    }

    /// Open a `Cyclic` node's table and resolve its entry definition.
    ///
    /// Returns `None` when `node` is not cyclic or its entry is missing.
    pub fn enter_cyclic(&self, node: &Schema) -> Option<Arc<Definition>> {
        let Kind::Cyclic(cyclic) = node.kind() else {
            return None;
        };
        let schema = cyclic.defs.get(&cyclic.entry)?.clone();
        let frame = Arc::new(Frame {
            table: node.clone(),
            parent: self.frame.clone(),
        });
        Some(Arc::new(Definition {
            key: DefKey {
                table: node.addr(),
                name: cyclic.entry.clone(),
            },
            schema,
            frame: Some(frame),
        }))
    }

    /// Follow a `Ref`, `This` or `Cyclic` node to its definition.
    pub fn follow(&self, node: &Schema, references: &References) -> Option<Arc<Definition>> {
        match node.kind() {
            Kind::Ref(name) => self.resolve(name, references),
            Kind::This => self.this.clone(),
            Kind::Cyclic(_) => self.enter_cyclic(node),
            _ => None,
        }
    }
}

/// Regular expressions compiled once per scope or program, keyed by source.
#[derive(Debug, Clone, Default)]
pub struct Patterns {
    compiled: HashMap<String, Regex>,
}

impl Patterns {
    pub fn get(&self, source: &str) -> Option<&Regex> {
        self.compiled.get(source)
    }

    /// Compile `source` unless already present.
    pub fn compile(&mut self, source: &str, path: &str) -> Result<(), ConfigurationError> {
        if self.compiled.contains_key(source) {
            return Ok(());
        }
        let regex = Regex::new(source).map_err(|e| ConfigurationError::InvalidPattern {
            pattern: source.to_string(),
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        self.compiled.insert(source.to_string(), regex);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Whether `key` is selected by a record key policy.
pub fn record_key_matches(key_policy: &RecordKey, key: &str, patterns: &Patterns) -> bool {
    match key_policy {
        RecordKey::String => true,
        other => patterns.get(other.pattern()).is_some_and(|re| re.is_match(key)),
    }
}

/// The outcome of [`analyze`].
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Every reachable definition, in discovery order.
    pub definitions: IndexMap<DefKey, Arc<Definition>>,
    pub patterns: Patterns,
}

/// Run the reachability pass over `root`.
pub fn analyze(
    root: &Schema,
    references: &References,
    registry: &Registry,
    config: &EngineConfig,
) -> Result<Analysis, ConfigurationError> {
    let mut analyzer = Analyzer {
        references,
        registry,
        config,
        analysis: Analysis::default(),
        edges: HashMap::new(),
        queue: Vec::new(),
    };
    analyzer.walk(&Env::root(), root, "", None, false)?;
    while let Some((def, path)) = analyzer.queue.pop() {
        let env = Env::inside(&def);
        analyzer.walk(&env, &def.schema, &path, Some(&def.key), false)?;
    }
    analyzer.check_cycles()?;
    tracing::debug!(
        definitions = analyzer.analysis.definitions.len(),
        patterns = analyzer.analysis.patterns.len(),
        "schema graph analyzed"
    );
    Ok(analyzer.analysis)
}

struct Analyzer<'r> {
    references: &'r References,
    registry: &'r Registry,
    config: &'r EngineConfig,
    analysis: Analysis,
    /// Unguarded references: owner → (target, schema path of the reference).
    edges: HashMap<DefKey, Vec<(DefKey, String)>>,
    queue: Vec<(Arc<Definition>, String)>,
}

impl Analyzer<'_> {
    /// `guarded` is true once the walk has descended into a part of the value
    /// since entering `owner`'s body.
    fn walk(
        &mut self,
        env: &Env,
        schema: &Schema,
        path: &str,
        owner: Option<&DefKey>,
        guarded: bool,
    ) -> Result<(), ConfigurationError> {
        match schema.kind() {
            Kind::String(s) => {
                if let Some(pattern) = &s.pattern {
                    self.analysis.patterns.compile(pattern, path)?;
                }
            }
            Kind::Object(obj) => {
                let base = pointer::push(path, "properties");
                for (key, property) in &obj.properties {
                    self.walk(env, property, &pointer::push(&base, key), owner, true)?;
                }
                if let Additional::Schema(extra) = &obj.additional {
                    self.walk(env, extra, &pointer::push(path, "additionalProperties"), owner, true)?;
                }
            }
            Kind::Array(arr) => {
                self.walk(env, &arr.items, &pointer::push(path, "items"), owner, true)?;
                if let Some(contains) = &arr.contains {
                    self.walk(env, contains, &pointer::push(path, "contains"), owner, true)?;
                }
            }
            Kind::Tuple(items) => {
                let base = pointer::push(path, "prefixItems");
                for (i, item) in items.iter().enumerate() {
                    self.walk(env, item, &pointer::push(&base, &i.to_string()), owner, true)?;
                }
            }
            Kind::Record(record) => {
                if record.key != RecordKey::String {
                    self.analysis.patterns.compile(record.key.pattern(), path)?;
                }
                let value_path = pointer::push(&pointer::push(path, "patternProperties"), record.key.pattern());
                self.walk(env, &record.value, &value_path, owner, true)?;
                if let Additional::Schema(extra) = &record.additional {
                    self.walk(env, extra, &pointer::push(path, "additionalProperties"), owner, true)?;
                }
            }
            Kind::Union(variants) => {
                let base = pointer::push(path, "anyOf");
                for (i, variant) in variants.iter().enumerate() {
                    self.walk(env, variant, &pointer::push(&base, &i.to_string()), owner, guarded)?;
                }
            }
            Kind::Intersect(intersect) => {
                let base = pointer::push(path, "allOf");
                for (i, member) in intersect.members.iter().enumerate() {
                    self.walk(env, member, &pointer::push(&base, &i.to_string()), owner, guarded)?;
                }
                if let Additional::Schema(extra) = &intersect.unevaluated {
                    self.walk(env, extra, &pointer::push(path, "unevaluatedProperties"), owner, true)?;
                }
            }
            Kind::Not(inner) => self.walk(env, inner, &pointer::push(path, "not"), owner, guarded)?,
            Kind::Codec(codec) => {
                self.walk(env, &codec.inner, path, owner, guarded)?;
                if let Some(output) = &codec.output {
                    self.walk(env, output, path, owner, guarded)?;
                }
            }
            Kind::Ref(name) => {
                let def = env.resolve(name, self.references).ok_or_else(|| {
                    ConfigurationError::UnresolvedReference {
                        name: name.clone(),
                        path: path.to_string(),
                    }
                })?;
                self.link(def, path, owner, guarded);
            }
            Kind::This => {
                let def = env.this().cloned().ok_or_else(|| ConfigurationError::UnboundThis {
                    path: path.to_string(),
                })?;
                self.link(def, path, owner, guarded);
            }
            Kind::Cyclic(cyclic) => {
                let def = env.enter_cyclic(schema).ok_or_else(|| ConfigurationError::MissingEntry {
                    entry: cyclic.entry.clone(),
                    path: path.to_string(),
                })?;
                let entry_path = pointer::push(&pointer::push(path, "$defs"), &cyclic.entry);
                self.link(def, &entry_path, owner, guarded);
            }
            Kind::Custom(custom) => {
                if !self.registry.kinds.has(&custom.name) {
                    match self.config.unknown_kinds {
                        UnknownKindPolicy::Error => {
                            return Err(ConfigurationError::UnknownKind {
                                kind: custom.name.clone(),
                                path: path.to_string(),
                            })
                        }
                        UnknownKindPolicy::Accept => {
                            tracing::warn!(kind = %custom.name, path, "unregistered custom kind will accept every value");
                        }
                        UnknownKindPolicy::Reject => {}
                    }
                }
            }
            Kind::Any
            | Kind::Unknown
            | Kind::Never
            | Kind::Number(_)
            | Kind::Integer(_)
            | Kind::Boolean
            | Kind::Null
            | Kind::Undefined
            | Kind::BigInt(_)
            | Kind::Symbol
            | Kind::Bytes(_)
            | Kind::Literal(_)
            | Kind::Enum(_) => {}
        }
        Ok(())
    }

    fn link(&mut self, def: Arc<Definition>, path: &str, owner: Option<&DefKey>, guarded: bool) {
        if let (false, Some(owner)) = (guarded, owner) {
            self.edges
                .entry(owner.clone())
                .or_default()
                .push((def.key.clone(), path.to_string()));
        }
        if !self.analysis.definitions.contains_key(&def.key) {
            tracing::trace!(definition = %def.name(), path, "resolved definition");
            self.analysis.definitions.insert(def.key.clone(), def.clone());
            self.queue.push((def, path.to_string()));
        }
    }

    /// Depth-first search for a cycle among unguarded edges.
    fn check_cycles(&self) -> Result<(), ConfigurationError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }
        let mut marks: HashMap<&DefKey, Mark> = HashMap::new();
        for start in self.analysis.definitions.keys() {
            if marks.contains_key(start) {
                continue;
            }
            // Explicit stack of (node, next edge index).
            let mut stack: Vec<(&DefKey, usize)> = vec![(start, 0)];
            marks.insert(start, Mark::Active);
            while let Some((node, index)) = stack.pop() {
                let edges = self.edges.get(node).map(Vec::as_slice).unwrap_or(&[]);
                let Some((target, path)) = edges.get(index) else {
                    marks.insert(node, Mark::Done);
                    continue;
                };
                stack.push((node, index + 1));
                match marks.get(target) {
                    Some(Mark::Active) => {
                        return Err(ConfigurationError::UnguardedCycle {
                            name: target.name.clone(),
                            path: path.clone(),
                        })
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(target, Mark::Active);
                        stack.push((target, 0));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The keys an object-like schema evaluates, for `unevaluatedProperties`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySet {
    pub names: BTreeSet<String>,
    /// Pattern sources; every one was compiled by [`analyze`].
    pub patterns: Vec<String>,
    /// Every key is evaluated.
    pub all: bool,
}

impl KeySet {
    /// Collect the keys `schema` evaluates, following references.
    pub fn of(env: &Env, schema: &Schema, references: &References) -> Self {
        let mut set = Self::default();
        let mut visited = BTreeSet::new();
        set.collect(env, schema, references, &mut visited);
        set
    }

    /// Keys evaluated by the members of an intersection, excluding the
    /// intersection's own `unevaluatedProperties`.
    pub fn of_members(env: &Env, members: &[Schema], references: &References) -> Self {
        let mut set = Self::default();
        let mut visited = BTreeSet::new();
        for member in members {
            set.collect(env, member, references, &mut visited);
        }
        set
    }

    fn collect(&mut self, env: &Env, schema: &Schema, references: &References, visited: &mut BTreeSet<DefKey>) {
        match schema.kind() {
            Kind::Object(obj) => {
                self.names.extend(obj.properties.keys().cloned());
                self.all |= matches!(obj.additional, Additional::Allow | Additional::Schema(_));
            }
            Kind::Record(record) => {
                match record.key {
                    RecordKey::String => self.all = true,
                    ref other => self.patterns.push(other.pattern().to_string()),
                }
                self.all |= matches!(record.additional, Additional::Allow | Additional::Schema(_));
            }
            Kind::Intersect(intersect) => {
                for member in &intersect.members {
                    self.collect(env, member, references, visited);
                }
                self.all |= matches!(intersect.unevaluated, Additional::Allow | Additional::Schema(_));
            }
            Kind::Union(variants) => {
                for variant in variants {
                    self.collect(env, variant, references, visited);
                }
            }
            Kind::Codec(codec) => self.collect(env, &codec.inner, references, visited),
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => {
                if let Some(def) = env.follow(schema, references) {
                    if visited.insert(def.key.clone()) {
                        self.collect(&Env::inside(&def), &def.schema, references, visited);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn contains(&self, key: &str, patterns: &Patterns) -> bool {
        self.all
            || self.names.contains(key)
            || self
                .patterns
                .iter()
                .any(|p| patterns.get(p).is_some_and(|re| re.is_match(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn run(schema: &Schema) -> Result<Analysis, ConfigurationError> {
        analyze(schema, References::empty(), Registry::shared_default(), &EngineConfig::default())
    }

    #[test]
    fn test_plain_schema_has_no_definitions() {
        let analysis = run(&Schema::object([("a", Schema::string())])).unwrap();
        assert!(analysis.definitions.is_empty());
    }

    #[test]
    fn test_unresolved_reference_reports_path() {
        let schema = Schema::object([("next", Schema::reference("Node"))]);
        let err = run(&schema).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnresolvedReference {
                name: "Node".into(),
                path: "/properties/next".into(),
            }
        );
    }

    #[test]
    fn test_external_reference_resolves() {
        let refs = References::new().with("Name", Schema::string());
        let schema = Schema::array(Schema::reference("Name"));
        let analysis = analyze(&schema, &refs, Registry::shared_default(), &EngineConfig::default()).unwrap();
        assert_eq!(analysis.definitions.len(), 1);
        let key = analysis.definitions.keys().next().unwrap();
        assert_eq!(key.table, EXTERNAL_TABLE);
    }

    #[test]
    fn test_unbound_this() {
        let err = run(&Schema::array(Schema::this())).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnboundThis { .. }));
    }

    #[test]
    fn test_missing_cyclic_entry() {
        let schema = Schema::cyclic([("A", Schema::number())], "B");
        assert!(matches!(run(&schema).unwrap_err(), ConfigurationError::MissingEntry { .. }));
    }

    #[test]
    fn test_guarded_recursion_is_accepted() {
        let node = Schema::recursive(Schema::object([
            ("value", Schema::number()),
            ("children", Schema::array(Schema::this())),
        ]));
        let analysis = run(&node).unwrap();
        assert_eq!(analysis.definitions.len(), 1);
    }

    #[test]
    fn test_unguarded_cycle_rejected() {
        let schema = Schema::cyclic(
            [("A", Schema::reference("B")), ("B", Schema::union([Schema::reference("A"), Schema::null()]))],
            "A",
        );
        assert!(matches!(run(&schema).unwrap_err(), ConfigurationError::UnguardedCycle { .. }));
        let direct = Schema::recursive(Schema::union([Schema::string(), Schema::this()]));
        assert!(matches!(run(&direct).unwrap_err(), ConfigurationError::UnguardedCycle { .. }));
    }

    #[test]
    fn test_inner_tables_shadow_outer() {
        let inner = Schema::cyclic([("T", Schema::string())], "T");
        let outer = Schema::cyclic([("T", Schema::number()), ("Root", Schema::array(inner))], "Root");
        let analysis = run(&outer).unwrap();
        let tables: BTreeSet<usize> = analysis.definitions.keys().map(|k| k.table).collect();
        assert_eq!(tables.len(), 2);
        let inner_t = analysis
            .definitions
            .values()
            .find(|d| d.name() == "T")
            .unwrap();
        assert_eq!(inner_t.schema.kind().name(), "String");
    }

    #[test]
    fn test_invalid_pattern() {
        let mut schema = Schema::string();
        schema = schema.with(|n| {
            if let Kind::String(s) = &mut n.kind {
                s.pattern = Some("(".into());
            }
        });
        assert!(matches!(run(&schema).unwrap_err(), ConfigurationError::InvalidPattern { .. }));
    }

    #[test]
    fn test_unknown_kind_policy() {
        let schema = Schema::custom("Even", serde_json::Map::new());
        assert!(matches!(run(&schema).unwrap_err(), ConfigurationError::UnknownKind { .. }));
        let config = EngineConfig {
            unknown_kinds: UnknownKindPolicy::Reject,
            ..EngineConfig::default()
        };
        assert!(analyze(&schema, References::empty(), Registry::shared_default(), &config).is_ok());
        let registry = Registry::new().with_kind("Even", |_: &Schema, _: &crate::Value| true);
        assert!(analyze(&schema, References::empty(), &registry, &EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_key_set_through_references() {
        let refs = References::new().with("Base", Schema::object([("id", Schema::string())]));
        let schema = Schema::intersect_with(
            [Schema::reference("Base"), Schema::object([("name", Schema::string())])],
            Additional::Deny,
        );
        let set = KeySet::of(&Env::root(), &schema, &refs);
        let patterns = Patterns::default();
        assert!(set.contains("id", &patterns));
        assert!(set.contains("name", &patterns));
        assert!(!set.contains("other", &patterns));
    }

    #[test]
    fn test_key_set_of_members_ignores_own_unevaluated() {
        let members = [Schema::object([("a", Schema::number())])];
        let schema = Schema::intersect_with(members.clone(), Additional::Schema(Schema::string()));
        let patterns = Patterns::default();
        assert!(KeySet::of(&Env::root(), &schema, References::empty()).all);
        let set = KeySet::of_members(&Env::root(), &members, References::empty());
        assert!(!set.all);
        assert!(set.contains("a", &patterns));
        assert!(!set.contains("b", &patterns));
    }
}
