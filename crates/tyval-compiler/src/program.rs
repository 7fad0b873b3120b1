//! # Program Emission
//!
//! Lowers a schema graph into an operation tree. Everything that the value
//! engine looks up per call is resolved here, once:
//!
//! - string patterns become compiled [`Regex`] handles,
//! - formats and custom kinds capture their registry predicates,
//! - `Ref`/`This`/`Cyclic` nodes become [`Op::Call`] into a table holding
//!   one sub-routine per reachable definition,
//! - intersections carry their precomputed evaluated-key set.
//!
//! A program owns all of its data and never refers back to the registry it
//! was compiled against.

use regex::Regex;
use tyval_core::graph::{Analysis, Env, KeySet, Patterns};
use tyval_core::registry::{FormatPredicate, KindPredicate};
use tyval_core::schema::{
    is_required, Additional, BigIntSchema, BytesSchema, Kind, Literal, NumberSchema, RecordKey, Schema, StringSchema,
};
use tyval_core::{EngineConfig, References, Registry};

/// One node of a compiled program.
pub(crate) enum Op {
    Pass,
    Never,
    String {
        schema: StringSchema,
        pattern: Option<Regex>,
        format: Option<FormatPredicate>,
    },
    Number {
        schema: NumberSchema,
        integer: bool,
    },
    Boolean,
    Null,
    Undefined,
    Symbol,
    BigInt(BigIntSchema),
    Bytes(BytesSchema),
    Literal(Literal),
    Enum(Vec<Literal>),
    Object {
        properties: Vec<Property>,
        additional: Extra,
        min: Option<usize>,
        max: Option<usize>,
    },
    Record {
        key: RecordKey,
        value: Box<Op>,
        additional: Extra,
        min: Option<usize>,
        max: Option<usize>,
    },
    Array {
        items: Box<Op>,
        min: Option<usize>,
        max: Option<usize>,
        unique: bool,
        contains: Option<Contains>,
    },
    Tuple(Vec<Op>),
    Union(Vec<Op>),
    Intersect {
        members: Vec<Op>,
        unevaluated: Option<Unevaluated>,
    },
    Not(Box<Op>),
    /// Invoke the sub-routine at this index.
    Call(usize),
    Unresolved(String),
    Custom {
        name: String,
        schema: Schema,
        predicate: Option<KindPredicate>,
    },
}

pub(crate) struct Property {
    pub(crate) key: String,
    pub(crate) op: Op,
    pub(crate) required: bool,
}

/// Treatment of keys outside the declared properties.
pub(crate) enum Extra {
    Open,
    Deny,
    Check(Box<Op>),
}

pub(crate) struct Contains {
    pub(crate) op: Box<Op>,
    pub(crate) min: Option<usize>,
    pub(crate) max: Option<usize>,
}

pub(crate) struct Unevaluated {
    pub(crate) known: KeySet,
    /// `None` rejects every unevaluated key.
    pub(crate) extra: Option<Box<Op>>,
}

/// A compiled definition body.
pub(crate) struct Subroutine {
    pub(crate) name: String,
    pub(crate) body: Op,
}

/// The whole compiled graph.
pub(crate) struct Program {
    pub(crate) root: Op,
    pub(crate) subroutines: Vec<Subroutine>,
    pub(crate) patterns: Patterns,
    pub(crate) config: EngineConfig,
}

impl Program {
    pub(crate) fn emit(
        root: &Schema,
        analysis: Analysis,
        references: &References,
        registry: &Registry,
        config: &EngineConfig,
    ) -> Self {
        let emitter = Emitter {
            analysis: &analysis,
            references,
            registry,
            config,
        };
        let root_op = emitter.emit(&Env::root(), root);
        let subroutines = analysis
            .definitions
            .values()
            .map(|def| Subroutine {
                name: def.name().to_string(),
                body: emitter.emit(&Env::inside(def), &def.schema),
            })
            .collect();
        Self {
            root: root_op,
            subroutines,
            patterns: analysis.patterns,
            config: config.clone(),
        }
    }
}

struct Emitter<'c> {
    analysis: &'c Analysis,
    references: &'c References,
    registry: &'c Registry,
    config: &'c EngineConfig,
}

impl Emitter<'_> {
    fn emit(&self, env: &Env, schema: &Schema) -> Op {
        match schema.kind() {
            Kind::Any | Kind::Unknown => Op::Pass,
            Kind::Never => Op::Never,
            Kind::String(s) => Op::String {
                schema: s.clone(),
                pattern: s.pattern.as_deref().and_then(|p| self.analysis.patterns.get(p)).cloned(),
                format: s.format.as_deref().and_then(|f| self.registry.formats.get(f)).cloned(),
            },
            Kind::Number(n) => Op::Number {
                schema: n.clone(),
                integer: false,
            },
            Kind::Integer(n) => Op::Number {
                schema: n.clone(),
                integer: true,
            },
            Kind::Boolean => Op::Boolean,
            Kind::Null => Op::Null,
            Kind::Undefined => Op::Undefined,
            Kind::Symbol => Op::Symbol,
            Kind::BigInt(b) => Op::BigInt(b.clone()),
            Kind::Bytes(b) => Op::Bytes(b.clone()),
            Kind::Literal(literal) => Op::Literal(literal.clone()),
            Kind::Enum(literals) => Op::Enum(literals.clone()),
            Kind::Object(obj) => Op::Object {
                properties: obj
                    .properties
                    .iter()
                    .map(|(key, property)| Property {
                        key: key.clone(),
                        op: self.emit(env, property),
                        required: is_required(property, self.config.defaulted_properties),
                    })
                    .collect(),
                additional: self.extra(env, &obj.additional),
                min: obj.min_properties,
                max: obj.max_properties,
            },
            Kind::Record(record) => Op::Record {
                key: record.key.clone(),
                value: Box::new(self.emit(env, &record.value)),
                additional: self.extra(env, &record.additional),
                min: record.min_properties,
                max: record.max_properties,
            },
            Kind::Array(arr) => Op::Array {
                items: Box::new(self.emit(env, &arr.items)),
                min: arr.min_items,
                max: arr.max_items,
                unique: arr.unique_items,
                contains: arr.contains.as_ref().map(|contains| Contains {
                    op: Box::new(self.emit(env, contains)),
                    min: arr.min_contains,
                    max: arr.max_contains,
                }),
            },
            Kind::Tuple(elements) => Op::Tuple(elements.iter().map(|e| self.emit(env, e)).collect()),
            Kind::Union(variants) => Op::Union(variants.iter().map(|v| self.emit(env, v)).collect()),
            Kind::Intersect(intersect) => Op::Intersect {
                members: intersect.members.iter().map(|m| self.emit(env, m)).collect(),
                unevaluated: match &intersect.unevaluated {
                    Additional::Deny => Some(Unevaluated {
                        known: KeySet::of_members(env, &intersect.members, self.references),
                        extra: None,
                    }),
                    Additional::Schema(extra) => Some(Unevaluated {
                        known: KeySet::of_members(env, &intersect.members, self.references),
                        extra: Some(Box::new(self.emit(env, extra))),
                    }),
                    Additional::Unspecified | Additional::Allow => None,
                },
            },
            Kind::Not(inner) => Op::Not(Box::new(self.emit(env, inner))),
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => {
                let call = env
                    .follow(schema, self.references)
                    .and_then(|def| self.analysis.definitions.get_index_of(&def.key));
                match (call, schema.kind()) {
                    (Some(index), _) => Op::Call(index),
                    (None, Kind::Ref(name)) => Op::Unresolved(name.clone()),
                    (None, Kind::Cyclic(cyclic)) => Op::Unresolved(cyclic.entry.clone()),
                    (None, _) => Op::Unresolved("This".into()),
                }
            }
            Kind::Codec(codec) => self.emit(env, &codec.inner),
            Kind::Custom(custom) => Op::Custom {
                name: custom.name.clone(),
                schema: schema.clone(),
                predicate: self.registry.kinds.get(&custom.name).cloned(),
            },
        }
    }

    fn extra(&self, env: &Env, additional: &Additional) -> Extra {
        match additional {
            Additional::Deny => Extra::Deny,
            Additional::Schema(extra) => Extra::Check(Box::new(self.emit(env, extra))),
            Additional::Unspecified | Additional::Allow => Extra::Open,
        }
    }
}

impl Op {
    /// Number of operation nodes, sub-routine bodies excluded.
    pub(crate) fn size(&self) -> usize {
        let nested = match self {
            Op::Object { properties, additional, .. } => {
                properties.iter().map(|p| p.op.size()).sum::<usize>() + additional.size()
            }
            Op::Record { value, additional, .. } => value.size() + additional.size(),
            Op::Array { items, contains, .. } => items.size() + contains.as_ref().map_or(0, |c| c.op.size()),
            Op::Tuple(ops) | Op::Union(ops) => ops.iter().map(Op::size).sum(),
            Op::Intersect { members, unevaluated } => {
                members.iter().map(Op::size).sum::<usize>()
                    + unevaluated.as_ref().and_then(|u| u.extra.as_ref()).map_or(0, |e| e.size())
            }
            Op::Not(inner) => inner.size(),
            _ => 0,
        };
        1 + nested
    }
}

impl Extra {
    fn size(&self) -> usize {
        match self {
            Extra::Check(op) => op.size(),
            Extra::Open | Extra::Deny => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyval_core::graph::analyze;

    fn program(schema: &Schema) -> Program {
        let config = EngineConfig::default();
        let analysis = analyze(schema, References::empty(), Registry::shared_default(), &config).unwrap();
        Program::emit(schema, analysis, References::empty(), Registry::shared_default(), &config)
    }

    #[test]
    fn test_references_become_calls() {
        let tree = Schema::recursive(Schema::object([("children", Schema::array(Schema::this()))]));
        let p = program(&tree);
        assert!(matches!(p.root, Op::Call(0)));
        assert_eq!(p.subroutines.len(), 1);
        assert_eq!(p.subroutines[0].name, "Self");
    }

    #[test]
    fn test_shared_definition_emitted_once() {
        let schema = Schema::cyclic(
            [
                ("Id", Schema::string()),
                ("Pair", Schema::tuple([Schema::reference("Id"), Schema::reference("Id")])),
            ],
            "Pair",
        );
        let p = program(&schema);
        assert_eq!(p.subroutines.len(), 2);
    }

    #[test]
    fn test_patterns_are_compiled_up_front() {
        let schema = Schema::new(Kind::String(StringSchema {
            pattern: Some("^a+$".into()),
            ..Default::default()
        }));
        let Op::String { pattern, .. } = program(&schema).root else {
            panic!("expected string op");
        };
        assert!(pattern.is_some_and(|re| re.is_match("aaa")));
    }

    #[test]
    fn test_intersection_key_set_is_precomputed() {
        let schema = Schema::intersect_with(
            [Schema::object([("a", Schema::number())]), Schema::object([("b", Schema::number())])],
            Additional::Deny,
        );
        let Op::Intersect { unevaluated: Some(u), .. } = program(&schema).root else {
            panic!("expected intersect op");
        };
        assert_eq!(u.known.names.len(), 2);
        assert!(u.extra.is_none());
    }

    #[test]
    fn test_codec_compiles_to_inner() {
        let schema = Schema::codec(
            Schema::boolean(),
            tyval_core::FnCodec::new("id", |v: tyval_core::Value| Ok(v), |v: tyval_core::Value| Ok(v)),
        );
        assert!(matches!(program(&schema).root, Op::Boolean));
    }

    #[test]
    fn test_op_size_counts_nodes() {
        let schema = Schema::object([("a", Schema::number()), ("b", Schema::array(Schema::string()))]);
        assert_eq!(program(&schema).root.size(), 4);
    }
}
