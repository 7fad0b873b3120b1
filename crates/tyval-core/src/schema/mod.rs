//! # Schema Model
//!
//! A schema is an immutable, structurally shared tree node: a [`Kind`]
//! discriminant with its keyword payload, descriptive [`Meta`] keywords and
//! bookkeeping [`Modifiers`].
//!
//! ## Sharing
//!
//! [`Schema`] is a handle around an `Arc`. Embedding a sub-schema in several
//! parents shares one node. Every `with_*` adjuster is copy-on-write, so an
//! adjustment made through one handle is never observed through another;
//! the engines can treat every node they are handed as frozen.
//!
//! ## Invariants
//!
//! - Object `required` lists are derived from the `optional` modifier, never
//!   stored (see [`ObjectSchema::required_keys`]).
//! - Cycles are expressed only through `Ref`/`This` names resolved against a
//!   [`CyclicSchema`] table or [`References`], never through back-pointers.
//! - [`Schema::union`] and [`Schema::intersect`] normalize eagerly: zero
//!   members is `Never`, one member is that member.

pub mod codec;
mod kinds;
mod references;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub use codec::{Codec, FnCodec};
pub use kinds::{
    is_required, Additional, ArraySchema, BigIntSchema, BytesSchema, CodecSchema, CustomSchema,
    CyclicSchema, DefaultValue, Definitions, IntersectSchema, Kind, Literal, Meta, Modifiers,
    NumberSchema, ObjectSchema, RecordKey, RecordSchema, StringSchema, INTEGER_KEY_PATTERN,
};
pub use references::References;

use crate::value::Value;

/// The node behind a [`Schema`] handle.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: Kind,
    pub meta: Meta,
    pub modifiers: Modifiers,
}

/// A shared, immutable schema node.
#[derive(Clone)]
pub struct Schema {
    node: Arc<Node>,
}

impl Deref for Schema {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.fmt(f)
    }
}

impl From<Kind> for Schema {
    fn from(kind: Kind) -> Self {
        Self::new(kind)
    }
}

impl Schema {
    pub fn new(kind: Kind) -> Self {
        Self {
            node: Arc::new(Node {
                kind,
                meta: Meta::default(),
                modifiers: Modifiers::default(),
            }),
        }
    }

    pub fn kind(&self) -> &Kind {
        &self.node.kind
    }

    pub fn meta(&self) -> &Meta {
        &self.node.meta
    }

    pub fn is_optional(&self) -> bool {
        self.node.modifiers.optional
    }

    pub fn is_readonly(&self) -> bool {
        self.node.modifiers.readonly
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.node.meta.default.as_ref()
    }

    /// True when both handles share one node.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Address of the shared node; stable for as long as any handle lives.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.node) as usize
    }

    /// Copy-on-write access to the node.
    pub fn with(mut self, adjust: impl FnOnce(&mut Node)) -> Self {
        adjust(Arc::make_mut(&mut self.node));
        self
    }

    // ─── Modifiers and metadata ──────────────────────────────────────

    pub fn optional(self) -> Self {
        self.with(|n| n.modifiers.optional = true)
    }

    pub fn readonly(self) -> Self {
        self.with(|n| n.modifiers.readonly = true)
    }

    pub fn with_default(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.with(|n| n.meta.default = Some(DefaultValue::Value(value)))
    }

    pub fn with_default_factory<F>(self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.with(|n| n.meta.default = Some(DefaultValue::Factory(Arc::new(factory))))
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.with(|n| n.meta.id = Some(id))
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.with(|n| n.meta.title = Some(title))
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.with(|n| n.meta.description = Some(description))
    }

    // ─── Constructors ────────────────────────────────────────────────

    pub fn any() -> Self {
        Self::new(Kind::Any)
    }

    pub fn unknown() -> Self {
        Self::new(Kind::Unknown)
    }

    pub fn never() -> Self {
        Self::new(Kind::Never)
    }

    pub fn string() -> Self {
        Self::new(Kind::String(StringSchema::default()))
    }

    pub fn number() -> Self {
        Self::new(Kind::Number(NumberSchema::default()))
    }

    pub fn integer() -> Self {
        Self::new(Kind::Integer(NumberSchema::default()))
    }

    pub fn boolean() -> Self {
        Self::new(Kind::Boolean)
    }

    pub fn null() -> Self {
        Self::new(Kind::Null)
    }

    pub fn undefined() -> Self {
        Self::new(Kind::Undefined)
    }

    pub fn bigint() -> Self {
        Self::new(Kind::BigInt(BigIntSchema::default()))
    }

    pub fn symbol() -> Self {
        Self::new(Kind::Symbol)
    }

    pub fn bytes() -> Self {
        Self::new(Kind::Bytes(BytesSchema::default()))
    }

    pub fn literal(literal: impl Into<Literal>) -> Self {
        Self::new(Kind::Literal(literal.into()))
    }

    pub fn enumeration<L, I>(values: I) -> Self
    where
        L: Into<Literal>,
        I: IntoIterator<Item = L>,
    {
        Self::new(Kind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn object<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Self::new(Kind::Object(ObjectSchema::new(properties)))
    }

    pub fn array(items: Schema) -> Self {
        Self::new(Kind::Array(ArraySchema::new(items)))
    }

    pub fn tuple(items: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(Kind::Tuple(items.into_iter().collect()))
    }

    pub fn record(key: RecordKey, value: Schema) -> Self {
        Self::new(Kind::Record(RecordSchema::new(key, value)))
    }

    /// Logical OR. Zero variants is `Never`; one variant is that variant.
    pub fn union(variants: impl IntoIterator<Item = Schema>) -> Self {
        let mut variants: Vec<Schema> = variants.into_iter().collect();
        match variants.len() {
            0 => Self::never(),
            1 => variants.remove(0),
            _ => Self::new(Kind::Union(variants)),
        }
    }

    /// Logical AND. Zero members is `Never`; one member is that member.
    pub fn intersect(members: impl IntoIterator<Item = Schema>) -> Self {
        Self::intersect_with(members, Additional::Unspecified)
    }

    /// Logical AND constraining keys no member evaluates.
    pub fn intersect_with(members: impl IntoIterator<Item = Schema>, unevaluated: Additional) -> Self {
        let mut members: Vec<Schema> = members.into_iter().collect();
        match (members.len(), &unevaluated) {
            (0, _) => Self::never(),
            (1, Additional::Unspecified) => members.remove(0),
            _ => Self::new(Kind::Intersect(IntersectSchema { members, unevaluated })),
        }
    }

    pub fn not(inner: Schema) -> Self {
        Self::new(Kind::Not(inner))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(Kind::Ref(name.into()))
    }

    pub fn this() -> Self {
        Self::new(Kind::This)
    }

    /// A definition table plus entry point.
    pub fn cyclic<K, I>(defs: I, entry: impl Into<String>) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Self::new(Kind::Cyclic(CyclicSchema {
            defs: defs.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            entry: entry.into(),
        }))
    }

    /// A self-recursive schema: `body` refers to itself through [`Schema::this`].
    pub fn recursive(body: Schema) -> Self {
        Self::cyclic([("Self", body)], "Self")
    }

    pub fn codec(inner: Schema, codec: impl Codec + 'static) -> Self {
        Self::new(Kind::Codec(CodecSchema {
            inner,
            codec: Arc::new(codec),
            output: None,
        }))
    }

    /// A codec whose decoded value must also satisfy `output`.
    pub fn codec_with_output(inner: Schema, codec: impl Codec + 'static, output: Schema) -> Self {
        Self::new(Kind::Codec(CodecSchema {
            inner,
            codec: Arc::new(codec),
            output: Some(output),
        }))
    }

    pub fn custom(name: impl Into<String>, options: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::new(Kind::Custom(CustomSchema {
            name: name.into(),
            options,
        }))
    }
}
