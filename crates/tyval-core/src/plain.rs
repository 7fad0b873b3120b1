//! # Plain-Data Serialization
//!
//! Schemas serialize to a JSON-Schema-like keyword object and parse back
//! from one. The round trip is deliberately lossy:
//!
//! - Kind tags are not written; parsing infers the kind from keywords.
//! - `optional` survives only as membership in the derived `required` list
//!   of the enclosing object; `readonly` is dropped.
//! - Codecs serialize as their inner (encoded) schema.
//! - Custom kinds serialize as their options; they parse back as `Any`.
//! - Factory defaults are dropped; literal defaults are kept.
//! - `This` is written as `{"$ref": "#"}`.
//!
//! A consumer that needs kind-accurate behavior after parsing must rebuild
//! custom kinds and codecs itself.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as Json};

use crate::config::DefaultedPropertyPolicy;
use crate::error::PlainError;
use crate::pointer;
use crate::schema::{
    Additional, ArraySchema, BigIntSchema, BytesSchema, DefaultValue, Kind, Literal, NumberSchema,
    ObjectSchema, RecordKey, RecordSchema, Schema, StringSchema, INTEGER_KEY_PATTERN,
};
use crate::value::Value;

const DEFS_PREFIX: &str = "#/$defs/";

impl Schema {
    /// Serialize to plain keyword data.
    pub fn to_plain(&self) -> Json {
        let mut out = match self.kind() {
            Kind::Codec(codec) => match codec.inner.to_plain() {
                Json::Object(map) => map,
                _ => Map::new(),
            },
            kind => kind_to_plain(kind),
        };
        let meta = self.meta();
        if let Some(id) = &meta.id {
            out.insert("$id".into(), json!(id));
        }
        if let Some(title) = &meta.title {
            out.insert("title".into(), json!(title));
        }
        if let Some(description) = &meta.description {
            out.insert("description".into(), json!(description));
        }
        if let Some(DefaultValue::Value(value)) = &meta.default {
            out.insert("default".into(), value.to_json());
        }
        Json::Object(out)
    }

    /// Parse plain keyword data.
    pub fn from_plain(plain: &Json) -> Result<Self, PlainError> {
        parse(plain, "")
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_plain().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let plain = Json::deserialize(deserializer)?;
        Schema::from_plain(&plain).map_err(D::Error::custom)
    }
}

// ─── Writing ─────────────────────────────────────────────────────────

fn typed(name: &str) -> Map<String, Json> {
    let mut map = Map::new();
    map.insert("type".into(), json!(name));
    map
}

fn put<T: Into<Json>>(map: &mut Map<String, Json>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.into(), value.into());
    }
}

fn bigint_json(n: i128) -> Json {
    i64::try_from(n).map(Json::from).unwrap_or_else(|_| Json::String(n.to_string()))
}

fn additional_json(additional: &Additional) -> Option<Json> {
    match additional {
        Additional::Unspecified => None,
        Additional::Allow => Some(Json::Bool(true)),
        Additional::Deny => Some(Json::Bool(false)),
        Additional::Schema(schema) => Some(schema.to_plain()),
    }
}

fn kind_to_plain(kind: &Kind) -> Map<String, Json> {
    match kind {
        Kind::Any | Kind::Unknown | Kind::Codec(_) => Map::new(),
        Kind::Never => {
            let mut map = Map::new();
            map.insert("not".into(), json!({}));
            map
        }
        Kind::String(s) => {
            let mut map = typed("string");
            put(&mut map, "minLength", s.min_length);
            put(&mut map, "maxLength", s.max_length);
            put(&mut map, "pattern", s.pattern.clone());
            put(&mut map, "format", s.format.clone());
            map
        }
        Kind::Number(n) => number_to_plain("number", n),
        Kind::Integer(n) => number_to_plain("integer", n),
        Kind::Boolean => typed("boolean"),
        Kind::Null => typed("null"),
        Kind::Undefined => typed("undefined"),
        Kind::Symbol => typed("symbol"),
        Kind::BigInt(b) => {
            let mut map = typed("bigint");
            put(&mut map, "minimum", b.minimum.map(bigint_json));
            put(&mut map, "maximum", b.maximum.map(bigint_json));
            put(&mut map, "exclusiveMinimum", b.exclusive_minimum.map(bigint_json));
            put(&mut map, "exclusiveMaximum", b.exclusive_maximum.map(bigint_json));
            put(&mut map, "multipleOf", b.multiple_of.map(bigint_json));
            map
        }
        Kind::Bytes(b) => {
            let mut map = typed("bytes");
            put(&mut map, "minByteLength", b.min_byte_length);
            put(&mut map, "maxByteLength", b.max_byte_length);
            map
        }
        Kind::Literal(literal) => {
            let mut map = Map::new();
            map.insert("const".into(), literal.to_value().to_json());
            map
        }
        Kind::Enum(literals) => {
            let mut map = Map::new();
            let values = literals.iter().map(|l| l.to_value().to_json()).collect();
            map.insert("enum".into(), Json::Array(values));
            map
        }
        Kind::Object(obj) => {
            let mut map = typed("object");
            let properties: Map<String, Json> = obj
                .properties
                .iter()
                .map(|(k, s)| (k.clone(), s.to_plain()))
                .collect();
            map.insert("properties".into(), Json::Object(properties));
            let required = obj.required_keys(DefaultedPropertyPolicy::Required);
            if !required.is_empty() {
                map.insert("required".into(), json!(required));
            }
            put(&mut map, "additionalProperties", additional_json(&obj.additional));
            put(&mut map, "minProperties", obj.min_properties);
            put(&mut map, "maxProperties", obj.max_properties);
            map
        }
        Kind::Array(arr) => {
            let mut map = typed("array");
            map.insert("items".into(), arr.items.to_plain());
            put(&mut map, "minItems", arr.min_items);
            put(&mut map, "maxItems", arr.max_items);
            if arr.unique_items {
                map.insert("uniqueItems".into(), Json::Bool(true));
            }
            put(&mut map, "contains", arr.contains.as_ref().map(Schema::to_plain));
            put(&mut map, "minContains", arr.min_contains);
            put(&mut map, "maxContains", arr.max_contains);
            map
        }
        Kind::Tuple(items) => {
            let mut map = typed("array");
            map.insert("items".into(), Json::Array(items.iter().map(Schema::to_plain).collect()));
            map.insert("additionalItems".into(), Json::Bool(false));
            map.insert("minItems".into(), json!(items.len()));
            map.insert("maxItems".into(), json!(items.len()));
            map
        }
        Kind::Record(record) => {
            let mut map = typed("object");
            let mut patterns = Map::new();
            patterns.insert(record.key.pattern().to_string(), record.value.to_plain());
            map.insert("patternProperties".into(), Json::Object(patterns));
            put(&mut map, "additionalProperties", additional_json(&record.additional));
            put(&mut map, "minProperties", record.min_properties);
            put(&mut map, "maxProperties", record.max_properties);
            map
        }
        Kind::Union(variants) => {
            let mut map = Map::new();
            map.insert("anyOf".into(), Json::Array(variants.iter().map(Schema::to_plain).collect()));
            map
        }
        Kind::Intersect(intersect) => {
            let mut map = Map::new();
            let members = intersect.members.iter().map(Schema::to_plain).collect();
            map.insert("allOf".into(), Json::Array(members));
            put(&mut map, "unevaluatedProperties", additional_json(&intersect.unevaluated));
            map
        }
        Kind::Not(inner) => {
            let mut map = Map::new();
            map.insert("not".into(), inner.to_plain());
            map
        }
        Kind::Ref(name) => {
            let mut map = Map::new();
            map.insert("$ref".into(), json!(name));
            map
        }
        Kind::This => {
            let mut map = Map::new();
            map.insert("$ref".into(), json!("#"));
            map
        }
        Kind::Cyclic(cyclic) => {
            let mut map = Map::new();
            let defs: Map<String, Json> = cyclic
                .defs
                .iter()
                .map(|(k, s)| (k.clone(), s.to_plain()))
                .collect();
            map.insert("$defs".into(), Json::Object(defs));
            map.insert("$ref".into(), json!(format!("{DEFS_PREFIX}{}", cyclic.entry)));
            map
        }
        Kind::Custom(custom) => custom.options.clone(),
    }
}

fn number_to_plain(name: &str, n: &NumberSchema) -> Map<String, Json> {
    let mut map = typed(name);
    put(&mut map, "minimum", n.minimum);
    put(&mut map, "maximum", n.maximum);
    put(&mut map, "exclusiveMinimum", n.exclusive_minimum);
    put(&mut map, "exclusiveMaximum", n.exclusive_maximum);
    put(&mut map, "multipleOf", n.multiple_of);
    map
}

// ─── Reading ─────────────────────────────────────────────────────────

struct Reader<'a> {
    map: &'a Map<String, Json>,
    path: &'a str,
}

impl<'a> Reader<'a> {
    fn invalid(&self, keyword: &str, expected: &'static str) -> PlainError {
        PlainError::InvalidKeyword {
            keyword: keyword.to_string(),
            path: self.path.to_string(),
            expected,
        }
    }

    fn usize(&self, keyword: &str) -> Result<Option<usize>, PlainError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(keyword, "a non-negative integer")),
        }
    }

    fn f64(&self, keyword: &str) -> Result<Option<f64>, PlainError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| self.invalid(keyword, "a number")),
        }
    }

    fn i128(&self, keyword: &str) -> Result<Option<i128>, PlainError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(Json::Number(n)) => n
                .as_i64()
                .map(|n| Some(i128::from(n)))
                .ok_or_else(|| self.invalid(keyword, "an integer")),
            Some(Json::String(s)) => s
                .parse::<i128>()
                .map(Some)
                .map_err(|_| self.invalid(keyword, "an integer")),
            Some(_) => Err(self.invalid(keyword, "an integer")),
        }
    }

    fn string(&self, keyword: &str) -> Result<Option<String>, PlainError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.invalid(keyword, "a string")),
        }
    }

    fn bool(&self, keyword: &str) -> Result<bool, PlainError> {
        match self.map.get(keyword) {
            None => Ok(false),
            Some(v) => v.as_bool().ok_or_else(|| self.invalid(keyword, "a boolean")),
        }
    }

    fn array(&self, keyword: &str) -> Result<Option<&'a Vec<Json>>, PlainError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(v) => v.as_array().map(Some).ok_or_else(|| self.invalid(keyword, "an array")),
        }
    }

    fn object(&self, keyword: &str) -> Result<Option<&'a Map<String, Json>>, PlainError> {
        match self.map.get(keyword) {
            None => Ok(None),
            Some(v) => v.as_object().map(Some).ok_or_else(|| self.invalid(keyword, "an object")),
        }
    }

    fn schema(&self, keyword: &str) -> Result<Option<Schema>, PlainError> {
        self.map
            .get(keyword)
            .map(|v| parse(v, &pointer::push(self.path, keyword)))
            .transpose()
    }

    fn schemas(&self, keyword: &str) -> Result<Option<Vec<Schema>>, PlainError> {
        let Some(items) = self.array(keyword)? else {
            return Ok(None);
        };
        let base = pointer::push(self.path, keyword);
        items
            .iter()
            .enumerate()
            .map(|(i, v)| parse(v, &pointer::push(&base, &i.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn additional(&self, keyword: &str) -> Result<Additional, PlainError> {
        Ok(match self.map.get(keyword) {
            None => Additional::Unspecified,
            Some(Json::Bool(true)) => Additional::Allow,
            Some(Json::Bool(false)) => Additional::Deny,
            Some(v) => Additional::Schema(parse(v, &pointer::push(self.path, keyword))?),
        })
    }

    fn literal(&self, keyword: &str, v: &Json) -> Result<Literal, PlainError> {
        match v {
            Json::String(s) => Ok(Literal::String(s.clone())),
            Json::Bool(b) => Ok(Literal::Boolean(*b)),
            Json::Number(n) => n
                .as_f64()
                .map(Literal::Number)
                .ok_or_else(|| self.invalid(keyword, "a string, number or boolean")),
            _ => Err(self.invalid(keyword, "a string, number or boolean")),
        }
    }
}

fn ref_name(reference: &str) -> &str {
    reference.strip_prefix(DEFS_PREFIX).unwrap_or(reference)
}

fn parse(plain: &Json, path: &str) -> Result<Schema, PlainError> {
    let map = match plain {
        Json::Bool(true) => return Ok(Schema::any()),
        Json::Bool(false) => return Ok(Schema::never()),
        Json::Object(map) => map,
        _ => {
            return Err(PlainError::NotASchema {
                path: path.to_string(),
            })
        }
    };
    let r = Reader { map, path };
    let schema = parse_kind(&r)?;
    let mut schema = match r.string("$id")? {
        Some(id) => schema.with_id(id),
        None => schema,
    };
    if let Some(title) = r.string("title")? {
        schema = schema.with_title(title);
    }
    if let Some(description) = r.string("description")? {
        schema = schema.with_description(description);
    }
    if let Some(default) = map.get("default") {
        schema = schema.with_default(Value::from(default.clone()));
    }
    Ok(schema)
}

fn parse_kind(r: &Reader<'_>) -> Result<Schema, PlainError> {
    if let Some(defs) = r.object("$defs")? {
        let base = pointer::push(r.path, "$defs");
        let mut table = Vec::with_capacity(defs.len());
        for (name, def) in defs {
            table.push((name.clone(), parse(def, &pointer::push(&base, name))?));
        }
        let entry = r.string("$ref")?.ok_or_else(|| r.invalid("$ref", "an entry reference"))?;
        return Ok(Schema::cyclic(table, ref_name(&entry)));
    }
    if let Some(reference) = r.string("$ref")? {
        return Ok(if reference == "#" {
            Schema::this()
        } else {
            Schema::reference(ref_name(&reference))
        });
    }
    if let Some(constant) = r.map.get("const") {
        return Ok(Schema::literal(r.literal("const", constant)?));
    }
    if let Some(values) = r.array("enum")? {
        let literals = values
            .iter()
            .map(|v| r.literal("enum", v))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Schema::new(Kind::Enum(literals)));
    }
    if let Some(variants) = r.schemas("anyOf")? {
        return Ok(Schema::union(variants));
    }
    if let Some(members) = r.schemas("allOf")? {
        return Ok(Schema::intersect_with(members, r.additional("unevaluatedProperties")?));
    }
    if let Some(inner) = r.map.get("not") {
        if inner.as_object().is_some_and(Map::is_empty) {
            return Ok(Schema::never());
        }
        return Ok(Schema::not(parse(inner, &pointer::push(r.path, "not"))?));
    }
    let Some(type_name) = r.string("type")? else {
        return Ok(Schema::any());
    };
    let kind = match type_name.as_str() {
        "string" => Kind::String(StringSchema {
            min_length: r.usize("minLength")?,
            max_length: r.usize("maxLength")?,
            pattern: r.string("pattern")?,
            format: r.string("format")?,
        }),
        "number" => Kind::Number(parse_number(r)?),
        "integer" => Kind::Integer(parse_number(r)?),
        "boolean" => Kind::Boolean,
        "null" => Kind::Null,
        "undefined" => Kind::Undefined,
        "symbol" => Kind::Symbol,
        "bigint" => Kind::BigInt(BigIntSchema {
            minimum: r.i128("minimum")?,
            maximum: r.i128("maximum")?,
            exclusive_minimum: r.i128("exclusiveMinimum")?,
            exclusive_maximum: r.i128("exclusiveMaximum")?,
            multiple_of: r.i128("multipleOf")?,
        }),
        "bytes" => Kind::Bytes(BytesSchema {
            min_byte_length: r.usize("minByteLength")?,
            max_byte_length: r.usize("maxByteLength")?,
        }),
        "object" => parse_object(r)?,
        "array" => parse_array(r)?,
        other => {
            return Err(PlainError::UnknownType {
                name: other.to_string(),
                path: r.path.to_string(),
            })
        }
    };
    Ok(Schema::new(kind))
}

fn parse_number(r: &Reader<'_>) -> Result<NumberSchema, PlainError> {
    Ok(NumberSchema {
        minimum: r.f64("minimum")?,
        maximum: r.f64("maximum")?,
        exclusive_minimum: r.f64("exclusiveMinimum")?,
        exclusive_maximum: r.f64("exclusiveMaximum")?,
        multiple_of: r.f64("multipleOf")?,
    })
}

fn parse_object(r: &Reader<'_>) -> Result<Kind, PlainError> {
    let patterns = r.object("patternProperties")?;
    if let (Some(patterns), None) = (patterns, r.map.get("properties")) {
        if patterns.len() == 1 {
            if let Some((pattern, value)) = patterns.iter().next() {
                let key = match pattern.as_str() {
                    "^.*$" => RecordKey::String,
                    INTEGER_KEY_PATTERN => RecordKey::Integer,
                    other => RecordKey::Pattern(other.to_string()),
                };
                let value_path = pointer::push(&pointer::push(r.path, "patternProperties"), pattern);
                let mut record = RecordSchema::new(key, parse(value, &value_path)?);
                record.additional = r.additional("additionalProperties")?;
                record.min_properties = r.usize("minProperties")?;
                record.max_properties = r.usize("maxProperties")?;
                return Ok(Kind::Record(record));
            }
        }
    }
    let required: Vec<&str> = r
        .array("required")?
        .map(|keys| keys.iter().filter_map(Json::as_str).collect())
        .unwrap_or_default();
    let mut properties = Vec::new();
    if let Some(props) = r.object("properties")? {
        let base = pointer::push(r.path, "properties");
        for (key, plain) in props {
            let schema = parse(plain, &pointer::push(&base, key))?;
            let schema = if required.contains(&key.as_str()) {
                schema
            } else {
                schema.optional()
            };
            properties.push((key.clone(), schema));
        }
    }
    let mut obj = ObjectSchema::new(properties).with_additional(r.additional("additionalProperties")?);
    obj.min_properties = r.usize("minProperties")?;
    obj.max_properties = r.usize("maxProperties")?;
    Ok(Kind::Object(obj))
}

fn parse_array(r: &Reader<'_>) -> Result<Kind, PlainError> {
    if let Some(Json::Array(_)) = r.map.get("items") {
        let items = r.schemas("items")?.unwrap_or_default();
        return Ok(Kind::Tuple(items));
    }
    if let Some(items) = r.schemas("prefixItems")? {
        return Ok(Kind::Tuple(items));
    }
    let items = r.schema("items")?.unwrap_or_else(Schema::any);
    let mut arr = ArraySchema::new(items);
    arr.min_items = r.usize("minItems")?;
    arr.max_items = r.usize("maxItems")?;
    arr.unique_items = r.bool("uniqueItems")?;
    arr.contains = r.schema("contains")?;
    arr.min_contains = r.usize("minContains")?;
    arr.max_contains = r.usize("maxContains")?;
    Ok(Kind::Array(arr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FnCodec;

    #[test]
    fn test_object_required_is_derived() {
        let schema = Schema::object([
            ("x", Schema::number()),
            ("y", Schema::string().optional()),
        ]);
        let plain = schema.to_plain();
        assert_eq!(plain["required"], json!(["x"]));
        assert!(plain.get("optional").is_none());
        assert!(plain["properties"]["y"].get("optional").is_none());
    }

    #[test]
    fn test_reparse_restores_optional_from_required() {
        let schema = Schema::object([
            ("x", Schema::number()),
            ("y", Schema::string().optional()),
        ]);
        let back = Schema::from_plain(&schema.to_plain()).unwrap();
        let Kind::Object(obj) = back.kind() else { panic!("expected object") };
        assert!(!obj.properties["x"].is_optional());
        assert!(obj.properties["y"].is_optional());
    }

    #[test]
    fn test_codec_serializes_as_inner() {
        let codec = FnCodec::new("id", |v: Value| Ok(v), |v: Value| Ok(v));
        let schema = Schema::codec(Schema::string(), codec).with_title("When");
        assert_eq!(schema.to_plain(), json!({"type": "string", "title": "When"}));
    }

    #[test]
    fn test_custom_kind_is_lost() {
        let mut options = Map::new();
        options.insert("divisor".into(), json!(2));
        let schema = Schema::custom("Even", options);
        assert_eq!(schema.to_plain(), json!({"divisor": 2}));
        let back = Schema::from_plain(&schema.to_plain()).unwrap();
        assert!(matches!(back.kind(), Kind::Any));
    }

    #[test]
    fn test_cyclic_and_this() {
        let schema = Schema::recursive(Schema::object([("next", Schema::this().optional())]));
        let plain = schema.to_plain();
        assert_eq!(plain["$ref"], json!("#/$defs/Self"));
        assert_eq!(plain["$defs"]["Self"]["properties"]["next"], json!({"$ref": "#"}));
        let back = Schema::from_plain(&plain).unwrap();
        let Kind::Cyclic(c) = back.kind() else { panic!("expected cyclic") };
        assert_eq!(c.entry, "Self");
    }

    #[test]
    fn test_record_and_tuple_inference() {
        let record = Schema::record(RecordKey::Integer, Schema::boolean());
        let back = Schema::from_plain(&record.to_plain()).unwrap();
        let Kind::Record(r) = back.kind() else { panic!("expected record") };
        assert_eq!(r.key, RecordKey::Integer);

        let tuple = Schema::tuple([Schema::string(), Schema::number()]);
        let back = Schema::from_plain(&tuple.to_plain()).unwrap();
        assert!(matches!(back.kind(), Kind::Tuple(items) if items.len() == 2));
    }

    #[test]
    fn test_literal_default_kept_factory_dropped() {
        let a = Schema::number().with_default(3.0);
        assert_eq!(a.to_plain()["default"], json!(3));
        let b = Schema::number().with_default_factory(|| Value::Number(3.0));
        assert!(b.to_plain().get("default").is_none());
    }

    #[test]
    fn test_malformed_plain_data() {
        let err = Schema::from_plain(&json!({"type": "string", "minLength": "3"})).unwrap_err();
        assert!(matches!(err, PlainError::InvalidKeyword { ref keyword, .. } if keyword == "minLength"));
        let err = Schema::from_plain(&json!({"type": "date"})).unwrap_err();
        assert!(matches!(err, PlainError::UnknownType { .. }));
        let err = Schema::from_plain(&json!({"properties": {"a": 3}, "type": "object"})).unwrap_err();
        assert_eq!(err, PlainError::NotASchema { path: "/properties/a".into() });
    }

    #[test]
    fn test_serde_roundtrip_through_string() {
        let schema = Schema::union([Schema::literal("A"), Schema::literal("B")]);
        let text = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&text).unwrap();
        assert_eq!(back.to_plain(), schema.to_plain());
    }
}
