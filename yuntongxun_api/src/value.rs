//! Response values: a tagged tree of strings, scalars, sequences and [`AttrMap`]s.
//!
//! [`AttrMap`] is a plain string-keyed map whose keys double as named fields:
//! [`AttrMap::field`] and [`AttrMap::get`] read the same slot, and so do
//! [`AttrMap::set_field`]/[`AttrMap::insert`] and
//! [`AttrMap::remove_field`]/[`AttrMap::remove`]. Named access is checked at
//! runtime and fails with [`Error::MissingField`] for an absent key.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::ops::Index;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

use crate::Error;

/// A node of a decoded response.
///
/// XML responses only produce `String`, `List` and `Map`. JSON responses keep
/// their scalar kinds.
///
/// Serializes as plain JSON, except that a `Tuple` is written as a one-entry
/// object `{"$tuple": [...]}` so that restoring saved state yields a `Tuple`
/// again rather than a `List`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Growable sequence.
    List(Vec<Value>),
    /// Fixed-size sequence.
    Tuple(Box<[Value]>),
    Map(AttrMap),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut AttrMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Elements of a `List` or a `Tuple`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            Self::Tuple(items) => Some(&items[..]),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "map",
        }
    }
}

/// Object key marking a serialized [`Value::Tuple`].
pub const TUPLE_KEY: &str = "$tuple";

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
            Self::Tuple(items) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(TUPLE_KEY, &items[..])?;
                map.end()
            }
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON-like value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Number(n.into()))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Value, E> {
        Ok(Value::Number(n.into()))
    }

    fn visit_f64<E: de::Error>(self, n: f64) -> Result<Value, E> {
        Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| E::custom("non-finite number"))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut entries = BTreeMap::new();
        let mut tuple: Option<Vec<Value>> = None;
        while let Some(key) = access.next_key::<String>()? {
            if key == TUPLE_KEY {
                tuple = Some(access.next_value()?);
            } else {
                entries.insert(key, access.next_value()?);
            }
        }
        match tuple {
            Some(items) if entries.is_empty() => Ok(Value::Tuple(items.into_boxed_slice())),
            Some(items) => {
                entries.insert(TUPLE_KEY.to_string(), Value::List(items));
                Ok(Value::Map(entries.into()))
            }
            None => Ok(Value::Map(entries.into())),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl<const N: usize> From<[Value; N]> for Value {
    fn from(items: [Value; N]) -> Self {
        Self::Tuple(Box::new(items))
    }
}

impl From<AttrMap> for Value {
    fn from(map: AttrMap) -> Self {
        Self::Map(map)
    }
}

/// Recursively wraps decoded JSON: objects become [`AttrMap`]s, arrays become lists.
impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(map) => Self::Map(map.into_iter().collect()),
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => JsonValue::Number(n),
            Value::String(s) => JsonValue::String(s),
            Value::List(items) => JsonValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Tuple(items) => {
                JsonValue::Array(items.into_vec().into_iter().map(Into::into).collect())
            }
            Value::Map(map) => map.into(),
        }
    }
}

/// A string-keyed map whose keys are also readable and writable as named fields.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrMap(BTreeMap<String, Value>);

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Inserts `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Named-field read. Fails with [`Error::MissingField`] if `name` is absent.
    pub fn field(&self, name: &str) -> Result<&Value, Error> {
        self.0
            .get(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut Value, Error> {
        self.0
            .get_mut(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    /// Named-field write; identical to [`AttrMap::insert`].
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.insert(name, value)
    }

    /// Named-field delete. Fails with [`Error::MissingField`] if `name` is absent.
    pub fn remove_field(&mut self, name: &str) -> Result<Value, Error> {
        self.0
            .remove(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    /// Named-field read of a string value.
    pub fn text(&self, name: &str) -> Result<&str, Error> {
        let value = self.field(name)?;
        value.as_str().ok_or_else(|| {
            Error::UnexpectedShape(format!("field \"{}\" is a {}, not a string", name, value.kind()))
        })
    }

    /// Follows a dotted chain of named fields, e.g. `"templateSMS.smsMessageSid"`.
    pub fn path(&self, dotted: &str) -> Result<&Value, Error> {
        let mut parts = dotted.split('.');
        let first = parts.next().unwrap_or_default();
        let mut current = self.field(first)?;
        let mut walked = first.to_string();
        for part in parts {
            let map = current.as_map().ok_or_else(|| {
                Error::UnexpectedShape(format!("field \"{}\" is a {}, not a map", walked, current.kind()))
            })?;
            walked.push('.');
            walked.push_str(part);
            current = map.get(part).ok_or_else(|| Error::MissingField(walked.clone()))?;
        }
        Ok(current)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl fmt::Debug for AttrMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttrMap(")?;
        f.debug_map().entries(self.0.iter()).finish()?;
        write!(f, ")")
    }
}

/// Renders as `AttrMap(<compact JSON>)`.
impl fmt::Display for AttrMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        write!(f, "AttrMap({})", json)
    }
}

impl Index<&str> for AttrMap {
    type Output = Value;

    /// # Panics
    ///
    /// Panics if `key` is absent; use [`AttrMap::field`] for a fallible lookup.
    fn index(&self, key: &str) -> &Value {
        &self.0[key]
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for AttrMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for AttrMap {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttrMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for AttrMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<AttrMap> for BTreeMap<String, Value> {
    fn from(map: AttrMap) -> Self {
        map.0
    }
}

impl From<AttrMap> for JsonValue {
    fn from(map: AttrMap) -> Self {
        JsonValue::Object(map.0.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Wraps a decoded JSON object. Anything other than an object is an
/// [`Error::UnexpectedShape`].
impl TryFrom<JsonValue> for AttrMap {
    type Error = Error;

    fn try_from(json: JsonValue) -> Result<Self, Self::Error> {
        match Value::from(json) {
            Value::Map(map) => Ok(map),
            other => Err(Error::UnexpectedShape(format!(
                "expected an object, got a {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> AttrMap {
        AttrMap::try_from(json!({
            "statusCode": "000000",
            "templateSMS": {
                "dateCreated": "20140416142030",
                "smsMessageSid": "ff8080813c373cab013c94b0f0512345"
            },
            "records": [{"id": "1"}, {"id": "2"}],
            "count": 2,
            "closed": false,
            "extra": null
        }))
        .unwrap()
    }

    #[test]
    fn key_and_field_access_agree() {
        let map = sample();
        for key in ["statusCode", "templateSMS", "records", "count", "closed", "extra"] {
            assert_eq!(map.get(key), Some(map.field(key).unwrap()));
            assert_eq!(&map[key], map.field(key).unwrap());
        }

        let inner = map.field("templateSMS").unwrap().as_map().unwrap();
        assert_eq!(inner.get("smsMessageSid"), Some(inner.field("smsMessageSid").unwrap()));

        let records = map["records"].as_list().unwrap();
        assert_eq!(records[1].as_map().unwrap().text("id").unwrap(), "2");
        assert_eq!(map["count"].as_i64(), Some(2));
        assert_eq!(map["closed"].as_bool(), Some(false));
        assert!(map["extra"].is_null());
    }

    #[test]
    fn writes_are_visible_through_both_views() {
        let mut map = sample();

        map.set_field("statusMsg", "ok");
        assert_eq!(map.get("statusMsg"), Some(&Value::from("ok")));

        map.insert("statusCode", "160003");
        assert_eq!(map.text("statusCode").unwrap(), "160003");

        *map.field_mut("count").unwrap() = Value::from(3);
        assert_eq!(map.get("count").and_then(Value::as_i64), Some(3));

        map.remove("closed");
        assert!(matches!(map.field("closed"), Err(Error::MissingField(name)) if name == "closed"));

        map.remove_field("extra").unwrap();
        assert!(!map.contains_key("extra"));
        assert!(matches!(map.remove_field("extra"), Err(Error::MissingField(_))));
    }

    #[test]
    fn nested_mutation_through_field() {
        let mut map = sample();
        map.field_mut("templateSMS")
            .unwrap()
            .as_map_mut()
            .unwrap()
            .set_field("dateCreated", "20240101000000");
        assert_eq!(
            map.path("templateSMS.dateCreated").unwrap().as_str(),
            Some("20240101000000")
        );
    }

    #[test]
    fn dotted_path_errors() {
        let map = sample();
        assert!(matches!(
            map.path("templateSMS.missing"),
            Err(Error::MissingField(p)) if p == "templateSMS.missing"
        ));
        assert!(matches!(
            map.path("statusCode.inner"),
            Err(Error::UnexpectedShape(_))
        ));
        assert!(matches!(map.text("records"), Err(Error::UnexpectedShape(_))));
    }

    #[test]
    fn tuples_are_fixed_sequences() {
        let value = Value::from([Value::from("a"), Value::from(1)]);
        assert_eq!(value.kind(), "tuple");
        assert_eq!(value.as_list().unwrap().len(), 2);
        assert_eq!(JsonValue::from(value), json!(["a", 1]));
    }

    #[test]
    fn debug_and_display_name_the_type() {
        let map: AttrMap = [("a", "x")].into_iter().collect();
        assert_eq!(format!("{:?}", map), r#"AttrMap({"a": String("x")})"#);
        assert_eq!(map.to_string(), r#"AttrMap({"a":"x"})"#);
    }

    #[test]
    fn plain_state_round_trip() {
        let map = sample();
        let state = serde_json::to_string(&map).unwrap();
        let restored: AttrMap = serde_json::from_str(&state).unwrap();
        assert_eq!(restored, map);

        let plain: BTreeMap<String, Value> = map.clone().into();
        assert_eq!(AttrMap::from(plain), map);
        assert_eq!(AttrMap::try_from(JsonValue::from(map.clone())).unwrap(), map);
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(matches!(
            AttrMap::try_from(json!([1, 2])),
            Err(Error::UnexpectedShape(_))
        ));
    }

    #[test]
    fn tuple_survives_state_round_trip() {
        let mut map = sample();
        map.insert("pair", Value::from([Value::from("a"), Value::from("b")]));
        map.insert(
            "nested",
            Value::List(vec![Value::from([Value::from(1), Value::Null])]),
        );

        let state = serde_json::to_string(&map).unwrap();
        let restored: AttrMap = serde_json::from_str(&state).unwrap();
        assert_eq!(restored, map);
        assert_eq!(restored["pair"].kind(), "tuple");
        assert_eq!(restored["nested"].as_list().unwrap()[0].kind(), "tuple");
    }

    #[test]
    fn tuple_marker_with_siblings_stays_a_map() {
        let restored: AttrMap =
            serde_json::from_str(r#"{"m": {"$tuple": [1], "other": "x"}}"#).unwrap();
        let inner = restored["m"].as_map().unwrap();
        assert_eq!(inner[TUPLE_KEY].kind(), "list");
        assert_eq!(inner.text("other").unwrap(), "x");
    }

    mod properties {
        use super::*;
        use proptest::collection::{btree_map, vec};
        use proptest::prelude::*;

        fn value_tree() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(Value::from),
                "[a-zA-Z0-9 ]{0,8}".prop_map(Value::from),
            ];
            leaf.prop_recursive(4, 48, 4, |inner| {
                prop_oneof![
                    vec(inner.clone(), 0..4).prop_map(Value::List),
                    vec(inner.clone(), 0..4).prop_map(|items| Value::Tuple(items.into_boxed_slice())),
                    btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|m| Value::Map(m.into())),
                ]
            })
        }

        fn attr_map() -> impl Strategy<Value = AttrMap> {
            btree_map("[a-z]{1,6}", value_tree(), 0..6).prop_map(AttrMap::from)
        }

        /// Key and field views agree on every map reachable from `value`.
        fn assert_views_agree(value: &Value) {
            match value {
                Value::Map(map) => {
                    for (key, item) in map {
                        assert_eq!(map.get(key), Some(item));
                        assert_eq!(map.field(key).unwrap(), item);
                        assert_eq!(&map[key.as_str()], item);
                        assert_views_agree(item);
                    }
                }
                Value::List(_) | Value::Tuple(_) => {
                    for item in value.as_list().unwrap() {
                        assert_views_agree(item);
                    }
                }
                _ => {}
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn key_and_field_views_agree(map in attr_map()) {
                assert_views_agree(&Value::Map(map));
            }

            #[test]
            fn state_round_trip_is_lossless(map in attr_map()) {
                let state = serde_json::to_string(&map).unwrap();
                let restored: AttrMap = serde_json::from_str(&state).unwrap();
                prop_assert_eq!(restored, map);
            }

            #[test]
            fn writes_and_deletes_show_through_both_views(
                mut map in attr_map(),
                key in "[a-z]{1,6}",
                value in value_tree(),
                other in value_tree(),
            ) {
                map.set_field(key.as_str(), value.clone());
                prop_assert_eq!(map.get(&key), Some(&value));

                map.insert(key.as_str(), other.clone());
                prop_assert_eq!(map.field(&key).unwrap(), &other);

                *map.field_mut(&key).unwrap() = value.clone();
                prop_assert_eq!(&map[key.as_str()], &value);

                prop_assert_eq!(map.remove_field(&key).unwrap(), value);
                prop_assert!(map.get(&key).is_none());
                prop_assert!(matches!(map.field(&key), Err(Error::MissingField(_))));
            }

            #[test]
            fn wrapping_json_keeps_every_leaf(map in attr_map()) {
                // Tuples export as JSON arrays and wrap back as lists, so compare JSON forms.
                let json = JsonValue::from(map.clone());
                let wrapped = AttrMap::try_from(json.clone()).unwrap();
                prop_assert_eq!(JsonValue::from(wrapped.clone()), json);
                assert_views_agree(&Value::Map(wrapped));
            }
        }
    }
}
