//! Parameter values, canonical text and symbol naming
//!
//! Specialization caching keys on a deterministic JSON-equivalent encoding
//! of the parameter values: mapping keys sort lexicographically, separators
//! are compact and strings escape the way `serde_json` escapes them, so
//! equal abstract values always canonicalize to equal bytes. The short
//! content hash used in symbol names is the first 8 lowercase hex digits of
//! the SHA-256 of that text.

use crate::error::{DesignError, Error};

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The canonicalisable parameter subset: null, booleans, integers,
/// strings, sequences and string-keyed mappings. The closed enum is the
/// restriction — values outside the subset are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Absent value, canonicalizes to `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer, base-10 in the canonical text.
    Int(i128),
    /// UTF-8 string, JSON-escaped in the canonical text.
    Str(String),
    /// Ordered sequence.
    List(Vec<ParamValue>),
    /// String-keyed mapping; keys emit in lexicographic order.
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Write the canonical text of this value.
    pub fn canon_text(&self) -> String {
        let mut out = String::new();
        self.write_canon(&mut out);
        out
    }

    fn write_canon(&self, out: &mut String) {
        match self {
            ParamValue::Null => out.push_str("null"),
            ParamValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ParamValue::Int(i) => out.push_str(&i.to_string()),
            ParamValue::Str(s) => push_json_str(out, s),
            ParamValue::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_canon(out);
                }
                out.push(']');
            }
            ParamValue::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    push_json_str(out, key);
                    out.push(':');
                    value.write_canon(out);
                }
                out.push('}');
            }
        }
    }
}

/// JSON-escape a string into the output, quotes included.
fn push_json_str(out: &mut String, s: &str) {
    out.push_str(&serde_json::Value::from(s).to_string());
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<i128> for ParamValue {
    fn from(v: i128) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(v: Vec<T>) -> Self {
        ParamValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// A named parameter set, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// An empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Whether a value is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Canonical text of the whole set, as a mapping.
    pub fn canon_text(&self) -> String {
        ParamValue::Map(self.0.clone()).canon_text()
    }

    fn require(&self, name: &str) -> Result<&ParamValue, Error> {
        self.get(name).ok_or_else(|| {
            DesignError::UnboundParam {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// A `u32` parameter, the common shape of widths and stage counts.
    pub fn u32(&self, name: &str) -> Result<u32, Error> {
        match self.require(name)? {
            ParamValue::Int(i) => u32::try_from(*i).map_err(|_| {
                DesignError::BadParamType {
                    name: name.to_string(),
                    expected: "a u32",
                }
                .into()
            }),
            _ => Err(DesignError::BadParamType {
                name: name.to_string(),
                expected: "a u32",
            }
            .into()),
        }
    }

    /// A `u64` parameter.
    pub fn u64(&self, name: &str) -> Result<u64, Error> {
        match self.require(name)? {
            ParamValue::Int(i) => u64::try_from(*i).map_err(|_| {
                DesignError::BadParamType {
                    name: name.to_string(),
                    expected: "a u64",
                }
                .into()
            }),
            _ => Err(DesignError::BadParamType {
                name: name.to_string(),
                expected: "a u64",
            }
            .into()),
        }
    }

    /// A signed integer parameter.
    pub fn i128(&self, name: &str) -> Result<i128, Error> {
        match self.require(name)? {
            ParamValue::Int(i) => Ok(*i),
            _ => Err(DesignError::BadParamType {
                name: name.to_string(),
                expected: "an integer",
            }
            .into()),
        }
    }

    /// A boolean parameter.
    pub fn bool(&self, name: &str) -> Result<bool, Error> {
        match self.require(name)? {
            ParamValue::Bool(b) => Ok(*b),
            _ => Err(DesignError::BadParamType {
                name: name.to_string(),
                expected: "a bool",
            }
            .into()),
        }
    }

    /// A string parameter.
    pub fn str(&self, name: &str) -> Result<&str, Error> {
        match self.require(name)? {
            ParamValue::Str(s) => Ok(s.as_str()),
            _ => Err(DesignError::BadParamType {
                name: name.to_string(),
                expected: "a string",
            }
            .into()),
        }
    }
}

/// First 8 lowercase hex digits of the SHA-256 of the canonical text.
pub fn hash8(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// The combined params/ports signature hashed into derived symbol names.
pub(crate) fn cache_sig(params_json: &str, ports_json: &str) -> String {
    format!("{{\"params\":{params_json},\"ports\":{ports_json}}}")
}

/// Derive a module symbol: a user-supplied name verbatim, otherwise the
/// base name suffixed with the short content hash.
pub(crate) fn symbol_for(base: &str, sig: &str, module_name: Option<&str>) -> String {
    match module_name {
        Some(name) => name.to_string(),
        None => format!("{base}__p{}", hash8(sig)),
    }
}

/// Signature-bound port spec: a port pre-declared on the module from the
/// specialization request rather than by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    /// A clock port, width 1.
    Clock,
    /// A reset port, width 1.
    Reset,
    /// A data port of the given width.
    Wire {
        /// Port width.
        width: u32,
        /// Signed interpretation.
        signed: bool,
    },
}

impl PortSpec {
    /// The canonical value encoding of the spec, matching the mapping
    /// shape used for parameters.
    pub(crate) fn to_param(&self) -> ParamValue {
        let mut map = BTreeMap::new();
        match self {
            PortSpec::Clock => {
                map.insert("kind".to_string(), ParamValue::from("clock"));
            }
            PortSpec::Reset => {
                map.insert("kind".to_string(), ParamValue::from("reset"));
            }
            PortSpec::Wire { width, signed } => {
                map.insert("kind".to_string(), ParamValue::from("wire"));
                map.insert("ty".to_string(), ParamValue::from(format!("i{width}")));
                map.insert("signed".to_string(), ParamValue::from(*signed));
            }
        }
        ParamValue::Map(map)
    }
}

/// Ordered port-spec set keyed by port name.
pub type PortSpecs = BTreeMap<String, PortSpec>;

/// Canonical text of a port-spec set; the empty set encodes as `{}`.
pub(crate) fn port_specs_text(specs: Option<&PortSpecs>) -> String {
    match specs {
        None => "{}".to_string(),
        Some(specs) => {
            let map = specs
                .iter()
                .map(|(name, spec)| (name.clone(), spec.to_param()))
                .collect();
            ParamValue::Map(map).canon_text()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ParamValue::Null, "null")]
    #[case(ParamValue::Bool(true), "true")]
    #[case(ParamValue::Bool(false), "false")]
    #[case(ParamValue::Int(-17), "-17")]
    #[case(ParamValue::Int(1 << 80), "1208925819614629174706176")]
    #[case(ParamValue::Str("ok".to_string()), "\"ok\"")]
    fn scalars_canonicalize_to_json_text(#[case] value: ParamValue, #[case] expected: &str) {
        assert_eq!(value.canon_text(), expected);
    }

    #[test]
    fn canonical_text_sorts_mapping_keys() {
        let a = Params::new().with("b", 2).with("a", 1);
        let b = Params::new().with("a", 1).with("b", 2);
        assert_eq!(a.canon_text(), b.canon_text());
        assert_eq!(a.canon_text(), "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn canonical_text_uses_compact_separators() {
        let p = Params::new()
            .with("xs", vec![2, 3])
            .with("name", "adder")
            .with("wide", true);
        assert_eq!(
            p.canon_text(),
            "{\"name\":\"adder\",\"wide\":true,\"xs\":[2,3]}"
        );
    }

    #[test]
    fn strings_escape_like_json() {
        let p = ParamValue::Str("a\"b\\c\n".to_string());
        assert_eq!(p.canon_text(), "\"a\\\"b\\\\c\\n\"");
    }

    #[test]
    fn equal_abstract_values_canonicalize_identically() {
        let mut left = BTreeMap::new();
        left.insert("k".to_string(), ParamValue::from(vec![1, 2]));
        let mut right = BTreeMap::new();
        right.insert("k".to_string(), ParamValue::List(vec![1.into(), 2.into()]));
        assert_eq!(
            ParamValue::Map(left).canon_text(),
            ParamValue::Map(right).canon_text()
        );
    }

    #[test]
    fn hash8_is_stable_and_short() {
        let h = hash8("{\"a\":1}");
        assert_eq!(h.len(), 8);
        assert_eq!(h, hash8("{\"a\":1}"));
        assert_ne!(h, hash8("{\"a\":2}"));
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn symbols_derive_from_the_combined_signature() {
        let sig = cache_sig("{\"w\":8}", "{}");
        let sym = symbol_for("incr", &sig, None);
        assert!(sym.starts_with("incr__p"));
        assert_eq!(sym.len(), "incr__p".len() + 8);
        assert_eq!(symbol_for("incr", &sig, Some("Custom")), "Custom");
    }

    #[test]
    fn typed_accessors_reject_mismatched_shapes() {
        let p = Params::new().with("w", 8).with("name", "x");
        assert_eq!(p.u32("w").unwrap(), 8);
        assert!(p.bool("w").is_err());
        assert!(p.str("w").is_err());
        assert!(p.u32("missing").is_err());
        assert_eq!(p.str("name").unwrap(), "x");
    }
}
