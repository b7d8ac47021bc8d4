//! The raw and normalized schema shapes.
//!
//! [`RawItem`] is the parsed-definition list an external `.proto` parser
//! (or the JSON interchange parser) hands to the pipeline. [`Def`] is the
//! output of normalization: flat, absolutely named, reference-resolved
//! definitions that the topological sort reorders and the lowering step
//! turns into runtime tables.

use serde::{Deserialize, Serialize};

use protopod_schema::defs::{DefaultVal, Occurrence, ScalarType};

/// One element of a parsed schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawItem {
    /// `package pkg;`, scoping every following item of the same file.
    Package(String),
    /// `import "other.defs";`, consumed by the import resolver.
    Import(String),
    Enum(RawEnum),
    Msg(RawMsg),
    Extend(RawExtend),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEnum {
    pub name: String,
    pub symbols: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMsg {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
    /// Nested message and enum definitions, flattened by normalization.
    #[serde(default)]
    pub nested: Vec<RawItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExtend {
    /// The message the extension fields are appended to, resolved in the
    /// extend block's scope.
    pub msg: String,
    pub fields: Vec<RawField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    pub fnum: u32,
    #[serde(rename = "type")]
    pub typ: RawType,
    pub occurrence: Occurrence,
    #[serde(default)]
    pub opts: Vec<RawOpt>,
}

/// A field type as parsed: either a scalar keyword or a (possibly
/// relative, possibly `.`-rooted) type name to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawType {
    Scalar(ScalarType),
    Named(String),
}

/// A field option as parsed. Only `packed` and `default` are honored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawOpt {
    Packed,
    Default(RawLit),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLit {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
}

/// A normalized top-level definition. Names are fully qualified and
/// type references carry the referent's absolute name and kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Def {
    Msg(MsgNorm),
    Enum(EnumNorm),
}

impl Def {
    pub fn name(&self) -> &str {
        match self {
            Def::Msg(m) => &m.name,
            Def::Enum(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumNorm {
    pub name: String,
    pub symbols: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MsgNorm {
    pub name: String,
    pub fields: Vec<FieldNorm>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNorm {
    pub name: String,
    pub fnum: u32,
    /// Dense 1-based ordinal, assigned in declaration order after
    /// extension fields have been appended.
    pub rnum: usize,
    pub typ: TypeRef,
    pub occurrence: Occurrence,
    pub packed: bool,
    pub default: Option<DefaultVal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Scalar(ScalarType),
    Enum(String),
    Msg(String),
}
