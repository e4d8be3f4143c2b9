//! The semantic-context registry: what every known element ID means, where it may appear, and how
//! often.
//!
//! Element types are entries in a table rather than Rust types. The table is assembled once, on
//! first use, from the EBML header elements in `std_elems` and the Matroska elements in
//! `matroska::ids`.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::id::Id;
use crate::value::Value;
use crate::{matroska, std_elems};

/// The way an element's payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A container of other elements.
    Master,
    /// An unsigned integer.
    UInt,
    /// A signed integer.
    SInt,
    /// A floating point number.
    Float,
    /// A printable ASCII string.
    String,
    /// A UTF-8 string.
    Utf8,
    /// Arbitrary binary data.
    Binary,
    /// A date.
    Date,
}

/// The number of times an element may sit in each parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// The element may occur any number of times, including zero.
    ZeroOrMany,
    /// The element may occur either once or not at all.
    ZeroOrOne,
    /// The element must occur exactly once in each scope it is legal for it to do so.
    ExactlyOne,
    /// The element must occur at least once in each scope it is legal for it to do so.
    OneOrMany,
}
impl Cardinality {
    /// True if the element has to be present.
    pub fn is_mandatory(self) -> bool {
        match self {
            Cardinality::ExactlyOne | Cardinality::OneOrMany => true,
            Cardinality::ZeroOrMany | Cardinality::ZeroOrOne => false,
        }
    }

    /// True if the element may occur more than once.
    pub fn is_repeatable(self) -> bool {
        match self {
            Cardinality::ZeroOrMany | Cardinality::OneOrMany => true,
            Cardinality::ExactlyOne | Cardinality::ZeroOrOne => false,
        }
    }
}

/// The masters an element may be a child of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parents {
    /// Top level of the stream only.
    Root,
    /// Anywhere, including the top level (Void, CRC-32).
    Any,
    /// Only inside one of the listed masters.
    Of(&'static [Id]),
}

/// A schema default, applied when an element is absent from its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    /// An unsigned integer default.
    UInt(u64),
    /// A signed integer default.
    SInt(i64),
    /// A float default.
    Float(f64),
    /// A string default.
    Str(&'static str),
}
impl DefaultValue {
    /// Converts the default to an owned value.
    pub fn to_value(&self) -> Value {
        match *self {
            DefaultValue::UInt(x) => Value::UInt(x),
            DefaultValue::SInt(x) => Value::SInt(x),
            DefaultValue::Float(x) => Value::Float(x),
            DefaultValue::Str(x) => Value::String(x.to_owned()),
        }
    }
}

/// Static information about an element type.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticContext {
    /// The element ID.
    pub id: Id,
    /// The symbolic name of the element type.
    pub name: &'static str,
    /// How the payload is interpreted.
    pub kind: ElementKind,
    /// Where the element may appear.
    pub parents: Parents,
    /// How often the element may appear in each parent.
    pub cardinality: Cardinality,
    /// The value assumed when the element is absent.
    pub default: Option<DefaultValue>,
    /// Whether the element may be written with the unknown size.
    pub unknown_size_allowed: bool,
}
impl SemanticContext {
    /// An optional, non-repeatable element with no default.
    pub fn new(id: Id, name: &'static str, kind: ElementKind, parents: Parents) -> Self {
        SemanticContext {
            id,
            name,
            kind,
            parents,
            cardinality: Cardinality::ZeroOrOne,
            default: None,
            unknown_size_allowed: false,
        }
    }

    /// Sets the cardinality.
    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Shorthand for `Cardinality::ExactlyOne`.
    pub fn mandatory(self) -> Self {
        self.cardinality(Cardinality::ExactlyOne)
    }

    /// Shorthand for `Cardinality::ZeroOrMany`.
    pub fn repeatable(self) -> Self {
        self.cardinality(Cardinality::ZeroOrMany)
    }

    /// Sets the default value.
    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Allows the unknown size.
    pub fn unknown_size(mut self) -> Self {
        self.unknown_size_allowed = true;
        self
    }

    /// True if the element has to be present and has no default to fall back on.
    pub fn is_required(&self) -> bool {
        self.cardinality.is_mandatory() && self.default.is_none()
    }

    /// The default as an owned value.
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(DefaultValue::to_value)
    }

    /// True if the element may sit in `parent` (`None` meaning the top level).
    pub fn allows_parent(&self, parent: Option<Id>) -> bool {
        match (self.parents, parent) {
            (Parents::Any, _) => true,
            (Parents::Root, None) => true,
            (Parents::Of(list), Some(parent)) => list.contains(&parent),
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Registry {
    entries: Vec<SemanticContext>,
    by_id: HashMap<Id, usize>,
    by_name: HashMap<&'static str, usize>,
}
impl Registry {
    fn build() -> Self {
        let entries: Vec<SemanticContext> = std_elems::schema()
            .into_iter()
            .chain(matroska::ids::schema())
            .collect();
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, ctx)| (ctx.id, i))
            .collect();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, ctx)| (ctx.name, i))
            .collect();
        Registry {
            entries,
            by_id,
            by_name,
        }
    }
}

lazy_static! {
    static ref REGISTRY: Registry = Registry::build();
}

/// Looks up the context of an element ID.
pub fn lookup(id: Id) -> Option<&'static SemanticContext> {
    let registry: &'static Registry = &REGISTRY;
    registry.by_id.get(&id).map(|&i| &registry.entries[i])
}

/// Looks up the context of an element by its symbolic name.
pub fn lookup_by_name(name: &str) -> Option<&'static SemanticContext> {
    let registry: &'static Registry = &REGISTRY;
    registry.by_name.get(name).map(|&i| &registry.entries[i])
}

/// The symbolic name of an ID, or `"Unknown"`.
pub fn name_of(id: Id) -> &'static str {
    lookup(id).map_or("Unknown", |ctx| ctx.name)
}

/// True if `child` is a known element which may sit in `parent` (`None` meaning the top level).
pub fn is_legal_child(parent: Option<Id>, child: Id) -> bool {
    lookup(child).map_or(false, |ctx| ctx.allows_parent(parent))
}

/// The elements which explicitly name `parent` as a parent, in declaration order. Global
/// elements are not included.
pub fn children_of(parent: Option<Id>) -> Vec<&'static SemanticContext> {
    let registry: &'static Registry = &REGISTRY;
    registry
        .entries
        .iter()
        .filter(|ctx| ctx.parents != Parents::Any && ctx.allows_parent(parent))
        .collect()
}
