//! Predicate algebra for key conditions, filters and write preconditions.
//!
//! A [`Condition`] is a binary tree: leaves test one field, nodes join two
//! conditions with `and`/`or` in exactly the order the caller chained them.
//! Conditions are plain values; [`Condition::and`] and [`Condition::or`] wrap
//! their inputs in a new node instead of editing them.
//!
//! Operands are anything convertible into an [`AttrValue`]: strings,
//! integers, bools and [`Binary`](crate::encoding::Binary) buffers. Floats
//! have no infallible conversion because NaN and infinity cannot be stored,
//! so convert them with `AttrValue::try_from` and handle the error:
//!
//! ```
//! use dynamap_core::api::condition::gt;
//! use dynamap_core::types::AttrValue;
//!
//! let filter = gt("Score", AttrValue::try_from(1.5)?);
//! assert!(AttrValue::try_from(f64::NAN).is_err());
//! # let _ = filter;
//! # Ok::<(), dynamap_core::error::NumberError>(())
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::AttrValue;

/// A predicate over named fields.
///
/// Serializable so a condition can travel to a remote store proxy
/// (JSON / MessagePack).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Matches every item. Renders as an empty expression.
    #[default]
    Everything,
    Leaf {
        field: String,
        predicate: Predicate,
    },
    Node {
        left: Box<Condition>,
        connective: Connective,
        right: Box<Condition>,
    },
}

/// The test a leaf applies to its field, together with its operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Eq(AttrValue),
    Ne(AttrValue),
    Lt(AttrValue),
    Le(AttrValue),
    Gt(AttrValue),
    Ge(AttrValue),
    Between { lower: AttrValue, upper: AttrValue },
    In(Vec<AttrValue>),
    Contains(AttrValue),
    NotContains(AttrValue),
    BeginsWith(AttrValue),
    IsNull,
    IsNotNull,
}

/// Operator kinds, without operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Between,
    In,
    Contains,
    NotContains,
    BeginsWith,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// The operator's spelling in the expression grammar.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
            Operator::BeginsWith => "begins_with",
            Operator::IsNull => "attribute_not_exists",
            Operator::IsNotNull => "attribute_exists",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Predicate {
    pub fn operator(&self) -> Operator {
        match self {
            Predicate::Eq(_) => Operator::Eq,
            Predicate::Ne(_) => Operator::Ne,
            Predicate::Lt(_) => Operator::Lt,
            Predicate::Le(_) => Operator::Le,
            Predicate::Gt(_) => Operator::Gt,
            Predicate::Ge(_) => Operator::Ge,
            Predicate::Between { .. } => Operator::Between,
            Predicate::In(_) => Operator::In,
            Predicate::Contains(_) => Operator::Contains,
            Predicate::NotContains(_) => Operator::NotContains,
            Predicate::BeginsWith(_) => Operator::BeginsWith,
            Predicate::IsNull => Operator::IsNull,
            Predicate::IsNotNull => Operator::IsNotNull,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn keyword(self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn leaf(field: impl Into<String>, predicate: Predicate) -> Condition {
    Condition::Leaf {
        field: field.into(),
        predicate,
    }
}

/// Build `field = value`.
pub fn eq(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::Eq(value.into()))
}

/// Build `field <> value`.
pub fn ne(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::Ne(value.into()))
}

/// Build `field < value`.
pub fn lt(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::Lt(value.into()))
}

/// Build `field <= value`.
pub fn le(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::Le(value.into()))
}

/// Build `field > value`.
pub fn gt(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::Gt(value.into()))
}

/// Build `field >= value`.
pub fn ge(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::Ge(value.into()))
}

/// Build `field between lower and upper` (inclusive on both ends).
pub fn between(
    field: impl Into<String>,
    lower: impl Into<AttrValue>,
    upper: impl Into<AttrValue>,
) -> Condition {
    leaf(
        field,
        Predicate::Between {
            lower: lower.into(),
            upper: upper.into(),
        },
    )
}

/// Build `field in (v0, v1, ...)`. Building the expression fails if `values`
/// is empty.
pub fn is_in<V: Into<AttrValue>>(
    field: impl Into<String>,
    values: impl IntoIterator<Item = V>,
) -> Condition {
    leaf(
        field,
        Predicate::In(values.into_iter().map(Into::into).collect()),
    )
}

/// Substring test for strings, membership test for sets and lists.
pub fn contains(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::Contains(value.into()))
}

pub fn not_contains(field: impl Into<String>, value: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::NotContains(value.into()))
}

pub fn begins_with(field: impl Into<String>, prefix: impl Into<AttrValue>) -> Condition {
    leaf(field, Predicate::BeginsWith(prefix.into()))
}

/// The field is absent from the item.
pub fn is_null(field: impl Into<String>) -> Condition {
    leaf(field, Predicate::IsNull)
}

/// The field is present on the item.
pub fn is_not_null(field: impl Into<String>) -> Condition {
    leaf(field, Predicate::IsNotNull)
}

/// The condition that matches every item.
pub fn everything() -> Condition {
    Condition::Everything
}

impl Condition {
    /// `self and other`. `Everything` is the identity.
    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::Everything, c) | (c, Condition::Everything) => c,
            (left, right) => Condition::Node {
                left: Box::new(left),
                connective: Connective::And,
                right: Box::new(right),
            },
        }
    }

    /// `self or other`. `Everything` absorbs the other side.
    pub fn or(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::Everything, _) | (_, Condition::Everything) => Condition::Everything,
            (left, right) => Condition::Node {
                left: Box::new(left),
                connective: Connective::Or,
                right: Box::new(right),
            },
        }
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, Condition::Everything)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_float_operand_via_try_from() {
        let threshold = AttrValue::try_from(1.5).unwrap();
        assert_eq!(
            gt("Score", threshold),
            Condition::Leaf {
                field: "Score".to_string(),
                predicate: Predicate::Gt(AttrValue::N("1.5".to_string())),
            }
        );
        assert!(AttrValue::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn test_leaf_constructors() {
        assert_eq!(
            eq("Id", 123),
            Condition::Leaf {
                field: "Id".to_string(),
                predicate: Predicate::Eq(AttrValue::N("123".to_string())),
            }
        );
        let c = between("Age", 0, 17);
        match c {
            Condition::Leaf {
                predicate: Predicate::Between { lower, upper },
                ..
            } => {
                assert_eq!(lower, AttrValue::from(0));
                assert_eq!(upper, AttrValue::from(17));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            is_in("Color", ["red", "blue"]),
            Condition::Leaf {
                field: "Color".to_string(),
                predicate: Predicate::In(vec![AttrValue::from("red"), AttrValue::from("blue")]),
            }
        );
    }

    #[test]
    fn test_chaining_is_left_nested() {
        let c = eq("A", 1).and(eq("B", 2)).or(eq("C", 3));
        match c {
            Condition::Node {
                left,
                connective: Connective::Or,
                right,
            } => {
                assert!(matches!(
                    *left,
                    Condition::Node {
                        connective: Connective::And,
                        ..
                    }
                ));
                assert_eq!(*right, eq("C", 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_and_leaves_inputs_intact() {
        let a = eq("A", 1);
        let b = eq("B", 2);
        let joined = a.clone().and(b.clone());
        assert_eq!(a, eq("A", 1));
        assert_eq!(b, eq("B", 2));
        assert_ne!(joined, a);
    }

    #[test]
    fn test_everything_identity() {
        assert_eq!(everything().and(eq("A", 1)), eq("A", 1));
        assert_eq!(eq("A", 1).and(everything()), eq("A", 1));
        assert!(everything().or(eq("A", 1)).is_everything());
        assert!(Condition::default().is_everything());
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(eq("A", 1).operator_symbol(), Some("="));
        assert_eq!(ne("A", 1).operator_symbol(), Some("<>"));
        assert_eq!(is_null("A").operator_symbol(), Some("attribute_not_exists"));
        assert_eq!(everything().operator_symbol(), None);
        assert_eq!(Operator::NotContains.to_string(), "not contains");
    }

    // -----------------------------------------------------------------------
    // Serde
    // -----------------------------------------------------------------------

    #[test]
    fn test_condition_serde_roundtrip_json() {
        let c = eq("Id", 7)
            .and(between("Age", 18, 65))
            .or(is_not_null("Email"));
        let json = serde_json::to_string(&c).unwrap();
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_condition_serde_roundtrip_msgpack() {
        let c = begins_with("Name", "jo").and(is_in("Tier", [1, 2, 3]));
        let bytes = rmp_serde::to_vec(&c).unwrap();
        let back: Condition = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, c);
    }

    impl Condition {
        fn operator_symbol(&self) -> Option<&'static str> {
            match self {
                Condition::Leaf { predicate, .. } => Some(predicate.operator().symbol()),
                _ => None,
            }
        }
    }
}
