//! Compiles a [`Condition`] into expression text plus placeholder values.
//!
//! Field names never reach the store as operand text: every operand is bound
//! to a placeholder token derived from the field name (`Age` becomes
//! `:Age_expr`), which keeps reserved words such as `Name` or `Size` usable as
//! attribute names. Two leaves that derive the same token are rejected rather
//! than silently overwriting each other's value.

use crate::api::condition::{Condition, Connective, Predicate};
use crate::error::BuildError;
use crate::types::{AttrValue, Item, PLACEHOLDER_SUFFIX};

/// A rendered expression. An empty `text` means "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub text: String,
    pub values: Item,
}

impl Expression {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Render a single condition with its own placeholder map.
pub fn build(condition: &Condition) -> Result<Expression, BuildError> {
    let mut builder = ExpressionBuilder::new();
    let text = builder.render(condition)?;
    Ok(Expression {
        text,
        values: builder.finish(),
    })
}

/// The placeholder token for a field: `:` + field (non-identifier characters
/// replaced by `_`) + `_expr`.
pub fn placeholder(field: &str) -> String {
    let mut token = String::with_capacity(field.len() + PLACEHOLDER_SUFFIX.len() + 1);
    token.push(':');
    token.extend(
        field
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }),
    );
    token.push_str(PLACEHOLDER_SUFFIX);
    token
}

/// Renders several conditions (a key condition and a filter, say) into one
/// shared placeholder map, so collisions across them are caught too.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    values: Item,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `condition`, binding its operands. Returns an empty string for
    /// [`Condition::Everything`].
    pub fn render(&mut self, condition: &Condition) -> Result<String, BuildError> {
        match condition {
            Condition::Everything => Ok(String::new()),
            Condition::Leaf { field, predicate } => self.render_leaf(field, predicate),
            Condition::Node {
                left,
                connective,
                right,
            } => {
                let left_text = self.render_child(left, *connective)?;
                let right_text = self.render_child(right, *connective)?;
                Ok(match (left_text.is_empty(), right_text.is_empty()) {
                    (false, false) => {
                        format!("{left_text} {} {right_text}", connective.keyword())
                    }
                    // An `Everything` side: identity under and, absorbing under or.
                    _ if *connective == Connective::Or => String::new(),
                    (true, _) => right_text,
                    (false, true) => left_text,
                })
            }
        }
    }

    /// The accumulated placeholder map.
    pub fn finish(self) -> Item {
        self.values
    }

    fn render_child(
        &mut self,
        child: &Condition,
        parent: Connective,
    ) -> Result<String, BuildError> {
        let text = self.render(child)?;
        match child {
            Condition::Node { connective, .. } if *connective != parent && !text.is_empty() => {
                Ok(format!("({text})"))
            }
            _ => Ok(text),
        }
    }

    fn render_leaf(&mut self, field: &str, predicate: &Predicate) -> Result<String, BuildError> {
        if field.is_empty() {
            return Err(BuildError::EmptyFieldName);
        }
        let token = placeholder(field);
        let symbol = predicate.operator().symbol();

        let text = match predicate {
            Predicate::Eq(v)
            | Predicate::Ne(v)
            | Predicate::Lt(v)
            | Predicate::Le(v)
            | Predicate::Gt(v)
            | Predicate::Ge(v) => {
                self.bind(&token, v)?;
                format!("{field} {symbol} {token}")
            }
            Predicate::Between { lower, upper } => {
                let lower_token = format!("{token}_lower");
                let upper_token = format!("{token}_upper");
                self.bind(&lower_token, lower)?;
                self.bind(&upper_token, upper)?;
                format!("{field} between {lower_token} and {upper_token}")
            }
            Predicate::In(values) => {
                if values.is_empty() {
                    return Err(BuildError::EmptyIn {
                        field: field.to_string(),
                    });
                }
                let mut text = format!("{field} in (");
                for (i, v) in values.iter().enumerate() {
                    let item_token = format!("{token}_{i}");
                    self.bind(&item_token, v)?;
                    if i > 0 {
                        text.push_str(", ");
                    }
                    text.push_str(&item_token);
                }
                text.push(')');
                text
            }
            Predicate::Contains(v) | Predicate::NotContains(v) | Predicate::BeginsWith(v) => {
                self.bind(&token, v)?;
                format!("{symbol}({field}, {token})")
            }
            Predicate::IsNull | Predicate::IsNotNull => format!("{symbol}({field})"),
        };
        Ok(text)
    }

    fn bind(&mut self, token: &str, value: &AttrValue) -> Result<(), BuildError> {
        if self.values.contains_key(token) {
            return Err(BuildError::PlaceholderCollision {
                token: token.to_string(),
            });
        }
        self.values.insert(token.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::condition::*;

    fn n(s: &str) -> AttrValue {
        AttrValue::N(s.to_string())
    }

    // -----------------------------------------------------------------------
    // Leaves
    // -----------------------------------------------------------------------

    #[test]
    fn test_eq_renders_placeholder() {
        let expr = build(&eq("Id", 123)).unwrap();
        assert_eq!(expr.text, "Id = :Id_expr");
        assert_eq!(expr.values.len(), 1);
        assert_eq!(expr.values[":Id_expr"], n("123"));
    }

    #[test]
    fn test_comparison_symbols() {
        assert_eq!(build(&ne("A", 1)).unwrap().text, "A <> :A_expr");
        assert_eq!(build(&lt("A", 1)).unwrap().text, "A < :A_expr");
        assert_eq!(build(&le("A", 1)).unwrap().text, "A <= :A_expr");
        assert_eq!(build(&gt("A", 1)).unwrap().text, "A > :A_expr");
        assert_eq!(build(&ge("A", 1)).unwrap().text, "A >= :A_expr");
    }

    #[test]
    fn test_between_binds_both_bounds() {
        let expr = build(&between("Age", 0, 17)).unwrap();
        assert_eq!(expr.text, "Age between :Age_expr_lower and :Age_expr_upper");
        assert_eq!(expr.values[":Age_expr_lower"], n("0"));
        assert_eq!(expr.values[":Age_expr_upper"], n("17"));
    }

    #[test]
    fn test_in_binds_each_operand() {
        let expr = build(&is_in("Tier", [1, 2, 3])).unwrap();
        assert_eq!(expr.text, "Tier in (:Tier_expr_0, :Tier_expr_1, :Tier_expr_2)");
        assert_eq!(expr.values.len(), 3);
        assert_eq!(expr.values[":Tier_expr_2"], n("3"));
    }

    #[test]
    fn test_in_requires_operand() {
        let err = build(&is_in("Tier", Vec::<i32>::new())).unwrap_err();
        assert_eq!(
            err,
            BuildError::EmptyIn {
                field: "Tier".to_string()
            }
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            build(&contains("Tags", "red")).unwrap().text,
            "contains(Tags, :Tags_expr)"
        );
        assert_eq!(
            build(&not_contains("Tags", "red")).unwrap().text,
            "not contains(Tags, :Tags_expr)"
        );
        assert_eq!(
            build(&begins_with("Name", "jo")).unwrap().text,
            "begins_with(Name, :Name_expr)"
        );
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        let expr = build(&is_null("Email")).unwrap();
        assert_eq!(expr.text, "attribute_not_exists(Email)");
        assert!(expr.values.is_empty());
        let expr = build(&is_not_null("Email")).unwrap();
        assert_eq!(expr.text, "attribute_exists(Email)");
    }

    #[test]
    fn test_nested_field_token_is_sanitized() {
        let expr = build(&eq("Owner.Name", "ann")).unwrap();
        assert_eq!(expr.text, "Owner.Name = :Owner_Name_expr");
    }

    #[test]
    fn test_empty_field_rejected() {
        assert_eq!(build(&eq("", 1)).unwrap_err(), BuildError::EmptyFieldName);
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    #[test]
    fn test_chained_and_preserves_order() {
        let expr = build(&eq("A", 1).and(eq("B", 2))).unwrap();
        assert_eq!(expr.text, "A = :A_expr and B = :B_expr");
        assert_eq!(expr.values[":A_expr"], n("1"));
        assert_eq!(expr.values[":B_expr"], n("2"));
    }

    #[test]
    fn test_same_connective_renders_flat() {
        let expr = build(&eq("A", 1).or(eq("B", 2)).or(eq("C", 3))).unwrap();
        assert_eq!(expr.text, "A = :A_expr or B = :B_expr or C = :C_expr");
    }

    #[test]
    fn test_mixed_connectives_are_grouped() {
        let expr = build(&eq("A", 1).or(eq("B", 2)).and(eq("C", 3))).unwrap();
        assert_eq!(expr.text, "(A = :A_expr or B = :B_expr) and C = :C_expr");

        let expr = build(&eq("A", 1).and(eq("B", 2).or(eq("C", 3)))).unwrap();
        assert_eq!(expr.text, "A = :A_expr and (B = :B_expr or C = :C_expr)");
    }

    #[test]
    fn test_everything_renders_empty() {
        let expr = build(&everything()).unwrap();
        assert!(expr.is_empty());
        assert!(expr.values.is_empty());
    }

    #[test]
    fn test_hand_built_node_with_everything() {
        let node = Condition::Node {
            left: Box::new(Condition::Everything),
            connective: Connective::And,
            right: Box::new(eq("A", 1)),
        };
        assert_eq!(build(&node).unwrap().text, "A = :A_expr");

        let node = Condition::Node {
            left: Box::new(eq("A", 1)),
            connective: Connective::Or,
            right: Box::new(Condition::Everything),
        };
        assert!(build(&node).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Collisions
    // -----------------------------------------------------------------------

    #[test]
    fn test_same_field_twice_collides() {
        let err = build(&gt("Age", 1).and(lt("Age", 9))).unwrap_err();
        assert_eq!(
            err,
            BuildError::PlaceholderCollision {
                token: ":Age_expr".to_string()
            }
        );
    }

    #[test]
    fn test_sanitized_names_collide() {
        let err = build(&eq("a-b", 1).and(eq("a_b", 2))).unwrap_err();
        assert!(matches!(err, BuildError::PlaceholderCollision { .. }));
    }

    #[test]
    fn test_shared_builder_detects_cross_expression_collision() {
        let mut builder = ExpressionBuilder::new();
        let key = builder.render(&eq("Id", 1)).unwrap();
        assert_eq!(key, "Id = :Id_expr");
        let err = builder.render(&eq("Id", 2)).unwrap_err();
        assert!(matches!(err, BuildError::PlaceholderCollision { .. }));
    }

    #[test]
    fn test_shared_builder_merges_values() {
        let mut builder = ExpressionBuilder::new();
        builder.render(&eq("Id", 1)).unwrap();
        builder.render(&gt("Age", 21)).unwrap();
        let values = builder.finish();
        assert_eq!(values.len(), 2);
        assert_eq!(values[":Age_expr"], n("21"));
    }
}
