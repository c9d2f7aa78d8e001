//! Parser and evaluator for condition expressions in the in-memory store.
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! expr     := and_expr ("or" and_expr)*
//! and_expr := unary ("and" unary)*
//! unary    := "not" unary | primary
//! primary  := "(" expr ")"
//!           | "attribute_exists" "(" path ")"
//!           | "attribute_not_exists" "(" path ")"
//!           | "begins_with" "(" path "," operand ")"
//!           | "contains" "(" path "," operand ")"
//!           | operand ("=" | "<>" | "<" | "<=" | ">" | ">=") operand
//!           | operand "between" operand "and" operand
//!           | operand "in" "(" operand ("," operand)* ")"
//! operand  := path | ":placeholder"
//! ```
//!
//! Comparisons only hold between values of the same type: numbers compare
//! as exact decimals, strings and binaries bytewise. A comparison involving a
//! missing attribute is false, except `<>`, which is true.

use std::cmp::Ordering;

use crate::api::projection::resolve_path;
use crate::encoding::number::Decimal;
use crate::error::StoreError;
use crate::types::{AttrValue, Item};

/// Maximum nesting depth of parentheses and `not`.
const MAX_EXPRESSION_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Path(String),
    Placeholder(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: Comparator,
        right: Operand,
    },
    Between {
        value: Operand,
        lower: Operand,
        upper: Operand,
    },
    In {
        value: Operand,
        list: Vec<Operand>,
    },
    Exists(String),
    NotExists(String),
    BeginsWith(String, Operand),
    Contains(String, Operand),
}

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::Validation(message.into())
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Placeholder(String),
    LParen,
    RParen,
    Comma,
    Cmp(Comparator),
}

fn tokenize(input: &str) -> Result<Vec<Token>, StoreError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Cmp(Comparator::Eq));
                i += 1;
            }
            '<' => match chars.get(i + 1) {
                Some('>') => {
                    tokens.push(Token::Cmp(Comparator::Ne));
                    i += 2;
                }
                Some('=') => {
                    tokens.push(Token::Cmp(Comparator::Le));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Cmp(Comparator::Lt));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(Comparator::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(Comparator::Gt));
                    i += 1;
                }
            }
            ':' => {
                let start = i;
                i += 1;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                if i == start + 1 {
                    return Err(invalid("empty placeholder name"));
                }
                tokens.push(Token::Placeholder(chars[start..i].iter().collect()));
            }
            c if is_word_char(c) => {
                let start = i;
                while i < chars.len() && (is_word_char(chars[i]) || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an expression.
pub fn parse(input: &str) -> Result<Expr, StoreError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(invalid("empty expression"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr(0)?;
    if parser.pos != parser.tokens.len() {
        return Err(invalid(format!(
            "unexpected trailing input at token {}",
            parser.pos
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn expect(&mut self, expected: Token) -> Result<(), StoreError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(invalid(format!("expected {expected:?}, found {token:?}"))),
            None => Err(invalid(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), StoreError> {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(invalid(format!("expected '{keyword}'")))
        }
    }

    fn expr(&mut self, depth: usize) -> Result<Expr, StoreError> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(invalid(format!(
                "expression depth exceeds maximum of {MAX_EXPRESSION_DEPTH}"
            )));
        }
        let mut left = self.and_expr(depth)?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let right = self.and_expr(depth)?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self, depth: usize) -> Result<Expr, StoreError> {
        let mut left = self.unary(depth)?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let right = self.unary(depth)?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self, depth: usize) -> Result<Expr, StoreError> {
        if self.peek_keyword("not") {
            self.pos += 1;
            if depth + 1 > MAX_EXPRESSION_DEPTH {
                return Err(invalid(format!(
                    "expression depth exceeds maximum of {MAX_EXPRESSION_DEPTH}"
                )));
            }
            return Ok(Expr::Not(Box::new(self.unary(depth + 1)?)));
        }
        self.primary(depth)
    }

    fn primary(&mut self, depth: usize) -> Result<Expr, StoreError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.expr(depth + 1)?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }

        // Functions.
        let function = match (self.peek(), self.tokens.get(self.pos + 1)) {
            (Some(Token::Ident(word)), Some(Token::LParen)) => Some(word.to_ascii_lowercase()),
            _ => None,
        };
        if let Some(name) = function {
            match name.as_str() {
                "attribute_exists" | "attribute_not_exists" => {
                    self.pos += 2;
                    let path = self.path()?;
                    self.expect(Token::RParen)?;
                    return Ok(if name == "attribute_exists" {
                        Expr::Exists(path)
                    } else {
                        Expr::NotExists(path)
                    });
                }
                "begins_with" | "contains" => {
                    self.pos += 2;
                    let path = self.path()?;
                    self.expect(Token::Comma)?;
                    let operand = self.operand()?;
                    self.expect(Token::RParen)?;
                    return Ok(if name == "begins_with" {
                        Expr::BeginsWith(path, operand)
                    } else {
                        Expr::Contains(path, operand)
                    });
                }
                _ => return Err(invalid(format!("unknown function '{name}'"))),
            }
        }

        let value = self.operand()?;

        if self.peek_keyword("between") {
            self.pos += 1;
            let lower = self.operand()?;
            self.expect_keyword("and")?;
            let upper = self.operand()?;
            return Ok(Expr::Between {
                value,
                lower,
                upper,
            });
        }

        if self.peek_keyword("in") {
            self.pos += 1;
            self.expect(Token::LParen)?;
            let mut list = vec![self.operand()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                list.push(self.operand()?);
            }
            self.expect(Token::RParen)?;
            return Ok(Expr::In { value, list });
        }

        match self.next() {
            Some(Token::Cmp(op)) => {
                let right = self.operand()?;
                Ok(Expr::Compare {
                    left: value,
                    op,
                    right,
                })
            }
            Some(token) => Err(invalid(format!("expected comparator, found {token:?}"))),
            None => Err(invalid("expected comparator, found end of input")),
        }
    }

    fn operand(&mut self) -> Result<Operand, StoreError> {
        match self.next() {
            Some(Token::Placeholder(name)) => Ok(Operand::Placeholder(name)),
            Some(Token::Ident(word)) if !is_keyword(&word) => Ok(Operand::Path(word)),
            Some(token) => Err(invalid(format!("expected operand, found {token:?}"))),
            None => Err(invalid("expected operand, found end of input")),
        }
    }

    fn path(&mut self) -> Result<String, StoreError> {
        match self.operand()? {
            Operand::Path(path) => Ok(path),
            Operand::Placeholder(name) => {
                Err(invalid(format!("expected attribute path, found {name}")))
            }
        }
    }
}

fn is_keyword(word: &str) -> bool {
    ["and", "or", "not", "between", "in"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

impl Expr {
    /// Evaluate against `item`, resolving placeholders from `values`.
    pub fn eval(&self, item: &Item, values: &Item) -> Result<bool, StoreError> {
        match self {
            Expr::And(left, right) => Ok(left.eval(item, values)? && right.eval(item, values)?),
            Expr::Or(left, right) => Ok(left.eval(item, values)? || right.eval(item, values)?),
            Expr::Not(inner) => Ok(!inner.eval(item, values)?),
            Expr::Compare { left, op, right } => {
                let l = resolve(left, item, values)?;
                let r = resolve(right, item, values)?;
                let ordering = match (l, r) {
                    (Some(l), Some(r)) => compare_values(l, r),
                    _ => None,
                };
                Ok(match op {
                    Comparator::Eq => ordering == Some(Ordering::Equal),
                    Comparator::Ne => ordering != Some(Ordering::Equal),
                    Comparator::Lt => ordering == Some(Ordering::Less),
                    Comparator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    Comparator::Gt => ordering == Some(Ordering::Greater),
                    Comparator::Ge => {
                        matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                    }
                })
            }
            Expr::Between {
                value,
                lower,
                upper,
            } => {
                let (Some(v), Some(lo), Some(hi)) = (
                    resolve(value, item, values)?,
                    resolve(lower, item, values)?,
                    resolve(upper, item, values)?,
                ) else {
                    return Ok(false);
                };
                let ge_low = matches!(
                    compare_values(v, lo),
                    Some(Ordering::Greater | Ordering::Equal)
                );
                let le_high = matches!(
                    compare_values(v, hi),
                    Some(Ordering::Less | Ordering::Equal)
                );
                Ok(ge_low && le_high)
            }
            Expr::In { value, list } => {
                let Some(v) = resolve(value, item, values)? else {
                    return Ok(false);
                };
                for candidate in list {
                    if let Some(c) = resolve(candidate, item, values)?
                        && compare_values(v, c) == Some(Ordering::Equal)
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Exists(path) => Ok(resolve_path(item, path).is_some()),
            Expr::NotExists(path) => Ok(resolve_path(item, path).is_none()),
            Expr::BeginsWith(path, prefix) => {
                let prefix = resolve(prefix, item, values)?;
                Ok(match (resolve_path(item, path), prefix) {
                    (Some(AttrValue::S(s)), Some(AttrValue::S(p))) => s.starts_with(p.as_str()),
                    (Some(AttrValue::B(b)), Some(AttrValue::B(p))) => b.starts_with(p),
                    _ => false,
                })
            }
            Expr::Contains(path, needle) => {
                let needle = resolve(needle, item, values)?;
                Ok(match (resolve_path(item, path), needle) {
                    (Some(AttrValue::S(s)), Some(AttrValue::S(n))) => s.contains(n.as_str()),
                    (Some(AttrValue::Ss(set)), Some(AttrValue::S(n))) => set.contains(n),
                    (Some(AttrValue::Bs(set)), Some(AttrValue::B(n))) => set.contains(n),
                    (Some(AttrValue::Ns(set)), Some(n @ AttrValue::N(_))) => set
                        .iter()
                        .any(|m| compare_values(&AttrValue::N(m.clone()), n) == Some(Ordering::Equal)),
                    (Some(AttrValue::L(list)), Some(n)) => list
                        .iter()
                        .any(|m| compare_values(m, n) == Some(Ordering::Equal)),
                    _ => false,
                })
            }
        }
    }

    /// Check that this expression is a valid key condition: an `=` test of
    /// the hash key, optionally `and`-ed with one test of the range key.
    /// Any other attribute, `or` or `not` is rejected.
    pub fn check_key_condition(&self, hash: &str, range: Option<&str>) -> Result<(), StoreError> {
        let mut conjuncts = Vec::new();
        self.flatten_and(&mut conjuncts);

        let (pins, rest): (Vec<&Expr>, Vec<&Expr>) =
            conjuncts.into_iter().partition(|c| c.is_equality_on(hash));
        if pins.len() != 1 {
            return Err(invalid(format!(
                "key condition must test hash key '{hash}' with '=' exactly once"
            )));
        }
        match rest.as_slice() {
            [] => Ok(()),
            [extra] if range.is_some_and(|r| extra.is_range_test_on(r)) => Ok(()),
            [_] => Err(invalid(match range {
                Some(r) => format!("key condition may only add one test of range key '{r}'"),
                None => "key condition may only test the hash key".to_string(),
            })),
            _ => Err(invalid(
                "key condition may have at most two conditions".to_string(),
            )),
        }
    }

    fn flatten_and<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::And(left, right) => {
                left.flatten_and(out);
                right.flatten_and(out);
            }
            other => out.push(other),
        }
    }

    fn is_equality_on(&self, path: &str) -> bool {
        matches!(
            self,
            Expr::Compare { left, op: Comparator::Eq, right }
                if key_operands(left, right).is_some_and(|p| p == path)
        )
    }

    fn is_range_test_on(&self, path: &str) -> bool {
        match self {
            Expr::Compare { left, op, right } => {
                *op != Comparator::Ne && key_operands(left, right).is_some_and(|p| p == path)
            }
            Expr::Between { value, lower, upper } => {
                matches!(value, Operand::Path(p) if p == path)
                    && matches!(lower, Operand::Placeholder(_))
                    && matches!(upper, Operand::Placeholder(_))
            }
            Expr::BeginsWith(p, Operand::Placeholder(_)) => p == path,
            _ => false,
        }
    }
}

/// The attribute path of a `path <op> :value` comparison, in either order.
fn key_operands<'a>(left: &'a Operand, right: &'a Operand) -> Option<&'a str> {
    match (left, right) {
        (Operand::Path(p), Operand::Placeholder(_)) | (Operand::Placeholder(_), Operand::Path(p)) => {
            Some(p.as_str())
        }
        _ => None,
    }
}

fn resolve<'a>(
    operand: &Operand,
    item: &'a Item,
    values: &'a Item,
) -> Result<Option<&'a AttrValue>, StoreError> {
    match operand {
        Operand::Path(path) => Ok(resolve_path(item, path)),
        Operand::Placeholder(name) => values
            .get(name)
            .map(Some)
            .ok_or_else(|| invalid(format!("undefined placeholder {name}"))),
    }
}

/// Compare two values of the same type. Different types are unordered.
pub fn compare_values(a: &AttrValue, b: &AttrValue) -> Option<Ordering> {
    match (a, b) {
        (AttrValue::N(x), AttrValue::N(y)) => {
            let x = Decimal::parse(x).ok()?;
            let y = Decimal::parse(y).ok()?;
            Some(x.cmp(&y))
        }
        (AttrValue::S(x), AttrValue::S(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        (AttrValue::B(x), AttrValue::B(y)) => Some(x.cmp(y)),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> AttrValue {
        AttrValue::S(v.to_string())
    }

    fn n(v: &str) -> AttrValue {
        AttrValue::N(v.to_string())
    }

    fn doc() -> Item {
        let mut owner = Item::new();
        owner.insert("Name".to_string(), s("ann"));

        let mut item = Item::new();
        item.insert("Id".to_string(), n("123"));
        item.insert("Name".to_string(), s("Alice"));
        item.insert("Age".to_string(), n("30"));
        item.insert("Owner".to_string(), AttrValue::M(owner));
        item.insert(
            "Tags".to_string(),
            AttrValue::Ss(vec!["red".to_string(), "blue".to_string()]),
        );
        item
    }

    fn values(pairs: &[(&str, AttrValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn check(expr: &str, vals: &[(&str, AttrValue)]) -> bool {
        parse(expr).unwrap().eval(&doc(), &values(vals)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_comparison() {
        assert_eq!(
            parse("Id = :Id_expr").unwrap(),
            Expr::Compare {
                left: Operand::Path("Id".to_string()),
                op: Comparator::Eq,
                right: Operand::Placeholder(":Id_expr".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_precedence_and_binds_tighter() {
        let expr = parse("A = :a or B = :b and C = :c").unwrap();
        assert!(matches!(expr, Expr::Or(_, ref right) if matches!(**right, Expr::And(_, _))));
    }

    #[test]
    fn test_parse_between_and_is_not_conjunction() {
        let expr = parse("Age between :lo and :hi and Name = :n").unwrap();
        match expr {
            Expr::And(left, _) => assert!(matches!(*left, Expr::Between { .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_case_insensitive_keywords() {
        assert!(parse("A = :a AND NOT attribute_exists(B)").is_ok());
        assert!(parse("A BETWEEN :a And :b").is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("A =").is_err());
        assert!(parse("A = :a)").is_err());
        assert!(parse("(A = :a").is_err());
        assert!(parse("frobnicate(A)").is_err());
        assert!(parse("A ! :a").is_err());
        assert!(parse("A in ()").is_err());
    }

    #[test]
    fn test_parse_depth_limit() {
        let deep = format!("{}A = :a{}", "(".repeat(40), ")".repeat(40));
        assert!(matches!(parse(&deep), Err(StoreError::Validation(_))));
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn test_eval_comparisons() {
        assert!(check("Id = :v", &[(":v", n("123"))]));
        assert!(check("Id = :v", &[(":v", n("123.0"))]));
        assert!(check("Age < :v", &[(":v", n("31"))]));
        assert!(check("Age >= :v", &[(":v", n("30"))]));
        assert!(check("Name <> :v", &[(":v", s("Bob"))]));
        assert!(!check("Name > :v", &[(":v", s("B"))]));
    }

    #[test]
    fn test_eval_type_mismatch_is_false() {
        assert!(!check("Age = :v", &[(":v", s("30"))]));
        assert!(!check("Age < :v", &[(":v", s("99"))]));
    }

    #[test]
    fn test_eval_missing_attribute() {
        assert!(!check("Missing = :v", &[(":v", n("1"))]));
        assert!(check("Missing <> :v", &[(":v", n("1"))]));
        assert!(check("attribute_not_exists(Missing)", &[]));
        assert!(!check("attribute_exists(Missing)", &[]));
    }

    #[test]
    fn test_eval_between_and_in() {
        assert!(check("Age between :lo and :hi", &[(":lo", n("18")), (":hi", n("30"))]));
        assert!(!check("Age between :lo and :hi", &[(":lo", n("31")), (":hi", n("40"))]));
        assert!(check("Age in (:a, :b)", &[(":a", n("1")), (":b", n("30"))]));
        assert!(!check("Age in (:a)", &[(":a", n("1"))]));
    }

    #[test]
    fn test_eval_functions() {
        assert!(check("begins_with(Name, :p)", &[(":p", s("Al"))]));
        assert!(check("contains(Name, :p)", &[(":p", s("lic"))]));
        assert!(check("contains(Tags, :t)", &[(":t", s("red"))]));
        assert!(check("not contains(Tags, :t)", &[(":t", s("green"))]));
    }

    #[test]
    fn test_eval_nested_path() {
        assert!(check("Owner.Name = :v", &[(":v", s("ann"))]));
        assert!(check("attribute_exists(Owner.Name)", &[]));
    }

    #[test]
    fn test_eval_grouping() {
        assert!(check(
            "(Age = :a or Age = :b) and Name = :n",
            &[(":a", n("1")), (":b", n("30")), (":n", s("Alice"))]
        ));
    }

    #[test]
    fn test_eval_undefined_placeholder() {
        let err = parse("Id = :nope").unwrap().eval(&doc(), &Item::new());
        assert!(matches!(err, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_eval_numbers_beyond_f64_precision() {
        let mut item = Item::new();
        item.insert("Big".to_string(), n("9007199254740993"));
        let values = values(&[(":lo", n("9007199254740992")), (":hi", n("9007199254740993"))]);

        assert!(!parse("Big = :lo").unwrap().eval(&item, &values).unwrap());
        assert!(parse("Big = :hi").unwrap().eval(&item, &values).unwrap());
        assert!(parse("Big > :lo").unwrap().eval(&item, &values).unwrap());
        assert!(!parse("Big > :hi").unwrap().eval(&item, &values).unwrap());
    }

    #[test]
    fn test_compare_values_twenty_digits() {
        assert_eq!(
            compare_values(&n("9999999999999999999"), &n("10000000000000000001")),
            Some(Ordering::Less)
        );
        assert_eq!(compare_values(&n("1.50"), &n("1.5")), Some(Ordering::Equal));
        assert_eq!(compare_values(&n("abc"), &n("1")), None);
    }

    // -----------------------------------------------------------------------
    // Key conditions
    // -----------------------------------------------------------------------

    fn key_check(text: &str) -> Result<(), StoreError> {
        parse(text).unwrap().check_key_condition("Id", Some("Seq"))
    }

    #[test]
    fn test_key_condition_accepts_hash_and_range() {
        assert!(key_check("Id = :v").is_ok());
        assert!(key_check(":v = Id").is_ok());
        assert!(key_check("Id = :v and Seq > :s").is_ok());
        assert!(key_check("Seq <= :s and Id = :v").is_ok());
        assert!(key_check("Id = :v and Seq between :lo and :hi").is_ok());
        assert!(key_check("Id = :v and begins_with(Seq, :p)").is_ok());
    }

    #[test]
    fn test_key_condition_requires_hash_equality() {
        assert!(key_check("Id > :v").is_err());
        assert!(key_check("Seq = :s").is_err());
        assert!(key_check("Id = :v and Id = :w").is_err());
        assert!(key_check("Id = :v or Seq > :s").is_err());
        assert!(key_check("not Id = :v").is_err());
    }

    #[test]
    fn test_key_condition_rejects_non_key_attributes() {
        assert!(matches!(key_check("Id = :v and Body = :b"), Err(StoreError::Validation(_))));
        assert!(key_check("Id = :v and Seq > :s and Seq < :t").is_err());
        assert!(key_check("Id = :v and Seq <> :s").is_err());
        assert!(key_check("Id = :v and attribute_exists(Seq)").is_err());
        assert!(key_check("Id = :v and contains(Seq, :s)").is_err());

        let hash_only = parse("Id = :v and Seq > :s").unwrap();
        assert!(hash_only.check_key_condition("Id", None).is_err());
    }
}
