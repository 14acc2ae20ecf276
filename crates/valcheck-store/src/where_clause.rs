//! Attribute filter expressions.
//!
//! Supports the SQL subset used by dataset matrices:
//!
//! ```text
//! expr      := or
//! or        := and ( OR and )*
//! and       := unary ( AND unary )*
//! unary     := NOT unary | '(' expr ')' | predicate
//! predicate := field op literal
//!            | field [NOT] IN '(' literal ( ',' literal )* ')'
//!            | field IS [NOT] NULL
//!            | field [NOT] LIKE 'pattern'
//! literal   := number | 'text' | DATE 'yyyy-mm-dd[ hh:mm:ss]'
//! ```
//!
//! Keywords are case-insensitive. Evaluation uses three-valued logic: a
//! comparison against NULL is unknown, and only rows evaluating to true are
//! selected.

use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use valcheck_core::models::{AttributeValue, Attributes};
use valcheck_core::{Result, ValcheckError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare { field: String, op: CmpOp, value: Literal },
    In { field: String, values: Vec<Literal>, negated: bool },
    IsNull { field: String, negated: bool },
    Like { field: String, pattern: String, negated: bool },
}

/// A parsed where clause
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    source: String,
    expr: Expr,
}

impl WhereClause {
    pub fn parse(clause: &str) -> Result<Self> {
        let tokens = tokenize(clause).map_err(|reason| invalid(clause, reason))?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or().map_err(|reason| invalid(clause, reason))?;
        if let Some(token) = parser.peek() {
            return Err(invalid(clause, format!("unexpected {:?} after expression", token)));
        }
        Ok(Self { source: clause.to_string(), expr })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Field names referenced by the clause, in first-use order
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        collect_fields(&self.expr, &mut fields);
        fields
    }

    /// Whether a row satisfies the clause. Absent attributes are NULL.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        eval(&self.expr, attributes) == Some(true)
    }
}

fn invalid(clause: &str, reason: impl Into<String>) -> ValcheckError {
    ValcheckError::WhereClause { clause: clause.to_string(), reason: reason.into() }
}

fn collect_fields<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
    let field = match expr {
        Expr::And(a, b) | Expr::Or(a, b) => {
            collect_fields(a, out);
            collect_fields(b, out);
            return;
        }
        Expr::Not(inner) => return collect_fields(inner, out),
        Expr::Compare { field, .. }
        | Expr::In { field, .. }
        | Expr::IsNull { field, .. }
        | Expr::Like { field, .. } => field.as_str(),
    };
    if !out.contains(&field) {
        out.push(field);
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
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
            '\'' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string literal".to_string()),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            text.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            '"' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| *ch == '"')
                    .map(|p| start + p)
                    .ok_or_else(|| "unterminated quoted field name".to_string())?;
                tokens.push(Token::Ident(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '=' => {
                tokens.push(Token::Op("="));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("<>"));
                i += 2;
            }
            '<' => match chars.get(i + 1) {
                Some('>') => {
                    tokens.push(Token::Op("<>"));
                    i += 2;
                }
                Some('=') => {
                    tokens.push(Token::Op("<="));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op("<"));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(">="));
                    i += 2;
                } else {
                    tokens.push(Token::Op(">"));
                    i += 1;
                }
            }
            c if c.is_ascii_digit()
                || c == '.'
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit() || *n == '.')) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse().map_err(|_| format!("invalid number '{}'", text))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult<T> = std::result::Result<T, String>;

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

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(format!("expected {} but found {:?}", keyword, self.peek()))
        }
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(format!("expected {:?} but found {:?}", expected, other)),
        }
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.consume_keyword("OR") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.consume_keyword("AND") {
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.consume_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> ParseResult<Expr> {
        let field = match self.next() {
            Some(Token::Ident(name)) if !is_reserved(&name) => name,
            other => return Err(format!("expected field name but found {:?}", other)),
        };

        if self.consume_keyword("IS") {
            let negated = self.consume_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull { field, negated });
        }

        let negated = self.consume_keyword("NOT");
        if self.consume_keyword("IN") {
            self.expect(Token::LParen)?;
            let mut values = vec![self.parse_literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                values.push(self.parse_literal()?);
            }
            self.expect(Token::RParen)?;
            return Ok(Expr::In { field, values, negated });
        }
        if self.consume_keyword("LIKE") {
            return match self.next() {
                Some(Token::Str(pattern)) => Ok(Expr::Like { field, pattern, negated }),
                other => Err(format!("LIKE expects a string pattern, found {:?}", other)),
            };
        }
        if negated {
            return Err(format!("expected IN or LIKE after NOT, found {:?}", self.peek()));
        }

        let op = match self.next() {
            Some(Token::Op(op)) => match op {
                "=" => CmpOp::Eq,
                "<>" => CmpOp::Ne,
                "<" => CmpOp::Lt,
                "<=" => CmpOp::Le,
                ">" => CmpOp::Gt,
                _ => CmpOp::Ge,
            },
            other => return Err(format!("expected comparison after '{}', found {:?}", field, other)),
        };
        let value = self.parse_literal()?;
        Ok(Expr::Compare { field, op, value })
    }

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Literal::Number(n)),
            Some(Token::Str(s)) => Ok(Literal::Text(s)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("DATE") => match self.next() {
                Some(Token::Str(s)) => parse_datetime(&s)
                    .map(Literal::Date)
                    .ok_or_else(|| format!("invalid date literal '{}'", s)),
                other => Err(format!("DATE expects a string, found {:?}", other)),
            },
            other => Err(format!("expected literal, found {:?}", other)),
        }
    }
}

fn is_reserved(word: &str) -> bool {
    ["AND", "OR", "NOT", "IN", "IS", "NULL", "LIKE"].iter().any(|k| word.eq_ignore_ascii_case(k))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn compare(value: &AttributeValue, literal: &Literal) -> Option<Ordering> {
    if value.is_null() {
        return None;
    }
    match literal {
        Literal::Number(n) => value.as_f64()?.partial_cmp(n),
        Literal::Text(t) => Some(value.as_text().as_str().cmp(t.as_str())),
        Literal::Date(d) => match value {
            AttributeValue::Text(s) => parse_datetime(s).map(|v| v.cmp(d)),
            _ => None,
        },
    }
}

fn like(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like(&text[skip..], rest)),
        Some(('_', rest)) => !text.is_empty() && like(&text[1..], rest),
        Some((c, rest)) => text.first() == Some(c) && like(&text[1..], rest),
    }
}

fn eval(expr: &Expr, attributes: &Attributes) -> Option<bool> {
    let lookup = |field: &str| attributes.get(field).cloned().unwrap_or_default();

    match expr {
        Expr::And(a, b) => match (eval(a, attributes), eval(b, attributes)) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        Expr::Or(a, b) => match (eval(a, attributes), eval(b, attributes)) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        Expr::Not(inner) => eval(inner, attributes).map(|b| !b),
        Expr::Compare { field, op, value } => {
            let ordering = compare(&lookup(field), value)?;
            Some(match op {
                CmpOp::Eq => ordering == Ordering::Equal,
                CmpOp::Ne => ordering != Ordering::Equal,
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Le => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                CmpOp::Ge => ordering != Ordering::Less,
            })
        }
        Expr::In { field, values, negated } => {
            let value = lookup(field);
            if value.is_null() {
                return None;
            }
            let found = values.iter().any(|v| compare(&value, v) == Some(Ordering::Equal));
            Some(found != *negated)
        }
        Expr::IsNull { field, negated } => Some(lookup(field).is_null() != *negated),
        Expr::Like { field, pattern, negated } => {
            let value = lookup(field);
            if value.is_null() {
                return None;
            }
            let text: Vec<char> = value.as_text().chars().collect();
            let pattern: Vec<char> = pattern.chars().collect();
            Some(like(&text, &pattern) != *negated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_in_list_without_space() {
        let clause = WhereClause::parse("FMZDIS IN('SPZ', 'SMZ')").unwrap();
        assert!(clause.matches(&row(&[("FMZDIS", "SPZ".into())])));
        assert!(!clause.matches(&row(&[("FMZDIS", "GMZ".into())])));
        assert!(!clause.matches(&row(&[("FMZDIS", AttributeValue::Null)])));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let clause = WhereClause::parse("A = 1 OR B = 1 AND C = 1").unwrap();
        assert!(clause.matches(&row(&[("A", 1i64.into()), ("B", 0i64.into()), ("C", 0i64.into())])));
        assert!(!clause.matches(&row(&[("A", 0i64.into()), ("B", 1i64.into()), ("C", 0i64.into())])));
    }

    #[test]
    fn test_date_and_numeric_comparison() {
        let clause = WhereClause::parse(
            "(STARTDATE > date '1980-01-01 00:00:00') AND (MAX_ACC_KM <= 0.5)",
        )
        .unwrap();
        assert!(clause.matches(&row(&[
            ("STARTDATE", "1995-06-30".into()),
            ("MAX_ACC_KM", 0.1.into()),
        ])));
        assert!(!clause.matches(&row(&[
            ("STARTDATE", "1975-01-01 00:00:00".into()),
            ("MAX_ACC_KM", 0.1.into()),
        ])));
        assert!(!clause.matches(&row(&[
            ("STARTDATE", "1995-06-30".into()),
            ("MAX_ACC_KM", 2.0.into()),
        ])));
    }

    #[test]
    fn test_null_handling() {
        let clause = WhereClause::parse("RISK_LVL IS NULL OR RISK_LVL <> 'LRLI'").unwrap();
        assert!(clause.matches(&row(&[])));
        assert!(clause.matches(&row(&[("RISK_LVL", "DAP".into())])));
        assert!(!clause.matches(&row(&[("RISK_LVL", "LRLI".into())])));

        let not_blank = WhereClause::parse("DAP_REF_NO <> ''").unwrap();
        assert!(!not_blank.matches(&row(&[("DAP_REF_NO", AttributeValue::Null)])));
        assert!(!not_blank.matches(&row(&[("DAP_REF_NO", "".into())])));
        assert!(not_blank.matches(&row(&[("DAP_REF_NO", "W1".into())])));
    }

    #[test]
    fn test_escaped_quote_and_like() {
        let clause = WhereClause::parse("NAME = 'O''Brien''s Hut'").unwrap();
        assert!(clause.matches(&row(&[("NAME", "O'Brien's Hut".into())])));

        let like = WhereClause::parse("NAME NOT LIKE '%Hut'").unwrap();
        assert!(!like.matches(&row(&[("NAME", "Alpine Hut".into())])));
        assert!(like.matches(&row(&[("NAME", "Hut Creek".into())])));
    }

    #[test]
    fn test_fields_in_first_use_order() {
        let clause = WhereClause::parse(
            "(SITE_CATEGORY IN('FAUNA', 'FLORA') OR RISK_CODE = 'LittoralRF') AND TIMEFRAME <> 'NOT ACTIVE' AND NOT SITE_CATEGORY = 'X'",
        )
        .unwrap();
        assert_eq!(clause.fields(), vec!["SITE_CATEGORY", "RISK_CODE", "TIMEFRAME"]);
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "NAME =", "NAME = 'open", "(A = 1", "A = 1 B = 2", "AND = 1", "A NOT = 1"] {
            let err = WhereClause::parse(bad).unwrap_err();
            assert!(matches!(err, ValcheckError::WhereClause { .. }), "{}", bad);
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_quoted_literal_matches_itself(value in "[A-Za-z0-9 ',.-]{0,20}") {
            let clause = format!("NAME = '{}'", value.replace('\'', "''"));
            let parsed = WhereClause::parse(&clause).unwrap();
            proptest::prop_assert!(parsed.matches(&row(&[("NAME", value.as_str().into())])));
        }
    }
}
