// src/expr.rs
//! Keyword-logic compiler: lexer, bracket parser and DNF expansion.
//!
//! Grammar (informal):
//! - leaves are bare words (`poverty`) or double-quoted phrases (`"mental health"`)
//! - `AND` / `OR` join siblings inside one group, never both in the same group
//! - `( ... )` groups; the whole input is treated as one implicit outer group
//! - juxtaposed operands (`a b`) are an implicit `AND`
//!
//! `compile` returns the expression as an OR of clauses, each clause being an
//! AND of keywords. OR concatenates alternatives in order; AND takes the
//! Cartesian product of its children with the first child varying slowest.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Maximum group nesting accepted by the parser.
pub const MAX_DEPTH: usize = 64;
/// Upper bound on the number of clauses a single expression may expand to.
pub const MAX_CLAUSES: usize = 4096;

static RE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\(|\)|"[^"]*"?|[^\s()"]+"#).expect("expression token regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    And,
    Or,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::And => f.write_str("AND"),
            Op::Or => f.write_str("OR"),
        }
    }
}

/// Parsed keyword expression. Single-child groups are collapsed while parsing,
/// so every `Group` has at least two children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Leaf(String),
    Group(Op, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("empty keyword expression")]
    Empty,
    #[error("unbalanced parentheses in `{expression}`: `(` at byte {at} is never closed")]
    UnclosedGroup { expression: String, at: usize },
    #[error("unbalanced parentheses in `{expression}`: unexpected `)` at byte {at}")]
    UnexpectedClose { expression: String, at: usize },
    #[error("unterminated quoted phrase in `{expression}` at byte {at}")]
    UnterminatedQuote { expression: String, at: usize },
    #[error("empty quoted phrase in `{expression}` at byte {at}")]
    EmptyPhrase { expression: String, at: usize },
    #[error("empty group `()` in `{expression}` at byte {at}")]
    EmptyGroup { expression: String, at: usize },
    #[error("dangling `{operator}` in `{expression}` at byte {at}")]
    DanglingOperator {
        expression: String,
        operator: Op,
        at: usize,
    },
    #[error("check bracketing, cannot have both AND and OR in the same group: `{group}`")]
    MixedOperators { group: String },
    #[error("expression nests deeper than {max} groups")]
    TooDeep { max: usize },
    #[error("expression expands to more than {max} clauses")]
    TooManyClauses { max: usize },
}

impl ExprError {
    /// True for syntax failures (brackets, quotes, operator placement).
    /// Mixed operators and expansion limits are semantic errors.
    pub fn is_parse_error(&self) -> bool {
        !matches!(
            self,
            ExprError::MixedOperators { .. }
                | ExprError::TooDeep { .. }
                | ExprError::TooManyClauses { .. }
        )
    }
}

/// One conjunctive term of the compiled expression: every keyword must be present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Clause(Vec<String>);

impl Clause {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keywords.into_iter().map(Into::into).collect())
    }

    pub fn keywords(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-sensitive substring containment for every keyword. No tokenization,
    /// so `income` also matches inside `incomes`.
    pub fn matches(&self, text: &str) -> bool {
        self.0.iter().all(|k| text.contains(k.as_str()))
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, k) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            if k.contains(char::is_whitespace) {
                write!(f, "\"{k}\"")?;
            } else {
                f.write_str(k)?;
            }
        }
        Ok(())
    }
}

/* ----------------------------
Lexer
---------------------------- */

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    Op(Op),
    Word(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut out = Vec::new();
    for m in RE_TOKEN.find_iter(input) {
        let raw = m.as_str();
        let kind = match raw {
            "(" => TokenKind::Open,
            ")" => TokenKind::Close,
            "AND" => TokenKind::Op(Op::And),
            "OR" => TokenKind::Op(Op::Or),
            _ if raw.starts_with('"') => {
                if raw.len() < 2 || !raw.ends_with('"') {
                    return Err(ExprError::UnterminatedQuote {
                        expression: input.to_string(),
                        at: m.start(),
                    });
                }
                let phrase = &raw[1..raw.len() - 1];
                if phrase.trim().is_empty() {
                    return Err(ExprError::EmptyPhrase {
                        expression: input.to_string(),
                        at: m.start(),
                    });
                }
                TokenKind::Word(phrase.to_string())
            }
            _ => TokenKind::Word(raw.to_string()),
        };
        out.push(Token {
            kind,
            start: m.start(),
            end: m.end(),
        });
    }
    Ok(out)
}

/* ----------------------------
Parser
---------------------------- */

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Parse one group. `open` is the byte offset of its `(`, or `None` for the
    /// implicit outer group. Consumes the matching `)`.
    fn group(&mut self, open: Option<usize>, depth: usize) -> Result<Expr, ExprError> {
        if depth > MAX_DEPTH {
            return Err(ExprError::TooDeep { max: MAX_DEPTH });
        }

        let mut children: Vec<Expr> = Vec::new();
        let mut op: Option<Op> = None;
        let mut mixed = false;
        // Pending explicit operator with its byte offset, waiting for a right operand.
        let mut pending: Option<(Op, usize)> = None;
        let group_start = open.unwrap_or(0);
        let mut group_end = self.input.len();

        loop {
            let Some(tok) = self.tokens.get(self.pos).cloned() else {
                if let Some(at) = open {
                    return Err(ExprError::UnclosedGroup {
                        expression: self.input.to_string(),
                        at,
                    });
                }
                break;
            };
            self.pos += 1;

            let operand = match tok.kind {
                TokenKind::Close => {
                    if open.is_none() {
                        return Err(ExprError::UnexpectedClose {
                            expression: self.input.to_string(),
                            at: tok.start,
                        });
                    }
                    group_end = tok.end;
                    break;
                }
                TokenKind::Op(o) => {
                    if children.is_empty() || pending.is_some() {
                        return Err(ExprError::DanglingOperator {
                            expression: self.input.to_string(),
                            operator: o,
                            at: tok.start,
                        });
                    }
                    pending = Some((o, tok.start));
                    continue;
                }
                TokenKind::Open => self.group(Some(tok.start), depth + 1)?,
                TokenKind::Word(w) => Expr::Leaf(w),
            };

            if !children.is_empty() {
                // Juxtaposition counts as AND for the uniformity check.
                let joined_by = pending.take().map(|(o, _)| o).unwrap_or(Op::And);
                match op {
                    None => op = Some(joined_by),
                    Some(prev) if prev != joined_by => mixed = true,
                    Some(_) => {}
                }
            }
            children.push(operand);
        }

        if let Some((operator, at)) = pending {
            return Err(ExprError::DanglingOperator {
                expression: self.input.to_string(),
                operator,
                at,
            });
        }
        if mixed {
            return Err(ExprError::MixedOperators {
                group: self.input[group_start..group_end].trim().to_string(),
            });
        }

        match children.len() {
            0 => Err(match open {
                Some(at) => ExprError::EmptyGroup {
                    expression: self.input.to_string(),
                    at,
                },
                None => ExprError::Empty,
            }),
            1 => Ok(children.remove(0)),
            _ => Ok(Expr::Group(op.unwrap_or(Op::And), children)),
        }
    }
}

/// Parse an expression into its tagged tree.
pub fn parse(expression: &str) -> Result<Expr, ExprError> {
    let tokens = lex(expression)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser {
        input: expression,
        tokens,
        pos: 0,
    };
    parser.group(None, 0)
}

/* ----------------------------
DNF expansion
---------------------------- */

impl Expr {
    /// Expand into DNF clauses.
    pub fn unroll(&self) -> Result<Vec<Clause>, ExprError> {
        Ok(unroll(self)?.into_iter().map(Clause).collect())
    }
}

fn unroll(expr: &Expr) -> Result<Vec<Vec<String>>, ExprError> {
    match expr {
        Expr::Leaf(k) => Ok(vec![vec![k.clone()]]),
        Expr::Group(Op::Or, children) => {
            let mut out = Vec::new();
            for child in children {
                out.extend(unroll(child)?);
                if out.len() > MAX_CLAUSES {
                    return Err(ExprError::TooManyClauses { max: MAX_CLAUSES });
                }
            }
            Ok(out)
        }
        Expr::Group(Op::And, children) => {
            let mut acc: Vec<Vec<String>> = vec![Vec::new()];
            for child in children {
                let alts = unroll(child)?;
                if acc.len().saturating_mul(alts.len()) > MAX_CLAUSES {
                    return Err(ExprError::TooManyClauses { max: MAX_CLAUSES });
                }
                let mut next = Vec::with_capacity(acc.len() * alts.len());
                for prefix in &acc {
                    for alt in &alts {
                        let mut clause = prefix.clone();
                        clause.extend(alt.iter().cloned());
                        next.push(clause);
                    }
                }
                acc = next;
            }
            Ok(acc)
        }
    }
}

/// Compile a keyword expression into DNF clauses (OR of ANDs).
///
/// ```
/// use qaly_curator::expr::{compile, Clause};
///
/// let clauses = compile("climate AND (change OR crisis)").unwrap();
/// assert_eq!(
///     clauses,
///     vec![Clause::new(["climate", "change"]), Clause::new(["climate", "crisis"])]
/// );
/// ```
pub fn compile(expression: &str) -> Result<Vec<Clause>, ExprError> {
    parse(expression)?.unroll()
}
