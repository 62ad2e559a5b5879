//! Compiler for the line-oriented per-pixel style language.
//!
//! A program is a list of bindings, one per line:
//!
//! ```text
//! red_f := 255 / (vmax[bandmap.r] - vmin[bandmap.r])
//! red   := (bands[bandmap.r] - vmin[bandmap.r]) * results.red_f
//! green := 128
//! blue  := results.red
//! ```
//!
//! Atoms are numbers, `bands[i]` (raw value in slot `i` of the pixel),
//! `bandmap.X` (position of band `X`), `vmin[i]` / `vmax[i]` (stretch range
//! bounds of band `i`) and `results.name` (an earlier binding). Expressions
//! use `+ - * /`, unary minus and parentheses.
//!
//! Everything except `bands[..]` and `results.*` is known at compile time and
//! folds to a constant, so every index must fold too. Band references, range
//! lookups and result names are all checked before any pixel is touched.
use thiserror::Error;
use tracing::debug;

use crate::core::bands::{Band, BandMap};
use crate::core::processing::stretch::BandRange;
use crate::style::PixelStyle;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("program does not bind `{name}`")]
    MissingBinding { name: &'static str },

    #[error("line {line}: band `{band}` is not in the band order")]
    UnknownBand { line: usize, band: String },

    #[error("line {line}: `results.{name}` is not bound on an earlier line")]
    UnknownResult { line: usize, name: String },

    #[error("line {line}: index does not reduce to a constant")]
    NonConstantIndex { line: usize },

    #[error("line {line}: {what}[{index}] is out of range")]
    IndexOutOfRange {
        line: usize,
        what: &'static str,
        index: f64,
    },

    #[error("line {line}: stretch range {index} is unavailable")]
    RangeUnavailable { line: usize, index: usize },
}

type CompileResult<T> = std::result::Result<T, CompileError>;

const REQUIRED: [&str; 3] = ["red", "green", "blue"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(f64),
    /// Raw pixel slot.
    Band(usize),
    /// Value of the binding at this position in the program.
    Binding(usize),
    Neg(Box<Expr>),
    BinOp {
        op: char,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

fn arith(op: char, l: f64, r: f64) -> f64 {
    match op {
        '+' => l + r,
        '-' => l - r,
        '*' => l * r,
        _ => l / r,
    }
}

impl Expr {
    fn negate(inner: Expr) -> Expr {
        match inner {
            Expr::Num(n) => Expr::Num(-n),
            other => Expr::Neg(Box::new(other)),
        }
    }

    fn binary(op: char, left: Expr, right: Expr) -> Expr {
        match (left, right) {
            (Expr::Num(l), Expr::Num(r)) => Expr::Num(arith(op, l, r)),
            (left, right) => Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    #[inline]
    fn eval(&self, pixel: &[f64], results: &[f64]) -> f64 {
        match self {
            Expr::Num(n) => *n,
            Expr::Band(i) => pixel.get(*i).copied().unwrap_or(0.0),
            Expr::Binding(i) => results.get(*i).copied().unwrap_or(f64::NAN),
            Expr::Neg(inner) => -inner.eval(pixel, results),
            Expr::BinOp { op, left, right } => {
                arith(*op, left.eval(pixel, results), right.eval(pixel, results))
            }
        }
    }
}

fn tokenize(text: &str, line: usize) -> CompileResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(chars[i]));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            c if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) =>
            {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num: String = chars[start..i].iter().collect();
                let value = num.parse::<f64>().map_err(|_| CompileError::Syntax {
                    line,
                    message: format!("invalid number `{}`", num),
                })?;
                tokens.push(Token::Number(value));
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c => {
                return Err(CompileError::Syntax {
                    line,
                    message: format!("unexpected character `{}`", c),
                });
            }
        }
    }
    Ok(tokens)
}

/// What an expression may refer to while a given line is parsed.
struct Scope<'a> {
    ranges: &'a [BandRange],
    bandmap: &'a BandMap,
    /// Names bound on earlier lines, in program order.
    earlier: &'a [String],
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
    scope: &'a Scope<'a>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, line: usize, scope: &'a Scope<'a>) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
            scope,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn syntax(&self, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn expect(&mut self, want: Token, what: &str) -> CompileResult<()> {
        match self.advance() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(self.syntax(format!("expected {}, found {:?}", what, t))),
            None => Err(self.syntax(format!("expected {}, found end of line", what))),
        }
    }

    fn ident(&mut self) -> CompileResult<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(t) => Err(self.syntax(format!("expected a name, found {:?}", t))),
            None => Err(self.syntax("expected a name, found end of line")),
        }
    }

    /// Parse a whole line's expression; trailing tokens are an error.
    fn parse_line(&mut self) -> CompileResult<Expr> {
        let expr = self.parse_expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(t) => Err(self.syntax(format!("unexpected {:?} after expression", t))),
        }
    }

    /// expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// term = factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// factor = number | reference | '(' expr ')' | '-' factor
    fn parse_factor(&mut self) -> CompileResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Num(n)),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(expr)
            }
            Some(Token::Op('-')) => Ok(Expr::negate(self.parse_factor()?)),
            Some(Token::Op('+')) => self.parse_factor(),
            Some(Token::Ident(name)) => self.parse_reference(&name),
            Some(t) => Err(self.syntax(format!("unexpected {:?}", t))),
            None => Err(self.syntax("unexpected end of line")),
        }
    }

    fn parse_reference(&mut self, name: &str) -> CompileResult<Expr> {
        match name {
            "bands" => {
                let idx = self.parse_index("bands")?;
                if idx >= self.scope.bandmap.len() {
                    return Err(CompileError::IndexOutOfRange {
                        line: self.line,
                        what: "bands",
                        index: idx as f64,
                    });
                }
                Ok(Expr::Band(idx))
            }
            "vmin" | "vmax" => {
                let what = if name == "vmin" { "vmin" } else { "vmax" };
                let idx = self.parse_index(what)?;
                let range = self.scope.ranges.get(idx).ok_or(CompileError::IndexOutOfRange {
                    line: self.line,
                    what,
                    index: idx as f64,
                })?;
                let (low, high) = range.bounds().ok_or(CompileError::RangeUnavailable {
                    line: self.line,
                    index: idx,
                })?;
                let bound = if what == "vmin" { low } else { high };
                Ok(Expr::Num(f64::from(bound)))
            }
            "bandmap" => {
                self.expect(Token::Dot, "`.` after `bandmap`")?;
                let letter = self.ident()?;
                let unknown = || CompileError::UnknownBand {
                    line: self.line,
                    band: letter.clone(),
                };
                let mut chars = letter.chars();
                let band = match (chars.next(), chars.next()) {
                    (Some(c), None) => Band::new(c).map_err(|_| unknown())?,
                    _ => return Err(unknown()),
                };
                let pos = self.scope.bandmap.get(band).ok_or_else(unknown)?;
                Ok(Expr::Num(pos as f64))
            }
            "results" => {
                self.expect(Token::Dot, "`.` after `results`")?;
                let target = self.ident()?;
                self.scope
                    .earlier
                    .iter()
                    .rposition(|n| *n == target)
                    .map(Expr::Binding)
                    .ok_or(CompileError::UnknownResult {
                        line: self.line,
                        name: target,
                    })
            }
            other => Err(self.syntax(format!("unknown name `{}`", other))),
        }
    }

    /// `[expr]` where `expr` folds to a non-negative integer.
    fn parse_index(&mut self, what: &'static str) -> CompileResult<usize> {
        self.expect(Token::LBracket, "`[`")?;
        let expr = self.parse_expr()?;
        self.expect(Token::RBracket, "`]`")?;
        match expr {
            Expr::Num(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
                Ok(v as usize)
            }
            Expr::Num(v) => Err(CompileError::IndexOutOfRange {
                line: self.line,
                what,
                index: v,
            }),
            _ => Err(CompileError::NonConstantIndex { line: self.line }),
        }
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A compiled style program; immutable and shareable across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleProgram {
    names: Vec<String>,
    exprs: Vec<Expr>,
    /// Binding positions written to slots 0..=3; alpha is optional.
    outputs: [Option<usize>; 4],
}

impl StyleProgram {
    /// Binding names in program order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn binds_alpha(&self) -> bool {
        self.outputs[3].is_some()
    }
}

/// Compile `source` against the stretch `ranges` and band positions it will
/// run with.
///
/// Blank lines are ignored; every other line must be `name := expression`.
/// A name may be bound more than once; later references see the latest
/// earlier binding, and the last binding of an output name is written.
pub fn compile_program(
    source: &str,
    ranges: &[BandRange],
    bandmap: &BandMap,
) -> CompileResult<StyleProgram> {
    let mut names: Vec<String> = Vec::new();
    let mut exprs = Vec::new();

    for (n, raw) in source.lines().enumerate() {
        let line = n + 1;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }
        let (name, body) = text.split_once(":=").ok_or(CompileError::Syntax {
            line,
            message: "expected `name := expression`".to_string(),
        })?;
        let name = name.trim();
        if !is_name(name) {
            return Err(CompileError::Syntax {
                line,
                message: format!("invalid binding name `{}`", name),
            });
        }

        let scope = Scope {
            ranges,
            bandmap,
            earlier: &names,
        };
        let expr = Parser::new(tokenize(body, line)?, line, &scope).parse_line()?;
        names.push(name.to_string());
        exprs.push(expr);
    }

    let position = |wanted: &str| names.iter().rposition(|n| n == wanted);
    let mut outputs = [None; 4];
    for (slot, &wanted) in REQUIRED.iter().enumerate() {
        let found = position(wanted).ok_or(CompileError::MissingBinding { name: wanted })?;
        outputs[slot] = Some(found);
    }
    outputs[3] = position("alpha");

    debug!("compiled style program with {} bindings", names.len());
    Ok(StyleProgram {
        names,
        exprs,
        outputs,
    })
}

impl PixelStyle for StyleProgram {
    /// Evaluate the bindings in order and write the floored `red`, `green`,
    /// `blue` (and `alpha`, when bound) into slots 0..=3. Band positions were
    /// fixed at compile time, so the runtime band map is not consulted.
    fn apply(&self, pixel: &mut [f64], _bandmap: &BandMap) {
        let mut results = Vec::with_capacity(self.exprs.len());
        for expr in &self.exprs {
            let v = expr.eval(pixel, &results);
            results.push(v);
        }
        for (slot, out) in pixel.iter_mut().zip(self.outputs) {
            if let Some(v) = out.and_then(|i| results.get(i)) {
                *slot = v.floor();
            }
        }
    }
}
