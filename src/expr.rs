//! Expression Evaluator (spec.md §4.G): a precedence-climbing parser/evaluator
//! for the `expr` mini-language, reusing the word grammar's `$var`/`[cmd]`/
//! backslash scanning (via [`crate::parser`]) for operand text so `expr {$x+1}`
//! and a bare command word substitute identically.
//!
//! Parsing builds a small AST first rather than evaluating while parsing, so
//! that `&&`/`||` can short-circuit without ever substituting the unused
//! operand's `$var`/`[cmd]` segments (spec.md §4.G "short-circuit").

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, MathOp, ValueHandle};
use crate::interp::Interp;
use crate::parser::{Parser, Segment};
use crate::value::{self, Number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    StrEq,
    StrNe,
    In,
    Ni,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone)]
enum Expr {
    /// Raw bareword/number/braced text: substituted as a plain string, numeric
    /// parsing happens lazily at evaluation.
    Literal(Vec<u8>),
    /// `$var`, `[cmd]`, or a `"..."` operand: one or more segments reusing the
    /// word-substitution grammar.
    Segments(Vec<Segment>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

fn err(message: impl Into<String>) -> Signal {
    Signal::Error(CoreError::new(ErrorKind::Parse, message.into()))
}

struct ExprParser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_ws(&mut self) {
        while matches!(self.src.get(self.pos), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn starts_with(&self, lit: &str) -> bool {
        self.src[self.pos..].starts_with(lit.as_bytes())
    }

    /// A keyword operator (`eq`, `ne`, `in`, `ni`) only matches when not
    /// immediately followed by an identifier character (so `nex` isn't read
    /// as `ne` + `x`).
    fn starts_with_keyword(&self, kw: &str) -> bool {
        self.starts_with(kw) && !matches!(self.src.get(self.pos + kw.len()), Some(b) if b.is_ascii_alphanumeric() || *b == b'_')
    }

    fn parse_top(&mut self) -> Result<Expr, Signal> {
        let e = self.parse_ternary()?;
        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(err(format!("syntax error in expression: extra characters after expression at offset {}", self.pos)));
        }
        Ok(e)
    }

    fn parse_ternary(&mut self) -> Result<Expr, Signal> {
        let cond = self.parse_binary(2)?;
        self.skip_ws();
        if self.peek_byte() == Some(b'?') {
            self.pos += 1;
            let if_true = self.parse_ternary()?;
            self.skip_ws();
            if self.peek_byte() != Some(b':') {
                return Err(err("syntax error in expression: expected ':' in ternary"));
            }
            self.pos += 1;
            let if_false = self.parse_ternary()?;
            return Ok(Expr::Ternary(Box::new(cond), Box::new(if_true), Box::new(if_false)));
        }
        Ok(cond)
    }

    /// Returns `(op, precedence, right_associative, token_len)` for the
    /// operator at the current position, or `None` if none matches. Checked
    /// longest-token-first within each precedence tier.
    fn peek_binop(&mut self) -> Option<(BinOp, u8, bool, usize)> {
        self.skip_ws();
        let table: &[(&str, BinOp, u8, bool)] = &[
            ("||", BinOp::Or, 2, false),
            ("&&", BinOp::And, 3, false),
            ("|", BinOp::BitOr, 4, false),
            ("^", BinOp::BitXor, 5, false),
            ("&", BinOp::BitAnd, 6, false),
            ("==", BinOp::Eq, 7, false),
            ("!=", BinOp::Ne, 7, false),
            ("eq", BinOp::StrEq, 8, false),
            ("ne", BinOp::StrNe, 8, false),
            ("in", BinOp::In, 9, false),
            ("ni", BinOp::Ni, 9, false),
            ("<=", BinOp::Le, 10, false),
            (">=", BinOp::Ge, 10, false),
            ("<<", BinOp::Shl, 11, false),
            (">>", BinOp::Shr, 11, false),
            ("<", BinOp::Lt, 10, false),
            (">", BinOp::Gt, 10, false),
            ("+", BinOp::Add, 12, false),
            ("-", BinOp::Sub, 12, false),
            ("**", BinOp::Pow, 14, true),
            ("*", BinOp::Mul, 13, false),
            ("/", BinOp::Div, 13, false),
            ("%", BinOp::Mod, 13, false),
        ];
        for &(lit, op, prec, right) in table {
            let is_word = lit.chars().next().is_some_and(char::is_alphabetic);
            let matches = if is_word { self.starts_with_keyword(lit) } else { self.starts_with(lit) };
            if matches {
                return Some((op, prec, right, lit.len()));
            }
        }
        None
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Signal> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((op, prec, right, len)) = self.peek_binop() else { break };
            if prec < min_prec {
                break;
            }
            self.pos += len;
            let next_min = if right { prec } else { prec + 1 };
            let rhs = self.parse_binary(next_min)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Signal> {
        self.skip_ws();
        match self.peek_byte() {
            Some(b'-') => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()?)))
            }
            Some(b'+') => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::Plus, Box::new(self.parse_unary()?)))
            }
            Some(b'!') => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::Not, Box::new(self.parse_unary()?)))
            }
            Some(b'~') => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::BitNot, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Signal> {
        self.skip_ws();
        match self.peek_byte() {
            None => Err(err("syntax error in expression: unexpected end of input")),
            Some(b'(') => {
                self.pos += 1;
                let inner = self.parse_ternary()?;
                self.skip_ws();
                if self.peek_byte() != Some(b')') {
                    return Err(err("syntax error in expression: missing close-parenthesis"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(b'{') => {
                let body_start = self.pos + 1;
                let end = crate::parser::scan_balanced(self.src, body_start, b'{', b'}').map_err(|_| err("missing close-brace"))?;
                self.pos = end;
                Ok(Expr::Literal(self.src[body_start..end - 1].to_vec()))
            }
            Some(b'"') => {
                let mut i = self.pos + 1;
                loop {
                    match self.src.get(i) {
                        None => return Err(err("missing close-quote")),
                        Some(b'\\') => i += if self.src.get(i + 1).is_some() { 2 } else { 1 },
                        Some(b'"') => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                let ephemeral = Parser::new(self.src);
                let segments = ephemeral.scan_segments(self.pos + 1, i - 1).map_err(|_| err("bad substitution in quoted expression operand"))?;
                self.pos = i;
                Ok(Expr::Segments(segments))
            }
            Some(b'$') => {
                let ephemeral = Parser::new(self.src);
                match ephemeral.scan_variable(self.pos, self.src.len()) {
                    Some((seg, next)) => {
                        self.pos = next;
                        Ok(Expr::Segments(vec![seg]))
                    }
                    None => Err(err("syntax error in expression: bad variable reference")),
                }
            }
            Some(b'[') => {
                let end = crate::parser::scan_balanced(self.src, self.pos + 1, b'[', b']').map_err(|_| err("missing close-bracket"))?;
                let script = self.src[self.pos + 1..end - 1].to_vec();
                let range = crate::parser::CodeRange::new(self.pos, end);
                self.pos = end;
                Ok(Expr::Segments(vec![Segment::CommandSub { script, range }]))
            }
            Some(b) if b.is_ascii_digit() || b == b'.' => self.parse_number_literal(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.parse_ident_or_call(),
            Some(other) => Err(err(format!("syntax error in expression: unexpected character '{}'", other as char))),
        }
    }

    fn parse_number_literal(&mut self) -> Result<Expr, Signal> {
        let start = self.pos;
        if self.starts_with("0x") || self.starts_with("0X") || self.starts_with("0o") || self.starts_with("0O") || self.starts_with("0b") || self.starts_with("0B") {
            self.pos += 2;
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                self.pos += 1;
            }
            return Ok(Expr::Literal(self.src[start..self.pos].to_vec()));
        }
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit() || b == b'_') {
            self.pos += 1;
        }
        if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit() || b == b'_') {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        Ok(Expr::Literal(self.src[start..self.pos].to_vec()))
    }

    fn parse_ident_or_call(&mut self) -> Result<Expr, Signal> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let name = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if self.peek_byte() == Some(b'(') {
            self.pos += 1;
            let mut args = Vec::new();
            self.skip_ws();
            if self.peek_byte() != Some(b')') {
                loop {
                    args.push(self.parse_ternary()?);
                    self.skip_ws();
                    match self.peek_byte() {
                        Some(b',') => {
                            self.pos += 1;
                        }
                        Some(b')') => break,
                        _ => return Err(err("syntax error in expression: expected ',' or ')' in function call")),
                    }
                }
            }
            self.skip_ws();
            if self.peek_byte() != Some(b')') {
                return Err(err("syntax error in expression: missing close-parenthesis in function call"));
            }
            self.pos += 1;
            return Ok(Expr::Call(name, args));
        }
        Ok(Expr::Literal(name.into_bytes()))
    }
}

fn as_number<H: HostOps>(interp: &mut Interp<H>, node: &Expr) -> Result<Number, Signal> {
    let v = eval_node(interp, node)?;
    value::try_as_number(&mut interp.host, v).map_err(Signal::Error)
}

fn as_int<H: HostOps>(interp: &mut Interp<H>, node: &Expr) -> Result<i64, Signal> {
    match as_number(interp, node)? {
        Number::Int(i) => Ok(i),
        #[allow(clippy::cast_possible_truncation)]
        Number::Double(d) => Ok(d as i64),
    }
}

fn as_bool<H: HostOps>(interp: &mut Interp<H>, node: &Expr) -> Result<bool, Signal> {
    let v = eval_node(interp, node)?;
    value::try_as_bool(&interp.host, v).map_err(Signal::Error)
}

/// Floored division, matching Tcl's integer `/` (sign follows the divisor,
/// unlike Rust's truncating default).
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) { r + b } else { r }
}

fn num_to_value<H: HostOps>(interp: &mut Interp<H>, n: Number) -> CmdResult {
    match n {
        Number::Int(i) => value::new_integer(&mut interp.host, i, Arena::Scratch).map_err(Signal::Error),
        Number::Double(d) => {
            let text = interp.host.double_format(d, crate::hostops::FormatSpecifier::General, None);
            let v = interp.new_string(&text, Arena::Scratch).map_err(Signal::Error)?;
            interp.host.value_install_double(v, d).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
            Ok(v)
        }
    }
}

fn bool_to_value<H: HostOps>(interp: &mut Interp<H>, b: bool) -> CmdResult {
    value::new_bool(&mut interp.host, b, Arena::Scratch).map_err(Signal::Error)
}

fn eval_binary_numeric<H: HostOps>(interp: &mut Interp<H>, op: BinOp, lhs: &Expr, rhs: &Expr) -> CmdResult {
    let a = as_number(interp, lhs)?;
    let b = as_number(interp, rhs)?;
    match op {
        BinOp::BitOr | BinOp::BitXor | BinOp::BitAnd | BinOp::Shl | BinOp::Shr => {
            let (Number::Int(ai), Number::Int(bi)) = (a, b) else {
                return Err(Signal::Error(CoreError::new(ErrorKind::Type, "bitwise operators require integer operands")));
            };
            let r = match op {
                BinOp::BitOr => ai | bi,
                BinOp::BitXor => ai ^ bi,
                BinOp::BitAnd => ai & bi,
                BinOp::Shl => ai.wrapping_shl((bi & 63) as u32),
                BinOp::Shr => ai.wrapping_shr((bi & 63) as u32),
                _ => unreachable!(),
            };
            num_to_value(interp, Number::Int(r))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let af = a.as_f64();
            let bf = b.as_f64();
            let r = match op {
                BinOp::Lt => af < bf,
                BinOp::Le => af <= bf,
                BinOp::Gt => af > bf,
                BinOp::Ge => af >= bf,
                _ => unreachable!(),
            };
            bool_to_value(interp, r)
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul => {
            if let (Number::Int(ai), Number::Int(bi)) = (a, b) {
                let r = match op {
                    BinOp::Add => ai.wrapping_add(bi),
                    BinOp::Sub => ai.wrapping_sub(bi),
                    BinOp::Mul => ai.wrapping_mul(bi),
                    _ => unreachable!(),
                };
                num_to_value(interp, Number::Int(r))
            } else {
                let (af, bf) = (a.as_f64(), b.as_f64());
                let r = match op {
                    BinOp::Add => af + bf,
                    BinOp::Sub => af - bf,
                    BinOp::Mul => af * bf,
                    _ => unreachable!(),
                };
                num_to_value(interp, Number::Double(r))
            }
        }
        BinOp::Div => {
            if let (Number::Int(ai), Number::Int(bi)) = (a, b) {
                if bi == 0 {
                    return Err(Signal::Error(CoreError::divide_by_zero()));
                }
                num_to_value(interp, Number::Int(floor_div(ai, bi)))
            } else {
                num_to_value(interp, Number::Double(a.as_f64() / b.as_f64()))
            }
        }
        BinOp::Mod => {
            let (Number::Int(ai), Number::Int(bi)) = (a, b) else {
                return Err(Signal::Error(CoreError::new(ErrorKind::Type, "can't use floating-point value as operand of \"%\"")));
            };
            if bi == 0 {
                return Err(Signal::Error(CoreError::divide_by_zero()));
            }
            num_to_value(interp, Number::Int(floor_mod(ai, bi)))
        }
        BinOp::Pow => {
            if let (Number::Int(ai), Number::Int(bi)) = (a, b) {
                if bi >= 0 {
                    #[allow(clippy::cast_sign_loss)]
                    let r = ai.wrapping_pow(bi as u32);
                    return num_to_value(interp, Number::Int(r));
                }
            }
            num_to_value(interp, Number::Double(a.as_f64().powf(b.as_f64())))
        }
        _ => unreachable!("non-numeric op routed to eval_binary_numeric"),
    }
}

fn eval_node<H: HostOps>(interp: &mut Interp<H>, node: &Expr) -> CmdResult {
    match node {
        Expr::Literal(bytes) => interp.host.value_from_bytes(bytes, Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message))),
        Expr::Segments(segments) => crate::subst::subst_segments(interp, segments),
        Expr::Unary(op, inner) => match op {
            UnOp::Not => {
                let b = as_bool(interp, inner)?;
                bool_to_value(interp, !b)
            }
            UnOp::BitNot => {
                let i = as_int(interp, inner)?;
                num_to_value(interp, Number::Int(!i))
            }
            UnOp::Neg => match as_number(interp, inner)? {
                Number::Int(i) => num_to_value(interp, Number::Int(i.wrapping_neg())),
                Number::Double(d) => num_to_value(interp, Number::Double(-d)),
            },
            UnOp::Plus => {
                let n = as_number(interp, inner)?;
                num_to_value(interp, n)
            }
        },
        Expr::Binary(BinOp::And, lhs, rhs) => {
            if !as_bool(interp, lhs)? {
                return bool_to_value(interp, false);
            }
            let r = as_bool(interp, rhs)?;
            bool_to_value(interp, r)
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            if as_bool(interp, lhs)? {
                return bool_to_value(interp, true);
            }
            let r = as_bool(interp, rhs)?;
            bool_to_value(interp, r)
        }
        Expr::Binary(op @ (BinOp::Eq | BinOp::Ne), lhs, rhs) => {
            // Numeric `==`/`!=` still compares numerically when both sides
            // shimmer to numbers; falls back to string comparison otherwise.
            let lv = eval_node(interp, lhs)?;
            let rv = eval_node(interp, rhs)?;
            let eq = match (value::try_as_number(&mut interp.host, lv), value::try_as_number(&mut interp.host, rv)) {
                (Ok(a), Ok(b)) => a.as_f64() == b.as_f64(),
                _ => value::values_equal(&interp.host, lv, rv).map_err(Signal::Error)?,
            };
            bool_to_value(interp, if *op == BinOp::Eq { eq } else { !eq })
        }
        Expr::Binary(op @ (BinOp::StrEq | BinOp::StrNe), lhs, rhs) => {
            let lv = eval_node(interp, lhs)?;
            let rv = eval_node(interp, rhs)?;
            let eq = value::values_equal(&interp.host, lv, rv).map_err(Signal::Error)?;
            bool_to_value(interp, if *op == BinOp::StrEq { eq } else { !eq })
        }
        Expr::Binary(op @ (BinOp::In | BinOp::Ni), lhs, rhs) => {
            let needle = eval_node(interp, lhs)?;
            let haystack = eval_node(interp, rhs)?;
            let list = interp.host.list_try_as(haystack, Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
            let n = interp.host.list_length(list).unwrap_or(0);
            let mut found = false;
            for i in 0..n {
                if let Some(item) = interp.host.list_at(list, i as i64) {
                    if value::values_equal(&interp.host, needle, item).map_err(Signal::Error)? {
                        found = true;
                        break;
                    }
                }
            }
            bool_to_value(interp, if *op == BinOp::In { found } else { !found })
        }
        Expr::Binary(op, lhs, rhs) => eval_binary_numeric(interp, *op, lhs, rhs),
        Expr::Ternary(cond, if_true, if_false) => {
            if as_bool(interp, cond)? {
                eval_node(interp, if_true)
            } else {
                eval_node(interp, if_false)
            }
        }
        Expr::Call(name, args) => eval_call(interp, name, args),
    }
}

fn eval_call<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[Expr]) -> CmdResult {
    match name {
        "double" => {
            expect_arity(name, args, 1)?;
            let n = as_number(interp, &args[0])?;
            num_to_value(interp, Number::Double(n.as_f64()))
        }
        "int" | "wide" => {
            expect_arity(name, args, 1)?;
            let n = as_number(interp, &args[0])?;
            #[allow(clippy::cast_possible_truncation)]
            let i = match n {
                Number::Int(i) => i,
                Number::Double(d) => d as i64,
            };
            num_to_value(interp, Number::Int(i))
        }
        "bool" => {
            expect_arity(name, args, 1)?;
            let b = as_bool(interp, &args[0])?;
            bool_to_value(interp, b)
        }
        "isnan" => {
            expect_arity(name, args, 1)?;
            let d = as_number(interp, &args[0])?.as_f64();
            bool_to_value(interp, d.is_nan())
        }
        "isinf" => {
            expect_arity(name, args, 1)?;
            let d = as_number(interp, &args[0])?.as_f64();
            bool_to_value(interp, d.is_infinite())
        }
        "abs" => {
            expect_arity(name, args, 1)?;
            match as_number(interp, &args[0])? {
                Number::Int(i) => num_to_value(interp, Number::Int(i.wrapping_abs())),
                Number::Double(d) => num_to_value(interp, Number::Double(d.abs())),
            }
        }
        _ => {
            let op = math_op(name).ok_or_else(|| Signal::Error(CoreError::new(ErrorKind::Name, format!("unknown math function \"{name}\""))))?;
            let arity = math_arity(op);
            expect_arity(name, args, arity)?;
            let a = as_number(interp, &args[0])?.as_f64();
            let b = if arity == 2 { Some(as_number(interp, &args[1])?.as_f64()) } else { None };
            let r = interp.host.double_math(op, a, b).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Arith, e.message)))?;
            num_to_value(interp, Number::Double(r))
        }
    }
}

fn expect_arity(name: &str, args: &[Expr], n: usize) -> Result<(), Signal> {
    if args.len() == n {
        Ok(())
    } else {
        Err(Signal::Error(CoreError::new(ErrorKind::Arity, format!("too {} arguments for math function \"{name}\"", if args.len() > n { "many" } else { "few" }))))
    }
}

fn math_op(name: &str) -> Option<MathOp> {
    Some(match name {
        "sqrt" => MathOp::Sqrt,
        "exp" => MathOp::Exp,
        "log" => MathOp::Log,
        "log10" => MathOp::Log10,
        "sin" => MathOp::Sin,
        "cos" => MathOp::Cos,
        "tan" => MathOp::Tan,
        "asin" => MathOp::Asin,
        "acos" => MathOp::Acos,
        "atan" => MathOp::Atan,
        "sinh" => MathOp::Sinh,
        "cosh" => MathOp::Cosh,
        "tanh" => MathOp::Tanh,
        "floor" => MathOp::Floor,
        "ceil" => MathOp::Ceil,
        "round" => MathOp::Round,
        "pow" => MathOp::Pow,
        "atan2" => MathOp::Atan2,
        "fmod" => MathOp::Fmod,
        "hypot" => MathOp::Hypot,
        _ => return None,
    })
}

fn math_arity(op: MathOp) -> usize {
    matches!(op, MathOp::Pow | MathOp::Atan2 | MathOp::Fmod | MathOp::Hypot).then_some(2).unwrap_or(1)
}

/// `expr` entry point (spec.md §4.G / §6): parses and evaluates `src` as one
/// expression, returning its result value.
pub fn eval_expr<H: HostOps>(interp: &mut Interp<H>, src: &[u8]) -> CmdResult {
    let mut parser = ExprParser::new(src);
    let ast = parser.parse_top()?;
    eval_node(interp, &ast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Limits;
    use crate::mem_hostops::MemHost;

    fn new_interp() -> Interp<MemHost> {
        Interp::new(MemHost::new(), Limits::default()).unwrap()
    }

    fn eval(src: &str) -> String {
        let mut interp = new_interp();
        let v = eval_expr(&mut interp, src.as_bytes()).unwrap_or_else(|e| panic!("{e:?}"));
        String::from_utf8_lossy(interp.host.value_string_bytes(v).unwrap()).into_owned()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), "7");
        assert_eq!(eval("(1 + 2) * 3"), "9");
    }

    #[test]
    fn integer_division_floors_toward_negative_infinity() {
        assert_eq!(eval("-7 / 2"), "-4");
        assert_eq!(eval("-7 % 2"), "1");
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(eval("2 ** 3 ** 2"), "512");
    }

    #[test]
    fn ternary_and_comparisons() {
        assert_eq!(eval("1 < 2 ? 10 : 20"), "10");
    }

    #[test]
    fn string_eq_operator() {
        assert_eq!(eval("\"ab\" eq \"ab\""), "1");
        assert_eq!(eval("\"ab\" ne \"cd\""), "1");
    }

    #[test]
    fn short_circuit_and_avoids_command_substitution() {
        // Division by zero in the RHS would error if evaluated; && must not
        // evaluate it once the LHS is false.
        assert_eq!(eval("0 && (1 / 0)"), "0");
    }

    #[test]
    fn unary_and_bitwise() {
        assert_eq!(eval("~0"), "-1");
        assert_eq!(eval("5 & 3"), "1");
        assert_eq!(eval("5 | 2"), "7");
    }

    #[test]
    fn function_call_dispatches_to_double_math() {
        assert_eq!(eval("floor(3.7)"), "3.0");
    }

    #[test]
    fn in_operator_checks_list_membership() {
        assert_eq!(eval("2 in {1 2 3}"), "1");
        assert_eq!(eval("9 ni {1 2 3}"), "1");
    }
}
