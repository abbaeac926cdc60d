// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The template evaluator (4.C): expands `{{ expr }}` references inside
//! `with`, `test`, `echo`, and `name` fields against the rolling context.

use crate::error::TemplateError;
use crate::template_ast::{BinOp, Expr};
use crate::template_lexer::{lex, Token};
use indexmap::IndexMap;
use probe_core::{Context, Value};

/// Parses a single expression (the contents of one `{{ ... }}` block,
/// without the delimiters).
pub fn parse_expr(src: &str) -> Result<Expr, TemplateError> {
    let tokens = lex(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_eof(&self) -> Result<(), TemplateError> {
        if matches!(self.peek(), Token::Eof) {
            Ok(())
        } else {
            Err(TemplateError::Syntax(format!(
                "unexpected trailing token: {:?}",
                self.peek()
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Token::OrOr) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek(), Token::AndAnd) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, TemplateError> {
        match self.peek() {
            Token::Not => {
                self.advance();
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            Token::Minus => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, TemplateError> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Lit(Value::Int(n))),
            Token::Float(f) => Ok(Expr::Lit(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Lit(Value::String(s))),
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Token::RParen => Ok(inner),
                    other => Err(TemplateError::Syntax(format!(
                        "expected ')', found {other:?}"
                    ))),
                }
            }
            Token::Ident(name) => {
                if name == "true" {
                    return Ok(Expr::Lit(Value::Bool(true)));
                }
                if name == "false" {
                    return Ok(Expr::Lit(Value::Bool(false)));
                }
                if name == "null" {
                    return Ok(Expr::Lit(Value::Null));
                }
                if matches!(self.peek(), Token::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Token::RParen) {
                        loop {
                            args.push(self.parse_or()?);
                            if matches!(self.peek(), Token::Comma) {
                                self.advance();
                                continue;
                            }
                            break;
                        }
                    }
                    match self.advance() {
                        Token::RParen => {}
                        other => {
                            return Err(TemplateError::Syntax(format!(
                                "expected ')' after call arguments, found {other:?}"
                            )))
                        }
                    }
                    return Ok(Expr::Call(name, args));
                }
                let mut segments = vec![name];
                while matches!(self.peek(), Token::Dot) {
                    self.advance();
                    match self.advance() {
                        Token::Ident(seg) => segments.push(seg),
                        Token::Int(n) => segments.push(n.to_string()),
                        other => {
                            return Err(TemplateError::Syntax(format!(
                                "expected identifier after '.', found {other:?}"
                            )))
                        }
                    }
                }
                Ok(Expr::Path(segments))
            }
            other => Err(TemplateError::Syntax(format!(
                "unexpected token: {other:?}"
            ))),
        }
    }
}

/// Evaluates a parsed expression against the rolling context plus any
/// loop-local bindings (e.g. an `iter` element bound as `item`).
pub fn eval(expr: &Expr, ctx: &Context, locals: &IndexMap<String, Value>) -> Result<Value, TemplateError> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Path(segments) => resolve_path(segments, ctx, locals),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, ctx, locals)?.is_truthy())),
        Expr::Neg(inner) => match eval(inner, ctx, locals)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(TemplateError::Eval(format!(
                "cannot negate non-numeric value: {other:?}"
            ))),
        },
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, ctx, locals),
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, ctx, locals))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(name, &values)
        }
    }
}

fn eval_binary(
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &Context,
    locals: &IndexMap<String, Value>,
) -> Result<Value, TemplateError> {
    if matches!(op, BinOp::And) {
        let l = eval(lhs, ctx, locals)?;
        if !l.is_truthy() {
            return Ok(Value::Bool(false));
        }
        return Ok(Value::Bool(eval(rhs, ctx, locals)?.is_truthy()));
    }
    if matches!(op, BinOp::Or) {
        let l = eval(lhs, ctx, locals)?;
        if l.is_truthy() {
            return Ok(Value::Bool(true));
        }
        return Ok(Value::Bool(eval(rhs, ctx, locals)?.is_truthy()));
    }

    let l = eval(lhs, ctx, locals)?;
    let r = eval(rhs, ctx, locals)?;

    match op {
        BinOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&l, &r))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let (a, b) = (as_f64(&l)?, as_f64(&r)?);
            Ok(Value::Bool(match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                BinOp::Ge => a >= b,
                _ => unreachable!(),
            }))
        }
        BinOp::Add => match (&l, &r) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", l.to_text(), r.to_text())))
            }
            _ => Ok(numeric_result(as_f64(&l)? + as_f64(&r)?, &l, &r)),
        },
        BinOp::Sub => Ok(numeric_result(as_f64(&l)? - as_f64(&r)?, &l, &r)),
        BinOp::Mul => Ok(numeric_result(as_f64(&l)? * as_f64(&r)?, &l, &r)),
        BinOp::Div => {
            let b = as_f64(&r)?;
            if b == 0.0 {
                return Err(TemplateError::Eval("division by zero".into()));
            }
            Ok(numeric_result(as_f64(&l)? / b, &l, &r))
        }
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        _ => a == b,
    }
}

fn numeric_result(n: f64, l: &Value, r: &Value) -> Value {
    if matches!(l, Value::Int(_)) && matches!(r, Value::Int(_)) && n.fract() == 0.0 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

fn as_f64(v: &Value) -> Result<f64, TemplateError> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| TemplateError::Eval(format!("not a number: {s}"))),
        other => Err(TemplateError::Eval(format!(
            "cannot coerce to number: {other:?}"
        ))),
    }
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value, TemplateError> {
    match name {
        "length" => match args.first() {
            Some(Value::String(s)) => Ok(Value::Int(s.chars().count() as i64)),
            Some(Value::List(l)) => Ok(Value::Int(l.len() as i64)),
            Some(Value::Map(m)) => Ok(Value::Int(m.len() as i64)),
            Some(Value::Null) | None => Ok(Value::Int(0)),
            Some(other) => Err(TemplateError::Eval(format!("length() on {other:?}"))),
        },
        "uppercase" => Ok(Value::String(arg_str(args, 0)?.to_uppercase())),
        "lowercase" => Ok(Value::String(arg_str(args, 0)?.to_lowercase())),
        "contains" => {
            let haystack = arg_str(args, 0)?;
            let needle = arg_str(args, 1)?;
            Ok(Value::Bool(haystack.contains(&needle)))
        }
        "format" => {
            let fmt = arg_str(args, 0)?;
            let mut out = String::new();
            let mut arg_idx = 1;
            let mut chars = fmt.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '%' && chars.peek() == Some(&'s') {
                    chars.next();
                    out.push_str(&args.get(arg_idx).map(Value::to_text).unwrap_or_default());
                    arg_idx += 1;
                } else {
                    out.push(c);
                }
            }
            Ok(Value::String(out))
        }
        other => Err(TemplateError::Eval(format!("unknown function: {other}"))),
    }
}

fn arg_str(args: &[Value], idx: usize) -> Result<String, TemplateError> {
    args.get(idx)
        .map(Value::to_text)
        .ok_or_else(|| TemplateError::Eval(format!("missing argument at index {idx}")))
}

fn resolve_path(
    segments: &[String],
    ctx: &Context,
    locals: &IndexMap<String, Value>,
) -> Result<Value, TemplateError> {
    if segments.is_empty() {
        return Ok(Value::Null);
    }
    let root = segments[0].as_str();
    match root {
        "steps" => {
            let step_ref = segments
                .get(1)
                .ok_or_else(|| TemplateError::Eval("steps requires a step reference".into()))?;
            let view = ctx
                .step_by_name(step_ref)
                .or_else(|| step_ref.parse::<usize>().ok().and_then(|i| ctx.step_by_ordinal(i)))
                .ok_or_else(|| {
                    TemplateError::Eval(format!("step has not yet executed: {step_ref}"))
                })?;
            Ok(lookup_nested(&view.to_value(), &segments[2..]))
        }
        "vars" => Ok(lookup_nested(&ctx.vars_value(), &segments[1..])),
        "env" => Ok(lookup_nested(&ctx.env_value(), &segments[1..])),
        "job" => Ok(lookup_nested(&ctx.job_value(), &segments[1..])),
        "outputs" => Ok(lookup_nested(&ctx.outputs_value(), &segments[1..])),
        other => {
            if let Some(v) = locals.get(other) {
                Ok(lookup_nested(v, &segments[1..]))
            } else {
                Err(TemplateError::Eval(format!("unknown variable: {other}")))
            }
        }
    }
}

fn lookup_nested(v: &Value, path: &[String]) -> Value {
    let mut cur = v.clone();
    for seg in path {
        cur = match &cur {
            Value::Map(m) => m.get(seg).cloned().unwrap_or(Value::Null),
            Value::List(l) => seg
                .parse::<usize>()
                .ok()
                .and_then(|i| l.get(i).cloned())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }
    cur
}

/// Splits a template string into literal and `{{ expr }}` spans.
enum Span {
    Literal(String),
    Expr(String),
}

fn split_spans(s: &str) -> Result<Vec<Span>, TemplateError> {
    let mut spans = Vec::new();
    let mut rest = s;
    loop {
        match rest.find("{{") {
            None => {
                if !rest.is_empty() {
                    spans.push(Span::Literal(rest.to_string()));
                }
                break;
            }
            Some(start) => {
                if start > 0 {
                    spans.push(Span::Literal(rest[..start].to_string()));
                }
                let after = &rest[start + 2..];
                let end = after
                    .find("}}")
                    .ok_or_else(|| TemplateError::Syntax("unterminated {{ ... }}".into()))?;
                spans.push(Span::Expr(after[..end].trim().to_string()));
                rest = &after[end + 2..];
            }
        }
    }
    Ok(spans)
}

/// Expands every `{{ expr }}` occurrence in `s`, stringifying each
/// result and substituting it in place. Used for `with`, `echo`, `name`.
/// Null-safe: a missing nested key stringifies to the empty string
/// (§4.C); only a reference to a not-yet-executed step is an error.
pub fn expand(s: &str, ctx: &Context, locals: &IndexMap<String, Value>) -> Result<String, TemplateError> {
    let spans = split_spans(s)?;
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Literal(text) => out.push_str(&text),
            Span::Expr(src) => {
                let expr = parse_expr(&src)?;
                let value = eval(&expr, ctx, locals)?;
                out.push_str(&value.to_text());
            }
        }
    }
    Ok(out)
}

/// Evaluates a field meant to produce a typed value (`test`). If the
/// entire trimmed string is exactly one `{{ ... }}` block, the inner
/// expression's typed result is returned directly; otherwise the field
/// is treated as a substitution template and wrapped as a string.
pub fn evaluate(s: &str, ctx: &Context, locals: &IndexMap<String, Value>) -> Result<Value, TemplateError> {
    let trimmed = s.trim();
    if let Some(inner) = trimmed.strip_prefix("{{").and_then(|r| r.strip_suffix("}}")) {
        if !inner.contains("{{") {
            let expr = parse_expr(inner.trim())?;
            return eval(&expr, ctx, locals);
        }
    }
    Ok(Value::String(expand(s, ctx, locals)?))
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
