//! A small eval-style expression language.
//!
//! ```text
//! if(like(host, "web%"), "frontend", "backend")
//! count > 10 AND status != "ok"
//! "sourcetype=" . 'click.value'
//! ```
//!
//! Bare identifiers (dots allowed) and single-quoted names read from the
//! value source; absent fields are null. Comparisons are numeric when both
//! sides look like numbers, otherwise they compare strings.

use super::ExpressionEvaluator;
use crate::error::EvalError;
use crate::tokens::{render_value, ValueSource};
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEvaluator;

impl BasicEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEvaluator for BasicEvaluator {
    fn evaluate(&self, expr: &str, source: &ValueSource) -> Result<Value, EvalError> {
        let tokens = lex(expr)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            len: expr.len(),
        };
        let ast = parser.parse_or()?;
        if let Some((tok, offset)) = parser.tokens.get(parser.pos) {
            return Err(EvalError::Syntax {
                offset: *offset,
                message: format!("unexpected {:?}", tok),
            });
        }
        eval(&ast, source)
    }
}

// ---------------------------------------------------------------------------
// Lexer

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Str(String),
    Field(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "=", "<", ">", "!", "+", "-", "*", "/", "%", ".",
];

fn lex(input: &str) -> Result<Vec<(Tok, usize)>, EvalError> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                out.push((Tok::LParen, start));
                i += 1;
            }
            b')' => {
                out.push((Tok::RParen, start));
                i += 1;
            }
            b',' => {
                out.push((Tok::Comma, start));
                i += 1;
            }
            b'"' | b'\'' => {
                let (text, next) = quoted(input, i)?;
                out.push((if c == b'"' { Tok::Str(text) } else { Tok::Field(text) }, start));
                i = next;
            }
            b'0'..=b'9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let n = input[start..i].parse::<f64>().map_err(|e| EvalError::Syntax {
                    offset: start,
                    message: e.to_string(),
                })?;
                out.push((Tok::Num(n), start));
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                out.push((Tok::Ident(input[start..i].to_string()), start));
            }
            _ => {
                let op = OPERATORS
                    .iter()
                    .find(|op| input[i..].starts_with(*op))
                    .ok_or_else(|| EvalError::Syntax {
                        offset: start,
                        message: format!("unexpected character {:?}", &input[i..].chars().next().unwrap_or(' ')),
                    })?;
                out.push((Tok::Op(op), start));
                i += op.len();
            }
        }
    }
    Ok(out)
}

/// Read a quoted literal starting at `start`; backslash escapes the next char.
fn quoted(input: &str, start: usize) -> Result<(String, usize), EvalError> {
    let quote = input.as_bytes()[start] as char;
    let mut text = String::new();
    let mut chars = input[start + 1..].char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    text.push(escaped);
                }
            }
            c if c == quote => return Ok((text, start + 1 + idx + 1)),
            c => text.push(c),
        }
    }
    Err(EvalError::Syntax {
        offset: start,
        message: "unterminated quoted string".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Parser

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Field(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, o)| *o).unwrap_or(self.len)
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Syntax {
            offset: self.offset(),
            message: message.into(),
        }
    }

    /// Consume the next token if it is one of `ops`, or the keyword spelling
    /// of one (`AND`, `OR`, `NOT`).
    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        let found = match self.peek()? {
            Tok::Op(op) => ops.iter().copied().find(|o| o == op),
            Tok::Ident(word) => {
                let keyword = match word.to_ascii_uppercase().as_str() {
                    "AND" => "&&",
                    "OR" => "||",
                    "NOT" => "!",
                    _ => return None,
                };
                ops.iter().copied().find(|o| *o == keyword)
            }
            _ => None,
        }?;
        self.pos += 1;
        Some(found)
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.eat_op(&["||"]).is_some() {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary("||", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_not()?;
        while self.eat_op(&["&&"]).is_some() {
            let rhs = self.parse_not()?;
            lhs = Expr::Binary("&&", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat_op(&["!"]).is_some() {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let lhs = self.parse_additive()?;
        if let Some(op) = self.eat_op(&["==", "=", "!=", "<=", ">=", "<", ">"]) {
            let op = if op == "=" { "==" } else { op };
            let rhs = self.parse_additive()?;
            return Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(op) = self.eat_op(&["+", "-", "."]) {
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.eat_op(&["*", "/", "%"]) {
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat_op(&["-"]).is_some() {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let Some((tok, _)) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error("unexpected end of expression"));
        };
        self.pos += 1;
        match tok {
            Tok::Num(n) => Ok(Expr::Literal(number(n))),
            Tok::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Tok::Field(name) => Ok(Expr::Field(name)),
            Tok::LParen => {
                let inner = self.parse_or()?;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(self.error("expected `)`")),
                }
            }
            Tok::Ident(name) => {
                if self.peek() == Some(&Tok::LParen) {
                    self.pos += 1;
                    let args = self.parse_args()?;
                    return Ok(Expr::Call(name.to_ascii_lowercase(), args));
                }
                match name.as_str() {
                    "true" | "TRUE" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" | "FALSE" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" | "NULL" => Ok(Expr::Literal(Value::Null)),
                    _ => Ok(Expr::Field(name)),
                }
            }
            other => {
                self.pos -= 1;
                Err(self.error(format!("unexpected {:?}", other)))
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Tok::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            match self.peek() {
                Some(Tok::Comma) => self.pos += 1,
                Some(Tok::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => return Err(self.error("expected `,` or `)`")),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn as_bool(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(EvalError::Type(format!("expected a boolean, got {}", other))),
    }
}

fn eval(expr: &Expr, source: &ValueSource) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Field(name) => Ok(source.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Not(inner) => Ok(Value::Bool(!as_bool(&eval(inner, source)?)?)),
        Expr::Neg(inner) => {
            let v = eval(inner, source)?;
            as_number(&v)
                .map(|n| number(-n))
                .ok_or_else(|| EvalError::Type(format!("cannot negate {}", v)))
        }
        Expr::Binary("&&", lhs, rhs) => {
            if !as_bool(&eval(lhs, source)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(as_bool(&eval(rhs, source)?)?))
        }
        Expr::Binary("||", lhs, rhs) => {
            if as_bool(&eval(lhs, source)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(as_bool(&eval(rhs, source)?)?))
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, source)?;
            let r = eval(rhs, source)?;
            binary(op, &l, &r)
        }
        Expr::Call(name, args) => call(name, args, source),
    }
}

fn binary(op: &str, l: &Value, r: &Value) -> Result<Value, EvalError> {
    if op == "." {
        return Ok(Value::String(render_value(l) + &render_value(r)));
    }
    if matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=") {
        return Ok(Value::Bool(compare(op, l, r)));
    }
    match (as_number(l), as_number(r)) {
        (Some(a), Some(b)) => match op {
            "+" => Ok(number(a + b)),
            "-" => Ok(number(a - b)),
            "*" => Ok(number(a * b)),
            "/" | "%" if b == 0.0 => Err(EvalError::Type("division by zero".to_string())),
            "/" => Ok(number(a / b)),
            "%" => Ok(number(a % b)),
            _ => Err(EvalError::Other(format!("unsupported operator {}", op))),
        },
        _ if op == "+" && l.is_string() && r.is_string() => {
            Ok(Value::String(render_value(l) + &render_value(r)))
        }
        _ => Err(EvalError::Type(format!(
            "operator `{}` needs numbers, got {} and {}",
            op, l, r
        ))),
    }
}

fn compare(op: &str, l: &Value, r: &Value) -> bool {
    use std::cmp::Ordering;

    if l.is_null() || r.is_null() {
        return match op {
            "==" => l.is_null() && r.is_null(),
            "!=" => l.is_null() != r.is_null(),
            _ => false,
        };
    }
    let ordering = match (as_number(l), as_number(r)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(render_value(l).cmp(&render_value(r))),
    };
    let Some(ordering) = ordering else {
        return op == "!=";
    };
    match op {
        "==" => ordering == Ordering::Equal,
        "!=" => ordering != Ordering::Equal,
        "<" => ordering == Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        _ => false,
    }
}

fn arity(name: &str, args: &[Expr], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{}..={}", min, max)
        };
        return Err(EvalError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn call(name: &str, args: &[Expr], source: &ValueSource) -> Result<Value, EvalError> {
    let arg = |i: usize| eval(&args[i], source);
    match name {
        "if" => {
            arity(name, args, 3, 3)?;
            if as_bool(&arg(0)?)? {
                arg(1)
            } else {
                arg(2)
            }
        }
        "case" => {
            if args.len() % 2 != 0 {
                return Err(EvalError::Arity {
                    name: name.to_string(),
                    expected: "an even number of".to_string(),
                    got: args.len(),
                });
            }
            for pair in args.chunks(2) {
                if as_bool(&eval(&pair[0], source)?)? {
                    return eval(&pair[1], source);
                }
            }
            Ok(Value::Null)
        }
        "coalesce" => {
            for a in args {
                let v = eval(a, source)?;
                if !v.is_null() {
                    return Ok(v);
                }
            }
            Ok(Value::Null)
        }
        "isnull" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Bool(arg(0)?.is_null()))
        }
        "isnotnull" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Bool(!arg(0)?.is_null()))
        }
        "len" => {
            arity(name, args, 1, 1)?;
            Ok(number(render_value(&arg(0)?).chars().count() as f64))
        }
        "lower" => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(render_value(&arg(0)?).to_lowercase()))
        }
        "upper" => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(render_value(&arg(0)?).to_uppercase()))
        }
        "trim" => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(render_value(&arg(0)?).trim().to_string()))
        }
        "tostring" => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(render_value(&arg(0)?)))
        }
        "tonumber" => {
            arity(name, args, 1, 1)?;
            Ok(as_number(&arg(0)?).map(number).unwrap_or(Value::Null))
        }
        "round" => {
            arity(name, args, 1, 2)?;
            let v = arg(0)?;
            let n = as_number(&v).ok_or_else(|| EvalError::Type(format!("cannot round {}", v)))?;
            // f64 carries at most 17 significant digits.
            let digits = if args.len() == 2 {
                as_number(&arg(1)?).unwrap_or(0.0).clamp(-17.0, 17.0) as i32
            } else {
                0
            };
            let scale = 10f64.powi(digits);
            Ok(number((n * scale).round() / scale))
        }
        "substr" => {
            arity(name, args, 2, 3)?;
            let s: Vec<char> = render_value(&arg(0)?).chars().collect();
            let start = as_number(&arg(1)?).unwrap_or(1.0) as i64;
            // 1-based; negative starts count from the end.
            let len = s.len() as i64;
            let begin = if start < 0 {
                len.saturating_add(start).max(0)
            } else {
                start.max(1) - 1
            };
            let begin = begin.min(len) as usize;
            let end = if args.len() == 3 {
                let count = as_number(&arg(2)?).unwrap_or(0.0).max(0.0) as usize;
                begin.saturating_add(count).min(s.len())
            } else {
                s.len()
            };
            Ok(Value::String(s[begin..end].iter().collect()))
        }
        "like" => {
            arity(name, args, 2, 2)?;
            let text = render_value(&arg(0)?);
            let pattern = render_value(&arg(1)?);
            Ok(Value::Bool(like(&text, &pattern)))
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

/// SQL-style wildcard match: `%` is any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(expr: &str, fields: Value) -> Result<Value, EvalError> {
        let source = ValueSource::from(fields.as_object().cloned().unwrap_or_default());
        BasicEvaluator::new().evaluate(expr, &source)
    }

    #[test]
    fn test_comparisons_on_fields() {
        let fields = json!({"host": "web01", "count": "42", "click.value": "7"});
        assert_eq!(run(r#"host == "web01""#, fields.clone()), Ok(json!(true)));
        assert_eq!(run(r#"host = "db01""#, fields.clone()), Ok(json!(false)));
        assert_eq!(run("count > 10", fields.clone()), Ok(json!(true)));
        assert_eq!(run("'click.value' < 10 AND count >= 42", fields.clone()), Ok(json!(true)));
        assert_eq!(run("click.value != 7", fields), Ok(json!(false)));
    }

    #[test]
    fn test_boolean_operators_short_circuit() {
        // `missing > 1` would be a type error for `!`, but OR stops first.
        assert_eq!(run("true OR NOT missing", json!({})), Ok(json!(true)));
        assert_eq!(run("false && undefined_fn()", json!({})), Ok(json!(false)));
        assert_eq!(run("!(1 == 2) || false", json!({})), Ok(json!(true)));
    }

    #[test]
    fn test_arithmetic_and_concat() {
        assert_eq!(run("1 + 2 * 3", json!({})), Ok(json!(7)));
        assert_eq!(run("(1 + 2) * 3", json!({})), Ok(json!(9)));
        assert_eq!(run("7 / 2", json!({})), Ok(json!(3.5)));
        assert_eq!(run("-n + 1", json!({"n": 3})), Ok(json!(-2)));
        assert_eq!(run(r#""a" . n . "b""#, json!({"n": 3})), Ok(json!("a3b")));
        assert_eq!(run(r#""a" + "b""#, json!({})), Ok(json!("ab")));
        assert!(matches!(run("1 / 0", json!({})), Err(EvalError::Type(_))));
    }

    #[test]
    fn test_functions() {
        let fields = json!({"host": "Web01", "empty": null});
        assert_eq!(
            run(r#"if(like(lower(host), "web%"), "frontend", "backend")"#, fields.clone()),
            Ok(json!("frontend"))
        );
        assert_eq!(
            run(r#"case(host == "x", 1, host == "Web01", 2)"#, fields.clone()),
            Ok(json!(2))
        );
        assert_eq!(run(r#"coalesce(empty, missing, "d")"#, fields.clone()), Ok(json!("d")));
        assert_eq!(run("isnull(missing) AND isnotnull(host)", fields.clone()), Ok(json!(true)));
        assert_eq!(run("len(host)", fields.clone()), Ok(json!(5)));
        assert_eq!(run("substr(host, 2, 2)", fields.clone()), Ok(json!("eb")));
        assert_eq!(run("substr(host, -2)", fields.clone()), Ok(json!("01")));
        assert_eq!(run("round(3.14159, 2)", fields.clone()), Ok(json!(3.14)));
        assert_eq!(run(r#"tonumber("12") + 1"#, fields), Ok(json!(13)));
    }

    #[test]
    fn test_out_of_range_arguments_are_clamped() {
        let fields = json!({"s": "abc"});
        assert_eq!(run("substr(s, 2, 999999999999999999999999)", fields.clone()), Ok(json!("bc")));
        assert_eq!(run("substr(s, -999999999999999999999999, 2)", fields.clone()), Ok(json!("ab")));
        assert_eq!(run("substr(s, 999999999999999999999999, 1)", fields.clone()), Ok(json!("")));
        assert_eq!(run("substr(s, -999999999999999999999999)", fields.clone()), Ok(json!("abc")));
        assert_eq!(run("round(2.5, 999999999999)", fields.clone()), Ok(json!(2.5)));
        assert_eq!(run("round(2.5, -999999999999)", fields), Ok(json!(0)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(run("1 +", json!({})), Err(EvalError::Syntax { .. })));
        assert!(matches!(run("nope(1)", json!({})), Err(EvalError::UnknownFunction(_))));
        assert!(matches!(run("if(true, 1)", json!({})), Err(EvalError::Arity { .. })));
        assert!(matches!(run("\"open", json!({})), Err(EvalError::Syntax { .. })));
        assert!(matches!(run("1 2", json!({})), Err(EvalError::Syntax { .. })));
        assert!(matches!(run("#", json!({})), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_like() {
        assert!(like("web01", "web%"));
        assert!(like("web01", "w_b__"));
        assert!(like("abc", "%"));
        assert!(like("", "%"));
        assert!(!like("web01", "db%"));
        assert!(like("a-b-c", "a%c"));
    }
}
