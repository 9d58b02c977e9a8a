//! Integer constant expressions as they appear in `#define` values and array bounds.
//!
//! Supports decimal and `0x` hex literals (with C `u`/`l` suffixes), references
//! to earlier constants, parentheses, unary `-`/`~`, and the binary operators
//! `* / % + - << >> & ^ |` with C precedence.

use std::collections::BTreeMap;

use super::Constant;
use crate::{Result, RtdnError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(i64),
    Ident(String),
    Op(&'static str),
    Open,
    Close,
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_alphanumeric() || ch == '_' {
            let mut end = start;
            while let Some(&(index, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                end = index + c.len_utf8();
                chars.next();
            }
            let word = &expression[start..end];
            tokens.push(if ch.is_ascii_digit() {
                Token::Number(parse_literal(word)?)
            } else {
                Token::Ident(word.to_string())
            });
            continue;
        }

        chars.next();
        let token = match ch {
            '(' => Token::Open,
            ')' => Token::Close,
            '<' | '>' => {
                if chars.next_if(|&(_, next)| next == ch).is_none() {
                    return Err(invalid(expression, format!("unsupported operator '{ch}'")));
                }
                Token::Op(if ch == '<' { "<<" } else { ">>" })
            }
            '+' => Token::Op("+"),
            '-' => Token::Op("-"),
            '*' => Token::Op("*"),
            '/' => Token::Op("/"),
            '%' => Token::Op("%"),
            '&' => Token::Op("&"),
            '^' => Token::Op("^"),
            '|' => Token::Op("|"),
            '~' => Token::Op("~"),
            other => return Err(invalid(expression, format!("unexpected character '{other}'"))),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn parse_literal(word: &str) -> Result<i64> {
    let digits = word.trim_end_matches(['u', 'U', 'l', 'L']);
    let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed.map_err(|_| invalid(word, "invalid integer literal"))
}

fn invalid(expression: &str, details: impl Into<String>) -> RtdnError {
    RtdnError::parse_error(format!("expression '{expression}'"), details)
}

fn precedence(op: &str) -> u8 {
    match op {
        "|" => 1,
        "^" => 2,
        "&" => 3,
        "<<" | ">>" => 4,
        "+" | "-" => 5,
        "*" | "/" | "%" => 6,
        _ => 0,
    }
}

/// Deepest nesting of parentheses and unary operators accepted in one expression.
const MAX_DEPTH: usize = 256;

struct Evaluator<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    constants: &'a BTreeMap<String, Constant>,
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn binary(&mut self, min_precedence: u8) -> Result<i64> {
        let mut left = self.unary()?;

        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            let prec = precedence(op);
            if prec == 0 || prec < min_precedence {
                break;
            }
            self.position += 1;
            let right = self.binary(prec + 1)?;
            left = self.apply(op, left, right)?;
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<i64> {
        if self.depth >= MAX_DEPTH {
            return Err(invalid(self.source, "expression nested too deeply"));
        }
        self.depth += 1;
        let value = self.operand();
        self.depth -= 1;
        value
    }

    fn operand(&mut self) -> Result<i64> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Ident(name)) => self
                .constants
                .get(&name)
                .map(|constant| constant.value)
                .ok_or_else(|| invalid(self.source, format!("unknown constant '{name}'"))),
            Some(Token::Open) => {
                let value = self.binary(1)?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(invalid(self.source, "missing ')'")),
                }
            }
            Some(Token::Op("-")) => self
                .unary()?
                .checked_neg()
                .ok_or_else(|| invalid(self.source, "overflow")),
            Some(Token::Op("~")) => Ok(!self.unary()?),
            Some(other) => Err(invalid(self.source, format!("unexpected token {other:?}"))),
            None => Err(invalid(self.source, "unexpected end of expression")),
        }
    }

    fn apply(&self, op: &str, left: i64, right: i64) -> Result<i64> {
        let shift = || u32::try_from(right).ok().filter(|&bits| bits < 64);
        let value = match op {
            "+" => left.checked_add(right),
            "-" => left.checked_sub(right),
            "*" => left.checked_mul(right),
            "/" => left.checked_div(right),
            "%" => left.checked_rem(right),
            "<<" => shift().and_then(|bits| left.checked_shl(bits)),
            ">>" => shift().and_then(|bits| left.checked_shr(bits)),
            "&" => Some(left & right),
            "^" => Some(left ^ right),
            "|" => Some(left | right),
            _ => None,
        };
        value.ok_or_else(|| invalid(self.source, format!("cannot evaluate {left} {op} {right}")))
    }
}

/// Evaluate `expression` against previously defined constants.
pub fn evaluate(expression: &str, constants: &BTreeMap<String, Constant>) -> Result<i64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(invalid(expression, "empty expression"));
    }

    let mut evaluator = Evaluator { source: expression, tokens, position: 0, depth: 0, constants };
    let value = evaluator.binary(1)?;
    if evaluator.position != evaluator.tokens.len() {
        return Err(invalid(expression, "trailing tokens"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn constants(pairs: &[(&str, i64)]) -> BTreeMap<String, Constant> {
        pairs
            .iter()
            .map(|(name, value)| {
                (name.to_string(), Constant { name: name.to_string(), value: *value, comment: String::new() })
            })
            .collect()
    }

    #[test]
    fn literals() {
        let none = BTreeMap::new();
        assert_eq!(evaluate("488000002", &none).unwrap(), 488000002);
        assert_eq!(evaluate("0x10", &none).unwrap(), 16);
        assert_eq!(evaluate("0X1fU", &none).unwrap(), 31);
        assert_eq!(evaluate("10UL", &none).unwrap(), 10);
    }

    #[test]
    fn shifts_and_parentheses() {
        let defs = constants(&[("BASE", 3), ("WIDTH", 4)]);
        assert_eq!(evaluate("1 << 4", &defs).unwrap(), 16);
        assert_eq!(evaluate("(1 << WIDTH) >> 2", &defs).unwrap(), 4);
        assert_eq!(evaluate("BASE * (WIDTH + 1)", &defs).unwrap(), 15);
        assert_eq!(evaluate("1 << 2 + 1", &defs).unwrap(), 8);
        assert_eq!(evaluate("0x01 | 0x10", &defs).unwrap(), 0x11);
        assert_eq!(evaluate("-BASE", &defs).unwrap(), -3);
    }

    #[test]
    fn errors() {
        let none = BTreeMap::new();
        assert!(evaluate("", &none).is_err());
        assert!(evaluate("UNKNOWN", &none).is_err());
        assert!(evaluate("(1 << 2", &none).is_err());
        assert!(evaluate("1 < 2", &none).is_err());
        assert!(evaluate("4 / 0", &none).is_err());
        assert!(evaluate("1 << 99", &none).is_err());
        assert!(evaluate("\"text\"", &none).is_err());
        assert!(evaluate("1 2", &none).is_err());
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let none = BTreeMap::new();
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(evaluate(&nested(100), &none).unwrap(), 1);
        assert_eq!(evaluate(&format!("{}5", "-".repeat(100)), &none).unwrap(), 5);

        let err = evaluate(&nested(200_000), &none).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
        assert!(evaluate(&format!("{}0", "~".repeat(200_000)), &none).is_err());
    }

    proptest! {
        #[test]
        fn prop_shift_matches_native(value in 0i64..1 << 20, bits in 0u32..20) {
            let defs = constants(&[("V", value)]);
            prop_assert_eq!(evaluate(&format!("V << {bits}"), &defs).unwrap(), value << bits);
            prop_assert_eq!(evaluate(&format!("(V >> {bits})"), &defs).unwrap(), value >> bits);
        }

        #[test]
        fn prop_decimal_and_hex_agree(value in 0i64..i64::MAX) {
            let none = BTreeMap::new();
            prop_assert_eq!(evaluate(&value.to_string(), &none).unwrap(), value);
            prop_assert_eq!(evaluate(&format!("{value:#x}"), &none).unwrap(), value);
        }
    }
}
