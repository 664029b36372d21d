//! Parser for unit and quantity expressions.
//!
//! Unit expressions combine unit names with `*`, `/`, juxtaposition
//! (`newton meter`), powers (`^2`, `**-1`) and parentheses. The result is
//! a flat list of `(name, exponent)` terms in first-appearance order, with
//! repeated names merged and cancelled terms dropped.

use crate::dim::error::DimError;
use crate::numeric;
use bigdecimal::BigDecimal;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Leading number of a quantity expression, e.g. "10 gram", "1.5e3g".
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)(.*)$").unwrap();
}

/// One factor of a unit expression.
pub type UnitTerm = (String, i32);

/// Largest power a unit may carry once repeated names are merged.
pub const MAX_EXPONENT: i32 = 16;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Integer(i32),
    Star,
    Slash,
    Caret,
    Minus,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, DimError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '*' => {
                if chars.get(pos + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    pos += 2;
                } else {
                    tokens.push(Token::Star);
                    pos += 1;
                }
            }
            '·' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                pos += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                pos += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            c if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = text
                    .parse::<i32>()
                    .map_err(|_| DimError::Parse(format!("exponent '{}' is too large", text)))?;
                tokens.push(Token::Integer(value));
            }
            c if is_name_char(c) => {
                let start = pos;
                while pos < chars.len() && (is_name_char(chars[pos]) || chars[pos].is_ascii_digit())
                {
                    pos += 1;
                }
                tokens.push(Token::Name(chars[start..pos].iter().collect()));
            }
            other => {
                return Err(DimError::Parse(format!(
                    "invalid character '{}' at position {} in '{}'",
                    other, pos, input
                )))
            }
        }
    }

    Ok(tokens)
}

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '%'
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source: String,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, message: &str) -> DimError {
        DimError::Parse(format!("{} in '{}'", message, self.source))
    }

    // expr := term (('*' | '/' | juxtaposition) term)*
    fn expr(&mut self) -> Result<Vec<UnitTerm>, DimError> {
        let mut terms = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    terms.extend(self.term()?);
                }
                Some(Token::Slash) => {
                    self.advance();
                    terms.extend(self.term()?.into_iter().map(|(n, e)| (n, -e)));
                }
                Some(Token::Name(_)) | Some(Token::LParen) => {
                    terms.extend(self.term()?);
                }
                _ => return Ok(terms),
            }
        }
    }

    // term := factor ('^' ['-'] integer)?
    fn term(&mut self) -> Result<Vec<UnitTerm>, DimError> {
        let terms = self.factor()?;
        if self.peek() != Some(&Token::Caret) {
            return Ok(terms);
        }
        self.advance();

        let negative = if self.peek() == Some(&Token::Minus) {
            self.advance();
            true
        } else {
            false
        };
        let power = match self.advance() {
            Some(Token::Integer(n)) => n,
            _ => return Err(self.error("expected an integer exponent")),
        };
        let power = if negative { -power } else { power };

        terms
            .into_iter()
            .map(|(n, e)| match e.checked_mul(power) {
                Some(e) => Ok((n, e)),
                None => Err(self.error("exponent overflow")),
            })
            .collect()
    }

    // factor := name | '1' | '(' expr ')'
    fn factor(&mut self) -> Result<Vec<UnitTerm>, DimError> {
        match self.advance() {
            Some(Token::Name(name)) => Ok(vec![(name, 1)]),
            Some(Token::Integer(1)) => Ok(Vec::new()),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("missing ')'")),
                }
            }
            Some(token) => Err(self.error(&format!("unexpected {:?}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

/// Parse a unit expression into merged terms. An empty expression is an
/// error; use [`parse_quantity_expression`] when a bare number is valid.
pub fn parse_unit_expression(input: &str) -> Result<Vec<UnitTerm>, DimError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(DimError::Parse("empty unit expression".to_string()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        source: input.to_string(),
    };
    let terms = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("trailing input"));
    }

    merge_terms(terms)
}

/// Combine repeated names and drop terms whose exponents cancel. Merged
/// exponents beyond [`MAX_EXPONENT`] are rejected.
pub fn merge_terms(terms: Vec<UnitTerm>) -> Result<Vec<UnitTerm>, DimError> {
    let overflow = |name: &str| {
        DimError::Parse(format!(
            "power of '{}' is outside -{1}..={1}",
            name, MAX_EXPONENT
        ))
    };

    let mut merged: Vec<UnitTerm> = Vec::new();
    for (name, exp) in terms {
        match merged.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => {
                existing.1 = existing.1.checked_add(exp).ok_or_else(|| overflow(&name))?
            }
            None => merged.push((name, exp)),
        }
    }
    merged.retain(|(_, e)| *e != 0);

    if let Some((name, _)) = merged.iter().find(|(_, e)| e.abs() > MAX_EXPONENT) {
        return Err(overflow(name));
    }
    Ok(merged)
}

/// Render terms as `a*b/c^2`. Parses back to the same terms.
pub fn format_terms(terms: &[UnitTerm]) -> String {
    let render = |name: &str, exp: i32| {
        if exp == 1 {
            name.to_string()
        } else {
            format!("{}^{}", name, exp)
        }
    };

    let numerator: Vec<String> = terms
        .iter()
        .filter(|(_, e)| *e > 0)
        .map(|(n, e)| render(n, *e))
        .collect();

    let mut out = if numerator.is_empty() {
        if terms.is_empty() {
            return "dimensionless".to_string();
        }
        "1".to_string()
    } else {
        numerator.join("*")
    };

    for (name, exp) in terms.iter().filter(|(_, e)| *e < 0) {
        out.push('/');
        out.push_str(&render(name, -exp));
    }
    out
}

/// Split a quantity expression into its leading number (if any) and the
/// unit expression that follows, e.g. "10 gram" or "1.5e3 kg/m^3".
pub fn parse_quantity_expression(input: &str) -> Result<(Option<BigDecimal>, Vec<UnitTerm>), DimError> {
    let (number, rest) = match LEADING_NUMBER.captures(input) {
        Some(caps) => {
            let literal = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let number = numeric::parse_decimal(literal)
                .ok_or_else(|| DimError::Parse(format!("invalid number '{}'", literal)))?;
            let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            (Some(number), rest)
        }
        None => (None, input),
    };

    let rest = rest.trim();
    let rest = rest.strip_prefix('*').map(str::trim).unwrap_or(rest);
    if rest.is_empty() {
        return match number {
            Some(n) => Ok((Some(n), Vec::new())),
            None => Err(DimError::Parse("empty quantity expression".to_string())),
        };
    }

    // "5/second" reads as five per second
    if rest.starts_with('/') {
        return Ok((number, parse_unit_expression(&format!("1{}", rest))?));
    }
    Ok((number, parse_unit_expression(rest)?))
}
