//! Parser for fixed, GQL-like query text.
//!
//! Grammar, keywords case-insensitive:
//!
//! ```text
//! query     := [WHERE condition (AND condition)*] [ORDER BY order (, order)*]
//! condition := ANCESTOR IS operand | field op operand
//! order     := field [ASC | DESC]
//! operand   := :param | 'string' | integer | TRUE | FALSE | NULL
//! op        := = | != | < | <= | > | >=
//! ```

use pagewise_proto::{Filter, FilterOp, OrderSpec, QuerySpec, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Param(String),
    Str(String),
    Int(i64),
    Op(FilterOp),
    Comma,
}

/// Parse `text` into a query configuration over `kind`, binding `:name`
/// operands from `params`.
pub(crate) fn parse(kind: &str, text: &str, params: &[(String, Value)]) -> Result<QuerySpec> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        params,
    };
    parser.query(QuerySpec::new(kind))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    params: &'a [(String, Value)],
}

impl Parser<'_> {
    fn query(&mut self, mut spec: QuerySpec) -> Result<QuerySpec> {
        if self.eat_keyword("WHERE") {
            loop {
                self.condition(&mut spec)?;
                if !self.eat_keyword("AND") {
                    break;
                }
            }
        }
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let field = self.identifier()?;
                let order = if self.eat_keyword("DESC") {
                    OrderSpec::desc(field)
                } else {
                    self.eat_keyword("ASC");
                    OrderSpec::asc(field)
                };
                spec.order_by.push(order);
                if self.peek() != Some(&Token::Comma) {
                    break;
                }
                self.pos += 1;
            }
        }
        if let Some(token) = self.peek() {
            return Err(Error::InvalidArgument(format!(
                "unexpected {token:?} in query text"
            )));
        }
        Ok(spec)
    }

    fn condition(&mut self, spec: &mut QuerySpec) -> Result<()> {
        if self.eat_keyword("ANCESTOR") {
            self.expect_keyword("IS")?;
            let key = match self.operand()? {
                Value::Key(key) => key,
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "ANCESTOR IS expects a key, got {other:?}"
                    )))
                }
            };
            spec.ancestor = Some(key);
            return Ok(());
        }

        let field = self.identifier()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "expected operator after '{field}', found {other:?}"
                )))
            }
        };
        let value = self.operand()?;
        spec.filters.push(Filter::new(field, op, value));
        Ok(())
    }

    fn operand(&mut self) -> Result<Value> {
        match self.next() {
            Some(Token::Param(name)) => self
                .params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| Error::InvalidArgument(format!("unbound parameter ':{name}'"))),
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Int(i)) => Ok(Value::Int64(i)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("TRUE") => Ok(Value::Bool(true)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("FALSE") => Ok(Value::Bool(false)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("NULL") => Ok(Value::Null),
            other => Err(Error::InvalidArgument(format!(
                "expected operand, found {other:?}"
            ))),
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            other => Err(Error::InvalidArgument(format!(
                "expected field name, found {other:?}"
            ))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!("expected {keyword}")))
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            ':' => {
                chars.next();
                let name = take_word(&mut chars);
                if name.is_empty() {
                    return Err(Error::InvalidArgument("empty parameter name".into()));
                }
                tokens.push(Token::Param(name));
            }
            '\'' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => s.push(c),
                        None => {
                            return Err(Error::InvalidArgument(
                                "unterminated string literal".into(),
                            ))
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            '=' | '!' | '<' | '>' => {
                let mut op = String::new();
                op.push(c);
                chars.next();
                if chars.peek() == Some(&'=') {
                    op.push('=');
                    chars.next();
                }
                tokens.push(Token::Op(FilterOp::parse(&op)?));
            }
            c if c.is_ascii_digit() || c == '-' => {
                chars.next();
                let mut digits = String::from(c);
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse()
                    .map_err(|_| Error::InvalidArgument(format!("invalid integer '{digits}'")))?;
                tokens.push(Token::Int(n));
            }
            _ => {
                let word = take_word(&mut chars);
                if word.is_empty() {
                    return Err(Error::InvalidArgument(format!(
                        "unexpected character '{c}' in query text"
                    )));
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

fn take_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '/') {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewise_proto::Key;

    #[test]
    fn test_ancestor_and_order() {
        let parent = Key::new("Person", "warwick");
        let spec = parse(
            "Person",
            "WHERE ANCESTOR IS :parent ORDER BY birthdate, name DESC",
            &[("parent".into(), Value::Key(parent.clone()))],
        )
        .unwrap();

        assert_eq!(spec.ancestor, Some(parent));
        assert_eq!(
            spec.order_by,
            vec![OrderSpec::asc("birthdate"), OrderSpec::desc("name")]
        );
        assert!(spec.filters.is_empty());
    }

    #[test]
    fn test_filters() {
        let spec = parse(
            "Person",
            "where birthdate >= :since and name != 'Kate' and age < 40",
            &[("since".into(), Value::date(1980, 1, 1))],
        )
        .unwrap();

        assert_eq!(
            spec.filters,
            vec![
                Filter::new("birthdate", FilterOp::Ge, Value::date(1980, 1, 1)),
                Filter::new("name", FilterOp::Ne, "Kate"),
                Filter::new("age", FilterOp::Lt, 40i64),
            ]
        );
    }

    #[test]
    fn test_empty_text() {
        let spec = parse("Person", "", &[]).unwrap();
        assert_eq!(spec, QuerySpec::new("Person"));
    }

    #[test]
    fn test_errors() {
        assert!(parse("Person", "WHERE name = :missing", &[]).is_err());
        assert!(parse("Person", "WHERE name", &[]).is_err());
        assert!(parse("Person", "WHERE ANCESTOR IS 5", &[]).is_err());
        assert!(parse("Person", "ORDER name", &[]).is_err());
        assert!(parse("Person", "WHERE name = 'open", &[]).is_err());
        assert!(parse("Person", "ORDER BY name LIMIT", &[]).is_err());
    }
}
