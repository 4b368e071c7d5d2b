use std::collections::BTreeSet;

use crate::error::SchemaError;

/// Compiled form of a content expression such as `"paragraph block*"` or
/// `"column{2,}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentExpr {
    Empty,
    Name(String),
    Seq(Vec<ContentExpr>),
    Choice(Vec<ContentExpr>),
    Repeat {
        expr: Box<ContentExpr>,
        min: usize,
        max: Option<usize>,
    },
}

impl ContentExpr {
    pub fn parse(src: &str) -> Result<Self, SchemaError> {
        let tokens = tokenize(src).map_err(|reason| SchemaError::InvalidContentExpression {
            expr: src.to_string(),
            reason,
        })?;
        if tokens.is_empty() {
            return Ok(ContentExpr::Empty);
        }

        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser
            .parse_choice()
            .and_then(|expr| match parser.peek() {
                None => Ok(expr),
                Some(tok) => Err(format!("unexpected token {tok:?}")),
            })
            .map_err(|reason| SchemaError::InvalidContentExpression {
                expr: src.to_string(),
                reason,
            })?;
        Ok(expr)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ContentExpr::Empty)
    }

    /// Every node or group name the expression refers to.
    pub fn names(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            ContentExpr::Empty => {}
            ContentExpr::Name(name) => {
                out.insert(name.as_str());
            }
            ContentExpr::Seq(items) | ContentExpr::Choice(items) => {
                for item in items {
                    item.collect_names(out);
                }
            }
            ContentExpr::Repeat { expr, .. } => expr.collect_names(out),
        }
    }

    /// `is_member(name, kind)` answers whether a child of type `kind` satisfies
    /// the expression term `name` (directly or through a group).
    pub fn matches<F>(&self, kinds: &[&str], is_member: F) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        let start = BTreeSet::from([0usize]);
        self.advance(&start, kinds, &is_member)
            .contains(&kinds.len())
    }

    fn advance(
        &self,
        from: &BTreeSet<usize>,
        kinds: &[&str],
        is_member: &dyn Fn(&str, &str) -> bool,
    ) -> BTreeSet<usize> {
        match self {
            ContentExpr::Empty => from.clone(),
            ContentExpr::Name(name) => from
                .iter()
                .filter(|&&ix| ix < kinds.len() && is_member(name, kinds[ix]))
                .map(|ix| ix + 1)
                .collect(),
            ContentExpr::Seq(items) => items.iter().fold(from.clone(), |acc, item| {
                if acc.is_empty() {
                    acc
                } else {
                    item.advance(&acc, kinds, is_member)
                }
            }),
            ContentExpr::Choice(options) => options
                .iter()
                .flat_map(|opt| opt.advance(from, kinds, is_member))
                .collect(),
            ContentExpr::Repeat { expr, min, max } => {
                let mut current = from.clone();
                for _ in 0..*min {
                    current = expr.advance(&current, kinds, is_member);
                    if current.is_empty() {
                        return current;
                    }
                }

                let mut reached = current.clone();
                let mut frontier = current;
                let mut count = *min;
                loop {
                    if max.is_some_and(|max| count >= max) {
                        break;
                    }
                    let next = expr.advance(&frontier, kinds, is_member);
                    let fresh: BTreeSet<usize> = next.difference(&reached).copied().collect();
                    if fresh.is_empty() {
                        break;
                    }
                    reached.extend(fresh.iter().copied());
                    frontier = fresh;
                    count += 1;
                }
                reached
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    Number(usize),
    Open,
    Close,
    Pipe,
    Star,
    Plus,
    Question,
    BraceOpen,
    BraceClose,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '|' | '*' | '+' | '?' | '{' | '}' | ',' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::Open,
                    ')' => Token::Close,
                    '|' => Token::Pipe,
                    '*' => Token::Star,
                    '+' => Token::Plus,
                    '?' => Token::Question,
                    '{' => Token::BraceOpen,
                    '}' => Token::BraceClose,
                    _ => Token::Comma,
                });
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse::<usize>()
                    .map_err(|err| format!("bad count {digits}: {err}"))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_alphanumeric() || d == '_') {
                        break;
                    }
                    name.push(d);
                    chars.next();
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn parse_choice(&mut self) -> Result<ContentExpr, String> {
        let mut options = vec![self.parse_seq()?];
        while self.peek() == Some(&Token::Pipe) {
            self.next();
            options.push(self.parse_seq()?);
        }
        Ok(if options.len() == 1 {
            options.remove(0)
        } else {
            ContentExpr::Choice(options)
        })
    }

    fn parse_seq(&mut self) -> Result<ContentExpr, String> {
        let mut items = Vec::new();
        while matches!(self.peek(), Some(Token::Name(_)) | Some(Token::Open)) {
            items.push(self.parse_term()?);
        }
        match items.len() {
            0 => Err("expected a node name or group".to_string()),
            1 => Ok(items.remove(0)),
            _ => Ok(ContentExpr::Seq(items)),
        }
    }

    fn parse_term(&mut self) -> Result<ContentExpr, String> {
        let atom = match self.next() {
            Some(Token::Name(name)) => ContentExpr::Name(name),
            Some(Token::Open) => {
                let inner = self.parse_choice()?;
                if self.next() != Some(Token::Close) {
                    return Err("missing ')'".to_string());
                }
                inner
            }
            other => return Err(format!("unexpected token {other:?}")),
        };
        self.parse_quantifier(atom)
    }

    fn parse_quantifier(&mut self, atom: ContentExpr) -> Result<ContentExpr, String> {
        let (min, max) = match self.peek() {
            Some(Token::Star) => (0, None),
            Some(Token::Plus) => (1, None),
            Some(Token::Question) => (0, Some(1)),
            Some(Token::BraceOpen) => {
                self.next();
                return self.parse_range(atom);
            }
            _ => return Ok(atom),
        };
        self.next();
        Ok(ContentExpr::Repeat {
            expr: Box::new(atom),
            min,
            max,
        })
    }

    fn parse_range(&mut self, atom: ContentExpr) -> Result<ContentExpr, String> {
        let Some(Token::Number(min)) = self.next() else {
            return Err("expected a count after '{'".to_string());
        };
        let max = match self.next() {
            Some(Token::BraceClose) => Some(min),
            Some(Token::Comma) => match self.next() {
                Some(Token::BraceClose) => None,
                Some(Token::Number(max)) => {
                    if self.next() != Some(Token::BraceClose) {
                        return Err("missing '}'".to_string());
                    }
                    if max < min {
                        return Err(format!("range {{{min},{max}}} is empty"));
                    }
                    Some(max)
                }
                other => return Err(format!("unexpected token {other:?}")),
            },
            other => return Err(format!("unexpected token {other:?}")),
        };
        Ok(ContentExpr::Repeat {
            expr: Box::new(atom),
            min,
            max,
        })
    }
}
