// src/parser.rs
use std::iter::Peekable;
use std::vec::IntoIter;

use crate::ast::{Expr, FilterCall, ForLoop, IfChain, LoopTarget, Method, Node, Path, Segment};
use crate::errors::ParseError;
use crate::filters;
use crate::lexer::{Keyword, Token, TokenKind};
use crate::value::Value;

/// Recursive-descent parse of a token stream into template nodes.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser::new(tokens);
    let (nodes, end) = parser.parse_nodes(&[])?;
    debug_assert!(end.is_none());
    Ok(nodes)
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    /// Position of the most recently consumed token, for end-of-input errors.
    line: usize,
    column: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Parse nodes until one of the `stop` keywords opens a block tag, or input ends.
    ///
    /// The stop keyword is consumed; the rest of its tag is left to the caller.
    fn parse_nodes(&mut self, stop: &[Keyword]) -> Result<(Vec<Node>, Option<Keyword>), ParseError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Text(text) => nodes.push(Node::Text(text)),
                TokenKind::ExprOpen => nodes.push(Node::Output(self.parse_output()?)),
                TokenKind::BlockOpen => {
                    let keyword = self.expect_next("a block keyword")?;
                    let (line, column) = (keyword.line, keyword.column);
                    match keyword.kind {
                        TokenKind::Keyword(Keyword::For) => {
                            nodes.push(Node::For(self.parse_for(line, column)?))
                        }
                        TokenKind::Keyword(Keyword::If) => {
                            nodes.push(Node::If(self.parse_if(line, column)?))
                        }
                        TokenKind::Keyword(kw) if stop.contains(&kw) => {
                            return Ok((nodes, Some(kw)));
                        }
                        TokenKind::Keyword(kw @ (Keyword::Elif | Keyword::Else)) => {
                            let message = if stop.is_empty() {
                                format!("`{}` outside an open `if`", kw.as_str())
                            } else {
                                format!("unexpected `{}` in this block", kw.as_str())
                            };
                            return Err(ParseError::new(message, line, column));
                        }
                        TokenKind::Keyword(Keyword::EndFor) => {
                            return Err(ParseError::new(
                                "`endfor` without matching `for`",
                                line,
                                column,
                            ));
                        }
                        TokenKind::Keyword(Keyword::EndIf) => {
                            return Err(ParseError::new(
                                "`endif` without matching `if`",
                                line,
                                column,
                            ));
                        }
                        other => {
                            return Err(ParseError::new(
                                format!("unknown block keyword: {}", other.describe()),
                                line,
                                column,
                            ));
                        }
                    }
                }
                other => {
                    return Err(ParseError::new(
                        format!("unexpected {}", other.describe()),
                        token.line,
                        token.column,
                    ));
                }
            }
        }
        Ok((nodes, None))
    }

    fn parse_output(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_expr()?;
        if self.eat(&TokenKind::Thousands) {
            expr = Expr::Filter {
                target: Box::new(expr),
                call: FilterCall {
                    name: "thousands".to_string(),
                    args: Vec::new(),
                },
            };
        }
        self.expect(&TokenKind::ExprClose)?;
        Ok(expr)
    }

    fn parse_for(&mut self, line: usize, column: usize) -> Result<ForLoop, ParseError> {
        let mut names = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        let target = if names.len() == 1 {
            LoopTarget::Single(names.remove(0))
        } else {
            LoopTarget::Unpack(names)
        };
        self.expect(&TokenKind::Keyword(Keyword::In))?;
        let iterable = self.parse_expr()?;
        self.expect(&TokenKind::BlockClose)?;

        let (body, end) = self.parse_nodes(&[Keyword::Else, Keyword::EndFor])?;
        let empty_body = match end {
            Some(Keyword::EndFor) => None,
            Some(_) => {
                self.expect(&TokenKind::BlockClose)?;
                let (empty_body, end) = self.parse_nodes(&[Keyword::EndFor])?;
                if end.is_none() {
                    return Err(missing_closer("endfor", "for", line, column));
                }
                Some(empty_body)
            }
            None => return Err(missing_closer("endfor", "for", line, column)),
        };
        self.expect(&TokenKind::BlockClose)?;
        Ok(ForLoop {
            target,
            iterable,
            body,
            empty_body,
        })
    }

    fn parse_if(&mut self, line: usize, column: usize) -> Result<IfChain, ParseError> {
        let mut branches = Vec::new();
        let mut condition = self.parse_expr()?;
        self.expect(&TokenKind::BlockClose)?;
        loop {
            let (body, end) =
                self.parse_nodes(&[Keyword::Elif, Keyword::Else, Keyword::EndIf])?;
            branches.push((condition, body));
            match end {
                Some(Keyword::Elif) => {
                    condition = self.parse_expr()?;
                    self.expect(&TokenKind::BlockClose)?;
                }
                Some(Keyword::Else) => {
                    self.expect(&TokenKind::BlockClose)?;
                    let (else_body, end) = self.parse_nodes(&[Keyword::EndIf])?;
                    if end.is_none() {
                        return Err(missing_closer("endif", "if", line, column));
                    }
                    self.expect(&TokenKind::BlockClose)?;
                    return Ok(IfChain {
                        branches,
                        else_body: Some(else_body),
                    });
                }
                Some(_) => {
                    self.expect(&TokenKind::BlockClose)?;
                    return Ok(IfChain {
                        branches,
                        else_body: None,
                    });
                }
                None => return Err(missing_closer("endif", "if", line, column)),
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Keyword(Keyword::Or)) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::Keyword(Keyword::And)) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Keyword(Keyword::Not)) {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_filtered()?;
        match self.peek() {
            Some(TokenKind::Cmp(op)) => {
                let op = *op;
                self.next();
                let right = self.parse_filtered()?;
                Ok(Expr::Compare {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                })
            }
            Some(TokenKind::Keyword(Keyword::In)) => {
                self.next();
                self.contains(left, false)
            }
            Some(TokenKind::Keyword(Keyword::Not)) => {
                self.next();
                self.expect(&TokenKind::Keyword(Keyword::In))?;
                self.contains(left, true)
            }
            _ => Ok(left),
        }
    }

    fn contains(&mut self, needle: Expr, negated: bool) -> Result<Expr, ParseError> {
        let haystack = self.parse_filtered()?;
        Ok(Expr::Contains {
            needle: Box::new(needle),
            haystack: Box::new(haystack),
            negated,
        })
    }

    fn parse_filtered(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.eat(&TokenKind::Pipe) {
            let name_token = self.expect_next("a filter name")?;
            let name = match name_token.kind {
                TokenKind::Ident(name) => name,
                other => {
                    return Err(ParseError::new(
                        format!("expected a filter name, found {}", other.describe()),
                        name_token.line,
                        name_token.column,
                    ));
                }
            };
            let mut args = Vec::new();
            if self.eat(&TokenKind::LParen) {
                if !self.eat(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_literal()?);
                        if self.eat(&TokenKind::Comma) {
                            continue;
                        }
                        self.expect(&TokenKind::RParen)?;
                        break;
                    }
                }
            }
            filters::check_call(&name, args.len())
                .map_err(|message| ParseError::new(message, name_token.line, name_token.column))?;
            expr = Expr::Filter {
                target: Box::new(expr),
                call: FilterCall { name, args },
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::LParen) {
            let inner = self.parse_expr()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(inner);
        }
        let token = self.expect_next("an expression")?;
        match token.kind {
            TokenKind::Ident(root) => self.parse_path(root).map(Expr::Path),
            kind => literal(kind, token.line, token.column).map(Expr::Literal),
        }
    }

    fn parse_path(&mut self, root: String) -> Result<Path, ParseError> {
        let mut segments = Vec::new();
        loop {
            if self.eat(&TokenKind::Dot) {
                let token = self.expect_next("an attribute name")?;
                let segment = match token.kind {
                    TokenKind::Ident(name) if self.eat(&TokenKind::LParen) => {
                        self.expect(&TokenKind::RParen)?;
                        let method = Method::from_name(&name).ok_or_else(|| {
                            ParseError::new(
                                format!("unknown method `{name}()`"),
                                token.line,
                                token.column,
                            )
                        })?;
                        Segment::Method(method)
                    }
                    TokenKind::Ident(name) => Segment::Key(name),
                    TokenKind::Keyword(kw) => Segment::Key(kw.as_str().to_string()),
                    TokenKind::Int(index) => Segment::Index(index),
                    other => {
                        return Err(ParseError::new(
                            format!("expected an attribute name, found {}", other.describe()),
                            token.line,
                            token.column,
                        ));
                    }
                };
                segments.push(segment);
            } else if self.eat(&TokenKind::LBracket) {
                let token = self.expect_next("an index or key")?;
                let segment = match token.kind {
                    TokenKind::Int(index) => Segment::Index(index),
                    TokenKind::Str(key) => Segment::Key(key),
                    other => {
                        return Err(ParseError::new(
                            format!("expected an index or key, found {}", other.describe()),
                            token.line,
                            token.column,
                        ));
                    }
                };
                self.expect(&TokenKind::RBracket)?;
                segments.push(segment);
            } else {
                break;
            }
        }
        Ok(Path { root, segments })
    }

    fn parse_literal(&mut self) -> Result<Value, ParseError> {
        let token = self.expect_next("an expression")?;
        literal(token.kind, token.line, token.column)
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let token = self.expect_next("a loop variable name")?;
        match token.kind {
            TokenKind::Ident(name) => Ok(name),
            other => Err(ParseError::new(
                format!("expected a loop variable name, found {}", other.describe()),
                token.line,
                token.column,
            )),
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        let token = self.expect_next(&kind.describe())?;
        if &token.kind == kind {
            Ok(())
        } else {
            Err(ParseError::new(
                format!("expected {}, found {}", kind.describe(), token.kind.describe()),
                token.line,
                token.column,
            ))
        }
    }

    fn expect_next(&mut self, what: &str) -> Result<Token, ParseError> {
        self.next().ok_or_else(|| {
            ParseError::new(
                format!("expected {what}, found end of template"),
                self.line,
                self.column,
            )
        })
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    fn peek(&mut self) -> Option<&TokenKind> {
        self.tokens.peek().map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.next()?;
        self.line = token.line;
        self.column = token.column;
        Some(token)
    }
}

fn literal(kind: TokenKind, line: usize, column: usize) -> Result<Value, ParseError> {
    match kind {
        TokenKind::Str(s) => Ok(Value::String(s)),
        TokenKind::Int(i) => Ok(Value::Int(i)),
        TokenKind::Float(f) => Ok(Value::Float(f)),
        TokenKind::Keyword(Keyword::True) => Ok(Value::Bool(true)),
        TokenKind::Keyword(Keyword::False) => Ok(Value::Bool(false)),
        TokenKind::Keyword(Keyword::None) => Ok(Value::Null),
        other => Err(ParseError::new(
            format!("expected an expression, found {}", other.describe()),
            line,
            column,
        )),
    }
}

fn missing_closer(closer: &str, opener: &str, line: usize, column: usize) -> ParseError {
    ParseError::new(
        format!("missing `{{% {closer} %}}` for `{opener}` opened here"),
        line,
        column,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CmpOp;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_str(source: &str) -> Result<Vec<Node>, ParseError> {
        parse(tokenize(source)?)
    }

    fn path(root: &str, segments: Vec<Segment>) -> Expr {
        Expr::Path(Path {
            root: root.to_string(),
            segments,
        })
    }

    #[test]
    fn text_and_interpolation() {
        let nodes = parse_str("Hello {{ user.name }}!").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("Hello ".into()),
                Node::Output(path("user", vec![Segment::Key("name".into())])),
                Node::Text("!".into()),
            ]
        );
    }

    #[test]
    fn filters_and_thousands_suffix() {
        let nodes = parse_str("{{ xs|join(', ')|upper:, }}").unwrap();
        let join = Expr::Filter {
            target: Box::new(path("xs", vec![])),
            call: FilterCall {
                name: "join".into(),
                args: vec![Value::from(", ")],
            },
        };
        let upper = Expr::Filter {
            target: Box::new(join),
            call: FilterCall {
                name: "upper".into(),
                args: vec![],
            },
        };
        let thousands = Expr::Filter {
            target: Box::new(upper),
            call: FilterCall {
                name: "thousands".into(),
                args: vec![],
            },
        };
        assert_eq!(nodes, vec![Node::Output(thousands)]);
    }

    #[test]
    fn if_chain_keeps_branch_order() {
        let nodes =
            parse_str("{% if n >= 80 %}high{% elif n >= 50 %}mid{% else %}low{% endif %}").unwrap();
        let Node::If(chain) = &nodes[0] else {
            panic!("expected an if node, got {nodes:?}");
        };
        assert_eq!(chain.branches.len(), 2);
        assert_eq!(
            chain.branches[1].0,
            Expr::Compare {
                op: CmpOp::Ge,
                lhs: Box::new(path("n", vec![])),
                rhs: Box::new(Expr::Literal(Value::Int(50))),
            }
        );
        assert_eq!(chain.else_body, Some(vec![Node::Text("low".into())]));
    }

    #[test]
    fn for_with_unpacking_and_empty_body() {
        let nodes =
            parse_str("{% for k, v in m.items() %}{{k}}{% else %}none{% endfor %}").unwrap();
        let Node::For(for_loop) = &nodes[0] else {
            panic!("expected a for node, got {nodes:?}");
        };
        assert_eq!(
            for_loop.target,
            LoopTarget::Unpack(vec!["k".into(), "v".into()])
        );
        assert_eq!(
            for_loop.iterable,
            path("m", vec![Segment::Method(Method::Items)])
        );
        assert_eq!(for_loop.empty_body, Some(vec![Node::Text("none".into())]));
    }

    #[test]
    fn boolean_precedence() {
        let nodes = parse_str("{% if a or b and not c %}x{% endif %}").unwrap();
        let Node::If(chain) = &nodes[0] else {
            panic!("expected an if node");
        };
        assert_eq!(
            chain.branches[0].0,
            Expr::Or(
                Box::new(path("a", vec![])),
                Box::new(Expr::And(
                    Box::new(path("b", vec![])),
                    Box::new(Expr::Not(Box::new(path("c", vec![])))),
                )),
            )
        );
    }

    #[test]
    fn structural_errors() {
        let cases = [
            ("{% for x in xs %}body", "missing `{% endfor %}`"),
            ("{% if x %}body", "missing `{% endif %}`"),
            ("{% endfor %}", "`endfor` without matching `for`"),
            ("{% endif %}", "`endif` without matching `if`"),
            ("{% elif x %}", "`elif` outside an open `if`"),
            ("{% else %}", "`else` outside an open `if`"),
            ("{% include 'x' %}", "unknown block keyword"),
            ("{% for x in xs %}{% endif %}", "`endif` without matching `if`"),
            ("{{ name|shout }}", "unknown filter `shout`"),
            ("{{ m.size() }}", "unknown method `size()`"),
        ];
        for (source, expected) in cases {
            let err = parse_str(source).unwrap_err();
            assert!(
                err.message.contains(expected),
                "{source:?}: expected {expected:?} in {:?}",
                err.message
            );
        }
    }

    #[test]
    fn primaries_in_conditions() {
        let nodes = parse_str("{% if (a) and 'x' in b %}y{% endif %}").unwrap();
        let Node::If(chain) = &nodes[0] else {
            panic!("expected an if node");
        };
        assert_eq!(
            chain.branches[0].0,
            Expr::And(
                Box::new(path("a", vec![])),
                Box::new(Expr::Contains {
                    needle: Box::new(Expr::Literal(Value::from("x"))),
                    haystack: Box::new(path("b", vec![])),
                    negated: false,
                }),
            )
        );
        let err = parse_str("{{ | upper }}").unwrap_err();
        assert_eq!((err.line, err.column), (1, 4));
        assert!(err.message.contains("expected an expression, found `|`"));
    }

    #[test]
    fn missing_closer_points_at_opener() {
        let err = parse_str("line\n  {% if x %}\nbody").unwrap_err();
        assert_eq!((err.line, err.column), (2, 6));
    }
}
