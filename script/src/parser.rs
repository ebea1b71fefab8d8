use crate::{
    ast::{BinaryOp, Expr, FnDecl, Item, LetDecl, Script, Span, Spanned},
    error::ParseError,
};
use chumsky::prelude::*;
use smol_str::SmolStr;

const KEYWORDS: &[&str] = &["let", "fn", "if", "then", "else", "true", "false", "nil"];

/// Deepest expression nesting a script may use.
///
/// Brackets, calls, field access, operators and `if` each count one level until the next
/// `,` or `;` at the same bracket depth.
pub const MAX_NESTING: usize = 64;

fn comment() -> impl Parser<char, (), Error = Simple<char>> + Clone {
    just('#')
        .then(take_until(just('\n').or(end().to('\n'))))
        .padded()
        .ignored()
}

fn ws() -> impl Parser<char, (), Error = Simple<char>> + Clone {
    filter(|c: &char| c.is_whitespace())
        .ignored()
        .or(comment())
        .repeated()
        .ignored()
}

fn required_ws() -> impl Parser<char, (), Error = Simple<char>> + Clone {
    filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .ignored()
}

fn ident() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .chain(filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_').repeated())
        .collect()
}

/// An identifier usable as a binding name.
fn name() -> impl Parser<char, SmolStr, Error = Simple<char>> + Clone {
    ident().try_map(|s, span| {
        if KEYWORDS.contains(&s.as_str()) {
            Err(Simple::custom(span, format!("`{s}` is a reserved word")))
        } else {
            Ok(SmolStr::from(s))
        }
    })
}

fn spanned_name() -> impl Parser<char, Spanned<SmolStr>, Error = Simple<char>> + Clone {
    name().map_with_span(Spanned::new)
}

fn string_literal() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    let escape = just('\\').ignore_then(
        just('\\')
            .or(just('"'))
            .or(just('n').to('\n'))
            .or(just('t').to('\t'))
            .or(just('r').to('\r')),
    );

    just('"')
        .ignore_then(filter(|c: &char| *c != '"' && *c != '\\').or(escape).repeated())
        .then_ignore(just('"'))
        .collect()
}

/// `r"..."`: no escapes, handy for registry paths full of backslashes.
fn raw_string_literal() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    just("r\"")
        .ignore_then(filter(|c: &char| *c != '"').repeated())
        .then_ignore(just('"'))
        .collect()
}

fn number() -> impl Parser<char, f64, Error = Simple<char>> + Clone {
    just('-')
        .or_not()
        .chain::<char, _, _>(filter(|c: &char| c.is_ascii_digit()).repeated().at_least(1))
        .chain::<char, _, _>(
            just('.')
                .chain(filter(|c: &char| c.is_ascii_digit()).repeated().at_least(1))
                .or_not()
                .flatten(),
        )
        .collect::<String>()
        .try_map(|s, span| {
            s.parse::<f64>()
                .map_err(|_| Simple::custom(span, "invalid number"))
        })
}

fn comma() -> impl Parser<char, (), Error = Simple<char>> + Clone {
    just(',').padded_by(ws()).ignored()
}

fn binary(op: BinaryOp, left: Spanned<Expr>, right: Spanned<Expr>) -> Spanned<Expr> {
    let span = left.span.start..right.span.end;
    Spanned::new(
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

enum Postfix {
    Call(Vec<Spanned<Expr>>),
    Field(Spanned<SmolStr>),
}

fn expr() -> impl Parser<char, Spanned<Expr>, Error = Simple<char>> + Clone {
    recursive(|expr| {
        let list = expr
            .clone()
            .separated_by(comma())
            .allow_trailing()
            .delimited_by(just('[').then(ws()), ws().then(just(']')))
            .map(Expr::List);

        let key = ident()
            .or(string_literal())
            .map_with_span(Spanned::new);
        let entry = key
            .then_ignore(ws())
            .then_ignore(just(':'))
            .then_ignore(ws())
            .then(expr.clone());
        let map = entry
            .separated_by(comma())
            .allow_trailing()
            .delimited_by(just('{').then(ws()), ws().then(just('}')))
            .map(Expr::Map);

        let parens = expr
            .clone()
            .delimited_by(just('(').then(ws()), ws().then(just(')')))
            .map(|inner: Spanned<Expr>| inner.node);

        let if_expr = just("if")
            .ignore_then(required_ws())
            .ignore_then(expr.clone())
            .then_ignore(ws())
            .then_ignore(just("then"))
            .then_ignore(required_ws())
            .then(expr.clone())
            .then_ignore(ws())
            .then_ignore(just("else"))
            .then_ignore(required_ws())
            .then(expr.clone())
            .map(|((condition, then_expr), else_expr)| Expr::If {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });

        let word = ident().map(|s| match s.as_str() {
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "nil" => Expr::Nil,
            _ => Expr::Var(SmolStr::from(s)),
        });

        let atom = if_expr
            .or(raw_string_literal().map(Expr::String))
            .or(string_literal().map(Expr::String))
            .or(number().map(Expr::Number))
            .or(list)
            .or(map)
            .or(parens)
            .or(word)
            .map_with_span(Spanned::new);

        let args = expr
            .clone()
            .separated_by(comma())
            .allow_trailing()
            .delimited_by(just('(').then(ws()), ws().then(just(')')));
        let postfix = args
            .map(Postfix::Call)
            .or(just('.')
                .ignore_then(ident().map(SmolStr::from).map_with_span(Spanned::new))
                .map(Postfix::Field))
            .map_with_span(|postfix, span: Span| (postfix, span));

        let call = atom
            .then(postfix.repeated())
            .foldl(|target, (postfix, span)| {
                let span = target.span.start..span.end;
                let node = match postfix {
                    Postfix::Call(args) => Expr::Call {
                        callee: Box::new(target),
                        args,
                    },
                    Postfix::Field(name) => Expr::Field {
                        target: Box::new(target),
                        name,
                    },
                };
                Spanned::new(node, span)
            });

        let unary = just('!')
            .map_with_span(|_, span: Span| span)
            .then_ignore(ws())
            .repeated()
            .then(call)
            .foldr(|bang, operand| {
                let span = bang.start..operand.span.end;
                Spanned::new(Expr::Not(Box::new(operand)), span)
            });

        let sum = unary
            .clone()
            .then(
                ws().ignore_then(just('+'))
                    .ignore_then(ws())
                    .ignore_then(unary)
                    .repeated(),
            )
            .foldl(|left, right| binary(BinaryOp::Add, left, right));

        let equality = sum
            .clone()
            .then(
                ws().ignore_then(just("==").to(BinaryOp::Eq).or(just("!=").to(BinaryOp::Ne)))
                    .then_ignore(ws())
                    .then(sum)
                    .repeated(),
            )
            .foldl(|left, (op, right)| binary(op, left, right));

        let and_chain = equality
            .clone()
            .then(
                ws().ignore_then(just("&&"))
                    .ignore_then(ws())
                    .ignore_then(equality)
                    .repeated(),
            )
            .foldl(|left, right| binary(BinaryOp::And, left, right));

        and_chain
            .clone()
            .then(
                ws().ignore_then(just("||"))
                    .ignore_then(ws())
                    .ignore_then(and_chain)
                    .repeated(),
            )
            .foldl(|left, right| binary(BinaryOp::Or, left, right))
    })
}

fn let_decl() -> impl Parser<char, LetDecl, Error = Simple<char>> + Clone {
    just("let")
        .ignore_then(required_ws())
        .ignore_then(spanned_name())
        .then_ignore(ws())
        .then_ignore(just('='))
        .then_ignore(ws())
        .then(expr())
        .then_ignore(ws())
        .then_ignore(just(';'))
        .map(|(name, value)| LetDecl { name, value })
}

fn fn_decl() -> impl Parser<char, FnDecl, Error = Simple<char>> + Clone {
    let params = spanned_name()
        .separated_by(comma())
        .allow_trailing()
        .delimited_by(just('(').then(ws()), ws().then(just(')')));

    just("fn")
        .ignore_then(required_ws())
        .ignore_then(spanned_name())
        .then_ignore(ws())
        .then(params)
        .then_ignore(ws())
        .then_ignore(just('='))
        .then_ignore(ws())
        .then(expr())
        .then_ignore(ws())
        .then_ignore(just(';'))
        .map(|((name, params), body)| FnDecl { name, params, body })
}

fn item() -> impl Parser<char, Spanned<Item>, Error = Simple<char>> + Clone {
    fn_decl()
        .map(Item::Fn)
        .or(let_decl().map(Item::Let))
        .map_with_span(Spanned::new)
}

fn script() -> impl Parser<char, Script, Error = Simple<char>> {
    ws().ignore_then(item().padded_by(ws()).repeated())
        .then_ignore(end())
        .map(|items| Script { items })
}

/// Bound expression nesting before the recursive parser sees the source.
///
/// Offsets are char indices, like parser spans.
fn check_nesting(source: &str) -> Result<(), ParseError> {
    let chars: Vec<char> = source.chars().collect();
    // Levels opened in the current segment of each enclosing bracket.
    let mut frames = vec![0usize];
    let mut total = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        let mut deeper = false;
        match chars[i] {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            },
            '"' => {
                i = skip_string(&chars, i + 1, true);
                continue;
            },
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word == "r" && chars.get(i) == Some(&'"') {
                    i = skip_string(&chars, i + 1, false);
                } else if word == "if" {
                    deeper = true;
                }
            },
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
            },
            '[' | '{' | '(' => {
                i += 1;
                deeper = true;
            },
            ']' | '}' | ')' => {
                i += 1;
                if frames.len() > 1 {
                    total -= frames.pop().unwrap_or_default();
                }
            },
            ',' | ';' => {
                i += 1;
                if let Some(top) = frames.last_mut() {
                    total -= *top;
                    *top = 0;
                }
            },
            '=' | '!' | '&' | '|' if is_operator(chars[i], chars.get(i + 1).copied()) => {
                i += 2;
                deeper = true;
            },
            '+' | '.' | '!' => {
                i += 1;
                deeper = true;
            },
            _ => i += 1,
        }

        if deeper {
            if let Some(top) = frames.last_mut() {
                *top += 1;
            }
            total += 1;
            if total > MAX_NESTING {
                return Err(ParseError::new(
                    start..i,
                    format!("nesting deeper than {MAX_NESTING} levels"),
                ));
            }
            if matches!(chars[start], '[' | '{' | '(') {
                frames.push(0);
            }
        }
    }

    Ok(())
}

/// `==`, `!=`, `&&` or `||`.
fn is_operator(first: char, second: Option<char>) -> bool {
    matches!(
        (first, second),
        ('=', Some('=')) | ('!', Some('=')) | ('&', Some('&')) | ('|', Some('|'))
    )
}

/// Index just past the closing quote of a string starting at `i`, or the end of input.
fn skip_string(chars: &[char], mut i: usize, escapes: bool) -> usize {
    while i < chars.len() {
        match chars[i] {
            '"' => return i + 1,
            '\\' if escapes => i += 2,
            _ => i += 1,
        }
    }
    i
}

pub fn parse(source: &str) -> (Option<Script>, Vec<ParseError>) {
    if let Err(error) = check_nesting(source) {
        return (None, vec![error]);
    }

    let (result, errs) = script().parse_recovery(source);

    let errors = errs
        .into_iter()
        .map(|e| {
            let span = e.span();
            let message = match e.reason() {
                chumsky::error::SimpleReason::Unexpected => {
                    let found = e
                        .found()
                        .map(|c| format!("'{c}'"))
                        .unwrap_or_else(|| "end of input".to_string());
                    let expected: Vec<_> = e
                        .expected()
                        .filter_map(|exp| exp.as_ref().map(|c| format!("'{c}'")))
                        .collect();
                    if expected.is_empty() {
                        format!("unexpected {found}")
                    } else {
                        format!("expected {}, found {}", expected.join(" or "), found)
                    }
                },
                chumsky::error::SimpleReason::Unclosed { span: _, delimiter } => {
                    format!("unclosed delimiter '{delimiter}'")
                },
                chumsky::error::SimpleReason::Custom(msg) => msg.clone(),
            };
            ParseError::new(span, message)
        })
        .collect();

    (result, errors)
}
