use crate::ast::*;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, not, opt, peek, recognize, value},
    error::{context, VerboseError},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;
use tracing::{debug, instrument};

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("Parse error: {message} at position {span}")]
    ParseError {
        message: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected input `{found}` at position {span}")]
    TrailingInput { found: String, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    // Position of `remaining` inside `source`; 1-based line and column.
    fn locate(source: &str, remaining: &str) -> Self {
        let start = source.len().saturating_sub(remaining.len());
        let consumed = &source[..start];
        let line = consumed.matches('\n').count() + 1;
        let column = match consumed.rfind('\n') {
            Some(newline) => consumed[newline + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };
        Self {
            start,
            end: (start + 1).min(source.len()),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line: {}, column: {}, start: {}, end: {}",
            self.line, self.column, self.start, self.end
        )
    }
}

/// Parses one complete expression. Anything other than whitespace after it
/// is an error.
#[instrument(level = "debug", skip(input))]
pub fn parse_expression(input: &str) -> Result<Expression, SyntaxError> {
    match ws(parse_expr)(input) {
        Ok(("", expr)) => {
            debug!("parsed expression: {}", expr);
            Ok(expr)
        }
        Ok((rest, _)) => Err(SyntaxError::TrailingInput {
            found: rest.chars().take(20).collect(),
            span: Span::locate(input, rest),
        }),
        Err(nom::Err::Incomplete(needed)) => Err(SyntaxError::ParseError {
            message: format!("Incomplete input, {:?}", needed),
            found: String::new(),
            span: Span::locate(input, ""),
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let remaining = e.errors.first().map(|(rest, _)| *rest).unwrap_or(input);
            Err(SyntaxError::ParseError {
                message: nom::error::convert_error(input, e.clone()),
                found: remaining.chars().take(20).collect(),
                span: Span::locate(input, remaining),
            })
        }
    }
}

#[instrument(level = "debug", skip(input))]
fn parse_expr(input: &str) -> ParserResult<Expression> {
    context("expression", parse_postfix)(input)
}

// primary ( "(" args ")" | "." identifier )*
#[instrument(level = "debug", skip(input))]
fn parse_postfix(input: &str) -> ParserResult<Expression> {
    let (mut input, mut expr) = parse_primary(input)?;
    loop {
        match parse_call_arguments(input) {
            Ok((rest, arguments)) => {
                expr = Expression::call(expr, arguments);
                input = rest;
                continue;
            }
            Err(nom::Err::Error(_)) => {}
            Err(e) => return Err(e),
        }
        match preceded(ws(char('.')), identifier)(input) {
            Ok((rest, name)) => {
                expr = Expression::member(expr, name);
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((input, expr))
}

#[instrument(level = "debug", skip(input))]
fn parse_primary(input: &str) -> ParserResult<Expression> {
    ws(alt((
        map(parse_literal, Expression::Literal),
        parse_array,
        delimited(ws(char('(')), parse_expr, ws(char(')'))),
        // `.title`
        map(preceded(char('.'), identifier), Expression::implicit_member),
        map(identifier, Expression::identifier),
    )))(input)
}

#[instrument(level = "debug", skip(input))]
fn parse_array(input: &str) -> ParserResult<Expression> {
    context(
        "array",
        map(
            delimited(
                ws(char('[')),
                terminated(
                    separated_list0(ws(char(',')), parse_expr),
                    opt(ws(char(','))),
                ),
                ws(char(']')),
            ),
            Expression::Array,
        ),
    )(input)
}

#[instrument(level = "debug", skip(input))]
fn parse_call_arguments(input: &str) -> ParserResult<Vec<Argument>> {
    context(
        "arguments",
        delimited(
            ws(char('(')),
            separated_list0(ws(char(',')), parse_argument),
            ws(char(')')),
        ),
    )(input)
}

#[instrument(level = "debug", skip(input))]
fn parse_argument(input: &str) -> ParserResult<Argument> {
    alt((
        // labeled argument
        map(
            tuple((ws(identifier), ws(char(':')), parse_expr)),
            |(label, _, value)| Argument::labeled(label, value),
        ),
        map(parse_expr, Argument::positional),
    ))(input)
}

#[instrument(level = "debug", skip(input))]
fn parse_literal(input: &str) -> ParserResult<Literal> {
    context(
        "literal",
        alt((
            map(parse_f64_strict, Literal::Double),
            map(parse_i64, Literal::Integer),
            map(parse_string, Literal::String),
            value(Literal::Boolean(true), keyword("true")),
            value(Literal::Boolean(false), keyword("false")),
        )),
    )(input)
}

#[instrument(level = "debug", skip(input))]
fn parse_string(input: &str) -> ParserResult<String> {
    context(
        "string literal",
        delimited(
            char('"'),
            map(
                opt(nom::bytes::complete::escaped_transform(
                    is_not("\\\""),
                    '\\',
                    alt((
                        value("\\", tag("\\")),
                        value("\"", tag("\"")),
                        value("\n", tag("n")),
                        value("\t", tag("t")),
                    )),
                )),
                Option::unwrap_or_default,
            ),
            char('"'),
        ),
    )(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParserResult<'a, &'a str> {
    terminated(
        tag(word),
        not(peek(take_while1(|c: char| c.is_alphanumeric() || c == '_'))),
    )
}

#[instrument(level = "debug", skip(input))]
fn identifier(input: &str) -> ParserResult<&str> {
    let (rest, id) = context(
        "identifier",
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
    )(input)?;
    if id == "true" || id == "false" {
        return Err(nom::Err::Error(VerboseError {
            errors: vec![(
                input,
                nom::error::VerboseErrorKind::Context("reserved word"),
            )],
        }));
    }
    Ok((rest, id))
}

#[instrument(level = "debug", skip(input))]
fn parse_f64_strict(input: &str) -> ParserResult<f64> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            tuple((char('.'), digit1)),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

#[instrument(level = "debug", skip(input))]
fn parse_i64(input: &str) -> ParserResult<i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> ParserResult<'a, O>
where
    F: FnMut(&'a str) -> ParserResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}
