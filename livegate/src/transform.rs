//! Parser for the SVG `transform` attribute.
//!
//! A transform list such as `translate(10,20) rotate(45)` becomes one
//! [`Matrix`] per entry. Accumulation rules (zero or one entry per node)
//! live in [`crate::document`]; this module only decodes text.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt},
    multi::many0,
    number::complete::double,
    sequence::{delimited, preceded, terminated},
    IResult,
};
use thiserror::Error;

use crate::geometry::Matrix;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("{function}() takes {expected}, got {got}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("malformed transform {0:?}")]
    Malformed(String),
}

fn arity(function: &'static str, expected: &'static str, got: &[f64]) -> TransformError {
    TransformError::Arity {
        function,
        expected,
        got: got.len(),
    }
}

/// Separator between numbers and between list entries: whitespace with at
/// most one comma.
fn comma_ws(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(char(','))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, ()))
}

/// A number preceded by an optional separator.
fn number(input: &str) -> IResult<&str, f64> {
    preceded(comma_ws, double)(input)
}

/// `name ( n, n, ... )` with any amount of inner whitespace.
fn arguments<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<f64>> {
    preceded(
        terminated(tag(name), multispace0),
        delimited(
            char('('),
            many0(number),
            preceded(multispace0, char(')')),
        ),
    )
}

fn transform_entry(input: &str) -> IResult<&str, Result<Matrix, TransformError>> {
    alt((
        map(arguments("matrix"), |v| match v.as_slice() {
            [a, b, c, d, e, f] => Ok(Matrix::new(*a, *b, *c, *d, *e, *f)),
            _ => Err(arity("matrix", "6 numbers", &v)),
        }),
        map(arguments("translate"), |v| match v.as_slice() {
            [tx] => Ok(Matrix::translate(*tx, 0.0)),
            [tx, ty] => Ok(Matrix::translate(*tx, *ty)),
            _ => Err(arity("translate", "1 or 2 numbers", &v)),
        }),
        map(arguments("scale"), |v| match v.as_slice() {
            [s] => Ok(Matrix::scale(*s, *s)),
            [sx, sy] => Ok(Matrix::scale(*sx, *sy)),
            _ => Err(arity("scale", "1 or 2 numbers", &v)),
        }),
        map(arguments("rotate"), |v| match v.as_slice() {
            [deg] => Ok(Matrix::rotate(*deg)),
            [deg, cx, cy] => Ok(Matrix::translate(*cx, *cy)
                .multiply(&Matrix::rotate(*deg))
                .multiply(&Matrix::translate(-cx, -cy))),
            _ => Err(arity("rotate", "1 or 3 numbers", &v)),
        }),
        map(arguments("skewX"), |v| match v.as_slice() {
            [deg] => Ok(Matrix::skew_x(*deg)),
            _ => Err(arity("skewX", "1 number", &v)),
        }),
        map(arguments("skewY"), |v| match v.as_slice() {
            [deg] => Ok(Matrix::skew_y(*deg)),
            _ => Err(arity("skewY", "1 number", &v)),
        }),
    ))(input)
}

fn transform_list(input: &str) -> IResult<&str, Vec<Result<Matrix, TransformError>>> {
    delimited(
        multispace0,
        many0(terminated(transform_entry, comma_ws)),
        multispace0,
    )(input)
}

/// Parse a transform attribute into its entries.
///
/// Unknown functions and trailing garbage are `Malformed`; a known function
/// with the wrong number of arguments is `Arity`. An empty attribute is an
/// empty list.
pub fn parse_transform_list(src: &str) -> Result<Vec<Matrix>, TransformError> {
    match all_consuming(transform_list)(src) {
        Ok((_, entries)) => entries.into_iter().collect(),
        Err(_) => Err(TransformError::Malformed(src.to_string())),
    }
}

/// Parse and fold a whole transform list into one matrix (left to right).
pub fn parse_transform(src: &str) -> Result<Matrix, TransformError> {
    let entries = parse_transform_list(src)?;
    Ok(entries
        .iter()
        .fold(Matrix::IDENTITY, |acc, m| acc.multiply(m)))
}

/// Format a matrix as a `matrix(...)` attribute value.
pub fn format_matrix(m: &Matrix) -> String {
    format!("matrix({},{},{},{},{},{})", m.a, m.b, m.c, m.d, m.e, m.f)
}
