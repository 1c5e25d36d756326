//! Path-data decoding for wire segments.
//!
//! Only the subset a wire needs is understood: a move-to followed by
//! relative line-tos. Coordinate pairs after a move-to are implicit
//! line-tos, matching the SVG segment list. Anything else makes the
//! whole path undecodable; the caller skips it and carries on.

use nom::{
    character::complete::{char, multispace0, one_of},
    combinator::{all_consuming, opt},
    multi::many0,
    number::complete::double,
    sequence::{pair, preceded, terminated},
    IResult,
};
use thiserror::Error;

use crate::geometry::{Matrix, Point};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("unsupported path segment '{0}' (only move-to and relative line-to)")]
    UnsupportedSegment(char),
    #[error("path must start with a move-to, found '{0}'")]
    MissingMoveTo(char),
    #[error("segment '{command}' expects coordinate pairs, got {count} numbers")]
    OddCoordinates { command: char, count: usize },
    #[error("malformed path data: {0}")]
    Malformed(String),
}

/// One decoded path operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Move-to. `relative` only matters after the first segment; the first
    /// move-to of a path is always absolute.
    MoveTo { x: f64, y: f64, relative: bool },
    /// Relative line-to.
    LineTo { dx: f64, dy: f64 },
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn separator(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(char(','))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, ()))
}

fn command(input: &str) -> IResult<&str, (char, Vec<f64>)> {
    pair(
        preceded(multispace0, one_of("MmLlHhVvCcSsQqTtAaZz")),
        many0(preceded(separator, double)),
    )(input)
}

fn commands(input: &str) -> IResult<&str, Vec<(char, Vec<f64>)>> {
    terminated(many0(command), multispace0)(input)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn pairs(letter: char, args: &[f64]) -> Result<impl Iterator<Item = (f64, f64)> + '_, PathError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(PathError::OddCoordinates {
            command: letter,
            count: args.len(),
        });
    }
    Ok(args.chunks_exact(2).map(|c| (c[0], c[1])))
}

/// Decode `d` into move-to / relative line-to segments.
pub fn decode_segments(d: &str) -> Result<Vec<PathSegment>, PathError> {
    let (_, cmds) = all_consuming(commands)(d).map_err(|e| PathError::Malformed(e.to_string()))?;

    let mut segments = Vec::new();
    for (letter, args) in cmds {
        if segments.is_empty() && !matches!(letter, 'm' | 'M') {
            return Err(PathError::MissingMoveTo(letter));
        }
        match letter {
            'm' | 'M' => {
                for (i, (x, y)) in pairs(letter, &args)?.enumerate() {
                    if i == 0 {
                        segments.push(PathSegment::MoveTo {
                            x,
                            y,
                            relative: letter == 'm',
                        });
                    } else if letter == 'm' {
                        segments.push(PathSegment::LineTo { dx: x, dy: y });
                    } else {
                        // Implicit pairs after `M` are absolute line-tos.
                        return Err(PathError::UnsupportedSegment('L'));
                    }
                }
            }
            'l' => {
                for (dx, dy) in pairs(letter, &args)? {
                    segments.push(PathSegment::LineTo { dx, dy });
                }
            }
            other => return Err(PathError::UnsupportedSegment(other)),
        }
    }
    Ok(segments)
}

/// Turn decoded segments into absolute points under `transform`.
///
/// Points are built in the path's own coordinates and then mapped through
/// the full matrix, so relative offsets pick up the linear part only.
pub fn segments_to_points(segments: &[PathSegment], transform: &Matrix) -> Vec<Point> {
    let mut local: Vec<Point> = Vec::with_capacity(segments.len());
    for seg in segments {
        let next = match (*seg, local.last()) {
            (PathSegment::MoveTo { x, y, relative: true }, Some(cur)) => cur.offset(x, y),
            (PathSegment::MoveTo { x, y, .. }, _) => Point::new(x, y),
            (PathSegment::LineTo { dx, dy }, Some(cur)) => cur.offset(dx, dy),
            (PathSegment::LineTo { dx, dy }, None) => Point::new(dx, dy),
        };
        local.push(next);
    }
    local.into_iter().map(|p| transform.apply(p)).collect()
}

/// Decode `d` straight to absolute points.
pub fn decode_points(d: &str, transform: &Matrix) -> Result<Vec<Point>, PathError> {
    Ok(segments_to_points(&decode_segments(d)?, transform))
}
