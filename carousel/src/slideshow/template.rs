//! Rewrites the interval declaration of a slideshow script.
//!
//! The scripts declare the interval once, near the top:
//! - shell: `INTERVAL=600`
//! - PowerShell: `$INTERVAL = 600`
//!
//! Only the first declaration line is touched, everything else is copied verbatim.

use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, space0};
use nom::{IResult, Parser};
use thiserror::Error;

/// Scripting language of a slideshow script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Shell,
    PowerShell,
}

#[derive(Debug, PartialEq, Error)]
pub enum TemplateError {
    #[error("slideshow script has no interval declaration")]
    MissingInterval,
}

fn shell_declaration(input: &str) -> IResult<&str, &str> {
    let (input, (indent, _, _, _)) = (space0, tag("INTERVAL"), char('='), digit1).parse(input)?;
    Ok((input, indent))
}

fn powershell_declaration(input: &str) -> IResult<&str, &str> {
    let (input, (indent, _, _, _, _, _)) =
        (space0, tag("$INTERVAL"), space0, char('='), space0, digit1).parse(input)?;
    Ok((input, indent))
}

impl Dialect {
    /// Parses an interval declaration at the start of `line`.
    ///
    /// Returns the remainder of the line and the indentation in front of the declaration.
    fn declaration<'a>(self, line: &'a str) -> IResult<&'a str, &'a str> {
        match self {
            Dialect::Shell => shell_declaration(line),
            Dialect::PowerShell => powershell_declaration(line),
        }
    }

    fn assignment(self, seconds: u64) -> String {
        match self {
            Dialect::Shell => format!("INTERVAL={seconds}"),
            Dialect::PowerShell => format!("$INTERVAL={seconds}"),
        }
    }
}

/// Sets the interval of `script` to `seconds`.
///
/// # Errors
/// [`TemplateError::MissingInterval`] if no line declares the interval.
pub fn rewrite_interval(
    script: &str,
    dialect: Dialect,
    seconds: u64,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(script.len() + 8);
    let mut rewritten = false;

    for (line_no, line) in script.split_inclusive('\n').enumerate() {
        match dialect.declaration(line) {
            Ok((rest, indent)) if !rewritten => {
                result.push_str(indent);
                result.push_str(&dialect.assignment(seconds));
                result.push_str(rest);
                rewritten = true;
            }
            Ok(_) => {
                log::warn!(
                    "slideshow script line {}: extra interval declaration left as is",
                    line_no + 1
                );
                result.push_str(line);
            }
            Err(_) => result.push_str(line),
        }
    }

    if rewritten {
        Ok(result)
    } else {
        Err(TemplateError::MissingInterval)
    }
}
