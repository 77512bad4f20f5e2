//! Reader for the line-oriented fact/rule format:
//!
//! ```text
//! # comments and blank lines are skipped
//! fact: (man Socrates)
//! rule: ((man ?x) (greek ?x)) -> (philosopher ?x)
//! ```
//!
//! Arguments starting with `?` are variables. Malformed input is rejected
//! here; the knowledge base never sees it.

use crate::entity::{Entity, Rule};
use crate::error::{KbError, Result};
use crate::logic::{Statement, Term};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char as pchar, multispace0, multispace1};
use nom::combinator::{all_consuming, map, map_res};
use nom::multi::{many0, many1};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::IResult;

fn symbol(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != '(' && c != ')')(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    map(symbol, |s: &str| {
        if s.starts_with('?') {
            Term::var(s)
        } else {
            Term::constant(s)
        }
    })(input)
}

fn statement(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(pchar('('), multispace0)(input)?;
    let (input, predicate) = symbol(input)?;
    let (input, terms) = many0(preceded(multispace1, term))(input)?;
    let (input, _) = pair(multispace0, pchar(')'))(input)?;
    Ok((input, Statement::new(predicate, terms)))
}

fn rule_body(input: &str) -> IResult<&str, (Vec<Statement>, Statement)> {
    separated_pair(
        delimited(
            pair(pchar('('), multispace0),
            many1(terminated(statement, multispace0)),
            pchar(')'),
        ),
        delimited(multispace0, tag("->"), multispace0),
        statement,
    )(input)
}

fn entity(input: &str) -> IResult<&str, Entity> {
    alt((
        map(
            preceded(pair(tag("fact:"), multispace0), statement),
            Entity::from,
        ),
        map(
            map_res(
                preceded(pair(tag("rule:"), multispace0), rule_body),
                |(lhs, rhs)| Rule::new(lhs, rhs),
            ),
            Entity::Rule,
        ),
    ))(input)
}

fn finish<T>(result: IResult<&str, T>) -> Result<T> {
    result
        .map(|(_, value)| value)
        .map_err(|err| KbError::Parse(err.to_string()))
}

/// Parse a single statement such as `(isa ?x block)`
///
/// # Errors
///
/// Returns [`KbError::Parse`] if the input is not exactly one statement.
pub fn parse_statement(input: &str) -> Result<Statement> {
    finish(all_consuming(delimited(multispace0, statement, multispace0))(input))
}

/// Parse one `fact:` or `rule:` line
///
/// # Errors
///
/// Returns [`KbError::Parse`] if the line is neither.
pub fn parse_entity(input: &str) -> Result<Entity> {
    finish(all_consuming(delimited(multispace0, entity, multispace0))(input))
}

/// Parse a whole document, one fact or rule per line
///
/// # Errors
///
/// Returns [`KbError::Parse`] naming the first line that fails.
pub fn parse_entities(input: &str) -> Result<Vec<Entity>> {
    input
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            parse_entity(line).map_err(|err| KbError::Parse(format!("line {number}: {err}")))
        })
        .collect()
}
