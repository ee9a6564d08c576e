//! Port data types and the compatibility predicate.
//!
//! The canvas only ever asks one question about types: may data produced as
//! `source` flow into a port declared as `target`? Hosts can answer it with
//! any closure; `DefaultTypeCompat` answers it from a small type grammar:
//!
//! ```text
//! type  := term ('|' term)*
//! term  := 'any' | name ('<' type (',' type)* '>')?
//! ```
//!
//! Built on `winnow` 0.7.

use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// Capability: decides whether a source port type may feed a target port type.
pub trait TypeCompat {
    fn compatible(&self, source: &str, target: &str) -> bool;
}

impl<F> TypeCompat for F
where
    F: Fn(&str, &str) -> bool,
{
    fn compatible(&self, source: &str, target: &str) -> bool {
        self(source, target)
    }
}

/// Parsed port type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Matches every type.
    Any,
    /// A plain type name, lowercased.
    Named(String),
    /// A parameterized type such as `list<text>`.
    Generic(String, Vec<TypeExpr>),
    /// Alternatives: `text | image`.
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    /// Parse a port type string.
    ///
    /// # Errors
    /// Returns a message when the string does not follow the type grammar.
    pub fn parse(source: &str) -> Result<TypeExpr, String> {
        let mut rest = source;
        let expr = parse_union
            .parse_next(&mut rest)
            .map_err(|e| format!("Type parse error in `{source}`: {e}"))?;
        skip_space(&mut rest);
        if !rest.is_empty() {
            return Err(format!(
                "Type parse error in `{source}`: unexpected `{rest}`"
            ));
        }
        Ok(expr)
    }

    /// Whether a value of type `self` may flow into a port of type `target`.
    pub fn flows_into(&self, target: &TypeExpr) -> bool {
        match (self, target) {
            (TypeExpr::Any, _) | (_, TypeExpr::Any) => true,
            (TypeExpr::Union(members), _) => members.iter().any(|m| m.flows_into(target)),
            (_, TypeExpr::Union(members)) => members.iter().any(|m| self.flows_into(m)),
            (TypeExpr::Named(a), TypeExpr::Named(b)) => a == b,
            (TypeExpr::Generic(a, xs), TypeExpr::Generic(b, ys)) => {
                a == b && xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x.flows_into(y))
            }
            _ => false,
        }
    }
}

/// The built-in compatibility predicate.
///
/// Unparseable type strings fall back to exact (trimmed) string equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeCompat;

impl TypeCompat for DefaultTypeCompat {
    fn compatible(&self, source: &str, target: &str) -> bool {
        match (TypeExpr::parse(source), TypeExpr::parse(target)) {
            (Ok(s), Ok(t)) => s.flows_into(&t),
            _ => {
                log::trace!("unparsed port types {source:?} -> {target:?}, comparing verbatim");
                source.trim() == target.trim()
            }
        }
    }
}

// ─── Grammar ─────────────────────────────────────────────────────────────

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    use winnow::ascii::space0;
    let _: Result<&str, winnow::error::ErrMode<ContextError>> = space0.parse_next(input);
}

fn parse_identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
    })
    .parse_next(input)
}

fn parse_union(input: &mut &str) -> ModalResult<TypeExpr> {
    let mut members = vec![parse_term(input)?];
    loop {
        skip_space(input);
        if !input.starts_with('|') {
            break;
        }
        *input = &input[1..];
        members.push(parse_term(input)?);
    }
    if members.len() == 1 {
        Ok(members.remove(0))
    } else {
        Ok(TypeExpr::Union(members))
    }
}

fn parse_term(input: &mut &str) -> ModalResult<TypeExpr> {
    skip_space(input);
    let name = parse_identifier(input)?.to_ascii_lowercase();
    skip_space(input);
    if !input.starts_with('<') {
        if name == "any" {
            return Ok(TypeExpr::Any);
        }
        return Ok(TypeExpr::Named(name));
    }
    *input = &input[1..];
    let mut args = vec![parse_union(input)?];
    loop {
        skip_space(input);
        if !input.starts_with(',') {
            break;
        }
        *input = &input[1..];
        args.push(parse_union(input)?);
    }
    skip_space(input);
    let _ = '>'.parse_next(input)?;
    Ok(TypeExpr::Generic(name, args))
}
