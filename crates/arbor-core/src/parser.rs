//! Parser for the module outline format → `Module`.
//!
//! Built on `winnow` 0.7. One directive per line; indentation (two spaces
//! per level) nests types and places members inside the type above them.
//!
//! ```text
//! module Demo
//! namespace Demo.Ui
//! type public Widget
//!   field private count
//!   property public Title get set
//!   type private Part
//! resource Strings.resources: Hello, Bye
//! ```

use crate::metadata::{Module, ModuleBuilder, TypeId, Visibility};
use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, opt, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// Parse an outline document into a `Module`.
#[must_use = "parsing result should be used"]
pub fn parse_outline(input: &str) -> Result<Module, String> {
    let mut builder: Option<ModuleBuilder> = None;
    let mut namespace = String::new();
    // Open types, outermost first; `types[d]` is the type at depth `d`.
    let mut types: Vec<TypeId> = Vec::new();

    for (n, raw) in input.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.trim_end();
        let body = line.trim_start();
        if body.is_empty() || body.starts_with('#') {
            continue;
        }

        let indent = line.len() - body.len();
        if indent % 2 != 0 || line[..indent].contains('\t') {
            return Err(format!("line {line_no}: indent must be a multiple of two spaces"));
        }
        let depth = indent / 2;

        let mut rest = body;
        let directive = parse_directive
            .parse_next(&mut rest)
            .map_err(|e| format!("line {line_no}: invalid directive `{body}` ({e})"))?;
        if !rest.trim().is_empty() {
            return Err(format!("line {line_no}: unexpected `{}`", rest.trim()));
        }

        if let Directive::Module(name) = directive {
            if builder.is_some() || depth != 0 {
                return Err(format!("line {line_no}: `module` must be the first directive"));
            }
            builder = Some(ModuleBuilder::new(name));
            continue;
        }
        let Some(b) = builder.as_mut() else {
            return Err(format!("line {line_no}: missing `module` header"));
        };

        match directive {
            Directive::Module(_) => {}
            Directive::Namespace(ns) => {
                top_level(depth, line_no, "namespace")?;
                namespace = ns.to_string();
                types.clear();
            }
            Directive::Resource(name, entries) => {
                top_level(depth, line_no, "resource")?;
                b.add_resource(name, &entries);
            }
            Directive::Type(vis, name) => {
                if depth > types.len() {
                    return Err(format!("line {line_no}: type `{name}` is over-indented"));
                }
                types.truncate(depth);
                let id = match types.last() {
                    Some(&outer) => b.add_nested_type(outer, name, vis),
                    None => b.add_type(&namespace, name, vis),
                };
                types.push(id);
            }
            member => {
                if depth == 0 || depth > types.len() {
                    return Err(format!("line {line_no}: member outside of a type"));
                }
                types.truncate(depth);
                let owner = types[depth - 1];
                match member {
                    Directive::Field(vis, name) => {
                        b.add_field(owner, name, vis);
                    }
                    Directive::Method(vis, name) => {
                        b.add_method(owner, name, vis);
                    }
                    Directive::Property(vis, name, get, set) => {
                        b.add_property(owner, name, vis, get, set);
                    }
                    Directive::Event(vis, name) => {
                        b.add_event(owner, name, vis);
                    }
                    _ => {}
                }
            }
        }
    }

    builder
        .map(ModuleBuilder::build)
        .ok_or_else(|| "missing `module` header".to_string())
}

fn top_level(depth: usize, line_no: usize, what: &str) -> Result<(), String> {
    if depth == 0 {
        Ok(())
    } else {
        Err(format!("line {line_no}: `{what}` cannot be indented"))
    }
}

// ─── Directives ─────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Directive<'a> {
    Module(&'a str),
    Namespace(&'a str),
    Type(Visibility, &'a str),
    Field(Visibility, &'a str),
    Method(Visibility, &'a str),
    /// Name, then whether a getter and a setter exist.
    Property(Visibility, &'a str, bool, bool),
    Event(Visibility, &'a str),
    Resource(&'a str, Vec<&'a str>),
}

fn parse_directive<'a>(input: &mut &'a str) -> ModalResult<Directive<'a>> {
    let keyword = parse_keyword.parse_next(input)?;
    match keyword {
        "module" => preceded(space1, parse_name)
            .map(Directive::Module)
            .parse_next(input),
        "namespace" => opt(preceded(space1, parse_name))
            .map(|ns| Directive::Namespace(ns.unwrap_or("")))
            .parse_next(input),
        "type" => parse_visible.map(|(v, n)| Directive::Type(v, n)).parse_next(input),
        "field" => parse_visible.map(|(v, n)| Directive::Field(v, n)).parse_next(input),
        "method" => parse_visible.map(|(v, n)| Directive::Method(v, n)).parse_next(input),
        "event" => parse_visible.map(|(v, n)| Directive::Event(v, n)).parse_next(input),
        "property" => {
            let (vis, name) = parse_visible.parse_next(input)?;
            let accessors: Vec<&str> =
                repeat(0.., preceded(space1, alt(("get", "set")))).parse_next(input)?;
            Ok(Directive::Property(
                vis,
                name,
                accessors.contains(&"get"),
                accessors.contains(&"set"),
            ))
        }
        "resource" => {
            let name = preceded(space1, parse_resource_name).parse_next(input)?;
            let entries = opt(preceded(
                (space0, ':', space0),
                separated(1.., parse_name, (space0, ',', space0)),
            ))
            .parse_next(input)?;
            Ok(Directive::Resource(name, entries.unwrap_or_default()))
        }
        _ => Err(ErrMode::Backtrack(ContextError::new())),
    }
}

fn parse_keyword<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_lowercase()).parse_next(input)
}

/// `<visibility> <name>`, with the leading separator.
fn parse_visible<'a>(input: &mut &'a str) -> ModalResult<(Visibility, &'a str)> {
    let vis = preceded(space1, parse_visibility).parse_next(input)?;
    let name = preceded(space1, parse_name).parse_next(input)?;
    Ok((vis, name))
}

fn parse_visibility(input: &mut &str) -> ModalResult<Visibility> {
    alt((
        "public".value(Visibility::Public),
        "protected".value(Visibility::Protected),
        "internal".value(Visibility::Internal),
        "private".value(Visibility::Private),
    ))
    .parse_next(input)
}

/// Metadata names: anything up to whitespace or a list separator, so
/// generic arity (`List`1`) and compiler names (`<Main>$`) pass through.
fn parse_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| !c.is_whitespace() && c != ',' && c != ':').parse_next(input)
}

fn parse_resource_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| !c.is_whitespace() && c != ':').parse_next(input)
}
