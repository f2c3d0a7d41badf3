//! Lifetime assignment for C++ function signatures.
//!
//! Every pointer and reference position in a signature receives a
//! [`Lifetime`]. Positions are visited in a fixed order which both the
//! annotation parser and the annotation printer follow: the receiver first,
//! then each parameter, then the return type. Within one type, a pointee's
//! positions come before the pointer's own, tuple elements and template
//! arguments go left to right, and a function pointer contributes the
//! positions of its own parameters and return type.
//!
//! Lifetimes come from one of three places, in order of preference:
//!
//! 1. a `lifetimes` annotation string such as `"a: b, c -> a"`, attached to
//!    any one declaration of the function;
//! 2. inline annotations on individual pointer and reference types;
//! 3. elision, which only runs for functions declared in a file that opted
//!    in (the destructor's receiver is always inferable).

use crate::syntax::lifetime::{Lifetime, LifetimeFactory, LifetimeSymbolTable};
use crate::syntax::{FnKind, Func, SourceLoc, Type};
use std::fmt::{self, Display};
use std::slice;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FunctionLifetimes {
    pub this: Option<Lifetime>,
    pub params: Vec<Vec<Lifetime>>,
    pub ret: Vec<Lifetime>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LifetimeErrorKind {
    ElisionNotEnabled,
    CannotElideOutputLifetimes,
    Other,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LifetimeError {
    pub kind: LifetimeErrorKind,
    pub message: String,
}

impl LifetimeError {
    fn other(message: impl Into<String>) -> Self {
        LifetimeError {
            kind: LifetimeErrorKind::Other,
            message: message.into(),
        }
    }
}

impl Display for LifetimeError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Position {
    This,
    Param,
    Return,
    /// Inside a function pointer type. Never an input for elision and never
    /// elided from one.
    Nested,
}

trait LifetimeSource {
    fn lifetime(&mut self, inline: Option<&str>, position: Position)
        -> Result<Lifetime, LifetimeError>;
}

/// Resolves the lifetimes of `func`.
///
/// `elision_enabled` reports whether the file declaring `func` opted into
/// lifetime elision.
pub fn resolve(
    func: &Func,
    elision_enabled: bool,
    table: &mut LifetimeSymbolTable,
) -> Result<FunctionLifetimes, LifetimeError> {
    let name = &func.decl.name;

    let mut annotated: Vec<(&Option<SourceLoc>, &str)> = Vec::new();
    for (source_loc, annotations) in func.all_lifetime_annotations() {
        match annotations {
            [] => {}
            [annotation] => annotated.push((source_loc, annotation)),
            _ => {
                return Err(LifetimeError::other(format!(
                    "Can't extract lifetimes as '{}' has multiple lifetime annotations",
                    name,
                )));
            }
        }
    }

    let Some(&(first_loc, first)) = annotated.first() else {
        let mut source = Elision {
            name,
            table,
            elision_enabled,
            is_destructor: func.kind == FnKind::Destructor,
            this: None,
            inputs: Vec::new(),
        };
        return walk_signature(func, &mut source);
    };

    let lifetimes = parse(func, first, table)?;

    // Every other annotated declaration must agree up to renaming.
    for &(loc, annotation) in &annotated[1..] {
        let scratch = LifetimeFactory::new();
        let other = parse(func, annotation, &mut LifetimeSymbolTable::new(&scratch))?;
        if canonical(&other) != canonical(&lifetimes) {
            return Err(LifetimeError::other(format!(
                "Conflicting lifetime annotations for '{}': \"{}\"{} and \"{}\"{}",
                name,
                first,
                at(first_loc),
                annotation,
                at(loc),
            )));
        }
    }

    Ok(lifetimes)
}

/// Parses a `"this: params -> return"` annotation positionally. Grouping
/// punctuation is accepted anywhere and ignored: names are matched to
/// positions purely by order.
pub fn parse(
    func: &Func,
    annotation: &str,
    table: &mut LifetimeSymbolTable,
) -> Result<FunctionLifetimes, LifetimeError> {
    let mut source = Annotation {
        lexer: Lexer { rest: annotation },
        table,
    };
    let lifetimes = walk_signature(func, &mut source)?;
    if source.lexer.next_name()?.is_some() {
        return Err(LifetimeError::other(
            "Invalid lifetime annotation: too many lifetimes",
        ));
    }
    Ok(lifetimes)
}

fn has_this(func: &Func) -> bool {
    func.receiver.is_some() || matches!(func.kind, FnKind::Constructor | FnKind::Destructor)
}

fn walk_signature(
    func: &Func,
    source: &mut dyn LifetimeSource,
) -> Result<FunctionLifetimes, LifetimeError> {
    let this = if has_this(func) {
        let inline = func.receiver.as_ref().and_then(|receiver| receiver.lifetime.as_deref());
        Some(source.lifetime(inline, Position::This)?)
    } else {
        None
    };

    let mut params = Vec::new();
    for param in &func.params {
        let mut lifetimes = Vec::new();
        walk(&param.ty, Position::Param, source, &mut lifetimes)?;
        params.push(lifetimes);
    }

    let mut ret = Vec::new();
    walk(&func.ret, Position::Return, source, &mut ret)?;

    Ok(FunctionLifetimes { this, params, ret })
}

fn walk(
    ty: &Type,
    position: Position,
    source: &mut dyn LifetimeSource,
    out: &mut Vec<Lifetime>,
) -> Result<(), LifetimeError> {
    match ty {
        Type::Pointer(ptr) => {
            walk(&ptr.pointee, position, source, out)?;
            out.push(source.lifetime(ptr.lifetime.as_deref(), position)?);
        }
        Type::Reference(reference) => {
            walk(&reference.pointee, position, source, out)?;
            out.push(source.lifetime(reference.lifetime.as_deref(), position)?);
        }
        Type::Tuple(tuple) => {
            for element in &tuple.elements {
                walk(element, position, source, out)?;
            }
        }
        Type::Instantiation(inst) => {
            for arg in &inst.args {
                walk(arg, position, source, out)?;
            }
        }
        Type::FunctionPointer(sig) => {
            for param in &sig.params {
                walk(param, Position::Nested, source, out)?;
            }
            walk(&sig.ret, Position::Nested, source, out)?;
        }
        Type::Primitive(_) | Type::Named(_) => {}
    }
    Ok(())
}

/// Number of lifetime positions in `ty`.
pub fn count_positions(ty: &Type) -> usize {
    match ty {
        Type::Pointer(ptr) => 1 + count_positions(&ptr.pointee),
        Type::Reference(reference) => 1 + count_positions(&reference.pointee),
        Type::Tuple(tuple) => tuple.elements.iter().map(count_positions).sum(),
        Type::Instantiation(inst) => inst.args.iter().map(count_positions).sum(),
        Type::FunctionPointer(sig) => {
            sig.params.iter().map(count_positions).sum::<usize>() + count_positions(&sig.ret)
        }
        Type::Primitive(_) | Type::Named(_) => 0,
    }
}

struct Elision<'a, 't, 'f> {
    name: &'a str,
    table: &'t mut LifetimeSymbolTable<'f>,
    elision_enabled: bool,
    is_destructor: bool,
    this: Option<Lifetime>,
    inputs: Vec<Lifetime>,
}

impl Elision<'_, '_, '_> {
    fn not_enabled(&self) -> LifetimeError {
        LifetimeError {
            kind: LifetimeErrorKind::ElisionNotEnabled,
            message: format!("Lifetime elision not enabled for '{}'", self.name),
        }
    }

    fn fresh(&mut self) -> Lifetime {
        let lifetime = self.table.factory().fresh();
        self.table.lookup_lifetime_and_maybe_declare(lifetime);
        lifetime
    }

    // The receiver's lifetime if there is one, otherwise the only distinct
    // lifetime among the parameters.
    fn single_input(&self) -> Option<Lifetime> {
        if self.this.is_some() {
            return self.this;
        }
        let first = *self.inputs.first()?;
        if self.inputs.iter().all(|&lifetime| lifetime == first) {
            Some(first)
        } else {
            None
        }
    }
}

impl LifetimeSource for Elision<'_, '_, '_> {
    fn lifetime(
        &mut self,
        inline: Option<&str>,
        position: Position,
    ) -> Result<Lifetime, LifetimeError> {
        let lifetime = match (inline, position) {
            (Some(name), _) => self.table.lookup_name_and_maybe_declare(name),
            (None, Position::Return) => {
                if !self.elision_enabled {
                    return Err(self.not_enabled());
                }
                match self.single_input() {
                    Some(lifetime) => lifetime,
                    None => {
                        return Err(LifetimeError {
                            kind: LifetimeErrorKind::CannotElideOutputLifetimes,
                            message: format!(
                                "Cannot elide output lifetimes for '{}' because it is a \
                                 non-member function that does not have exactly one input \
                                 lifetime",
                                self.name,
                            ),
                        });
                    }
                }
            }
            (None, _) => {
                if !self.elision_enabled && !self.is_destructor {
                    return Err(self.not_enabled());
                }
                self.fresh()
            }
        };
        match position {
            Position::This => self.this = Some(lifetime),
            Position::Param => self.inputs.push(lifetime),
            Position::Return | Position::Nested => {}
        }
        Ok(lifetime)
    }
}

struct Annotation<'s, 't, 'f> {
    lexer: Lexer<'s>,
    table: &'t mut LifetimeSymbolTable<'f>,
}

impl LifetimeSource for Annotation<'_, '_, '_> {
    fn lifetime(&mut self, _inline: Option<&str>, _: Position) -> Result<Lifetime, LifetimeError> {
        match self.lexer.next_name()? {
            Some(name) => Ok(self.table.lookup_name_and_maybe_declare(name)),
            None => Err(LifetimeError::other(
                "Invalid lifetime annotation: too few lifetimes",
            )),
        }
    }
}

struct Lexer<'s> {
    rest: &'s str,
}

impl<'s> Lexer<'s> {
    fn next_name(&mut self) -> Result<Option<&'s str>, LifetimeError> {
        loop {
            self.rest = self.rest.trim_start();
            if let Some(rest) = self.rest.strip_prefix("->") {
                self.rest = rest;
                continue;
            }
            let mut chars = self.rest.chars();
            let Some(ch) = chars.next() else {
                return Ok(None);
            };
            if matches!(ch, '(' | ')' | ',' | ':' | '[' | ']' | '<' | '>') {
                self.rest = chars.as_str();
                continue;
            }
            let name = self.rest.strip_prefix('\'').unwrap_or(self.rest);
            let len = name
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(name.len());
            if len == 0 {
                return Err(LifetimeError::other(format!(
                    "Invalid lifetime annotation: unexpected character '{}'",
                    ch,
                )));
            }
            self.rest = &name[len..];
            return Ok(Some(&name[..len]));
        }
    }
}

fn at(source_loc: &Option<SourceLoc>) -> String {
    match source_loc {
        Some(source_loc) => format!(" at {}", source_loc),
        None => String::new(),
    }
}

// Variables numbered by first occurrence, so that two assignments compare
// equal exactly when they differ only in naming.
fn canonical(lifetimes: &FunctionLifetimes) -> Vec<Option<usize>> {
    let mut seen: Vec<Lifetime> = Vec::new();
    lifetimes
        .this
        .iter()
        .chain(lifetimes.params.iter().flatten())
        .chain(&lifetimes.ret)
        .map(|&lifetime| {
            if lifetime.is_static() {
                return None;
            }
            Some(match seen.iter().position(|&l| l == lifetime) {
                Some(index) => index,
                None => {
                    seen.push(lifetime);
                    seen.len() - 1
                }
            })
        })
        .collect()
}

impl FunctionLifetimes {
    /// Formats the assignment in annotation syntax, e.g. `a: b, c -> a`.
    pub fn to_annotation(&self, func: &Func, table: &mut LifetimeSymbolTable) -> String {
        let this = self
            .this
            .map(|lifetime| table.lookup_lifetime_and_maybe_declare(lifetime));
        let params = func
            .params
            .iter()
            .zip(&self.params)
            .map(|(param, lifetimes)| {
                let mut iter = lifetimes.iter();
                group(format_type(&param.ty, &mut iter, table))
            })
            .collect::<Vec<_>>();
        let mut iter = self.ret.iter();
        let ret = format_type(&func.ret, &mut iter, table);
        format_signature(this, &params, &ret)
    }

    pub fn all(&self) -> impl Iterator<Item = Lifetime> + '_ {
        self.this
            .iter()
            .chain(self.params.iter().flatten())
            .chain(&self.ret)
            .copied()
    }
}

fn format_signature(this: Option<String>, params: &[String], ret: &[String]) -> String {
    let mut out = String::new();
    if let Some(this) = this {
        out.push_str(&this);
        out.push(':');
    }
    if !params.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&params.join(", "));
    }
    if !ret.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str("-> ");
        out.push_str(&group(ret.to_vec()));
    }
    out
}

fn format_type(
    ty: &Type,
    lifetimes: &mut slice::Iter<Lifetime>,
    table: &mut LifetimeSymbolTable,
) -> Vec<String> {
    match ty {
        Type::Pointer(ptr) => {
            let mut items = format_type(&ptr.pointee, lifetimes, table);
            items.push(name(lifetimes, table));
            items
        }
        Type::Reference(reference) => {
            let mut items = format_type(&reference.pointee, lifetimes, table);
            items.push(name(lifetimes, table));
            items
        }
        Type::Tuple(tuple) => tuple
            .elements
            .iter()
            .flat_map(|element| format_type(element, lifetimes, table))
            .collect(),
        Type::Instantiation(inst) => inst
            .args
            .iter()
            .flat_map(|arg| format_type(arg, lifetimes, table))
            .collect(),
        Type::FunctionPointer(sig) => {
            let params = sig
                .params
                .iter()
                .map(|param| group(format_type(param, lifetimes, table)))
                .collect::<Vec<_>>();
            let ret = format_type(&sig.ret, lifetimes, table);
            vec![format!("({})", format_signature(None, &params, &ret))]
        }
        Type::Primitive(_) | Type::Named(_) => Vec::new(),
    }
}

fn name(lifetimes: &mut slice::Iter<Lifetime>, table: &mut LifetimeSymbolTable) -> String {
    lifetimes
        .next()
        .map(|&lifetime| table.lookup_lifetime_and_maybe_declare(lifetime))
        .unwrap_or_default()
}

fn group(items: Vec<String>) -> String {
    match items.len() {
        0 => "()".to_owned(),
        1 => items.into_iter().next().unwrap_or_default(),
        _ => format!("({})", items.join(", ")),
    }
}
