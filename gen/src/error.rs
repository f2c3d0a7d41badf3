use crate::syntax;
use crate::syntax::report::ItemError;
use crate::syntax::types::Invalid;
use anyhow::anyhow;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream, WriteColor};
use codespan_reporting::term::{self, Config};
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process;
use std::str::Utf8Error;

pub(super) type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures that stop the whole run, as opposed to the per-declaration
/// [`ItemError`]s which only cost one declaration its bindings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no IR to generate bindings from")]
    Empty,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid IR: {0}")]
    Invalid(#[from] Invalid),
    #[error("`{0}` is not a path to the runtime crate")]
    RuntimeCrate(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{}: {}", .0.display(), .1)]
    Utf8(PathBuf, #[source] Utf8Error),
}

pub(super) fn format_err(path: &Path, source: &str, error: Error) -> ! {
    match error {
        Error::Json(json_error) if json_error.line() > 0 => {
            let writer = StandardStream::stderr(ColorChoice::Auto);
            let stderr = &mut writer.lock();
            let _ = writeln!(stderr);
            display_json_error(stderr, path, source, &json_error);
        }
        _ => eprintln!("crubit: {:?}", anyhow!(error)),
    }
    process::exit(1);
}

fn display_json_error(stderr: &mut dyn WriteColor, path: &Path, source: &str, error: &serde_json::Error) {
    let mut offset = 0;
    for _ in 1..error.line() {
        match source[offset..].find('\n') {
            Some(newline) => offset += newline + 1,
            None => break,
        }
    }
    // serde_json columns are 1-based and point at the offending character.
    offset += source[offset..]
        .chars()
        .take(error.column().saturating_sub(1))
        .map(char::len_utf8)
        .sum::<usize>();
    let end = source[offset..]
        .chars()
        .next()
        .map_or(offset, |ch| offset + ch.len_utf8());

    let mut files = SimpleFiles::new();
    let file = files.add(path.to_string_lossy(), source);
    let diagnostic = diagnose_json(file, offset..end, error);
    let config = Config::default();
    let _ = term::emit(stderr, &config, &files, &diagnostic);
}

fn diagnose_json(file: usize, range: Range<usize>, error: &serde_json::Error) -> Diagnostic<usize> {
    let message = error.to_string();
    let label = Label::primary(file, range).with_message(match error.classify() {
        serde_json::error::Category::Syntax => "malformed JSON",
        serde_json::error::Category::Eof => "unexpected end of input",
        serde_json::error::Category::Data => "does not match the IR schema",
        serde_json::error::Category::Io => "read failed",
    });
    let mut diagnostic = Diagnostic::error().with_message(message);
    diagnostic.labels.push(label);
    diagnostic.code = Some("crubit".to_owned());
    diagnostic
}

/// Prints one warning per declaration that got no bindings, with the
/// hints registered for its messages.
pub(super) fn report_item_errors(errors: &[ItemError]) {
    if errors.is_empty() {
        return;
    }
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let stderr = &mut writer.lock();
    let files = SimpleFiles::<String, String>::new();
    let config = Config::default();
    for error in errors {
        let diagnostic = diagnose_item(error);
        let _ = term::emit(stderr, &config, &files, &diagnostic);
    }
}

fn diagnose_item(error: &ItemError) -> Diagnostic<usize> {
    let mut diagnostic = Diagnostic::warning().with_message(format!("no bindings for '{}'", error.item));
    if let Some(source_loc) = &error.source_loc {
        diagnostic.notes.push(format!("declared at {}", source_loc));
    }
    for message in &error.messages {
        let info = syntax::error::ERRORS.iter().find(|e| message.starts_with(e.msg));
        match info.and_then(|info| info.label) {
            Some(label) => diagnostic.notes.push(format!("{}: {}", label, message)),
            None => diagnostic.notes.push(message.clone()),
        }
        if let Some(note) = info.and_then(|info| info.note) {
            diagnostic.notes.push(note.to_owned());
        }
    }
    diagnostic.code = Some("crubit".to_owned());
    diagnostic
}

#[cfg(test)]
mod tests {
    use super::diagnose_item;
    use crate::syntax::error;
    use crate::syntax::report::ItemError;
    use crate::syntax::SourceLoc;

    #[test]
    fn test_item_diagnostic_carries_hint() {
        let item = ItemError {
            item: "ns::f".to_owned(),
            source_loc: Some(SourceLoc {
                file: "ns/f.h".to_owned(),
                line: 3,
            }),
            messages: vec![error::OVERLOADED.with("'f'")],
        };
        let diagnostic = diagnose_item(&item);
        assert_eq!("no bindings for 'ns::f'", diagnostic.message);
        assert_eq!("declared at ns/f.h;l=3", diagnostic.notes[0]);
        assert_eq!(
            "overloaded: overloaded functions are not supported: 'f'",
            diagnostic.notes[1],
        );
        assert_eq!(Some(error::OVERLOADED.note.unwrap()), diagnostic.notes.get(2).map(String::as_str));
    }
}
