use anyhow::Result;
use std::fmt::{self, Display};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug)]
pub(crate) enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    pub(crate) fn new(path: &PathBuf) -> Self {
        if path.as_os_str() == "-" {
            Output::Stdout
        } else {
            Output::File(path.clone())
        }
    }

    pub(crate) fn write(&self, content: &[u8]) -> Result<()> {
        match self {
            Output::Stdout => io::stdout().lock().write_all(content)?,
            Output::File(path) => {
                // Unchanged outputs keep their mtime.
                if fs::read(path).is_ok_and(|existing| existing == content) {
                    return Ok(());
                }
                fs::write(path, content)?;
            }
        }
        Ok(())
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Output::Stdout => f.write_str("stdout"),
            Output::File(path) => write!(f, "{}", path.display()),
        }
    }
}
