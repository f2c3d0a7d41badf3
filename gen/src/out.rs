use crate::gen::include::Includes;
use std::cell::RefCell;
use std::fmt::{self, Arguments, Write};

/// A C++ file under construction.
pub(crate) struct OutFile {
    /// Comment lines placed above everything else.
    pub preamble: String,
    pub include: Includes,
    content: RefCell<Content>,
    namespace: Vec<String>,
}

/// Text of a C++ file, or of a piece of one.
#[derive(Default)]
pub(crate) struct Content {
    bytes: String,
    section_pending: bool,
    blocks_pending: Vec<String>,
}

impl OutFile {
    pub fn new() -> Self {
        OutFile {
            preamble: String::new(),
            include: Includes::new(),
            content: RefCell::new(Content::new()),
            namespace: Vec::new(),
        }
    }

    // Write a blank line if the preceding section had any contents.
    pub fn next_section(&mut self) {
        self.content.get_mut().next_section();
    }

    pub fn begin_block(&mut self, block: &str) {
        self.content.get_mut().begin_block(block);
    }

    pub fn end_block(&mut self, block: &str) {
        self.content.get_mut().end_block(block);
    }

    /// Closes and opens `namespace` blocks so that what is written next
    /// lands in `namespace`. Blocks that end up empty are never printed.
    pub fn set_namespace<'n>(&mut self, namespace: impl IntoIterator<Item = &'n String>) {
        let target: Vec<String> = namespace.into_iter().cloned().collect();
        let common = self
            .namespace
            .iter()
            .zip(&target)
            .take_while(|(a, b)| a == b)
            .count();
        while self.namespace.len() > common {
            let segment = self.namespace.pop().unwrap_or_default();
            self.end_block(&format!("namespace {}", segment));
        }
        for segment in &target[common..] {
            self.begin_block(&format!("namespace {}", segment));
            self.namespace.push(segment.clone());
        }
    }

    pub fn write_fmt(&self, args: Arguments) {
        let content = &mut *self.content.borrow_mut();
        Write::write_fmt(content, args).unwrap();
    }

    /// Appends text rendered elsewhere.
    pub fn write_content(&self, piece: Content) {
        self.content.borrow_mut().write(&piece.bytes);
    }

    pub fn content(mut self) -> String {
        self.set_namespace(std::iter::empty::<&String>());
        let include = self.include.to_string();
        let content = self.content.into_inner().bytes;
        let mut out = String::with_capacity(self.preamble.len() + include.len() + content.len() + 2);
        out.push_str(&self.preamble);
        if !out.is_empty() && !include.is_empty() {
            out.push('\n');
        }
        out.push_str(&include);
        out.push_str(&content);
        if out.is_empty() {
            out.push_str("// empty\n");
        }
        out
    }
}

impl Write for Content {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s);
        Ok(())
    }
}

impl Content {
    pub fn new() -> Self {
        Content::default()
    }

    pub fn write_fmt(&mut self, args: Arguments) {
        Write::write_fmt(self, args).unwrap();
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_string(self) -> String {
        self.bytes
    }

    pub fn next_section(&mut self) {
        self.section_pending = true;
    }

    pub fn begin_block(&mut self, block: &str) {
        self.blocks_pending.push(block.to_owned());
    }

    pub fn end_block(&mut self, block: &str) {
        if self.blocks_pending.pop().is_none() {
            self.bytes.push_str("}  // ");
            self.bytes.push_str(block);
            self.bytes.push('\n');
            self.section_pending = true;
        }
    }

    fn write(&mut self, b: &str) {
        if !b.is_empty() {
            if !self.blocks_pending.is_empty() {
                if !self.bytes.is_empty() {
                    self.bytes.push('\n');
                }
                for block in self.blocks_pending.drain(..) {
                    self.bytes.push_str(&block);
                    self.bytes.push_str(" {\n");
                }
                self.section_pending = false;
            } else if self.section_pending {
                if !self.bytes.is_empty() {
                    self.bytes.push('\n');
                }
                self.section_pending = false;
            }
            self.bytes.push_str(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OutFile;

    fn ns(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_namespaces_open_lazily() {
        let mut out = OutFile::new();
        out.set_namespace(&ns(&["a", "b"]));
        writeln!(out, "struct X;");
        out.set_namespace(&ns(&["a", "c"]));
        out.set_namespace(&ns(&["a"]));
        writeln!(out, "struct Y;");
        assert_eq!(
            "namespace a {\nnamespace b {\nstruct X;\n}  // namespace b\n\nstruct Y;\n}  // namespace a\n",
            out.content(),
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!("// empty\n", OutFile::new().content());
    }
}
