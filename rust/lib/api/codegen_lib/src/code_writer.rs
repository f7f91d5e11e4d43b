//! Indentation-tracking text builder used by every emitter.
//!
//! Implements `write_fmt`, so the std `write!`/`writeln!` macros work on it
//! directly. Indentation is applied at the start of every non-empty line,
//! including lines produced by a single multi-line write.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;

pub struct CodeWriter {
    out: String,
    level: Rc<Cell<usize>>,
    indent_string: String,
    at_line_start: bool,
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::with_indent_spaces(4)
    }
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent_spaces(spaces: usize) -> Self {
        Self {
            out: String::new(),
            level: Rc::new(Cell::new(0)),
            indent_string: " ".repeat(spaces),
            at_line_start: true,
        }
    }

    pub fn write_str(&mut self, text: &str) {
        for chunk in text.split_inclusive('\n') {
            if self.at_line_start && chunk != "\n" {
                for _ in 0..self.level.get() {
                    self.out.push_str(&self.indent_string);
                }
            }
            self.out.push_str(chunk);
            self.at_line_start = chunk.ends_with('\n');
        }
    }

    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        match args.as_str() {
            Some(s) => self.write_str(s),
            None => self.write_str(&args.to_string()),
        }
        Ok(())
    }

    pub fn line(&mut self, text: &str) -> fmt::Result {
        self.write_str(text);
        self.write_str("\n");
        Ok(())
    }

    pub fn blank_line(&mut self) -> fmt::Result {
        self.line("")
    }

    /// Indentation increases while the guard is alive.
    pub fn indent(&self) -> IndentGuard {
        self.level.set(self.level.get() + 1);
        IndentGuard {
            level: Rc::clone(&self.level),
        }
    }

    /// Writes `header {`, the indented body, then `}`. An empty header opens
    /// a bare scope.
    pub fn block<F>(&mut self, header: &str, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if header.is_empty() {
            self.line("{")?;
        } else {
            self.line(&format!("{header} {{"))?;
        }
        {
            let _indent = self.indent();
            body(self)?;
        }
        self.line("}")?;
        Ok(())
    }

    /// Writes `text` as `///` doc lines.
    pub fn doc(&mut self, text: &str) -> fmt::Result {
        for line in text.lines() {
            if line.trim().is_empty() {
                self.line("///")?;
            } else {
                self.line(&format!("/// {}", line.trim_end()))?;
            }
        }
        Ok(())
    }

    pub fn indent_level(&self) -> usize {
        self.level.get()
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

pub struct IndentGuard {
    level: Rc<Cell<usize>>,
}

impl Drop for IndentGuard {
    fn drop(&mut self) {
        self.level.set(self.level.get().saturating_sub(1));
    }
}
