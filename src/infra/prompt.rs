//! Interactive operator prompts
//!
//! Confirmation questions go through the [`Prompt`] trait so the
//! destructive-write gate can be driven by scripted answers in tests.

use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};

/// Asks the operator questions
pub trait Prompt {
    /// Show an informational line
    fn notice(&self, message: &str);

    /// Ask a yes/no question
    fn confirm(&self, question: &str, default: bool) -> io::Result<bool>;

    /// Ask for a free-form answer
    fn input(&self, question: &str) -> io::Result<String>;
}

/// Prompts on the controlling terminal
///
/// Without a terminal on stdin every question is answered "no" and every
/// input is empty, so nothing destructive can happen unattended. End of
/// input (Ctrl-D) is treated the same way.
pub struct TerminalPrompt {
    interactive: bool,
    reader: RefCell<Box<dyn BufRead>>,
}

impl TerminalPrompt {
    /// Create a prompt bound to stdin/stderr
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal(),
            reader: RefCell::new(Box::new(BufReader::new(io::stdin()))),
        }
    }

    /// Create a prompt that reads answers from `reader`
    pub fn with_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            interactive: true,
            reader: RefCell::new(Box::new(reader)),
        }
    }

    /// Next answer line, or `None` when there is nothing to read
    fn read_line(&self) -> io::Result<Option<String>> {
        if !self.interactive {
            return Ok(None);
        }
        let mut line = String::new();
        if self.reader.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for TerminalPrompt {
    fn notice(&self, message: &str) {
        eprintln!("{message}");
    }

    fn confirm(&self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        eprint!("{question} {hint} ");
        io::stderr().flush()?;

        let Some(answer) = self.read_line()? else {
            eprintln!();
            tracing::warn!("No answer available, treating '{question}' as declined");
            return Ok(false);
        };
        Ok(parse_yes_no(&answer).unwrap_or(default))
    }

    fn input(&self, question: &str) -> io::Result<String> {
        eprint!("{question}: ");
        io::stderr().flush()?;
        Ok(self.read_line()?.unwrap_or_default())
    }
}

/// Interpret a yes/no answer; `None` for an empty answer
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" => None,
        "y" | "yes" => Some(true),
        _ => Some(false),
    }
}
