//! Test utilities
//!
//! Proptest generators plus fakes for the command runner and prompt seams.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid Debian package name
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9+.-]{1,20}"
    }

    /// Generate a valid login name
    pub fn login_name() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_-]{0,15}"
    }

    /// Generate an SSH key type accepted by ssh-keygen
    pub fn key_type() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("rsa".to_string()),
            Just("ecdsa".to_string()),
            Just("ed25519".to_string()),
        ]
    }

    /// Generate arbitrary multi-line boot menu text
    pub fn boot_menu_text() -> impl Strategy<Value = String> {
        prop::collection::vec("[ -~\t]{0,60}", 0..20).prop_map(|lines| lines.join("\n"))
    }
}

#[cfg(test)]
pub mod fakes {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::io;

    use crate::infra::process::{CommandOutput, CommandRunner, CommandSpec};
    use crate::infra::prompt::Prompt;

    type Hook = Box<dyn Fn(&CommandSpec)>;

    /// Records every command and replies with canned output
    ///
    /// Responses and hooks are keyed by the tool name, looking through `sudo`.
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: RefCell<Vec<CommandSpec>>,
        responses: HashMap<String, CommandOutput>,
        missing: HashSet<String>,
        hooks: HashMap<String, Hook>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reply to `tool` with `output`
        pub fn respond(mut self, tool: &str, output: CommandOutput) -> Self {
            self.responses.insert(tool.to_string(), output);
            self
        }

        /// Pretend `tool` is not installed
        pub fn missing(mut self, tool: &str) -> Self {
            self.missing.insert(tool.to_string());
            self
        }

        /// Run `hook` whenever `tool` is invoked
        pub fn on(mut self, tool: &str, hook: impl Fn(&CommandSpec) + 'static) -> Self {
            self.hooks.insert(tool.to_string(), Box::new(hook));
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.borrow().clone()
        }

        pub fn calls_to(&self, tool: &str) -> Vec<CommandSpec> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.tool() == tool)
                .cloned()
                .collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
            self.calls.borrow_mut().push(spec.clone());
            let tool = spec.tool();
            if self.missing.contains(tool) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "not found"));
            }
            if let Some(hook) = self.hooks.get(tool) {
                hook(spec);
            }
            Ok(self
                .responses
                .get(tool)
                .cloned()
                .unwrap_or_else(|| CommandOutput::ok("")))
        }
    }

    /// A scripted operator answer
    #[derive(Debug, Clone)]
    pub enum Answer {
        Yes,
        No,
        Text(String),
    }

    /// Answers questions from a fixed script and records what was asked
    #[derive(Default)]
    pub struct ScriptedPrompt {
        answers: RefCell<VecDeque<Answer>>,
        questions: RefCell<Vec<String>>,
        notices: RefCell<Vec<String>>,
    }

    impl ScriptedPrompt {
        pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
            Self {
                answers: RefCell::new(answers.into_iter().collect()),
                ..Self::default()
            }
        }

        pub fn questions(&self) -> Vec<String> {
            self.questions.borrow().clone()
        }

        pub fn notices(&self) -> Vec<String> {
            self.notices.borrow().clone()
        }

        fn next(&self, question: &str) -> Answer {
            self.questions.borrow_mut().push(question.to_string());
            self.answers
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected question: {question}"))
        }
    }

    impl Prompt for ScriptedPrompt {
        fn notice(&self, message: &str) {
            self.notices.borrow_mut().push(message.to_string());
        }

        fn confirm(&self, question: &str, _default: bool) -> io::Result<bool> {
            match self.next(question) {
                Answer::Yes => Ok(true),
                Answer::No => Ok(false),
                Answer::Text(text) => panic!("expected yes/no for '{question}', got '{text}'"),
            }
        }

        fn input(&self, question: &str) -> io::Result<String> {
            match self.next(question) {
                Answer::Text(text) => Ok(text),
                other => panic!("expected text for '{question}', got {other:?}"),
            }
        }
    }
}
