use agrimandi_core::ResponseResolver;
use anyhow::Result;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;

pub const EXIT_COMMANDS: &[&str] = &["exit", "quit", "bye", "goodbye"];
pub const FAREWELL_MESSAGE: &str = "Thank you! Stay safe and keep farming 🌾";
pub const INTERRUPT_MESSAGE: &str = "Session ended. Goodbye!";

const PROMPT: &str = "🧑 You: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Interrupted,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ExitCommand,
    Interrupted,
    Closed,
}

/// Where the session gets its next line from.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;
}

pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.trim()).ok();
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Closed),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_COMMANDS.contains(&input.as_str())
}

/// Reads, resolves and prints until an exit command, an interrupt or the
/// end of input.
pub fn run_session<S, W>(source: &mut S, out: &mut W, resolver: &ResponseResolver) -> Result<SessionEnd>
where
    S: LineSource,
    W: Write,
{
    writeln!(
        out,
        "{}",
        style("👨‍🌾 Welcome to AgriMandi Chatbot with AI Support!").green()
    )?;
    writeln!(out, "{}\n", style("Type 'exit' to quit.").yellow())?;
    out.flush()?;

    loop {
        let line = match source.read_line(PROMPT)? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted => {
                writeln!(out, "\n{}", style(format!("🤖 Chatbot: {INTERRUPT_MESSAGE}")).red())?;
                return Ok(SessionEnd::Interrupted);
            }
            ReadOutcome::Closed => {
                writeln!(out, "\n{}", style(format!("🤖 Chatbot: {INTERRUPT_MESSAGE}")).red())?;
                return Ok(SessionEnd::Closed);
            }
        };

        let input = line.trim();
        if is_exit_command(input) {
            writeln!(out, "{}", style(format!("🤖 Chatbot: {FAREWELL_MESSAGE}")).magenta())?;
            return Ok(SessionEnd::ExitCommand);
        }

        let response = resolver.get_response(input);
        writeln!(out, "{}", style(format!("🤖 Chatbot: {response}")).blue())?;
        out.flush()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimandi_core::{
        ChatConfig, DisabledIntentClassifier, FaqLookup, FaqStore, LexicalQaModel, QaFallback,
        ResponseTemplates, TextNormalizer, FALLBACK_CONTEXT,
    };
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct Scripted {
        steps: VecDeque<ReadOutcome>,
        prompts: usize,
    }

    impl Scripted {
        fn new(steps: Vec<ReadOutcome>) -> Self {
            Self {
                steps: steps.into(),
                prompts: 0,
            }
        }
    }

    impl LineSource for Scripted {
        fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
            self.prompts += 1;
            Ok(self.steps.pop_front().unwrap_or(ReadOutcome::Closed))
        }
    }

    fn line(s: &str) -> ReadOutcome {
        ReadOutcome::Line(s.to_string())
    }

    fn resolver() -> ResponseResolver {
        let config = ChatConfig::default();
        let normalizer = TextNormalizer::default();
        let store =
            FaqStore::from_json_str(r#"{"What is the mandi rate for wheat?": "₹2100 per quintal"}"#)
                .unwrap();
        ResponseResolver::new(
            &config,
            normalizer,
            Box::new(DisabledIntentClassifier),
            ResponseTemplates::default(),
            FaqLookup::new(store, normalizer, &config),
            QaFallback::new(Arc::new(LexicalQaModel::default()), FALLBACK_CONTEXT, &config),
        )
    }

    fn run(steps: Vec<ReadOutcome>) -> (SessionEnd, String, usize) {
        let mut source = Scripted::new(steps);
        let mut out = Vec::new();
        let end = run_session(&mut source, &mut out, &resolver()).unwrap();
        (end, String::from_utf8(out).unwrap(), source.prompts)
    }

    #[test]
    fn exit_keywords_are_case_insensitive() {
        for word in ["exit", "QUIT", " Bye ", "GoodBye"] {
            assert!(is_exit_command(word), "{word}");
        }
        assert!(!is_exit_command("exit now"));
    }

    #[test]
    fn exit_stops_without_further_prompts() {
        let (end, out, prompts) = run(vec![line("hi"), line("exit"), line("hello")]);
        assert_eq!(end, SessionEnd::ExitCommand);
        assert_eq!(prompts, 2);
        assert!(out.contains("Hello! How can I assist you in your farming journey today?"));
        assert!(out.contains(FAREWELL_MESSAGE));
    }

    #[test]
    fn interrupt_ends_with_distinct_farewell() {
        let (end, out, _) = run(vec![line("whats the mandi rate for wheat"), ReadOutcome::Interrupted]);
        assert_eq!(end, SessionEnd::Interrupted);
        assert!(out.contains("₹2100 per quintal"));
        assert!(out.contains(INTERRUPT_MESSAGE));
        assert!(!out.contains(FAREWELL_MESSAGE));
    }

    #[test]
    fn end_of_input_closes_gracefully() {
        let (end, out, _) = run(vec![line("")]);
        assert_eq!(end, SessionEnd::Closed);
        assert!(out.contains("Please enter a valid question."));
        assert!(out.contains(INTERRUPT_MESSAGE));
    }
}
