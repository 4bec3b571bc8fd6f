//! Line-oriented prompts over any `BufRead`/`Write` pair, so the menu can
//! run against stdin/stdout or against scripted buffers in tests.

use std::fmt::Display;
use std::io::{BufRead, Write};

use crate::error::{CliError, CliResult};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompter { input, output }
    }

    /// Gives the output back (tests read what was printed).
    pub fn into_output(self) -> W {
        self.output
    }

    /// Prints one line.
    pub fn say(&mut self, line: impl Display) -> CliResult<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Asks a question and returns the trimmed answer.
    ///
    /// ## Errors
    /// `InputClosed` when the input has no more lines.
    pub fn ask(&mut self, label: &str) -> CliResult<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(CliError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Like [`Prompter::ask`], returning `default` for a blank answer.
    pub fn ask_with_default(&mut self, label: &str, default: &str) -> CliResult<String> {
        let answer = self.ask(&format!("{label} [{default}]"))?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Yes/no question. Accepts `s`, `sim`, `y` and `yes`.
    pub fn confirm(&mut self, label: &str) -> CliResult<bool> {
        let answer = self.ask(&format!("{label} (s/n)"))?.to_ascii_lowercase();
        Ok(matches!(answer.as_str(), "s" | "sim" | "y" | "yes"))
    }
}
