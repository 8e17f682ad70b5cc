use std::io::{self, BufRead, Write};
use tracing::debug;

/// Shown before every read
pub const PROMPT: &str = "Press Q to quit...";

/// Why the console loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitReason {
    /// The user typed the quit command
    Command,
    /// Input was closed
    EndOfInput,
}

/// `q` or `Q`, with the line terminator removed
pub fn is_quit_command(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case("q")
}

/// Blocking read loop that waits for the user to quit
pub struct ConsoleDriver<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> ConsoleDriver<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Prompt and read lines until quit or end of input
    ///
    /// `on_quit` runs exactly once, also when reading fails.
    pub fn run<F: FnOnce()>(mut self, on_quit: F) -> io::Result<QuitReason> {
        let result = self.read_until_quit();
        on_quit();
        result
    }

    fn read_until_quit(&mut self) -> io::Result<QuitReason> {
        let mut line = String::new();

        loop {
            writeln!(self.writer, "{}", PROMPT)?;
            self.writer.flush()?;

            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(QuitReason::EndOfInput);
            }

            if is_quit_command(&line) {
                return Ok(QuitReason::Command);
            }

            debug!("Ignoring console input: {:?}", line.trim_end());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_command_matching() {
        assert!(is_quit_command("q"));
        assert!(is_quit_command("Q\n"));
        assert!(is_quit_command("q\r\n"));
        assert!(!is_quit_command("quit"));
        assert!(!is_quit_command(" q"));
        assert!(!is_quit_command(""));
    }
}
