//! Line-oriented prompts, generic over the streams so they can be tested.

use std::io::{self, BufRead, Write};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question` and read one line. `None` at end of input.
    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Yes/no question. An empty answer or end of input gives `default`.
    pub fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(answer) = self.ask(&format!("{question} {hint} "))? else {
                return Ok(default);
            };
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    pub fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn ask_reads_lines_until_eof() {
        let mut p = prompter("set-field\r\n0.1\n");
        assert_eq!(p.ask("> ").unwrap().as_deref(), Some("set-field"));
        assert_eq!(p.ask("> ").unwrap().as_deref(), Some("0.1"));
        assert_eq!(p.ask("> ").unwrap(), None);
    }

    #[test]
    fn confirm_retries_on_garbage() {
        let mut p = prompter("maybe\nyes\n");
        assert!(p.confirm("Start?", false).unwrap());
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("Please answer y or n."));
    }

    #[test]
    fn confirm_uses_default() {
        assert!(!prompter("\n").confirm("Start?", false).unwrap());
        assert!(prompter("").confirm("Start?", true).unwrap());
    }
}
