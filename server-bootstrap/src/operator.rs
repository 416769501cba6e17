use std::io::{self, BufRead, Write};

/// Interactive questions. Answers are raw; callers apply defaults.
pub trait Operator {
    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool>;
    /// Returns the trimmed answer, empty when the operator just pressed enter.
    fn ask(&mut self, question: &str, default: &str) -> io::Result<String>;
}

pub struct Terminal<R> {
    input: R,
}

impl Terminal<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> Terminal<R> {
    fn read_answer(&mut self, prompt: &str) -> io::Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for an answer",
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead> Operator for Terminal<R> {
    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        let answer = self.read_answer(&format!("{question} [{hint}]: "))?;
        Ok(parse_yes_no(&answer).unwrap_or(default))
    }

    fn ask(&mut self, question: &str, default: &str) -> io::Result<String> {
        self.read_answer(&format!("{question} [{default}]: "))
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// `--yes`: confirm everything, take every default.
pub struct Unattended;

impl Operator for Unattended {
    fn confirm(&mut self, question: &str, _default: bool) -> io::Result<bool> {
        log::info!("{question} -> yes (--yes)");
        Ok(true)
    }

    fn ask(&mut self, _question: &str, _default: &str) -> io::Result<String> {
        Ok(String::new())
    }
}
