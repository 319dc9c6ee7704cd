//! Interactive prompts and browser launching for first-run setup.

use std::io::{self, BufRead, Stderr, StdinLock, Write};
use std::process::Command;

use tracing::warn;

/// Line-oriented console used by the first-run flows.
///
/// Prompts are written to `output` so that stdout stays reserved for links.
pub struct Console<R, W> {
    input: R,
    output: W,
    launch_browser: bool,
}

impl Console<StdinLock<'static>, Stderr> {
    /// Console on the process stdin/stderr that opens URLs in the default browser.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr(), true)
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, launch_browser: bool) -> Self {
        Self {
            input,
            output,
            launch_browser,
        }
    }

    /// Print a line of instructions.
    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    /// Ask a question and read one trimmed line. Returns `None` at end of input.
    pub fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Open `url` in the default browser. Failure is logged, never fatal.
    pub fn open_url(&self, url: &str) {
        if !self.launch_browser {
            return;
        }
        if let Err(e) = open_browser(url) {
            warn!("Couldn't open a browser: {}", e);
        }
    }

    /// Consume the console and hand back the output sink.
    pub fn into_output(self) -> W {
        self.output
    }
}

fn open_browser(url: &str) -> io::Result<()> {
    #[cfg(target_os = "windows")]
    {
        Command::new("rundll32.exe")
            .args(["url.dll,FileProtocolHandler", url])
            .spawn()?;
        return Ok(());
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn()?;
        return Ok(());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Command::new("xdg-open").arg(url).spawn()?;
        return Ok(());
    }

    #[allow(unreachable_code)]
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "browser open is unsupported on this platform",
    ))
}
