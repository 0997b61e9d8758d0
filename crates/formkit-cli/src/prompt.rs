//! Line-oriented terminal prompts

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

/// Reads answers line by line and writes prompts
pub(crate) struct Prompter<R, W> {
    lines: Lines<R>,
    out: W,
}

impl Prompter<BufReader<Stdin>, Stdout> {
    /// Prompt on the process terminal
    pub(crate) fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    /// Print one line
    pub(crate) async fn say(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    /// Ask for one trimmed line; `None` at end of input
    pub(crate) async fn ask(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        self.out.write_all(prompt.as_bytes()).await?;
        self.out.flush().await?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    #[cfg(test)]
    pub(crate) fn into_output(self) -> W {
        self.out
    }
}
