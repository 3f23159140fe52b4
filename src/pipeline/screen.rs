//! Screen - Terminal setup, teardown and repaint.

use std::io::{self, Write};

use crossterm::{cursor, queue, terminal};

use super::config::RenderMode;

/// Paint target for the host.
pub struct Screen {
    out: Box<dyn Write>,
    mode: RenderMode,
    /// Whether this screen owns the terminal (raw mode, cursor, alt screen).
    interactive: bool,
    entered: bool,
    /// Lines painted last time, for inline rewrites.
    painted_lines: u16,
    paints: u64,
}

impl Screen {
    /// Screen over stdout that takes over the terminal on `enter`.
    pub fn terminal(mode: RenderMode) -> Self {
        Self::new(Box::new(io::stdout()), mode, true)
    }

    /// Screen over any writer. No terminal modes are touched.
    pub fn headless(out: impl Write + 'static, mode: RenderMode) -> Self {
        Self::new(Box::new(out), mode, false)
    }

    fn new(out: Box<dyn Write>, mode: RenderMode, interactive: bool) -> Self {
        Self {
            out,
            mode,
            interactive,
            entered: false,
            painted_lines: 0,
            paints: 0,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Number of repaints so far.
    pub fn paints(&self) -> u64 {
        self.paints
    }

    pub fn enter(&mut self) -> io::Result<()> {
        if self.entered {
            return Ok(());
        }
        if self.interactive {
            terminal::enable_raw_mode()?;
            if self.mode == RenderMode::Fullscreen {
                queue!(self.out, terminal::EnterAlternateScreen)?;
            }
            queue!(self.out, cursor::Hide)?;
            self.out.flush()?;
        }
        self.entered = true;
        Ok(())
    }

    /// Replace what was painted before with `text`.
    pub fn paint(&mut self, text: &str) -> io::Result<()> {
        if self.interactive {
            match self.mode {
                RenderMode::Fullscreen => {
                    queue!(
                        self.out,
                        cursor::MoveTo(0, 0),
                        terminal::Clear(terminal::ClearType::All)
                    )?;
                }
                RenderMode::Inline => {
                    queue!(self.out, cursor::MoveToColumn(0))?;
                    if self.painted_lines > 1 {
                        queue!(self.out, cursor::MoveUp(self.painted_lines - 1))?;
                    }
                    queue!(self.out, terminal::Clear(terminal::ClearType::FromCursorDown))?;
                }
            }
        }

        // Raw mode needs explicit carriage returns
        let separator = if self.interactive { "\r\n" } else { "\n" };
        let mut lines = 0u16;
        for (index, line) in text.lines().enumerate() {
            if index > 0 {
                self.out.write_all(separator.as_bytes())?;
            }
            self.out.write_all(line.as_bytes())?;
            lines = lines.saturating_add(1);
        }
        if !self.interactive {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;

        self.painted_lines = lines.max(1);
        self.paints += 1;
        Ok(())
    }

    pub fn exit(&mut self) -> io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        if self.interactive {
            queue!(self.out, cursor::Show)?;
            match self.mode {
                RenderMode::Fullscreen => queue!(self.out, terminal::LeaveAlternateScreen)?,
                RenderMode::Inline => self.out.write_all(b"\r\n")?,
            }
            self.out.flush()?;
            terminal::disable_raw_mode()?;
        }
        Ok(())
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        // Best effort
        let _ = self.exit();
    }
}
