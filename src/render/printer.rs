//! Line output with width trimming and broken-pipe tolerance.

use log::debug;
use std::borrow::Cow;
use std::io::{self, ErrorKind, Write};

/// Writes report lines, going quiet once the reader hangs up.
///
/// A closed downstream pipe (`stall-analyser log | head`) is the normal
/// end of an interactive session, so `BrokenPipe` is swallowed and every
/// later write becomes a no-op. Other I/O errors are returned.
pub struct Printer<W: Write> {
    out: W,
    width: usize,
    closed: bool,
}

impl<W: Write> Printer<W> {
    /// `width` of 0 disables trimming
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Print one line, trimmed to the display width
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        let text = smart_trim(text, self.width);
        let result = writeln!(self.out, "{}", text);
        self.absorb(result)
    }

    pub fn blank(&mut self) -> io::Result<()> {
        self.line("")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.out.flush();
        self.absorb(result)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn absorb(&mut self, result: io::Result<()>) -> io::Result<()> {
        match result {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("Output closed by reader, suppressing further output");
                self.closed = true;
                Ok(())
            }
            other => other,
        }
    }
}

/// Shorten `line` to `width` characters.
///
/// A trailing `" at <file:line>"` location is kept intact and the text
/// before it is cut and marked with `...`. Lines without a location are
/// simply truncated. A width of 0 disables trimming.
pub fn smart_trim(line: &str, width: usize) -> Cow<'_, str> {
    if width == 0 || line.chars().count() <= width {
        return Cow::Borrowed(line);
    }

    let Some(at) = line.rfind(" at ") else {
        return Cow::Owned(line.chars().take(width).collect());
    };

    let suffix = &line[at..];
    let room = width.saturating_sub(suffix.chars().count() + 3);
    let prefix: String = line.chars().take(room).collect();
    Cow::Owned(format!("{}...{}", prefix, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_trim_keeps_location() {
        let line = "seastar::reactor::run_some_tasks() at core/reactor.cc:2339";
        assert_eq!(smart_trim(line, 30), "sea... at core/reactor.cc:2339");
        assert_eq!(smart_trim(line, 40), "seastar::reac... at core/reactor.cc:2339");
        assert_eq!(smart_trim(line, 20), "... at core/reactor.cc:2339");
    }

    #[test]
    fn test_trim_without_location_truncates() {
        assert_eq!(smart_trim("abcdefghij", 4), "abcd");
    }

    #[test]
    fn test_trim_disabled_or_short() {
        assert_eq!(smart_trim("abcdef", 0), "abcdef");
        assert_eq!(smart_trim("abc", 10), "abc");
    }

    #[test]
    fn test_broken_pipe_silences_printer() {
        let mut printer = Printer::new(ClosedPipe, 0);
        assert!(printer.line("first").is_ok());
        assert!(printer.is_closed());
        assert!(printer.line("second").is_ok());
        assert!(printer.flush().is_ok());
    }
}
