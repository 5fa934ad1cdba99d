//! Trace output sinks.

use std::io::{self, Write};

/// Ordered, append-only destination for trace text.
///
/// Text is bytes: guest strings are copied verbatim and need not be UTF-8.
/// Appending cannot fail from the tracer's point of view; sinks backed by
/// fallible I/O hold on to the first error and report it when finished.
pub trait LogSink {
    /// Append one chunk of trace output.
    fn write_trace(&mut self, text: &[u8]);
}

impl LogSink for Vec<u8> {
    fn write_trace(&mut self, text: &[u8]) {
        self.extend_from_slice(text);
    }
}

// Invalid UTF-8 is replaced.
impl LogSink for String {
    fn write_trace(&mut self, text: &[u8]) {
        self.push_str(&String::from_utf8_lossy(text));
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn write_trace(&mut self, text: &[u8]) {
        (**self).write_trace(text);
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn write_trace(&mut self, text: &[u8]) {
        (**self).write_trace(text);
    }
}

/// Sink over any [`io::Write`].
///
/// After the first write error further output is dropped; the error is
/// returned by [`WriterSink::finish`].
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> WriterSink<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Whether a write has failed.
    pub const fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Flush and return the writer.
    ///
    /// # Errors
    ///
    /// Returns the first write error, or the flush error.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> LogSink for WriterSink<W> {
    fn write_trace(&mut self, text: &[u8]) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_all(text) {
            self.error = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_vec_sink_is_verbatim() {
        let mut sink = Vec::new();
        sink.write_trace(b"a\xff");
        sink.write_trace(b"b");
        assert_eq!(sink, b"a\xffb");
    }

    #[test]
    fn test_string_sink_lossy() {
        let mut sink = String::new();
        sink.write_trace(b"ok\xff");
        assert_eq!(sink, "ok\u{fffd}");
    }

    #[test]
    fn test_writer_sink() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_trace(b"malloc(16)");
        sink.write_trace(b" = 0x5555\n");
        assert!(!sink.has_failed());
        assert_eq!(sink.finish().unwrap(), b"malloc(16) = 0x5555\n");
    }

    #[test]
    fn test_writer_sink_keeps_first_error() {
        let mut sink = WriterSink::new(FailingWriter);
        sink.write_trace(b"x");
        sink.write_trace(b"y");
        assert!(sink.has_failed());
        let err = sink.finish().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
