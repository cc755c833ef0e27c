use std::fmt;

/// One complete line pulled out of the transport stream, without its `\n`
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.0)
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(u8::is_ascii_whitespace)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Frame {
    fn from(line: &str) -> Self {
        Frame(line.as_bytes().to_vec())
    }
}

/// Splits an arbitrarily fragmented byte stream into newline-terminated frames
///
/// Whatever follows the last `\n` is held back until a later chunk completes it
/// or [`LineFrameBuffer::flush`] is called at end of stream. Splitting happens on
/// the raw `\n` byte, so a UTF-8 character cut in half by the transport is
/// reassembled before anyone decodes it.
#[derive(Debug, Default)]
pub struct LineFrameBuffer {
    leftover: Vec<u8>,
}

impl LineFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order
    pub fn append_chunk(&mut self, chunk: impl AsRef<[u8]>) -> Vec<Frame> {
        self.leftover.extend_from_slice(chunk.as_ref());

        let Some(last_newline) = self.leftover.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let tail = self.leftover.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.leftover, tail);

        // `complete` ends with '\n', so the final split segment is always empty
        let mut segments: Vec<&[u8]> = complete.split(|&b| b == b'\n').collect();
        segments.pop();

        segments
            .into_iter()
            .map(|segment| Frame(segment.to_vec()))
            .collect()
    }

    /// Emits the unterminated trailing line, if any, at end of stream
    pub fn flush(&mut self) -> Option<Frame> {
        if self.leftover.is_empty() {
            return None;
        }
        Some(Frame(std::mem::take(&mut self.leftover)))
    }

    /// Bytes held back waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.leftover.len()
    }
}
