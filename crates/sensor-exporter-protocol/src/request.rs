//! HTTP request boundary detection.
//!
//! The exporter serves a single fixed resource, so it never parses the request
//! line or headers. A request is complete once two line feeds arrive with
//! nothing but carriage returns between them: the end of the last header line
//! followed by the blank separator line.

const LINE_FEED: u8 = b'\n';
const CARRIAGE_RETURN: u8 = b'\r';

/// Number of consecutive line feeds that terminate a request.
const TERMINATOR_COUNT: u8 = 2;

/// Counts consecutive line terminators across arbitrarily split chunks.
#[derive(Debug, Clone, Default)]
pub struct RequestDetector {
    newlines: u8,
}

impl RequestDetector {
    pub const fn new() -> Self {
        Self { newlines: 0 }
    }

    /// Forget everything seen so far. Called for every new connection.
    pub fn reset(&mut self) {
        self.newlines = 0;
    }

    /// Consecutive line feeds seen since the last content byte.
    pub fn pending_newlines(&self) -> u8 {
        self.newlines
    }

    /// Feed one byte. Returns `true` when it completes the request.
    ///
    /// The detector resets itself on completion, ready for the next request.
    pub fn push(&mut self, byte: u8) -> bool {
        match byte {
            LINE_FEED => {
                self.newlines += 1;
                if self.newlines == TERMINATOR_COUNT {
                    self.newlines = 0;
                    return true;
                }
            }
            CARRIAGE_RETURN => {}
            _ => self.newlines = 0,
        }
        false
    }

    /// Feed a chunk as delivered by the transport.
    ///
    /// Returns the number of bytes consumed up to and including the byte that
    /// completed the request, or `None` if the chunk did not complete it.
    /// Bytes after the completion point are left to the caller.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<usize> {
        chunk
            .iter()
            .position(|&byte| self.push(byte))
            .map(|index| index + 1)
    }
}
