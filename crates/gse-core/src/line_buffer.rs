use log::warn;

/// Longest unterminated run kept before it is thrown away.
pub const MAX_LINE_LEN: usize = 4096;

/// Reassembles newline-terminated frames from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    discarded: u64,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(256),
            discarded: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_LINE_LEN && !self.pending.contains(&b'\n') {
            warn!(
                "discarding {} bytes without a line terminator",
                self.pending.len()
            );
            self.pending.clear();
            self.discarded += 1;
        }
    }

    /// Pop the next complete line, without the trailing `\n`.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        Some(line)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of oversized runs thrown away so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
