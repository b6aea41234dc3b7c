use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The device could not be opened; acquisition never starts.
    #[error("source {port} unavailable: {reason}")]
    Unavailable { port: String, reason: String },
    /// The device failed while running; acquisition stops.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that yields newline-delimited frames.
pub trait FrameSource: Send {
    /// Return the next complete line (without its terminator) if one is
    /// available. Must not block longer than the source's own read
    /// timeout; `Ok(None)` means "nothing yet".
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SourceError>;

    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        (**self).poll_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
