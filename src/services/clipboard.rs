use crate::error::{ClockError, ClockResult};

pub trait ClipboardSink {
    fn write(&mut self, text: &str) -> ClockResult<()>;
}

/// The handle is kept for the life of the sink; on X11 the copied text is only
/// served while it exists.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl ClipboardSink for SystemClipboard {
    fn write(&mut self, text: &str) -> ClockResult<()> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(|err| ClockError::Clipboard(err.to_string()))?,
        };
        let result = clipboard
            .set_text(text.to_string())
            .map_err(|err| ClockError::Clipboard(err.to_string()));
        self.inner = Some(clipboard);
        result
    }
}
