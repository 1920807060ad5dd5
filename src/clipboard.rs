use arboard::Clipboard;
use tracing::warn;

/// Where the text to read comes from.
pub trait ClipboardSource {
    /// Current text, or an empty string when there is none.
    fn paste(&mut self) -> String;
}

/// The system clipboard. The handle is opened lazily and reopened after errors.
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSource for SystemClipboard {
    fn paste(&mut self) -> String {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(c) => self.clipboard = Some(c),
                Err(e) => {
                    warn!("clipboard unavailable: {e}");
                    return String::new();
                }
            }
        }
        let Some(clipboard) = &mut self.clipboard else {
            return String::new();
        };
        match clipboard.get_text() {
            Ok(text) => text,
            Err(arboard::Error::ContentNotAvailable) => String::new(),
            Err(e) => {
                warn!("reading clipboard failed: {e}");
                self.clipboard = None;
                String::new()
            }
        }
    }
}

/// Fixed text, used for `--text` and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticText(pub String);

impl StaticText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl ClipboardSource for StaticText {
    fn paste(&mut self) -> String {
        self.0.clone()
    }
}
