use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info, warn};

use crate::clipboard::ClipboardSource;
use crate::offsets::HighlightSpan;
use crate::reveal::{ResetOutcome, RevealEngine, RevealError};
use crate::runtime::{AppEvent, ChannelObserver};
use crate::settings::{parse_hex_color, Settings, SettingsStore};
use crate::text::{normalize, tokenize};

pub const MIN_SPEED: f64 = 1.0;
pub const MAX_SPEED: f64 = 15.0;
pub const FINE_SPEED_STEP: f64 = 0.1;
pub const COARSE_SPEED_STEP: f64 = 1.0;
pub const EMPTY_CLIPBOARD_MESSAGE: &str = "No text found in clipboard!";

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Reading,
    /// Editing a `#RRGGBB` highlight colour
    ColorPrompt(String),
}

/// Presentation state for one reader window.
pub struct App {
    pub engine: RevealEngine,
    pub settings: Settings,
    pub text: String,
    pub label: String,
    pub highlight: Option<HighlightSpan>,
    pub mode: InputMode,
    pub status: Option<String>,
    /// Speed given on the command line, never written to the settings file.
    session_speed: Option<f64>,
    active_session: Option<u64>,
    store: Box<dyn SettingsStore>,
    clipboard: Box<dyn ClipboardSource>,
    events: Sender<AppEvent>,
}

impl App {
    pub fn new(
        store: Box<dyn SettingsStore>,
        clipboard: Box<dyn ClipboardSource>,
        events: Sender<AppEvent>,
    ) -> Self {
        let settings = store.load();
        let engine = RevealEngine::new();
        if let Err(e) = engine.set_speed(settings.speed) {
            warn!("ignoring stored speed: {e}");
        }
        Self {
            engine,
            settings,
            text: String::new(),
            label: String::new(),
            highlight: None,
            mode: InputMode::Reading,
            status: None,
            session_speed: None,
            active_session: None,
            store,
            clipboard,
            events,
        }
    }

    /// Use `speed` for this run without writing it to the settings file.
    pub fn override_speed(&mut self, speed: f64) -> Result<(), RevealError> {
        self.engine.set_speed(speed)?;
        self.session_speed = Some(speed);
        Ok(())
    }

    /// Speed in effect: the run override if any, else the saved one.
    pub fn speed(&self) -> f64 {
        self.session_speed.unwrap_or(self.settings.speed)
    }

    pub fn speed_label(&self) -> String {
        let speed = self.speed();
        format!(
            "{:.2} words per second / {:.2} seconds per word",
            speed,
            1.0 / speed
        )
    }

    /// Read the clipboard and begin revealing it.
    pub fn start_reveal(&mut self) {
        if self.engine.is_running() {
            debug!("start ignored, reveal in progress");
            return;
        }

        let normalized = normalize(&self.clipboard.paste());
        let words = tokenize(&normalized);
        if words.is_empty() {
            self.label = EMPTY_CLIPBOARD_MESSAGE.to_string();
            return;
        }

        self.text = normalized;
        self.label.clear();
        self.highlight = None;
        self.status = None;

        let observer = ChannelObserver::new(self.events.clone());
        match self.engine.start(words, self.speed(), observer) {
            Ok(handle) => {
                info!(session = handle.id(), "reading started");
                self.active_session = Some(handle.id());
            }
            Err(e) => self.label = e.to_string(),
        }
    }

    /// Pause on the first press, clear everything on the second.
    pub fn stop(&mut self) {
        let outcome = self.engine.request_reset(|| {
            self.label.clear();
            self.text.clear();
            self.highlight = None;
        });
        match outcome {
            ResetOutcome::Paused => {
                self.status = Some("Paused. Stop again to clear".to_string());
            }
            ResetOutcome::Cleared => {
                self.active_session = None;
                self.status = None;
            }
        }
    }

    pub fn adjust_speed(&mut self, delta: f64) {
        let speed = (self.speed() + delta).clamp(MIN_SPEED, MAX_SPEED);
        let speed = (speed * 100.0).round() / 100.0;
        if let Err(e) = self.engine.set_speed(speed) {
            warn!("rejected speed change: {e}");
            return;
        }
        self.session_speed = None;
        self.settings.speed = speed;
        self.persist();
    }

    pub fn open_color_prompt(&mut self) {
        self.mode = InputMode::ColorPrompt(self.settings.highlight_color.clone());
    }

    /// Result of the colour chooser. `None` means it was dismissed.
    pub fn apply_color(&mut self, choice: Option<String>) {
        self.mode = InputMode::Reading;
        let Some(choice) = choice else {
            return;
        };
        match parse_hex_color(&choice) {
            Some((r, g, b)) => {
                self.settings.highlight_color = format!("#{r:02X}{g:02X}{b:02X}");
                self.persist();
            }
            None => self.status = Some(format!("'{choice}' is not a #RRGGBB colour")),
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.settings) {
            warn!("could not save settings: {e}");
            self.status = Some(format!("Could not save settings: {e}"));
        }
    }

    /// Apply one event. Returns false when the app should quit.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Tick | AppEvent::Resize => true,
            AppEvent::Step(step) => {
                if self.active_session == Some(step.session) {
                    self.label = step.word;
                    self.highlight = Some(step.span);
                }
                true
            }
            AppEvent::Complete(session) => {
                if self.active_session == Some(session) {
                    self.highlight = None;
                    self.status = Some("Finished. Press s to read the clipboard again".to_string());
                }
                true
            }
            AppEvent::Key(key) => self.handle_key(key),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        // some platforms also report releases
        if key.kind != KeyEventKind::Press {
            return true;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return false;
        }

        if let InputMode::ColorPrompt(buffer) = &mut self.mode {
            match key.code {
                KeyCode::Esc => self.apply_color(None),
                KeyCode::Enter => {
                    let choice = std::mem::take(buffer);
                    self.apply_color(Some(choice));
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) if buffer.chars().count() < 7 => buffer.push(c),
                _ => {}
            }
            return true;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return false,
            KeyCode::Enter | KeyCode::Char('s') => self.start_reveal(),
            KeyCode::Char(' ') | KeyCode::Char('x') => self.stop(),
            KeyCode::Up => self.adjust_speed(FINE_SPEED_STEP),
            KeyCode::Down => self.adjust_speed(-FINE_SPEED_STEP),
            KeyCode::Right => self.adjust_speed(COARSE_SPEED_STEP),
            KeyCode::Left => self.adjust_speed(-COARSE_SPEED_STEP),
            KeyCode::Char('c') => self.open_color_prompt(),
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::StaticText;
    use crate::runtime::{AppEventSource, TestEventSource};
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct MemoryStore {
        saved: Arc<Mutex<Vec<Settings>>>,
        fail: bool,
    }

    impl SettingsStore for MemoryStore {
        fn load(&self) -> Settings {
            Settings::default()
        }

        fn save(&self, settings: &Settings) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.saved.lock().unwrap().push(settings.clone());
            Ok(())
        }
    }

    fn app_with(text: &str, store: MemoryStore) -> (App, TestEventSource) {
        let source = TestEventSource::new();
        let app = App::new(
            Box::new(store),
            Box::new(StaticText::new(text)),
            source.sender(),
        );
        (app, source)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_empty_clipboard_reports_message() {
        let (mut app, _source) = app_with("  \n\t ", MemoryStore::default());
        app.start_reveal();
        assert_eq!(app.label, EMPTY_CLIPBOARD_MESSAGE);
        assert!(app.text.is_empty());
        assert!(!app.engine.is_running());
    }

    #[test]
    fn test_start_displays_normalized_text_and_steps() {
        let (mut app, source) = app_with("Hello   world\n\nfoo bar", MemoryStore::default());
        app.start_reveal();
        assert_eq!(app.text, "Hello world\nfoo bar");

        let event = source.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(app.handle_event(event));
        assert_eq!(app.label, "Hello");
        assert_eq!(app.highlight, Some(HighlightSpan::new(0, 5)));
    }

    #[test]
    fn test_stop_twice_clears_display() {
        let (mut app, source) = app_with("one two three", MemoryStore::default());
        app.start_reveal();
        let event = source.recv_timeout(Duration::from_secs(5)).unwrap();
        app.handle_event(event);

        app.handle_event(key(KeyCode::Char('x')));
        assert_eq!(app.label, "one");
        assert!(app.status.is_some());

        app.handle_event(key(KeyCode::Char('x')));
        assert!(app.label.is_empty());
        assert!(app.text.is_empty());
        assert_eq!(app.highlight, None);
        assert_eq!(app.engine.current_index(), 0);
    }

    #[test]
    fn test_steps_from_cleared_session_are_ignored() {
        let (mut app, source) = app_with("one two", MemoryStore::default());
        app.start_reveal();
        let stale = source.recv_timeout(Duration::from_secs(5)).unwrap();
        app.stop();
        app.stop();
        app.handle_event(stale);
        assert!(app.label.is_empty());
    }

    #[test]
    fn test_speed_keys_clamp_and_persist() {
        let store = MemoryStore::default();
        let (mut app, _source) = app_with("", store.clone());

        app.handle_event(key(KeyCode::Up));
        assert_eq!(app.settings.speed, 4.8);
        assert_eq!(app.engine.speed(), 4.8);

        for _ in 0..20 {
            app.handle_event(key(KeyCode::Right));
        }
        assert_eq!(app.settings.speed, MAX_SPEED);

        for _ in 0..20 {
            app.handle_event(key(KeyCode::Left));
        }
        assert_eq!(app.settings.speed, MIN_SPEED);

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 41);
        assert_eq!(saved.last().unwrap().speed, MIN_SPEED);
    }

    #[test]
    fn test_speed_label() {
        let (app, _source) = app_with("", MemoryStore::default());
        assert_eq!(
            app.speed_label(),
            "4.70 words per second / 0.21 seconds per word"
        );
    }

    #[test]
    fn test_failed_save_keeps_settings_in_memory() {
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let (mut app, _source) = app_with("", store);
        app.adjust_speed(1.0);
        assert_eq!(app.settings.speed, 5.7);
        assert!(app.status.as_deref().unwrap().contains("Could not save"));
    }

    #[test]
    fn test_color_prompt_applies_hex() {
        let store = MemoryStore::default();
        let (mut app, _source) = app_with("", store.clone());

        app.handle_event(key(KeyCode::Char('c')));
        assert_eq!(app.mode, InputMode::ColorPrompt("#AD0321".into()));
        for _ in 0..6 {
            app.handle_event(key(KeyCode::Backspace));
        }
        for c in "00ff00".chars() {
            app.handle_event(key(KeyCode::Char(c)));
        }
        app.handle_event(key(KeyCode::Enter));

        assert_eq!(app.mode, InputMode::Reading);
        assert_eq!(app.settings.highlight_color, "#00FF00");
        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_color_prompt_escape_keeps_color() {
        let (mut app, _source) = app_with("", MemoryStore::default());
        app.open_color_prompt();
        app.handle_event(key(KeyCode::Char('z')));
        app.handle_event(key(KeyCode::Esc));
        assert_eq!(app.mode, InputMode::Reading);
        assert_eq!(app.settings.highlight_color, "#AD0321");
    }

    #[test]
    fn test_invalid_color_sets_status() {
        let (mut app, _source) = app_with("", MemoryStore::default());
        app.apply_color(Some("blue".into()));
        assert_eq!(app.settings.highlight_color, "#AD0321");
        assert!(app.status.is_some());
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _source) = app_with("", MemoryStore::default());
        assert!(!app.handle_event(key(KeyCode::Char('q'))));
        assert!(!app.handle_event(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        ))));
    }

    #[test]
    fn test_speed_override_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let source = TestEventSource::new();
        let mut app = App::new(
            Box::new(crate::settings::FileSettingsStore::with_path(&path)),
            Box::new(StaticText::default()),
            source.sender(),
        );

        app.override_speed(12.0).unwrap();
        assert_eq!(app.speed(), 12.0);
        assert_eq!(app.engine.speed(), 12.0);
        assert!(app.speed_label().starts_with("12.00 words per second"));

        app.apply_color(Some("#00FF00".into()));
        let reloaded = crate::settings::FileSettingsStore::with_path(&path).load();
        assert_eq!(reloaded.highlight_color, "#00FF00");
        assert_eq!(reloaded.speed, crate::settings::DEFAULT_SPEED);

        // adjusting from the override saves the adjusted value
        app.adjust_speed(1.0);
        assert_eq!(app.speed(), 13.0);
        let reloaded = crate::settings::FileSettingsStore::with_path(&path).load();
        assert_eq!(reloaded.speed, 13.0);
    }
}
