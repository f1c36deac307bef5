//! TUI application state.

/// Single-line input editor state.
///
/// `cursor` is a byte offset that always sits on a char boundary.
#[derive(Debug, Default)]
pub struct InputState {
    pub buffer: String,
    pub cursor: usize,
}

impl InputState {
    pub fn insert(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some((offset, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.buffer.remove(offset);
            self.cursor = offset;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some((offset, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.cursor = offset;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.buffer[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Takes the buffer, leaving the editor empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }
}

/// Top-level TUI state.
pub struct AppState {
    pub should_quit: bool,
    pub input: InputState,
    /// Transcript scroll position, measured in lines up from the bottom.
    /// Zero means pinned to the newest output.
    pub scroll_from_bottom: usize,
    /// Viewport height of the transcript area, set during render.
    pub viewport_height: usize,
    /// Header labels, fixed at startup.
    pub provider_label: String,
    pub model: String,
}

impl AppState {
    pub fn new(provider_label: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            input: InputState::default(),
            scroll_from_bottom: 0,
            viewport_height: 0,
            provider_label: provider_label.into(),
            model: model.into(),
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn page(&self) -> usize {
        self.viewport_height.max(1)
    }
}
