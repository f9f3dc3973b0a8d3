use std::collections::HashMap;
use std::path::PathBuf;

use datachat_core::views::{BlockHandle, BlockKind, BlockList, ChatSurface};
use datachat_core::{PngImage, Role};
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::widgets::Block;
use tracing::{debug, warn};
use tui_textarea::TextArea;
use uuid::Uuid;

use crate::ui::{self, Screen};

const INPUT_PLACEHOLDER: &str = "Enter your question about the data";

/// A [`ChatSurface`] that keeps a [`BlockList`] and repaints the terminal
/// after every change, so streamed deltas show up as they arrive.
pub struct TerminalSurface<'t, B: Backend> {
    terminal: &'t mut Terminal<B>,
    blocks: BlockList,
    pub input: TextArea<'static>,
    title: String,
    image_dir: PathBuf,
    image_paths: HashMap<BlockHandle, PathBuf>,
    scroll_from_bottom: usize,
    busy: bool,
}

impl<'t, B: Backend> TerminalSurface<'t, B> {
    pub fn new(terminal: &'t mut Terminal<B>, title: String, image_dir: PathBuf) -> Self {
        Self {
            terminal,
            blocks: BlockList::new(),
            input: new_input(),
            title,
            image_dir,
            image_paths: HashMap::new(),
            scroll_from_bottom: 0,
            busy: false,
        }
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        self.redraw();
    }

    /// Take the typed text and reset the input box
    pub fn take_input(&mut self) -> String {
        let text = self.input.lines().join("\n");
        self.input = new_input();
        text
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(rows);
        self.redraw();
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(rows);
        self.redraw();
    }

    #[cfg(test)]
    pub fn scroll_from_bottom(&self) -> usize {
        self.scroll_from_bottom
    }

    pub fn redraw(&mut self) {
        let screen = Screen {
            title: &self.title,
            blocks: self.blocks.blocks(),
            image_paths: &self.image_paths,
            input: &self.input,
            busy: self.busy,
            scroll_from_bottom: self.scroll_from_bottom,
        };
        if let Err(e) = self.terminal.draw(|frame| ui::draw(frame, &screen)) {
            warn!(error = %e, "Failed to draw terminal");
        }
    }

    fn save_image(&self, image: &PngImage) -> Option<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.image_dir) {
            warn!(error = %e, dir = %self.image_dir.display(), "Failed to create image directory");
            return None;
        }
        let path = self.image_dir.join(format!("{}.png", Uuid::new_v4()));
        match std::fs::write(&path, &image.bytes) {
            Ok(()) => {
                debug!(path = %path.display(), "Saved generated chart");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to save generated chart");
                None
            }
        }
    }
}

fn new_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_placeholder_text(INPUT_PLACEHOLDER);
    input.set_block(Block::bordered());
    input
}

impl<B: Backend> ChatSurface for TerminalSurface<'_, B> {
    fn open_block(&mut self, role: Role, kind: BlockKind) -> BlockHandle {
        let handle = self.blocks.open_block(role, kind);
        self.redraw();
        handle
    }

    fn update_block(&mut self, handle: BlockHandle, content: &str) {
        self.blocks.update_block(handle, content);
        self.redraw();
    }

    fn collapse_block(&mut self, handle: BlockHandle) {
        self.blocks.collapse_block(handle);
        self.redraw();
    }

    fn render_image(&mut self, role: Role, image: &PngImage) {
        let saved = self.save_image(image);
        self.blocks.render_image(role, image);
        if let Some(path) = saved {
            self.image_paths
                .insert(BlockHandle(self.blocks.len() - 1), path);
        }
        self.redraw();
    }

    fn render_error(&mut self, message: &str) {
        self.blocks.render_error(message);
        self.redraw();
    }

    fn clear(&mut self) {
        self.blocks.clear();
        self.image_paths.clear();
        self.scroll_from_bottom = 0;
        self.redraw();
    }
}
