use crate::models::{PngImage, Role};

/// Identifies a block previously opened on a surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHandle(pub usize);

/// Kind of content a block holds; decides how the front end draws it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Plain user text
    Text,
    /// Assistant prose, rendered as markdown where the front end can
    Markdown,
    /// Source code with a language hint, optionally inside a collapsible section
    Code {
        language: Option<String>,
        title: Option<String>,
    },
}

impl BlockKind {
    pub fn code(language: &str) -> Self {
        BlockKind::Code {
            language: Some(language.to_string()),
            title: None,
        }
    }

    pub fn plain_code() -> Self {
        BlockKind::Code {
            language: None,
            title: None,
        }
    }

    pub fn collapsible_code(language: Option<&str>, title: &str) -> Self {
        BlockKind::Code {
            language: language.map(str::to_string),
            title: Some(title.to_string()),
        }
    }
}

/// The minimal chat surface the core renders into.
///
/// Blocks are placeholders: they are opened once and later overwritten with
/// their full current content.
pub trait ChatSurface {
    fn open_block(&mut self, role: Role, kind: BlockKind) -> BlockHandle;

    /// Replace the entire content of an open block
    fn update_block(&mut self, handle: BlockHandle, content: &str);

    fn collapse_block(&mut self, handle: BlockHandle);

    fn render_image(&mut self, role: Role, image: &PngImage);

    /// Show an inline error banner
    fn render_error(&mut self, message: &str);

    /// Drop everything drawn so far, ready for a full replay
    fn clear(&mut self);

    /// Open a block and fill it in one step
    fn render_block(&mut self, role: Role, kind: BlockKind, content: &str) -> BlockHandle {
        let handle = self.open_block(role, kind);
        self.update_block(handle, content);
        handle
    }
}
