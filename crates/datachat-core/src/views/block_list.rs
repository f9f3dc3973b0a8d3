use tracing::warn;

use super::chat_surface::{BlockHandle, BlockKind, ChatSurface};
use crate::models::{PngImage, Role};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockBody {
    Text { kind: BlockKind, content: String },
    Image(PngImage),
    Error(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// `None` for error banners, which sit outside any chat message
    pub role: Option<Role>,
    pub body: BlockBody,
    pub collapsed: bool,
}

/// In-memory chat surface: an ordered list of blocks.
///
/// Front ends draw from this list; handles are indices into it and stay
/// valid until the next `clear`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockList {
    blocks: Vec<Block>,
    /// Bumped on every mutation so front ends can skip redundant redraws
    revision: u64,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, handle: BlockHandle) -> Option<&Block> {
        self.blocks.get(handle.0)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match &b.body {
            BlockBody::Error(message) => Some(message.as_str()),
            _ => None,
        })
    }

    fn push(&mut self, block: Block) -> BlockHandle {
        self.blocks.push(block);
        self.revision += 1;
        BlockHandle(self.blocks.len() - 1)
    }
}

impl ChatSurface for BlockList {
    fn open_block(&mut self, role: Role, kind: BlockKind) -> BlockHandle {
        self.push(Block {
            role: Some(role),
            body: BlockBody::Text {
                kind,
                content: String::new(),
            },
            collapsed: false,
        })
    }

    fn update_block(&mut self, handle: BlockHandle, new_content: &str) {
        match self.blocks.get_mut(handle.0).map(|b| &mut b.body) {
            Some(BlockBody::Text { content, .. }) => {
                content.clear();
                content.push_str(new_content);
                self.revision += 1;
            }
            _ => warn!(handle = handle.0, "update_block called on a missing or non-text block"),
        }
    }

    fn collapse_block(&mut self, handle: BlockHandle) {
        if let Some(block) = self.blocks.get_mut(handle.0) {
            block.collapsed = true;
            self.revision += 1;
        }
    }

    fn render_image(&mut self, role: Role, image: &PngImage) {
        self.push(Block {
            role: Some(role),
            body: BlockBody::Image(image.clone()),
            collapsed: false,
        });
    }

    fn render_error(&mut self, message: &str) {
        self.push(Block {
            role: None,
            body: BlockBody::Error(message.to_string()),
            collapsed: false,
        });
    }

    fn clear(&mut self) {
        self.blocks.clear();
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_overwrites_block_content() {
        let mut list = BlockList::new();
        let handle = list.open_block(Role::Assistant, BlockKind::Markdown);
        list.update_block(handle, "Hel");
        list.update_block(handle, "Hello");

        assert_eq!(list.len(), 1);
        assert_eq!(
            list.get(handle).unwrap().body,
            BlockBody::Text {
                kind: BlockKind::Markdown,
                content: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_errors_are_listed_in_order() {
        let mut list = BlockList::new();
        list.render_error("first");
        list.render_block(Role::User, BlockKind::Text, "hi");
        list.render_error("second");

        assert_eq!(list.errors().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn test_revision_advances_on_mutation() {
        let mut list = BlockList::new();
        let before = list.revision();
        let handle = list.open_block(Role::Assistant, BlockKind::plain_code());
        list.collapse_block(handle);
        assert!(list.revision() > before);
        assert!(list.get(handle).unwrap().collapsed);
    }
}
