pub mod block_list;
pub mod chat_surface;
pub mod renderer;

pub use block_list::{Block, BlockBody, BlockList};
pub use chat_surface::{BlockHandle, BlockKind, ChatSurface};
pub use renderer::{render_history, render_turn};
