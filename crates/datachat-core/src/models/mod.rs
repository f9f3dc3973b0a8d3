pub mod chat_turn;
pub mod session_state;
pub mod stream_sink;

pub use chat_turn::{ChatTurn, PngImage, Role};
pub use session_state::SessionState;
pub use stream_sink::{SinkStatus, StreamingEventSink};
