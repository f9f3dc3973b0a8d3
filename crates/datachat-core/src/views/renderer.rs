use super::chat_surface::{BlockKind, ChatSurface};
use crate::models::{ChatTurn, Role};

/// Replay the full chat history, oldest first.
///
/// Pure with respect to external services: it only draws on the surface.
pub fn render_history(history: &[ChatTurn], surface: &mut dyn ChatSurface) {
    for turn in history {
        render_turn(turn, surface);
    }
}

/// Draw one turn, one block per present field
pub fn render_turn(turn: &ChatTurn, surface: &mut dyn ChatSurface) {
    match turn.role {
        Role::User => {
            if let Some(content) = &turn.content {
                surface.render_block(Role::User, BlockKind::Text, content);
            }
        }
        Role::Assistant => {
            if let Some(content) = &turn.content {
                surface.render_block(Role::Assistant, BlockKind::Markdown, content);
            }
            if let Some(code) = &turn.code {
                surface.render_block(Role::Assistant, BlockKind::code("python"), code);
            }
            if let Some(output) = &turn.output {
                surface.render_block(Role::Assistant, BlockKind::plain_code(), output);
            }
            if let Some(image) = &turn.image {
                surface.render_image(Role::Assistant, image);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PngImage;
    use crate::views::{BlockBody, BlockList};

    fn sample_history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::user("How many rows?"),
            ChatTurn::assistant(
                "There are 42 rows.".into(),
                "len(df)".into(),
                "42".into(),
            ),
            ChatTurn {
                image: Some(PngImage {
                    bytes: vec![1, 2, 3],
                    width: 1,
                    height: 1,
                }),
                ..ChatTurn::assistant(String::new(), String::new(), String::new())
            },
        ]
    }

    #[test]
    fn test_replay_is_idempotent() {
        let history = sample_history();

        let mut first = BlockList::new();
        render_history(&history, &mut first);
        let mut second = BlockList::new();
        render_history(&history, &mut second);

        assert_eq!(first.blocks(), second.blocks());

        second.clear();
        render_history(&history, &mut second);
        assert_eq!(first.blocks(), second.blocks());
    }

    #[test]
    fn test_each_present_field_gets_a_block() {
        let mut list = BlockList::new();
        render_history(&sample_history(), &mut list);

        let kinds: Vec<_> = list
            .blocks()
            .iter()
            .map(|b| match &b.body {
                BlockBody::Text { kind, .. } => format!("{:?}", kind),
                BlockBody::Image(_) => "Image".to_string(),
                BlockBody::Error(_) => "Error".to_string(),
            })
            .collect();

        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds[0], "Text");
        assert_eq!(kinds[1], "Markdown");
        assert!(kinds[2].contains("python"));
        assert_eq!(kinds[4], "Image");
    }

    #[test]
    fn test_empty_history_renders_nothing() {
        let mut list = BlockList::new();
        render_history(&[], &mut list);
        assert!(list.is_empty());
    }
}
