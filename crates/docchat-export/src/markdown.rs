// Plain-text rendering of the conversation
//
// Last line of defense for export: a structured markdown transcript that
// cannot fail. Also useful on its own for users who prefer text.

use docchat_core::message::{ChatMessage, Role};

use crate::ExportOptions;

/// Render the conversation log as a markdown transcript
pub fn export_chat_to_markdown(messages: &[ChatMessage], options: &ExportOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", options.title));
    out.push_str(&format!(
        "Date: {}\n\n---\n\n",
        options.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    for message in messages {
        let heading = match message.role {
            Role::User => "## You",
            Role::Assistant => "## Assistant",
        };
        out.push_str(heading);
        out.push_str("\n\n");
        out.push_str(message.content.trim_end());
        out.push_str("\n\n");
    }

    out
}
