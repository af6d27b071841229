use crate::context::ServerContext;
use crate::text::TextContainer;

/// Anything able to issue commands: the console, a connected player, a script.
///
/// The dispatcher only relies on this capability set and never on a concrete
/// sender type.
pub trait CommandSender {
    fn name(&self) -> &str;

    fn is_player(&self) -> bool;

    fn has_permission(&self, permission: &str) -> bool;

    fn send_message(&self, message: &str);

    /// Sends a templated message. The default renders it and forwards the
    /// result to [`send_message`](Self::send_message).
    fn send_text(&self, message: &TextContainer) {
        self.send_message(&message.render());
    }

    /// The server this sender belongs to.
    fn server(&self) -> &ServerContext;
}
