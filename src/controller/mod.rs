pub use facade::Controller;
pub(self) use replay::*;

use crate::chat::ServerMessage;
use crate::server::Calls;

mod facade;
mod replay;

async fn announce(server: &dyn Calls, message: ServerMessage<'_>) {
    let message_str = message.to_string();
    if message_str.is_empty() {
        return;
    }
    log::debug!("server msg> {}", &message_str);
    server.chat_send(&message_str).await;
}
