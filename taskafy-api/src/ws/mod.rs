/// WebSocket chat relay
///
/// - `hub`: in-process registry of live sockets keyed by `{task_id}:{user_id}`
/// - `chat`: the `/ws/chat/{task_id}/{user_id}` upgrade handler and frame loop

pub mod chat;
pub mod hub;

pub use hub::{ChatConnection, ChatHub, ServerFrame};
