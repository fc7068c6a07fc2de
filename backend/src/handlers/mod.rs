pub mod characters;
pub mod chat;
pub mod messages;
pub mod sessions;

pub use characters::*;
pub use chat::*;
pub use messages::*;
pub use sessions::*;
