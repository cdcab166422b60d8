pub mod contact;
pub mod message;
pub mod user;

pub use contact::Contact;
pub use message::{Message, MessageRecord};
pub use user::UserInfo;
