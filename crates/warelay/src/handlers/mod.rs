//! HTTP request handlers.

mod health;
mod qr;
mod send;
mod status;

pub use health::{index, ping};
pub use qr::qr_page;
pub use send::send_message;
pub use status::status;
