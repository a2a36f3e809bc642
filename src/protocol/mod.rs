//! Wire protocol shared by client↔coordinator and coordinator↔node links
//!
//! One request per TCP connection:
//!
//! | Opcode   | Request                   | Response                          |
//! |----------|---------------------------|-----------------------------------|
//! | PING     | -                         | connection closed                 |
//! | LIST     | -                         | count:i32, count × name:string    |
//! | UPLOAD   | name, size:i64, payload   | success:bool                      |
//! | DOWNLOAD | name                      | size:i64 (-1 if absent), payload  |
//! | REMOVE   | name                      | success:bool                      |

pub mod client;
pub mod frame;
pub mod message;
pub mod server;

pub use client::Client;
pub use frame::{CHUNK_SIZE, NOT_FOUND};
pub use message::{Opcode, Request};
