//! Data model shared by every part of the chat client.
//!
//! This crate defines what a message, a conversation and the archive look
//! like, both in memory and on the wire, together with the [`Backend`]
//! capability that turns one user turn into an assistant reply.
//!
//! Types in this crate carry no session logic. Keeping the display list,
//! the sanitized history and the archive consistent is the job of the
//! core crate; this crate only guarantees the shapes and the small
//! invariants that hold for a single value (e.g. a title never changes
//! once derived).

#![deny(missing_docs)]

mod backend;
mod conversation;
mod error;
mod message;

pub use backend::*;
pub use conversation::*;
pub use error::*;
pub use message::*;
