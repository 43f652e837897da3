//! Protocol module containing the message envelope and addressing types.

pub mod message;

pub use message::{Address, Header, Message, MessageError, Request, Response, Shift};
