//! # cairn-query: the counter command surface
//!
//! A thin, protocol-agnostic layer the wire dispatcher calls into:
//! `GET`/`SET`/`INCRBY`/`ENSURE` over the counter store, with the reply and
//! error vocabulary fixed here. Framing, connections, and transactions
//! belong to the dispatcher, which is an external collaborator.

mod handler;
mod reply;

pub use handler::CommandHandler;
pub use reply::Reply;
