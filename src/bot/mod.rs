//! Stock quote bot.
//!
//! The bot consumes quote requests, looks the symbol up and publishes the
//! outcome on the result queue. It keeps no state between requests, so any
//! number of bot processes can share the request queue.

mod quote;
mod worker;

pub use quote::{parse_close_price, LookupError, QuoteLookup, StooqClient};
pub use worker::QuoteWorker;
