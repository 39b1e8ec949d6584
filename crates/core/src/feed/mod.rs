pub mod adapter;
pub mod fx;
pub mod yahoo;

pub use adapter::{CurrencyCache, FeedAdapter};
pub use yahoo::YahooMarketFeed;
