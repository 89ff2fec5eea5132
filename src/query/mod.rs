//! Remote query cache: keyed, deduplicated, stale-while-revalidate reads plus
//! direct cache writes for confirmed mutations.

mod cache;
mod key;
mod observer;

pub use cache::{QueryCache, QueryOptions, QuerySnapshot};
pub use key::QueryKey;
pub use observer::{QueryObserver, QueryStatus};
