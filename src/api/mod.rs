pub mod collector;
pub mod dedupe;
pub mod helix;

pub use collector::{
    CollectionQuery, PaginatedCollector, DEFAULT_API_BASE_URL, DEFAULT_THROTTLE, PAGE_SIZE_CAP,
};
pub use dedupe::dedupe_by;
pub use helix::{Game, HelixClient, ListingSource, Stream};
