pub mod tier;
pub mod weak_map;

pub use tier::{TierMap, TierNode};
pub use weak_map::{WeakDepMap, DEFAULT_PRUNE_WATERMARK};
