pub mod buckets;
pub mod codec;
pub mod discover;
pub mod export;
pub mod router;
pub mod session;
pub mod transform;
