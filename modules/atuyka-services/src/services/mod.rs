pub mod bluesky;

pub use bluesky::Bluesky;
