// Public API
pub use filter::{ContentFilter, FilterVerdict};

// Internal modules
mod filter;
