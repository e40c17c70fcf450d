//! Feed output: assembling entries and serializing them.
//!
//! # Submodules
//!
//! - [`entries`]: Turns validated records into feed entries (pure)
//! - [`rss`]: Writes entries as an RSS 2.0 document
//!
//! # Output Structure
//!
//! ```text
//! feed.rss
//! └── channel
//!     ├── item (one per upcoming event)
//!     └── ...
//! ```

pub mod entries;
pub mod rss;
