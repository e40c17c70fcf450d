//! Extraction core: from one event container to one validated record.
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`locator`] | Ordered fallback strategies per field |
//! | [`dates`] | Day/month/day/time fragments to canonical time |
//! | [`builder`] | Field checks, business filters, window, stable id |
//!
//! Everything here is a pure function of a container plus the run's clock;
//! nothing touches the network or the filesystem.

pub mod builder;
pub mod dates;
pub mod locator;
