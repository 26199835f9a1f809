//! Configuration constants
//!
//! - [`defaults`] - Default paths, boot parameters and flash settings
//! - [`layout`] - Fixed locations inside the extracted image tree

pub mod defaults;
pub mod layout;
