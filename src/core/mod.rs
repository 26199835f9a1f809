//! Core business logic
//!
//! Build stages, device provisioning and host checks.

pub mod bootloader;
pub mod devices;
pub mod doctor;
pub mod flash;
pub mod image;
pub mod pipeline;
pub mod post_install;
pub mod preseed;
pub mod settings;
pub mod workspace;
