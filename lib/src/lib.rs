//! Shared support code for the hartpal platform layer.
//!
//! Everything here is usable before any memory manager exists: logging goes
//! through a registered backend function, configuration is parsed from a
//! borrowed command line, and the platform collaborators are plain traits.

#![cfg_attr(not(test), no_std)]

pub mod alignment;
pub mod config;
pub mod klog;
pub mod platform;
pub mod string;

#[doc(hidden)]
pub use paste;

pub use alignment::{align_down_u64, align_down_usize, align_up_u64, align_up_usize};
pub use alignment::{align_down_usize as align_down, align_up_usize as align_up};
pub use alignment::{is_aligned_u64, is_aligned_usize};
pub use config::{PalConfig, config_from_cmdline};
pub use klog::{
    KlogLevel, klog_get_level, klog_init, klog_init_from, klog_is_enabled, klog_register_backend,
    klog_set_level,
};
pub use platform::{CacheOp, CachePublish, FirmwareTables, NoopPublish, publish_object};
pub use string::bytes_as_str;
