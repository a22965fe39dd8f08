//! Web Image Categorizer core.
//!
//! Template-driven filing of web images into cloud storage. A naming
//! template turns the page an image came from into a destination directory,
//! file name and description, and a storage provider puts the bytes there.
//!
//! - [`template`]: tokenizer, resolver, matcher and validation for naming templates
//! - [`providers`]: FileLu, FileLu S5 and S3-compatible storage backends
//! - [`crypto`]: optional payload encryption
//! - [`config`]: the JSON config file and its merge rules
//! - [`save`]: the pipeline gluing it all together

pub mod config;
pub mod crypto;
pub mod providers;
pub mod save;
pub mod template;

pub use config::{load_config, merge_config, save_config, WicConfig};
pub use save::{save_image, SaveError, SaveOutcome, SaveRequest};
