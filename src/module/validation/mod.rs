//! Module validation
//!
//! Checks descriptors before a module is admitted into the registry.

pub mod descriptor_validator;

pub use descriptor_validator::{compare_versions, DescriptorValidator, ValidationResult};
