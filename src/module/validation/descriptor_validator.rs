//! Descriptor validation
//!
//! Validates module descriptors for structure and host compatibility.

use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::module::traits::{ModuleDescriptor, ModuleError};

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Descriptor is valid
    Valid,
    /// Descriptor is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    /// Convert into a discovery error, joining all messages
    pub fn into_result(self, module: &str) -> Result<(), ModuleError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(errors) => Err(ModuleError::DiscoveryError(format!(
                "Invalid descriptor for {}: {}",
                module,
                errors.join("; ")
            ))),
        }
    }
}

/// Descriptor validator
pub struct DescriptorValidator {
    /// Version of the running host
    host_version: String,
    /// Maximum module name length
    max_name_len: usize,
}

impl DescriptorValidator {
    /// Create a validator for the given host version
    pub fn new(host_version: impl Into<String>) -> Self {
        Self {
            host_version: host_version.into(),
            max_name_len: 64,
        }
    }

    /// Host version modules are checked against
    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    /// Validate structure only
    pub fn validate(&self, descriptor: &ModuleDescriptor) -> ValidationResult {
        let mut errors = Vec::new();

        if descriptor.name.is_empty() {
            errors.push("Module name cannot be empty".to_string());
        } else if !self.is_valid_name(&descriptor.name) {
            errors.push(format!(
                "Invalid module name: {} (must be alphanumeric with dashes/underscores)",
                descriptor.name
            ));
        }

        if descriptor.version.is_empty() {
            errors.push("Module version cannot be empty".to_string());
        } else if !is_valid_version(&descriptor.version) {
            errors.push(format!(
                "Invalid version format: {} (expected semantic versioning)",
                descriptor.version
            ));
        }

        if !is_valid_version(&descriptor.min_host_version) {
            errors.push(format!(
                "Invalid minimum host version: {}",
                descriptor.min_host_version
            ));
        }

        for dep in &descriptor.dependencies {
            if !self.is_valid_name(dep) {
                errors.push(format!("Invalid dependency name: {}", dep));
            }
        }

        if errors.is_empty() {
            debug!("Descriptor validation passed for module: {}", descriptor.name);
            ValidationResult::Valid
        } else {
            warn!(
                "Descriptor validation failed for module {}: {:?}",
                descriptor.name, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate structure, then host compatibility
    pub fn check(&self, descriptor: &ModuleDescriptor) -> Result<(), ModuleError> {
        self.validate(descriptor).into_result(&descriptor.name)?;

        match compare_versions(&descriptor.min_host_version, &self.host_version) {
            Some(Ordering::Greater) => Err(ModuleError::VersionIncompatible(format!(
                "{} requires host {} or newer, running {}",
                descriptor.name, descriptor.min_host_version, self.host_version
            ))),
            Some(_) => Ok(()),
            None => Err(ModuleError::VersionIncompatible(format!(
                "cannot compare {} against host version {}",
                descriptor.min_host_version, self.host_version
            ))),
        }
    }

    #[inline]
    fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name.len() > self.max_name_len {
            return false;
        }

        if !name.chars().next().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for DescriptorValidator {
    fn default() -> Self {
        Self::new(crate::VERSION)
    }
}

/// Numeric core of a version: `major.minor[.patch]`, ignoring prerelease/build
fn version_core(version: &str) -> Option<Vec<u32>> {
    let base = version.split('+').next()?;
    let core = base.split('-').next()?;
    let nums: Vec<&str> = core.split('.').collect();

    if nums.len() < 2 || nums.len() > 3 {
        return None;
    }

    nums.iter()
        .map(|n| {
            if n.is_empty() || !n.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                n.parse::<u32>().ok()
            }
        })
        .collect()
}

/// Accepts: major.minor[.patch][-prerelease][+build]
fn is_valid_version(version: &str) -> bool {
    version_core(version).is_some()
}

/// Compare two versions by their numeric core; `None` if either is malformed
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let mut a = version_core(a)?;
    let mut b = version_core(b)?;
    a.resize(3, 0);
    b.resize(3, 0);
    Some(a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_descriptor() {
        let validator = DescriptorValidator::new("1.2.0");
        let descriptor = ModuleDescriptor::new("core-commands", "1.0.0").depends_on("routing");
        assert_eq!(validator.validate(&descriptor), ValidationResult::Valid);
        assert!(validator.check(&descriptor).is_ok());
    }

    #[test]
    fn test_rejects_bad_name_and_version() {
        let validator = DescriptorValidator::new("1.0.0");
        let descriptor = ModuleDescriptor::new("-bad name", "one");
        match validator.validate(&descriptor) {
            ValidationResult::Invalid(errors) => assert_eq!(errors.len(), 2),
            ValidationResult::Valid => panic!("expected invalid descriptor"),
        }
    }

    #[test]
    fn test_min_host_version() {
        let validator = DescriptorValidator::new("1.0.0");
        let descriptor =
            ModuleDescriptor::new("analytics", "1.0.0").with_min_host_version("1.1");
        assert!(matches!(
            validator.check(&descriptor),
            Err(ModuleError::VersionIncompatible(_))
        ));

        let descriptor =
            ModuleDescriptor::new("analytics", "1.0.0").with_min_host_version("1.0.0-rc1");
        assert!(validator.check(&descriptor).is_ok());
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("1.10.0", "1.9.9"), Some(Ordering::Greater));
        assert_eq!(compare_versions("x", "1.0"), None);
    }
}
