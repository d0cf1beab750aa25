//! The resolved configuration record of a run.
//!
//! Computed once before any target is touched and passed explicitly into
//! every lifecycle stage, so no stage looks at process arguments directly.

use crate::core::flags::FeatureFlags;
use crate::core::platform::Platform;

/// Platform, feature flags and test request for one build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Target platform tag
    pub platform: Platform,

    /// Resolved feature flags
    pub flags: FeatureFlags,

    /// Free-form test arguments; `Some` when tests were requested
    pub test_args: Option<String>,

    /// Build in release mode
    pub release: bool,
}

impl RunConfig {
    /// Create a configuration for the given platform with no flags set.
    pub fn new(platform: Platform) -> Self {
        RunConfig {
            platform,
            flags: FeatureFlags::new(),
            test_args: None,
            release: false,
        }
    }

    /// Create a configuration for the host platform.
    pub fn host() -> Self {
        Self::new(Platform::host())
    }

    pub fn with_flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Request the test stage, with the given argument string.
    pub fn with_tests(mut self, args: Option<String>) -> Self {
        self.test_args = args;
        self
    }

    pub fn with_release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    pub fn tests_requested(&self) -> bool {
        self.test_args.is_some()
    }

    /// CMake build type for this run.
    pub fn build_type(&self) -> &'static str {
        if self.release {
            "Release"
        } else {
            "Debug"
        }
    }
}
