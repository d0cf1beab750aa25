//! CMake adapter for native targets.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::builder::steps::{BuildRequest, NativeBuild};
use crate::util::fs::ensure_dir;
use crate::util::process::{find_cmake, ProcessBuilder};

/// Configures and builds a target with CMake, in the target's workspace.
#[derive(Debug, Clone, Default)]
pub struct CMakeStep {
    /// Explicit cmake executable; PATH lookup otherwise
    cmake: Option<PathBuf>,
    generator: Option<String>,
    jobs: Option<usize>,
}

impl CMakeStep {
    pub fn new() -> Self {
        CMakeStep::default()
    }

    pub fn with_cmake(mut self, cmake: Option<PathBuf>) -> Self {
        self.cmake = cmake;
        self
    }

    pub fn with_generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    /// Parallelism passed to `cmake --build`.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    fn locate(&self) -> Result<PathBuf> {
        if let Some(cmake) = &self.cmake {
            return Ok(cmake.clone());
        }
        match find_cmake() {
            Some(cmake) => Ok(cmake),
            None => bail!(
                "CMake not found\n\
                 \n\
                 CMake is required to build native targets.\n\
                 Install CMake and ensure it's in your PATH, or set `build.cmake` in the config."
            ),
        }
    }

    /// The configure invocation for a request.
    pub fn configure_command(&self, cmake: &Path, request: &BuildRequest<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(cmake)
            .arg("-S")
            .arg(request.source_dir)
            .arg("-B")
            .arg(request.workspace);

        if let Some(generator) = &self.generator {
            cmd = cmd.arg("-G").arg(generator);
        }

        let build_type = if request.release { "Release" } else { "Debug" };
        cmd = cmd.arg(format!("-DCMAKE_BUILD_TYPE={}", build_type));

        // Packaged dependencies, as <DEP>_INCLUDES / <DEP>_LIBS lists
        for (name, exports) in &request.dependencies {
            let var = cmake_var_name(name);
            if !exports.includes.is_empty() {
                cmd = cmd.arg(format!(
                    "-D{}_INCLUDES={}",
                    var,
                    join_paths(exports.includes.iter().map(PathBuf::as_path))
                ));
            }
            if !exports.libs.is_empty() {
                cmd = cmd.arg(format!(
                    "-D{}_LIBS={}",
                    var,
                    join_paths(exports.libs.iter().map(PathBuf::as_path))
                ));
            }
        }

        for option in request.options {
            if option.starts_with('-') {
                cmd = cmd.arg(option);
            } else {
                cmd = cmd.arg(format!("-D{}", option));
            }
        }

        cmd
    }

    /// The build invocation for a request.
    pub fn build_command(&self, cmake: &Path, request: &BuildRequest<'_>) -> ProcessBuilder {
        let config = if request.release { "Release" } else { "Debug" };
        let mut cmd = ProcessBuilder::new(cmake)
            .arg("--build")
            .arg(request.workspace)
            .arg("--config")
            .arg(config)
            .arg("--parallel");

        if let Some(jobs) = self.jobs {
            cmd = cmd.arg(jobs.to_string());
        }

        cmd
    }
}

impl NativeBuild for CMakeStep {
    fn build(&self, request: &BuildRequest<'_>) -> Result<()> {
        if !is_cmake_project(request.source_dir) {
            bail!(
                "{} has no CMakeLists.txt; set `build = false` in [target] if `{}` only packages files",
                request.source_dir.display(),
                request.target
            );
        }

        let cmake = self.locate()?;
        ensure_dir(request.workspace)?;

        tracing::info!("Configuring `{}` with CMake", request.target);
        self.configure_command(&cmake, request)
            .exec_and_check()
            .with_context(|| format!("CMake configuration of `{}` failed", request.target))?;

        tracing::info!("Building `{}`", request.target);
        self.build_command(&cmake, request)
            .exec_and_check()
            .with_context(|| format!("CMake build of `{}` failed", request.target))?;

        Ok(())
    }
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}

/// `Nano-Mesh` -> `NANO_MESH`
fn cmake_var_name(target: &str) -> String {
    target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn join_paths<'a>(paths: impl Iterator<Item = &'a Path>) -> String {
    paths
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(";")
}
