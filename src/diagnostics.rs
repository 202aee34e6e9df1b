//! Graphics API message channel.
//!
//! Device errors and surface acquisition failures both go through [`report`].
//! Advisory messages are only logged. Anything reported at [`Severity::Error`]
//! ends the process: rendering never continues past a confirmed API error.

use std::fmt;

/// Exit code used for device out-of-memory, matching the surface OOM path.
pub const EXIT_OUT_OF_MEMORY: i32 = 137;
pub const EXIT_API_ERROR: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    exit_code: i32,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            exit_code: EXIT_API_ERROR,
        }
    }

    /// Every uncaptured wgpu error is a hard error.
    pub fn from_wgpu(error: &wgpu::Error) -> Self {
        let exit_code = if matches!(error, wgpu::Error::OutOfMemory { .. }) {
            EXIT_OUT_OF_MEMORY
        } else {
            EXIT_API_ERROR
        };
        Self {
            severity: Severity::Error,
            message: error.to_string(),
            exit_code,
        }
    }

    /// Surface acquisition failures. Outdated and lost surfaces are
    /// reconfigured by the caller, so only out-of-memory is fatal.
    pub fn from_surface(error: &wgpu::SurfaceError) -> Self {
        match error {
            wgpu::SurfaceError::Outdated => Self::new(Severity::Info, "surface outdated"),
            wgpu::SurfaceError::Lost => Self::new(Severity::Warning, "surface lost"),
            wgpu::SurfaceError::Timeout => {
                Self::new(Severity::Warning, "timed out acquiring surface texture")
            }
            wgpu::SurfaceError::OutOfMemory => Self {
                severity: Severity::Error,
                message: "out of memory acquiring surface texture".to_owned(),
                exit_code: EXIT_OUT_OF_MEMORY,
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Terminate { exit_code: i32 },
}

/// Log `diagnostic` and decide whether the session may go on.
pub fn report(diagnostic: &Diagnostic) -> Disposition {
    match diagnostic.severity {
        Severity::Info => {
            tracing::info!(target: "gpu", "{}", diagnostic.message);
            Disposition::Continue
        }
        Severity::Warning => {
            tracing::warn!(target: "gpu", "{}", diagnostic.message);
            Disposition::Continue
        }
        Severity::Error => {
            tracing::error!(target: "gpu", "{}", diagnostic.message);
            Disposition::Terminate {
                exit_code: diagnostic.exit_code,
            }
        }
    }
}

/// Route uncaptured device errors through [`report`], exiting on error severity.
pub fn install(device: &wgpu::Device) {
    device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
        let diagnostic = Diagnostic::from_wgpu(&error);
        if let Disposition::Terminate { exit_code } = report(&diagnostic) {
            std::process::exit(exit_code);
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_messages_continue() {
        let info = Diagnostic::new(Severity::Info, "adapter selected");
        let warning = Diagnostic::new(Severity::Warning, "slow path");
        assert_eq!(report(&info), Disposition::Continue);
        assert_eq!(report(&warning), Disposition::Continue);
    }

    #[test]
    fn errors_terminate() {
        let error = Diagnostic::new(Severity::Error, "invalid binding");
        assert_eq!(
            report(&error),
            Disposition::Terminate {
                exit_code: EXIT_API_ERROR
            }
        );
    }

    #[test]
    fn surface_failures_are_advisory_except_out_of_memory() {
        for error in [
            wgpu::SurfaceError::Outdated,
            wgpu::SurfaceError::Lost,
            wgpu::SurfaceError::Timeout,
        ] {
            let diagnostic = Diagnostic::from_surface(&error);
            assert!(diagnostic.severity < Severity::Error, "{diagnostic}");
            assert_eq!(report(&diagnostic), Disposition::Continue);
        }

        let oom = Diagnostic::from_surface(&wgpu::SurfaceError::OutOfMemory);
        assert_eq!(
            report(&oom),
            Disposition::Terminate {
                exit_code: EXIT_OUT_OF_MEMORY
            }
        );
    }

    #[test]
    fn wgpu_errors_are_fatal() {
        let validation = wgpu::Error::Validation {
            source: Box::new(fmt::Error),
            description: "texture usage mismatch".to_owned(),
        };
        let diagnostic = Diagnostic::from_wgpu(&validation);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert!(diagnostic.message.contains("texture usage mismatch"));
        assert_eq!(
            report(&diagnostic),
            Disposition::Terminate {
                exit_code: EXIT_API_ERROR
            }
        );

        let oom = wgpu::Error::OutOfMemory {
            source: Box::new(fmt::Error),
        };
        assert_eq!(
            report(&Diagnostic::from_wgpu(&oom)),
            Disposition::Terminate {
                exit_code: EXIT_OUT_OF_MEMORY
            }
        );
    }
}
