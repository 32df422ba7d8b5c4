//! Is the local OCR engine installed?
//!
//! We find out by running `<engine> --version` once, up front. The result is
//! an ordinary value that gets passed to whatever needs it, and it only
//! changes if somebody probes again.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use schemars::JsonSchema;
use tokio::process::Command;

use crate::{async_utils::check_for_command_failure, prelude::*};

use super::install::PackageInstaller;

/// Matches the first line of `tesseract --version`, e.g. `tesseract 5.3.0` or
/// `tesseract v4.0.0-beta.1`.
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*tesseract\s+v?(?P<version>\S+)")
        .expect("failed to compile regex")
});

/// What we know about the local OCR engine.
#[derive(Clone, Copy, Debug, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum EngineStatus {
    /// The engine answered a version query.
    Available,

    /// The engine is missing or broken.
    Unavailable,

    /// The engine was missing, so we tried to install it. `success` is
    /// true if it answered a version query afterwards.
    InstallAttempted { success: bool },
}

impl EngineStatus {
    /// Can we run the local engine?
    pub fn is_usable(self) -> bool {
        matches!(
            self,
            EngineStatus::Available | EngineStatus::InstallAttempted { success: true }
        )
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Available => write!(f, "available"),
            EngineStatus::Unavailable => write!(f, "unavailable"),
            EngineStatus::InstallAttempted { success: true } => {
                write!(f, "available (installed)")
            }
            EngineStatus::InstallAttempted { success: false } => {
                write!(f, "unavailable (installation failed)")
            }
        }
    }
}

/// Checks whether a local engine binary can be run.
#[derive(Clone, Debug)]
pub struct EngineProber {
    /// The engine binary, either a bare name to look up on `PATH` or a path.
    binary: PathBuf,
}

impl EngineProber {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The binary we probe.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run `<binary> --version` and report whether it worked.
    #[instrument(level = "debug", skip_all, fields(binary = %self.binary.display()))]
    pub async fn probe(&self) -> EngineStatus {
        match self.version().await {
            Ok(version) => {
                info!(version = %version, "Found Tesseract-OCR");
                EngineStatus::Available
            }
            Err(err) => {
                debug!("Tesseract-OCR probe failed: {:?}", err);
                EngineStatus::Unavailable
            }
        }
    }

    /// Probe, and if the engine is missing, try to install it exactly once and
    /// probe again.
    ///
    /// Installation failures are reported to the user and otherwise ignored.
    #[instrument(level = "debug", skip_all, fields(binary = %self.binary.display()))]
    pub async fn probe_or_install(&self, installer: &dyn PackageInstaller) -> EngineStatus {
        if self.probe().await.is_usable() {
            return EngineStatus::Available;
        }
        self.install_and_reprobe(installer).await
    }

    /// Run `installer` once, then probe again.
    #[instrument(level = "debug", skip_all, fields(binary = %self.binary.display()))]
    pub async fn install_and_reprobe(&self, installer: &dyn PackageInstaller) -> EngineStatus {
        warn!("Tesseract-OCR not found, attempting to install it");
        if let Err(err) = installer.install().await {
            error!("Could not install Tesseract-OCR: {}", err);
        }
        let success = self.probe().await.is_usable();
        if success {
            info!("Installed Tesseract-OCR");
        }
        EngineStatus::InstallAttempted { success }
    }

    /// Get the engine's version string.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("cannot run {:?}", self.binary.display()))?;
        check_for_command_failure("tesseract", &output)?;

        // Tesseract 3.x printed its version on stderr.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr)
        } else {
            stdout
        };
        Ok(parse_version(&text)
            .unwrap_or_else(|| text.lines().next().unwrap_or_default().trim().to_owned()))
    }
}

/// Extract a version number from `tesseract --version` output.
fn parse_version(text: &str) -> Option<String> {
    VERSION_RE
        .captures(text)
        .and_then(|caps| caps.name("version"))
        .map(|m| m.as_str().to_owned())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engines::install::InstallError;

    /// Write an executable shell script into `dir` and return its path.
    #[cfg(unix)]
    pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::{fs, os::unix::fs::PermissionsExt as _};

        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// An installer that counts calls, and optionally runs a setup hook.
    struct FakeInstaller {
        calls: AtomicUsize,
        hook: Box<dyn Fn() -> Result<(), InstallError> + Send + Sync>,
    }

    impl FakeInstaller {
        fn new(
            hook: impl Fn() -> Result<(), InstallError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                hook: Box::new(hook),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PackageInstaller for FakeInstaller {
        async fn install(&self) -> Result<(), InstallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.hook)()
        }
    }

    #[test]
    fn parses_tesseract_versions() {
        assert_eq!(
            parse_version("tesseract 5.3.0\n leptonica-1.82.0\n").as_deref(),
            Some("5.3.0")
        );
        assert_eq!(
            parse_version("tesseract v4.0.0-beta.1\n").as_deref(),
            Some("4.0.0-beta.1")
        );
        assert_eq!(parse_version("something else"), None);
    }

    #[test]
    fn only_available_and_successful_installs_are_usable() {
        assert!(EngineStatus::Available.is_usable());
        assert!(EngineStatus::InstallAttempted { success: true }.is_usable());
        assert!(!EngineStatus::Unavailable.is_usable());
        assert!(!EngineStatus::InstallAttempted { success: false }.is_usable());
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let prober = EngineProber::new("/nonexistent/bin/tesseract");
        assert_eq!(prober.probe().await, EngineStatus::Unavailable);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn failing_binary_is_unavailable() -> Result<()> {
        let dir = tempfile::TempDir::with_prefix("probe")?;
        let binary = write_script(dir.path(), "tesseract", "exit 1");
        let prober = EngineProber::new(binary);
        assert_eq!(prober.probe().await, EngineStatus::Unavailable);
        Ok(())
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn working_binary_is_available() -> Result<()> {
        let dir = tempfile::TempDir::with_prefix("probe")?;
        let binary = write_script(dir.path(), "tesseract", "echo 'tesseract 5.3.0'");
        let prober = EngineProber::new(binary);
        assert_eq!(prober.version().await?, "5.3.0");
        assert_eq!(prober.probe().await, EngineStatus::Available);
        Ok(())
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn available_engine_is_never_installed() -> Result<()> {
        let dir = tempfile::TempDir::with_prefix("probe")?;
        let binary = write_script(dir.path(), "tesseract", "echo 'tesseract 5.3.0'");
        let installer = FakeInstaller::new(|| Ok(()));
        let status = EngineProber::new(binary).probe_or_install(&installer).await;
        assert_eq!(status, EngineStatus::Available);
        assert_eq!(installer.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn failed_install_is_reported_once() {
        let installer = FakeInstaller::new(|| {
            Err(InstallError::UnsupportedPlatform { os: "plan9".to_owned() })
        });
        let status = EngineProber::new("/nonexistent/bin/tesseract")
            .probe_or_install(&installer)
            .await;
        assert_eq!(status, EngineStatus::InstallAttempted { success: false });
        assert_eq!(installer.calls(), 1);
    }

    #[tokio::test]
    async fn install_that_does_not_help_is_reported() {
        let installer = FakeInstaller::new(|| Ok(()));
        let status = EngineProber::new("/nonexistent/bin/tesseract")
            .probe_or_install(&installer)
            .await;
        assert_eq!(status, EngineStatus::InstallAttempted { success: false });
        assert_eq!(installer.calls(), 1);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn successful_install_is_reprobed() -> Result<()> {
        let dir = tempfile::TempDir::with_prefix("probe")?;
        let install_dir = dir.path().to_owned();
        let binary = install_dir.join("tesseract");
        let installer = FakeInstaller::new(move || {
            write_script(&install_dir, "tesseract", "echo 'tesseract 5.3.0'");
            Ok(())
        });
        let status = EngineProber::new(binary).probe_or_install(&installer).await;
        assert_eq!(status, EngineStatus::InstallAttempted { success: true });
        assert_eq!(installer.calls(), 1);
        Ok(())
    }
}
