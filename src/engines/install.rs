//! Installing Tesseract with the system package manager.
//!
//! This is only ever done when the user passes `--install`. Tests use their
//! own [`PackageInstaller`] so they never touch the real system.

use std::{env, error, fmt};

use tokio::process::Command;

use crate::{async_utils::check_for_command_failure, prelude::*};

/// Instructions shown when no local engine is available.
pub const INSTALL_HELP: &str = r#"Tesseract-OCR is not available in this environment.

To install it:
  - Linux: sudo apt-get install tesseract-ocr
  - Mac: brew install tesseract
  - Windows: download it from https://github.com/UB-Mannheim/tesseract/wiki

Alternatively, pass --remote to use the online OCR API (requires an internet
connection), or --install to try installing Tesseract automatically."#;

/// Something that can install the OCR engine.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install the engine. Called at most once per probe.
    async fn install(&self) -> Result<(), InstallError>;
}

/// Package manager commands for Linux.
const LINUX_COMMANDS: &[&[&str]] = &[
    &["apt-get", "update"],
    &["apt-get", "install", "-y", "tesseract-ocr"],
];

/// Package manager commands for macOS.
const MACOS_COMMANDS: &[&[&str]] = &[&["brew", "install", "tesseract"]];

/// Installs Tesseract using `apt-get` on Linux or `brew` on macOS.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPackageInstaller;

impl SystemPackageInstaller {
    /// The commands we run to install Tesseract on `os` (as named by
    /// [`std::env::consts::OS`]), in order.
    pub fn commands_for_os(os: &str) -> Option<&'static [&'static [&'static str]]> {
        match os {
            "linux" => Some(LINUX_COMMANDS),
            "macos" => Some(MACOS_COMMANDS),
            _ => None,
        }
    }
}

#[async_trait]
impl PackageInstaller for SystemPackageInstaller {
    #[instrument(level = "debug", skip_all)]
    async fn install(&self) -> Result<(), InstallError> {
        let os = env::consts::OS;
        let commands = Self::commands_for_os(os).ok_or_else(|| {
            InstallError::UnsupportedPlatform { os: os.to_owned() }
        })?;
        for &command in commands {
            let (program, args) = command
                .split_first()
                .expect("install commands should not be empty");
            info!("Running: {}", command.join(" "));
            let output = Command::new(program)
                .args(args)
                .output()
                .await
                .with_context(|| format!("cannot run {}", program))
                .map_err(InstallError::CommandFailed)?;
            check_for_command_failure(program, &output).map_err(InstallError::CommandFailed)?;
        }
        Ok(())
    }
}

/// An error which occurred while installing the OCR engine.
#[derive(Debug)]
pub enum InstallError {
    /// We don't know how to install packages on this OS.
    UnsupportedPlatform { os: String },

    /// A package manager command failed.
    CommandFailed(anyhow::Error),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::UnsupportedPlatform { os } => write!(
                f,
                "don't know how to install Tesseract-OCR on {}; please install it manually",
                os
            ),
            InstallError::CommandFailed(err) => write!(f, "{:#}", err),
        }
    }
}

impl error::Error for InstallError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            InstallError::UnsupportedPlatform { .. } => None,
            InstallError::CommandFailed(err) => Some(&**err),
        }
    }
}
