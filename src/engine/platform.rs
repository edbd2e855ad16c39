use std::fs;
use std::path::{Path, PathBuf};

use super::EngineError;

/// File name of the engine library in every platform directory.
pub const LIBRARY_FILE: &str = "nl5_dll.dll";

const RED_HAT_IDS: &[&str] = &["rhel", "centos", "fedora", "rocky", "almalinux"];

/// Platforms the engine is distributed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// 64-bit Windows.
    Windows,
    /// Ubuntu and other Debian-like Linux, including WSL2.
    Ubuntu,
    /// Red Hat family Linux.
    Rhel,
    /// Apple silicon macOS.
    MacArm64,
    /// Intel macOS.
    MacX64,
}

impl Platform {
    /// Detects the host platform.
    pub fn detect() -> Result<Self, EngineError> {
        let os_release = if std::env::consts::OS == "linux" {
            fs::read_to_string("/etc/os-release").ok()
        } else {
            None
        };
        Self::from_parts(
            std::env::consts::OS,
            std::env::consts::ARCH,
            os_release.as_deref(),
        )
    }

    /// Picks a platform from `std::env::consts` style names and the contents
    /// of `/etc/os-release` (Linux only).
    pub fn from_parts(
        os: &str,
        arch: &str,
        os_release: Option<&str>,
    ) -> Result<Self, EngineError> {
        match os {
            "windows" => Ok(Self::Windows),
            "linux" => {
                if os_release.is_some_and(is_red_hat) {
                    Ok(Self::Rhel)
                } else {
                    Ok(Self::Ubuntu)
                }
            }
            "macos" if arch == "aarch64" => Ok(Self::MacArm64),
            "macos" => Ok(Self::MacX64),
            other => Err(EngineError::UnsupportedPlatform(format!("{other}/{arch}"))),
        }
    }

    /// Library location relative to the install root.
    #[must_use]
    pub fn relative_path(self) -> PathBuf {
        let dir: &[&str] = match self {
            Self::Windows => &["Windows"],
            Self::Ubuntu => &["Linux", "Ubuntu"],
            Self::Rhel => &["Linux", "RHEL"],
            Self::MacArm64 => &["macOS", "arm64"],
            Self::MacX64 => &["macOS", "x64"],
        };
        dir.iter().collect::<PathBuf>().join(LIBRARY_FILE)
    }

    /// Library location under `root`.
    #[must_use]
    pub fn library_path(self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }
}

fn is_red_hat(os_release: &str) -> bool {
    os_release
        .lines()
        .filter_map(|line| {
            line.strip_prefix("ID=")
                .or_else(|| line.strip_prefix("ID_LIKE="))
        })
        .flat_map(|value| value.trim_matches('"').split_whitespace())
        .any(|id| RED_HAT_IDS.contains(&id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_defaults_to_ubuntu_build() {
        let ubuntu = "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\n";
        assert_eq!(
            Platform::from_parts("linux", "x86_64", Some(ubuntu)).unwrap(),
            Platform::Ubuntu
        );
        assert_eq!(
            Platform::from_parts("linux", "x86_64", None).unwrap(),
            Platform::Ubuntu
        );
    }

    #[test]
    fn red_hat_family_uses_rhel_build() {
        let rocky = "ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n";
        assert_eq!(
            Platform::from_parts("linux", "x86_64", Some(rocky)).unwrap(),
            Platform::Rhel
        );
    }

    #[test]
    fn mac_splits_on_architecture() {
        assert_eq!(
            Platform::from_parts("macos", "aarch64", None).unwrap(),
            Platform::MacArm64
        );
        assert_eq!(
            Platform::from_parts("macos", "x86_64", None).unwrap(),
            Platform::MacX64
        );
    }

    #[test]
    fn unknown_os_is_rejected() {
        let err = Platform::from_parts("freebsd", "x86_64", None).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedPlatform(_)));
    }

    #[test]
    fn library_path_follows_distribution_layout() {
        let path = Platform::Rhel.library_path(Path::new("/opt/nl5"));
        assert_eq!(path, Path::new("/opt/nl5/Linux/RHEL/nl5_dll.dll"));
    }
}
