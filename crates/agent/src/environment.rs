//! What the model is told about the user's machine.

use serde::Serialize;
use std::path::Path;

/// OS name, user name and mounted volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub user: String,
    pub volumes: Vec<String>,
}

impl EnvironmentInfo {
    /// Probe the running machine.
    pub fn detect() -> Self {
        Self {
            os: os_name(),
            user: user_name(),
            volumes: volumes(),
        }
    }

    /// The block placed in the system message.
    pub fn render(&self) -> String {
        let volumes = if self.volumes.is_empty() {
            "(unknown)".to_string()
        } else {
            self.volumes.join(", ")
        };
        format!(
            "OS: {}\nUser: {}\nVolumes: {}",
            self.os, self.user, volumes
        )
    }
}

fn os_name() -> String {
    let family = std::env::consts::OS;
    if family == "linux" {
        if let Some(pretty) = std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|c| pretty_name(&c))
        {
            return format!("{family} ({pretty})");
        }
    }
    family.to_string()
}

fn pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .find_map(|l| l.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".into())
}

fn volumes() -> Vec<String> {
    if cfg!(windows) {
        ('A'..='Z')
            .map(|d| format!("{d}:\\"))
            .filter(|root| Path::new(root).exists())
            .collect()
    } else {
        match std::fs::read_to_string("/proc/mounts") {
            Ok(mounts) => device_mounts(&mounts),
            Err(_) => vec!["/".to_string()],
        }
    }
}

/// Mount points of `/dev/*` devices in `/proc/mounts` format.
fn device_mounts(mounts: &str) -> Vec<String> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            device
                .starts_with("/dev/")
                .then(|| mount_point.replace("\\040", " "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_mounts_only() {
        let mounts = "\
proc /proc proc rw 0 0
/dev/nvme0n1p2 / ext4 rw 0 0
tmpfs /tmp tmpfs rw 0 0
/dev/sdb1 /media/My\\040Disk vfat rw 0 0
";
        assert_eq!(device_mounts(mounts), vec!["/", "/media/My Disk"]);
    }

    #[test]
    fn pretty_name_is_unquoted() {
        let release = "NAME=\"Arch Linux\"\nPRETTY_NAME=\"Arch Linux\"\nID=arch\n";
        assert_eq!(pretty_name(release).as_deref(), Some("Arch Linux"));
        assert_eq!(pretty_name("ID=x\n"), None);
    }

    #[test]
    fn render_lists_everything() {
        let info = EnvironmentInfo {
            os: "linux".into(),
            user: "momo".into(),
            volumes: vec!["/".into(), "/home".into()],
        };
        let text = info.render();
        assert!(text.contains("OS: linux"));
        assert!(text.contains("User: momo"));
        assert!(text.contains("Volumes: /, /home"));
    }

    #[test]
    fn detect_never_panics() {
        let info = EnvironmentInfo::detect();
        assert!(!info.os.is_empty());
    }
}
