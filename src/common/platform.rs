//! Host platform identification
//!
//! The platform label decides whether the emulator host-address rewrite
//! applies; the descriptor goes into the registration message so the server
//! can show a meaningful browser name.

/// Host platform description
#[derive(Debug, Clone)]
pub struct Platform {
    /// Device/model label, matched against emulator patterns
    pub label: String,
    /// Human-readable descriptor, e.g. `Linux 6.1 (x86_64)`
    pub descriptor: String,
}

impl Platform {
    /// Create a platform description with an explicit label
    ///
    /// Embedders running on emulated targets should pass the device model
    /// string here (e.g. `Android SDK built for x86`), since that is what
    /// carries the emulator marker.
    pub fn new(label: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Detect the host platform via `os_info`
    pub fn detect() -> Self {
        let info = os_info::get();
        let label = info.os_type().to_string();
        let descriptor = match info.architecture() {
            Some(arch) => format!("{} {} ({})", info.os_type(), info.version(), arch),
            None => format!("{} {}", info.os_type(), info.version()),
        };
        Self { label, descriptor }
    }

    /// Whether the label marks an emulated environment
    pub fn is_emulator(&self) -> bool {
        let label = self.label.to_ascii_lowercase();
        label.contains("sdk") || label.contains("emulator")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulator_label_matching_is_case_insensitive() {
        assert!(Platform::new("Android SDK built for x86", "").is_emulator());
        assert!(Platform::new("google_sdk", "").is_emulator());
        assert!(Platform::new("iPhone Simulator EMULATOR", "").is_emulator());
        assert!(!Platform::new("Pixel 7", "").is_emulator());
    }
}
