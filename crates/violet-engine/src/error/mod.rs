//! Typed failures for resource loading and engine configuration.
//!
//! Public entry points return `anyhow::Result`; these variants are attached as the
//! root cause so callers (and tests) can `downcast_ref::<ResourceError>()`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("{}: invalid file signature (expected {expected:?})", .path.display())]
    BadMagic { path: PathBuf, expected: &'static str },

    #[error("{}: unsupported format version {version}", .path.display())]
    UnsupportedVersion { path: PathBuf, version: u8 },

    #[error("{}: unexpected end of file", .path.display())]
    Truncated { path: PathBuf },

    #[error("frame rate must be positive, got {0}")]
    InvalidFps(f32),

    #[error("invalid timer format {format:?}: unknown token {token:?}")]
    InvalidTimerFormat { format: String, token: char },

    #[error("sheet frame index out of range")]
    FrameOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_path() {
        let e = ResourceError::BadMagic {
            path: PathBuf::from("maps/a.map"),
            expected: "VIOLMAP",
        };
        let s = e.to_string();
        assert!(s.contains("maps/a.map"));
        assert!(s.contains("VIOLMAP"));
    }

    #[test]
    fn downcast_through_anyhow() {
        let e: anyhow::Error = ResourceError::InvalidFps(0.0).into();
        assert!(matches!(
            e.downcast_ref::<ResourceError>(),
            Some(ResourceError::InvalidFps(_))
        ));
    }
}
