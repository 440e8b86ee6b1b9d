use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// File mode for a diff-side entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Submodule pointer (0o160000).
    Submodule,
    /// Subtree / directory (0o040000).
    Tree,
}

/// Coarse mode classification used to distinguish a typechange from a plain
/// modification. A permission flip (regular to executable) stays within the
/// `Blob` class; crossing classes (file to symlink, file to submodule) is a
/// typechange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeClass {
    Blob,
    Symlink,
    Submodule,
    Tree,
}

impl EntryMode {
    /// Octal mode value (for display/serialization).
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Submodule => 0o160000,
            Self::Tree => 0o040000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Result<Self, TypeError> {
        match bits {
            0o100644 => Ok(Self::Regular),
            0o100755 => Ok(Self::Executable),
            0o120000 => Ok(Self::Symlink),
            0o160000 => Ok(Self::Submodule),
            0o040000 => Ok(Self::Tree),
            other => Err(TypeError::UnknownMode(other)),
        }
    }

    /// The typechange class of this mode.
    pub fn class(&self) -> ModeClass {
        match self {
            Self::Regular | Self::Executable => ModeClass::Blob,
            Self::Symlink => ModeClass::Symlink,
            Self::Submodule => ModeClass::Submodule,
            Self::Tree => ModeClass::Tree,
        }
    }

    /// Returns `true` if both modes fall in the same typechange class.
    pub fn same_class(&self, other: &EntryMode) -> bool {
        self.class() == other.class()
    }

    /// Returns `true` for regular and executable files.
    pub fn is_blob(&self) -> bool {
        self.class() == ModeClass::Blob
    }

    /// Returns `true` for submodule pointers.
    pub fn is_submodule(&self) -> bool {
        matches!(self, Self::Submodule)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_bits_roundtrip() {
        for mode in [
            EntryMode::Regular,
            EntryMode::Executable,
            EntryMode::Symlink,
            EntryMode::Submodule,
            EntryMode::Tree,
        ] {
            assert_eq!(EntryMode::from_mode_bits(mode.mode_bits()).unwrap(), mode);
        }
    }

    #[test]
    fn unknown_bits_are_rejected() {
        assert!(matches!(
            EntryMode::from_mode_bits(0o100600),
            Err(TypeError::UnknownMode(0o100600))
        ));
    }

    #[test]
    fn display_is_six_digit_octal() {
        assert_eq!(EntryMode::Regular.to_string(), "100644");
        assert_eq!(EntryMode::Executable.to_string(), "100755");
        assert_eq!(EntryMode::Symlink.to_string(), "120000");
        assert_eq!(EntryMode::Submodule.to_string(), "160000");
        assert_eq!(EntryMode::Tree.to_string(), "040000");
    }

    #[test]
    fn permission_flip_is_not_a_typechange() {
        assert!(EntryMode::Regular.same_class(&EntryMode::Executable));
    }

    #[test]
    fn class_crossings_are_typechanges() {
        assert!(!EntryMode::Regular.same_class(&EntryMode::Symlink));
        assert!(!EntryMode::Regular.same_class(&EntryMode::Submodule));
        assert!(!EntryMode::Symlink.same_class(&EntryMode::Submodule));
    }
}
