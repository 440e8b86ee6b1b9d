use serde::{Deserialize, Serialize};

/// What a patch line represents.
///
/// The first three origins are real content lines and render with their
/// origin character as a one-byte prefix. Everything else is annotation:
/// EOFNL markers close an unterminated final line, and the header origins
/// exist so callback-driven printing can hand every rendered line through
/// one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineOrigin {
    /// Line present on both sides.
    Context,
    /// Line only on the new side.
    Addition,
    /// Line only on the old side.
    Deletion,
    /// Marker: both sides end without a trailing newline.
    ContextEofnl,
    /// Marker: the new side ends without a trailing newline.
    AddEofnl,
    /// Marker: the old side ends without a trailing newline.
    DelEofnl,
    /// Rendered file header, emitted during callback printing.
    FileHeader,
    /// Rendered hunk header, emitted during callback printing.
    HunkHeader,
    /// Binary-difference marker replacing hunk content.
    Binary,
}

impl LineOrigin {
    /// One-character origin code.
    pub fn as_char(&self) -> char {
        match self {
            Self::Context => ' ',
            Self::Addition => '+',
            Self::Deletion => '-',
            Self::ContextEofnl => '=',
            Self::AddEofnl => '>',
            Self::DelEofnl => '<',
            Self::FileHeader => 'F',
            Self::HunkHeader => 'H',
            Self::Binary => 'B',
        }
    }

    /// Returns `true` for origins whose character precedes the content in
    /// rendered output.
    pub fn is_prefixed(&self) -> bool {
        matches!(self, Self::Context | Self::Addition | Self::Deletion)
    }
}

/// One line of a generated patch.
///
/// Content is raw bytes, trailing newline included when the source had one.
/// A line number is `-1` on any side where the line does not exist. EOFNL
/// markers repeat the numbers of the line they annotate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchLine {
    pub origin: LineOrigin,
    /// 1-based line number on the old side, or -1.
    pub old_lineno: i64,
    /// 1-based line number on the new side, or -1.
    pub new_lineno: i64,
    pub content: Vec<u8>,
}
