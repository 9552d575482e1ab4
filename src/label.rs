//! The fixed set of anatomical labels.
//!
//! Label images carry integer codes. Only the four codes below are measured;
//! any other value in an image is ignored, never rejected.

use serde::{Deserialize, Serialize};

/// An anatomical structure in a cardiac MR segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Left-ventricular cavity (code 1).
    LvCavity,
    /// Myocardium (code 2).
    Myocardium,
    /// Myocardial infarction (code 3).
    MyocardialInfarction,
    /// Microvascular obstruction (code 4).
    Mvo,
}

impl Label {
    /// Number of labels.
    pub const COUNT: usize = 4;

    /// All labels, in reporting order.
    pub const ALL: [Label; Self::COUNT] = [
        Label::LvCavity,
        Label::Myocardium,
        Label::MyocardialInfarction,
        Label::Mvo,
    ];

    /// Integer code used in label images.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::LvCavity => 1,
            Self::Myocardium => 2,
            Self::MyocardialInfarction => 3,
            Self::Mvo => 4,
        }
    }

    /// Look up a label by its image code. Unknown codes yield `None`.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::LvCavity),
            2 => Some(Self::Myocardium),
            3 => Some(Self::MyocardialInfarction),
            4 => Some(Self::Mvo),
            _ => None,
        }
    }

    /// Short display name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LvCavity => "LV",
            Self::Myocardium => "MYO",
            Self::MyocardialInfarction => "MI",
            Self::Mvo => "MVO",
        }
    }

    /// Position of this label in [`Label::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.code() as usize - 1
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
