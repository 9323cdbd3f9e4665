// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Name Module
//!
//! Everything that turns a human-entered name into something comparable:
//! normalized keys, approximate distance, structured splitting and the
//! lookup variants stored in the name index.

pub mod distance;
pub mod lookup;
pub mod nickname;
pub mod normalizer;
pub mod splitter;

pub use distance::NameDistance;
pub use lookup::{NameLookupBuilder, NameLookupEntry, NameLookupType};
pub use nickname::{NicknameClusters, NicknameTable};
pub use normalizer::{compare_complexity, normalize};
pub use splitter::{Name, NameSplitter, NameTokens};

/// Writing convention of a name, detected from its script.
///
/// Selects how a name is split into components and joined back together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// Space separated, given name first.
    Western,
    /// Chinese, Japanese or Korean: family name first, usually no spaces.
    Cjk,
}

impl NameStyle {
    /// Detects the style of a name. Any CJK character makes the name CJK.
    pub fn detect(name: &str) -> Self {
        if name.chars().any(is_cjk) {
            NameStyle::Cjk
        } else {
            NameStyle::Western
        }
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x11FF      // Hangul Jamo
        | 0x3040..=0x30FF    // Hiragana, Katakana
        | 0x3400..=0x4DBF    // CJK Extension A
        | 0x4E00..=0x9FFF    // CJK Unified Ideographs
        | 0xAC00..=0xD7AF    // Hangul syllables
        | 0xF900..=0xFAFF    // CJK compatibility ideographs
    )
}
