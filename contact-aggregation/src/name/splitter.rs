// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Structured Name Splitting
//!
//! Splits a free-form full name into prefix, given, middle, family and
//! suffix using word lists for honorifics, family-name particles, suffixes
//! and conjunctions.

use std::collections::HashSet;

use super::NameStyle;

/// Maximum number of tokens considered in a name. Extra tokens are dropped.
pub const MAX_TOKENS: usize = 10;

const ENGLISH_PREFIXES: &[&str] = &[
    "1LT", "1ST", "2LT", "2ND", "3RD", "ADMIRAL", "CAPT", "CAPTAIN", "COL", "CPT", "DR", "GEN",
    "GENERAL", "LCDR", "LT", "LTC", "LTG", "LTJG", "MAJ", "MAJOR", "MG", "MR", "MRS", "MS",
    "PASTOR", "PROF", "REP", "REVEREND", "REV", "SEN", "ST",
];

const ENGLISH_SUFFIXES: &[&str] = &[
    "B.A.", "BA", "D.D.S.", "DDS", "ESQ", "ESQ.", "I", "II", "III", "IV", "IX", "JR.", "M.A.",
    "M.D.", "MA", "MD", "MS", "PH.D.", "PHD", "SR.", "V", "VI", "VII", "VIII", "X",
];

const ENGLISH_LAST_NAME_PREFIXES: &[&str] = &[
    "D'", "DE", "DEL", "DER", "DI", "LA", "LE", "MC", "SAN", "ST", "TER", "VAN", "VON",
];

const ENGLISH_CONJUNCTIONS: &[&str] = &["&", "AND", "OR"];

/// A name split into its structured components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Name {
    pub prefix: Option<String>,
    pub given: Option<String>,
    pub middle: Option<String>,
    pub family: Option<String>,
    pub suffix: Option<String>,
}

impl Name {
    /// Returns true if no component is set.
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none()
            && self.given.is_none()
            && self.middle.is_none()
            && self.family.is_none()
            && self.suffix.is_none()
    }
}

/// Tokens of a full name, remembering which were followed by a dot or comma.
#[derive(Debug, Clone, Default)]
pub struct NameTokens {
    tokens: Vec<String>,
    dots: Vec<bool>,
    commas: Vec<bool>,
}

impl NameTokens {
    /// Splits on spaces, periods and commas. Keeps at most [`MAX_TOKENS`].
    pub fn tokenize(full_name: &str) -> Self {
        let mut result = NameTokens::default();
        let mut current = String::new();

        for c in full_name.chars() {
            if c != '.' && c != ',' && !c.is_whitespace() {
                current.push(c);
                continue;
            }
            if !result.flush(&mut current) {
                return result;
            }
            match c {
                '.' => {
                    if let Some(dot) = result.dots.last_mut() {
                        *dot = true;
                    }
                }
                ',' => {
                    if let Some(comma) = result.commas.last_mut() {
                        *comma = true;
                    }
                }
                _ => {}
            }
        }
        result.flush(&mut current);
        result
    }

    /// Pushes the pending token. Returns false once the token cap is hit.
    fn flush(&mut self, current: &mut String) -> bool {
        if current.is_empty() {
            return true;
        }
        if self.tokens.len() == MAX_TOKENS {
            current.clear();
            return false;
        }
        self.tokens.push(std::mem::take(current));
        self.dots.push(false);
        self.commas.push(false);
        true
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Consumes the tokenizer, returning the bare tokens.
    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    pub fn has_dot(&self, index: usize) -> bool {
        self.dots.get(index).copied().unwrap_or(false)
    }

    pub fn has_comma(&self, index: usize) -> bool {
        self.commas.get(index).copied().unwrap_or(false)
    }

    fn with_dot(&self, index: usize) -> String {
        if self.has_dot(index) {
            format!("{}.", self.tokens[index])
        } else {
            self.tokens[index].clone()
        }
    }
}

/// Unconsumed token range during a split.
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Splits and joins personal names using locale word lists.
#[derive(Debug, Clone)]
pub struct NameSplitter {
    prefixes: HashSet<String>,
    suffixes: HashSet<String>,
    last_name_prefixes: HashSet<String>,
    conjunctions: HashSet<String>,
    max_suffix_length: usize,
}

impl Default for NameSplitter {
    fn default() -> Self {
        Self::english()
    }
}

impl NameSplitter {
    /// Creates a splitter from word lists. Entries are matched case-insensitively.
    pub fn new(
        prefixes: &[&str],
        suffixes: &[&str],
        last_name_prefixes: &[&str],
        conjunctions: &[&str],
    ) -> Self {
        let upper = |words: &[&str]| -> HashSet<String> {
            words.iter().map(|w| w.to_uppercase()).collect()
        };
        let suffixes = upper(suffixes);
        let max_suffix_length = suffixes
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);

        NameSplitter {
            prefixes: upper(prefixes),
            suffixes,
            last_name_prefixes: upper(last_name_prefixes),
            conjunctions: upper(conjunctions),
            max_suffix_length,
        }
    }

    /// Splitter with the built-in English word lists.
    pub fn english() -> Self {
        Self::new(
            ENGLISH_PREFIXES,
            ENGLISH_SUFFIXES,
            ENGLISH_LAST_NAME_PREFIXES,
            ENGLISH_CONJUNCTIONS,
        )
    }

    /// Splits a full name into its components.
    pub fn split(&self, full_name: &str) -> Name {
        let mut name = Name::default();
        let trimmed = full_name.trim();
        if trimmed.is_empty() {
            return name;
        }

        if NameStyle::detect(trimmed) == NameStyle::Cjk && !trimmed.contains(char::is_whitespace)
        {
            return split_cjk(trimmed);
        }

        let tokens = NameTokens::tokenize(trimmed);
        let mut span = Span {
            start: 0,
            end: tokens.len(),
        };

        self.parse_prefix(&mut name, &tokens, &mut span);

        // Two tokens are a given and family name, never a suffix ("John Ma")
        if span.len() > 2 {
            self.parse_suffix(&mut name, &tokens, &mut span);
        }

        if name.prefix.is_none() && span.len() == 1 {
            name.given = Some(tokens.tokens[span.start].clone());
            return name;
        }

        self.parse_family(&mut name, &tokens, &mut span);
        self.parse_middle(&mut name, &tokens, &mut span);
        parse_given(&mut name, &tokens, &span);
        name
    }

    /// Flattens a name to "given family" (family first for CJK names).
    ///
    /// This is a display form; it does not round-trip through [`split`](Self::split).
    pub fn join(&self, name: &Name) -> String {
        match (name.given.as_deref(), name.family.as_deref()) {
            (Some(given), Some(family)) => {
                let style = NameStyle::detect(&format!("{}{}", family, given));
                match style {
                    NameStyle::Cjk => format!("{}{}", family, given),
                    NameStyle::Western => format!("{} {}", given, family),
                }
            }
            (Some(given), None) => given.to_string(),
            (None, Some(family)) => family.to_string(),
            (None, None) => String::new(),
        }
    }

    fn parse_prefix(&self, name: &mut Name, tokens: &NameTokens, span: &mut Span) {
        if span.len() == 0 {
            return;
        }
        let first = &tokens.tokens[span.start];
        if self.prefixes.contains(&first.to_uppercase()) {
            name.prefix = Some(tokens.with_dot(span.start));
            span.start += 1;
        }
    }

    fn parse_suffix(&self, name: &mut Name, tokens: &NameTokens, span: &mut Span) {
        let last_index = span.end - 1;

        // "John Smith, Esq": an explicit comma marks whatever follows as the suffix
        if tokens.has_comma(last_index - 1) {
            name.suffix = Some(tokens.with_dot(last_index));
            span.end -= 1;
            return;
        }

        let last = &tokens.tokens[last_index];
        if last.chars().count() > self.max_suffix_length {
            return;
        }

        let mut normalized = last.to_uppercase();
        if self.suffixes.contains(&normalized) {
            name.suffix = Some(last.clone());
            span.end -= 1;
            return;
        }

        // Grow leftwards to catch dotted suffixes such as "M.D." and "D.D.S."
        let mut display = tokens.with_dot(last_index);
        normalized.push('.');
        let mut pos = last_index;
        while normalized.chars().count() <= self.max_suffix_length {
            if self.suffixes.contains(&normalized) {
                name.suffix = Some(display);
                span.end = pos;
                return;
            }
            if pos == span.start {
                break;
            }
            pos -= 1;
            let separator = if tokens.has_dot(pos) { "." } else { " " };
            display = format!("{}{}{}", tokens.tokens[pos], separator, display);
            normalized = format!("{}.{}", tokens.tokens[pos].to_uppercase(), normalized);
        }
    }

    fn parse_family(&self, name: &mut Name, tokens: &NameTokens, span: &mut Span) {
        if span.len() == 0 {
            return;
        }

        // "Smith, John": a comma after the first word marks it as the family name
        if tokens.has_comma(span.start) {
            name.family = Some(tokens.tokens[span.start].clone());
            span.start += 1;
            return;
        }

        let mut family = tokens.tokens[span.end - 1].clone();
        span.end -= 1;

        // "von Neumann", "d' Artagnan"
        if span.len() > 0 {
            let particle_index = span.end - 1;
            let particle = tokens.tokens[particle_index].to_uppercase();
            if self.last_name_prefixes.contains(&particle)
                || self.last_name_prefixes.contains(&format!("{}.", particle))
            {
                family = format!("{} {}", tokens.with_dot(particle_index), family);
                span.end -= 1;
            }
        }
        name.family = Some(family);
    }

    fn parse_middle(&self, name: &mut Name, tokens: &NameTokens, span: &mut Span) {
        if span.len() < 2 {
            return;
        }
        let before_last = tokens.tokens[span.end - 2].to_uppercase();
        if span.len() == 2 || !self.conjunctions.contains(&before_last) {
            name.middle = Some(tokens.with_dot(span.end - 1));
            span.end -= 1;
        }
    }
}

fn parse_given(name: &mut Name, tokens: &NameTokens, span: &Span) {
    if span.len() == 0 {
        return;
    }
    let given = (span.start..span.end)
        .map(|i| tokens.with_dot(i))
        .collect::<Vec<_>>()
        .join(" ");
    name.given = Some(given);
}

/// Family name first, written without spaces.
fn split_cjk(full_name: &str) -> Name {
    let mut chars = full_name.chars();
    let first = chars.next().map(String::from);
    let rest: String = chars.collect();

    if rest.is_empty() {
        Name {
            given: first,
            ..Name::default()
        }
    } else {
        Name {
            family: first,
            given: Some(rest),
            ..Name::default()
        }
    }
}
