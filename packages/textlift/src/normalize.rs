//! Cleanup routines applied to recognized text before it is reported.
use regex::Regex;
use std::sync::OnceLock;

/// Characters OCR engines commonly emit in place of a letter, paired with the
/// letter they stand for when they sit inside a word.
const AMBIGUOUS_CHARACTERS: &[(char, char)] = &[('0', 'O'), ('1', 'l')];

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn whitespace() -> &'static Regex {
  WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static whitespace pattern"))
}

/// Collapses every whitespace run (spaces, tabs, newlines) to a single space
/// and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
  whitespace().replace_all(text, " ").trim().to_string()
}

/// Replaces an ambiguous digit with its letter only when the characters
/// immediately before and after it are both ASCII letters. Numeric tokens are
/// left alone.
pub fn substitute_ambiguous(text: &str) -> String {
  let mut chars: Vec<char> = text.chars().collect();

  for &(from, to) in AMBIGUOUS_CHARACTERS {
    // Context is read from the text as it stood before this pass.
    let snapshot = chars.clone();
    for i in 1..snapshot.len().saturating_sub(1) {
      if snapshot[i] == from
        && snapshot[i - 1].is_ascii_alphabetic()
        && snapshot[i + 1].is_ascii_alphabetic()
      {
        chars[i] = to;
      }
    }
  }

  chars.into_iter().collect()
}

/// Joins soft-wrapped words (`hyphen` + newline) and turns remaining line
/// breaks into spaces.
pub fn repair_line_breaks(text: &str) -> String {
  text.replace("-\n", "").replace('\n', " ")
}

/// Normalizes a single recognized string.
///
/// Order matters and must stay as is:
/// 1. Collapse whitespace
/// 2. Substitute ambiguous characters inside words
/// 3. Repair line breaks
/// 4. Collapse whitespace again and trim
pub fn normalize_text(text: &str) -> String {
  if text.is_empty() {
    return String::new();
  }
  let collapsed = collapse_whitespace(text);
  let substituted = substitute_ambiguous(&collapsed);
  let repaired = repair_line_breaks(&substituted);
  collapse_whitespace(&repaired)
}

/// Joins recognized lines with single spaces and normalizes the result.
pub fn normalize_lines<S: AsRef<str>>(lines: &[S]) -> String {
  let joined = lines.iter().map(|l| l.as_ref()).collect::<Vec<&str>>().join(" ");
  normalize_text(&joined)
}
