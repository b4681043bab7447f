use indexmap::IndexMap;
use tracing::trace;

use cvmatch_core::config::SegmenterSettings;
use cvmatch_core::types::{Document, Sections, GENERAL_SECTION};

use crate::fuzzy::partial_ratio;

/// Splits résumé text into named sections by fuzzy heading detection.
///
/// Each sentence-like unit is scored against every synonym of every known
/// section. A unit scoring above `threshold` switches the current section
/// (the unit itself belongs to the new section); anything else is appended
/// to the current one. Text before the first heading lands in `General`.
///
/// Approximate by nature: a heading word inside an ordinary sentence can
/// switch sections.
#[derive(Debug, Clone)]
pub struct Segmenter {
    threshold: f64,
    table: IndexMap<String, Vec<String>>,
}

impl Segmenter {
    pub fn new(table: IndexMap<String, Vec<String>>, threshold: u8) -> Self {
        let table = table
            .into_iter()
            .map(|(name, synonyms)| (name, synonyms.iter().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect()))
            .collect();
        Self { threshold: f64::from(threshold), table }
    }

    pub fn from_settings(settings: &SegmenterSettings) -> Self {
        Self::new(settings.sections.clone(), settings.threshold)
    }

    /// Never fails; the result always holds at least the `General` section.
    pub fn segment(&self, raw_text: &str) -> Sections {
        let mut parts: IndexMap<String, Vec<String>> = IndexMap::new();
        parts.insert(GENERAL_SECTION.to_string(), Vec::new());
        let mut current = GENERAL_SECTION.to_string();

        for unit in split_units(raw_text) {
            if let Some(section) = self.detect_heading(&unit) {
                trace!(section, unit = %unit, "heading detected");
                current = section.to_string();
            }
            parts.entry(current.clone()).or_default().push(unit);
        }

        parts.into_iter().map(|(name, units)| (name, units.join(" "))).collect()
    }

    pub fn segment_document(&self, document: Document) -> Document {
        let sections = self.segment(&document.raw_text);
        document.with_sections(sections)
    }

    /// Best-scoring section strictly above the threshold; ties go to the
    /// section listed first.
    fn detect_heading(&self, unit: &str) -> Option<&str> {
        let unit = unit.to_lowercase();
        let mut best: Option<(&str, f64)> = None;
        for (section, synonyms) in &self.table {
            for synonym in synonyms {
                let score = partial_ratio(&unit, synonym);
                if score > self.threshold && best.map_or(true, |(_, s)| score > s) {
                    best = Some((section.as_str(), score));
                }
            }
        }
        best.map(|(section, _)| section)
    }
}

/// Sentence-like units: line breaks and `.`/`!`/`?` followed by whitespace
/// end a unit. Units are trimmed and empty ones dropped.
fn split_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\n' || ch == '\r' {
            flush(&mut current, &mut units);
            continue;
        }
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().map_or(true, |next| next.is_whitespace()) {
            flush(&mut current, &mut units);
        }
    }
    flush(&mut current, &mut units);
    units
}

fn flush(current: &mut String, units: &mut Vec<String>) {
    let unit = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !unit.is_empty() {
        units.push(unit);
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_split_on_lines_and_terminators() {
        let units = split_units("Hello world. Next one!\nThird line\n\n3.5 years? yes");
        assert_eq!(units, vec!["Hello world.", "Next one!", "Third line", "3.5 years?", "yes"]);
    }

    #[test]
    fn decimal_points_do_not_split() {
        assert_eq!(split_units("Python 3.11 and Go 1.22"), vec!["Python 3.11 and Go 1.22"]);
    }
}
