use cvmatch_core::config::SegmenterSettings;
use cvmatch_core::types::{Document, GENERAL_SECTION};
use cvmatch_text::Segmenter;
use indexmap::IndexMap;

const CV: &str = "Jane Doe\njane@example.com\n\nSummary\nBackend engineer who ships.\n\nTechnical Skills\nPython, Django, SQL\n\nWork Experience\nAcme Corp 2019-01 to 2024-01. Built APIs.\n\nEducation\nBSc Computer Science";

#[test]
fn empty_table_yields_single_general_section() {
    let segmenter = Segmenter::new(IndexMap::new(), 80);
    let text = "  Line one.\n\nLine   two!  And three ";
    let sections = segmenter.segment(text);
    assert_eq!(sections.len(), 1);
    let expected = text.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(sections.get(GENERAL_SECTION), Some(&expected));
}

#[test]
fn empty_text_still_has_general() {
    let segmenter = Segmenter::from_settings(&SegmenterSettings::default());
    let sections = segmenter.segment("");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections.get(GENERAL_SECTION).map(String::as_str), Some(""));
}

#[test]
fn default_table_finds_cv_sections_in_order() {
    let segmenter = Segmenter::from_settings(&SegmenterSettings::default());
    let sections = segmenter.segment(CV);
    let names: Vec<&str> = sections.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["General", "Summary", "Skills", "Work Experience", "Education"]);
    assert!(sections["General"].contains("jane@example.com"));
    assert!(sections["Skills"].contains("Python, Django, SQL"));
    assert!(sections["Work Experience"].starts_with("Work Experience"));
    assert!(sections["Education"].contains("BSc Computer Science"));
}

#[test]
fn revisited_section_appends() {
    let mut table = IndexMap::new();
    table.insert("Skills".to_string(), vec!["skills".to_string()]);
    table.insert("Education".to_string(), vec!["education".to_string()]);
    let segmenter = Segmenter::new(table, 80);
    let sections = segmenter.segment("Skills\nRust\nEducation\nMSc\nMore skills\nGo");
    assert_eq!(sections.len(), 3);
    assert_eq!(sections["Skills"], "Skills Rust More skills Go");
    assert_eq!(sections["Education"], "Education MSc");
}

#[test]
fn threshold_is_configurable() {
    let mut table = IndexMap::new();
    table.insert("Education".to_string(), vec!["education".to_string()]);
    let loose = Segmenter::new(table.clone(), 80).segment("Educaton\nMSc");
    let strict = Segmenter::new(table, 100).segment("Educaton\nMSc");
    assert!(loose.contains_key("Education"));
    assert!(!strict.contains_key("Education"));
}

#[test]
fn segment_document_fills_sections() {
    let segmenter = Segmenter::from_settings(&SegmenterSettings::default());
    let doc = segmenter.segment_document(Document::new("jane", CV));
    assert_eq!(doc.id, "jane");
    assert!(doc.sections.contains_key("Skills"));
}

#[test]
fn unit_scoring_exactly_the_threshold_is_not_a_heading() {
    assert_eq!(cvmatch_text::fuzzy::partial_ratio("ran an experiment.", "experience"), 80.0);

    let segmenter = Segmenter::from_settings(&SegmenterSettings::default());
    let sections = segmenter.segment("Jane Doe\nRan an experiment.");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[GENERAL_SECTION], "Jane Doe Ran an experiment.");

    let mut table = IndexMap::new();
    table.insert("Work Experience".to_string(), vec!["experience".to_string()]);
    let looser = Segmenter::new(table, 79).segment("Jane Doe\nRan an experiment.");
    assert!(looser.contains_key("Work Experience"));
}
