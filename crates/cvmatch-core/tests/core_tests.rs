use std::fs;
use std::io::Write;
use tempfile::TempDir;

use cvmatch_core::config::{Config, EmbeddingProvider, Settings};
use cvmatch_core::data_processor::{ChunkingConfig, DataProcessor};
use cvmatch_core::types::TitleMatch;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;

#[test]
fn load_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("Jane Doe.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Skills: Python").unwrap();

    let processor = DataProcessor::new();
    let docs = processor.load_directory(dir).expect("load");

    assert_eq!(docs.len(), 1, "one file becomes one document");
    assert_eq!(docs[0].id, "Jane Doe");
    assert_eq!(docs[0].raw_text.trim(), "Skills: Python");
    assert!(docs[0].sections.is_empty(), "sections are left for the segmenter");
}

#[test]
fn load_directory_skips_other_extensions_and_sorts() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.md"), "bravo").unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join("c.pdf"), "binary").unwrap();

    let docs = DataProcessor::new().load_directory(dir).expect("load");
    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn load_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let docs = DataProcessor::new().load_directory_limited(dir, 1).expect("load limited");
    assert_eq!(docs.len(), 1, "limited to one source document");
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("x.txt"), [b'o', b'k', 0xff, b'!']).unwrap();
    let docs = DataProcessor::new().load_directory(tmp.path()).expect("load");
    assert!(docs[0].raw_text.starts_with("ok"));
    assert!(docs[0].raw_text.ends_with('!'));
}

#[test]
fn chunk_text_overlaps_windows() {
    let processor = DataProcessor::with_chunking(ChunkingConfig { words_per_chunk: 4, overlap_percent: 0.5 });
    let chunks = processor.chunk_text("a b c d e f g");
    assert_eq!(chunks, vec!["a b c d", "c d e f", "e f g"]);
    assert!(processor.chunk_text("   ").is_empty());
}

#[test]
fn default_settings_match_observed_constants() {
    let settings = Settings::default();
    assert!((settings.ranking.alpha - 0.20).abs() < f32::EPSILON);
    assert_eq!(settings.ranking.top_k, 10);
    assert_eq!(settings.segmenter.threshold, 80);
    assert_eq!(settings.validation.title_match, TitleMatch::Substring);
    assert!(settings.validation.check_certifications);
    assert!(settings.validation.check_tools);
    assert_eq!(settings.index.cv_namespace, "cvs-info");
    assert!(settings.validate().is_ok());
}

#[test]
fn toml_overrides_merge_over_defaults() {
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
        r#"
        [embedding]
        provider = "fake"
        dimensions = 64

        [ranking]
        alpha = 0.5

        [validation]
        title_match = "set_membership"
        "#,
    ));
    let config = Config::from_figment(figment).expect("config");
    let settings = config.settings().expect("settings");
    assert_eq!(settings.embedding.provider, EmbeddingProvider::Fake);
    assert_eq!(settings.embedding.dimensions, 64);
    assert!((settings.ranking.alpha - 0.5).abs() < f32::EPSILON);
    assert_eq!(settings.validation.title_match, TitleMatch::SetMembership);
    assert_eq!(settings.ranking.top_k, 10, "untouched keys keep defaults");
    let top_k: usize = config.get("ranking.top_k").expect("get");
    assert_eq!(top_k, 10);
}

#[test]
fn out_of_range_alpha_is_rejected() {
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string("[ranking]\nalpha = 1.5\n"));
    assert!(Config::from_figment(figment).is_err());
}
