use cvmatch_text::sparse::term_index;
use cvmatch_text::{Bm25Params, CorpusStats, SparseEncoder};

#[test]
fn batch_emits_one_vector_per_text_in_order() {
    let encoder = SparseEncoder::default();
    let texts = ["python django", "java spring boot", "python"];
    let vectors = encoder.encode_batch(&texts);
    assert_eq!(vectors.len(), 3);
    assert_eq!(vectors[0].len(), 2);
    assert_eq!(vectors[1].len(), 3);
    assert_eq!(vectors[2].indices(), &[term_index("python")]);
    for v in &vectors {
        assert!(v.indices().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(v.indices().len(), v.values().len());
        assert!(v.values().iter().all(|w| *w > 0.0));
    }
}

#[test]
fn rarer_terms_weigh_more_within_a_batch() {
    let encoder = SparseEncoder::default();
    let vectors = encoder.encode_batch(&["python rust", "python go", "python java"]);
    let first = &vectors[0];
    let weight = |term: &str| {
        let idx = term_index(term);
        first.indices().iter().position(|i| *i == idx).map(|p| first.values()[p])
    };
    assert!(weight("rust").unwrap() > weight("python").unwrap());
}

#[test]
fn corpus_stats_make_query_comparable_across_calls() {
    let corpus = ["senior python developer django", "accountant quickbooks", "python data scientist"];
    let stats = CorpusStats::from_texts(&corpus);
    let encoder = SparseEncoder::new(Bm25Params::default());

    let docs: Vec<_> = corpus.iter().map(|t| encoder.encode_document(t, &stats)).collect();
    let query = encoder.encode_query("python django", &stats);

    let scores: Vec<f32> = docs.iter().map(|d| d.dot(&query)).collect();
    assert!(scores[0] > scores[2], "both terms beat one term");
    assert!(scores[2] > scores[1]);
    assert_eq!(scores[1], 0.0);
}

#[test]
fn query_against_empty_stats_is_uniform() {
    let query = SparseEncoder::default().encode_query("python django", &CorpusStats::new());
    assert_eq!(query.len(), 2);
    assert!((query.values()[0] - query.values()[1]).abs() < 1e-6);
}

#[test]
fn stats_round_trip_through_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("stats/corpus.json");
    assert_eq!(CorpusStats::load(&path).unwrap(), CorpusStats::new());
    let stats = CorpusStats::from_texts(&["a b", "b c"]);
    stats.save(&path).unwrap();
    assert_eq!(CorpusStats::load(&path).unwrap(), stats);
}

#[test]
fn new_document_is_weighted_as_if_already_counted() {
    let encoder = SparseEncoder::default();
    let text = "python django python rest";
    let before = CorpusStats::from_texts(&["python flask", "java spring boot"]);

    let pending = encoder.encode_new_document(text, &before);
    assert_eq!(before.doc_count(), 2, "stats are not touched");

    let mut after = before.clone();
    after.add_document(&cvmatch_text::sparse::tokenize(text));
    assert_eq!(pending, encoder.encode_document(text, &after));
}
