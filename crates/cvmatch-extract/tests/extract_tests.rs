use std::sync::{Arc, Mutex};
use std::time::Duration;

use cvmatch_core::config::CompletionSettings;
use cvmatch_core::resilience::{CircuitBreaker, RetryPolicy};
use cvmatch_core::types::{CompletionRequest, FewShotExample};
use cvmatch_core::{CompletionProvider, Error};
use cvmatch_embed::FakeEmbedder;
use cvmatch_extract::testing::ScriptedCompletion;
use cvmatch_extract::{CompletionParams, ConditionExtractor, CvExtractor, OpenAiCompletion, PromptRefiner};
use cvmatch_vector::InMemoryIndex;
use httpmock::prelude::*;
use serde_json::json;

const JOB: &str = "Need a Software Engineer, 3+ years, Python and Django required";
const CONDITIONS_REPLY: &str =
    r#"{"job_title": "software engineer", "years_of_experience": 3, "skills": ["python", "django"], "certifications": [], "tools": []}"#;

#[test]
fn condition_extraction_matches_example() {
    let completion = Arc::new(ScriptedCompletion::new().then_reply(CONDITIONS_REPLY));
    let extractor = ConditionExtractor::new(completion, 16, CompletionParams::default());
    let (extraction, keywords) = extractor.extract_with_keywords(JOB);
    assert!(!extraction.is_degraded());
    let conditions = extraction.record();
    assert_eq!(conditions.job_title, "software engineer");
    assert_eq!(conditions.years_of_experience, Some(3));
    assert!(conditions.skills.contains("python") && conditions.skills.contains("django"));
    assert_eq!(keywords, vec!["software engineer", "3", "django", "python"]);
}

#[test]
fn second_call_with_same_normalized_text_is_a_cache_hit() {
    let completion = Arc::new(ScriptedCompletion::new().then_reply(CONDITIONS_REPLY));
    let extractor = ConditionExtractor::new(completion.clone(), 16, CompletionParams::default());
    let first = extractor.extract(JOB).into_record();
    let second = extractor.extract(&format!("  {}  ", JOB.to_uppercase())).into_record();
    assert_eq!(first, second);
    assert_eq!(completion.calls(), 1);
    assert_eq!(extractor.cache().stats().hits, 1);
}

#[test]
fn service_failure_degrades_and_is_not_cached() {
    let failing = Arc::new(ScriptedCompletion::new().fail_when("Job Description"));
    let extractor = ConditionExtractor::new(failing.clone(), 16, CompletionParams::default());
    let out = extractor.extract(JOB);
    assert!(out.is_degraded());
    assert!(matches!(out.cause(), Some(Error::CompletionUnavailable(_))));
    assert_eq!(out.record().years_of_experience, None);
    assert!(extractor.cache().is_empty());
    extractor.extract(JOB);
    assert_eq!(failing.calls(), 2);
}

#[test]
fn unparseable_reply_degrades_with_parse_error() {
    let completion = Arc::new(ScriptedCompletion::new().then_reply("I think they need Python."));
    let extractor = ConditionExtractor::new(completion, 16, CompletionParams::default());
    let out = extractor.extract(JOB);
    assert!(matches!(out.cause(), Some(Error::ExtractionParse(_))));
}

#[test]
fn cv_extraction_defaults_years_and_caches() {
    let completion = Arc::new(
        ScriptedCompletion::new().when("Jane", r#"{"job_title": "Engineer", "skills": ["Python", "SQL"], "tools": ["Git"]}"#),
    );
    let extractor = CvExtractor::new(completion.clone(), 16, CompletionParams::default());
    let info = extractor.extract("Jane Doe\nSkills\nPython, SQL").into_record();
    assert_eq!(info.years_of_experience, 0);
    assert!(info.tools.contains("git"));
    extractor.extract("jane doe skills python, sql");
    assert_eq!(completion.calls(), 1);
}

#[test]
fn extraction_requests_are_deterministic() {
    let completion = Arc::new(ScriptedCompletion::new().then_reply(CONDITIONS_REPLY));
    let extractor = ConditionExtractor::new(completion.clone(), 16, CompletionParams::default());
    extractor.extract(JOB);
    let prompts = completion.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(JOB));
}

fn refiner(completion: Arc<ScriptedCompletion>, index: Arc<InMemoryIndex>) -> PromptRefiner {
    PromptRefiner::new(
        Arc::new(FakeEmbedder::new(64)),
        index,
        completion,
        "examples_and_instructions",
        5,
        16,
        CompletionParams::default(),
    )
}

#[test]
fn refine_without_examples_returns_raw_description() {
    let completion = Arc::new(ScriptedCompletion::new());
    let out = refiner(completion.clone(), Arc::new(InMemoryIndex::new())).refine(JOB);
    assert!(!out.is_degraded());
    assert_eq!(out.record(), JOB);
    assert_eq!(completion.calls(), 0);
}

#[test]
fn refine_uses_seeded_examples_and_caches() {
    let index = Arc::new(InMemoryIndex::new());
    let completion = Arc::new(ScriptedCompletion::new().when("Example 1:", "  We are seeking a Software Engineer with 3+ years.  "));
    let refiner = refiner(completion.clone(), index.clone());
    let examples = vec![FewShotExample {
        job_description: "We are seeking a Doctor with an MBBS degree.".into(),
        mandatory_keywords: vec!["doctor".into(), "mbbs".into()],
    }];
    assert_eq!(refiner.seed_examples(&examples, "Keep the original requirements.").unwrap(), 2);
    assert_eq!(index.len("examples_and_instructions"), 2);

    let (found, instructions) = refiner.retrieve(JOB).unwrap();
    assert_eq!(found, examples);
    assert_eq!(instructions, "Keep the original requirements.");

    let refined = refiner.refine(JOB).into_record();
    assert_eq!(refined, "we are seeking a software engineer with 3+ years.");
    refiner.refine(JOB);
    assert_eq!(completion.calls(), 1);
    assert!(completion.prompts()[0].contains("Mandatory Keywords: doctor, mbbs"));
}

#[test]
fn refine_failure_falls_back_to_raw_description() {
    let index = Arc::new(InMemoryIndex::new());
    let completion = Arc::new(ScriptedCompletion::new().fail_when("User Input"));
    let refiner = refiner(completion, index);
    refiner.seed_examples(&[FewShotExample { job_description: "x".into(), mandatory_keywords: vec![] }], "").unwrap();
    let out = refiner.refine(JOB);
    assert!(out.is_degraded());
    assert_eq!(out.record(), JOB);
}

#[test]
fn openai_completion_returns_first_choice() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions").header("authorization", "Bearer k");
        then.status(200).json_body(json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]}));
    });
    let policy = RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2) };
    let client =
        OpenAiCompletion::new("k", &server.base_url(), "gpt-3.5-turbo", Duration::from_secs(5), policy, CircuitBreaker::default()).unwrap();
    let request = CompletionRequest { system: "s".into(), prompt: "p".into(), temperature: 0.0, max_tokens: 300 };
    assert_eq!(client.complete(&request).unwrap(), "hello");
    mock.assert();
}

#[test]
fn openai_completion_maps_failures() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(429);
    });
    let policy = RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2) };
    let client =
        OpenAiCompletion::new("k", &server.base_url(), "gpt-3.5-turbo", Duration::from_secs(5), policy, CircuitBreaker::default()).unwrap();
    let request = CompletionRequest { system: "s".into(), prompt: "p".into(), temperature: 0.0, max_tokens: 300 };
    assert!(matches!(client.complete(&request), Err(Error::CompletionUnavailable(_))));
}

/// Remembers the temperature of every request.
#[derive(Default)]
struct TemperatureLog(Mutex<Vec<f32>>);

impl CompletionProvider for TemperatureLog {
    fn complete(&self, request: &CompletionRequest) -> cvmatch_core::Result<String> {
        self.0.lock().unwrap().push(request.temperature);
        Ok(CONDITIONS_REPLY.to_string())
    }
}

#[test]
fn extraction_runs_at_zero_temperature_whatever_the_settings() {
    let settings = CompletionSettings { temperature: 0.7, max_tokens: 200, ..CompletionSettings::default() };
    let params = CompletionParams::from_settings(&settings);
    assert_eq!(params, CompletionParams { temperature: 0.0, max_tokens: 200 });

    let log = Arc::new(TemperatureLog::default());
    ConditionExtractor::new(log.clone(), 16, params).extract(JOB);
    CvExtractor::new(log.clone(), 16, params).extract("Jane Doe, Python developer");
    assert_eq!(*log.0.lock().unwrap(), vec![0.0, 0.0]);
}
