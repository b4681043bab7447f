//! Instruction templates for the completion service.
//!
//! Every extraction prompt asks for a single JSON object so the reply can be
//! parsed strictly.

use cvmatch_core::types::FewShotExample;

pub const CONDITIONS_SYSTEM: &str = "You are an assistant that extracts mandatory conditions from job descriptions.";

pub const CV_SYSTEM: &str = "You are an assistant that extracts structured data from CV text.";

pub const REFINE_SYSTEM: &str =
    "You are a highly precise assistant. Always produce structured and consistent outputs based on the examples and instructions.";

pub const QA_SYSTEM: &str = "You answer questions about a candidate using only the CV excerpts provided.";

pub fn conditions_prompt(job_description: &str) -> String {
    format!(
        r#"Given the following job description, extract the mandatory conditions:
- Job title
- Years of experience (null if the description does not state one)
- Skills (technologies, programming languages, etc. Use [] if none are mentioned)
- Certifications (if any)
- Tools (if any)

Job Description:
{job_description}

Reply with one JSON object and nothing else:
{{"job_title": "<job title>", "years_of_experience": <integer or null>, "skills": ["<skill>", ...], "certifications": ["<certification>", ...], "tools": ["<tool>", ...]}}"#
    )
}

pub fn cv_prompt(cv_text: &str) -> String {
    format!(
        r#"From the CV text below extract:
- job_title: the job title only, without seniority words such as junior or senior (for "senior engineer" answer "engineer").
- skills: technologies, programming languages and similar, taken ONLY from the skills section.
- years_of_experience: find the employment date ranges (format "YYYY-MM to YYYY-MM" or similar; a range with no end date runs to today) and give the total years as an integer. Ignore education and personal information when counting.
- certifications: certifications the candidate holds, [] if none.
- tools: tools and platforms the candidate uses, [] if none.

Reply with one JSON object and nothing else:
{{"job_title": "<job title>", "years_of_experience": <integer>, "skills": ["<skill>", ...], "certifications": ["<certification>", ...], "tools": ["<tool>", ...]}}

CV text:
{cv_text}"#
    )
}

/// Few-shot refinement prompt: user input, numbered examples with their
/// mandatory keywords, optional instructions, closing request.
pub fn refine_prompt(user_input: &str, examples: &[FewShotExample], instructions: &str) -> String {
    let mut prompt = format!("User Input: {}\n\n", user_input.trim());
    prompt.push_str("Relevant Job Descriptions and Mandatory Keywords:\n");
    for (i, example) in examples.iter().enumerate() {
        prompt.push_str(&format!("\nExample {}:\n", i + 1));
        prompt.push_str(&format!("Job Description: {}\n", example.job_description.trim()));
        prompt.push_str(&format!("Mandatory Keywords: {}\n", example.mandatory_keywords.join(", ")));
    }
    if !instructions.trim().is_empty() {
        prompt.push_str(&format!("\nInstructions:\n{}\n", instructions.trim()));
    }
    prompt.push_str("\nPlease refine the user's input based on the above examples and instructions.");
    prompt
}

pub fn qa_prompt(question: &str, excerpts: &[String]) -> String {
    let mut prompt = String::from("CV excerpts:\n");
    for (i, excerpt) in excerpts.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, excerpt));
    }
    prompt.push_str(&format!("\nQuestion: {}\nAnswer using only the excerpts above. If they do not contain the answer, say so.", question.trim()));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refine_prompt_numbers_examples_and_appends_instructions() {
        let examples = vec![
            FewShotExample { job_description: " Need a doctor ".into(), mandatory_keywords: vec!["doctor".into(), "mbbs".into()] },
            FewShotExample { job_description: "Need a nurse".into(), mandatory_keywords: vec![] },
        ];
        let prompt = refine_prompt("find a doctor", &examples, "Keep it short.");
        assert!(prompt.starts_with("User Input: find a doctor\n\n"));
        assert!(prompt.contains("Example 1:\nJob Description: Need a doctor\nMandatory Keywords: doctor, mbbs\n"));
        assert!(prompt.contains("Example 2:"));
        assert!(prompt.contains("\nInstructions:\nKeep it short.\n"));
        assert!(prompt.ends_with("examples and instructions."));
    }

    #[test]
    fn refine_prompt_skips_blank_instructions() {
        assert!(!refine_prompt("x", &[], "  ").contains("Instructions:"));
    }
}
