//! Hard-requirement gate applied after retrieval.

use std::collections::BTreeSet;

use cvmatch_core::config::ValidationSettings;
use cvmatch_core::normalize::normalize_text;
use cvmatch_core::types::{ExtractedCvInfo, MandatoryConditions, TitleMatch};

/// Which predicates run and how titles compare. Rules short-circuit in
/// order: title, years, skills, certifications, tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub title_match: TitleMatch,
    pub check_certifications: bool,
    pub check_tools: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self { title_match: TitleMatch::Substring, check_certifications: true, check_tools: true }
    }
}

impl ValidationPolicy {
    pub fn from_settings(settings: &ValidationSettings) -> Self {
        Self {
            title_match: settings.title_match,
            check_certifications: settings.check_certifications,
            check_tools: settings.check_tools,
        }
    }

    pub fn validate(&self, info: &ExtractedCvInfo, conditions: &MandatoryConditions) -> bool {
        self.title_ok(&info.job_title, &conditions.job_title)
            && years_ok(info.years_of_experience, conditions.years_of_experience)
            && skills_ok(&info.skills, &conditions.skills)
            && (!self.check_certifications || subset_ok(&info.certifications, &conditions.certifications))
            && (!self.check_tools || subset_ok(&info.tools, &conditions.tools))
    }

    fn title_ok(&self, candidate: &str, required: &str) -> bool {
        let required = normalize_text(required);
        if required.is_empty() {
            return true;
        }
        match self.title_match {
            TitleMatch::Substring => normalize_text(candidate).contains(&required),
            TitleMatch::SetMembership => candidate_titles(candidate).contains(&required),
        }
    }
}

/// Validation with the default policy.
pub fn validate_cv(info: &ExtractedCvInfo, conditions: &MandatoryConditions) -> bool {
    ValidationPolicy::default().validate(info, conditions)
}

/// A candidate may list several titles separated by `,` `/` `;` or `|`.
fn candidate_titles(candidate: &str) -> BTreeSet<String> {
    candidate
        .split([',', '/', ';', '|'])
        .map(normalize_text)
        .filter(|t| !t.is_empty())
        .collect()
}

fn years_ok(candidate: u32, required: Option<u32>) -> bool {
    required.map_or(true, |required| candidate >= required)
}

fn normalized(set: &BTreeSet<String>) -> BTreeSet<String> {
    set.iter().map(|s| normalize_text(s)).filter(|s| !s.is_empty()).collect()
}

/// At least one shared skill.
fn skills_ok(candidate: &BTreeSet<String>, required: &BTreeSet<String>) -> bool {
    let required = normalized(required);
    required.is_empty() || !normalized(candidate).is_disjoint(&required)
}

/// Every required item present.
fn subset_ok(candidate: &BTreeSet<String>, required: &BTreeSet<String>) -> bool {
    let required = normalized(required);
    required.is_empty() || required.is_subset(&normalized(candidate))
}
