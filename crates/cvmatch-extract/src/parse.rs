//! Strict parsing of completion replies into typed records.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::collections::BTreeSet;

use cvmatch_core::normalize::normalize_text;
use cvmatch_core::types::{ExtractedCvInfo, MandatoryConditions};
use cvmatch_core::{Error, Result};

/// Parses a reply that must be a single JSON object, optionally wrapped in a
/// Markdown code fence.
pub(crate) fn parse_object<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let body = strip_fence(reply.trim());
    if !(body.starts_with('{') && body.ends_with('}')) {
        return Err(Error::ExtractionParse(format!("expected a JSON object, got: {}", preview(body))));
    }
    serde_json::from_str(body).map_err(|e| Error::ExtractionParse(format!("{e}: {}", preview(body))))
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TitleField {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearsField {
    Int(u64),
    Float(f64),
    Text(String),
}

/// A title may come back as a string or a list of strings; lists are kept
/// as a comma-separated string. Normalized.
fn title<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let raw = Option::<TitleField>::deserialize(d)?;
    Ok(match raw {
        Some(TitleField::One(s)) => normalize_text(&s),
        Some(TitleField::Many(list)) => list.iter().map(|s| normalize_text(s)).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(", "),
        None => String::new(),
    })
}

/// Integer, float or a string with leading digits (`"5+"`, `"3 years"`).
fn years<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u32>, D::Error> {
    let raw = Option::<YearsField>::deserialize(d)?;
    Ok(match raw {
        Some(YearsField::Int(n)) => Some(u32::try_from(n).unwrap_or(u32::MAX)),
        Some(YearsField::Float(f)) if f.is_finite() && f >= 0.0 => Some(f.trunc() as u32),
        Some(YearsField::Float(_)) => None,
        Some(YearsField::Text(s)) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        None => None,
    })
}

fn string_set<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<BTreeSet<String>, D::Error> {
    let raw = Option::<Vec<String>>::deserialize(d)?;
    Ok(raw.unwrap_or_default().iter().map(|s| normalize_text(s)).filter(|s| !s.is_empty()).collect())
}

#[derive(Deserialize)]
pub(crate) struct RawConditions {
    #[serde(default, deserialize_with = "title")]
    job_title: String,
    #[serde(default, deserialize_with = "years")]
    years_of_experience: Option<u32>,
    #[serde(default, deserialize_with = "string_set")]
    skills: BTreeSet<String>,
    #[serde(default, deserialize_with = "string_set")]
    certifications: BTreeSet<String>,
    #[serde(default, deserialize_with = "string_set")]
    tools: BTreeSet<String>,
}

impl From<RawConditions> for MandatoryConditions {
    fn from(raw: RawConditions) -> Self {
        Self {
            job_title: raw.job_title,
            years_of_experience: raw.years_of_experience,
            skills: raw.skills,
            certifications: raw.certifications,
            tools: raw.tools,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RawCvInfo {
    #[serde(default, deserialize_with = "title")]
    job_title: String,
    #[serde(default, deserialize_with = "years")]
    years_of_experience: Option<u32>,
    #[serde(default, deserialize_with = "string_set")]
    skills: BTreeSet<String>,
    #[serde(default, deserialize_with = "string_set")]
    certifications: BTreeSet<String>,
    #[serde(default, deserialize_with = "string_set")]
    tools: BTreeSet<String>,
}

impl From<RawCvInfo> for ExtractedCvInfo {
    fn from(raw: RawCvInfo) -> Self {
        Self {
            job_title: raw.job_title,
            years_of_experience: raw.years_of_experience.unwrap_or(0),
            skills: raw.skills,
            certifications: raw.certifications,
            tools: raw.tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_json() {
        let reply = r#"{"job_title": "Software  Engineer", "years_of_experience": 3, "skills": ["Python", "Django"]}"#;
        let c: MandatoryConditions = parse_object::<RawConditions>(reply).unwrap().into();
        assert_eq!(c.job_title, "software engineer");
        assert_eq!(c.years_of_experience, Some(3));
        assert_eq!(c.skills.iter().cloned().collect::<Vec<_>>(), vec!["django", "python"]);
        assert!(c.tools.is_empty());

        let fenced = format!("```json\n{reply}\n```");
        let again: MandatoryConditions = parse_object::<RawConditions>(&fenced).unwrap().into();
        assert_eq!(again, c);
    }

    #[test]
    fn years_accepts_loose_forms() {
        let parse = |y: &str| {
            let c: MandatoryConditions = parse_object::<RawConditions>(&format!(r#"{{"years_of_experience": {y}}}"#)).unwrap().into();
            c.years_of_experience
        };
        assert_eq!(parse("5"), Some(5));
        assert_eq!(parse("2.5"), Some(2));
        assert_eq!(parse(r#""5+ years""#), Some(5));
        assert_eq!(parse(r#""several""#), None);
        assert_eq!(parse("null"), None);
    }

    #[test]
    fn cv_years_default_to_zero() {
        let info: ExtractedCvInfo = parse_object::<RawCvInfo>(r#"{"job_title": ["Engineer", "Developer"], "skills": null}"#).unwrap().into();
        assert_eq!(info.years_of_experience, 0);
        assert_eq!(info.job_title, "engineer, developer");
        assert!(info.skills.is_empty());
    }

    #[test]
    fn rejects_python_literals_and_prose() {
        assert!(matches!(
            parse_object::<RawConditions>("{'job_title': 'engineer'}"),
            Err(Error::ExtractionParse(_))
        ));
        assert!(matches!(parse_object::<RawConditions>("Sure! Here you go."), Err(Error::ExtractionParse(_))));
    }

    #[test]
    fn rejects_wrong_field_types() {
        assert!(parse_object::<RawConditions>(r#"{"skills": "python"}"#).is_err());
    }
}
