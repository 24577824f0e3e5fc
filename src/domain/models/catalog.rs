//! Exercise catalog.
//!
//! Static registry of exercises, the language variants each one ships
//! templates for, and the per-language metadata (template suffix and the
//! command the exercise CLI runs to execute the tests).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Test command used when a language has no explicit entry.
pub const DEFAULT_TEST_COMMAND: &str = "npm test";

/// A language variant a template can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    #[serde(rename = "C++")]
    Cpp,
}

impl Language {
    /// Every supported language, in display order.
    pub const ALL: [Self; 6] = [
        Self::TypeScript,
        Self::JavaScript,
        Self::Python,
        Self::Go,
        Self::Java,
        Self::Cpp,
    ];

    /// Canonical display form, as stored in the `projects` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript",
            Self::JavaScript => "JavaScript",
            Self::Python => "Python",
            Self::Go => "Go",
            Self::Java => "Java",
            Self::Cpp => "C++",
        }
    }

    /// Parse the canonical display form. Case-sensitive; run input through
    /// [`normalize_language`] first.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.as_str() == s)
    }

    /// Short suffix used in template and repository names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::TypeScript => "ts",
            Self::JavaScript => "js",
            Self::Python => "py",
            Self::Go => "go",
            Self::Java => "java",
            Self::Cpp => "cpp",
        }
    }

    /// Command the exercise CLI runs to produce a test report.
    pub fn test_command(&self) -> &'static str {
        match self {
            Self::TypeScript | Self::JavaScript => "npm test",
            Self::Python => "python3 tests/run.py",
            Self::Go => "go run tests/run.go",
            Self::Java => "mvn test",
            Self::Cpp => "bash tests/run.sh",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map user input to the canonical display form.
///
/// Lookup is case-insensitive against a fixed alias table. Unknown input is
/// returned unchanged so that the caller's support check reports it verbatim.
pub fn normalize_language(input: &str) -> String {
    let canonical = match input.trim().to_lowercase().as_str() {
        "typescript" => "TypeScript",
        "javascript" => "JavaScript",
        "python" => "Python",
        "go" => "Go",
        "java" => "Java",
        "c++" | "cpp" => "C++",
        _ => return input.to_string(),
    };
    canonical.to_string()
}

/// Look up the test command for a display-form language string, falling back
/// to [`DEFAULT_TEST_COMMAND`].
pub fn test_command_for(language: &str) -> &'static str {
    Language::from_str(language).map_or(DEFAULT_TEST_COMMAND, |lang| lang.test_command())
}

/// Registry of exercises and the languages each one supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    exercises: BTreeMap<String, Vec<Language>>,
}

impl Catalog {
    /// Build a catalog from an explicit table.
    pub fn new(exercises: BTreeMap<String, Vec<Language>>) -> Self {
        Self { exercises }
    }

    /// The exercises that currently ship templates.
    pub fn builtin() -> Self {
        let exercises = ["stack", "queue", "binary-search", "min-heap"]
            .into_iter()
            .map(|id| (id.to_string(), Language::ALL.to_vec()))
            .collect();
        Self { exercises }
    }

    /// Languages available for an exercise, or `None` for unknown exercises.
    pub fn languages_for(&self, exercise_id: &str) -> Option<&[Language]> {
        self.exercises.get(exercise_id).map(Vec::as_slice)
    }

    /// Resolve a normalized language string against an exercise.
    ///
    /// Returns `None` if the exercise is unknown or does not ship the language.
    pub fn resolve(&self, exercise_id: &str, language: &str) -> Option<Language> {
        let lang = Language::from_str(language)?;
        self.languages_for(exercise_id)?
            .contains(&lang)
            .then_some(lang)
    }

    /// Comma-separated list of available languages, `"none"` when empty.
    pub fn available_languages(&self, exercise_id: &str) -> String {
        match self.languages_for(exercise_id) {
            Some(langs) if !langs.is_empty() => langs
                .iter()
                .map(Language::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            _ => "none".to_string(),
        }
    }

    /// Iterate over `(exercise_id, languages)` in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Language])> {
        self.exercises
            .iter()
            .map(|(id, langs)| (id.as_str(), langs.as_slice()))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
