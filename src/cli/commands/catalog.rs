//! Catalog command.

use anyhow::Result;

use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::models::Catalog;
use crate::services::template_name;

#[derive(Debug, serde::Serialize)]
pub struct VariantOutput {
    pub language: String,
    pub template: String,
    pub test_command: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ExerciseOutput {
    pub exercise_id: String,
    pub variants: Vec<VariantOutput>,
}

#[derive(Debug, serde::Serialize)]
pub struct CatalogOutput {
    pub exercises: Vec<ExerciseOutput>,
    pub total: usize,
}

impl From<&Catalog> for CatalogOutput {
    fn from(catalog: &Catalog) -> Self {
        let exercises: Vec<ExerciseOutput> = catalog
            .iter()
            .map(|(exercise_id, languages)| ExerciseOutput {
                exercise_id: exercise_id.to_string(),
                variants: languages
                    .iter()
                    .map(|lang| VariantOutput {
                        language: lang.as_str().to_string(),
                        template: template_name(exercise_id, *lang),
                        test_command: lang.test_command().to_string(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            total: exercises.len(),
            exercises,
        }
    }
}

impl CommandOutput for CatalogOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["exercise", "language", "template", "test command"]);
        for exercise in &self.exercises {
            for variant in &exercise.variants {
                table.add_row(vec![
                    exercise.exercise_id.as_str(),
                    variant.language.as_str(),
                    variant.template.as_str(),
                    variant.test_command.as_str(),
                ]);
            }
        }
        render_list("exercise", &table, self.total)
    }
}

pub fn execute(json_mode: bool) -> Result<()> {
    output(&CatalogOutput::from(&Catalog::builtin()), json_mode);
    Ok(())
}
