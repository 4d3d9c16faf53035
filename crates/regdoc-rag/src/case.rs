use regdoc_core::types::CaseFields;

pub const NOT_SPECIFIED: &str = "Not specified";
pub const STANDARD_ANALYSIS: &str = "Standard analysis following the expert methodology";

fn or_placeholder<'a>(field: &'a Option<String>, placeholder: &'a str) -> &'a str {
    match field.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => placeholder,
    }
}

/// Turn a structured case description into one question for the composer.
pub fn compose_case_question(case: &CaseFields) -> String {
    format!(
        "=== CASE FOR ANALYSIS ===\n\n\
         **CONTEXT:**\n{}\n\n\
         **ACTORS INVOLVED:**\n{}\n\n\
         **SPECIFIC SITUATION:**\n{}\n\n\
         **SPECIFIC QUESTION:**\n{}\n\n\
         **ASPECTS TO CONSIDER:**\n{}\n\n\
         Please carry out a complete analysis following your expert regulatory methodology, \
         taking into account every element provided and its possible implications.",
        or_placeholder(&case.context, NOT_SPECIFIED),
        or_placeholder(&case.actors, NOT_SPECIFIED),
        or_placeholder(&case.situation, NOT_SPECIFIED),
        or_placeholder(&case.specific_question, NOT_SPECIFIED),
        or_placeholder(&case.additional_aspects, STANDARD_ANALYSIS),
    )
}
