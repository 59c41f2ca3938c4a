//! Prefix filtering for completions.

/// Predicate accepting choices strictly longer than `input` that start with it,
/// ignoring case.
pub fn by_prefix(input: &str) -> impl Fn(&str) -> bool + '_ {
    move |choice| {
        choice.chars().count() > input.chars().count()
            && choice.to_lowercase().starts_with(&input.to_lowercase())
    }
}

/// Keep the choices that complete `input`.
pub fn limit_by_prefix<I, S>(choices: I, input: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let matches = by_prefix(input);
    choices
        .into_iter()
        .filter(|choice| matches(choice.as_ref()))
        .map(|choice| choice.as_ref().to_string())
        .collect()
}
