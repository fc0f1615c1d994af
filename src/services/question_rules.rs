use crate::schemas::content::OptionCreate;

pub(crate) const MIN_OPTIONS: usize = 2;

/// A new question needs at least two options and exactly one correct one.
pub(crate) fn validate_new_options(options: &[OptionCreate]) -> Result<(), String> {
    if options.len() < MIN_OPTIONS {
        return Err(format!("A question needs at least {MIN_OPTIONS} options"));
    }

    match options.iter().filter(|option| option.is_correct).count() {
        1 => Ok(()),
        0 => Err("Exactly one option must be marked correct".to_string()),
        _ => Err("Only one option may be marked correct".to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CorrectnessChange {
    /// Flag stays as stored.
    Keep,
    /// Option becomes the single correct answer; siblings are cleared.
    MakeCorrect,
}

/// Decides how a requested `is_correct` edit applies to one option.
pub(crate) fn correctness_change(
    currently_correct: bool,
    requested: Option<bool>,
) -> Result<CorrectnessChange, String> {
    match (currently_correct, requested) {
        (_, None) => Ok(CorrectnessChange::Keep),
        (true, Some(true)) | (false, Some(false)) => Ok(CorrectnessChange::Keep),
        (false, Some(true)) => Ok(CorrectnessChange::MakeCorrect),
        (true, Some(false)) => Err(
            "Cannot unmark the only correct option; mark another option correct instead"
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(text: &str, is_correct: bool) -> OptionCreate {
        OptionCreate { option_text: text.to_string(), is_correct, order_index: None }
    }

    #[test]
    fn requires_two_options() {
        let err = validate_new_options(&[option("a", true)]).unwrap_err();
        assert!(err.contains("at least 2"));
    }

    #[test]
    fn requires_exactly_one_correct() {
        assert!(validate_new_options(&[option("a", false), option("b", false)]).is_err());
        assert!(validate_new_options(&[option("a", true), option("b", true)]).is_err());
        assert!(validate_new_options(&[option("a", true), option("b", false)]).is_ok());
    }

    #[test]
    fn unmarking_the_correct_option_is_rejected() {
        assert!(correctness_change(true, Some(false)).is_err());
        assert_eq!(correctness_change(false, Some(true)), Ok(CorrectnessChange::MakeCorrect));
        assert_eq!(correctness_change(true, None), Ok(CorrectnessChange::Keep));
        assert_eq!(correctness_change(false, Some(false)), Ok(CorrectnessChange::Keep));
    }
}
