//! CLI parsing helpers for clap value parsers.

/// Parse a `-D KEY=VALUE` definition.
///
/// The value may be empty; the key may not, and it may not contain `$`,
/// `{`, `}` or whitespace since it must be referable as `${KEY}`.
pub(super) fn parse_definition(s: &str) -> Result<(String, String), String> {
    let Some((key, value)) = s.split_once('=') else {
        return Err(format!("definition '{s}' must have the form KEY=VALUE"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("definition '{s}' has an empty key"));
    }
    if key
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '$' | '{' | '}'))
    {
        return Err(format!("invalid definition key '{key}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// Parse a backend key, normalised to lowercase.
pub(super) fn parse_backend(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("backend must not be empty".to_owned());
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("WRAP_JAVA=ON", "WRAP_JAVA", "ON")]
    #[case("EMPTY=", "EMPTY", "")]
    #[case("LIST=a;b=c", "LIST", "a;b=c")]
    fn accepts_definitions(#[case] input: &str, #[case] key: &str, #[case] value: &str) {
        assert_eq!(
            parse_definition(input),
            Ok((key.to_owned(), value.to_owned()))
        );
    }

    #[rstest]
    #[case("NOVALUE")]
    #[case("=x")]
    #[case("A B=x")]
    #[case("${X}=y")]
    fn rejects_malformed_definitions(#[case] input: &str) {
        assert!(parse_definition(input).is_err());
    }

    #[rstest]
    fn backend_keys_are_lowercased() {
        assert_eq!(parse_backend(" Watcom "), Ok("watcom".to_owned()));
        assert!(parse_backend("  ").is_err());
    }
}
