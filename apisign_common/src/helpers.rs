/// Reads the usual spellings of an on/off switch (`1`, `true`, `yes`, `on` and their opposites), ignoring case and
/// surrounding whitespace. Anything else is `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn flag_or_default(value: Option<&str>, default: bool) -> bool {
    value.and_then(parse_flag).unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert!(flag_or_default(Some("maybe"), true));
        assert!(!flag_or_default(None, false));
    }
}
