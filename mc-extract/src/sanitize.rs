use regex::Regex;

const UNSAFE_CHARS: &str = r#"[/\\:*?"<>|]"#;
const UNDERSCORE_RUN: &str = r"_+";

/// Turns an image reference into a single directory name.
///
/// Every character in `/ \ : * ? " < > |` becomes `_`, runs of `_` are
/// collapsed to one and leading or trailing `_` are dropped. Distinct
/// references may map to the same name.
pub fn sanitize(reference: &str) -> String
{
    let unsafe_re = Regex::new(UNSAFE_CHARS).expect("Unsafe characters regex is malformed");
    let underscore_re = Regex::new(UNDERSCORE_RUN).expect("Underscore regex is malformed");

    let replaced = unsafe_re.replace_all(reference, "_");
    let collapsed = underscore_re.replace_all(&replaced, "_");

    collapsed.trim_matches('_').to_string()
}
