//! URI-Query options to an HTTP query string.

/// Percent-encode one query component (space becomes `+`, reserved
/// characters are escaped).
fn escape(component: &str) -> String {
    form_urlencoded::byte_serialize(component.as_bytes()).collect()
}

/// Escape a single URI-Query value of the form `k` or `k=v`. Only the
/// first `=` separates key and value; any further `=` belongs to the
/// value. A value-less key stays bare, with no trailing `=`.
fn escape_key_value(part: &str) -> String {
    match part.split_once('=') {
        None => escape(part),
        Some((key, value)) => format!("{}={}", escape(key), escape(value)),
    }
}

/// Assemble the query string for a sequence of URI-Query values: each
/// part escaped, joined with `&`, prefixed with `?`. Empty input yields
/// the empty string.
pub fn query_string<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let encoded: Vec<String> = parts.into_iter().map(escape_key_value).collect();
    if encoded.is_empty() {
        String::new()
    } else {
        format!("?{}", encoded.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(query_string([]), "");
    }

    #[test]
    fn plain_pairs() {
        assert_eq!(query_string(["a=b"]), "?a=b");
        assert_eq!(query_string(["a=b", "c=d"]), "?a=b&c=d");
    }

    #[test]
    fn reserved_characters_escaped_per_component() {
        assert_eq!(query_string(["a=b", "c=d e&=f"]), "?a=b&c=d+e%26%3Df");
    }

    #[test]
    fn only_first_equals_splits() {
        assert_eq!(query_string(["a=b=c"]), "?a=b%3Dc");
    }

    #[test]
    fn valueless_key_stays_bare() {
        assert_eq!(query_string(["flag"]), "?flag");
        assert_eq!(query_string(["fl ag"]), "?fl+ag");
    }

    #[test]
    fn key_itself_is_escaped() {
        assert_eq!(query_string(["k ey=v"]), "?k+ey=v");
    }

    #[test]
    fn decodes_back_to_input() {
        let parts = ["a=b", "c=d e&=f", "flag", "x=1=2"];
        let encoded = query_string(parts);
        let decoded: Vec<(String, String)> =
            form_urlencoded::parse(encoded[1..].as_bytes())
                .into_owned()
                .collect();
        assert_eq!(
            decoded,
            vec![
                ("a".into(), "b".into()),
                ("c".into(), "d e&=f".into()),
                ("flag".into(), "".into()),
                ("x".into(), "1=2".into()),
            ]
        );
    }
}
