/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Placeholder replacement with a pluggable lookup, so tests don't have to
/// mutate the process environment.
///
/// Scans for `${`...`}` spans; anything malformed (no closing brace, empty
/// name) or unresolvable is copied through verbatim.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];

        let Some(end) = body.find('}') else {
            // Unterminated: keep the tail literally and stop scanning.
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let name = &body[..end];
        match if name.is_empty() { None } else { lookup(name) } {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([("DB_PATH", "/var/lib/istari.db"), ("WS_HOST", "pool")])
    }

    fn subst(input: &str) -> String {
        let vars = vars();
        substitute_env_with(input, |name| vars.get(name).map(|v| (*v).to_string()))
    }

    #[test]
    fn replaces_placeholders_in_place() {
        assert_eq!(subst("path = \"${DB_PATH}\""), "path = \"/var/lib/istari.db\"");
    }

    #[test]
    fn handles_several_placeholders_per_line() {
        assert_eq!(
            subst("ws://${WS_HOST}:3000/${DB_PATH}"),
            "ws://pool:3000//var/lib/istari.db"
        );
    }

    #[test]
    fn unknown_names_stay_verbatim() {
        assert_eq!(subst("x = ${NOT_SET} y"), "x = ${NOT_SET} y");
    }

    #[test]
    fn unterminated_span_is_kept_literal() {
        assert_eq!(subst("a = ${WS_HOST"), "a = ${WS_HOST");
    }

    #[test]
    fn empty_braces_are_kept_literal() {
        assert_eq!(subst("${} tail ${WS_HOST}"), "${} tail pool");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(substitute_env("no placeholders here"), "no placeholders here");
    }
}
