/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw config
/// text before it is parsed.
///
/// Unresolvable variables without a fallback are left as-is so the parse
/// error (or the literal value) points at the missing variable.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = &after[..end];
        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (inner, None),
        };

        match lookup(name).filter(|v| !v.is_empty()) {
            Some(value) if !name.is_empty() => out.push_str(&value),
            _ => match fallback {
                Some(fallback) if !name.is_empty() => out.push_str(fallback),
                _ => {
                    out.push_str("${");
                    out.push_str(inner);
                    out.push('}');
                },
            },
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
