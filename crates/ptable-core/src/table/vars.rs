//! `$NAME` expansion for CSV lines

use alloc::string::{String, ToString};

use crate::error::{Error, Result};

/// Expand `$NAME` and `${NAME}` references in `line`
///
/// Names start with a letter or underscore. A `$` that does not begin a
/// name is kept as is, and so is a reference preceded by a backslash. A
/// name that `lookup` cannot resolve is an error.
pub fn expand_vars<F>(line: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(pos) = rest.find('$') {
        let (before, after) = rest.split_at(pos);
        let after = &after[1..];
        out.push_str(before);

        if before.ends_with('\\') {
            out.push('$');
            rest = after;
            continue;
        }

        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let len = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..len], len)
            }
        };

        if !is_identifier(name) {
            out.push('$');
            rest = after;
            continue;
        }

        let value = lookup(name).ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        out.push_str(&value);
        rest = &after[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Resolve names from the process environment
#[cfg(feature = "std")]
pub(crate) fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "APP_SIZE" => Some("1M".to_string()),
            "NVS" => Some("nvs".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_plain_and_braced() {
        assert_eq!(
            expand_vars("factory,app,factory,,$APP_SIZE", lookup).unwrap(),
            "factory,app,factory,,1M"
        );
        assert_eq!(
            expand_vars("${NVS},data,${NVS}", lookup).unwrap(),
            "nvs,data,nvs"
        );
        assert_eq!(expand_vars("no variables", lookup).unwrap(), "no variables");
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            expand_vars("x,data,nvs,,$MISSING", lookup),
            Err(Error::UnknownVariable("MISSING".to_string()))
        );
        assert_eq!(
            expand_vars("x,data,nvs,,${MISSING}", lookup),
            Err(Error::UnknownVariable("MISSING".to_string()))
        );
    }

    #[test]
    fn test_literal_dollar() {
        assert_eq!(expand_vars("cost $5", lookup).unwrap(), "cost $5");
        assert_eq!(expand_vars("trailing $", lookup).unwrap(), "trailing $");
        assert_eq!(expand_vars("\\$MISSING", lookup).unwrap(), "\\$MISSING");
        assert_eq!(expand_vars("${unclosed", lookup).unwrap(), "${unclosed");
    }
}
