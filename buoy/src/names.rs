use std::fmt;

use crate::error::{ProbeError, ProbeResult, RetCode};

pub const NODE_NAME_MAX_LENGTH: usize = 255;

/// Where and why a name was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidName {
    pub index: usize,
    pub reason: &'static str,
}

impl fmt::Display for InvalidName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, at index {}", self.reason, self.index)
    }
}

impl InvalidName {
    fn at(index: usize, reason: &'static str) -> Self {
        Self { index, reason }
    }

    pub fn into_error(self, code: RetCode, kind: &str, name: &str) -> ProbeError {
        ProbeError::new(code, format!("invalid {kind} '{name}': {self}"))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Checks that every `/`-separated token is non-empty, made of `[A-Za-z0-9_]`
/// and does not start with a digit. `offset` is added to reported indices.
fn validate_tokens(tokens: &str, offset: usize) -> Result<(), InvalidName> {
    let mut token_start = true;
    for (i, c) in tokens.char_indices() {
        match c {
            '/' if token_start => {
                return Err(InvalidName::at(
                    offset + i,
                    "must not contain repeated forward slashes",
                ));
            }
            '/' => token_start = true,
            c if !is_name_char(c) => {
                return Err(InvalidName::at(
                    offset + i,
                    "must only contain alphanumerics, '_' or '/'",
                ));
            }
            c if token_start && c.is_ascii_digit() => {
                return Err(InvalidName::at(offset + i, "token must not start with a number"));
            }
            _ => token_start = false,
        }
    }
    Ok(())
}

pub fn validate_node_name(name: &str) -> Result<(), InvalidName> {
    if name.is_empty() {
        return Err(InvalidName::at(0, "node name must not be empty"));
    }
    if let Some((i, _)) = name.char_indices().find(|(_, c)| !is_name_char(*c)) {
        return Err(InvalidName::at(
            i,
            "node name must only contain alphanumerics and '_'",
        ));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(InvalidName::at(0, "node name must not start with a number"));
    }
    if name.len() > NODE_NAME_MAX_LENGTH {
        return Err(InvalidName::at(
            NODE_NAME_MAX_LENGTH,
            "node name is longer than 255 characters",
        ));
    }
    Ok(())
}

pub fn validate_namespace(namespace: &str) -> Result<(), InvalidName> {
    if namespace.is_empty() {
        return Err(InvalidName::at(0, "namespace must not be empty"));
    }
    if !namespace.starts_with('/') {
        return Err(InvalidName::at(0, "namespace must be absolute"));
    }
    if namespace == "/" {
        return Ok(());
    }
    if namespace.ends_with('/') {
        return Err(InvalidName::at(
            namespace.len() - 1,
            "namespace must not end with a forward slash",
        ));
    }
    validate_tokens(&namespace[1..], 1)
}

pub fn validate_topic_name(topic: &str) -> Result<(), InvalidName> {
    if topic.is_empty() {
        return Err(InvalidName::at(0, "topic name must not be empty"));
    }
    if topic.ends_with('/') {
        return Err(InvalidName::at(
            topic.len() - 1,
            "topic name must not end with a forward slash",
        ));
    }

    let mut in_substitution = false;
    let mut token_start = true;
    let mut prev = None;
    for (i, c) in topic.char_indices() {
        match c {
            '~' if i != 0 => {
                return Err(InvalidName::at(i, "'~' is only allowed at the start"));
            }
            '~' => {}
            '{' if in_substitution => {
                return Err(InvalidName::at(i, "substitutions must not be nested"));
            }
            '{' => in_substitution = true,
            '}' if !in_substitution => {
                return Err(InvalidName::at(i, "unmatched '}'"));
            }
            '}' => in_substitution = false,
            c if in_substitution && !is_name_char(c) => {
                return Err(InvalidName::at(
                    i,
                    "substitution must only contain alphanumerics and '_'",
                ));
            }
            '/' if prev == Some('/') => {
                return Err(InvalidName::at(
                    i,
                    "topic name must not contain repeated forward slashes",
                ));
            }
            '/' if prev == Some('~') || prev.is_none() => {}
            c if !is_name_char(c) && c != '/' => {
                return Err(InvalidName::at(
                    i,
                    "topic name must only contain alphanumerics, '_', '~', '{' or '}'",
                ));
            }
            c if token_start && !in_substitution && c.is_ascii_digit() => {
                return Err(InvalidName::at(i, "token must not start with a number"));
            }
            _ => {}
        }

        if prev == Some('~') && c != '/' {
            return Err(InvalidName::at(i, "'~' must be followed by a forward slash"));
        }
        token_start = c == '/';
        prev = Some(c);
    }

    if in_substitution {
        return Err(InvalidName::at(topic.len() - 1, "unmatched '{'"));
    }
    Ok(())
}

fn substitute(topic: &str, node_name: &str, namespace: &str) -> ProbeResult<String> {
    let mut out = String::with_capacity(topic.len());
    let mut rest = topic;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        // validated beforehand, so every '{' has a '}'
        let close = open + rest[open..].find('}').unwrap_or(rest.len() - open);
        let key = &rest[open + 1..close];
        match key {
            "node" => out.push_str(node_name),
            "ns" | "namespace" => out.push_str(namespace),
            _ => {
                return Err(ProbeError::new(
                    RetCode::UnknownSubstitution,
                    format!("unknown substitution '{{{key}}}' in topic '{topic}'"),
                ));
            }
        }
        rest = rest.get(close + 1..).unwrap_or("");
    }
    out.push_str(rest);
    Ok(out)
}

/// Turns a relative or private topic into a fully qualified one.
pub fn expand_topic_name(topic: &str, node_name: &str, namespace: &str) -> ProbeResult<String> {
    validate_topic_name(topic)
        .map_err(|e| e.into_error(RetCode::TopicNameInvalid, "topic name", topic))?;

    let topic = substitute(topic, node_name, namespace)?;
    let prefix = if namespace == "/" { "" } else { namespace };

    let expanded = if let Some(private) = topic.strip_prefix('~') {
        format!("{prefix}/{node_name}{private}")
    } else if topic.starts_with('/') {
        topic
    } else {
        format!("{prefix}/{topic}")
    };

    validate_topic_name(&expanded)
        .map_err(|e| e.into_error(RetCode::TopicNameInvalid, "topic name", &expanded))?;
    Ok(expanded)
}

/// Splits a fully qualified name into its namespace and base name.
pub fn split_path(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some(("", base)) => ("/".to_owned(), base.to_owned()),
        Some((dir, base)) if dir.starts_with('/') => (dir.to_owned(), base.to_owned()),
        Some((dir, base)) => (format!("/{dir}"), base.to_owned()),
        None => ("/".to_owned(), path.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_names() {
        assert!(validate_node_name("NODE_NAME12").is_ok());
        assert!(validate_node_name("_private").is_ok());
        assert_eq!(validate_node_name("").unwrap_err().index, 0);
        assert_eq!(validate_node_name("12node").unwrap_err().index, 0);
        assert_eq!(validate_node_name("my-node").unwrap_err().index, 2);
        assert_eq!(validate_node_name("a/b").unwrap_err().index, 1);
        assert!(validate_node_name(&"n".repeat(256)).is_err());
    }

    #[test]
    fn test_namespaces() {
        assert!(validate_namespace("/").is_ok());
        assert!(validate_namespace("/rossina").is_ok());
        assert!(validate_namespace("/a/b_c").is_ok());
        assert_eq!(validate_namespace("").unwrap_err().index, 0);
        assert_eq!(validate_namespace("rossina").unwrap_err().index, 0);
        assert_eq!(validate_namespace("/a/").unwrap_err().index, 2);
        assert_eq!(validate_namespace("/a//b").unwrap_err().index, 3);
        assert_eq!(validate_namespace("/a/1b").unwrap_err().index, 3);
        assert_eq!(validate_namespace("/a b").unwrap_err().index, 2);
    }

    #[test]
    fn test_valid_topic_names() {
        for topic in [
            "/rossina/rusina",
            "rusina",
            "~",
            "~/private",
            "{node}/color",
            "/{ns}/x",
            "a_b/c1",
        ] {
            assert!(validate_topic_name(topic).is_ok(), "{topic}");
        }
    }

    #[test]
    fn test_invalid_topic_names() {
        let cases = [
            ("", 0),
            ("/rossina/", 8),
            ("/a//b", 3),
            ("/1topic", 1),
            ("a/~b", 2),
            ("~b", 1),
            ("/a-b", 2),
            ("{node", 4),
            ("node}", 4),
            ("{{node}}", 1),
            ("{no de}", 3),
        ];
        for (topic, index) in cases {
            let err = validate_topic_name(topic).unwrap_err();
            assert_eq!(err.index, index, "{topic}: {}", err.reason);
        }
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(
            expand_topic_name("/rossina/rusina", "NODE_NAME12", "/").unwrap(),
            "/rossina/rusina"
        );
    }

    #[test]
    fn test_expand_relative_and_private() {
        assert_eq!(expand_topic_name("color", "n", "/").unwrap(), "/color");
        assert_eq!(expand_topic_name("color", "n", "/ns").unwrap(), "/ns/color");
        assert_eq!(expand_topic_name("~", "n", "/ns").unwrap(), "/ns/n");
        assert_eq!(expand_topic_name("~/color", "n", "/").unwrap(), "/n/color");
    }

    #[test]
    fn test_expand_substitutions() {
        assert_eq!(
            expand_topic_name("{node}/color", "probe", "/ns").unwrap(),
            "/ns/probe/color"
        );
        assert_eq!(
            expand_topic_name("{ns}/color", "probe", "/ns").unwrap(),
            "/ns/color"
        );
        let err = expand_topic_name("{robot}/color", "probe", "/ns").unwrap_err();
        assert_eq!(err.code, RetCode::UnknownSubstitution);
    }

    #[test]
    fn test_expand_rejects_invalid() {
        let err = expand_topic_name("/bad topic", "n", "/").unwrap_err();
        assert_eq!(err.code, RetCode::TopicNameInvalid);
        assert!(err.message.contains("at index 4"), "{}", err.message);
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("/rossina/rusina"),
            ("/rossina".to_owned(), "rusina".to_owned())
        );
        assert_eq!(split_path("/color"), ("/".to_owned(), "color".to_owned()));
        assert_eq!(split_path("a/b/c"), ("/a/b".to_owned(), "c".to_owned()));
        assert_eq!(split_path("c"), ("/".to_owned(), "c".to_owned()));
    }
}
