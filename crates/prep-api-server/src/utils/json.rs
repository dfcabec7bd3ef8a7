use once_cell::sync::Lazy;
use regex::Regex;

/// Extract the first balanced JSON value (object or array) from a possibly
/// noisy LLM output. Handles nested brackets and brackets inside JSON
/// strings (with escapes).
pub fn extract_first_json(s: &str) -> Option<&str> {
    let mut start: Option<usize> = None;
    let mut depth: i32 = 0;

    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if start.is_none() {
            if ch == '{' || ch == '[' {
                start = Some(i);
                depth = 1;
                in_string = false;
                escaped = false;
            }
            continue;
        }

        // Inside a value candidate
        if in_string {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    let st = start?;
                    return Some(&s[st..=i]); // inclusive end
                }
            }
            _ => {}
        }
    }

    None
}

static NUMBERED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s+(.+?)\s*$").expect("valid regex"));

/// Fallback for models that answer with a plain numbered list instead of
/// the requested JSON.
pub fn parse_numbered_list(s: &str) -> Vec<String> {
    NUMBERED_LINE
        .captures_iter(s)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_object_from_noise() {
        let raw = r#"Sure! Here is the result: {"verdict": "human", "score": 0.2} hope it helps"#;
        assert_eq!(
            extract_first_json(raw),
            Some(r#"{"verdict": "human", "score": 0.2}"#)
        );
    }

    #[test]
    fn test_extract_array_with_nested_objects() {
        let raw = "```json\n[{\"id\": 1, \"text\": \"Why Rust?\"}]\n```";
        assert_eq!(
            extract_first_json(raw),
            Some(r#"[{"id": 1, "text": "Why Rust?"}]"#)
        );
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let raw = r#"{"text": "use {braces} and \"quotes\" freely"}"#;
        assert_eq!(extract_first_json(raw), Some(raw));
    }

    #[test]
    fn test_no_json_present() {
        assert_eq!(extract_first_json("no structured data here"), None);
    }

    #[test]
    fn test_numbered_list_fallback() {
        let raw = "1. Tell me about yourself.\n2) Why this role?\nnot a list line\n3. Biggest weakness?";
        let items = parse_numbered_list(raw);
        assert_eq!(
            items,
            vec![
                "Tell me about yourself.",
                "Why this role?",
                "Biggest weakness?"
            ]
        );
    }
}
