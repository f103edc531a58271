// src/core/signature.rs
//! Best-effort extraction of parameters, return types and heritage clauses
//! from declaration signatures.
//!
//! Analyzers only see the [`SignatureParser`] trait, so a type-checker backed
//! implementation can replace [`LexicalSignatureParser`] without touching them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    pub type_name: Option<String>,
    pub optional: bool,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heritage {
    pub extends: Vec<String>,
    pub implements: Vec<String>,
}

/// Type annotation of a property declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyShape {
    pub type_name: Option<String>,
    pub optional: bool,
    pub readonly: bool,
}

pub trait SignatureParser: Send + Sync {
    fn parameters(&self, signature: &str) -> Vec<ParameterDoc>;

    fn return_type(&self, signature: &str) -> Option<String>;

    fn heritage(&self, signature: &str) -> Heritage;

    fn property(&self, signature: &str) -> PropertyShape;
}

/// Bracket-aware scanner over TypeScript-style signatures
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalSignatureParser;

const ACCESS_WORDS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Index of the bracket closing the one opened at `open`
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' | '<' | '{' | '[' => depth += 1,
            ')' | '>' | '}' | ']' => {
                if c == '>' && text[..i].ends_with('=') {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `separator` at bracket depth zero
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();

    for c in text.chars() {
        match c {
            '(' | '<' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '>' if !current.ends_with('=') => depth -= 1,
            _ => {}
        }
        if c == separator && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Position of the first `:` at bracket depth zero
fn top_level_colon(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '<' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '>' if !text[..i].ends_with('=') => depth -= 1,
            ':' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Position of a default-value `=` at bracket depth zero, ignoring `=>` and comparisons
fn top_level_assign(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '<' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '>' if !text[..i].ends_with('=') => depth -= 1,
            '=' if depth == 0 => {
                let next = bytes.get(i + 1).copied();
                let prev = if i > 0 { bytes.get(i - 1).copied() } else { None };
                let operator = matches!(next, Some(b'>') | Some(b'='))
                    || matches!(prev, Some(b'=') | Some(b'!') | Some(b'<') | Some(b'>'));
                if !operator {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn clean_type(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_end_matches(['{', ';'])
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn strip_access_words(mut text: &str) -> &str {
    loop {
        let before = text;
        for word in ACCESS_WORDS {
            if let Some(rest) = text.strip_prefix(word) {
                if rest.starts_with(char::is_whitespace) {
                    text = rest.trim_start();
                }
            }
        }
        if before == text {
            return text;
        }
    }
}

fn parse_parameter(raw: &str) -> ParameterDoc {
    let (declaration, default_value) = match top_level_assign(raw) {
        Some(idx) => (&raw[..idx], Some(raw[idx + 1..].trim().to_string())),
        None => (raw, None),
    };
    let declaration = strip_access_words(declaration.trim());

    let (name_part, type_name) = match top_level_colon(declaration) {
        Some(idx) => (&declaration[..idx], clean_type(&declaration[idx + 1..])),
        None => (declaration, None),
    };

    let name_part = name_part.trim();
    let optional = name_part.ends_with('?') || default_value.is_some();
    let name = name_part.trim_end_matches('?').to_string();

    ParameterDoc {
        name,
        type_name,
        optional,
        default_value,
    }
}

/// Names listed after `keyword` up to the next clause or body
fn clause_list(signature: &str, keyword: &str, stop_words: &[&str]) -> Vec<String> {
    let tokens: Vec<&str> = signature.split_whitespace().collect();
    let Some(start) = tokens.iter().position(|t| *t == keyword) else {
        return Vec::new();
    };

    let mut clause = String::new();
    for token in &tokens[start + 1..] {
        if stop_words.contains(token) || token.starts_with('{') {
            break;
        }
        if !clause.is_empty() {
            clause.push(' ');
        }
        clause.push_str(token.trim_end_matches('{'));
        if token.ends_with('{') {
            break;
        }
    }

    split_top_level(&clause, ',')
}

impl SignatureParser for LexicalSignatureParser {
    fn parameters(&self, signature: &str) -> Vec<ParameterDoc> {
        let Some(open) = signature.find('(') else {
            return Vec::new();
        };
        let Some(close) = matching_close(signature, open) else {
            return Vec::new();
        };

        split_top_level(&signature[open + 1..close], ',')
            .iter()
            .map(|p| parse_parameter(p))
            .collect()
    }

    fn return_type(&self, signature: &str) -> Option<String> {
        let open = signature.find('(')?;
        let close = matching_close(signature, open)?;
        let rest = signature[close + 1..].trim();

        if let Some(after_arrow) = rest.strip_prefix("=>") {
            return clean_type(after_arrow);
        }
        if let Some(after_colon) = rest.strip_prefix(':') {
            let annotated = match after_colon.find("=>") {
                Some(idx) => &after_colon[..idx],
                None => after_colon,
            };
            return clean_type(annotated);
        }
        if let Some(after_arrow) = rest.strip_prefix("->") {
            return clean_type(after_arrow);
        }
        None
    }

    fn heritage(&self, signature: &str) -> Heritage {
        Heritage {
            extends: clause_list(signature, "extends", &["implements"]),
            implements: clause_list(signature, "implements", &["extends"]),
        }
    }

    fn property(&self, signature: &str) -> PropertyShape {
        let trimmed = signature.trim();
        let readonly = trimmed.split_whitespace().any(|w| w == "readonly");
        let declaration = strip_access_words(trimmed.trim_start_matches("static ").trim());
        let declaration = match top_level_assign(declaration) {
            Some(idx) => &declaration[..idx],
            None => declaration,
        };

        match top_level_colon(declaration) {
            Some(idx) => PropertyShape {
                type_name: clean_type(&declaration[idx + 1..]),
                optional: declaration[..idx].trim_end().ends_with('?'),
                readonly,
            },
            None => PropertyShape {
                type_name: None,
                optional: declaration.trim_end().ends_with('?'),
                readonly,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_with_generics_and_defaults() {
        let parser = LexicalSignatureParser;
        let params = parser.parameters(
            "function load(id: string, opts?: Map<string, number>, retries = 3, ...rest: unknown[]): Promise<User>",
        );

        assert_eq!(params.len(), 4);
        assert_eq!(params[0].name, "id");
        assert_eq!(params[0].type_name.as_deref(), Some("string"));
        assert!(!params[0].optional);
        assert_eq!(params[1].type_name.as_deref(), Some("Map<string, number>"));
        assert!(params[1].optional);
        assert_eq!(params[2].default_value.as_deref(), Some("3"));
        assert!(params[2].optional);
        assert_eq!(params[3].name, "...rest");
    }

    #[test]
    fn test_constructor_parameter_properties() {
        let parser = LexicalSignatureParser;
        let params = parser.parameters("constructor(private readonly repo: UserRepository)");
        assert_eq!(params[0].name, "repo");
        assert_eq!(params[0].type_name.as_deref(), Some("UserRepository"));
    }

    #[test]
    fn test_return_types() {
        let parser = LexicalSignatureParser;
        assert_eq!(
            parser.return_type("async fetch(url: string): Promise<Response> {").as_deref(),
            Some("Promise<Response>")
        );
        assert_eq!(
            parser.return_type("const toDto = (u: User) => UserDto").as_deref(),
            Some("UserDto")
        );
        assert_eq!(parser.return_type("render()"), None);
    }

    #[test]
    fn test_arrow_in_parameter_type_does_not_close_bracket() {
        let parser = LexicalSignatureParser;
        let params = parser.parameters("subscribe(listener: (e: Event) => void, once: boolean): void");
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].type_name.as_deref(), Some("(e: Event) => void"));
        assert_eq!(params[1].name, "once");
    }

    #[test]
    fn test_heritage_clauses() {
        let parser = LexicalSignatureParser;
        let heritage = parser.heritage(
            "export class UserRepository extends BaseRepository<User> implements IRepository, Disposable {",
        );
        assert_eq!(heritage.extends, vec!["BaseRepository<User>"]);
        assert_eq!(heritage.implements, vec!["IRepository", "Disposable"]);

        let iface = parser.heritage("interface Admin extends User, Auditable");
        assert_eq!(iface.extends, vec!["User", "Auditable"]);
        assert!(iface.implements.is_empty());
    }

    #[test]
    fn test_property_shape() {
        let parser = LexicalSignatureParser;
        let shape = parser.property("private readonly cache?: Map<string, User> = new Map()");
        assert_eq!(shape.type_name.as_deref(), Some("Map<string, User>"));
        assert!(shape.optional);
        assert!(shape.readonly);
    }
}
