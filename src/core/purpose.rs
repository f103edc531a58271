// src/core/purpose.rs
//! Human-readable purpose lines for symbols.
//!
//! Documentation comments win when present. Otherwise the symbol name is
//! matched against an ordered list of naming rules, and finally a generic
//! phrase for the symbol kind is used.

use regex::Regex;
use std::sync::OnceLock;

use super::repo_map::{Symbol, SymbolKind};

fn tagged_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s)@\w+\s*\{[^}]*\}").expect("static regex"))
}

fn bare_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s)@\w+").expect("static regex"))
}

/// Strip comment delimiters and annotation tags, keeping line structure
pub fn clean_documentation(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let mut text = line.trim();
            for delimiter in ["/**", "/*", "*/", "///", "//!", "//"] {
                if let Some(rest) = text.strip_prefix(delimiter) {
                    text = rest.trim();
                }
            }
            if let Some(rest) = text.strip_suffix("*/") {
                text = rest.trim();
            }
            text = text.trim_start_matches(['*', '#']).trim();

            let without_typed = tagged_type_regex().replace_all(text, "");
            bare_tag_regex()
                .replace_all(&without_typed, "")
                .trim()
                .to_string()
        })
        .collect()
}

/// First non-empty line of cleaned documentation
pub fn summary_line(raw: &str) -> Option<String> {
    clean_documentation(raw)
        .into_iter()
        .find(|line| !line.is_empty())
}

/// `UserRepository` -> `user repository`, `fetch_all` -> `fetch all`
pub fn split_words(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && (chars[i - 1].is_lowercase()
                || chars[i - 1].is_ascii_digit()
                || chars.get(i + 1).is_some_and(|n| n.is_lowercase()));
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

enum NameRule {
    /// Name ends with one of the suffixes; the stem is the name minus the suffix
    Suffix(&'static [&'static str]),
    /// Name contains one of the markers anywhere
    Contains(&'static [&'static str]),
    /// `IFoo` interfaces
    InterfacePrefix,
    /// Name starts with the prefix followed by an uppercase letter
    Prefix(&'static str),
}

struct PurposeRule {
    rule: NameRule,
    template: &'static str,
}

const PURPOSE_RULES: &[PurposeRule] = &[
    PurposeRule { rule: NameRule::Suffix(&["Service"]), template: "Service handling {} operations" },
    PurposeRule { rule: NameRule::Suffix(&["Repository", "Repo"]), template: "Data access layer for {}" },
    PurposeRule { rule: NameRule::Contains(&["Database", "DB", "Db"]), template: "Data access layer for {}" },
    PurposeRule { rule: NameRule::Suffix(&["Controller"]), template: "Controller coordinating {} requests" },
    PurposeRule { rule: NameRule::Suffix(&["Manager"]), template: "Manages {} lifecycle and state" },
    PurposeRule { rule: NameRule::Suffix(&["Handler"]), template: "Handles {} events" },
    PurposeRule { rule: NameRule::Suffix(&["Provider"]), template: "Provides {} to dependent code" },
    PurposeRule { rule: NameRule::Suffix(&["Factory"]), template: "Factory for creating {} instances" },
    PurposeRule { rule: NameRule::Suffix(&["Builder"]), template: "Builder for constructing {}" },
    PurposeRule { rule: NameRule::Suffix(&["Adapter"]), template: "Adapter exposing {} through a common interface" },
    PurposeRule { rule: NameRule::Suffix(&["Validator"]), template: "Validates {} input" },
    PurposeRule { rule: NameRule::Suffix(&["Utils", "Util", "Helpers", "Helper"]), template: "Utility helpers for {}" },
    PurposeRule { rule: NameRule::InterfacePrefix, template: "Contract for {} implementations" },
    PurposeRule { rule: NameRule::Suffix(&["Type"]), template: "Type definition for {}" },
    PurposeRule { rule: NameRule::Suffix(&["Props"]), template: "Props accepted by the {} component" },
    PurposeRule { rule: NameRule::Suffix(&["State"]), template: "State shape for {}" },
    PurposeRule { rule: NameRule::Suffix(&["Store"]), template: "Store holding {} state" },
    PurposeRule { rule: NameRule::Suffix(&["Event"]), template: "Event payload for {}" },
    PurposeRule { rule: NameRule::Prefix("get"), template: "Retrieves {}" },
    PurposeRule { rule: NameRule::Prefix("set"), template: "Updates {}" },
    PurposeRule { rule: NameRule::Prefix("is"), template: "Checks whether {}" },
    PurposeRule { rule: NameRule::Prefix("has"), template: "Checks whether it has {}" },
    PurposeRule { rule: NameRule::Prefix("create"), template: "Creates {}" },
    PurposeRule { rule: NameRule::Prefix("build"), template: "Builds {}" },
    PurposeRule { rule: NameRule::Prefix("parse"), template: "Parses {}" },
    PurposeRule { rule: NameRule::Prefix("format"), template: "Formats {}" },
    PurposeRule { rule: NameRule::Prefix("validate"), template: "Validates {}" },
    PurposeRule { rule: NameRule::Prefix("handle"), template: "Handles {}" },
    PurposeRule { rule: NameRule::Prefix("on"), template: "Reacts to {}" },
];

impl NameRule {
    /// Returns the stem that fills the template when the rule applies
    fn apply<'n>(&self, name: &'n str, kind: SymbolKind) -> Option<&'n str> {
        match self {
            NameRule::Suffix(suffixes) => suffixes.iter().find_map(|suffix| {
                name.strip_suffix(suffix)
                    .filter(|stem| !stem.is_empty())
            }),
            NameRule::Contains(markers) => markers
                .iter()
                .any(|marker| name.contains(marker))
                .then_some(name),
            NameRule::InterfacePrefix => {
                let mut chars = name.chars();
                let starts = chars.next() == Some('I')
                    && chars.next().is_some_and(|c| c.is_ascii_uppercase());
                (kind == SymbolKind::Interface && starts).then(|| &name[1..])
            }
            NameRule::Prefix(prefix) => name
                .strip_prefix(prefix)
                .filter(|rest| rest.chars().next().is_some_and(|c| c.is_uppercase())),
        }
    }
}

fn fallback_purpose(symbol: &Symbol) -> String {
    let name = &symbol.name;
    match symbol.kind {
        SymbolKind::Class => format!("Class {}", name),
        SymbolKind::Interface => format!("Interface describing {}", name),
        SymbolKind::Function => format!("Function {}", name),
        SymbolKind::Method => format!("Method {}", name),
        SymbolKind::Property => format!("Property {}", name),
        SymbolKind::Variable => format!("Variable {}", name),
        SymbolKind::Constant => format!("Constant {}", name),
        SymbolKind::Type => format!("Type alias {}", name),
        SymbolKind::Enum => format!("Enumeration of {} values", name),
        SymbolKind::Other => format!("Symbol {}", name),
    }
}

/// Purpose inferred from the symbol name alone
pub fn purpose_from_name(symbol: &Symbol) -> String {
    PURPOSE_RULES
        .iter()
        .find_map(|rule| {
            rule.rule
                .apply(&symbol.name, symbol.kind)
                .map(|stem| rule.template.replace("{}", &split_words(stem)))
        })
        .unwrap_or_else(|| fallback_purpose(symbol))
}

/// Documentation summary if any, otherwise a name-derived purpose
pub fn infer_purpose(symbol: &Symbol) -> String {
    symbol
        .documentation
        .as_deref()
        .and_then(summary_line)
        .unwrap_or_else(|| purpose_from_name(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::symbol;

    #[test]
    fn test_documentation_summary_strips_tags() {
        let doc = "/**\n * @module {Auth}\n * Validates session tokens.\n * @param {string} token raw token\n */";
        assert_eq!(summary_line(doc), Some("Validates session tokens.".to_string()));
    }

    #[test]
    fn test_email_addresses_are_not_tags() {
        let doc = "/** Contact admin@example.com for access. @internal */";
        assert_eq!(summary_line(doc), Some("Contact admin@example.com for access.".to_string()));
    }

    #[test]
    fn test_documentation_without_text_falls_back_to_name() {
        let s = symbol("1", "UserService", SymbolKind::Class, "a.ts").doc("/** @internal */");
        assert_eq!(infer_purpose(&s), "Service handling user operations");
    }

    #[test]
    fn test_rule_order_prefers_suffix_over_prefix() {
        let s = symbol("1", "createUserFactory", SymbolKind::Function, "a.ts");
        assert_eq!(purpose_from_name(&s), "Factory for creating create user instances");
    }

    #[test]
    fn test_interface_prefix_requires_interface_kind() {
        let iface = symbol("1", "IStorage", SymbolKind::Interface, "a.ts");
        let class = symbol("2", "IStorage", SymbolKind::Class, "a.ts");
        assert_eq!(purpose_from_name(&iface), "Contract for storage implementations");
        assert_eq!(purpose_from_name(&class), "Class IStorage");
    }

    #[test]
    fn test_prefix_needs_camel_boundary() {
        let getter = symbol("1", "getUserName", SymbolKind::Function, "a.ts");
        let issue = symbol("2", "issue", SymbolKind::Function, "a.ts");
        assert_eq!(purpose_from_name(&getter), "Retrieves user name");
        assert_eq!(purpose_from_name(&issue), "Function issue");
    }

    #[test]
    fn test_kind_fallbacks() {
        let e = symbol("1", "Color", SymbolKind::Enum, "a.ts");
        assert_eq!(infer_purpose(&e), "Enumeration of Color values");
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("UserRepository"), "user repository");
        assert_eq!(split_words("HTTPClient"), "http client");
        assert_eq!(split_words("fetch_all_items"), "fetch all items");
    }
}
