// src/core/markdown.rs
use chrono::{DateTime, SecondsFormat, Utc};

/// Title, generation stamp and overview shared by every document
pub fn document_header(title: &str, generated_at: &DateTime<Utc>, overview: &str) -> String {
    format!(
        "# {}\n\n> Generated: {}\n\n## Overview\n\n{}\n\n",
        title,
        timestamp(generated_at),
        overview.trim()
    )
}

pub fn timestamp(generated_at: &DateTime<Utc>) -> String {
    generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Pipes and newlines would break the row
pub fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = format!("| {} |\n", headers.join(" | "));
    out.push_str(&format!(
        "|{}\n",
        headers.iter().map(|_| "---|").collect::<String>()
    ));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| cell(c)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out.push('\n');
    out
}

pub fn mermaid(diagram: &str) -> String {
    format!("```mermaid\n{}```\n\n", diagram)
}

pub fn code_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("`{}`", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn or_dash(text: &str) -> String {
    if text.trim().is_empty() {
        "-".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_header_layout() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let header = document_header("Architecture", &at, "Small app.");
        assert_eq!(
            header,
            "# Architecture\n\n> Generated: 2024-05-01T12:00:00.000Z\n\n## Overview\n\nSmall app.\n\n"
        );
    }

    #[test]
    fn test_table_escapes_pipes() {
        let text = table(&["A", "B"], &[vec!["x|y".to_string(), "z".to_string()]]);
        assert_eq!(text, "| A | B |\n|---|---|\n| x\\|y | z |\n\n");
    }
}
