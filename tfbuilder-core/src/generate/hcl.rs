//! Small HCL text helpers shared by both providers' generators.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

static NON_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_-]").expect("valid identifier regex"));

static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid key regex"));

/// Normalize free text into a Terraform resource identifier.
///
/// Lowercases, replaces anything outside `[a-z0-9_-]` with `_`, then folds
/// `-` into `_` so the result is also a valid local name.
pub fn to_terraform_id(name: &str) -> String {
    let lower = name.to_lowercase();
    let id = NON_ID_CHARS.replace_all(&lower, "_").replace('-', "_");
    if id.is_empty() {
        "unnamed".to_string()
    } else if id.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{id}")
    } else {
        id
    }
}

/// Escape a value for use inside a double-quoted HCL string
pub fn escape_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace("${", "$${")
}

/// `value` as a quoted HCL string literal
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape_string(value))
}

/// `["a", "b"]`, or `[]` when empty
pub fn string_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

/// `[a, b]` of raw expressions
pub fn expr_list<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    format!("[{}]", items.join(", "))
}

fn map_key(key: &str) -> String {
    if BARE_KEY.is_match(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Object of raw expressions; keys are quoted.
///
/// `indent` is the column of the line holding the opening brace.
pub fn expr_map<K: AsRef<str>, V: AsRef<str>>(entries: &[(K, V)], indent: usize) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let pad = " ".repeat(indent + 2);
    let mut out = String::from("{\n");
    for (key, value) in entries {
        let _ = writeln!(out, "{pad}{} = {}", quote(key.as_ref()), value.as_ref());
    }
    out.push_str(&" ".repeat(indent));
    out.push('}');
    out
}

/// Object of string values, keys bare where HCL allows it
pub fn string_map(entries: &BTreeMap<String, String>, indent: usize) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let keys: Vec<String> = entries.keys().map(|k| map_key(k)).collect();
    let width = keys.iter().map(String::len).max().unwrap_or(0);
    let pad = " ".repeat(indent + 2);
    let mut out = String::from("{\n");
    for (key, value) in keys.iter().zip(entries.values()) {
        let _ = writeln!(out, "{pad}{key:<width$} = {}", quote(value));
    }
    out.push_str(&" ".repeat(indent));
    out.push('}');
    out
}

/// Project tags plus `Project = <name>`, as an HCL object
pub fn format_tags(tags: &BTreeMap<String, String>, project_name: &str) -> String {
    let mut all = tags.clone();
    all.insert("Project".to_string(), project_name.to_string());
    string_map(&all, 2)
}

/// `key = value` lines with the `=` aligned, indented by `indent`
pub fn attributes<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)], indent: usize) -> String {
    let width = pairs.iter().map(|(k, _)| k.as_ref().len()).max().unwrap_or(0);
    let pad = " ".repeat(indent);
    pairs
        .iter()
        .map(|(k, v)| format!("{pad}{:<width$} = {}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Banner comment used to head each section of a generated file
pub fn comment_block(title: &str, description: Option<&str>) -> String {
    let rule = format!("# {}", "=".repeat(77));
    let mut out = format!("{rule}\n# {title}\n{rule}");
    if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
        let _ = write!(out, "\n# {desc}");
    }
    out
}

/// `body` headed by a [`comment_block`]
pub fn section(title: &str, description: &str, body: &str) -> String {
    format!("{}\n\n{}", comment_block(title, Some(description)), body.trim())
}

/// Join non-blank sections with one blank line between them
pub fn join_sections<I, S>(sections: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sections
        .into_iter()
        .filter(|s| !s.as_ref().trim().is_empty())
        .map(|s| s.as_ref().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Indent every non-empty line by `spaces`
pub fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A `variable` block. `default` is a rendered HCL expression.
pub fn variable(name: &str, description: &str, ty: &str, default: Option<&str>) -> String {
    let mut pairs = vec![("description", quote(description)), ("type", ty.to_string())];
    if let Some(default) = default {
        pairs.push(("default", default.to_string()));
    }
    format!("variable \"{name}\" {{\n{}\n}}", attributes(&pairs, 2))
}

/// An `output` block with a raw value expression
pub fn output(name: &str, description: &str, value: &str) -> String {
    let pairs = [("description", quote(description)), ("value", value.to_string())];
    format!("output \"{name}\" {{\n{}\n}}", attributes(&pairs, 2))
}

/// An `output` block marked sensitive
pub fn sensitive_output(name: &str, description: &str, value: &str) -> String {
    let pairs = [
        ("description", quote(description)),
        ("value", value.to_string()),
        ("sensitive", "true".to_string()),
    ];
    format!("output \"{name}\" {{\n{}\n}}", attributes(&pairs, 2))
}

/// JSON document as an indented HCL expression for `jsonencode(...)`
pub fn json_expr(value: &serde_json::Value, indent_by: usize) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    let indented = indent(&pretty, indent_by);
    indented.trim_start().to_string()
}
