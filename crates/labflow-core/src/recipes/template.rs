//! Template markers in binding values.
//!
//! A binding value is a plain string in which `{name}` marks a place where
//! the active loop variable is substituted. `{{` and `}}` stand for literal
//! braces. Marker names follow identifier rules (`[A-Za-z_][A-Za-z0-9_]*`).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A parsed binding value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let malformed = |position: usize, reason: &str| TemplateError::Malformed {
            template: raw.to_string(),
            position,
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = raw.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    text.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(malformed(pos, "unclosed '{'"));
                    }
                    if !is_identifier(&name) {
                        return Err(malformed(pos, "marker name must be an identifier"));
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Var(name));
                }
                '}' => return Err(malformed(pos, "unmatched '}'")),
                other => text.push(other),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The string exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Marker names in order of appearance (repeats included).
    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn has_markers(&self) -> bool {
        self.variables().next().is_some()
    }

    /// Substitute markers from `env`. On a missing name, returns that name.
    pub fn render(&self, env: &IndexMap<String, String>) -> Result<String, String> {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(name) => match env.get(name) {
                    Some(value) => out.push_str(value),
                    None => return Err(name.clone()),
                },
            }
        }
        Ok(out)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The value bound to one parameter of a step.
///
/// Serialized as the raw string, so a saved recipe keeps its markers
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Binding {
    /// A value with no markers.
    Literal(String),
    /// A value containing at least one marker or escaped brace.
    Template(Template),
}

impl Binding {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let template = Template::parse(raw)?;
        let plain = match template.segments.as_slice() {
            [] => true,
            [Segment::Text(text)] => text == raw,
            _ => false,
        };
        if plain {
            Ok(Binding::Literal(raw.to_string()))
        } else {
            Ok(Binding::Template(template))
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Binding::Literal(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Binding::Literal(raw) => raw,
            Binding::Template(t) => t.as_str(),
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Binding::Template(t) if t.has_markers())
    }

    pub fn variables(&self) -> Vec<&str> {
        match self {
            Binding::Literal(_) => Vec::new(),
            Binding::Template(t) => t.variables().collect(),
        }
    }

    /// Concrete string for this binding. Returns the missing name on failure.
    pub fn resolve(&self, env: &IndexMap<String, String>) -> Result<String, String> {
        match self {
            Binding::Literal(raw) => Ok(raw.clone()),
            Binding::Template(t) => t.render(env),
        }
    }
}

impl TryFrom<String> for Binding {
    type Error = TemplateError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Binding::parse(&raw)
    }
}

impl From<Binding> for String {
    fn from(binding: Binding) -> Self {
        match binding {
            Binding::Literal(raw) => raw,
            Binding::Template(t) => t.raw,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_value_is_literal() {
        assert_eq!(Binding::parse("70").unwrap(), Binding::Literal("70".into()));
        assert_eq!(Binding::parse("").unwrap(), Binding::Literal(String::new()));
    }

    #[test]
    fn test_whole_marker() {
        let binding = Binding::parse("{field}").unwrap();
        assert!(binding.is_template());
        assert_eq!(binding.variables(), vec!["field"]);
        assert_eq!(binding.resolve(&env(&[("field", "0.1")])).unwrap(), "0.1");
    }

    #[test]
    fn test_embedded_markers() {
        let binding = Binding::parse("run_{field}T_{power}mW").unwrap();
        assert_eq!(binding.variables(), vec!["field", "power"]);
        assert_eq!(
            binding
                .resolve(&env(&[("field", "0.5"), ("power", "70")]))
                .unwrap(),
            "run_0.5T_70mW"
        );
    }

    #[test]
    fn test_escaped_braces() {
        let binding = Binding::parse("{{not a marker}}").unwrap();
        assert!(!binding.is_template());
        assert_eq!(binding.resolve(&env(&[])).unwrap(), "{not a marker}");
        assert_eq!(binding.as_str(), "{{not a marker}}");
    }

    #[test]
    fn test_unresolved_reports_name() {
        let binding = Binding::parse("{power}").unwrap();
        assert_eq!(binding.resolve(&env(&[("field", "1")])), Err("power".to_string()));
    }

    #[test]
    fn test_malformed_templates() {
        for raw in ["{field", "field}", "{}", "{2x}", "{a b}"] {
            assert!(
                matches!(Binding::parse(raw), Err(TemplateError::Malformed { .. })),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn test_serde_keeps_raw_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            value: Binding,
        }

        let wrapper = Wrapper {
            value: Binding::parse("{field}").unwrap(),
        };
        let toml = toml::to_string(&wrapper).unwrap();
        assert_eq!(toml.trim(), r#"value = "{field}""#);

        let back: Wrapper = toml::from_str(&toml).unwrap();
        assert_eq!(back.value, wrapper.value);
    }
}
