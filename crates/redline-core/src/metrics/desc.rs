//! Metric descriptors: name, help text, and the declared label schema.

use std::fmt::{self, Write};

use crate::error::{RedlineError, Result};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Help text only escapes backslash and newline.
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn valid_name(s: &str, allow_colon: bool) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false; };
    let head_ok = first.is_ascii_alphabetic() || first == '_' || (allow_colon && first == ':');
    head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':'))
}

/// Immutable description of a metric family.
#[derive(Debug, Clone)]
pub struct Desc {
    name: String,
    help: String,
    label_names: Vec<String>,
}

impl Desc {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        if !valid_name(name, true) {
            return Err(RedlineError::Config(format!("invalid metric name: {name:?}")));
        }
        for l in label_names {
            if !valid_name(l, false) || l.starts_with("__") {
                return Err(RedlineError::Config(format!(
                    "invalid label name {l:?} for metric {name}"
                )));
            }
        }
        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Build the series key for `values`, checking arity against the schema.
    pub(crate) fn key(&self, values: &[&str]) -> Result<Vec<String>> {
        if values.len() != self.label_names.len() {
            return Err(RedlineError::LabelMismatch {
                metric: self.name.clone(),
                expected: self.label_names.len(),
                got: values.len(),
            });
        }
        Ok(values.iter().map(|v| v.to_string()).collect())
    }

    /// Write `# HELP` and `# TYPE` header lines.
    pub(crate) fn write_header(&self, kind: &str, out: &mut String) -> fmt::Result {
        writeln!(out, "# HELP {} {}", self.name, escape_help(&self.help))?;
        writeln!(out, "# TYPE {} {}", self.name, kind)
    }

    /// Write `{k="v",...}` for a series key, plus an optional trailing pair
    /// (the histogram `le`). Writes nothing when there are no labels at all.
    pub(crate) fn write_labels(
        &self,
        out: &mut String,
        key: &[String],
        extra: Option<(&str, &str)>,
    ) -> fmt::Result {
        if key.is_empty() && extra.is_none() {
            return Ok(());
        }
        out.push('{');
        let mut first = true;
        let pairs = self
            .label_names
            .iter()
            .map(String::as_str)
            .zip(key.iter().map(String::as_str))
            .chain(extra);
        for (k, v) in pairs {
            if !first {
                out.push(',');
            }
            first = false;
            write!(out, "{}=\"{}\"", k, escape_label(v))?;
        }
        out.push('}');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn rejects_bad_names() {
        assert!(Desc::new("1abc", "h", &[]).is_err());
        assert!(Desc::new("ok_name", "h", &["bad-label"]).is_err());
        assert!(Desc::new("ok_name", "h", &["__reserved"]).is_err());
        assert!(Desc::new("ns:ok_name", "h", &["method"]).is_ok());
    }

    #[test]
    fn label_arity_is_checked() {
        let d = Desc::new("m", "h", &["a", "b"]).unwrap();
        assert!(d.key(&["x"]).is_err());
        assert_eq!(d.key(&["x", "y"]).unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn labels_are_escaped() {
        let d = Desc::new("m", "h", &["path"]).unwrap();
        let mut out = String::new();
        d.write_labels(&mut out, &["a\"b\\c\nd".to_string()], Some(("le", "0.1")))
            .unwrap();
        assert_eq!(out, r#"{path="a\"b\\c\nd",le="0.1"}"#);
    }
}
