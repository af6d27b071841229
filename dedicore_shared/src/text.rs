//! Templated messages.
//!
//! A [`TextContainer`] carries a message template plus positional parameters.
//! Placeholders are written `{%0}`, `{%1}`, ... and are substituted in a single
//! pass, so a parameter that itself looks like a placeholder is left alone.
//! Translation of templates is left to collaborators; rendering here only
//! fills in parameters.

use std::fmt;

/// A message template with positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextContainer {
    template: String,
    params: Vec<String>,
}

impl TextContainer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params<I, S>(template: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            template: template.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Substitutes the parameters into the template.
    ///
    /// Placeholders that reference a missing parameter are kept verbatim.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("{%") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let substituted = after.find('}').and_then(|end| {
                let index: usize = after[..end].parse().ok()?;
                let param = self.params.get(index)?;
                Some((param, end))
            });

            match substituted {
                Some((param, end)) => {
                    out.push_str(param);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str("{%");
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

impl fmt::Display for TextContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for TextContainer {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for TextContainer {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_positional_params() {
        let text = TextContainer::with_params("/{%0} needs {%1}", ["stop", "server.stop"]);
        assert_eq!(text.render(), "/stop needs server.stop");
        assert_eq!(text.to_string(), "/stop needs server.stop");
    }

    #[test]
    fn keeps_template_and_params_apart() {
        let text = TextContainer::with_params("{%0} joined", [String::from("alex")]);
        assert_eq!(text.template(), "{%0} joined");
        assert_eq!(text.params(), ["alex"]);

        let plain = TextContainer::from("Server restarting");
        assert!(plain.params().is_empty());
        assert_eq!(plain.render(), plain.template());
    }

    #[test]
    fn keeps_unknown_placeholders() {
        let text = TextContainer::with_params("{%0} {%3} {%x} {%", ["a"]);
        assert_eq!(text.render(), "a {%3} {%x} {%");
    }

    #[test]
    fn params_are_not_rescanned() {
        let text = TextContainer::with_params("{%0}-{%1}", ["{%1}", "b"]);
        assert_eq!(text.render(), "{%1}-b");
    }
}
