//! Prompt templates sent to the inference provider.
//!
//! Templates are versioned so a wording change shows up in logs and metrics
//! rather than only in the deployed binary.

/// A named, versioned prompt. Placeholders are written `{name}`.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub version: u32,
    pub text: &'static str,
}

pub const REPORT_PROMPT: PromptTemplate = PromptTemplate {
    name: "radiology_report",
    version: 1,
    text: "You are a meticulous radiologist. Give a detailed, structured report \
           (findings, impression, recommendations) on this chest X-ray.",
};

pub const FOLLOWUP_PROMPT: PromptTemplate = PromptTemplate {
    name: "report_followup",
    version: 1,
    text: "Given this radiology report:\n{report}\n\nAnswer this follow-up question: {question}",
};

impl PromptTemplate {
    /// Substitute `{name}` placeholders in a single pass.
    ///
    /// Substituted values are never re-scanned, so a report that happens to
    /// contain `{question}` stays literal. Unknown placeholders are kept as-is.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(
            self.text.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>(),
        );
        let mut rest = self.text;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match vars.iter().find(|(k, _)| *k == key) {
                        Some((_, value)) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// `name@vN`, used as a log/metric label.
    pub fn label(&self) -> String {
        format!("{}@v{}", self.name, self.version)
    }
}
