use std::fmt::Write;

use factmail_core::Fact;

/// Fixed text surrounding the numbered facts.
#[derive(Clone, Debug)]
pub struct DigestTemplate {
    pub title: String,
    pub greeting: String,
    pub intro: Vec<String>,
    pub motto: String,
    pub closing: String,
}

impl Default for DigestTemplate {
    fn default() -> Self {
        Self {
            title: "Your Daily Wealth & Life Insights".into(),
            greeting: "Hey there!".into(),
            intro: vec![
                "These are topics worth thinking about every day while getting smarter in business, investing, health, and life. \
                 They're shared because we grow together. \
                 Hope this makes your day a little better and you learn something new."
                    .into(),
            ],
            motto: "1% better every day compounds. Let's build.".into(),
            closing: "Build wealth. Grow family. Live smart.".into(),
        }
    }
}

/// Renders the plain-text digest body. Pure: same facts, same output.
#[derive(Clone, Debug, Default)]
pub struct DigestFormatter {
    template: DigestTemplate,
}

impl DigestFormatter {
    pub fn new(template: DigestTemplate) -> Self {
        Self { template }
    }

    pub fn format(&self, facts: &[Fact]) -> String {
        let t = &self.template;
        let mut body = String::with_capacity(512 + facts.len() * 320);

        let underline = "=".repeat(t.title.chars().count());
        let _ = write!(body, "{}\n{underline}\n\n", t.title);

        if !t.greeting.is_empty() {
            let _ = write!(body, "{}\n\n", t.greeting);
        }
        for paragraph in &t.intro {
            let _ = write!(body, "{paragraph}\n\n");
        }
        let _ = write!(body, "{}\n\n---\n\n", t.motto);

        for (i, fact) in facts.iter().enumerate() {
            let _ = writeln!(body, "{}. [{}]", i + 1, fact.category);
            let _ = writeln!(body, "{}", fact.text);
            if let Some(source) = &fact.source {
                let _ = writeln!(body, "Source: {source}");
            }
            body.push('\n');
        }

        let _ = writeln!(body, "---\n{}", t.closing);
        body
    }
}
