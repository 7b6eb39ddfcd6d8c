use std::fmt::Write;

use factmail_core::{FactCategory, FACTS_PER_DIGEST};

const AUDIENCE: &str = "You are creating a daily email digest for successful entrepreneurs aged 30-35 who:
- Earn $300K+ annually with multiple income streams
- Are thinking about starting a family or recently had kids
- Actively manage LLCs, real estate, and angel investments
- Optimize tax strategies and wealth management
- Prioritize health, longevity, and peak performance";

const REQUIREMENTS: &str = "Each fact must:
- Be directly actionable or insightful for this demographic
- Include a credible source (publication, study, or expert)
- Be concise (2-3 sentences max)
- Provide specific numbers, strategies, or frameworks when possible";

const AVOID_HEADER: &str =
    "IMPORTANT: Do NOT repeat or closely paraphrase any of these recently sent facts:";

/// Build the generation prompt. `avoid` is the recency list, newest first;
/// an empty list omits the avoid block entirely.
pub fn build_prompt(avoid: &[String]) -> String {
    let per_category = FACTS_PER_DIGEST / FactCategory::ALL.len();
    let mut prompt = String::with_capacity(2048 + avoid.iter().map(|f| f.len() + 8).sum::<usize>());

    prompt.push_str(AUDIENCE);
    let _ = write!(
        prompt,
        "\n\nGenerate exactly {FACTS_PER_DIGEST} highly actionable and relevant facts across these categories:\n"
    );
    for (i, category) in FactCategory::ALL.iter().enumerate() {
        let _ = writeln!(prompt, "{}. **{}** - {}", i + 1, category.label(), category.description());
    }
    prompt.push('\n');
    prompt.push_str(REQUIREMENTS);

    if !avoid.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(AVOID_HEADER);
        for (i, fact) in avoid.iter().enumerate() {
            let _ = write!(prompt, "\n{}. {}", i + 1, fact);
        }
    }

    prompt.push_str("\n\nReturn the response in this exact JSON format:\n{\n  \"facts\": [\n");
    let examples: Vec<String> = FactCategory::ALL
        .iter()
        .map(|c| {
            format!(
                "    {{\"category\": \"{}\", \"fact\": \"...\", \"source\": \"Source Name\"}}",
                c.label()
            )
        })
        .collect();
    prompt.push_str(&examples.join(",\n"));
    prompt.push_str("\n  ]\n}\n\n");

    let _ = write!(
        prompt,
        "Make sure to include exactly {per_category} facts from each of the {} categories (total {FACTS_PER_DIGEST} facts).",
        FactCategory::ALL.len()
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_in_order() {
        let p = build_prompt(&["Old fact one".into()]);
        let audience = p.find("successful entrepreneurs aged 30-35").unwrap();
        let categories = p.find("1. **Tax & LLC Strategy** - Tax optimization").unwrap();
        let requirements = p.find("Each fact must:").unwrap();
        let avoid = p.find(AVOID_HEADER).unwrap();
        let format = p.find("Return the response in this exact JSON format:").unwrap();
        let closing = p
            .find("Make sure to include exactly 2 facts from each of the 5 categories (total 10 facts).")
            .unwrap();
        assert!(audience < categories);
        assert!(categories < requirements);
        assert!(requirements < avoid);
        assert!(avoid < format);
        assert!(format < closing);
        assert!(p.ends_with("(total 10 facts)."));
    }

    #[test]
    fn empty_avoid_list_omits_block() {
        let p = build_prompt(&[]);
        assert!(!p.contains("IMPORTANT"));
        assert!(p.contains("Provide specific numbers, strategies, or frameworks when possible\n\nReturn the response"));
    }

    #[test]
    fn avoid_list_is_numbered() {
        let p = build_prompt(&["Max out your Solo 401k.".into(), "Use a 1031 exchange.".into()]);
        assert!(p.contains(&format!(
            "{AVOID_HEADER}\n1. Max out your Solo 401k.\n2. Use a 1031 exchange.\n\nReturn"
        )));
    }

    #[test]
    fn all_categories_listed_with_descriptions() {
        let p = build_prompt(&[]);
        for (i, c) in FactCategory::ALL.iter().enumerate() {
            assert!(p.contains(&format!("{}. **{}** - {}", i + 1, c.label(), c.description())));
            assert!(p.contains(&format!("{{\"category\": \"{}\", \"fact\": \"...\"", c.label())));
        }
    }

    #[test]
    fn json_example_is_valid_shape() {
        let p = build_prompt(&[]);
        let start = p.find("{\n  \"facts\"").unwrap();
        let end = p.find("\n}\n").unwrap() + 2;
        let example: serde_json::Value = serde_json::from_str(&p[start..end]).unwrap();
        assert_eq!(example["facts"].as_array().unwrap().len(), 5);
    }
}
