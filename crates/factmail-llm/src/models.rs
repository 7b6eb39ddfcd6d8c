/// Static facts about a Claude model.
#[derive(Clone, Debug)]
pub struct ClaudeModelInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub context_window: usize,
    pub max_output: u32,
}

pub static CLAUDE_OPUS_4_6: ClaudeModelInfo = ClaudeModelInfo {
    name: "claude-opus-4-6",
    display_name: "Claude Opus 4.6",
    context_window: 200_000,
    max_output: 128_000,
};

pub static CLAUDE_SONNET_4_5: ClaudeModelInfo = ClaudeModelInfo {
    name: "claude-sonnet-4-5-20250929",
    display_name: "Claude Sonnet 4.5",
    context_window: 200_000,
    max_output: 64_000,
};

pub static CLAUDE_HAIKU_4_5: ClaudeModelInfo = ClaudeModelInfo {
    name: "claude-haiku-4-5-20251001",
    display_name: "Claude Haiku 4.5",
    context_window: 200_000,
    max_output: 64_000,
};

static ALL_MODELS: &[&ClaudeModelInfo] = &[&CLAUDE_OPUS_4_6, &CLAUDE_SONNET_4_5, &CLAUDE_HAIKU_4_5];

pub fn find_model(name: &str) -> Option<&'static ClaudeModelInfo> {
    ALL_MODELS.iter().find(|m| m.name == name).copied()
}

pub fn default_model() -> &'static ClaudeModelInfo {
    &CLAUDE_SONNET_4_5
}

pub fn all_models() -> &'static [&'static ClaudeModelInfo] {
    ALL_MODELS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_known_models() {
        assert!(find_model("claude-opus-4-6").is_some());
        assert!(find_model("claude-sonnet-4-5-20250929").is_some());
        assert!(find_model("claude-haiku-4-5-20251001").is_some());
        assert!(find_model("nonexistent").is_none());
    }

    #[test]
    fn default_is_sonnet() {
        assert_eq!(default_model().name, "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn model_names_unique() {
        let mut names: Vec<_> = all_models().iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all_models().len());
    }
}
