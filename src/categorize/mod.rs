use regex::Regex;

/// Category used when no rule matches an item description.
pub(crate) const FALLBACK_CATEGORY: &str = "others";

/// Built-in receipt keywords, checked in order.
const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "produce",
        &["banana", "maçã", "maça", "tomate", "alface", "cebola", "batata"],
    ),
    ("butcher", &["carne", "frango", "peixe", "linguiça", "bacon"]),
    ("dairy", &["leite", "queijo", "iogurte", "manteiga"]),
];

#[derive(Debug, Clone)]
pub(crate) struct KeywordRule {
    pub(crate) pattern: String,
    pub(crate) category: String,
    pub(crate) is_regex: bool,
}

impl KeywordRule {
    pub(crate) fn contains(pattern: &str, category: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            category: category.to_string(),
            is_regex: false,
        }
    }

    pub(crate) fn regex(pattern: &str, category: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            category: category.to_string(),
            is_regex: true,
        }
    }
}

pub(crate) struct Categorizer {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    pattern: String,
    regex: Option<Regex>,
    category: String,
}

impl Categorizer {
    /// Compile `rules` ahead of the built-in keyword table.
    ///
    /// Returns the categorizer and any regex patterns that failed to compile.
    /// Invalid regexes and empty keywords are dropped.
    pub(crate) fn from_rules(rules: &[KeywordRule]) -> (Self, Vec<String>) {
        let mut bad_patterns = Vec::new();
        let mut compiled: Vec<CompiledRule> = rules
            .iter()
            .filter_map(|r| {
                let regex = if r.is_regex {
                    match Regex::new(&format!("(?i){}", r.pattern)) {
                        Ok(re) => Some(re),
                        Err(_) => {
                            bad_patterns.push(r.pattern.clone());
                            return None;
                        }
                    }
                } else if r.pattern.trim().is_empty() {
                    return None;
                } else {
                    None
                };
                Some(CompiledRule {
                    pattern: r.pattern.to_lowercase(),
                    regex,
                    category: r.category.clone(),
                })
            })
            .collect();

        compiled.extend(Self::default_rules());
        (Self { rules: compiled }, bad_patterns)
    }

    fn default_rules() -> impl Iterator<Item = CompiledRule> {
        DEFAULT_KEYWORDS.iter().flat_map(|(category, words)| {
            words.iter().map(move |w| CompiledRule {
                pattern: w.to_string(),
                regex: None,
                category: category.to_string(),
            })
        })
    }

    /// First matching rule wins.
    pub(crate) fn categorize(&self, description: &str) -> Option<&str> {
        let desc_lower = description.to_lowercase();

        self.rules
            .iter()
            .find(|rule| match &rule.regex {
                Some(re) => re.is_match(description),
                None => desc_lower.contains(&rule.pattern),
            })
            .map(|rule| rule.category.as_str())
    }

    pub(crate) fn categorize_or_default(&self, description: &str) -> &str {
        self.categorize(description).unwrap_or(FALLBACK_CATEGORY)
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self {
            rules: Self::default_rules().collect(),
        }
    }
}
