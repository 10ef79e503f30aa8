//! Indexed Rule Engine: groups compiled rules by file-type so lookup per file is
//! O(rules applicable to that type) rather than O(corpus size).

use crate::types::{CompiledRule, FileType};
use std::collections::HashMap;

pub struct RuleIndex {
    by_type: HashMap<&'static str, Vec<usize>>,
    any: Vec<usize>,
    rules: Vec<CompiledRule>,
}

impl RuleIndex {
    pub fn build(rules: Vec<CompiledRule>) -> Self {
        let mut by_type: HashMap<&'static str, Vec<usize>> = HashMap::new();
        let mut any = Vec::new();
        for (i, rule) in rules.iter().enumerate() {
            if rule.applies_to_any {
                any.push(i);
                continue;
            }
            for ft in &rule.file_types {
                if let Some(canonical) = canonical_type_name(ft) {
                    by_type.entry(canonical).or_default().push(i);
                }
            }
        }
        Self {
            by_type,
            any,
            rules,
        }
    }

    /// Rules applicable to `file_type`: type-specific rules followed by "any" rules.
    pub fn applicable(&self, file_type: FileType) -> Vec<&CompiledRule> {
        let mut out: Vec<&CompiledRule> = self
            .by_type
            .get(file_type.as_str())
            .map(|idxs| idxs.iter().map(|&i| &self.rules[i]).collect())
            .unwrap_or_default();
        out.extend(self.any.iter().map(|&i| &self.rules[i]));
        out
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }
}

fn canonical_type_name(name: &str) -> Option<&'static str> {
    for ft in [
        FileType::Markdown,
        FileType::Json,
        FileType::Manifest,
        FileType::Python,
        FileType::Typescript,
        FileType::Javascript,
        FileType::Bash,
        FileType::Binary,
        FileType::Text,
    ] {
        if ft.as_str() == name {
            return Some(ft.as_str());
        }
    }
    None
}
