//! Table naming convention: table name is the plural of the entity name.
//!
//! The rule set is the usual English inflection table (suffix rules,
//! irregular nouns, uncountable nouns). Rules are tried in order and the
//! first matching one wins. The leading character keeps its case.

use once_cell::sync::Lazy;
use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: String,
}

const SUFFIX_RULES: &[(&str, &str)] = &[
    (r"(?i)(quiz)$", "${1}zes"),
    (r"(?i)^(oxen)$", "${1}"),
    (r"(?i)^(ox)$", "${1}en"),
    (r"(?i)(m|l)ice$", "${1}ice"),
    (r"(?i)(m|l)ouse$", "${1}ice"),
    (r"(?i)(passer)s?by$", "${1}sby"),
    (r"(?i)(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
    (r"(?i)(x|ch|ss|sh)$", "${1}es"),
    (r"(?i)([^aeiouy]|qu)y$", "${1}ies"),
    (r"(?i)(hive)$", "${1}s"),
    (r"(?i)([lr])f$", "${1}ves"),
    (r"(?i)([^f])fe$", "${1}ves"),
    (r"(?i)sis$", "ses"),
    (r"(?i)([ti])a$", "${1}a"),
    (r"(?i)([ti])um$", "${1}a"),
    (r"(?i)(buffal|potat|tomat)o$", "${1}oes"),
    (r"(?i)(bu)s$", "${1}ses"),
    (r"(?i)(alias|status)$", "${1}es"),
    (r"(?i)(octop|vir)i$", "${1}i"),
    (r"(?i)(octop|vir)us$", "${1}i"),
    (r"(?i)^(ax|test)is$", "${1}es"),
    (r"(?i)s$", "s"),
    (r"$", "s"),
];

const IRREGULARS: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("human", "humans"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("cow", "kine"),
    ("zombie", "zombies"),
];

const UNCOUNTABLES: &[&str] = &[
    "equipment",
    "fish",
    "information",
    "jeans",
    "money",
    "rice",
    "series",
    "sheep",
    "species",
];

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let mut rules = Vec::with_capacity(IRREGULARS.len() * 4 + SUFFIX_RULES.len());
    // Later irregulars shadow earlier ones (`human` before `man`).
    for (singular, plural) in IRREGULARS.iter().rev() {
        irregular_rules(singular, plural, &mut rules);
    }
    rules.extend(SUFFIX_RULES.iter().map(|(pattern, replacement)| Rule {
        pattern: Regex::new(pattern).expect("valid plural suffix regex"),
        replacement: (*replacement).to_string(),
    }));
    rules
});

/// Returns the table name for an entity type name.
pub fn table_name(entity_name: &str) -> String {
    pluralize(entity_name)
}

/// Returns the plural form of `word`.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || is_uncountable(word) {
        return word.to_string();
    }

    RULES
        .iter()
        .find(|rule| rule.pattern.is_match(word))
        .map(|rule| {
            rule.pattern
                .replace(word, rule.replacement.as_str())
                .into_owned()
        })
        .unwrap_or_else(|| word.to_string())
}

fn is_uncountable(word: &str) -> bool {
    let lowered = word.to_ascii_lowercase();
    UNCOUNTABLES.contains(&lowered.as_str())
}

fn irregular_rules(singular: &str, plural: &str, rules: &mut Vec<Rule>) {
    let (s_head, s_tail) = split_first(singular);
    let (p_head, p_tail) = split_first(plural);

    if s_head.eq_ignore_ascii_case(p_head) {
        // Shared first letter: capture it so its case survives.
        for source in [(p_head, p_tail), (s_head, s_tail)] {
            rules.push(Rule {
                pattern: Regex::new(&format!(
                    "(?i)({}){}$",
                    regex::escape(source.0),
                    regex::escape(source.1)
                ))
                .expect("valid irregular plural regex"),
                replacement: format!("${{1}}{p_tail}"),
            });
        }
        return;
    }

    for (head, tail) in [(p_head, p_tail), (s_head, s_tail)] {
        for upper in [true, false] {
            let (lead, out) = if upper {
                (head.to_ascii_uppercase(), p_head.to_ascii_uppercase())
            } else {
                (head.to_ascii_lowercase(), p_head.to_ascii_lowercase())
            };
            rules.push(Rule {
                pattern: Regex::new(&format!(
                    "{}(?i:{})$",
                    regex::escape(&lead),
                    regex::escape(tail)
                ))
                .expect("valid irregular plural regex"),
                replacement: format!("{out}{p_tail}"),
            });
        }
    }
}

fn split_first(word: &str) -> (&str, &str) {
    let boundary = word.chars().next().map_or(0, char::len_utf8);
    word.split_at(boundary)
}
