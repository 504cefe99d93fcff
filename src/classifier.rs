use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use crate::config::ClassifierConfig;
use crate::constants::EMAIL_PATTERN;

pub static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(EMAIL_PATTERN).unwrap()
});

/// Decides whether a normalized line is kept.
///
/// Implementations must be pure: workers call `accept` concurrently from
/// many threads and expect the same answer for the same input.
pub trait Classifier: Send + Sync {
    fn accept(&self, line: &str) -> bool;
}

impl<F> Classifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accept(&self, line: &str) -> bool {
        self(line)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Classifier for AcceptAll {
    fn accept(&self, _line: &str) -> bool {
        true
    }
}

/// Keeps plausible addresses under a required suffix, dropping denied
/// providers, trap mailboxes and a list of names.
#[derive(Debug, Clone)]
pub struct EmailClassifier {
    required_suffix: String,
    denied_domains: Vec<String>,
    trap_words: Vec<String>,
    rare_names: Vec<String>,
}

impl EmailClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let lowered = |words: &[String]| {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            required_suffix: config.required_suffix.trim().to_lowercase(),
            denied_domains: lowered(&config.denied_domains),
            trap_words: lowered(&config.trap_words),
            rare_names: lowered(&config.rare_names),
        }
    }

    fn contains_any(line: &str, words: &[String]) -> bool {
        words.iter().any(|w| line.contains(w.as_str()))
    }
}

impl Default for EmailClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl Classifier for EmailClassifier {
    fn accept(&self, line: &str) -> bool {
        if Self::contains_any(line, &self.denied_domains)
            || Self::contains_any(line, &self.trap_words)
            || Self::contains_any(line, &self.rare_names)
        {
            return false;
        }

        if !self.required_suffix.is_empty() && !line.ends_with(&self.required_suffix) {
            return false;
        }

        EMAIL_REGEX.is_match(line)
    }
}

pub fn from_config(config: &ClassifierConfig) -> Arc<dyn Classifier> {
    if config.accept_all {
        Arc::new(AcceptAll)
    } else {
        Arc::new(EmailClassifier::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_brazilian_address() {
        let classifier = EmailClassifier::default();
        assert!(classifier.accept("user@site.com.br"));
        assert!(classifier.accept("maria.silva+news@empresa.org.br"));
    }

    #[test]
    fn test_rejects_denied_domains_and_traps() {
        let classifier = EmailClassifier::default();
        assert!(!classifier.accept("ignoreme@gmail.com"));
        assert!(!classifier.accept("someone@hotmail.com.br"));
        assert!(!classifier.accept("noreply@loja.com.br"));
        assert!(!classifier.accept("postmaster@loja.com.br"));
        assert!(!classifier.accept("abuse@provedor.net.br"));
    }

    #[test]
    fn test_rejects_rare_names() {
        let classifier = EmailClassifier::default();
        assert!(!classifier.accept("ashley.santos@loja.com.br"));
        assert!(!classifier.accept("rohan@empresa.com.br"));
    }

    #[test]
    fn test_rejects_malformed_or_foreign() {
        let classifier = EmailClassifier::default();
        assert!(!classifier.accept("bad"));
        assert!(!classifier.accept("user@site.com"));
        assert!(!classifier.accept("two words@site.com.br"));
        assert!(!classifier.accept("@site.com.br"));
    }

    #[test]
    fn test_empty_suffix_disables_suffix_rule() {
        let config = ClassifierConfig {
            required_suffix: String::new(),
            ..ClassifierConfig::default()
        };
        let classifier = EmailClassifier::new(&config);
        assert!(classifier.accept("user@site.com"));
        assert!(!classifier.accept("user@gmail.com"));
    }

    #[test]
    fn test_closures_and_accept_all() {
        let only_short = |line: &str| line.len() < 5;
        assert!(only_short.accept("abc"));
        assert!(!only_short.accept("abcdef"));

        assert!(AcceptAll.accept("anything at all"));
        let accept_all = ClassifierConfig { accept_all: true, ..Default::default() };
        assert!(from_config(&accept_all).accept("bad"));
        assert!(!from_config(&ClassifierConfig::default()).accept("bad"));
    }
}
