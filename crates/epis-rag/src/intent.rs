//! Rule-based intent classification
//!
//! Questions are routed by case-insensitive substring matching against two
//! keyword lists: problem keywords first, farewell keywords second, and
//! `general_question` when nothing matches.
//!
//! Routing used to ask the language model for a JSON intent. Small local
//! models produced malformed JSON and timed out, so routing no longer calls
//! the model. Do not put a model call back on this path.
//!
//! Author: hephaex@gmail.com

use epis_core::{Intent, RouterConfig};

/// Keyword-based intent classifier
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    problem_keywords: Vec<String>,
    farewell_keywords: Vec<String>,
}

impl IntentClassifier {
    /// Create a classifier from keyword lists
    pub fn new<I, S>(problem_keywords: I, farewell_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            problem_keywords: normalize_keywords(problem_keywords),
            farewell_keywords: normalize_keywords(farewell_keywords),
        }
    }

    /// Create from config
    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(&config.problem_keywords, &config.farewell_keywords)
    }

    /// Classify a question
    pub fn classify(&self, question: &str) -> Intent {
        let question = question.to_lowercase();

        if contains_any(&question, &self.problem_keywords) {
            Intent::ProblemReport
        } else if contains_any(&question, &self.farewell_keywords) {
            Intent::Farewell
        } else {
            Intent::GeneralQuestion
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::from_config(&RouterConfig::default())
    }
}

fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // An empty keyword would match every question
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_problem_keywords() {
        let classifier = IntentClassifier::default();
        for question in [
            "mi impresora no funciona",
            "I get an ERROR when logging in",
            "the laptop screen is broken",
            "La pantalla se apaga sola",
            "my computer won't turn on",
            "internet is very slow today",
        ] {
            assert_eq!(classifier.classify(question), Intent::ProblemReport, "{question}");
        }
    }

    #[test]
    fn test_farewell_keywords() {
        let classifier = IntentClassifier::default();
        for question in ["Muchas gracias", "ok, bye!", "Thanks a lot", "adiós", "Hasta luego"] {
            assert_eq!(classifier.classify(question), Intent::Farewell, "{question}");
        }
    }

    #[test]
    fn test_problem_checked_before_farewell() {
        let classifier = IntentClassifier::default();
        assert_eq!(
            classifier.classify("thanks, but the printer is still broken"),
            Intent::ProblemReport
        );
    }

    #[test]
    fn test_default_is_general_question() {
        let classifier = IntentClassifier::default();
        assert_eq!(
            classifier.classify("¿Cuántos días de vacaciones tengo?"),
            Intent::GeneralQuestion
        );
        assert_eq!(classifier.classify("How do I book a meeting room?"), Intent::GeneralQuestion);
        assert_eq!(classifier.classify(""), Intent::GeneralQuestion);
        assert_eq!(classifier.classify("   "), Intent::GeneralQuestion);
    }

    #[test]
    fn test_custom_keywords_are_case_insensitive() {
        let classifier = IntentClassifier::new(vec!["VPN"], vec!["Ciao"]);
        assert_eq!(classifier.classify("my vpn drops"), Intent::ProblemReport);
        assert_eq!(classifier.classify("CIAO!"), Intent::Farewell);
        assert_eq!(classifier.classify("printer broken"), Intent::GeneralQuestion);
    }

    #[test]
    fn test_blank_keywords_are_ignored() {
        let classifier = IntentClassifier::new(vec!["", "  "], vec![""]);
        assert_eq!(classifier.classify("anything"), Intent::GeneralQuestion);
    }

    proptest! {
        #[test]
        fn prop_classification_is_deterministic(question in ".*") {
            let classifier = IntentClassifier::default();
            prop_assert_eq!(classifier.classify(&question), classifier.classify(&question));
        }

        #[test]
        fn prop_problem_keyword_always_wins(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
            let classifier = IntentClassifier::default();
            let question = format!("{prefix} error {suffix} goodbye");
            prop_assert_eq!(classifier.classify(&question), Intent::ProblemReport);
        }

        #[test]
        fn prop_case_does_not_matter(question in "[a-zA-Z ]{0,40}") {
            let classifier = IntentClassifier::default();
            prop_assert_eq!(
                classifier.classify(&question.to_uppercase()),
                classifier.classify(&question.to_lowercase())
            );
        }
    }
}
