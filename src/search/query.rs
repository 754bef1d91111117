use super::tokenizer::tokenize;

/// A parsed text search string.
///
/// Bare words are positive terms, a leading `-` negates a word, and
/// double quotes delimit a phrase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextQuery {
    pub terms: Vec<String>,
    pub negated: Vec<String>,
    pub phrases: Vec<String>,
}

impl TextQuery {
    pub fn parse(raw: &str) -> Self {
        let mut query = TextQuery::default();
        let mut rest = raw;

        while !rest.is_empty() {
            match rest.find('"') {
                Some(start) => {
                    query.push_words(&rest[..start]);
                    let after = &rest[start + 1..];
                    let (phrase, remainder) = match after.find('"') {
                        Some(end) => (&after[..end], &after[end + 1..]),
                        None => (after, ""),
                    };
                    query.push_phrase(phrase);
                    rest = remainder;
                }
                None => {
                    query.push_words(rest);
                    rest = "";
                }
            }
        }

        query
    }

    /// True when nothing could ever match: no positive terms and no phrases.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.phrases.is_empty()
    }

    /// Positive terms plus the tokens of every phrase, deduplicated.
    pub fn scoring_tokens(&self) -> Vec<String> {
        let mut tokens = self.terms.clone();
        for phrase in &self.phrases {
            for token in tokenize(phrase) {
                push_unique(&mut tokens, token);
            }
        }
        tokens
    }

    fn push_words(&mut self, segment: &str) {
        for word in segment.split_whitespace() {
            if let Some(negated) = word.strip_prefix('-') {
                for token in tokenize(negated) {
                    push_unique(&mut self.negated, token);
                }
            } else {
                for token in tokenize(word) {
                    push_unique(&mut self.terms, token);
                }
            }
        }
    }

    fn push_phrase(&mut self, phrase: &str) {
        let normalized = tokenize(phrase).join(" ");
        if !normalized.is_empty() && !self.phrases.contains(&normalized) {
            self.phrases.push(normalized);
        }
    }
}

fn push_unique(into: &mut Vec<String>, token: String) {
    if !into.contains(&token) {
        into.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_words_become_terms() {
        let query = TextQuery::parse("Red  widget red");
        assert_eq!(query.terms, vec!["red", "widget"]);
        assert!(query.negated.is_empty());
        assert!(query.phrases.is_empty());
    }

    #[test]
    fn leading_hyphen_negates() {
        let query = TextQuery::parse("widget -plastic super-glue");
        assert_eq!(query.terms, vec!["widget", "super", "glue"]);
        assert_eq!(query.negated, vec!["plastic"]);
    }

    #[test]
    fn quoted_phrases_are_collected() {
        let query = TextQuery::parse(r#"lamp "Desk  Lamp" "unterminated phrase"#);
        assert_eq!(query.terms, vec!["lamp"]);
        assert_eq!(query.phrases, vec!["desk lamp", "unterminated phrase"]);
        assert_eq!(
            query.scoring_tokens(),
            vec!["lamp", "desk", "unterminated", "phrase"]
        );
    }

    #[test]
    fn negation_only_query_is_empty() {
        assert!(TextQuery::parse("-widget").is_empty());
        assert!(TextQuery::parse("   ").is_empty());
        assert!(TextQuery::parse(r#""""#).is_empty());
        assert!(!TextQuery::parse(r#""acme tools""#).is_empty());
    }
}
