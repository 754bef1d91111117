use super::query::TextQuery;
use super::tokenizer::tokenize;
use crate::entities::product;

/// An indexed field and the weight its matches contribute to the score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeight {
    pub field: &'static str,
    pub weight: f64,
}

/// Anything that can expose text for the indexed fields.
pub trait TextDocument {
    fn field_text(&self, field: &str) -> Option<&str>;
}

/// Scores documents against a [`TextQuery`] over a fixed set of weighted fields.
#[derive(Debug, Clone, Copy)]
pub struct WeightedTextIndex {
    pub fields: &'static [FieldWeight],
}

/// Index over products: title 5, brand 4, description 2.
pub const PRODUCT_TEXT_INDEX: WeightedTextIndex = WeightedTextIndex {
    fields: &[
        FieldWeight {
            field: "title",
            weight: 5.0,
        },
        FieldWeight {
            field: "brand",
            weight: 4.0,
        },
        FieldWeight {
            field: "description",
            weight: 2.0,
        },
    ],
};

struct AnalyzedField {
    weight: f64,
    tokens: Vec<String>,
    padded: String,
}

impl WeightedTextIndex {
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.field)
    }

    /// Relevance score of `document`, or `None` when it does not match.
    ///
    /// Every phrase must appear in some field and no negated term may appear
    /// anywhere. Without phrases at least one positive term must match. Each
    /// matched token adds `weight * (0.5 + 0.5 * occurrences / field_tokens)`.
    pub fn score<D: TextDocument>(&self, query: &TextQuery, document: &D) -> Option<f64> {
        if query.is_empty() {
            return None;
        }

        let analyzed: Vec<AnalyzedField> = self
            .fields
            .iter()
            .map(|f| {
                let tokens = document.field_text(f.field).map(tokenize).unwrap_or_default();
                let padded = format!(" {} ", tokens.join(" "));
                AnalyzedField {
                    weight: f.weight,
                    tokens,
                    padded,
                }
            })
            .collect();

        let negated_hit = query
            .negated
            .iter()
            .any(|term| analyzed.iter().any(|f| f.tokens.contains(term)));
        if negated_hit {
            return None;
        }

        let phrases_hit = query.phrases.iter().all(|phrase| {
            let needle = format!(" {} ", phrase);
            analyzed.iter().any(|f| f.padded.contains(&needle))
        });
        if !phrases_hit {
            return None;
        }

        let mut score = 0.0;
        let mut term_hit = false;
        for token in query.scoring_tokens() {
            for field in &analyzed {
                let occurrences = field.tokens.iter().filter(|t| **t == token).count();
                if occurrences == 0 {
                    continue;
                }
                let frequency = occurrences as f64 / field.tokens.len() as f64;
                score += field.weight * (0.5 + 0.5 * frequency);
                if query.terms.contains(&token) {
                    term_hit = true;
                }
            }
        }

        if query.phrases.is_empty() && !term_hit {
            return None;
        }

        (score > 0.0).then_some(score)
    }
}

impl TextDocument for product::Model {
    fn field_text(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(self.title.as_str()),
            "brand" => Some(self.brand.as_str()),
            "description" => self.description.as_deref(),
            _ => None,
        }
    }
}
