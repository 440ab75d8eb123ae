/// Rule-based sentiment oracle tuned for short customer reviews.
///
/// Each known word carries a valence on a -4..4 scale. Valences are adjusted by preceding
/// intensifiers and negations, by emphatic capitals, by a contrastive "but", and by
/// exclamation marks. The summed valence is squashed into [-1.0, 1.0] with
/// `x / sqrt(x^2 + ALPHA)`.
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use reputation_core::scorer::SentimentOracle;

const ALPHA: f64 = 15.0;

const BOOSTER_INCREMENT: f64 = 0.293;
const CAPS_INCREMENT: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

/// How many preceding tokens a booster or negation can reach.
const LOOKBACK: usize = 3;

const VOCABULARY: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("awful", -2.0),
    ("bad", -2.5),
    ("best", 3.2),
    ("broken", -1.8),
    ("careless", -1.5),
    ("cheap", -0.4),
    ("cheated", -2.3),
    ("clean", 1.7),
    ("complaint", -1.5),
    ("confusing", -1.3),
    ("damaged", -2.1),
    ("delay", -1.3),
    ("delayed", -1.3),
    ("delighted", 3.1),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("disaster", -3.1),
    ("easy", 1.9),
    ("efficient", 1.8),
    ("enjoy", 2.2),
    ("enjoyed", 2.3),
    ("excellent", 2.7),
    ("fake", -2.1),
    ("fantastic", 2.6),
    ("fast", 1.1),
    ("fine", 0.8),
    ("fraud", -2.8),
    ("friendly", 2.2),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("hate", -2.7),
    ("helpful", 1.8),
    ("horrible", -2.5),
    ("ignored", -1.5),
    ("impressed", 2.1),
    ("incompetent", -2.3),
    ("issue", -0.9),
    ("late", -0.9),
    ("like", 1.5),
    ("love", 3.2),
    ("lost", -1.3),
    ("lovely", 2.8),
    ("mess", -1.5),
    ("nice", 1.8),
    ("perfect", 2.7),
    ("pleased", 1.9),
    ("poor", -2.1),
    ("problem", -1.7),
    ("professional", 1.6),
    ("quick", 1.2),
    ("recommend", 1.5),
    ("refund", -0.6),
    ("reliable", 1.9),
    ("rude", -2.0),
    ("satisfied", 1.8),
    ("scam", -2.7),
    ("slow", -1.3),
    ("smooth", 1.5),
    ("sorry", -0.3),
    ("stolen", -2.2),
    ("superb", 3.1),
    ("terrible", -2.5),
    ("thank", 1.5),
    ("thanks", 1.9),
    ("unacceptable", -2.0),
    ("unhappy", -1.8),
    ("unhelpful", -1.8),
    ("useless", -1.8),
    ("waste", -1.8),
    ("wonderful", 2.7),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wrong", -2.1),
];

const BOOSTERS: &[&str] = &[
    "absolutely",
    "completely",
    "extremely",
    "highly",
    "incredibly",
    "really",
    "so",
    "super",
    "totally",
    "truly",
    "very",
];

const DAMPENERS: &[&str] = &["barely", "hardly", "slightly", "somewhat", "partly", "marginally"];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "nobody", "neither", "nor", "without", "cannot",
];

fn tokenizer() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"[\p{L}\p{N}'’]+").expect("valid regex"))
}

#[derive(Debug, Clone)]
pub struct LexiconOracle {
    valence: HashMap<&'static str, f64>,
}

impl Default for LexiconOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconOracle {
    pub fn new() -> Self {
        Self {
            valence: VOCABULARY.iter().copied().collect(),
        }
    }

    /// Add or override word valences (-4..4 scale).
    pub fn with_words(mut self, words: &[(&'static str, f64)]) -> Self {
        self.valence.extend(words.iter().copied());
        self
    }

    /// Compound polarity of `text` in [-1.0, 1.0].
    pub fn polarity(&self, text: &str) -> f64 {
        let tokens: Vec<&str> = tokenizer().find_iter(text).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            return 0.0;
        }
        let lowered: Vec<String> = tokens
            .iter()
            .map(|t| t.to_lowercase().replace('’', "'"))
            .collect();
        let shouting_everywhere = tokens.iter().all(|t| is_shouted(t));

        let mut valences: Vec<f64> = Vec::with_capacity(tokens.len());
        for (i, word) in lowered.iter().enumerate() {
            let Some(&base) = self.valence.get(word.as_str()) else {
                valences.push(0.0);
                continue;
            };

            let mut v = base;
            if !shouting_everywhere && is_shouted(tokens[i]) {
                v += CAPS_INCREMENT.copysign(base);
            }

            for distance in 1..=LOOKBACK.min(i) {
                let prior = lowered[i - distance].as_str();
                let decay = match distance {
                    1 => 1.0,
                    2 => 0.95,
                    _ => 0.9,
                };
                if BOOSTERS.contains(&prior) {
                    v += (BOOSTER_INCREMENT * decay).copysign(base);
                } else if DAMPENERS.contains(&prior) {
                    v -= (BOOSTER_INCREMENT * decay).copysign(base);
                }
            }

            if (1..=LOOKBACK.min(i)).any(|d| is_negation(&lowered[i - d])) {
                v *= NEGATION_SCALAR;
            }

            valences.push(v);
        }

        if let Some(pivot) = lowered.iter().position(|w| w == "but") {
            for (i, v) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *v *= 0.5;
                } else if i > pivot {
                    *v *= 1.5;
                }
            }
        }

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            sum += (bangs * EXCLAMATION_INCREMENT).copysign(sum);
        }

        normalize(sum)
    }
}

#[async_trait::async_trait]
impl SentimentOracle for LexiconOracle {
    async fn score(&self, text: &str) -> f64 {
        self.polarity(text)
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

fn is_shouted(token: &str) -> bool {
    token.chars().count() > 1
        && token.chars().any(char::is_alphabetic)
        && !token.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> f64 {
        LexiconOracle::new().polarity(text)
    }

    #[test]
    fn single_positive_word_matches_reference_compound() {
        // great = 3.1 -> 3.1 / sqrt(3.1^2 + 15)
        assert!((score("this is a great product") - 0.6249).abs() < 1e-4);
    }

    #[test]
    fn unknown_and_empty_text_is_neutral() {
        assert_eq!(score(""), 0.0);
        assert_eq!(score("   "), 0.0);
        assert_eq!(score("the parcel arrived on tuesday"), 0.0);
    }

    #[test]
    fn polarity_follows_vocabulary() {
        assert!(score("terrible experience overall") < -0.5);
        assert!(score("friendly staff and fast delivery") > 0.5);
    }

    #[test]
    fn negation_flips_polarity() {
        assert!(score("the support was not helpful") < 0.0);
        assert!(score("they didn't disappoint, never a problem") > 0.0);
    }

    #[test]
    fn typographic_apostrophe_still_negates() {
        assert_eq!(
            score("the staff didn’t seem helpful"),
            score("the staff didn't seem helpful")
        );
        assert!(score("the staff didn’t seem helpful") < 0.0);
    }

    #[test]
    fn boosters_and_dampeners_shift_intensity() {
        let plain = score("the service was good");
        assert!(score("the service was very good") > plain);
        assert!(score("the service was slightly good") < plain);
    }

    #[test]
    fn capitals_and_exclamations_emphasize() {
        let plain = score("the delivery was terrible");
        assert!(score("the delivery was TERRIBLE") < plain);
        assert!(score("the delivery was terrible!!!") < plain);
    }

    #[test]
    fn clause_after_but_dominates() {
        assert!(score("the staff were friendly but the product was terrible") < 0.0);
        assert!(score("delivery was slow but the product is excellent") > 0.0);
    }

    #[test]
    fn output_is_always_bounded() {
        let long = "great ".repeat(200);
        let s = score(&long);
        assert!(s > 0.99 && s <= 1.0);
        let s = score(&"WORST SCAM EVER!!!!!!!! ".repeat(50));
        assert!((-1.0..0.0).contains(&s));
    }

    #[test]
    fn custom_words_extend_vocabulary() {
        let oracle = LexiconOracle::new().with_words(&[("speedy", 2.0)]);
        assert!(oracle.polarity("remarkably speedy checkout process") > 0.0);
    }

    #[tokio::test]
    async fn oracle_trait_delegates_to_polarity() {
        let oracle = LexiconOracle::new();
        assert_eq!(oracle.name(), "lexicon");
        assert_eq!(oracle.score("great").await, oracle.polarity("great"));
    }
}
