//! Text analysis primitives behind the tools

use rust_mcp_sdk::macros;
use serde::{Deserialize, Serialize};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "fantastic", "love", "like", "happy",
    "joy", "pleased", "awesome", "brilliant", "perfect", "best", "beautiful", "nice", "glad",
    "enjoy", "success",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "hate", "dislike", "sad", "angry", "poor", "worst",
    "ugly", "fail", "failure", "broken", "annoying", "disappointed", "problem", "wrong", "upset",
    "pain",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub lines: usize,
    pub average_word_length: f64,
}

pub fn count_text(text: &str) -> TextStats {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let letters: usize = words
        .iter()
        .map(|word| word.chars().filter(|c| c.is_alphanumeric()).count())
        .sum();

    let sentences = text
        .split(['.', '!', '?'])
        .filter(|sentence| !sentence.trim().is_empty())
        .count();

    let normalized = text.replace("\r\n", "\n");
    let paragraphs = normalized
        .split("\n\n")
        .filter(|paragraph| !paragraph.trim().is_empty())
        .count();

    let average_word_length = if words.is_empty() {
        0.0
    } else {
        ((letters as f64 / words.len() as f64) * 100.0).round() / 100.0
    };

    TextStats {
        characters: text.chars().count(),
        characters_no_spaces: text.chars().filter(|c| !c.is_whitespace()).count(),
        words: words.len(),
        sentences,
        paragraphs,
        lines: text.lines().count(),
        average_word_length,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum CaseMode {
    #[serde(rename = "upper")]
    Upper,
    #[serde(rename = "lower")]
    Lower,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "sentence")]
    Sentence,
    #[serde(rename = "camel")]
    Camel,
    #[serde(rename = "snake")]
    Snake,
    #[serde(rename = "kebab")]
    Kebab,
}

pub fn transform_case(text: &str, mode: CaseMode) -> String {
    match mode {
        CaseMode::Upper => text.to_uppercase(),
        CaseMode::Lower => text.to_lowercase(),
        CaseMode::Title => text
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        CaseMode::Sentence => sentence_case(text),
        CaseMode::Camel => {
            let words = identifier_words(text);
            let mut out = String::new();
            for (index, word) in words.iter().enumerate() {
                if index == 0 {
                    out.push_str(word);
                } else {
                    out.push_str(&capitalize(word));
                }
            }
            out
        }
        CaseMode::Snake => identifier_words(text).join("_"),
        CaseMode::Kebab => identifier_words(text).join("-"),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn sentence_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut capitalize_next = true;
    for character in text.chars() {
        if capitalize_next && character.is_alphabetic() {
            out.extend(character.to_uppercase());
            capitalize_next = false;
        } else {
            out.extend(character.to_lowercase());
        }
        if matches!(character, '.' | '!' | '?') {
            capitalize_next = true;
        }
    }
    out
}

/// Lowercase words split on punctuation, whitespace and camelCase humps.
fn identifier_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;

    for character in text.chars() {
        if !character.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if character.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = character.is_lowercase() || character.is_numeric();
        current.extend(character.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: i64,
    pub comparative: f64,
    pub word_count: usize,
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
}

pub fn analyze_sentiment(text: &str) -> Sentiment {
    let tokens = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>();

    let positive_words = tokens
        .iter()
        .filter(|token| POSITIVE_WORDS.contains(&token.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    let negative_words = tokens
        .iter()
        .filter(|token| NEGATIVE_WORDS.contains(&token.as_str()))
        .cloned()
        .collect::<Vec<_>>();

    let score = positive_words.len() as i64 - negative_words.len() as i64;
    let comparative = if tokens.is_empty() {
        0.0
    } else {
        ((score as f64 / tokens.len() as f64) * 1000.0).round() / 1000.0
    };
    let label = match score {
        s if s > 0 => SentimentLabel::Positive,
        s if s < 0 => SentimentLabel::Negative,
        _ => SentimentLabel::Neutral,
    };

    Sentiment {
        label,
        score,
        comparative,
        word_count: tokens.len(),
        positive_words,
        negative_words,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_sentences_and_paragraphs() {
        let stats = count_text("Hello world. How are you?\n\nFine!");

        assert_eq!(stats.words, 6);
        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.paragraphs, 2);
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.characters, 32);
        assert_eq!(stats.characters_no_spaces, 26);
    }

    #[test]
    fn counts_empty_text_as_zero() {
        let stats = count_text("");
        assert_eq!(stats.words, 0);
        assert_eq!(stats.sentences, 0);
        assert_eq!(stats.average_word_length, 0.0);
    }

    #[test]
    fn transforms_every_case_mode() {
        let text = "hello World-wide webApp";
        assert_eq!(transform_case(text, CaseMode::Upper), "HELLO WORLD-WIDE WEBAPP");
        assert_eq!(transform_case(text, CaseMode::Lower), "hello world-wide webapp");
        assert_eq!(transform_case(text, CaseMode::Title), "Hello World-wide Webapp");
        assert_eq!(transform_case(text, CaseMode::Camel), "helloWorldWideWebApp");
        assert_eq!(transform_case(text, CaseMode::Snake), "hello_world_wide_web_app");
        assert_eq!(transform_case(text, CaseMode::Kebab), "hello-world-wide-web-app");
        assert_eq!(
            transform_case("first ONE. second one", CaseMode::Sentence),
            "First one. Second one"
        );
    }

    #[test]
    fn case_mode_schema_lists_every_mode() {
        let schema = serde_json::Value::Object(CaseMode::json_schema());
        let modes = schema["oneOf"]
            .as_array()
            .expect("one entry per mode")
            .iter()
            .map(|entry| entry["enum"][0].as_str().expect("mode name"))
            .collect::<Vec<_>>();

        assert_eq!(
            modes,
            vec!["upper", "lower", "title", "sentence", "camel", "snake", "kebab"]
        );
    }

    #[test]
    fn sentiment_scores_keywords() {
        let positive = analyze_sentiment("I love this great product");
        assert_eq!(positive.label, SentimentLabel::Positive);
        assert_eq!(positive.score, 2);
        assert_eq!(positive.positive_words, vec!["love", "great"]);

        let negative = analyze_sentiment("Terrible, just terrible and broken.");
        assert_eq!(negative.label, SentimentLabel::Negative);
        assert_eq!(negative.score, -3);

        let neutral = analyze_sentiment("The meeting is at noon");
        assert_eq!(neutral.label, SentimentLabel::Neutral);
        assert_eq!(neutral.comparative, 0.0);
    }
}
