use rand::seq::SliceRandom;
use rand::Rng;

/// Fraction of a phrase word that must be covered by a common substring
/// for the word to count as hit.
const WORD_HIT_RATIO: f64 = 0.8;

/// Longest common substring (contiguous run, not subsequence) of two words.
///
/// Classic DP: `table[i][j]` is the length of the common run ending at
/// `a[i-1]` / `b[j-1]`, zero when the characters differ. The substring is
/// recovered from the position and length of the maximum cell. Operates on
/// chars so multi-byte input slices cleanly.
pub fn longest_common_substring(a: &str, b: &str) -> String {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    let mut max_len = 0;
    let mut end_pos = 0;

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                table[i][j] = table[i - 1][j - 1] + 1;
                if table[i][j] > max_len {
                    max_len = table[i][j];
                    end_pos = i;
                }
            }
        }
    }

    a[end_pos - max_len..end_pos].iter().collect()
}

/// Lowercases, strips punctuation and splits into words.
fn normalize_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Whether `phrase` shares at least one word with the message words, where
/// "shares" means some message word's longest common substring with the
/// phrase word covers at least 80% of the phrase word.
fn phrase_qualifies(message_words: &[String], phrase: &str) -> bool {
    let phrase_words = normalize_words(phrase);

    for phrase_word in &phrase_words {
        let phrase_len = phrase_word.chars().count();
        if phrase_len == 0 {
            continue;
        }
        for msg_word in message_words {
            let common = longest_common_substring(msg_word, phrase_word);
            if common.chars().count() as f64 >= WORD_HIT_RATIO * phrase_len as f64 {
                return true;
            }
        }
    }

    false
}

/// Picks a learned phrase similar to `message`, uniformly at random among
/// all qualifying phrases. Returns `None` when the corpus is empty or
/// nothing qualifies. The RNG is injected so selection is reproducible.
pub fn find_similar<'a, R: Rng>(
    phrases: &'a [String],
    message: &str,
    rng: &mut R,
) -> Option<&'a str> {
    if phrases.is_empty() {
        return None;
    }

    let message_words = normalize_words(message);

    let matched: Vec<&String> = phrases
        .iter()
        .filter(|p| phrase_qualifies(&message_words, p))
        .collect();

    matched.choose(rng).map(|p| p.as_str())
}
