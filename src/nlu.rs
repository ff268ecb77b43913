use similar::TextDiff;

/// Minimum similarity ratio for a replacement
pub const SIMILARITY_CUTOFF: f32 = 0.6;

/// Tokens shorter than this are never rewritten ("on", "to", "the")
const MIN_CORRECTABLE_LEN: usize = 4;

/// Words that trigger specific rule logic
pub const CORE_VOCAB: &[&str] = &[
    "play", "stop", "pause", "resume", "next", "previous",
    "open", "close", "search", "find", "google", "youtube",
    "time", "date", "weather", "shutdown", "restart",
    "volume", "mute", "unmute", "increase", "decrease",
    "screenshot", "generate", "image", "picture", "photo",
    "who", "what", "where", "when", "why", "how",
    "hello", "hi", "hey", "sami",
    "deep", "fast", "quick", "mode", "enable", "disable",
    "research", "analyze", "scan", "read",
    "price", "cost", "buy", "shop", "latest", "news",
    "code", "vscode", "visual", "studio",
];

/// Vocabulary words that act on the machine. They are kept when heard
/// exactly but no other token is ever rewritten into them.
pub const EXACT_ONLY: &[&str] = &["close", "shutdown", "restart"];

/// Ordinary words that sit close to a vocabulary entry but carry their own
/// meaning for the rules ("start" is not "restart", "exit" is not "next")
pub const KEEP_AS_IS: &[&str] = &[
    "name", "made", "created", "bored", "good", "doing", "what's", "let's",
    "reasoning", "thinking", "advanced", "music", "song", "start", "work",
    "exit", "quit", "sleep", "change", "language", "india", "france",
    "hindi", "tamil", "french", "thanks", "tell",
    "friend", "friends", "friendly", "casual", "serious", "professional",
    "plus", "capital", "morning", "night", "routine",
    "chrome", "whatsapp", "notepad", "spotify", "screen", "computer",
    "folder", "file", "files", "note", "notes", "create", "delete", "brightness",
    "star", "stars", "closest",
];

/// Rewrite near-miss tokens to vocabulary words.
///
/// Exact matches keep their original casing; replacements are emitted in the
/// vocabulary's lowercase form. Tokens are rejoined with single spaces.
pub fn autocorrect(sentence: &str) -> String {
    sentence
        .split_whitespace()
        .map(|word| correct_word(word).unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn correct_word(word: &str) -> Option<&'static str> {
    let clean = word
        .trim_matches(|c| matches!(c, '.' | ',' | '?' | '!'))
        .to_lowercase();

    if clean.chars().count() < MIN_CORRECTABLE_LEN
        || CORE_VOCAB.contains(&clean.as_str())
        || KEEP_AS_IS.contains(&clean.as_str())
    {
        return None;
    }
    if clean
        .chars()
        .any(|c| c.is_ascii_digit() || matches!(c, '.' | '/' | '\\'))
    {
        return None;
    }

    closest_match(&clean)
}

/// Best vocabulary entry at or above the cutoff; earlier entries win ties
pub fn closest_match(word: &str) -> Option<&'static str> {
    let mut best: Option<(&'static str, f32)> = None;

    for candidate in CORE_VOCAB.iter().filter(|c| !EXACT_ONLY.contains(*c)) {
        let score = similarity(word, candidate);
        if score < SIMILARITY_CUTOFF {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((*candidate, score));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Character-level similarity in `0.0..=1.0` (2 * matches / total length)
pub fn similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrects_transposed_command_words() {
        assert_eq!(autocorrect("plya jazz"), "play jazz");
        assert_eq!(autocorrect("opne youtube"), "open youtube");
        assert_eq!(autocorrect("scrrenshot"), "screenshot");
    }

    #[test]
    fn keeps_exact_matches_with_casing() {
        assert_eq!(autocorrect("Open YouTube"), "Open YouTube");
        assert_eq!(autocorrect("what time is it?"), "what time is it?");
    }

    #[test]
    fn leaves_unknown_and_short_words() {
        assert_eq!(autocorrect("fast mode on"), "fast mode on");
        assert_eq!(autocorrect("what is 4 plus 5"), "what is 4 plus 5");
        assert_eq!(autocorrect("about jazz music"), "about jazz music");
    }

    #[test]
    fn keeps_rule_words_that_resemble_commands() {
        assert_eq!(autocorrect("start work"), "start work");
        assert_eq!(autocorrect("my name is ada"), "my name is ada");
        assert_eq!(autocorrect("enable reasoning"), "enable reasoning");
        assert_eq!(autocorrect("stop music"), "stop music");
    }

    #[test]
    fn never_rewrites_into_machine_actions() {
        assert_eq!(autocorrect("what does a clock do"), "what does a clock do");
        assert_eq!(autocorrect("which is the closest star"), "which is the closest star");
        assert_eq!(autocorrect("restrat"), "restrat");
        assert_eq!(autocorrect("close it"), "close it");
        assert_eq!(autocorrect("shutdown"), "shutdown");
    }

    #[test]
    fn leaves_paths_and_hosts_alone() {
        assert_eq!(autocorrect("open google.com"), "open google.com");
        assert_eq!(autocorrect("delete notes.txt"), "delete notes.txt");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(autocorrect("  hello   sami "), "hello sami");
        assert_eq!(autocorrect(""), "");
    }

    #[test]
    fn idempotent_on_corrected_output() {
        for input in [
            "plya jazz",
            "opne youtube please",
            "deep mode enable",
            "Hello sami what is the weather",
            "screnshot now",
        ] {
            let once = autocorrect(input);
            assert_eq!(autocorrect(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("play", "play"), 1.0);
        assert_eq!(similarity("", "play"), 0.0);
        assert!(similarity("plya", "play") >= SIMILARITY_CUTOFF);
    }
}
