use rustrict::CensorStr;

/// Censors public listing text. Returns the text to store and whether anything was masked.
pub fn filter_profanity(text: &str) -> (String, bool) {
    if text.is_inappropriate() {
        (text.censor(), true)
    } else {
        (text.to_string(), false)
    }
}

pub fn contains_profanity(text: &str) -> bool {
    text.is_inappropriate()
}
