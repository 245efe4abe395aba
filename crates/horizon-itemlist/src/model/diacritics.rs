//! Diacritics removal for search matching.
//!
//! Text is decomposed (NFD) and combining marks are dropped, so `"é"` becomes
//! `"e"`. Letters that carry no decomposition (`"ø"`, `"ß"`, ligatures) are
//! folded through a small substitution table.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Returns `text` without diacritical marks.
///
/// ```
/// use horizon_itemlist::model::diacritics;
///
/// assert_eq!(diacritics::remove("Crème brûlée"), "Creme brulee");
/// ```
pub fn remove(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        match fold(c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

fn fold(c: char) -> Option<&'static str> {
    Some(match c {
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ø' => "o",
        'Ø' => "O",
        'đ' => "d",
        'Đ' => "D",
        'ł' => "l",
        'Ł' => "L",
        'ħ' => "h",
        'Ħ' => "H",
        'ı' => "i",
        'þ' => "th",
        'Þ' => "TH",
        _ => return None,
    })
}
