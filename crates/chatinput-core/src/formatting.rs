//! Legacy chat color codes.
//!
//! Prompts may be written with an alternate prefix (`&a`, `&l`, ...) which is
//! translated to section-sign codes (`§a`). Terminal hosts can then render the
//! codes as ANSI escapes or strip them.

/// Prefix of a translated color/format code.
pub const SECTION_SIGN: char = '\u{00A7}';

const ALL_CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRrXx";

fn is_code(c: char) -> bool {
    ALL_CODES.contains(c)
}

/// Replace `prefix` + code pairs with `§` + lower-cased code.
///
/// A prefix that is not followed by a known code is left untouched.
pub fn translate_alternate_codes(prefix: char, text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match chars.get(i + 1) {
            Some(&next) if c == prefix && is_code(next) => {
                out.push(SECTION_SIGN);
                out.push(next.to_ascii_lowercase());
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Remove every `§` code pair.
pub fn strip_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == SECTION_SIGN && chars.peek().is_some_and(|n| is_code(*n)) {
            chars.next();
            continue;
        }
        out.push(c);
    }

    out
}

fn ansi_sgr(code: char) -> Option<&'static str> {
    let sgr = match code.to_ascii_lowercase() {
        '0' => "30",
        '1' => "34",
        '2' => "32",
        '3' => "36",
        '4' => "31",
        '5' => "35",
        '6' => "33",
        '7' => "37",
        '8' => "90",
        '9' => "94",
        'a' => "92",
        'b' => "96",
        'c' => "91",
        'd' => "95",
        'e' => "93",
        'f' => "97",
        'k' => "5",
        'l' => "1",
        'm' => "9",
        'n' => "4",
        'o' => "3",
        'r' => "0",
        _ => return None,
    };
    Some(sgr)
}

/// Render `§` codes as ANSI SGR escapes, resetting at the end of the text.
///
/// Hex color markers (`§x`) have no ANSI equivalent and are dropped.
pub fn to_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut styled = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == SECTION_SIGN {
            if let Some(&code) = chars.peek() {
                if is_code(code) {
                    chars.next();
                    if let Some(sgr) = ansi_sgr(code) {
                        out.push_str("\x1b[");
                        out.push_str(sgr);
                        out.push('m');
                        styled = true;
                    }
                    continue;
                }
            }
        }
        out.push(c);
    }

    if styled {
        out.push_str("\x1b[0m");
    }
    out
}
