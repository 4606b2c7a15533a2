//! Phonetic encodings.
//!
//! Each encoder maps a name string to a fixed-maximum-length code so that
//! similar-sounding spellings collide. Non-ASCII-alphabetic characters are
//! ignored; output is uppercase. An empty input yields an empty code.

use serde::Deserialize;

/// Phonetic code family, selectable by name in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneticCode {
    Soundex,
    Nysiis,
    Metaphone,
}

impl PhoneticCode {
    pub fn encode(&self, s: &str, max_len: usize) -> String {
        match self {
            Self::Soundex => soundex(s, max_len),
            Self::Nysiis => nysiis(s, max_len),
            Self::Metaphone => metaphone(s, max_len),
        }
    }
}

fn letters_upper(s: &str) -> Vec<char> {
    s.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Soundex code: leading letter plus digit classes, zero-padded to
/// `max_len`. H and W are transparent between same-class consonants;
/// vowels separate them.
pub fn soundex(s: &str, max_len: usize) -> String {
    let letters = letters_upper(s);
    let Some(&first) = letters.first() else {
        return String::new();
    };

    fn class(c: char) -> Option<char> {
        match c {
            'B' | 'F' | 'P' | 'V' => Some('1'),
            'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
            'D' | 'T' => Some('3'),
            'L' => Some('4'),
            'M' | 'N' => Some('5'),
            'R' => Some('6'),
            _ => None,
        }
    }

    let mut out = String::new();
    out.push(first);
    let mut prev = class(first);
    for &c in &letters[1..] {
        if out.len() >= max_len {
            break;
        }
        match class(c) {
            Some(d) => {
                if Some(d) != prev {
                    out.push(d);
                }
                prev = Some(d);
            }
            None => {
                // Vowels reset the duplicate collapse, H/W do not.
                if c != 'H' && c != 'W' {
                    prev = None;
                }
            }
        }
    }
    while out.len() < max_len {
        out.push('0');
    }
    out
}

/// NYSIIS code, truncated to `max_len`.
pub fn nysiis(s: &str, max_len: usize) -> String {
    let mut w = letters_upper(s);
    if w.is_empty() {
        return String::new();
    }

    // Leading transforms.
    if w.starts_with(&['M', 'A', 'C']) {
        w.splice(0..3, ['M', 'C', 'C']);
    } else if w.starts_with(&['K', 'N']) {
        w.splice(0..2, ['N', 'N']);
    } else if w[0] == 'K' {
        w[0] = 'C';
    } else if w.starts_with(&['P', 'H']) || w.starts_with(&['P', 'F']) {
        w.splice(0..2, ['F', 'F']);
    } else if w.starts_with(&['S', 'C', 'H']) {
        w.splice(0..3, ['S', 'S', 'S']);
    }

    // Trailing transforms.
    let n = w.len();
    if n >= 2 {
        let tail: String = w[n - 2..].iter().collect();
        match tail.as_str() {
            "EE" | "IE" => {
                w.truncate(n - 2);
                w.push('Y');
            }
            "DT" | "RT" | "RD" | "NT" | "ND" => {
                w.truncate(n - 2);
                w.push('D');
            }
            _ => {}
        }
    }

    fn is_vowel(c: char) -> bool {
        matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
    }

    let mut key = vec![w[0]];
    let mut i = 1;
    while i < w.len() {
        let prev = w[i - 1];
        let next = w.get(i + 1).copied();
        let mut consumed = 1;
        let replacement: Vec<char> = match w[i] {
            'E' if next == Some('V') => {
                consumed = 2;
                vec!['A', 'F']
            }
            c if is_vowel(c) => vec!['A'],
            'Q' => vec!['G'],
            'Z' => vec!['S'],
            'M' => vec!['N'],
            'K' => {
                if next == Some('N') {
                    consumed = 2;
                    vec!['N']
                } else {
                    vec!['C']
                }
            }
            'S' if next == Some('C') && w.get(i + 2) == Some(&'H') => {
                consumed = 3;
                vec!['S', 'S', 'S']
            }
            'P' if next == Some('H') => {
                consumed = 2;
                vec!['F', 'F']
            }
            'H' if !is_vowel(prev) || !next.map(is_vowel).unwrap_or(false) => {
                // H bounded by a consonant copies the previous character.
                vec![if is_vowel(prev) { 'A' } else { prev }]
            }
            'W' if is_vowel(prev) => vec!['A'],
            c => vec![c],
        };
        // Splice the rewritten characters back so later context rules see
        // them, then append with adjacent-duplicate collapse.
        w.splice(i..i + consumed, replacement.iter().copied());
        for &c in &replacement {
            if key.last() != Some(&c) {
                key.push(c);
            }
            i += 1;
        }
    }

    // Trailing cleanup: drop S, AY becomes Y, drop trailing A.
    if key.len() > 1 && key.last() == Some(&'S') {
        key.pop();
    }
    let kl = key.len();
    if kl >= 2 && key[kl - 2] == 'A' && key[kl - 1] == 'Y' {
        key.remove(kl - 2);
    }
    if key.len() > 1 && key.last() == Some(&'A') {
        key.pop();
    }

    key.truncate(max_len);
    key.into_iter().collect()
}

/// Classic Metaphone code, truncated to `max_len`.
pub fn metaphone(s: &str, max_len: usize) -> String {
    let mut w = letters_upper(s);
    if w.is_empty() {
        return String::new();
    }

    fn is_vowel(c: char) -> bool {
        matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
    }

    // Initial exceptions.
    if w.len() >= 2 {
        match (w[0], w[1]) {
            ('A', 'E') | ('G', 'N') | ('K', 'N') | ('P', 'N') | ('W', 'R') => {
                w.remove(0);
            }
            ('X', _) => w[0] = 'S',
            ('W', 'H') => {
                w.remove(1);
            }
            _ => {}
        }
    }

    let mut out = String::new();
    let mut i = 0;
    while i < w.len() && out.len() < max_len {
        let c = w[i];
        let prev = if i > 0 { Some(w[i - 1]) } else { None };
        let next = w.get(i + 1).copied();
        let next2 = w.get(i + 2).copied();

        // Adjacent duplicates encode once, except C (as in "accept").
        if prev == Some(c) && c != 'C' {
            i += 1;
            continue;
        }

        match c {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if i == 0 {
                    out.push(c);
                }
            }
            'B' => {
                // Terminal MB keeps the B silent.
                if !(prev == Some('M') && next.is_none()) {
                    out.push('B');
                }
            }
            'C' => {
                if next == Some('I') && next2 == Some('A') {
                    out.push('X');
                } else if next == Some('H') {
                    if prev == Some('S') {
                        out.push('K');
                    } else {
                        out.push('X');
                    }
                    i += 1;
                } else if matches!(next, Some('I') | Some('E') | Some('Y')) {
                    if prev != Some('S') {
                        out.push('S');
                    }
                } else {
                    out.push('K');
                }
            }
            'D' => {
                if next == Some('G') && matches!(next2, Some('E') | Some('I') | Some('Y')) {
                    out.push('J');
                    i += 1;
                } else {
                    out.push('T');
                }
            }
            'G' => {
                if next == Some('H') {
                    if next2.map(is_vowel).unwrap_or(false) {
                        out.push('K');
                    }
                    // GH before a consonant or at the end is silent.
                    i += 1;
                } else if next == Some('N') {
                    // GN silent.
                    i += 1;
                } else if matches!(next, Some('I') | Some('E') | Some('Y')) {
                    out.push('J');
                } else {
                    out.push('K');
                }
            }
            'H' => {
                if prev.map(is_vowel).unwrap_or(false) && !next.map(is_vowel).unwrap_or(false) {
                    // Silent after a vowel with no vowel following.
                } else {
                    out.push('H');
                }
            }
            'K' => {
                if prev != Some('C') {
                    out.push('K');
                }
            }
            'P' => {
                if next == Some('H') {
                    out.push('F');
                    i += 1;
                } else {
                    out.push('P');
                }
            }
            'Q' => out.push('K'),
            'S' => {
                if next == Some('H') {
                    out.push('X');
                    i += 1;
                } else if next == Some('I') && matches!(next2, Some('O') | Some('A')) {
                    out.push('X');
                } else {
                    out.push('S');
                }
            }
            'T' => {
                if next == Some('H') {
                    out.push('0');
                    i += 1;
                } else if next == Some('I') && matches!(next2, Some('O') | Some('A')) {
                    out.push('X');
                } else {
                    out.push('T');
                }
            }
            'V' => out.push('F'),
            'W' | 'Y' => {
                if next.map(is_vowel).unwrap_or(false) {
                    out.push(c);
                }
            }
            'X' => {
                out.push('K');
                if out.len() < max_len {
                    out.push('S');
                }
            }
            'Z' => out.push('S'),
            'F' | 'J' | 'L' | 'M' | 'N' | 'R' => out.push(c),
            _ => {}
        }
        i += 1;
    }
    out
}
