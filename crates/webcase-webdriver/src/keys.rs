//! Named keys to WebDriver key codes

pub const ENTER: char = '\u{E007}';

const NAMED_KEYS: &[(&str, char)] = &[
    ("Backspace", '\u{E003}'),
    ("Tab", '\u{E004}'),
    ("Enter", ENTER),
    ("Return", '\u{E006}'),
    ("Shift", '\u{E008}'),
    ("Control", '\u{E009}'),
    ("Ctrl", '\u{E009}'),
    ("Alt", '\u{E00A}'),
    ("Escape", '\u{E00C}'),
    ("Esc", '\u{E00C}'),
    ("Space", '\u{E00D}'),
    ("PageUp", '\u{E00E}'),
    ("PageDown", '\u{E00F}'),
    ("End", '\u{E010}'),
    ("Home", '\u{E011}'),
    ("ArrowLeft", '\u{E012}'),
    ("ArrowUp", '\u{E013}'),
    ("ArrowRight", '\u{E014}'),
    ("ArrowDown", '\u{E015}'),
    ("Insert", '\u{E016}'),
    ("Delete", '\u{E017}'),
    ("F1", '\u{E031}'),
    ("F2", '\u{E032}'),
    ("F3", '\u{E033}'),
    ("F4", '\u{E034}'),
    ("F5", '\u{E035}'),
    ("F6", '\u{E036}'),
    ("F7", '\u{E037}'),
    ("F8", '\u{E038}'),
    ("F9", '\u{E039}'),
    ("F10", '\u{E03A}'),
    ("F11", '\u{E03B}'),
    ("F12", '\u{E03C}'),
    ("Meta", '\u{E03D}'),
];

/// Code point for a key name; single characters stand for themselves
pub fn key_code(name: &str) -> Option<char> {
    if let Some((_, code)) = NAMED_KEYS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        return Some(*code);
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Split a chord such as `Control+a` into its key codes, modifiers first.
///
/// A lone `+` is the plus key itself.
pub fn chord(keys: &str) -> Result<Vec<char>, String> {
    if keys == "+" {
        return Ok(vec!['+']);
    }
    keys.split('+')
        .map(|part| key_code(part.trim()).ok_or_else(|| format!("unknown key '{}'", part)))
        .collect()
}

/// Actions-API key sequence that presses the chord and releases it in reverse
pub fn chord_actions(codes: &[char]) -> Vec<serde_json::Value> {
    let down = codes
        .iter()
        .map(|c| serde_json::json!({"type": "keyDown", "value": c.to_string()}));
    let up = codes
        .iter()
        .rev()
        .map(|c| serde_json::json!({"type": "keyUp", "value": c.to_string()}));
    down.chain(up).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys() {
        assert_eq!(key_code("Enter"), Some('\u{E007}'));
        assert_eq!(key_code("escape"), Some('\u{E00C}'));
        assert_eq!(key_code("a"), Some('a'));
        assert_eq!(key_code("Hyper"), None);
    }

    #[test]
    fn test_chords() {
        assert_eq!(chord("Control+a").unwrap(), vec!['\u{E009}', 'a']);
        assert_eq!(chord("+").unwrap(), vec!['+']);
        assert!(chord("Control+Nope").is_err());

        let actions = chord_actions(&['\u{E009}', 'a']);
        let kinds: Vec<&str> = actions.iter().map(|a| a["type"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["keyDown", "keyDown", "keyUp", "keyUp"]);
        assert_eq!(actions[2]["value"], "a");
    }
}
