//! Selector strings to WebDriver location strategies

/// A `(using, value)` pair for the find-element endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub using: &'static str,
    pub value: String,
}

impl Locator {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            using: "css selector",
            value: value.into(),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            using: "xpath",
            value: value.into(),
        }
    }

    /// CSS by default; `xpath=`, `/` and `(` select XPath; `text=` matches
    /// elements whose own text contains the given string.
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if let Some(xpath) = selector.strip_prefix("xpath=") {
            return Locator::xpath(xpath);
        }
        if let Some(text) = selector.strip_prefix("text=") {
            let text = text.trim_matches(|c| c == '"' || c == '\'');
            return Locator::xpath(format!(
                "//*[text()[contains(normalize-space(.), {})]]",
                xpath_literal(text)
            ));
        }
        if let Some(css) = selector.strip_prefix("css=") {
            return Locator::css(css);
        }
        if selector.starts_with('/') || selector.starts_with('(') {
            return Locator::xpath(selector);
        }
        Locator::css(selector)
    }
}

/// Quote a string as an XPath literal, falling back to `concat()` when it
/// holds both quote characters.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        assert_eq!(Locator::parse("#login-btn"), Locator::css("#login-btn"));
        assert_eq!(Locator::parse("css=div > a"), Locator::css("div > a"));
        assert_eq!(Locator::parse("//button[@id='go']"), Locator::xpath("//button[@id='go']"));
        assert_eq!(Locator::parse("(//tr)[2]"), Locator::xpath("(//tr)[2]"));
        assert_eq!(Locator::parse("xpath=//td"), Locator::xpath("//td"));
    }

    #[test]
    fn test_text_selector() {
        let locator = Locator::parse("text=Sign in");
        assert_eq!(locator.using, "xpath");
        assert_eq!(locator.value, "//*[text()[contains(normalize-space(.), 'Sign in')]]");
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"say "it's""#),
            r#"concat('say "it', "'", 's"')"#
        );
    }
}
