//! Closed step vocabulary
//!
//! Action names, assertion names and `assert` expected-tokens are the wire
//! format shared with existing YAML case files; the exact strings below must
//! not change.

use std::fmt;

use crate::error::StepError;

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Name used in case files
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }

            pub fn from_wire(name: &str) -> Option<Self> {
                match name {
                    $( $wire => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary! {
    /// Imperative actions
    pub enum ActionKind {
        /// Open a page by name (through the pages map) or by URL
        Navigate => "navigate",
        Click => "click",
        Input => "input",
        ClearAndInput => "clear_and_input",
        /// Select an option by its value
        Select => "select",
        SelectOptionByLabel => "select_option_by_label",
        Check => "check",
        Uncheck => "uncheck",
        Upload => "upload",
        Hover => "hover",
        DoubleClick => "double_click",
        RightClick => "right_click",
        /// Sleep for `value` milliseconds (default 1000)
        Wait => "wait",
        WaitForElement => "wait_for_element",
        WaitForElementHidden => "wait_for_element_hidden",
        WaitForLoadState => "wait_for_load_state",
        WaitForNetworkIdle => "wait_for_network_idle",
        ScrollToElement => "scroll_to_element",
        ScrollToBottom => "scroll_to_bottom",
        ScrollToTop => "scroll_to_top",
        /// Press `value` (default Enter)
        PressKey => "press_key",
        PressEnter => "press_enter",
        PressTab => "press_tab",
        PressEscape => "press_escape",
        TypeText => "type_text",
        RefreshPage => "refresh_page",
        GoBack => "go_back",
        GoForward => "go_forward",
        TakeScreenshot => "take_screenshot",
        /// Evaluate `value` with the selected element as first argument
        ExecuteScript => "execute_script",
        AcceptDialog => "accept_dialog",
        DismissDialog => "dismiss_dialog",
        GetDialogText => "get_dialog_text",
        GetText => "get_text",
        GetAttribute => "get_attribute",
        GetValue => "get_value",
        IsVisible => "is_visible",
        IsEnabled => "is_enabled",
        GetPageTitle => "get_page_title",
        GetCurrentUrl => "get_current_url",
        /// Check the selected element against an expected-token
        Assert => "assert",
    }
}

vocabulary! {
    /// Predicate checks usable directly as step names
    pub enum AssertionKind {
        ElementVisible => "assert_element_visible",
        ElementHidden => "assert_element_hidden",
        TextContains => "assert_text_contains",
        TextEquals => "assert_text_equals",
        ValueEquals => "assert_value_equals",
        UrlContains => "assert_url_contains",
        TitleContains => "assert_title_contains",
        ElementEnabled => "assert_element_enabled",
        ElementDisabled => "assert_element_disabled",
        ElementChecked => "assert_element_checked",
        ElementNotChecked => "assert_element_not_checked",
        Count => "assert_count",
        Equal => "assert_equal",
        NotEqual => "assert_not_equal",
        True => "assert_true",
        False => "assert_false",
        In => "assert_in",
        NotIn => "assert_not_in",
        IsNone => "assert_is_none",
        IsNotNone => "assert_is_not_none",
        Greater => "assert_greater",
        Less => "assert_less",
        AttributeInclude => "attribute_include",
    }
}

/// Where a scalar shorthand payload (`wait: 1000`, `click: "#id"`) goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryParam {
    Selector,
    Value,
    Expected,
}

impl ActionKind {
    /// Actions that cannot run without a resolved selector
    pub fn requires_selector(&self) -> bool {
        matches!(
            self,
            ActionKind::Click
                | ActionKind::Hover
                | ActionKind::Input
                | ActionKind::ClearAndInput
                | ActionKind::Select
                | ActionKind::SelectOptionByLabel
                | ActionKind::Check
                | ActionKind::Uncheck
                | ActionKind::Upload
                | ActionKind::DoubleClick
                | ActionKind::RightClick
                | ActionKind::WaitForElement
                | ActionKind::WaitForElementHidden
                | ActionKind::ScrollToElement
                | ActionKind::ExecuteScript
                | ActionKind::GetText
                | ActionKind::GetAttribute
                | ActionKind::GetValue
                | ActionKind::IsVisible
                | ActionKind::IsEnabled
                | ActionKind::Assert
        )
    }

    pub fn primary_param(&self) -> PrimaryParam {
        match self {
            ActionKind::Wait
            | ActionKind::WaitForLoadState
            | ActionKind::WaitForNetworkIdle
            | ActionKind::ScrollToBottom
            | ActionKind::ScrollToTop
            | ActionKind::PressKey
            | ActionKind::PressEnter
            | ActionKind::PressTab
            | ActionKind::PressEscape
            | ActionKind::TypeText
            | ActionKind::RefreshPage
            | ActionKind::GoBack
            | ActionKind::GoForward
            | ActionKind::TakeScreenshot
            | ActionKind::AcceptDialog
            | ActionKind::DismissDialog
            | ActionKind::GetDialogText
            | ActionKind::GetPageTitle
            | ActionKind::GetCurrentUrl => PrimaryParam::Value,
            _ => PrimaryParam::Selector,
        }
    }

    /// `input` and `assert` look at `selector` before their own key
    pub fn prefers_selector_field(&self) -> bool {
        matches!(self, ActionKind::Input | ActionKind::Assert)
    }
}

impl AssertionKind {
    /// Assertions that always inspect an element
    pub fn requires_element(&self) -> bool {
        matches!(
            self,
            AssertionKind::ElementVisible
                | AssertionKind::ElementHidden
                | AssertionKind::TextContains
                | AssertionKind::TextEquals
                | AssertionKind::ValueEquals
                | AssertionKind::ElementEnabled
                | AssertionKind::ElementDisabled
                | AssertionKind::ElementChecked
                | AssertionKind::ElementNotChecked
                | AssertionKind::Count
                | AssertionKind::AttributeInclude
        )
    }

    pub fn primary_param(&self) -> PrimaryParam {
        match self {
            AssertionKind::UrlContains | AssertionKind::TitleContains => PrimaryParam::Expected,
            _ => PrimaryParam::Selector,
        }
    }
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// A step name resolved against both vocabularies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Action(ActionKind),
    Assertion(AssertionKind),
}

impl Command {
    pub fn from_wire(name: &str) -> Option<Self> {
        ActionKind::from_wire(name)
            .map(Command::Action)
            .or_else(|| AssertionKind::from_wire(name).map(Command::Assertion))
    }

    /// Like [`Command::from_wire`], but unknown names are a dispatch error
    pub fn lookup(name: &str) -> Result<Self, StepError> {
        Self::from_wire(name).ok_or_else(|| StepError::Dispatch {
            kind: if name.starts_with("assert") { "assertion" } else { "action" },
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Action(action) => action.as_str(),
            Command::Assertion(assertion) => assertion.as_str(),
        }
    }

    pub fn requires_selector(&self) -> bool {
        match self {
            Command::Action(action) => action.requires_selector(),
            Command::Assertion(_) => false,
        }
    }

    pub fn primary_param(&self) -> PrimaryParam {
        match self {
            Command::Action(action) => action.primary_param(),
            Command::Assertion(assertion) => assertion.primary_param(),
        }
    }

    pub fn prefers_selector_field(&self) -> bool {
        matches!(self, Command::Action(action) if action.prefers_selector_field())
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, Command::Assertion(_) | Command::Action(ActionKind::Assert))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Expected Tokens
// ----------------------------------------------------------------------------

/// Outcome tokens accepted in the `expected` field of an `assert` step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectToken {
    Contains,
    Equals,
    Visible,
    Hidden,
    Enabled,
    Disabled,
    Checked,
    Unchecked,
    AttributeContains,
}

impl ExpectToken {
    pub const ALL: &'static [ExpectToken] = &[
        ExpectToken::Contains,
        ExpectToken::Equals,
        ExpectToken::Visible,
        ExpectToken::Hidden,
        ExpectToken::Enabled,
        ExpectToken::Disabled,
        ExpectToken::Checked,
        ExpectToken::Unchecked,
        ExpectToken::AttributeContains,
    ];

    /// Canonical token
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectToken::Contains => "contains",
            ExpectToken::Equals => "equals",
            ExpectToken::Visible => "visible",
            ExpectToken::Hidden => "hidden",
            ExpectToken::Enabled => "enabled",
            ExpectToken::Disabled => "disabled",
            ExpectToken::Checked => "checked",
            ExpectToken::Unchecked => "unchecked",
            ExpectToken::AttributeContains => "attribute-contains",
        }
    }

    /// Legacy spellings found in older case files
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ExpectToken::Contains => &["包含"],
            ExpectToken::Equals => &["等于"],
            ExpectToken::Visible => &["可见", "assert_element_visible"],
            ExpectToken::Hidden => &["不可见"],
            ExpectToken::Enabled => &["启用"],
            ExpectToken::Disabled => &["禁用"],
            ExpectToken::Checked => &["已勾选"],
            ExpectToken::Unchecked => &["未勾选"],
            ExpectToken::AttributeContains => &["属性"],
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == token || t.aliases().contains(&token))
    }

    /// Tokens that compare text and therefore wait for content to settle first
    pub fn compares_text(&self) -> bool {
        matches!(self, ExpectToken::Contains | ExpectToken::Equals)
    }
}

impl fmt::Display for ExpectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for action in ActionKind::ALL {
            assert_eq!(ActionKind::from_wire(action.as_str()), Some(*action));
        }
        for assertion in AssertionKind::ALL {
            assert_eq!(AssertionKind::from_wire(assertion.as_str()), Some(*assertion));
        }
    }

    #[test]
    fn test_vocabularies_are_disjoint() {
        for action in ActionKind::ALL {
            assert!(AssertionKind::from_wire(action.as_str()).is_none());
        }
        assert_eq!(ActionKind::ALL.len(), 41);
        assert_eq!(AssertionKind::ALL.len(), 23);
    }

    #[test]
    fn test_selector_required_set() {
        let required: Vec<&str> = ActionKind::ALL
            .iter()
            .filter(|a| a.requires_selector())
            .map(|a| a.as_str())
            .collect();
        assert_eq!(
            required,
            vec![
                "click", "input", "clear_and_input", "select", "select_option_by_label", "check",
                "uncheck", "upload", "hover", "double_click", "right_click", "wait_for_element",
                "wait_for_element_hidden", "scroll_to_element", "execute_script", "get_text",
                "get_attribute", "get_value", "is_visible", "is_enabled", "assert",
            ]
        );
    }

    #[test]
    fn test_unknown_command_is_dispatch_error() {
        let err = Command::lookup("fly").unwrap_err();
        assert!(err.to_string().contains("unsupported action 'fly'"));
        let err = Command::lookup("assert_flying").unwrap_err();
        assert!(err.to_string().contains("unsupported assertion"));
    }

    #[test]
    fn test_expect_tokens_and_aliases() {
        assert_eq!(ExpectToken::from_token("contains"), Some(ExpectToken::Contains));
        assert_eq!(ExpectToken::from_token("包含"), Some(ExpectToken::Contains));
        assert_eq!(ExpectToken::from_token("不可见"), Some(ExpectToken::Hidden));
        assert_eq!(
            ExpectToken::from_token("assert_element_visible"),
            Some(ExpectToken::Visible)
        );
        assert_eq!(
            ExpectToken::from_token("attribute-contains"),
            Some(ExpectToken::AttributeContains)
        );
        assert_eq!(ExpectToken::from_token("maybe"), None);
    }
}
