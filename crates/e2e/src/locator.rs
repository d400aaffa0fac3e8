//! Element queries understood by the browser driver.
//!
//! A `Locator` is plain data. It is serialized into bridge requests and
//! resolved inside the browser at the time of each action, so it never goes
//! stale across re-renders.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an accessible name, label, placeholder or text is matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextMatch {
    /// Case-insensitive substring
    Text { value: String },

    /// JavaScript regular expression
    Pattern { source: String, flags: String },
}

impl TextMatch {
    pub fn text(value: impl Into<String>) -> Self {
        TextMatch::Text {
            value: value.into(),
        }
    }

    /// Case-insensitive pattern
    pub fn pattern(source: impl Into<String>) -> Self {
        TextMatch::Pattern {
            source: source.into(),
            flags: "i".to_string(),
        }
    }

    /// Case-insensitive pattern matching any of `alternatives` literally
    pub fn any_of<S: AsRef<str>>(alternatives: &[S]) -> Self {
        let source = alternatives
            .iter()
            .map(|alt| regex::escape(alt.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        Self::pattern(source)
    }

    /// Case-insensitive pattern matching `value` as the whole string
    pub fn exactly(value: &str) -> Self {
        Self::pattern(format!("^{}$", regex::escape(value)))
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Text { value } => write!(f, "{:?}", value),
            TextMatch::Pattern { source, flags } => write!(f, "/{}/{}", source, flags),
        }
    }
}

/// What to query for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Target {
    Css {
        selector: String,
    },
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<TextMatch>,
    },
    Label {
        text: TextMatch,
    },
    Placeholder {
        text: TextMatch,
    },
    Text {
        text: TextMatch,
    },
}

/// Which of several matches to act on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nth {
    /// Require a single match
    #[default]
    Only,
    First,
    Last,
}

impl Nth {
    fn is_only(&self) -> bool {
        matches!(self, Nth::Only)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(flatten)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "Nth::is_only")]
    pub nth: Nth,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::from(Target::Css {
            selector: selector.into(),
        })
    }

    pub fn role(role: impl Into<String>, name: TextMatch) -> Self {
        Self::from(Target::Role {
            role: role.into(),
            name: Some(name),
        })
    }

    pub fn heading(name: TextMatch) -> Self {
        Self::role("heading", name)
    }

    pub fn button(name: TextMatch) -> Self {
        Self::role("button", name)
    }

    pub fn label(text: TextMatch) -> Self {
        Self::from(Target::Label { text })
    }

    pub fn placeholder(text: TextMatch) -> Self {
        Self::from(Target::Placeholder { text })
    }

    pub fn text(text: TextMatch) -> Self {
        Self::from(Target::Text { text })
    }

    pub fn first(mut self) -> Self {
        self.nth = Nth::First;
        self
    }

    pub fn last(mut self) -> Self {
        self.nth = Nth::Last;
        self
    }

    /// Stable human-readable form, used in logs, errors and test doubles
    pub fn describe(&self) -> String {
        let base = match &self.target {
            Target::Css { selector } => format!("css={}", selector),
            Target::Role { role, name: Some(name) } => format!("role={}[name={}]", role, name),
            Target::Role { role, name: None } => format!("role={}", role),
            Target::Label { text } => format!("label={}", text),
            Target::Placeholder { text } => format!("placeholder={}", text),
            Target::Text { text } => format!("text={}", text),
        };
        match self.nth {
            Nth::Only => base,
            Nth::First => format!("{} >> first", base),
            Nth::Last => format!("{} >> last", base),
        }
    }
}

impl From<Target> for Locator {
    fn from(target: Target) -> Self {
        Self {
            target,
            nth: Nth::Only,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
