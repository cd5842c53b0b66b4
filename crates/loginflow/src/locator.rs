//! Element locators.
//!
//! A [`Locator`] names one element on the page by a single strategy. It can be
//! rendered to a CSS selector (when the strategy allows it) or to a JavaScript
//! query expression used for state probing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element location strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "by", content = "value")]
pub enum Locator {
    /// `id` attribute
    Id(String),
    /// `name` attribute
    Name(String),
    /// CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
}

impl Locator {
    /// Locate by `id` attribute
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Locate by `name` attribute
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Equivalent CSS selector, if the strategy has one
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Id(id) => Some(format!("[id={id:?}]")),
            Self::Name(name) => Some(format!("[name={name:?}]")),
            Self::Css(css) => Some(css.clone()),
            Self::XPath(_) => None,
        }
    }

    /// JavaScript expression evaluating to the first matching element or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Id(id) => format!("document.getElementById({id:?})"),
            Self::Name(name) => format!("document.getElementsByName({name:?})[0] || null"),
            Self::Css(css) => format!("document.querySelector({css:?})"),
            Self::XPath(expr) => format!(
                "document.evaluate({expr:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
            ),
        }
    }

    /// JavaScript expression returning the element state as a JSON string
    ///
    /// The string deserializes into [`crate::driver::ElementState`].
    #[must_use]
    pub fn to_state_script(&self) -> String {
        format!(
            "(() => {{ \
                const el = {query}; \
                if (!el) {{ return JSON.stringify({{ present: false, visible: false, enabled: false }}); }} \
                const style = window.getComputedStyle(el); \
                const rect = el.getBoundingClientRect(); \
                const visible = style.display !== 'none' && style.visibility !== 'hidden' \
                    && rect.width > 0 && rect.height > 0; \
                return JSON.stringify({{ present: true, visible: visible, enabled: !el.disabled }}); \
            }})()",
            query = self.to_query()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={v}"),
            Self::Name(v) => write!(f, "name={v}"),
            Self::Css(v) => write!(f, "css={v}"),
            Self::XPath(v) => write!(f, "xpath={v}"),
        }
    }
}
