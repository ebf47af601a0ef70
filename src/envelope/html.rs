//! HTML-Wrapped Signing
//!
//! Signs content and emits an HTML element carrying the envelope metadata in
//! a `data-agentcred` attribute, for embedding attribution inline in a page.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::envelope::sign::sign;
use crate::error::Result;
use crate::types::{SignIdentity, SignOptions};

/// Element the signed content is wrapped in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapperTag {
    #[default]
    Span,
    Div,
    P,
}

impl WrapperTag {
    fn as_str(self) -> &'static str {
        match self {
            Self::Span => "span",
            Self::Div => "div",
            Self::P => "p",
        }
    }
}

/// Options for `sign_with_html`.
#[derive(Clone, Debug, Default)]
pub struct SignWithHtmlOptions {
    pub sign: SignOptions,
    pub wrapper_tag: WrapperTag,
    pub class_name: Option<String>,
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Sign content and wrap it in an HTML element.
///
/// The element body is the HTML-escaped content; the `data-agentcred`
/// attribute holds the base64-encoded envelope metadata JSON.
pub fn sign_with_html(
    content: &str,
    identity: &SignIdentity,
    options: Option<SignWithHtmlOptions>,
) -> Result<String> {
    let options = options.unwrap_or_default();
    let envelope = sign(content, identity, Some(options.sign))?;

    let tag = options.wrapper_tag.as_str();
    let class_attr = match &options.class_name {
        Some(class) => format!(" class=\"{}\"", escape_html(class)),
        None => String::new(),
    };

    let metadata = serde_json::to_string(&envelope.agentcred)?;
    let encoded = STANDARD.encode(metadata);

    Ok(format!(
        "<{tag}{class_attr} data-agentcred=\"{encoded}\">{}</{tag}>",
        escape_html(content)
    ))
}
