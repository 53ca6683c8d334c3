//! Allow-list HTML sanitization for model-authored markup.
//!
//! The explanation and particle descriptions are rendered as raw markup by
//! clients, so this is the only injection boundary in the system. Input is
//! parsed with html5ever (via `scraper`) and re-serialized from scratch:
//!
//! 1. Allowed elements are emitted with no attributes at all.
//! 2. Disallowed elements are unwrapped; their text survives.
//! 3. `script`, `style`, `textarea` and `option` are dropped with content.
//! 4. Comments, doctypes and processing instructions are dropped.
//! 5. Text is re-escaped.
//! 6. Allowed elements left with no content are dropped. html5ever closes a
//!    `<p>` when a list opens inside it, which would otherwise leave a stray
//!    `<p></p>` behind the list.

use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::analysis::SentenceAnalysis;

/// Elements whose content is never shown, even as text.
const DISCARD_WITH_CONTENT: &[&str] = &["script", "style", "textarea", "option"];

/// Allowed elements that have no closing tag.
const VOID_TAGS: &[&str] = &["br"];

/// Set of tags allowed through a sanitizing pass.
#[derive(Debug, Clone, Copy)]
pub struct SanitizePolicy {
    pub allowed_tags: &'static [&'static str],
}

impl SanitizePolicy {
    fn allows(&self, tag: &str) -> bool {
        self.allowed_tags.contains(&tag)
    }
}

/// Policy for the sentence explanation.
pub const EXPLANATION_POLICY: SanitizePolicy = SanitizePolicy {
    allowed_tags: &["p", "strong", "em", "ul", "li", "ol", "br", "span"],
};

/// Stricter policy for particle descriptions.
pub const PARTICLE_POLICY: SanitizePolicy = SanitizePolicy {
    allowed_tags: &["strong", "em", "br"],
};

/// Sanitize an HTML fragment against `policy`.
pub fn sanitize_html(input: &str, policy: &SanitizePolicy) -> String {
    if input.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(input);
    let mut out = String::with_capacity(input.len());
    write_children(fragment.root_element(), policy, &mut out);
    out
}

/// Sanitize every HTML-bearing field of an analysis.
///
/// Only `explanation` and each `attachedParticle.description` change.
pub fn sanitize_analysis(mut analysis: SentenceAnalysis) -> SentenceAnalysis {
    analysis.explanation = sanitize_html(&analysis.explanation, &EXPLANATION_POLICY);
    for particle in analysis
        .words
        .iter_mut()
        .filter_map(|w| w.attached_particle.as_mut())
    {
        particle.description = sanitize_html(&particle.description, &PARTICLE_POLICY);
    }
    analysis
}

/// Text content of an HTML fragment with every tag removed. Used where
/// markup cannot be shown at all, e.g. SVG tooltips.
pub fn plain_text(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut out = String::new();
    collect_text(fragment.root_element(), &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an HTML fragment split into display paragraphs. `p`, `li`, `ul`,
/// `ol` and `br` start a new paragraph; list items get a bullet.
pub fn plain_paragraphs(input: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(input);
    let mut raw = vec![String::new()];
    collect_paragraphs(fragment.root_element(), &mut raw);
    raw.iter()
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

const BLOCK_TAGS: &[&str] = &["p", "li", "ul", "ol", "br"];

fn collect_paragraphs(parent: ElementRef<'_>, out: &mut Vec<String>) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => {
                if let Some(last) = out.last_mut() {
                    last.push_str(&text.text);
                }
            }
            Node::Element(element) if !DISCARD_WITH_CONTENT.contains(&element.name()) => {
                let tag = element.name();
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    out.push(String::new());
                }
                if tag == "li" {
                    if let Some(last) = out.last_mut() {
                        last.push_str("• ");
                    }
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_paragraphs(child_el, out);
                }
                if block {
                    out.push(String::new());
                }
            }
            _ => {}
        }
    }
}

fn collect_text(parent: ElementRef<'_>, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(element) if !DISCARD_WITH_CONTENT.contains(&element.name()) => {
                if element.name() == "br" {
                    out.push(' ');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn write_children(parent: ElementRef<'_>, policy: &SanitizePolicy, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => escape_text(&text.text, out),
            Node::Element(element) => {
                let tag = element.name();
                if DISCARD_WITH_CONTENT.contains(&tag) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if !policy.allows(tag) {
                    write_children(child_el, policy, out);
                } else if VOID_TAGS.contains(&tag) {
                    out.push('<');
                    out.push_str(tag);
                    out.push_str(" />");
                } else {
                    let mut inner = String::new();
                    write_children(child_el, policy, &mut inner);
                    if inner.is_empty() {
                        continue;
                    }
                    out.push('<');
                    out.push_str(tag);
                    out.push('>');
                    out.push_str(&inner);
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
            _ => {}
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
