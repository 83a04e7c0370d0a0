//! Plain-text extraction from WordprocessingML (`word/document.xml`).
//!
//! The structured path walks the XML with a namespace-aware reader and keeps
//! paragraph boundaries. Anything the reader rejects, or a document whose
//! paragraphs yield no text, is reduced by stripping tags instead.

use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::zip::ZipExtractor;

/// Main text namespace of WordprocessingML.
pub const WORDPROCESSING_NS: &[u8] =
    b"http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Archive entry holding a DOCX file's body.
pub const DOCUMENT_ENTRY: &str = "word/document.xml";

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Pull the body text out of a DOCX file's bytes.
pub fn extract_docx_text(archive: &[u8]) -> Result<String> {
    let xml = ZipExtractor::new(archive).extract(DOCUMENT_ENTRY)?;
    Ok(extract_text(&xml))
}

/// Convert a `document.xml` payload to paragraph-separated text.
///
/// Paragraphs are joined by a blank line. Never fails: malformed input falls
/// back to [`strip_tags`].
pub fn extract_text(xml: &[u8]) -> String {
    let xml = String::from_utf8_lossy(xml);
    match paragraphs(&xml) {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => {
            debug!("no paragraph text found, stripping tags");
            strip_tags(&xml)
        }
        Err(e) => {
            debug!(error = %e, "document XML rejected, stripping tags");
            strip_tags(&xml)
        }
    }
}

/// Replace every tag with a space, collapse whitespace runs and trim.
pub fn strip_tags(xml: &str) -> String {
    let spaced = TAG.replace_all(xml, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

#[derive(Default)]
struct Paragraph {
    text: String,
    has_break: bool,
}

impl Paragraph {
    fn into_line(mut self) -> Option<String> {
        if self.has_break && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        if self.text.trim().is_empty() {
            return None;
        }
        // Keep a terminator contributed by a break
        let line = self
            .text
            .trim_start()
            .trim_end_matches(|c: char| c.is_whitespace() && c != '\n');
        Some(line.to_string())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Element {
    Paragraph,
    Text,
    Break,
    Other,
}

fn classify(ns: &ResolveResult<'_>, local: &[u8]) -> Result<Element> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) if *uri == WORDPROCESSING_NS => Ok(match local {
            b"p" => Element::Paragraph,
            b"t" => Element::Text,
            b"br" => Element::Break,
            _ => Element::Other,
        }),
        ResolveResult::Unknown(prefix) => Err(Error::XmlParse(format!(
            "unbound prefix {}",
            String::from_utf8_lossy(prefix)
        ))),
        _ => Ok(Element::Other),
    }
}

/// Structured extraction. Errors on anything that is not well-formed.
fn paragraphs(xml: &str) -> Result<String> {
    let mut reader = NsReader::from_str(xml);

    // Paragraphs in start-tag order; nested ones also feed their ancestors,
    // matching a descendant text query per paragraph.
    let mut found: Vec<Paragraph> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut text_depth = 0usize;
    let mut saw_root = false;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| Error::XmlParse(e.to_string()))?;

        match event {
            Event::Start(e) => {
                let element = classify(&ns, e.local_name().as_ref())?;
                saw_root = true;
                match element {
                    Element::Paragraph => {
                        open.push(found.len());
                        found.push(Paragraph::default());
                    }
                    Element::Text => text_depth += 1,
                    Element::Break => {
                        for &i in &open {
                            found[i].has_break = true;
                        }
                    }
                    Element::Other => {}
                }
                stack.push(element);
            }
            Event::Empty(e) => {
                saw_root = true;
                if classify(&ns, e.local_name().as_ref())? == Element::Break {
                    for &i in &open {
                        found[i].has_break = true;
                    }
                }
            }
            Event::End(_) => match stack.pop() {
                Some(Element::Paragraph) => {
                    open.pop();
                }
                Some(Element::Text) => text_depth -= 1,
                Some(Element::Break | Element::Other) => {}
                None => return Err(Error::XmlParse("unbalanced end tag".into())),
            },
            Event::Text(t) if text_depth > 0 => {
                let text = t.unescape().map_err(|e| Error::XmlParse(e.to_string()))?;
                for &i in &open {
                    found[i].text.push_str(&text);
                }
            }
            Event::CData(c) if text_depth > 0 => {
                let text = String::from_utf8_lossy(&c);
                for &i in &open {
                    found[i].text.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::XmlParse("unclosed element at end of document".into()));
    }
    if !saw_root {
        return Err(Error::XmlParse("no root element".into()));
    }

    let lines: Vec<String> = found.into_iter().filter_map(Paragraph::into_line).collect();
    Ok(lines.join("\n\n"))
}
