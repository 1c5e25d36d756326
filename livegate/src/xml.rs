//! Minimal XML reader and writer for SVG documents.
//!
//! Handles what drawing tools emit: the XML declaration, processing
//! instructions, DOCTYPE (with an optional internal subset), comments,
//! CDATA, self-closing tags, the predefined entities and numeric character
//! references. Namespaces are kept verbatim in names (`xlink:href`).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, cut, map, opt, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, preceded, separated_pair},
    IResult,
};
use thiserror::Error;

use crate::document::{Document, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed XML at line {line}, column {column}: {message}")]
pub struct XmlError {
    /// Byte offset into the source.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl XmlError {
    fn at(src: &str, offset: usize, message: impl Into<String>) -> Self {
        let before = &src[..offset.min(src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        Self {
            offset,
            line,
            column,
            message: message.into(),
        }
    }
}

/// Parsed node before it is moved into the arena.
#[derive(Debug, Clone, PartialEq)]
enum XmlNode {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<XmlNode>,
    },
    Text(String),
    CData(String),
    Comment(String),
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Replace predefined entities and character references. Unknown entities
/// are kept as written.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    out
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

fn xml_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
    map(
        preceded(
            multispace1,
            separated_pair(xml_name, delimited(multispace0, char('='), multispace0), quoted),
        ),
        |(k, v)| (k.to_string(), decode_entities(v)),
    )(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("<!--"), take_until("-->"), tag("-->"))(input)
}

fn cdata(input: &str) -> IResult<&str, &str> {
    delimited(tag("<![CDATA["), take_until("]]>"), tag("]]>"))(input)
}

fn processing_instruction(input: &str) -> IResult<&str, &str> {
    delimited(tag("<?"), take_until("?>"), tag("?>"))(input)
}

fn doctype(input: &str) -> IResult<&str, ()> {
    let (rest, _) = tag("<!DOCTYPE")(input)?;
    let gt = rest.find('>');
    let end = match (rest.find('['), gt) {
        (Some(open), Some(g)) if open < g => rest[open..]
            .find(']')
            .and_then(|close| rest[open + close..].find('>').map(|e| open + close + e)),
        (_, g) => g,
    };
    match end {
        Some(e) => Ok((&rest[e + 1..], ())),
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::TakeUntil))),
    }
}

fn text(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c != '<')(input)
}

fn content(input: &str) -> IResult<&str, Option<XmlNode>> {
    alt((
        map(comment, |c| Some(XmlNode::Comment(c.to_string()))),
        map(cdata, |c| Some(XmlNode::CData(c.to_string()))),
        value(None, processing_instruction),
        map(element, Some),
        map(text, |t| Some(XmlNode::Text(decode_entities(t)))),
    ))(input)
}

fn element(input: &str) -> IResult<&str, XmlNode> {
    let (input, _) = char('<')(input)?;
    let (input, name) = xml_name(input)?;
    let (input, attrs) = many0(attribute)(input)?;
    let (input, _) = multispace0(input)?;

    if let Ok((input, _)) = tag::<_, _, Error<&str>>("/>")(input) {
        return Ok((
            input,
            XmlNode::Element {
                name: name.to_string(),
                attrs,
                children: Vec::new(),
            },
        ));
    }

    let (input, _) = cut(char('>'))(input)?;
    let (input, children) = many0(content)(input)?;
    let (input, _) = cut(tag("</"))(input)?;
    let (rest, close) = cut(xml_name)(input)?;
    if close != name {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }
    let (rest, _) = cut(preceded(multispace0, char('>')))(rest)?;

    Ok((
        rest,
        XmlNode::Element {
            name: name.to_string(),
            attrs,
            children: children.into_iter().flatten().collect(),
        },
    ))
}

/// Prolog/epilog items. Comments are kept, the rest is dropped.
fn misc(input: &str) -> IResult<&str, Option<XmlNode>> {
    preceded(
        multispace0,
        alt((
            map(comment, |c| Some(XmlNode::Comment(c.to_string()))),
            value(None, processing_instruction),
            value(None, doctype),
        )),
    )(input)
}

fn xml_document(input: &str) -> IResult<&str, Vec<XmlNode>> {
    let (input, _) = opt(char('\u{feff}'))(input)?;
    let (input, before) = many0(misc)(input)?;
    let (input, root) = preceded(multispace0, element)(input)?;
    let (input, after) = many0(misc)(input)?;
    let (input, _) = multispace0(input)?;

    let mut nodes: Vec<XmlNode> = before.into_iter().flatten().collect();
    nodes.push(root);
    nodes.extend(after.into_iter().flatten());
    Ok((input, nodes))
}

// ---------------------------------------------------------------------------
// Document construction and output
// ---------------------------------------------------------------------------

fn attach(doc: &mut Document, parent: NodeId, node: XmlNode) {
    match node {
        XmlNode::Element {
            name,
            attrs,
            children,
        } => {
            let id = doc.create_element(&name);
            for (k, v) in &attrs {
                doc.set_attr(id, k, v);
            }
            doc.append_child(parent, id);
            for c in children {
                attach(doc, id, c);
            }
        }
        XmlNode::Text(t) => {
            let id = doc.create_node(NodeKind::Text(t));
            doc.append_child(parent, id);
        }
        XmlNode::CData(t) => {
            let id = doc.create_node(NodeKind::CData(t));
            doc.append_child(parent, id);
        }
        XmlNode::Comment(t) => {
            let id = doc.create_node(NodeKind::Comment(t));
            doc.append_child(parent, id);
        }
    }
}

impl Document {
    /// Parse SVG/XML text.
    pub fn parse(src: &str) -> Result<Document, XmlError> {
        let nodes = match all_consuming(xml_document)(src) {
            Ok((_, nodes)) => nodes,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let offset = src.len() - e.input.len();
                let message = match e.code {
                    ErrorKind::Verify => "mismatched closing tag".to_string(),
                    ErrorKind::Eof => "unexpected content after the root element".to_string(),
                    ErrorKind::TakeUntil => "unterminated construct".to_string(),
                    kind => format!("unexpected input ({kind:?})"),
                };
                return Err(XmlError::at(src, offset, message));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(XmlError::at(src, src.len(), "unexpected end of input"))
            }
        };

        let mut doc = Document::new();
        let root = doc.root();
        for n in nodes {
            attach(&mut doc, root, n);
        }
        Ok(doc)
    }

    /// Serialize the attached tree back to XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        for &c in self.children(self.root()) {
            self.write_node(c, &mut out);
            out.push('\n');
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Root => {}
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            NodeKind::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(v));
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &c in children {
                    self.write_node(c, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!-- Created with Inkscape -->
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink='http://www.w3.org/1999/xlink' width="100">
  <defs id="defs">
    <g id="not" data-role="cell"><desc>not &amp; friends</desc></g>
  </defs>
  <path d="m 0,0 l 10,0" id="w1"/>
  <use xlink:href="#not" transform="translate(5,5)" />
  <script><![CDATA[ if (a < b) {} ]]></script>
</svg>
"##;

    #[test]
    fn parses_inkscape_style_document() {
        let doc = Document::parse(SAMPLE).unwrap();
        let svg = doc.svg_element().unwrap();
        assert_eq!(doc.attr(svg, "width"), Some("100"));
        assert_eq!(doc.elements_named("path").len(), 1);
        let not = doc.element_by_id("not").unwrap();
        assert_eq!(doc.text_content(not), "not & friends");
        let uses = doc.elements_named("use");
        assert_eq!(doc.attr(uses[0], "xlink:href"), Some("#not"));
        let script = doc.elements_named("script")[0];
        assert_eq!(doc.text_content(script).trim(), "if (a < b) {}");
    }

    #[test]
    fn entities_and_char_refs() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &bogus; &"), "a <b> AB &bogus; &");
    }

    #[test]
    fn round_trip_preserves_structure() {
        let doc = Document::parse(SAMPLE).unwrap();
        let again = Document::parse(&doc.to_xml()).unwrap();
        assert_eq!(
            doc.descendants(doc.root()).len(),
            again.descendants(again.root()).len()
        );
        let not = again.element_by_id("not").unwrap();
        assert_eq!(again.text_content(not), "not & friends");
    }

    #[test]
    fn mismatched_tag_reports_position() {
        let err = Document::parse("<svg>\n  <g></path>\n</svg>").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "mismatched closing tag");
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        let err = Document::parse("<svg/> junk").unwrap_err();
        assert!(err.message.contains("after the root"), "{}", err.message);
    }
}
