//! setup.py parser
//!
//! Reads the package name passed to `setup(...)` from the syntax tree; the
//! descriptor is never executed.
//!
//! Recognized forms of the `name` keyword:
//! - `setup(name="pkg")` (any non-bytes, non-f-string literal)
//! - `setup(name=module.__name__)`, which yields `module`
//!
//! Anything else yields no name. Qualified calls such as
//! `setuptools.setup(...)` are not recognized. Named escapes (`\N{...}`) in
//! literals are kept verbatim.

use std::iter::Peekable;
use std::str::Chars;

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::parser::traits::{DescriptorParser, ParseError};

/// Conventional entry point called by build descriptors
const SETUP_FUNCTION: &str = "setup";
const NAME_KEYWORD: &str = "name";
const MODULE_NAME_ATTRIBUTE: &str = "__name__";

/// Parser for setup.py files
pub struct SetupPyParser {
    coding_re: Regex,
}

impl SetupPyParser {
    pub fn new() -> Self {
        Self {
            // PEP 263 source encoding declaration
            coding_re: Regex::new(r"^[ \t\f]*#.*?coding[:=][ \t]*([-\w.]+)").unwrap(),
        }
    }

    /// Encoding declared in the first two lines, if any and known
    fn declared_encoding(&self, bytes: &[u8]) -> Option<&'static Encoding> {
        bytes
            .split(|&b| b == b'\n')
            .take(2)
            .find_map(|line| {
                let line = String::from_utf8_lossy(line);
                self.coding_re
                    .captures(&line)
                    .map(|caps| caps[1].to_ascii_lowercase().replace('_', "-"))
            })
            .and_then(|label| {
                Encoding::for_label(label.as_bytes())
                    .or_else(|| Encoding::for_label(label.replace('-', "").as_bytes()))
            })
    }
}

impl Default for SetupPyParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for [`SetupPyParser::declared_name`]
pub fn extract_declared_name(source: &str) -> Result<Option<String>, ParseError> {
    SetupPyParser::new().declared_name(source)
}

impl DescriptorParser for SetupPyParser {
    fn file_name(&self) -> &'static str {
        "setup.py"
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let encoding = self.declared_encoding(bytes).unwrap_or(UTF_8);
        let (content, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            debug!("setup.py is not valid {}, decoded lossily", encoding.name());
        }
        content.into_owned()
    }

    fn declared_name(&self, content: &str) -> Result<Option<String>, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_python::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set Python language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse Python content");
            ParseError::ParseFailed("Failed to parse Python".to_string())
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let location = first_error(root)
                .map(|node| {
                    let point = node.start_position();
                    format!("line {}, column {}", point.row + 1, point.column + 1)
                })
                .unwrap_or_else(|| "unknown location".to_string());
            debug!("setup.py has a syntax error at {}", location);
            return Err(ParseError::InvalidSyntax(location));
        }

        let mut declared = None;
        self.visit(root, content, &mut declared);

        Ok(declared)
    }
}

/// Shapes a `name=` value is classified into
#[derive(Debug, PartialEq, Eq)]
enum NameValue<'a> {
    /// `name="pkg"`
    Literal(String),
    /// `name=pkg.__name__`
    ModuleName(&'a str),
    /// Anything else
    Unrecognized,
}

impl NameValue<'_> {
    fn into_name(self) -> Option<String> {
        match self {
            NameValue::Literal(name) => Some(name),
            NameValue::ModuleName(module) => Some(module.to_string()),
            NameValue::Unrecognized => None,
        }
    }
}

impl SetupPyParser {
    /// Pre-order walk; a later `setup(name=...)` overrides an earlier one
    fn visit(&self, node: Node, content: &str, declared: &mut Option<String>) {
        if node.kind() == "call" {
            self.visit_call(node, content, declared);
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, content, declared);
        }
    }

    fn visit_call(&self, call_node: Node, content: &str, declared: &mut Option<String>) {
        let Some(function) = call_node.child_by_field_name("function") else {
            return;
        };

        // Only a bare `setup`, not `setuptools.setup`
        if function.kind() != "identifier" || &content[function.byte_range()] != SETUP_FUNCTION {
            return;
        }

        let Some(arguments) = call_node.child_by_field_name("arguments") else {
            return;
        };

        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            if argument.kind() != "keyword_argument" {
                continue;
            }

            let is_name = argument
                .child_by_field_name("name")
                .is_some_and(|key| &content[key.byte_range()] == NAME_KEYWORD);
            if !is_name {
                continue;
            }

            *declared = argument
                .child_by_field_name("value")
                .map_or(NameValue::Unrecognized, |value| classify(value, content))
                .into_name();
        }
    }
}

fn classify<'a>(value: Node, content: &'a str) -> NameValue<'a> {
    match value.kind() {
        "string" => string_literal(value, content).map_or(NameValue::Unrecognized, NameValue::Literal),
        "concatenated_string" => {
            let mut cursor = value.walk();
            value
                .named_children(&mut cursor)
                .map(|part| string_literal(part, content))
                .collect::<Option<String>>()
                .map_or(NameValue::Unrecognized, NameValue::Literal)
        }
        "attribute" => module_name(value, content).map_or(NameValue::Unrecognized, NameValue::ModuleName),
        _ => NameValue::Unrecognized,
    }
}

/// `module.__name__` -> `module`, only when `module` is a bare identifier
fn module_name<'a>(attribute: Node, content: &'a str) -> Option<&'a str> {
    let object = attribute.child_by_field_name("object")?;
    let name = attribute.child_by_field_name("attribute")?;

    (object.kind() == "identifier" && &content[name.byte_range()] == MODULE_NAME_ATTRIBUTE)
        .then(|| &content[object.byte_range()])
}

/// Value of a plain string literal; bytes and f-strings are not literals here
fn string_literal(string_node: Node, content: &str) -> Option<String> {
    if string_node.kind() != "string" {
        return None;
    }

    let mut start = None;
    let mut end = None;
    let mut cursor = string_node.walk();
    for child in string_node.children(&mut cursor) {
        match child.kind() {
            "string_start" => start = Some(child),
            "string_end" => end = Some(child),
            "interpolation" => return None,
            _ => {}
        }
    }
    let (start, end) = (start?, end?);

    // e.g. `r"""` -> `r`
    let prefix = content[start.byte_range()]
        .trim_end_matches(['"', '\''])
        .to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }

    let body = &content[start.end_byte()..end.start_byte()];
    if prefix.contains('r') {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

/// Decodes backslash escapes; unknown and named escapes are kept verbatim
fn unescape(body: &str) -> String {
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            // line continuation
            Some('\n') => {}
            Some('\\') => result.push('\\'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('a') => result.push('\x07'),
            Some('b') => result.push('\x08'),
            Some('f') => result.push('\x0c'),
            Some('v') => result.push('\x0b'),
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits = take_digits(&mut chars, width, 16);
                match code_point(&digits, width, 16) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        result.push('\\');
                        result.push(kind);
                        result.push_str(&digits);
                    }
                }
            }
            Some(first @ '0'..='7') => {
                let mut digits = first.to_string();
                digits.push_str(&take_digits(&mut chars, 2, 8));
                match code_point(&digits, digits.len(), 8) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        result.push('\\');
                        result.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

/// Up to `max` digits of `radix` from the front of `chars`
fn take_digits(chars: &mut Peekable<Chars<'_>>, max: usize, radix: u32) -> String {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.next_if(|c| c.is_digit(radix)) {
            Some(digit) => digits.push(digit),
            None => break,
        }
    }
    digits
}

/// Character for exactly `width` digits, if it is a valid code point
fn code_point(digits: &str, width: usize, radix: u32) -> Option<char> {
    if digits.len() != width {
        return None;
    }
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.has_error())
        .find_map(first_error)
}
