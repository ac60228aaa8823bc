/// Minimal CSS selector matching engine.
/// Supports: tag, .class, #id, attribute operators (`=`, `~=`, `^=`, `$=`, `*=`),
/// descendant and child combinators, and comma-separated selector lists.
/// Pseudo-classes are parsed and ignored.
use super::DomNode;

/// A comma-separated list of selectors; matches when any member matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
    source: String,
}

/// One complex selector: compounds joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq)]
struct Compound {
    /// How this compound relates to the one on its left. Ignored for the first.
    combinator: Combinator,
    parts: Vec<SelectorPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A component of a compound selector.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorPart {
    /// Matches a tag name: `div`, `button`, etc.
    Tag(String),
    /// Matches a class: `.foo`
    Class(String),
    /// Matches an ID: `#bar`
    Id(String),
    /// Matches an attribute: `[rel~="stylesheet"]`
    Attribute(AttrMatcher),
    /// Universal selector (*)
    Universal,
    /// Pseudo-class (stripped, ignored for matching)
    PseudoClass(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrMatcher {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

impl SelectorList {
    /// Parse a selector list. Returns `None` for empty or malformed input.
    pub fn parse(input: &str) -> Option<Self> {
        let selectors = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Selector::parse)
            .collect::<Option<Vec<_>>>()?;
        if selectors.is_empty() {
            None
        } else {
            Some(Self {
                selectors,
                source: input.trim().to_string(),
            })
        }
    }

    /// The selector text this list was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if the list matches an element, given its ancestry from the root
    /// down to its parent.
    pub fn matches(&self, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        self.selectors.iter().any(|s| s.matches(node, ancestors))
    }
}

impl Selector {
    fn parse(input: &str) -> Option<Self> {
        let mut compounds = Vec::new();
        let mut current: Vec<SelectorPart> = Vec::new();
        let mut pending = Combinator::Descendant;
        let mut chars = input.chars().peekable();

        while let Some(&ch) = chars.peek() {
            match ch {
                '.' => {
                    chars.next();
                    let class_name = read_ident(&mut chars);
                    if class_name.is_empty() {
                        return None;
                    }
                    current.push(SelectorPart::Class(class_name));
                }
                '#' => {
                    chars.next();
                    let id_name = read_ident(&mut chars);
                    if id_name.is_empty() {
                        return None;
                    }
                    current.push(SelectorPart::Id(id_name));
                }
                '[' => {
                    chars.next();
                    current.push(SelectorPart::Attribute(parse_attribute(&mut chars)?));
                }
                ':' => {
                    chars.next();
                    // Skip :: for pseudo-elements
                    if chars.peek() == Some(&':') {
                        chars.next();
                    }
                    let pseudo = read_ident(&mut chars);
                    // Skip function arguments like :not(...)
                    if chars.peek() == Some(&'(') {
                        chars.next();
                        let mut depth = 1;
                        for c in chars.by_ref() {
                            if c == '(' {
                                depth += 1;
                            } else if c == ')' {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                        }
                    }
                    current.push(SelectorPart::PseudoClass(pseudo));
                }
                '*' => {
                    chars.next();
                    current.push(SelectorPart::Universal);
                }
                '>' | ' ' | '\t' | '\n' | '\r' => {
                    skip_whitespace(&mut chars);
                    let combinator = if chars.peek() == Some(&'>') {
                        chars.next();
                        skip_whitespace(&mut chars);
                        Combinator::Child
                    } else {
                        Combinator::Descendant
                    };
                    if current.is_empty() {
                        return None;
                    }
                    compounds.push(Compound {
                        combinator: pending,
                        parts: std::mem::take(&mut current),
                    });
                    pending = combinator;
                }
                c if is_ident_char(c) => {
                    let tag = read_ident(&mut chars);
                    current.push(SelectorPart::Tag(tag.to_ascii_lowercase()));
                }
                _ => return None,
            }
        }

        if current.is_empty() {
            return None;
        }
        compounds.push(Compound {
            combinator: pending,
            parts: current,
        });
        Some(Self { compounds })
    }

    fn matches(&self, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        match self.compounds.len().checked_sub(1) {
            Some(last) => self.matches_at(last, node, ancestors),
            None => false,
        }
    }

    /// Right-to-left match of compound `idx` against `node`, recursing leftwards
    /// through the ancestor chain.
    fn matches_at(&self, idx: usize, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        let Some(compound) = self.compounds.get(idx) else {
            return false;
        };
        if !compound_matches(&compound.parts, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match compound.combinator {
            Combinator::Child => match ancestors.split_last() {
                Some((parent, rest)) => self.matches_at(idx - 1, parent, rest),
                None => false,
            },
            Combinator::Descendant => ancestors
                .iter()
                .enumerate()
                .rev()
                .any(|(i, ancestor)| self.matches_at(idx - 1, ancestor, &ancestors[..i])),
        }
    }
}

fn compound_matches(parts: &[SelectorPart], node: &DomNode) -> bool {
    if !node.is_element() {
        return false;
    }
    parts.iter().all(|part| match part {
        SelectorPart::Tag(t) => node.tag.eq_ignore_ascii_case(t),
        SelectorPart::Class(c) => node.has_class(c),
        SelectorPart::Id(i) => node.get_attr("id") == Some(i.as_str()),
        SelectorPart::Attribute(matcher) => matcher.matches(node),
        SelectorPart::Universal | SelectorPart::PseudoClass(_) => true,
    })
}

impl AttrMatcher {
    fn matches(&self, node: &DomNode) -> bool {
        let Some(actual) = node.get_attr(&self.name) else {
            return false;
        };
        let expected = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|t| t == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

/// Parse the inside of `[...]`; the opening bracket is already consumed.
fn parse_attribute(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<AttrMatcher> {
    skip_whitespace(chars);
    let name = read_ident(chars).to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    skip_whitespace(chars);

    let op = match chars.next()? {
        ']' => {
            return Some(AttrMatcher {
                name,
                op: AttrOp::Exists,
                value: String::new(),
            })
        }
        '=' => AttrOp::Equals,
        prefix => {
            let op = match prefix {
                '~' => AttrOp::Includes,
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                '*' => AttrOp::Substring,
                _ => return None,
            };
            if chars.next()? != '=' {
                return None;
            }
            op
        }
    };

    skip_whitespace(chars);
    let mut value = String::new();
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            loop {
                let c = chars.next()?;
                if c == quote {
                    break;
                }
                value.push(c);
            }
        }
        _ => {
            while let Some(&c) = chars.peek() {
                if c == ']' || c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
    }

    skip_whitespace(chars);
    // Case-sensitivity flags are accepted and ignored.
    if matches!(chars.peek().copied(), Some('i' | 's' | 'I' | 'S')) {
        chars.next();
        skip_whitespace(chars);
    }
    if chars.next()? != ']' {
        return None;
    }
    Some(AttrMatcher { name, op, value })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if is_ident_char(c) {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    name
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars>) {
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else {
            break;
        }
    }
}
