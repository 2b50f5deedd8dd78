//! Parser for the brace-delimited configuration text format.
//!
//! ```text
//! interfaces {
//!     ethernet eth0 {
//!         address 10.0.0.1/24
//!         description "uplink port"
//!     }
//! }
//! // vyos-config-version: "interfaces@31"
//! ```
//!
//! One word followed by `{` opens an interior node, two words followed by `{`
//! open a tag value. A line with two words is a leaf value (repeated lines
//! build a multi leaf); a line with one word is a valueless leaf. The comment
//! block after the last node is kept as the tree trailer.

use std::str::FromStr;

use indexmap::map::Entry;

use super::{Children, ConfigTree, Node, TreeError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Open,
    Close,
    Newline,
}

#[derive(Debug)]
struct Lexed {
    token: Token,
    line: usize,
}

struct Lexer<'a> {
    text: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    /// Byte offset just past the last word or brace.
    structural_end: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
            line: 1,
            structural_end: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> TreeError {
        TreeError::Parse {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn rest_starts_with(&self, offset: usize, pattern: &str) -> bool {
        self.text[offset..].starts_with(pattern)
    }

    fn tokens(mut self) -> Result<(Vec<Lexed>, usize), TreeError> {
        let mut out = Vec::new();
        while let Some(&(offset, c)) = self.chars.peek() {
            match c {
                '\n' => {
                    self.chars.next();
                    out.push(Lexed {
                        token: Token::Newline,
                        line: self.line,
                    });
                    self.line += 1;
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '{' | '}' => {
                    self.chars.next();
                    let token = if c == '{' { Token::Open } else { Token::Close };
                    out.push(Lexed {
                        token,
                        line: self.line,
                    });
                    self.structural_end = offset + 1;
                }
                '/' if self.rest_starts_with(offset, "/*") => self.block_comment()?,
                '/' if self.rest_starts_with(offset, "//") => self.line_comment(),
                '"' | '\'' => {
                    let line = self.line;
                    let word = self.quoted(c)?;
                    out.push(Lexed {
                        token: Token::Word(word),
                        line,
                    });
                }
                _ => {
                    let word = self.bare();
                    out.push(Lexed {
                        token: Token::Word(word),
                        line: self.line,
                    });
                }
            }
        }
        Ok((out, self.structural_end))
    }

    fn block_comment(&mut self) -> Result<(), TreeError> {
        let start_line = self.line;
        self.chars.next();
        self.chars.next();
        while let Some((offset, c)) = self.chars.next() {
            match c {
                '\n' => self.line += 1,
                '*' if self.rest_starts_with(offset, "*/") => {
                    self.chars.next();
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(TreeError::Parse {
            line: start_line,
            reason: "unterminated comment".to_string(),
        })
    }

    fn line_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, TreeError> {
        self.chars.next();
        let mut word = String::new();
        while let Some((offset, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.peek() {
                    Some(&(_, next)) if next == quote || next == '\\' => {
                        word.push(next);
                        self.chars.next();
                    }
                    _ => word.push('\\'),
                },
                c if c == quote => {
                    self.structural_end = offset + 1;
                    return Ok(word);
                }
                '\n' => {
                    self.line += 1;
                    word.push('\n');
                }
                c => word.push(c),
            }
        }
        Err(self.error("unterminated quoted string"))
    }

    fn bare(&mut self) -> String {
        let mut word = String::new();
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '{' || c == '}' {
                break;
            }
            word.push(c);
            self.chars.next();
            self.structural_end = offset + c.len_utf8();
        }
        word
    }
}

struct Parser {
    tokens: Vec<Lexed>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Lexed> {
        self.tokens.get(self.pos)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |lexed| lexed.line)
    }

    /// Parses statements until the matching `}` (or end of input at the top level).
    fn block(&mut self, depth: usize) -> Result<Children, TreeError> {
        let mut children = Children::new();
        let mut words: Vec<String> = Vec::new();
        let mut line = 1;

        loop {
            let Some(lexed) = self.tokens.get(self.pos) else {
                if depth > 0 {
                    return Err(TreeError::Parse {
                        line: self.last_line(),
                        reason: "unclosed '{'".to_string(),
                    });
                }
                statement(&mut children, std::mem::take(&mut words), line)?;
                return Ok(children);
            };
            let lexed_line = lexed.line;
            match &lexed.token {
                Token::Word(word) => {
                    if words.is_empty() {
                        line = lexed_line;
                    }
                    words.push(word.clone());
                    self.pos += 1;
                }
                Token::Newline => {
                    self.pos += 1;
                    statement(&mut children, std::mem::take(&mut words), line)?;
                }
                Token::Close => {
                    if depth == 0 {
                        return Err(TreeError::Parse {
                            line: lexed_line,
                            reason: "unexpected '}'".to_string(),
                        });
                    }
                    self.pos += 1;
                    statement(&mut children, std::mem::take(&mut words), line)?;
                    return Ok(children);
                }
                Token::Open => {
                    self.pos += 1;
                    let header = std::mem::take(&mut words);
                    let block = self.block(depth + 1)?;
                    open_block(&mut children, header, block, lexed_line)?;
                }
            }
        }
    }
}

fn conflict(line: usize, name: &str, existing: &Node) -> TreeError {
    TreeError::Parse {
        line,
        reason: format!("'{name}' is already defined as a {}", existing.kind()),
    }
}

fn open_block(
    children: &mut Children,
    header: Vec<String>,
    block: Children,
    line: usize,
) -> Result<(), TreeError> {
    let mut header = header.into_iter();
    match (header.next(), header.next(), header.next()) {
        (Some(name), None, None) => match children.entry(name) {
            Entry::Vacant(entry) => {
                entry.insert(Node::NonLeaf(block));
                Ok(())
            }
            Entry::Occupied(mut entry) => {
                let name = entry.key().clone();
                match entry.get_mut() {
                    Node::NonLeaf(existing) => super::merge_children(existing, block)
                        .map_err(|reason| TreeError::Parse { line, reason }),
                    other => Err(conflict(line, &name, other)),
                }
            }
        },
        (Some(name), Some(tag_value), None) => {
            let node = children
                .entry(name.clone())
                .or_insert_with(|| Node::Tag(Children::new()));
            let Node::Tag(values) = node else {
                return Err(conflict(line, &name, node));
            };
            match values.entry(tag_value) {
                Entry::Vacant(entry) => {
                    entry.insert(Node::NonLeaf(block));
                    Ok(())
                }
                Entry::Occupied(mut entry) => {
                    let tag_value = entry.key().clone();
                    match entry.get_mut() {
                        Node::NonLeaf(existing) => super::merge_children(existing, block)
                            .map_err(|reason| TreeError::Parse { line, reason }),
                        other => Err(conflict(line, &tag_value, other)),
                    }
                }
            }
        }
        (None, _, _) => Err(TreeError::Parse {
            line,
            reason: "'{' without a node name".to_string(),
        }),
        _ => Err(TreeError::Parse {
            line,
            reason: "too many words before '{'".to_string(),
        }),
    }
}

fn statement(children: &mut Children, words: Vec<String>, line: usize) -> Result<(), TreeError> {
    let mut words = words.into_iter();
    match (words.next(), words.next(), words.next()) {
        (None, _, _) => Ok(()),
        (Some(name), None, None) => match children.get(&name) {
            None => {
                children.insert(name, Node::Valueless);
                Ok(())
            }
            Some(Node::Valueless) => Ok(()),
            Some(other) => Err(conflict(line, &name, other)),
        },
        (Some(name), Some(value), None) => {
            let node = children
                .entry(name.clone())
                .or_insert_with(|| Node::Multi(Vec::new()));
            match node {
                Node::Multi(values) => {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
                Node::Leaf(current) if *current == value => {}
                Node::Leaf(current) => {
                    let first = std::mem::take(current);
                    *node = Node::Multi(vec![first, value]);
                }
                other => return Err(conflict(line, &name, other)),
            }
            // A leaf seen once is a single leaf until proven otherwise
            if let Node::Multi(values) = node
                && values.len() == 1
                && let Some(single) = values.pop()
            {
                *node = Node::Leaf(single);
            }
            Ok(())
        }
        (Some(name), _, Some(extra)) => Err(TreeError::Parse {
            line,
            reason: format!("unexpected '{extra}' after value of '{name}'"),
        }),
    }
}

impl ConfigTree {
    /// Parses configuration text.
    ///
    /// Leaves holding one value are single leaves; use
    /// [`ConfigTree::parse_with_schema`] to classify multi leaves correctly.
    pub fn parse(text: &str) -> Result<Self, TreeError> {
        let (tokens, structural_end) = Lexer::new(text).tokens()?;
        let mut parser = Parser { tokens, pos: 0 };
        let children = parser.block(0)?;
        debug_assert!(parser.peek().is_none());

        let mut tree = ConfigTree::from_children(children);
        tree.set_trailer(&text[structural_end..]);
        Ok(tree)
    }
}

impl FromStr for ConfigTree {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigTree::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_path;
    use crate::schema::NodeKind;

    const SAMPLE: &str = r#"interfaces {
    ethernet eth0 {
        address 10.0.0.1/24
        address 10.0.0.2/24
        description "uplink \"main\" port"
        disable
    }
    ethernet eth1 {
    }
    loopback lo {
    }
}
system {
    host-name r1
    /* inline comment */
    ntp {
        server time.example.com
    }
}
// Warning: Do not remove the following line.
// vyos-config-version: "system@27"
"#;

    #[test]
    fn test_parse_structure() {
        let tree = ConfigTree::parse(SAMPLE).unwrap();
        assert!(tree.is_tag(&config_path!("interfaces ethernet")));
        assert_eq!(
            tree.children(&config_path!("interfaces ethernet")),
            vec!["eth0", "eth1"]
        );
        assert_eq!(
            tree.values(&config_path!("interfaces ethernet eth0 address")),
            &["10.0.0.1/24".to_string(), "10.0.0.2/24".to_string()]
        );
        assert_eq!(
            tree.value(&config_path!("interfaces ethernet eth0 description")),
            Some("uplink \"main\" port")
        );
        assert_eq!(
            tree.kind_at(&config_path!("interfaces ethernet eth0 disable")),
            NodeKind::ValuelessLeaf
        );
        assert_eq!(
            tree.kind_at(&config_path!("interfaces ethernet eth1")),
            NodeKind::NonLeaf
        );
        assert_eq!(
            tree.value(&config_path!("system ntp server")),
            Some("time.example.com")
        );
    }

    #[test]
    fn test_parse_keeps_trailer() {
        let tree = ConfigTree::parse(SAMPLE).unwrap();
        assert_eq!(
            tree.trailer(),
            "// Warning: Do not remove the following line.\n// vyos-config-version: \"system@27\""
        );
    }

    #[test]
    fn test_parse_empty_and_comment_only() {
        assert!(ConfigTree::parse("").unwrap().is_empty());
        let tree = ConfigTree::parse("/* nothing */\n").unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.trailer(), "/* nothing */");
    }

    #[test]
    fn test_repeated_blocks_merge() {
        let text = "system {\n    host-name r1\n}\nsystem {\n    domain-name example.com\n}\n";
        let tree: ConfigTree = text.parse().unwrap();
        assert_eq!(tree.children(&config_path!("system")), vec!["host-name", "domain-name"]);
    }

    #[test]
    fn test_block_over_existing_leaf_is_rejected() {
        let err = ConfigTree::parse("system {\n    host-name r1\n    host-name {\n    }\n}\n").unwrap_err();
        assert_eq!(
            err,
            TreeError::Parse {
                line: 3,
                reason: "'host-name' is already defined as a leaf".to_string()
            }
        );
        let text = "interfaces {\n    ethernet eth0 {\n        mtu 1500\n    }\n    ethernet eth0 {\n        mtu 9000\n    }\n}\n";
        let tree = ConfigTree::parse(text).unwrap();
        assert_eq!(tree.value(&config_path!("interfaces ethernet eth0 mtu")), Some("9000"));
    }

    #[test]
    fn test_values_with_slashes_are_not_comments() {
        let tree = ConfigTree::parse("service {\n    url http://example.com/a\n}\n").unwrap();
        assert_eq!(
            tree.value(&config_path!("service url")),
            Some("http://example.com/a")
        );
    }

    #[test]
    fn test_parse_errors() {
        let err = ConfigTree::parse("system {\n    host-name r1\n").unwrap_err();
        assert!(err.is_parse_error());

        let err = ConfigTree::parse("system {\n}\n}\n").unwrap_err();
        assert_eq!(
            err,
            TreeError::Parse {
                line: 3,
                reason: "unexpected '}'".to_string()
            }
        );

        assert!(ConfigTree::parse("a b c\n").unwrap_err().is_parse_error());
        assert!(ConfigTree::parse("a b c {\n}\n").unwrap_err().is_parse_error());
        assert!(ConfigTree::parse("{\n}\n").unwrap_err().is_parse_error());
        assert!(ConfigTree::parse("a \"open\n").unwrap_err().is_parse_error());
        assert!(ConfigTree::parse("/* open\n").unwrap_err().is_parse_error());
        assert!(ConfigTree::parse("a {\n}\na b\n").unwrap_err().is_parse_error());
    }
}
