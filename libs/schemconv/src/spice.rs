//! A reader for the subcircuit structure of SPICE netlists.
//!
//! Only `.subckt`/`.ends` blocks and component lines are interpreted. Other
//! directives (`.model`, `.param`, `.lib`, ...) are skipped.

use std::path::Path;

use arcstr::ArcStr;
use indexmap::IndexMap;
use nom::bytes::complete::{take_till, take_while};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SchemconvError;

/// A component line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// The instance name, including its type prefix.
    pub name: ArcStr,
    /// Positional tokens after the name.
    ///
    /// For subcircuit instances (`X` lines) the trailing subcircuit name is
    /// moved to [`Instance::child`].
    pub nodes: Vec<ArcStr>,
    /// The instantiated subcircuit of an `X` line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<ArcStr>,
    /// `key=value` parameters in line order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<ArcStr, ArcStr>,
}

impl Instance {
    /// The component type letter, upper-cased.
    pub fn kind(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_default()
    }
}

/// A subcircuit definition.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subckt {
    /// The subcircuit name.
    pub name: ArcStr,
    /// Port names in declaration order.
    pub ports: Vec<ArcStr>,
    /// Default parameters from the `.subckt` line.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<ArcStr, ArcStr>,
    /// Component lines in the body.
    pub instances: Vec<Instance>,
}

/// The subcircuits and top-level components of a netlist.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Netlist {
    /// Subcircuit definitions in file order.
    pub subckts: Vec<Subckt>,
    /// Component lines outside any subcircuit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<Instance>,
}

impl Netlist {
    /// Parses netlist text.
    pub fn parse(data: &str) -> Result<Self, ParserError> {
        let mut parser = Parser::new();
        let mut tok = Tokenizer::new(data);
        while let Some(line) = parser.parse_line(&mut tok)? {
            parser.apply(line)?;
        }
        if let ReaderState::Subckt(subckt) = parser.state {
            return Err(ParserError::UnclosedSubckt(subckt.name));
        }
        tracing::debug!(
            subckts = parser.netlist.subckts.len(),
            "parsed SPICE netlist"
        );
        Ok(parser.netlist)
    }

    /// Reads and parses the netlist at `path`.
    pub fn parse_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        tracing::debug!("reading SPICE file: {:?}", path);
        let data = std::fs::read_to_string(path).map_err(|err| SchemconvError::FailedToRead {
            path: path.to_path_buf(),
            err,
        })?;
        Ok(Self::parse(&data)?)
    }

    /// The subcircuit named `name`, compared case-insensitively.
    pub fn subckt(&self, name: &str) -> Option<&Subckt> {
        self.subckts
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// The netlist as YAML.
    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The netlist as pretty-printed JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// An error parsing a SPICE netlist.
#[derive(Debug, Error)]
pub enum ParserError {
    /// A directive that is not allowed where it appears.
    #[error("unexpected `.{directive}` on line {line}")]
    UnexpectedDirective {
        /// One-based line number.
        line: usize,
        /// The directive, without its leading dot.
        directive: ArcStr,
    },
    /// A line that could not be interpreted.
    #[error("invalid line {line}: {reason}")]
    InvalidLine {
        /// One-based line number.
        line: usize,
        /// Why the line was rejected.
        reason: String,
    },
    /// End of input inside a `.subckt` block.
    #[error("subcircuit `{0}` is missing `.ends`")]
    UnclosedSubckt(ArcStr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Directive(ArcStr),
    Ident(ArcStr),
    Equals,
    LineEnd,
}

impl Token {
    fn try_ident(&self, line: usize) -> Result<&ArcStr, ParserError> {
        match self {
            Token::Ident(name) => Ok(name),
            other => Err(ParserError::InvalidLine {
                line,
                reason: format!("expected an identifier, found {other:?}"),
            }),
        }
    }
}

enum Line {
    SubcktDecl {
        name: ArcStr,
        ports: Vec<ArcStr>,
        params: IndexMap<ArcStr, ArcStr>,
    },
    Instance(Instance),
    EndSubckt,
    Other(ArcStr),
}

#[derive(Debug)]
enum ReaderState {
    Top,
    Subckt(Subckt),
}

struct Parser {
    buffer: Vec<Token>,
    /// Line on which the buffered tokens start.
    line: usize,
    state: ReaderState,
    netlist: Netlist,
}

impl Parser {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            line: 1,
            state: ReaderState::Top,
            netlist: Netlist::default(),
        }
    }

    fn parse_line(&mut self, tok: &mut Tokenizer<'_>) -> Result<Option<Line>, ParserError> {
        self.buffer.clear();
        while let Some(token) = tok.get()? {
            if self.buffer.is_empty() {
                self.line = tok.line;
            }
            if token == Token::LineEnd {
                if self.buffer.is_empty() {
                    continue;
                }
                return self.parse_line_inner().map(Some);
            }
            self.buffer.push(token);
        }
        Ok(None)
    }

    fn parse_line_inner(&mut self) -> Result<Line, ParserError> {
        let line = self.line;
        match &self.buffer[0] {
            Token::Directive(d) if d.eq_ignore_ascii_case("subckt") => {
                let name = self
                    .buffer
                    .get(1)
                    .ok_or_else(|| ParserError::InvalidLine {
                        line,
                        reason: "`.subckt` without a name".to_string(),
                    })?
                    .try_ident(line)?
                    .clone();
                let (ports, params) = self.split_params(2)?;
                let ports = ports
                    .into_iter()
                    .filter(|p| !p.eq_ignore_ascii_case("params:"))
                    .collect();
                Ok(Line::SubcktDecl {
                    name,
                    ports,
                    params,
                })
            }
            Token::Directive(d) if d.eq_ignore_ascii_case("ends") => Ok(Line::EndSubckt),
            Token::Directive(d) => Ok(Line::Other(d.clone())),
            Token::Ident(name) => {
                let name = name.clone();
                let (mut nodes, params) = self.split_params(1)?;
                let child = if name.starts_with(['x', 'X']) {
                    Some(nodes.pop().ok_or_else(|| ParserError::InvalidLine {
                        line,
                        reason: format!("instance `{name}` names no subcircuit"),
                    })?)
                } else {
                    None
                };
                Ok(Line::Instance(Instance {
                    name,
                    nodes,
                    child,
                    params,
                }))
            }
            other => Err(ParserError::InvalidLine {
                line,
                reason: format!("unexpected {other:?} at start of line"),
            }),
        }
    }

    /// Splits `buffer[start..]` into positional tokens and trailing
    /// `key=value` pairs.
    #[allow(clippy::type_complexity)]
    fn split_params(
        &self,
        start: usize,
    ) -> Result<(Vec<ArcStr>, IndexMap<ArcStr, ArcStr>), ParserError> {
        let line = self.line;
        let tokens = self.buffer.get(start..).unwrap_or_default();
        let first_param = tokens
            .windows(2)
            .position(|w| w[1] == Token::Equals)
            .unwrap_or(tokens.len());

        let positional = tokens[..first_param]
            .iter()
            .map(|t| t.try_ident(line).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let mut params = IndexMap::new();
        let mut rest = &tokens[first_param..];
        while !rest.is_empty() {
            let [key, Token::Equals, value, tail @ ..] = rest else {
                return Err(ParserError::InvalidLine {
                    line,
                    reason: "expected `key=value`".to_string(),
                });
            };
            params.insert(key.try_ident(line)?.clone(), value.try_ident(line)?.clone());
            rest = tail;
        }
        Ok((positional, params))
    }

    fn apply(&mut self, line: Line) -> Result<(), ParserError> {
        match (&mut self.state, line) {
            (ReaderState::Top, Line::SubcktDecl { name, ports, params }) => {
                self.state = ReaderState::Subckt(Subckt {
                    name,
                    ports,
                    params,
                    instances: Vec::new(),
                });
            }
            (ReaderState::Subckt(subckt), Line::Instance(inst)) => subckt.instances.push(inst),
            (ReaderState::Top, Line::Instance(inst)) => self.netlist.instances.push(inst),
            (ReaderState::Subckt(subckt), Line::EndSubckt) => {
                let subckt = std::mem::take(subckt);
                self.netlist.subckts.push(subckt);
                self.state = ReaderState::Top;
            }
            (_, Line::Other(directive)) => {
                tracing::trace!(line = self.line, "skipping `.{directive}`");
            }
            (_, Line::SubcktDecl { .. }) => {
                return Err(ParserError::UnexpectedDirective {
                    line: self.line,
                    directive: arcstr::literal!("subckt"),
                });
            }
            (ReaderState::Top, Line::EndSubckt) => {
                return Err(ParserError::UnexpectedDirective {
                    line: self.line,
                    directive: arcstr::literal!("ends"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokState {
    /// At the start of a line.
    Init,
    /// Inside a line.
    Line,
}

struct Tokenizer<'a> {
    rem: &'a str,
    state: TokState,
    /// No token of the current line has been returned yet.
    line_start: bool,
    /// The current one-based line number.
    line: usize,
}

const COMMENTS: [char; 3] = ['*', '$', ';'];
const LINE_CONTINUATION: char = '+';

fn is_newline(c: char) -> bool {
    c == '\n'
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r'
}

fn is_special(c: char) -> bool {
    is_space(c) || is_newline(c) || c == '=' || c == ';'
}

impl<'a> Tokenizer<'a> {
    fn new(data: &'a str) -> Self {
        Self {
            rem: data,
            state: TokState::Init,
            line_start: false,
            line: 1,
        }
    }

    fn get(&mut self) -> Result<Option<Token>, ParserError> {
        loop {
            self.take_ws();
            let Some(c) = self.peek() else {
                // Close the final line before reporting EOF.
                if self.state == TokState::Line {
                    self.state = TokState::Init;
                    return Ok(Some(Token::LineEnd));
                }
                return Ok(None);
            };

            if c == '=' {
                self.take1();
                self.line_start = false;
                return Ok(Some(Token::Equals));
            }
            match self.state {
                TokState::Init => {
                    if COMMENTS.contains(&c) {
                        self.take_until_newline();
                    } else if is_newline(c) {
                        self.take_newline();
                    } else if c == LINE_CONTINUATION {
                        return Err(ParserError::InvalidLine {
                            line: self.line,
                            reason: "unexpected line continuation".to_string(),
                        });
                    } else {
                        self.state = TokState::Line;
                        self.line_start = true;
                    }
                }
                TokState::Line => {
                    if is_newline(c) {
                        self.take_newline();
                        self.skip_comment_lines();
                        if self.peek() != Some(LINE_CONTINUATION) {
                            self.state = TokState::Init;
                            return Ok(Some(Token::LineEnd));
                        }
                        self.take1();
                    } else if COMMENTS.contains(&c) {
                        self.take_until_newline();
                    } else if c == '.' && self.line_start {
                        self.take1();
                        self.line_start = false;
                        return Ok(Some(Token::Directive(ArcStr::from(self.take_ident()))));
                    } else {
                        self.line_start = false;
                        return Ok(Some(Token::Ident(ArcStr::from(self.take_ident()))));
                    }
                }
            }
        }
    }

    /// Skips whole-line comments between a line and its continuation.
    fn skip_comment_lines(&mut self) {
        loop {
            self.take_ws();
            match self.peek() {
                Some(c) if COMMENTS.contains(&c) => {
                    self.take_until_newline();
                    if self.peek().is_some_and(is_newline) {
                        self.take_newline();
                    }
                }
                _ => return,
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.rem.chars().next()
    }

    fn take1(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.rem = &self.rem[c.len_utf8()..];
        Some(c)
    }

    fn take_newline(&mut self) {
        self.take1();
        self.line += 1;
    }

    fn take_until_newline(&mut self) -> &'a str {
        let (rest, comment) =
            take_till::<_, _, ()>(is_newline)(self.rem).unwrap_or((self.rem, ""));
        self.rem = rest;
        comment
    }

    fn take_ident(&mut self) -> &'a str {
        let (rest, value) = take_till::<_, _, ()>(is_special)(self.rem).unwrap_or((self.rem, ""));
        self.rem = rest;
        value
    }

    fn take_ws(&mut self) {
        let (rest, _) = take_while::<_, _, ()>(is_space)(self.rem).unwrap_or((self.rem, ""));
        self.rem = rest;
    }
}
