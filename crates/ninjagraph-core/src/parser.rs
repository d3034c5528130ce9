//! # Ninja Parser
//!
//! Line-oriented parser for Ninja build descriptions.
//!
//! Parsing is two-phase: [`parse`] runs the state machine over the whole
//! text and validates every rule and build at flush time; only a fully
//! valid parse is applied to the graph. A parse error therefore leaves the
//! store untouched. Store failures during the apply phase surface verbatim
//! and are not rolled back.
//!
//! Recognized constructs: comments, blank lines, `$` line continuations,
//! `rule` blocks with indented `key = value` bindings, `build` statements
//! with `|` implicit and `||` order-only dependencies, and indented build
//! variables. `pool` and `variable` declarations close the open context but
//! are not persisted. No `$`-variable expansion is attempted; `\ ` in a
//! path unescapes to a literal space.

use crate::model::NinjaGraph;
use crate::types::{rule_identity, GraphError, NinjaBuild, NinjaRule, ParseError};
use std::collections::BTreeMap;

// =============================================================================
// PARSED FORMS
// =============================================================================

/// A build statement as parsed, before it is turned into store records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBuild {
    pub rule: String,
    pub outputs: Vec<String>,
    pub inputs: Vec<String>,
    pub implicit_deps: Vec<String>,
    pub order_deps: Vec<String>,
    pub variables: BTreeMap<String, String>,
    pub pool: String,
}

impl ParsedBuild {
    fn new(rule: String, outputs: Vec<String>, inputs: Vec<String>, implicit_deps: Vec<String>, order_deps: Vec<String>) -> Self {
        Self {
            rule,
            outputs,
            inputs,
            implicit_deps,
            order_deps,
            variables: BTreeMap::new(),
            pool: "default".to_string(),
        }
    }

    /// The build id: the comma-join of outputs in source order.
    #[must_use]
    pub fn build_id(&self) -> String {
        self.outputs.join(",")
    }
}

/// The validated result of parsing a Ninja text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub rules: Vec<NinjaRule>,
    pub builds: Vec<ParsedBuild>,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[derive(Debug)]
enum Context {
    Idle,
    Rule {
        name: String,
        command: String,
        description: String,
        variables: BTreeMap<String, String>,
    },
    Build(ParsedBuild),
}

/// Parse a Ninja text into rules and builds, validating at flush time.
///
/// A rule lacking `command` fails with [`ParseError::MissingCommand`]; a
/// build with zero outputs fails with [`ParseError::EmptyOutputs`]. A build
/// line without a `:` is silently skipped.
pub fn parse(content: &str) -> Result<ParsedFile, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut parsed = ParsedFile::default();
    let mut context = Context::Idle;

    let mut i = 0;
    while i < lines.len() {
        let physical = lines[i];
        let indented = physical.starts_with("  ") || physical.starts_with('\t');
        let mut line = physical.trim().to_string();
        i += 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // A trailing un-doubled `$` joins the next physical line with a
        // single space.
        while ends_with_continuation(&line) && i < lines.len() {
            line.truncate(line.len() - 1);
            let next = lines[i].trim();
            i += 1;
            line = format!("{} {}", line.trim_end(), next);
        }

        // State transitions happen on top-level keywords only; an indented
        // line is always a key/value binding for the open context.
        if !indented {
            if let Some(rest) = line.strip_prefix("rule ") {
                flush(&mut parsed, std::mem::replace(&mut context, Context::Idle))?;
                context = Context::Rule {
                    name: rest.trim().to_string(),
                    command: String::new(),
                    description: String::new(),
                    variables: BTreeMap::new(),
                };
                continue;
            }

            if let Some(rest) = line.strip_prefix("build ") {
                flush(&mut parsed, std::mem::replace(&mut context, Context::Idle))?;
                if let Some(build) = parse_build_line(rest) {
                    context = Context::Build(build);
                }
                continue;
            }
        }

        if !indented && (line.starts_with("pool ") || line.starts_with("variable ")) {
            // Recognized but not persisted; closes any open context. Only a
            // top-level keyword counts: an indented `pool = ...` is a build
            // binding and falls through to the key/value handling below.
            flush(&mut parsed, std::mem::replace(&mut context, Context::Idle))?;
            continue;
        }

        if indented {
            if let Some((key, value)) = split_binding(&line) {
                match &mut context {
                    Context::Rule {
                        command,
                        description,
                        variables,
                        ..
                    } => match key {
                        "command" => *command = value.to_string(),
                        "description" => *description = value.to_string(),
                        _ => {
                            variables.insert(key.to_string(), value.to_string());
                        }
                    },
                    Context::Build(build) => {
                        if key == "pool" {
                            build.pool = value.to_string();
                        } else {
                            build.variables.insert(key.to_string(), value.to_string());
                        }
                    }
                    Context::Idle => {}
                }
            }
        }
    }

    flush(&mut parsed, context)?;
    Ok(parsed)
}

fn ends_with_continuation(line: &str) -> bool {
    line.ends_with('$') && !line.ends_with("$$")
}

fn split_binding(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Close the current context, validating and recording its result.
fn flush(parsed: &mut ParsedFile, context: Context) -> Result<(), ParseError> {
    match context {
        Context::Idle => Ok(()),
        Context::Rule {
            name,
            command,
            description,
            variables,
        } => {
            if command.is_empty() {
                return Err(ParseError::MissingCommand(name));
            }
            let mut rule = NinjaRule::new(name, command);
            rule.description = description;
            // Variables maps serialize infallibly for string maps.
            let _ = rule.set_variables(&variables);
            parsed.rules.push(rule);
            Ok(())
        }
        Context::Build(build) => {
            if build.outputs.is_empty() {
                return Err(ParseError::EmptyOutputs(build.rule));
            }
            parsed.builds.push(build);
            Ok(())
        }
    }
}

/// Parse the remainder of a `build` line:
/// `<outputs>: <rule> <inputs> [| <implicit>] [|| <order>]`.
///
/// Returns `None` for lines without a `:` or without a rule token; such
/// lines are skipped.
fn parse_build_line(rest: &str) -> Option<ParsedBuild> {
    let (left, right) = rest.split_once(':')?;
    let outputs = split_paths(left);

    let right = right.trim();
    let mut tokens = right.split_whitespace();
    let rule = tokens.next()?.to_string();
    let dep_string = tokens.collect::<Vec<_>>().join(" ");

    let (dep_string, order_deps) = match dep_string.split_once("||") {
        Some((head, tail)) => (head.trim().to_string(), split_paths(tail.trim())),
        None => (dep_string, Vec::new()),
    };

    let (dep_string, implicit_deps) = match dep_string.split_once('|') {
        Some((head, tail)) => (head.trim().to_string(), split_paths(tail.trim())),
        None => (dep_string, Vec::new()),
    };

    let inputs = split_paths(&dep_string);

    Some(ParsedBuild::new(rule, outputs, inputs, implicit_deps, order_deps))
}

/// Split whitespace-separated paths, honoring `\ ` as an escaped space.
fn split_paths(input: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&' ') {
            chars.next();
            current.push(' ');
        } else if c.is_whitespace() {
            if !current.is_empty() {
                paths.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        paths.push(current);
    }
    paths
}

// =============================================================================
// LOADER
// =============================================================================

/// Applies parsed Ninja text to a [`NinjaGraph`].
pub struct NinjaParser<'a> {
    graph: &'a NinjaGraph,
}

impl<'a> NinjaParser<'a> {
    /// Create a parser writing into the given graph.
    #[must_use]
    pub fn new(graph: &'a NinjaGraph) -> Self {
        Self { graph }
    }

    /// Parse `content` and load it into the graph.
    ///
    /// Rules are applied before builds; identities are natural keys, so the
    /// result is the same as encounter order. Re-loading the same content
    /// yields the same graph state.
    pub fn parse_and_load(&self, content: &str) -> Result<(), GraphError> {
        let parsed = parse(content)?;

        for rule in &parsed.rules {
            self.graph.add_rule(rule)?;
        }

        for build in &parsed.builds {
            let mut record = NinjaBuild::new(build.build_id(), rule_identity(&build.rule));
            record.pool = build.pool.clone();
            record.set_variables(&build.variables)?;
            self.graph.add_build(
                &record,
                &build.inputs,
                &build.outputs,
                &build.implicit_deps,
                &build.order_deps,
            )?;
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
