use std::collections::HashMap;

use crate::types::{ArchiveEntry, Connection, Parameter, Scene, SceneNode};

use super::category::infer_category;
use super::value::coerce_value;

/// Parser mode: at the top level of a node definition, or inside a
/// `parm { ... }` stanza tracking brace depth.
enum Mode {
    Top,
    InParm { depth: i32 },
}

/// A parameter stanza under construction.
#[derive(Default)]
struct ParmDraft {
    name: String,
    raw_value: Option<String>,
    is_default: bool,
    expression: Option<String>,
    channel_ref: Option<String>,
}

impl ParmDraft {
    fn new() -> Self {
        Self {
            is_default: true,
            ..Self::default()
        }
    }
}

/// Walk one text entry line by line, appending nodes and connections to the
/// scene. Unrecognized lines are skipped; a stanza without a parameter name
/// is dropped whole.
pub(crate) fn parse_entry(entry: &ArchiveEntry, scene: &mut Scene) {
    let text = String::from_utf8_lossy(&entry.data);
    let base = base_path(&entry.path);

    let mut mode = Mode::Top;
    let mut current: Option<SceneNode> = None;
    let mut draft = ParmDraft::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        match mode {
            Mode::Top => {
                if let Some(node_type) = key_eq_token(line, "type") {
                    flush_node(current.take(), scene);
                    current = Some(SceneNode {
                        path: base.clone(),
                        node_type: node_type.to_string(),
                        category: infer_category(node_type, &base),
                        name: last_segment(&base).to_string(),
                        parameters: Vec::new(),
                        flags: HashMap::new(),
                    });
                } else if let Some(name) = key_opt_eq_token(line, "name") {
                    if let Some(node) = current.as_mut() {
                        node.name = name.to_string();
                        node.path = format!("{base}/{name}");
                    }
                } else if let Some(rest) = key_eq_rest(line, "flags") {
                    if let Some(node) = current.as_mut() {
                        parse_flags(rest, &mut node.flags);
                    }
                } else if line == "parm {" || line == "parm\t{" {
                    mode = Mode::InParm { depth: 1 };
                    draft = ParmDraft::new();
                } else if let Some(rest) = line.strip_prefix("wire ") {
                    if let Some(conn) = parse_wire(rest, &base) {
                        scene.connections.push(conn);
                    }
                } else if let Some(rest) = line.strip_prefix("input ") {
                    if let Some(conn) = parse_input(rest, &base) {
                        scene.connections.push(conn);
                    }
                }
            }
            Mode::InParm { ref mut depth } => {
                *depth += brace_delta(line);
                if *depth <= 0 {
                    finalize_parm(std::mem::take(&mut draft), current.as_mut());
                    mode = Mode::Top;
                    continue;
                }
                if let Some(name) = key_ws_rest(line, "name") {
                    draft.name = first_token(name).to_string();
                } else if let Some(raw) = value_rest(line) {
                    draft.raw_value = Some(raw.to_string());
                } else if let Some(expr) = key_ws_rest(line, "expression") {
                    draft.expression = Some(expr.to_string());
                    draft.is_default = false;
                } else if let Some(chan) = key_ws_rest(line, "channel") {
                    draft.channel_ref = Some(first_token(chan).to_string());
                }
                if line.contains("parmdef") || line.contains("default {") {
                    draft.is_default = false;
                }
            }
        }
    }

    // An unterminated stanza at end of entry is malformed — drop it.
    flush_node(current.take(), scene);
}

fn flush_node(node: Option<SceneNode>, scene: &mut Scene) {
    if let Some(node) = node {
        if !node.node_type.is_empty() {
            scene.nodes.push(node);
        }
    }
}

fn finalize_parm(draft: ParmDraft, node: Option<&mut SceneNode>) {
    let Some(node) = node else { return };
    if draft.name.is_empty() {
        return;
    }
    node.parameters.push(Parameter {
        name: draft.name,
        value: coerce_value(draft.raw_value.as_deref().unwrap_or("")),
        is_default: draft.is_default,
        expression: draft.expression,
        channel_ref: draft.channel_ref,
    });
}

/// Normalize an archive filename into an absolute base path: backslashes to
/// slashes, leading `./` or `/` stripped, then one leading `/`.
fn base_path(file_name: &str) -> String {
    let normalized = file_name.replace('\\', "/");
    let trimmed = normalized
        .strip_prefix("./")
        .or_else(|| normalized.strip_prefix('/'))
        .unwrap_or(&normalized);
    format!("/{trimmed}")
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("")
}

/// Net brace count of a line — `default { ... }` sub-blocks nest.
fn brace_delta(line: &str) -> i32 {
    let opens = line.matches('{').count() as i32;
    let closes = line.matches('}').count() as i32;
    opens - closes
}

// ── Line recognizers ───────────────────────────────────────────────

/// `key` followed by whitespace or `=`, or no match.
fn after_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    if rest.starts_with([' ', '\t', '=']) {
        Some(rest)
    } else {
        None
    }
}

/// `key = <token>` — equals required.
fn key_eq_token<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = after_key(line, key)?.trim_start();
    let rest = rest.strip_prefix('=')?;
    let token = first_token(rest);
    (!token.is_empty()).then_some(token)
}

/// `key [=] <token>` — equals optional.
fn key_opt_eq_token<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = after_key(line, key)?.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest);
    let token = first_token(rest);
    (!token.is_empty()).then_some(token)
}

/// `key = <rest of line>`.
fn key_eq_rest<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = after_key(line, key)?.trim_start();
    Some(rest.strip_prefix('=')?.trim())
}

/// `key <rest of line>` — whitespace separator, no equals.
fn key_ws_rest<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    if rest.starts_with([' ', '\t']) {
        Some(rest.trim())
    } else {
        None
    }
}

/// `[default ]value <raw>` — the raw value string of a parm stanza.
fn value_rest(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("default")
        .map(str::trim_start)
        .unwrap_or(line);
    key_ws_rest(rest, "value")
}

fn parse_flags(rest: &str, flags: &mut HashMap<String, bool>) {
    for token in rest.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) => {
                let on = matches!(value, "1" | "on" | "true");
                flags.insert(key.to_string(), on);
            }
            None => {
                flags.insert(token.to_string(), true);
            }
        }
    }
}

// ── Connections ────────────────────────────────────────────────────

/// `wire <from> <fromOut> <to> <toIn>`.
fn parse_wire(rest: &str, base: &str) -> Option<Connection> {
    let mut parts = rest.split_whitespace();
    let from = parts.next()?;
    let from_output = parts.next()?.parse().ok()?;
    let to = parts.next()?;
    let to_input = parts.next()?.parse().ok()?;
    Some(Connection {
        from_path: resolve(base, from),
        from_output,
        to_path: resolve(base, to),
        to_input,
    })
}

/// `input <toIn> <from> <fromOut>` — destination is the entry's base path.
fn parse_input(rest: &str, base: &str) -> Option<Connection> {
    let mut parts = rest.split_whitespace();
    let to_input = parts.next()?.parse().ok()?;
    let from = parts.next()?;
    let from_output = parts.next()?.parse().ok()?;
    Some(Connection {
        from_path: resolve(base, from),
        from_output,
        to_path: base.to_string(),
        to_input,
    })
}

fn resolve(base: &str, relative: &str) -> String {
    if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("{base}/{relative}")
    }
}
