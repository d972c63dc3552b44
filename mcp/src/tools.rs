//! The tool catalogue.
//!
//! Almost every tool forwards its arguments to one bridge endpoint and hands
//! back the decoded answer. When the bridge cannot be reached or answers
//! with an error status, the tool returns a fallback document shaped like a
//! failed answer (`{"success": false, "error": ...}` and similar), so the
//! client always receives something it can read.

use std::sync::OnceLock;

use dbgbridge_core::json::decode_hex;
use dbgbridge_core::DEFAULT_SEARCH_RESULTS;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::client::BridgeClient;
use crate::error::{BridgeError, McpError, Result};

/// Largest read `read_memory` asks the bridge for.
pub const MAX_READ: i64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    Integer,
    Boolean,
}

impl ArgKind {
    fn schema_type(self) -> &'static str {
        match self {
            ArgKind::Text => "string",
            ArgKind::Integer => "integer",
            ArgKind::Boolean => "boolean",
        }
    }
}

/// Default value of an optional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Int(i64),
    Bool(bool),
}

impl Preset {
    fn to_json(self) -> Value {
        match self {
            Preset::Int(n) => json!(n),
            Preset::Bool(b) => json!(b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Arg {
    pub name: &'static str,
    /// Query key the bridge expects for this argument.
    pub key: &'static str,
    pub kind: ArgKind,
    pub description: &'static str,
    pub default: Option<Preset>,
}

fn text(name: &'static str, description: &'static str) -> Arg {
    Arg {
        name,
        key: name,
        kind: ArgKind::Text,
        description,
        default: None,
    }
}

fn int(name: &'static str, description: &'static str) -> Arg {
    Arg {
        kind: ArgKind::Integer,
        ..text(name, description)
    }
}

fn boolean(name: &'static str, description: &'static str) -> Arg {
    Arg {
        kind: ArgKind::Boolean,
        ..text(name, description)
    }
}

impl Arg {
    fn sent_as(self, key: &'static str) -> Self {
        Self { key, ..self }
    }

    fn or(self, preset: Preset) -> Self {
        Self {
            default: Some(preset),
            ..self
        }
    }

    pub fn required(&self) -> bool {
        self.default.is_none()
    }

    /// Query text for this argument, taken from a call's `arguments`.
    fn query_value(&self, args: &Map<String, Value>) -> Result<String> {
        let value = match args.get(self.name).filter(|v| !v.is_null()) {
            Some(value) => value.clone(),
            None => self.default.map(Preset::to_json).ok_or_else(|| {
                McpError::InvalidParams(format!("missing required argument '{}'", self.name))
            })?,
        };
        let text = match (self.kind, &value) {
            (ArgKind::Text, Value::String(s)) => Some(s.clone()),
            (ArgKind::Text, Value::Number(n)) => Some(n.to_string()),
            (ArgKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            (ArgKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(|n| n.to_string()),
            (ArgKind::Boolean, Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };
        text.ok_or_else(|| {
            McpError::InvalidParams(format!(
                "argument '{}' must be of type {}",
                self.name,
                self.kind.schema_type()
            ))
        })
    }
}

/// Document a tool returns when its bridge call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// `{"success": false, "error": ...}`
    Failure,
    /// `{"error": ...}`
    Error,
    /// `{"error": ..., "debugging": false, "running": false}`
    Status,
    /// `{"error": ..., <field>: <argument as given>}`
    Echo {
        field: &'static str,
        arg: &'static str,
    },
    /// `{"found": false, "error": ...}`
    Found,
    /// `{"exists": false, "error": ...}`
    Exists,
    /// `{"count": 0, "results": [], "error": ...}`
    Search,
    /// `[{"error": ...}]`. A successful answer that is not an array reads as `[]`.
    List,
}

impl Fallback {
    fn render(self, err: &BridgeError, args: &Map<String, Value>) -> Value {
        let error = err.to_string();
        match self {
            Fallback::Failure => json!({ "success": false, "error": error }),
            Fallback::Error => json!({ "error": error }),
            Fallback::Status => json!({ "error": error, "debugging": false, "running": false }),
            Fallback::Echo { field, arg } => {
                let mut doc = Map::new();
                doc.insert("error".to_string(), Value::String(error));
                doc.insert(field.to_string(), args.get(arg).cloned().unwrap_or(Value::Null));
                Value::Object(doc)
            }
            Fallback::Found => json!({ "found": false, "error": error }),
            Fallback::Exists => json!({ "exists": false, "error": error }),
            Fallback::Search => json!({ "count": 0, "results": [], "error": error }),
            Fallback::List => json!([{ "error": error }]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward(&'static str),
    /// `/memory/read` with the size clamped to [`MAX_READ`] and an `ascii`
    /// rendering of the data added.
    ReadMemory,
    /// `/status`, then the instruction pointer, then its disassembly.
    CurrentLocation,
}

#[derive(Debug, Clone)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub action: Action,
    pub args: Vec<Arg>,
    pub fallback: Fallback,
}

/// What a tool call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answer(Value),
    /// The bridge call failed; the fallback document stands in for the answer.
    Fallback(Value),
}

impl Outcome {
    pub fn value(&self) -> &Value {
        match self {
            Outcome::Answer(value) | Outcome::Fallback(value) => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback(_))
    }
}

impl Tool {
    /// JSON Schema of the tool's `arguments` object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.args {
            let mut property = json!({
                "type": arg.kind.schema_type(),
                "description": arg.description,
            });
            if let Some(default) = arg.default {
                property["default"] = default.to_json();
            }
            properties.insert(arg.name.to_string(), property);
        }
        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|arg| arg.required())
            .map(|arg| arg.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// The `tools/list` entry.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    /// Run the tool. Argument errors are returned; bridge failures become a
    /// [`Outcome::Fallback`].
    pub fn call(&self, client: &BridgeClient, args: &Map<String, Value>) -> Result<Outcome> {
        let query = self
            .args
            .iter()
            .map(|arg| arg.query_value(args).map(|value| (arg.key, value)))
            .collect::<Result<Vec<_>>>()?;

        let answer = match self.action {
            Action::Forward(endpoint) => client.get(endpoint, &query),
            Action::ReadMemory => read_memory(client, query),
            Action::CurrentLocation => current_location(client),
        };

        Ok(match answer {
            Ok(value) if self.fallback == Fallback::List && !value.is_array() => {
                Outcome::Answer(json!([]))
            }
            Ok(value) => Outcome::Answer(value),
            Err(err) => {
                warn!(tool = self.name, error = %err, "bridge call failed");
                Outcome::Fallback(self.fallback.render(&err, args))
            }
        })
    }
}

fn read_memory(
    client: &BridgeClient,
    mut query: Vec<(&'static str, String)>,
) -> std::result::Result<Value, BridgeError> {
    for (key, value) in &mut query {
        if *key == "size" {
            if let Ok(size) = value.parse::<i64>() {
                *value = size.min(MAX_READ).to_string();
            }
        }
    }
    let mut answer = client.get("/memory/read", &query)?;
    let ascii = answer.get("data").and_then(Value::as_str).and_then(ascii_view);
    if let (Some(ascii), Some(doc)) = (ascii, answer.as_object_mut()) {
        doc.insert("ascii".to_string(), Value::String(ascii));
    }
    Ok(answer)
}

/// Printable ASCII as is, every other byte as `.`.
fn ascii_view(data: &str) -> Option<String> {
    let bytes = decode_hex(data).ok()?;
    Some(
        bytes
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect(),
    )
}

fn current_location(client: &BridgeClient) -> std::result::Result<Value, BridgeError> {
    let status = client.get("/status", &[])?;
    let ip = match status.get("arch").and_then(Value::as_str) {
        Some("x32") => "eip",
        _ => "rip",
    };
    let register = client.get("/register/get", &[("name", ip.to_string())])?;
    let Some(location) = register.get("value").cloned() else {
        return Ok(json!({ "error": "Could not get current location", "status": status }));
    };

    let addr = match &location {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let instruction = client.get("/disasm", &[("addr", addr)])?;
    Ok(json!({
        "status": status,
        "location": location,
        "instruction": instruction.get("instruction").cloned().unwrap_or_else(|| json!("unknown")),
        "instruction_size": instruction.get("size").cloned().unwrap_or_else(|| json!(0)),
    }))
}

pub fn find(name: &str) -> Option<&'static Tool> {
    tools().iter().find(|tool| tool.name == name)
}

const ADDR: &str = "Address in hex, e.g. \"0x401000\"";
const START: &str = "Start address of the range in hex";
const SIZE: &str = "Length of the range in bytes";
const PATTERN: &str = "Byte pattern, e.g. \"48 8B 05 ?? ?? ?? ??\"";
const MANUAL: &str = "Mark the entry as user-defined";

fn forward(
    name: &'static str,
    category: &'static str,
    endpoint: &'static str,
    description: &'static str,
    args: Vec<Arg>,
) -> Tool {
    Tool {
        name,
        description,
        category,
        action: Action::Forward(endpoint),
        args,
        fallback: Fallback::Failure,
    }
}

fn listing(
    name: &'static str,
    category: &'static str,
    endpoint: &'static str,
    description: &'static str,
) -> Tool {
    Tool {
        fallback: Fallback::List,
        ..forward(name, category, endpoint, description, Vec::new())
    }
}

fn with_fallback(tool: Tool, fallback: Fallback) -> Tool {
    Tool { fallback, ..tool }
}

/// Every tool, in `tools/list` order.
pub fn tools() -> &'static [Tool] {
    static TOOLS: OnceLock<Vec<Tool>> = OnceLock::new();
    TOOLS.get_or_init(catalogue)
}

fn catalogue() -> Vec<Tool> {
    vec![
        // --- status and control ---
        with_fallback(
            forward(
                "get_status",
                "control",
                "/status",
                "Debugger architecture, session state and whether the target is running",
                vec![],
            ),
            Fallback::Status,
        ),
        forward("execute_command", "control", "/cmd", "Run a raw debugger command", vec![text("cmd", "Command line to execute")]),
        forward("step_execution", "control", "/debug/step", "Single-step one instruction", vec![]),
        forward("step_over", "control", "/debug/stepover", "Step over the current instruction", vec![]),
        forward("step_out", "control", "/debug/stepout", "Run until the current function returns", vec![]),
        forward("run_process", "control", "/debug/run", "Resume the target", vec![]),
        forward("pause_process", "control", "/debug/pause", "Pause the target", vec![]),
        Tool {
            name: "analyze_current_location",
            description: "Status, instruction pointer and the instruction it points at, in one call",
            category: "control",
            action: Action::CurrentLocation,
            args: vec![],
            fallback: Fallback::Error,
        },
        // --- registers and flags ---
        with_fallback(
            forward("get_register", "registers", "/register/get", "Read a register", vec![text("name", "Register name, e.g. \"rax\" or \"eip\"")]),
            Fallback::Echo { field: "register", arg: "name" },
        ),
        forward(
            "set_register",
            "registers",
            "/register/set",
            "Write a register",
            vec![text("name", "Register name"), text("value", "New value in hex")],
        ),
        with_fallback(
            forward("get_cpu_flag", "registers", "/flag/get", "Read one CPU flag", vec![text("flag", "Flag name, e.g. \"zf\"")]),
            Fallback::Error,
        ),
        forward(
            "set_cpu_flag",
            "registers",
            "/flag/set",
            "Set or clear one CPU flag",
            vec![text("flag", "Flag name"), boolean("value", "New flag state")],
        ),
        with_fallback(
            forward("get_all_cpu_flags", "registers", "/flags/get_all", "Read every CPU flag", vec![]),
            Fallback::Error,
        ),
        // --- memory ---
        Tool {
            name: "read_memory",
            description: "Read memory as hex plus an ASCII rendering (at most 1024 bytes)",
            category: "memory",
            action: Action::ReadMemory,
            args: vec![
                text("addr", ADDR),
                int("size", "Bytes to read, capped at 1024").or(Preset::Int(16)),
            ],
            fallback: Fallback::Echo { field: "address", arg: "addr" },
        },
        forward(
            "write_memory",
            "memory",
            "/memory/write",
            "Write bytes given as hex",
            vec![text("addr", ADDR), text("data", "Bytes in hex, e.g. \"9090\"")],
        ),
        with_fallback(
            forward("disassemble_at", "memory", "/disasm", "Disassemble one instruction", vec![text("addr", ADDR)]),
            Fallback::Echo { field: "address", arg: "addr" },
        ),
        with_fallback(
            forward(
                "find_pattern_in_memory",
                "memory",
                "/pattern/find_mem",
                "First match of a byte pattern inside a range",
                vec![text("start_addr", START).sent_as("start"), int("size", SIZE), text("pattern", PATTERN)],
            ),
            Fallback::Found,
        ),
        forward(
            "search_and_replace_pattern",
            "memory",
            "/pattern/search_replace_mem",
            "Replace the first match of a byte pattern inside a range",
            vec![
                text("start_addr", START).sent_as("start"),
                int("size", SIZE),
                text("search_pattern", "Pattern to search for").sent_as("search"),
                text("replace_pattern", "Pattern to write over the match").sent_as("replace"),
            ],
        ),
        with_fallback(
            forward(
                "memory_search",
                "memory",
                "/memory/search",
                "Every match of a byte pattern inside a range",
                vec![
                    text("start_addr", START).sent_as("start"),
                    int("size", SIZE),
                    text("pattern", PATTERN),
                    int("max_results", "Most matches to return")
                        .sent_as("max")
                        .or(Preset::Int(DEFAULT_SEARCH_RESULTS as i64)),
                ],
            ),
            Fallback::Search,
        ),
        // --- breakpoints ---
        forward("set_breakpoint", "breakpoints", "/breakpoint/set", "Set a software breakpoint", vec![text("addr", ADDR)]),
        forward("delete_breakpoint", "breakpoints", "/breakpoint/delete", "Remove a software breakpoint", vec![text("addr", ADDR)]),
        // --- modules and symbols ---
        listing("get_modules", "symbols", "/modules", "Loaded modules with base, size, entry and path"),
        listing("get_symbols", "symbols", "/symbols/list", "Symbols of every loaded module"),
        forward(
            "parse_expression",
            "symbols",
            "/misc/parse_expression",
            "Evaluate a debugger expression",
            vec![text("expression", "Expression, e.g. \"rip+0x10\"").sent_as("expr")],
        ),
        forward(
            "resolve_api_address",
            "symbols",
            "/misc/get_proc_address",
            "Address of an exported function",
            vec![text("module", "Module name, e.g. \"kernel32.dll\""), text("api_name", "Export name").sent_as("api")],
        ),
        forward(
            "resolve_label_address",
            "symbols",
            "/misc/resolve_label",
            "Address of a label or symbol",
            vec![text("label", "Label or symbol name")],
        ),
        // --- labels ---
        forward(
            "set_label",
            "annotations",
            "/label/set",
            "Attach a label to an address",
            vec![text("addr", ADDR), text("text", "Label text"), boolean("manual", MANUAL).or(Preset::Bool(true))],
        ),
        forward("get_label", "annotations", "/label/get", "Label at an address", vec![text("addr", ADDR)]),
        forward("delete_label", "annotations", "/label/delete", "Remove the label at an address", vec![text("addr", ADDR)]),
        forward("resolve_label", "annotations", "/label/from_string", "Address of a label", vec![text("label", "Label text")]),
        listing("get_all_labels", "annotations", "/label/list", "Every label"),
        // --- comments ---
        forward(
            "set_comment",
            "annotations",
            "/comment/set",
            "Attach a comment to an address",
            vec![text("addr", ADDR), text("text", "Comment text"), boolean("manual", MANUAL).or(Preset::Bool(true))],
        ),
        forward("get_comment", "annotations", "/comment/get", "Comment at an address", vec![text("addr", ADDR)]),
        forward("delete_comment", "annotations", "/comment/delete", "Remove the comment at an address", vec![text("addr", ADDR)]),
        listing("get_all_comments", "annotations", "/comment/list", "Every comment"),
        // --- bookmarks ---
        forward(
            "set_bookmark",
            "annotations",
            "/bookmark/set",
            "Bookmark an address",
            vec![text("addr", ADDR), boolean("manual", MANUAL).or(Preset::Bool(true))],
        ),
        with_fallback(
            forward("check_bookmark", "annotations", "/bookmark/get", "Whether an address is bookmarked", vec![text("addr", ADDR)]),
            Fallback::Exists,
        ),
        forward("delete_bookmark", "annotations", "/bookmark/delete", "Remove a bookmark", vec![text("addr", ADDR)]),
        listing("get_all_bookmarks", "annotations", "/bookmark/list", "Every bookmark"),
        // --- functions ---
        forward(
            "add_function",
            "functions",
            "/function/add",
            "Define a function over an address range",
            vec![
                text("start_addr", START).sent_as("start"),
                text("end_addr", "End address of the range in hex").sent_as("end"),
                boolean("manual", MANUAL).or(Preset::Bool(true)),
            ],
        ),
        forward("get_function_info", "functions", "/function/get", "Function containing an address", vec![text("addr", ADDR)]),
        forward("delete_function", "functions", "/function/delete", "Remove the function containing an address", vec![text("addr", ADDR)]),
        listing("get_all_functions", "functions", "/function/list", "Every defined function"),
        // --- stack ---
        forward("stack_push", "stack", "/stack/push", "Push a value", vec![text("value", "Value in hex")]),
        forward("stack_pop", "stack", "/stack/pop", "Pop the top value", vec![]),
        forward(
            "stack_peek",
            "stack",
            "/stack/peek",
            "Read a stack slot without popping it",
            vec![int("offset", "Slot index from the top").or(Preset::Int(0))],
        ),
        // --- assembler ---
        forward(
            "assemble_instruction",
            "assembler",
            "/assembler/assemble",
            "Assemble one instruction without writing it",
            vec![text("addr", ADDR), text("instruction", "Instruction text, e.g. \"nop\"")],
        ),
        forward(
            "assemble_and_patch",
            "assembler",
            "/assembler/assemble_mem",
            "Assemble one instruction and write it to memory",
            vec![text("addr", ADDR), text("instruction", "Instruction text")],
        ),
    ]
}
