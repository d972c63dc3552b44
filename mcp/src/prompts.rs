//! Canned starting points for common reverse-engineering sessions.

use serde_json::{json, Value};

use crate::error::{McpError, Result};

#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    pub name: &'static str,
    pub description: &'static str,
    pub text: &'static str,
}

pub const PROMPTS: &[Prompt] = &[
    Prompt {
        name: "analyze_function",
        description: "Start analyzing the function at the current location",
        text: "Analyze the function the debugger is stopped in:\n\
               1. Check the debugger status\n\
               2. Read the instruction pointer (EIP/RIP)\n\
               3. Disassemble the function\n\
               4. Examine the registers and the stack",
    },
    Prompt {
        name: "find_crypto",
        description: "Look for cryptographic code in the current module",
        text: "Search the current module for cryptography:\n\
               1. Get the module's base and size\n\
               2. Search for well-known crypto constants\n\
               3. Look for tight loops full of XOR and rotate instructions\n\
               4. Check imports and symbols for crypto API names",
    },
    Prompt {
        name: "trace_execution",
        description: "Set up execution tracing from the current location",
        text: "Trace execution from the current location:\n\
               1. Get the current location\n\
               2. Set breakpoints at the interesting branches\n\
               3. Step through the code\n\
               4. Watch how the registers change",
    },
];

pub fn list() -> Value {
    let prompts: Vec<Value> = PROMPTS
        .iter()
        .map(|p| json!({ "name": p.name, "description": p.description, "arguments": [] }))
        .collect();
    json!({ "prompts": prompts })
}

pub fn get(name: &str) -> Result<Value> {
    let prompt = PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| McpError::PromptNotFound(name.to_string()))?;
    Ok(json!({
        "description": prompt.description,
        "messages": [{
            "role": "user",
            "content": { "type": "text", "text": prompt.text },
        }],
    }))
}
