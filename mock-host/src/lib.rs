//! An in-memory debugger behind the `DebugHost` interface.
//!
//! # Overview
//! `MockHost` simulates just enough of a debugger for the bridge to be
//! exercised end to end: a small x64 process image, a stack, registers,
//! flags and the annotation stores (labels, comments, bookmarks, functions).
//!
//! # Design
//! - All mutable state sits behind one `Mutex`; every capability call holds
//!   it only for the duration of that call.
//! - Every call is counted, and calls currently inside the host are tracked
//!   so tests can assert the bridge never overlaps two requests.
//! - Listing calls hand out `HostList`s whose release is counted, so tests
//!   can check each buffer is returned exactly once.
//! - Faults and list failures can be injected to drive the bridge's error
//!   paths.

pub mod memory;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use dbgbridge_core::host::{
    AnnotationInfo, Arch, BookmarkInfo, CommentText, DebugHost, Flag, FunctionInfo,
    FunctionRange, HostList, HostResult, Instruction, LabelText, MemoryWrite, ModuleInfo,
    Register, SymbolInfo, SymbolKind, MAX_INSTRUCTION_BYTES,
};
use dbgbridge_core::params::parse_unsigned;
use dbgbridge_core::HostFault;
use tracing::debug;

use memory::{parse_pattern, AddressSpace, Region};

pub const IMAGE_BASE: u64 = 0x1_4000_0000;
pub const IMAGE_SIZE: usize = 0x3000;
pub const ENTRY_POINT: u64 = IMAGE_BASE + 0x1000;
/// Address of the first `DE AD BE EF` marker in the data section.
pub const MARKER: u64 = IMAGE_BASE + 0x2000;
pub const STACK_BASE: u64 = 0x14_f000;
pub const STACK_SIZE: usize = 0x1000;
pub const KERNEL32_BASE: u64 = 0x7ff8_0000_0000;

/// Bytes at the entry point: `push rbp; mov rbp, rsp; nop; nop; int3; ret`.
pub const ENTRY_CODE: [u8; 8] = [0x55, 0x48, 0x89, 0xe5, 0x90, 0x90, 0xcc, 0xc3];

struct Function {
    end: u64,
    manual: bool,
    instruction_count: u64,
}

struct Annotation {
    text: String,
    manual: bool,
}

struct State {
    arch: Arch,
    debugging: bool,
    running: bool,
    registers: HashMap<Register, u64>,
    flags: HashMap<Flag, bool>,
    memory: AddressSpace,
    stack: Vec<u64>,
    modules: Vec<ModuleInfo>,
    symbols: Vec<SymbolInfo>,
    breakpoints: BTreeSet<u64>,
    labels: BTreeMap<u64, Annotation>,
    comments: BTreeMap<u64, Annotation>,
    bookmarks: BTreeMap<u64, bool>,
    functions: BTreeMap<u64, Function>,
    commands: Vec<String>,
}

impl State {
    fn seeded(arch: Arch) -> Self {
        let mut memory = AddressSpace::default();
        let mut image = Region::new(IMAGE_BASE, IMAGE_SIZE);
        let entry = (ENTRY_POINT - IMAGE_BASE) as usize;
        image.bytes[entry..entry + ENTRY_CODE.len()].copy_from_slice(&ENTRY_CODE);
        for marker in [MARKER, MARKER + 0x10] {
            let at = (marker - IMAGE_BASE) as usize;
            image.bytes[at..at + 4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        }
        memory.map(image);
        memory.map(Region::new(STACK_BASE, STACK_SIZE));

        let modules = vec![
            ModuleInfo {
                name: "target.exe".to_string(),
                base: IMAGE_BASE,
                size: IMAGE_SIZE as u64,
                entry: ENTRY_POINT,
                path: "C:\\samples\\target.exe".to_string(),
            },
            ModuleInfo {
                name: "kernel32.dll".to_string(),
                base: KERNEL32_BASE,
                size: 0xb_0000,
                entry: KERNEL32_BASE + 0x1_5000,
                path: "C:\\Windows\\System32\\kernel32.dll".to_string(),
            },
        ];
        let symbols = vec![
            symbol("target.exe", 0x1000, "main", SymbolKind::Function),
            symbol("target.exe", 0x2100, "VirtualAlloc", SymbolKind::Import),
            symbol("kernel32.dll", 0x1_a2b0, "VirtualAlloc", SymbolKind::Export),
            symbol("kernel32.dll", 0x1_d4c0, "CreateFileW", SymbolKind::Export),
        ];

        let (sp, ip) = match arch {
            Arch::X64 => (Register::Rsp, Register::Rip),
            Arch::X86 => (Register::Esp, Register::Eip),
        };
        let registers = HashMap::from([
            (ip, ENTRY_POINT),
            (sp, STACK_BASE + STACK_SIZE as u64 - 0x100),
        ]);
        let flags = HashMap::from([(Flag::Zf, true), (Flag::If, true)]);

        Self {
            arch,
            debugging: true,
            running: false,
            registers,
            flags,
            memory,
            stack: Vec::new(),
            modules,
            symbols,
            breakpoints: BTreeSet::new(),
            labels: BTreeMap::new(),
            comments: BTreeMap::new(),
            bookmarks: BTreeMap::new(),
            functions: BTreeMap::new(),
            commands: Vec::new(),
        }
    }

    fn ip(&self) -> Register {
        match self.arch {
            Arch::X64 => Register::Rip,
            Arch::X86 => Register::Eip,
        }
    }

    /// Module name and RVA for an address; unmapped addresses keep their
    /// absolute value.
    fn locate(&self, addr: u64) -> (String, u64) {
        self.modules
            .iter()
            .find(|m| addr >= m.base && addr < m.base + m.size)
            .map(|m| (m.name.clone(), addr - m.base))
            .unwrap_or_else(|| (String::new(), addr))
    }

    fn module_base(&self, name: &str) -> Option<u64> {
        self.modules
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .map(|m| m.base)
    }

    fn symbol_address(&self, name: &str) -> Option<u64> {
        self.symbols
            .iter()
            .filter(|s| s.kind != SymbolKind::Import)
            .find(|s| s.name == name)
            .and_then(|s| Some(self.module_base(&s.module)? + s.rva))
    }

    fn annotations(&self, store: &BTreeMap<u64, Annotation>) -> Vec<AnnotationInfo> {
        store
            .iter()
            .map(|(&addr, a)| {
                let (module, rva) = self.locate(addr);
                AnnotationInfo {
                    module,
                    rva,
                    text: a.text.clone(),
                    manual: a.manual,
                }
            })
            .collect()
    }

    fn step(&mut self) -> bool {
        if !self.debugging || self.running {
            return false;
        }
        let ip = self.ip();
        let current = self.registers.get(&ip).copied().unwrap_or(0);
        let size = disassemble(self, current).map_or(1, |i| i.size as u64);
        self.registers.insert(ip, current + size);
        true
    }
}

fn symbol(module: &str, rva: u64, name: &str, kind: SymbolKind) -> SymbolInfo {
    SymbolInfo {
        module: module.to_string(),
        rva,
        name: name.to_string(),
        manual: false,
        kind,
    }
}

/// One-byte opcodes the mock understands; everything else is a `db`.
fn disassemble(state: &State, addr: u64) -> Option<Instruction> {
    let bytes = state.memory.read(addr, 3)?;
    let (text, size) = match bytes.as_slice() {
        [0x48, 0x89, 0xe5, ..] => ("mov rbp, rsp".to_string(), 3),
        [0x55, ..] => ("push rbp".to_string(), 1),
        [0x90, ..] => ("nop".to_string(), 1),
        [0xcc, ..] => ("int3".to_string(), 1),
        [0xc3, ..] => ("ret".to_string(), 1),
        [other, ..] => (format!("db {other:#04x}"), 1),
        [] => return None,
    };
    Some(Instruction { text, size })
}

fn assemble_text(instruction: &[u8]) -> Option<Vec<u8>> {
    let instruction = std::str::from_utf8(instruction).ok()?;
    let bytes = match instruction.trim().to_ascii_lowercase().as_str() {
        "nop" => vec![0x90],
        "ret" => vec![0xc3],
        "int3" => vec![0xcc],
        "push rbp" => vec![0x55],
        "mov rbp, rsp" => vec![0x48, 0x89, 0xe5],
        "xor rax, rax" => vec![0x48, 0x31, 0xc0],
        _ => return None,
    };
    debug_assert!(bytes.len() <= MAX_INSTRUCTION_BYTES);
    Some(bytes)
}

/// Counts how many calls are inside the host at once.
struct InFlight<'a> {
    host: &'a MockHost,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.host.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Simulated debugger with call instrumentation.
pub struct MockHost {
    state: Mutex<State>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    lists_issued: AtomicUsize,
    lists_released: Arc<AtomicUsize>,
    fail_lists: AtomicBool,
    command_fault: Mutex<Option<String>>,
    call_delay: Mutex<Duration>,
}

impl MockHost {
    /// A seeded x64 target paused at its entry point.
    pub fn new() -> Self {
        Self::with_arch(Arch::X64)
    }

    pub fn with_arch(arch: Arch) -> Self {
        Self {
            state: Mutex::new(State::seeded(arch)),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            lists_issued: AtomicUsize::new(0),
            lists_released: Arc::new(AtomicUsize::new(0)),
            fail_lists: AtomicBool::new(false),
            command_fault: Mutex::new(None),
            call_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Capability calls made so far, `arch` excluded.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Largest number of capability calls that ever overlapped.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn lists_issued(&self) -> usize {
        self.lists_issued.load(Ordering::SeqCst)
    }

    pub fn lists_released(&self) -> usize {
        self.lists_released.load(Ordering::SeqCst)
    }

    /// Commands received through `exec_command`, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn breakpoints(&self) -> Vec<u64> {
        self.lock().breakpoints.iter().copied().collect()
    }

    /// Make every `exec_command` raise a fault with `message`, or stop doing so.
    pub fn set_command_fault(&self, message: Option<&str>) {
        *self
            .command_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = message.map(str::to_string);
    }

    /// Make listing capabilities report failure.
    pub fn set_fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every capability call.
    pub fn set_call_delay(&self, delay: Duration) {
        *self.call_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) -> InFlight<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.call_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        InFlight { host: self }
    }

    fn list<T>(&self, items: Vec<T>) -> Option<HostList<T>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return None;
        }
        self.lists_issued.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.lists_released);
        Some(HostList::with_release(items, move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugHost for MockHost {
    fn arch(&self) -> Arch {
        self.lock().arch
    }

    fn is_debugging(&self) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().debugging)
    }

    fn is_running(&self) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().running)
    }

    fn exec_command(&self, command: &[u8]) -> HostResult<bool> {
        let _call = self.enter();
        let fault = self
            .command_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(message) = fault {
            return Err(HostFault::new(message));
        }
        let command = String::from_utf8_lossy(command);
        debug!(%command, "command");
        let ok = !command.trim().is_empty();
        self.lock().commands.push(command.into_owned());
        Ok(ok)
    }

    fn register_get(&self, register: Register) -> HostResult<u64> {
        let _call = self.enter();
        Ok(self.lock().registers.get(&register).copied().unwrap_or(0))
    }

    fn register_set(&self, register: Register, value: u64) -> HostResult<bool> {
        let _call = self.enter();
        self.lock().registers.insert(register, value);
        Ok(true)
    }

    fn memory_read(&self, addr: u64, size: usize) -> HostResult<Option<Vec<u8>>> {
        let _call = self.enter();
        Ok(self.lock().memory.read(addr, size))
    }

    fn memory_write(&self, addr: u64, data: &[u8]) -> HostResult<MemoryWrite> {
        let _call = self.enter();
        let written = self.lock().memory.write(addr, data);
        Ok(MemoryWrite {
            success: written == Some(data.len()),
            bytes_written: written.unwrap_or(0) as u64,
        })
    }

    fn pattern_find(&self, start: u64, size: u64, pattern: &str) -> HostResult<Option<u64>> {
        let _call = self.enter();
        let Some(pattern) = parse_pattern(pattern) else {
            return Ok(None);
        };
        Ok(self.lock().memory.find(start, size, &pattern))
    }

    fn pattern_search_replace(
        &self,
        start: u64,
        size: u64,
        search: &str,
        replace: &str,
    ) -> HostResult<bool> {
        let _call = self.enter();
        let (Some(search), Some(replace)) = (parse_pattern(search), parse_pattern(replace)) else {
            return Ok(false);
        };
        let mut state = self.lock();
        let Some(found) = state.memory.find(start, size, &search) else {
            return Ok(false);
        };
        let Some(mut bytes) = state.memory.read(found, replace.len()) else {
            return Ok(false);
        };
        for (byte, new) in bytes.iter_mut().zip(&replace) {
            if let Some(new) = new {
                *byte = *new;
            }
        }
        Ok(state.memory.write(found, &bytes).is_some())
    }

    fn run(&self) -> HostResult<bool> {
        let _call = self.enter();
        let mut state = self.lock();
        if !state.debugging {
            return Ok(false);
        }
        state.running = true;
        Ok(true)
    }

    fn pause(&self) -> HostResult<bool> {
        let _call = self.enter();
        let mut state = self.lock();
        if !state.debugging {
            return Ok(false);
        }
        state.running = false;
        Ok(true)
    }

    fn step_in(&self) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().step())
    }

    fn step_over(&self) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().step())
    }

    fn step_out(&self) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().step())
    }

    fn breakpoint_set(&self, addr: u64) -> HostResult<bool> {
        let _call = self.enter();
        let mut state = self.lock();
        if state.memory.byte(addr).is_none() {
            return Ok(false);
        }
        Ok(state.breakpoints.insert(addr))
    }

    fn breakpoint_delete(&self, addr: u64) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().breakpoints.remove(&addr))
    }

    fn disasm_at(&self, addr: u64) -> HostResult<Option<Instruction>> {
        let _call = self.enter();
        Ok(disassemble(&self.lock(), addr))
    }

    fn modules(&self) -> HostResult<Option<HostList<ModuleInfo>>> {
        let _call = self.enter();
        let items = self.lock().modules.clone();
        Ok(self.list(items))
    }

    fn symbols(&self) -> HostResult<Option<HostList<SymbolInfo>>> {
        let _call = self.enter();
        let items = self.lock().symbols.clone();
        Ok(self.list(items))
    }

    fn label_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool> {
        let _call = self.enter();
        if text.is_empty() || LabelText::check(text).is_err() {
            return Ok(false);
        }
        self.lock().labels.insert(
            addr,
            Annotation {
                text: String::from_utf8_lossy(text).into_owned(),
                manual,
            },
        );
        Ok(true)
    }

    fn label_get(&self, addr: u64) -> HostResult<Option<LabelText>> {
        let _call = self.enter();
        Ok(self
            .lock()
            .labels
            .get(&addr)
            .map(|a| LabelText::truncated(&a.text)))
    }

    fn label_delete(&self, addr: u64) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().labels.remove(&addr).is_some())
    }

    fn label_from_string(&self, label: &[u8]) -> HostResult<Option<u64>> {
        let _call = self.enter();
        Ok(self
            .lock()
            .labels
            .iter()
            .find(|(_, a)| a.text.as_bytes() == label)
            .map(|(&addr, _)| addr))
    }

    fn labels(&self) -> HostResult<Option<HostList<AnnotationInfo>>> {
        let _call = self.enter();
        let items = {
            let state = self.lock();
            state.annotations(&state.labels)
        };
        Ok(self.list(items))
    }

    fn comment_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool> {
        let _call = self.enter();
        if CommentText::check(text).is_err() {
            return Ok(false);
        }
        self.lock().comments.insert(
            addr,
            Annotation {
                text: String::from_utf8_lossy(text).into_owned(),
                manual,
            },
        );
        Ok(true)
    }

    fn comment_get(&self, addr: u64) -> HostResult<Option<CommentText>> {
        let _call = self.enter();
        Ok(self
            .lock()
            .comments
            .get(&addr)
            .map(|a| CommentText::truncated(&a.text)))
    }

    fn comment_delete(&self, addr: u64) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().comments.remove(&addr).is_some())
    }

    fn comment_from_string(&self, text: &[u8]) -> HostResult<Option<u64>> {
        let _call = self.enter();
        Ok(self
            .lock()
            .comments
            .iter()
            .find(|(_, a)| a.text.as_bytes() == text)
            .map(|(&addr, _)| addr))
    }

    fn comments(&self) -> HostResult<Option<HostList<AnnotationInfo>>> {
        let _call = self.enter();
        let items = {
            let state = self.lock();
            state.annotations(&state.comments)
        };
        Ok(self.list(items))
    }

    fn stack_push(&self, value: u64) -> HostResult<u64> {
        let _call = self.enter();
        let mut state = self.lock();
        let previous = state.stack.last().copied().unwrap_or(0);
        state.stack.push(value);
        Ok(previous)
    }

    fn stack_pop(&self) -> HostResult<u64> {
        let _call = self.enter();
        Ok(self.lock().stack.pop().unwrap_or(0))
    }

    fn stack_peek(&self, offset: i32) -> HostResult<u64> {
        let _call = self.enter();
        let state = self.lock();
        let Ok(depth) = usize::try_from(offset) else {
            return Ok(0);
        };
        Ok(state.stack.iter().rev().nth(depth).copied().unwrap_or(0))
    }

    fn function_add(
        &self,
        start: u64,
        end: u64,
        manual: bool,
        instruction_count: u64,
    ) -> HostResult<bool> {
        let _call = self.enter();
        if end < start {
            return Ok(false);
        }
        let mut state = self.lock();
        let overlaps = state
            .functions
            .range(..=end)
            .any(|(&s, f)| s <= end && f.end >= start);
        if overlaps {
            return Ok(false);
        }
        state.functions.insert(
            start,
            Function {
                end,
                manual,
                instruction_count,
            },
        );
        Ok(true)
    }

    fn function_get(&self, addr: u64) -> HostResult<Option<FunctionRange>> {
        let _call = self.enter();
        let state = self.lock();
        Ok(state
            .functions
            .range(..=addr)
            .next_back()
            .filter(|(_, f)| addr <= f.end)
            .map(|(&start, f)| FunctionRange {
                start,
                end: f.end,
                instruction_count: f.instruction_count,
            }))
    }

    fn function_delete(&self, addr: u64) -> HostResult<bool> {
        let _call = self.enter();
        let mut state = self.lock();
        let start = state
            .functions
            .range(..=addr)
            .next_back()
            .filter(|(_, f)| addr <= f.end)
            .map(|(&start, _)| start);
        Ok(start.is_some_and(|s| state.functions.remove(&s).is_some()))
    }

    fn functions(&self) -> HostResult<Option<HostList<FunctionInfo>>> {
        let _call = self.enter();
        let items = {
            let state = self.lock();
            state
                .functions
                .iter()
                .map(|(&start, f)| {
                    let (module, rva_start) = state.locate(start);
                    FunctionInfo {
                        module,
                        rva_start,
                        rva_end: rva_start + (f.end - start),
                        manual: f.manual,
                        instruction_count: f.instruction_count,
                    }
                })
                .collect()
        };
        Ok(self.list(items))
    }

    fn bookmark_set(&self, addr: u64, manual: bool) -> HostResult<bool> {
        let _call = self.enter();
        self.lock().bookmarks.insert(addr, manual);
        Ok(true)
    }

    fn bookmark_get(&self, addr: u64) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().bookmarks.contains_key(&addr))
    }

    fn bookmark_delete(&self, addr: u64) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().bookmarks.remove(&addr).is_some())
    }

    fn bookmarks(&self) -> HostResult<Option<HostList<BookmarkInfo>>> {
        let _call = self.enter();
        let items = {
            let state = self.lock();
            state
                .bookmarks
                .iter()
                .map(|(&addr, &manual)| {
                    let (module, rva) = state.locate(addr);
                    BookmarkInfo {
                        module,
                        rva,
                        manual,
                    }
                })
                .collect()
        };
        Ok(self.list(items))
    }

    /// Numbers, register names, labels and symbol names, optionally joined
    /// by a single `+` or `-`.
    fn parse_expression(&self, expression: &[u8]) -> HostResult<Option<u64>> {
        let _call = self.enter();
        let Ok(expression) = std::str::from_utf8(expression) else {
            return Ok(None);
        };
        let state = self.lock();
        let term = |text: &str| -> Option<u64> {
            let text = text.trim();
            parse_unsigned(text)
                .or_else(|| {
                    Register::parse(text, state.arch)
                        .map(|r| state.registers.get(&r).copied().unwrap_or(0))
                })
                .or_else(|| {
                    state
                        .labels
                        .iter()
                        .find(|(_, a)| a.text == text)
                        .map(|(&addr, _)| addr)
                })
                .or_else(|| state.symbol_address(text))
        };
        let value = if let Some((lhs, rhs)) = expression.split_once('+') {
            term(lhs).zip(term(rhs)).map(|(a, b)| a.wrapping_add(b))
        } else if let Some((lhs, rhs)) = expression.split_once('-') {
            term(lhs).zip(term(rhs)).map(|(a, b)| a.wrapping_sub(b))
        } else {
            term(expression)
        };
        Ok(value)
    }

    fn resolve_label(&self, label: &[u8]) -> HostResult<Option<u64>> {
        let _call = self.enter();
        let state = self.lock();
        Ok(state
            .labels
            .iter()
            .find(|(_, a)| a.text.as_bytes() == label)
            .map(|(&addr, _)| addr)
            .or_else(|| state.symbol_address(std::str::from_utf8(label).ok()?)))
    }

    fn get_proc_address(&self, module: &[u8], api: &[u8]) -> HostResult<Option<u64>> {
        let _call = self.enter();
        let state = self.lock();
        Ok(state
            .symbols
            .iter()
            .find(|s| {
                s.kind == SymbolKind::Export
                    && s.module.as_bytes().eq_ignore_ascii_case(module)
                    && s.name.as_bytes() == api
            })
            .and_then(|s| Some(state.module_base(&s.module)? + s.rva)))
    }

    fn assemble(&self, _addr: u64, instruction: &[u8]) -> HostResult<Option<Vec<u8>>> {
        let _call = self.enter();
        Ok(assemble_text(instruction))
    }

    fn assemble_mem(&self, addr: u64, instruction: &[u8]) -> HostResult<bool> {
        let _call = self.enter();
        let Some(bytes) = assemble_text(instruction) else {
            return Ok(false);
        };
        Ok(self.lock().memory.write(addr, &bytes) == Some(bytes.len()))
    }

    fn flag_get(&self, flag: Flag) -> HostResult<bool> {
        let _call = self.enter();
        Ok(self.lock().flags.get(&flag).copied().unwrap_or(false))
    }

    fn flag_set(&self, flag: Flag, value: bool) -> HostResult<bool> {
        let _call = self.enter();
        self.lock().flags.insert(flag, value);
        Ok(true)
    }
}
