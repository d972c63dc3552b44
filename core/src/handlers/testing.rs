//! A canned `DebugHost` for handler unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::HostFault;
use crate::host::*;
use crate::http::{Request, Response};
use crate::router::Router;

#[derive(Default)]
pub(crate) struct StubHost {
    /// Every capability reports failure (`false` / `None`).
    pub fail: bool,
    /// Every capability raises this fault.
    pub fault: Option<String>,
    pub x86: bool,
    pub released: Arc<AtomicUsize>,
    calls: Mutex<Vec<String>>,
}

impl StubHost {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn x86() -> Self {
        Self {
            x86: true,
            ..Self::default()
        }
    }

    pub fn faulting(message: &str) -> Self {
        Self {
            fault: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Calls made so far, as `name(args)` strings. Text arguments are
    /// shown with non-printable bytes escaped.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn hit(&self, call: String) -> HostResult<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fault {
            Some(message) => Err(HostFault::new(message.clone())),
            None => Ok(()),
        }
    }

    fn ok(&self) -> bool {
        !self.fail
    }

    fn some<T>(&self, value: T) -> Option<T> {
        (!self.fail).then_some(value)
    }

    fn list<T>(&self, items: Vec<T>) -> Option<HostList<T>> {
        let released = self.released.clone();
        self.some(HostList::with_release(items, move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// Dispatch `target` (path plus query) through the full router.
pub(crate) fn call(host: &StubHost, target: &str) -> Response {
    let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let request = Request::parse(raw.as_bytes()).unwrap();
    Router::new().dispatch(host, &request)
}

impl DebugHost for StubHost {
    fn arch(&self) -> Arch {
        if self.x86 {
            Arch::X86
        } else {
            Arch::X64
        }
    }

    fn is_debugging(&self) -> HostResult<bool> {
        self.hit("is_debugging()".into())?;
        Ok(self.ok())
    }

    fn is_running(&self) -> HostResult<bool> {
        self.hit("is_running()".into())?;
        Ok(false)
    }

    fn exec_command(&self, command: &[u8]) -> HostResult<bool> {
        self.hit(format!("exec_command({})", command.escape_ascii()))?;
        Ok(self.ok())
    }

    fn register_get(&self, register: Register) -> HostResult<u64> {
        self.hit(format!("register_get({})", register.name()))?;
        Ok(0x1234)
    }

    fn register_set(&self, register: Register, value: u64) -> HostResult<bool> {
        self.hit(format!("register_set({}, {value:#x})", register.name()))?;
        Ok(self.ok())
    }

    fn memory_read(&self, addr: u64, size: usize) -> HostResult<Option<Vec<u8>>> {
        self.hit(format!("memory_read({addr:#x}, {size})"))?;
        Ok(self.some((0..size).map(|i| i as u8).collect()))
    }

    fn memory_write(&self, addr: u64, data: &[u8]) -> HostResult<MemoryWrite> {
        self.hit(format!("memory_write({addr:#x}, {data:02x?})"))?;
        Ok(MemoryWrite {
            success: self.ok(),
            bytes_written: if self.fail { 0 } else { data.len() as u64 },
        })
    }

    fn pattern_find(&self, start: u64, size: u64, pattern: &str) -> HostResult<Option<u64>> {
        self.hit(format!("pattern_find({start:#x}, {size:#x}, {pattern})"))?;
        // every 0x10 bytes matches
        let next = (start + 0xf) & !0xf;
        Ok(self.some(next).filter(|&a| a < start + size))
    }

    fn pattern_search_replace(
        &self,
        start: u64,
        size: u64,
        search: &str,
        replace: &str,
    ) -> HostResult<bool> {
        self.hit(format!(
            "pattern_search_replace({start:#x}, {size:#x}, {search}, {replace})"
        ))?;
        Ok(self.ok())
    }

    fn run(&self) -> HostResult<bool> {
        self.hit("run()".into())?;
        Ok(self.ok())
    }

    fn pause(&self) -> HostResult<bool> {
        self.hit("pause()".into())?;
        Ok(self.ok())
    }

    fn step_in(&self) -> HostResult<bool> {
        self.hit("step_in()".into())?;
        Ok(self.ok())
    }

    fn step_over(&self) -> HostResult<bool> {
        self.hit("step_over()".into())?;
        Ok(self.ok())
    }

    fn step_out(&self) -> HostResult<bool> {
        self.hit("step_out()".into())?;
        Ok(self.ok())
    }

    fn breakpoint_set(&self, addr: u64) -> HostResult<bool> {
        self.hit(format!("breakpoint_set({addr:#x})"))?;
        Ok(self.ok())
    }

    fn breakpoint_delete(&self, addr: u64) -> HostResult<bool> {
        self.hit(format!("breakpoint_delete({addr:#x})"))?;
        Ok(self.ok())
    }

    fn disasm_at(&self, addr: u64) -> HostResult<Option<Instruction>> {
        self.hit(format!("disasm_at({addr:#x})"))?;
        Ok(self.some(Instruction {
            text: "mov eax, \"x\"".to_string(),
            size: 5,
        }))
    }

    fn modules(&self) -> HostResult<Option<HostList<ModuleInfo>>> {
        self.hit("modules()".into())?;
        Ok(self.list(vec![ModuleInfo {
            name: "app.exe".to_string(),
            base: 0x400000,
            size: 0x2000,
            entry: 0x401000,
            path: "C:\\app\\app.exe".to_string(),
        }]))
    }

    fn symbols(&self) -> HostResult<Option<HostList<SymbolInfo>>> {
        self.hit("symbols()".into())?;
        Ok(self.list(vec![SymbolInfo {
            module: "app.exe".to_string(),
            rva: 0x1000,
            name: "main".to_string(),
            manual: false,
            kind: SymbolKind::Export,
        }]))
    }

    fn label_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool> {
        self.hit(format!("label_set({addr:#x}, {}, {manual})", text.escape_ascii()))?;
        Ok(self.ok())
    }

    fn label_get(&self, addr: u64) -> HostResult<Option<LabelText>> {
        self.hit(format!("label_get({addr:#x})"))?;
        Ok(self.some(LabelText::truncated("entry")))
    }

    fn label_delete(&self, addr: u64) -> HostResult<bool> {
        self.hit(format!("label_delete({addr:#x})"))?;
        Ok(self.ok())
    }

    fn label_from_string(&self, label: &[u8]) -> HostResult<Option<u64>> {
        self.hit(format!("label_from_string({})", label.escape_ascii()))?;
        Ok(self.some(0x401000))
    }

    fn labels(&self) -> HostResult<Option<HostList<AnnotationInfo>>> {
        self.hit("labels()".into())?;
        Ok(self.list(vec![AnnotationInfo {
            module: "app.exe".to_string(),
            rva: 0x1000,
            text: "entry".to_string(),
            manual: true,
        }]))
    }

    fn comment_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool> {
        self.hit(format!("comment_set({addr:#x}, {}, {manual})", text.escape_ascii()))?;
        Ok(self.ok())
    }

    fn comment_get(&self, addr: u64) -> HostResult<Option<CommentText>> {
        self.hit(format!("comment_get({addr:#x})"))?;
        Ok(self.some(CommentText::truncated("decrypts\tconfig")))
    }

    fn comment_delete(&self, addr: u64) -> HostResult<bool> {
        self.hit(format!("comment_delete({addr:#x})"))?;
        Ok(self.ok())
    }

    fn comment_from_string(&self, text: &[u8]) -> HostResult<Option<u64>> {
        self.hit(format!("comment_from_string({})", text.escape_ascii()))?;
        Ok(self.some(0x401010))
    }

    fn comments(&self) -> HostResult<Option<HostList<AnnotationInfo>>> {
        self.hit("comments()".into())?;
        Ok(self.list(Vec::new()))
    }

    fn stack_push(&self, value: u64) -> HostResult<u64> {
        self.hit(format!("stack_push({value:#x})"))?;
        Ok(0xaa)
    }

    fn stack_pop(&self) -> HostResult<u64> {
        self.hit("stack_pop()".into())?;
        Ok(0xbb)
    }

    fn stack_peek(&self, offset: i32) -> HostResult<u64> {
        self.hit(format!("stack_peek({offset})"))?;
        Ok(0xcc)
    }

    fn function_add(
        &self,
        start: u64,
        end: u64,
        manual: bool,
        instruction_count: u64,
    ) -> HostResult<bool> {
        self.hit(format!(
            "function_add({start:#x}, {end:#x}, {manual}, {instruction_count})"
        ))?;
        Ok(self.ok())
    }

    fn function_get(&self, addr: u64) -> HostResult<Option<FunctionRange>> {
        self.hit(format!("function_get({addr:#x})"))?;
        Ok(self.some(FunctionRange {
            start: 0x401000,
            end: 0x401050,
            instruction_count: 20,
        }))
    }

    fn function_delete(&self, addr: u64) -> HostResult<bool> {
        self.hit(format!("function_delete({addr:#x})"))?;
        Ok(self.ok())
    }

    fn functions(&self) -> HostResult<Option<HostList<FunctionInfo>>> {
        self.hit("functions()".into())?;
        Ok(self.list(vec![FunctionInfo {
            module: "app.exe".to_string(),
            rva_start: 0x1000,
            rva_end: 0x1050,
            manual: false,
            instruction_count: 20,
        }]))
    }

    fn bookmark_set(&self, addr: u64, manual: bool) -> HostResult<bool> {
        self.hit(format!("bookmark_set({addr:#x}, {manual})"))?;
        Ok(self.ok())
    }

    fn bookmark_get(&self, addr: u64) -> HostResult<bool> {
        self.hit(format!("bookmark_get({addr:#x})"))?;
        Ok(self.ok())
    }

    fn bookmark_delete(&self, addr: u64) -> HostResult<bool> {
        self.hit(format!("bookmark_delete({addr:#x})"))?;
        Ok(self.ok())
    }

    fn bookmarks(&self) -> HostResult<Option<HostList<BookmarkInfo>>> {
        self.hit("bookmarks()".into())?;
        Ok(self.list(vec![BookmarkInfo {
            module: "app.exe".to_string(),
            rva: 0x1000,
            manual: true,
        }]))
    }

    fn parse_expression(&self, expression: &[u8]) -> HostResult<Option<u64>> {
        self.hit(format!("parse_expression({})", expression.escape_ascii()))?;
        Ok(self.some(0x401008))
    }

    fn resolve_label(&self, label: &[u8]) -> HostResult<Option<u64>> {
        self.hit(format!("resolve_label({})", label.escape_ascii()))?;
        Ok(self.some(0x401000))
    }

    fn get_proc_address(&self, module: &[u8], api: &[u8]) -> HostResult<Option<u64>> {
        self.hit(format!(
            "get_proc_address({}, {})",
            module.escape_ascii(),
            api.escape_ascii()
        ))?;
        Ok(self.some(0x7ff0_0000_1000))
    }

    fn assemble(&self, addr: u64, instruction: &[u8]) -> HostResult<Option<Vec<u8>>> {
        self.hit(format!("assemble({addr:#x}, {})", instruction.escape_ascii()))?;
        Ok(self.some(vec![0x48, 0x31, 0xc0]))
    }

    fn assemble_mem(&self, addr: u64, instruction: &[u8]) -> HostResult<bool> {
        self.hit(format!("assemble_mem({addr:#x}, {})", instruction.escape_ascii()))?;
        Ok(self.ok())
    }

    fn flag_get(&self, flag: Flag) -> HostResult<bool> {
        self.hit(format!("flag_get({})", flag.name()))?;
        Ok(matches!(flag, Flag::Zf | Flag::If))
    }

    fn flag_set(&self, flag: Flag, value: bool) -> HostResult<bool> {
        self.hit(format!("flag_set({}, {value})", flag.name()))?;
        Ok(self.ok())
    }
}
