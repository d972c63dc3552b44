//! `DebugHost` over a C capability table.

use std::ffi::CString;
use std::os::raw::c_char;

use dbgbridge_core::host::{MAX_COMMENT_SIZE, MAX_INSTRUCTION_BYTES, MAX_LABEL_SIZE};
use dbgbridge_core::{
    AnnotationInfo, Arch, BookmarkInfo, CommentText, DebugHost, Flag, FunctionInfo,
    FunctionRange, HostFault, HostList, HostResult, Instruction, LabelText, MemoryWrite,
    ModuleInfo, Register, SymbolInfo,
};

use crate::types::*;

/// Resolve a capability pointer or fault with its name.
macro_rules! capability {
    ($host:ident . $name:ident) => {
        $host
            .api
            .$name
            .ok_or_else(|| HostFault::unavailable(stringify!($name)))?
    };
}

/// Copy argument bytes as-is into a C string.
fn c_string(bytes: &[u8]) -> HostResult<CString> {
    CString::new(bytes).map_err(|_| HostFault::new("argument contains a NUL byte"))
}

/// Hands a listing buffer back to the host when dropped.
struct ListRelease {
    ctx: Ctx,
    list: FfiList,
    free: Option<FreeListFn>,
}

// Released on the server thread, which the host table must accept calls from.
unsafe impl Send for ListRelease {}

impl Drop for ListRelease {
    fn drop(&mut self) {
        if let Some(free) = self.free {
            unsafe { free(self.ctx, &mut self.list) };
        }
    }
}

/// A debugger reached through a [`DbgHostApi`] table.
pub struct FfiHost {
    api: DbgHostApi,
    arch: Arch,
}

// The host table must accept calls from the bridge's server thread.
unsafe impl Send for FfiHost {}
unsafe impl Sync for FfiHost {}

impl FfiHost {
    /// Fails when `api.arch` is not an [`FfiArch`] value.
    pub fn new(api: DbgHostApi) -> Result<Self, HostFault> {
        let arch = FfiArch::from_raw(api.arch)
            .ok_or_else(|| HostFault::new(format!("unknown architecture value {}", api.arch)))?;
        Ok(Self {
            api,
            arch: arch.into(),
        })
    }

    fn ctx(&self) -> Ctx {
        self.api.ctx
    }

    fn action(&self, f: Option<ActionFn>, name: &str) -> HostResult<bool> {
        let f = f.ok_or_else(|| HostFault::unavailable(name))?;
        Ok(unsafe { f(self.ctx()) })
    }

    fn at(&self, f: Option<AddressFn>, name: &str, addr: u64) -> HostResult<bool> {
        let f = f.ok_or_else(|| HostFault::unavailable(name))?;
        Ok(unsafe { f(self.ctx(), addr) })
    }

    fn set_text(
        &self,
        f: Option<SetTextFn>,
        name: &str,
        addr: u64,
        text: &[u8],
        manual: bool,
    ) -> HostResult<bool> {
        let f = f.ok_or_else(|| HostFault::unavailable(name))?;
        let text = c_string(text)?;
        Ok(unsafe { f(self.ctx(), addr, text.as_ptr(), manual) })
    }

    fn text_at(
        &self,
        f: Option<TextAtFn>,
        name: &str,
        addr: u64,
        capacity: usize,
    ) -> HostResult<Option<String>> {
        let f = f.ok_or_else(|| HostFault::unavailable(name))?;
        let mut buf = vec![0u8; capacity];
        let ok = unsafe { f(self.ctx(), addr, buf.as_mut_ptr().cast::<c_char>(), capacity) };
        Ok(ok.then(|| string_from_buf(&buf)))
    }

    fn lookup(&self, f: Option<LookupFn>, name: &str, text: &[u8]) -> HostResult<Option<u64>> {
        let f = f.ok_or_else(|| HostFault::unavailable(name))?;
        let text = c_string(text)?;
        let mut out = 0u64;
        let ok = unsafe { f(self.ctx(), text.as_ptr(), &mut out) };
        Ok(ok.then_some(out))
    }

    /// Copy a host listing into owned elements; the host buffer is released
    /// when the returned list is dropped.
    fn list<E: ListElement>(
        &self,
        f: Option<ListFn>,
        name: &str,
    ) -> HostResult<Option<HostList<E::Core>>> {
        let f = f.ok_or_else(|| HostFault::unavailable(name))?;
        let mut raw = FfiList::empty();
        if !unsafe { f(self.ctx(), &mut raw) } {
            return Ok(None);
        }
        let release = ListRelease {
            ctx: self.ctx(),
            list: raw,
            free: self.api.free_list,
        };

        let items = if raw.items.is_null() || raw.len == 0 {
            Vec::new()
        } else {
            let elements = unsafe { std::slice::from_raw_parts(raw.items.cast::<E>(), raw.len) };
            elements.iter().map(|e| unsafe { e.to_core() }).collect()
        };
        Ok(Some(HostList::with_release(items, move || drop(release))))
    }
}

impl DebugHost for FfiHost {
    fn arch(&self) -> Arch {
        self.arch
    }

    fn is_debugging(&self) -> HostResult<bool> {
        self.action(self.api.is_debugging, "is_debugging")
    }

    fn is_running(&self) -> HostResult<bool> {
        self.action(self.api.is_running, "is_running")
    }

    fn exec_command(&self, command: &[u8]) -> HostResult<bool> {
        let f = capability!(self.exec_command);
        let command = c_string(command)?;
        Ok(unsafe { f(self.ctx(), command.as_ptr()) })
    }

    fn register_get(&self, register: Register) -> HostResult<u64> {
        let f = capability!(self.register_get);
        let name = c_string(register.name().as_bytes())?;
        Ok(unsafe { f(self.ctx(), name.as_ptr()) })
    }

    fn register_set(&self, register: Register, value: u64) -> HostResult<bool> {
        let f = capability!(self.register_set);
        let name = c_string(register.name().as_bytes())?;
        Ok(unsafe { f(self.ctx(), name.as_ptr(), value) })
    }

    fn memory_read(&self, addr: u64, size: usize) -> HostResult<Option<Vec<u8>>> {
        let f = capability!(self.memory_read);
        let mut buf = vec![0u8; size];
        let mut read = 0usize;
        if !unsafe { f(self.ctx(), addr, buf.as_mut_ptr(), size, &mut read) } {
            return Ok(None);
        }
        buf.truncate(read.min(size));
        Ok(Some(buf))
    }

    fn memory_write(&self, addr: u64, data: &[u8]) -> HostResult<MemoryWrite> {
        let f = capability!(self.memory_write);
        let mut written = 0usize;
        let success = unsafe { f(self.ctx(), addr, data.as_ptr(), data.len(), &mut written) };
        Ok(MemoryWrite {
            success,
            bytes_written: written as u64,
        })
    }

    fn pattern_find(&self, start: u64, size: u64, pattern: &str) -> HostResult<Option<u64>> {
        let f = capability!(self.pattern_find);
        let pattern = c_string(pattern.as_bytes())?;
        let mut out = 0u64;
        let found = unsafe { f(self.ctx(), start, size, pattern.as_ptr(), &mut out) };
        Ok(found.then_some(out))
    }

    fn pattern_search_replace(
        &self,
        start: u64,
        size: u64,
        search: &str,
        replace: &str,
    ) -> HostResult<bool> {
        let f = capability!(self.pattern_search_replace);
        let search = c_string(search.as_bytes())?;
        let replace = c_string(replace.as_bytes())?;
        Ok(unsafe { f(self.ctx(), start, size, search.as_ptr(), replace.as_ptr()) })
    }

    fn run(&self) -> HostResult<bool> {
        self.action(self.api.run, "run")
    }

    fn pause(&self) -> HostResult<bool> {
        self.action(self.api.pause, "pause")
    }

    fn step_in(&self) -> HostResult<bool> {
        self.action(self.api.step_in, "step_in")
    }

    fn step_over(&self) -> HostResult<bool> {
        self.action(self.api.step_over, "step_over")
    }

    fn step_out(&self) -> HostResult<bool> {
        self.action(self.api.step_out, "step_out")
    }

    fn breakpoint_set(&self, addr: u64) -> HostResult<bool> {
        self.at(self.api.breakpoint_set, "breakpoint_set", addr)
    }

    fn breakpoint_delete(&self, addr: u64) -> HostResult<bool> {
        self.at(self.api.breakpoint_delete, "breakpoint_delete", addr)
    }

    fn disasm_at(&self, addr: u64) -> HostResult<Option<Instruction>> {
        let f = capability!(self.disasm_at);
        let mut text = vec![0u8; DISASM_TEXT_SIZE];
        let mut size = 0u32;
        let ok = unsafe {
            f(
                self.ctx(),
                addr,
                text.as_mut_ptr().cast::<c_char>(),
                DISASM_TEXT_SIZE,
                &mut size,
            )
        };
        Ok(ok.then(|| Instruction {
            text: string_from_buf(&text),
            size,
        }))
    }

    fn modules(&self) -> HostResult<Option<HostList<ModuleInfo>>> {
        self.list::<FfiModule>(self.api.modules, "modules")
    }

    fn symbols(&self) -> HostResult<Option<HostList<SymbolInfo>>> {
        self.list::<FfiSymbol>(self.api.symbols, "symbols")
    }

    fn label_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool> {
        self.set_text(self.api.label_set, "label_set", addr, text, manual)
    }

    fn label_get(&self, addr: u64) -> HostResult<Option<LabelText>> {
        let text = self.text_at(self.api.label_get, "label_get", addr, MAX_LABEL_SIZE)?;
        Ok(text.map(|t| LabelText::truncated(&t)))
    }

    fn label_delete(&self, addr: u64) -> HostResult<bool> {
        self.at(self.api.label_delete, "label_delete", addr)
    }

    fn label_from_string(&self, label: &[u8]) -> HostResult<Option<u64>> {
        self.lookup(self.api.label_from_string, "label_from_string", label)
    }

    fn labels(&self) -> HostResult<Option<HostList<AnnotationInfo>>> {
        self.list::<FfiAnnotation>(self.api.labels, "labels")
    }

    fn comment_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool> {
        self.set_text(self.api.comment_set, "comment_set", addr, text, manual)
    }

    fn comment_get(&self, addr: u64) -> HostResult<Option<CommentText>> {
        let text = self.text_at(self.api.comment_get, "comment_get", addr, MAX_COMMENT_SIZE)?;
        Ok(text.map(|t| CommentText::truncated(&t)))
    }

    fn comment_delete(&self, addr: u64) -> HostResult<bool> {
        self.at(self.api.comment_delete, "comment_delete", addr)
    }

    fn comment_from_string(&self, text: &[u8]) -> HostResult<Option<u64>> {
        self.lookup(self.api.comment_from_string, "comment_from_string", text)
    }

    fn comments(&self) -> HostResult<Option<HostList<AnnotationInfo>>> {
        self.list::<FfiAnnotation>(self.api.comments, "comments")
    }

    fn stack_push(&self, value: u64) -> HostResult<u64> {
        let f = capability!(self.stack_push);
        Ok(unsafe { f(self.ctx(), value) })
    }

    fn stack_pop(&self) -> HostResult<u64> {
        let f = capability!(self.stack_pop);
        Ok(unsafe { f(self.ctx()) })
    }

    fn stack_peek(&self, offset: i32) -> HostResult<u64> {
        let f = capability!(self.stack_peek);
        Ok(unsafe { f(self.ctx(), offset) })
    }

    fn function_add(
        &self,
        start: u64,
        end: u64,
        manual: bool,
        instruction_count: u64,
    ) -> HostResult<bool> {
        let f = capability!(self.function_add);
        Ok(unsafe { f(self.ctx(), start, end, manual, instruction_count) })
    }

    fn function_get(&self, addr: u64) -> HostResult<Option<FunctionRange>> {
        let f = capability!(self.function_get);
        let mut out = FfiFunctionRange::default();
        let ok = unsafe { f(self.ctx(), addr, &mut out) };
        Ok(ok.then(|| out.into()))
    }

    fn function_delete(&self, addr: u64) -> HostResult<bool> {
        self.at(self.api.function_delete, "function_delete", addr)
    }

    fn functions(&self) -> HostResult<Option<HostList<FunctionInfo>>> {
        self.list::<FfiFunction>(self.api.functions, "functions")
    }

    fn bookmark_set(&self, addr: u64, manual: bool) -> HostResult<bool> {
        let f = capability!(self.bookmark_set);
        Ok(unsafe { f(self.ctx(), addr, manual) })
    }

    fn bookmark_get(&self, addr: u64) -> HostResult<bool> {
        self.at(self.api.bookmark_get, "bookmark_get", addr)
    }

    fn bookmark_delete(&self, addr: u64) -> HostResult<bool> {
        self.at(self.api.bookmark_delete, "bookmark_delete", addr)
    }

    fn bookmarks(&self) -> HostResult<Option<HostList<BookmarkInfo>>> {
        self.list::<FfiBookmark>(self.api.bookmarks, "bookmarks")
    }

    fn parse_expression(&self, expression: &[u8]) -> HostResult<Option<u64>> {
        self.lookup(self.api.parse_expression, "parse_expression", expression)
    }

    fn resolve_label(&self, label: &[u8]) -> HostResult<Option<u64>> {
        self.lookup(self.api.resolve_label, "resolve_label", label)
    }

    fn get_proc_address(&self, module: &[u8], api: &[u8]) -> HostResult<Option<u64>> {
        let f = capability!(self.get_proc_address);
        let module = c_string(module)?;
        let api = c_string(api)?;
        let mut out = 0u64;
        let found = unsafe { f(self.ctx(), module.as_ptr(), api.as_ptr(), &mut out) };
        Ok(found.then_some(out))
    }

    fn assemble(&self, addr: u64, instruction: &[u8]) -> HostResult<Option<Vec<u8>>> {
        let f = capability!(self.assemble);
        let instruction = c_string(instruction)?;
        let mut buf = vec![0u8; MAX_INSTRUCTION_BYTES];
        let mut len = 0usize;
        let ok = unsafe {
            f(
                self.ctx(),
                addr,
                instruction.as_ptr(),
                buf.as_mut_ptr(),
                MAX_INSTRUCTION_BYTES,
                &mut len,
            )
        };
        if !ok {
            return Ok(None);
        }
        buf.truncate(len.min(MAX_INSTRUCTION_BYTES));
        Ok(Some(buf))
    }

    fn assemble_mem(&self, addr: u64, instruction: &[u8]) -> HostResult<bool> {
        let f = capability!(self.assemble_mem);
        let instruction = c_string(instruction)?;
        Ok(unsafe { f(self.ctx(), addr, instruction.as_ptr()) })
    }

    fn flag_get(&self, flag: Flag) -> HostResult<bool> {
        let f = capability!(self.flag_get);
        let name = c_string(flag.name().as_bytes())?;
        Ok(unsafe { f(self.ctx(), name.as_ptr()) })
    }

    fn flag_set(&self, flag: Flag, value: bool) -> HostResult<bool> {
        let f = capability!(self.flag_set);
        let name = c_string(flag.name().as_bytes())?;
        Ok(unsafe { f(self.ctx(), name.as_ptr(), value) })
    }
}

impl std::fmt::Debug for FfiHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfiHost")
            .field("ctx", &self.api.ctx)
            .field("arch", &self.arch)
            .finish()
    }
}
