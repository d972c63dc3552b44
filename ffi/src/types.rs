//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! The debugger fills a [`DbgHostApi`] table once and hands it to
//! `dbgbridge_start`. Every capability is an optional function pointer that
//! receives the table's opaque `ctx` first. Scalar results come back as the
//! return value or through out-pointers; text results are written into
//! caller-sized buffers; listings come back as an [`FfiList`] that the
//! bridge copies and then returns to the host through `free_list`.
//!
//! Strings the host hands to the bridge are borrowed NUL-terminated C
//! strings that only need to stay valid for the duration of the call.
//!
//! Enumerated values the host writes (`DbgHostApi::arch`, `FfiSymbol::kind`)
//! travel as `u32` and are checked on the way in; [`FfiArch`] and
//! [`FfiSymbolKind`] only name the valid values.

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;

use dbgbridge_core::{
    AnnotationInfo, Arch, BookmarkInfo, FunctionInfo, FunctionRange, ModuleInfo, SymbolInfo,
    SymbolKind,
};

/// Capacity of the text buffer passed to `disasm_at`.
pub const DISASM_TEXT_SIZE: usize = 256;

/// Opaque handle to a running bridge server.
pub struct FfiBridge {
    pub(crate) server: dbgbridge_core::BridgeServer,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiArch {
    X86 = 0,
    X64 = 1,
}

impl FfiArch {
    /// `None` for any value that is not a variant.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(FfiArch::X86),
            1 => Some(FfiArch::X64),
            _ => None,
        }
    }
}

impl From<FfiArch> for Arch {
    fn from(a: FfiArch) -> Self {
        match a {
            FfiArch::X86 => Arch::X86,
            FfiArch::X64 => Arch::X64,
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiSymbolKind {
    Function = 0,
    Import = 1,
    Export = 2,
    Unknown = 3,
}

impl FfiSymbolKind {
    /// Values outside the enum read as `Unknown`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => FfiSymbolKind::Function,
            1 => FfiSymbolKind::Import,
            2 => FfiSymbolKind::Export,
            _ => FfiSymbolKind::Unknown,
        }
    }
}

impl From<FfiSymbolKind> for SymbolKind {
    fn from(k: FfiSymbolKind) -> Self {
        match k {
            FfiSymbolKind::Function => SymbolKind::Function,
            FfiSymbolKind::Import => SymbolKind::Import,
            FfiSymbolKind::Export => SymbolKind::Export,
            FfiSymbolKind::Unknown => SymbolKind::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// A host-owned array of list elements.
///
/// `items` points at `len` elements of the type the listing call documents.
/// `token` is free for the host to use when releasing the buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiList {
    pub items: *const c_void,
    pub len: usize,
    pub token: *mut c_void,
}

impl FfiList {
    pub fn empty() -> Self {
        Self {
            items: std::ptr::null(),
            len: 0,
            token: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiModule {
    pub name: *const c_char,
    pub base: u64,
    pub size: u64,
    pub entry: u64,
    pub path: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiSymbol {
    pub module: *const c_char,
    pub rva: u64,
    pub name: *const c_char,
    pub manual: bool,
    /// One of the [`FfiSymbolKind`] values.
    pub kind: u32,
}

/// A label or comment entry.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiAnnotation {
    pub module: *const c_char,
    pub rva: u64,
    pub text: *const c_char,
    pub manual: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiFunction {
    pub module: *const c_char,
    pub rva_start: u64,
    pub rva_end: u64,
    pub manual: bool,
    pub instruction_count: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiBookmark {
    pub module: *const c_char,
    pub rva: u64,
    pub manual: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfiFunctionRange {
    pub start: u64,
    pub end: u64,
    pub instruction_count: u64,
}

/// Copy a borrowed C string; null reads as empty.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string.
pub(crate) unsafe fn string_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Text up to the first NUL of a filled buffer.
pub(crate) fn string_from_buf(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Conversion of one host list element into its core type.
pub(crate) trait ListElement {
    type Core;

    /// # Safety
    /// Every string pointer in `self` must be null or NUL-terminated.
    unsafe fn to_core(&self) -> Self::Core;
}

impl ListElement for FfiModule {
    type Core = ModuleInfo;

    unsafe fn to_core(&self) -> ModuleInfo {
        unsafe {
            ModuleInfo {
                name: string_from_ptr(self.name),
                base: self.base,
                size: self.size,
                entry: self.entry,
                path: string_from_ptr(self.path),
            }
        }
    }
}

impl ListElement for FfiSymbol {
    type Core = SymbolInfo;

    unsafe fn to_core(&self) -> SymbolInfo {
        unsafe {
            SymbolInfo {
                module: string_from_ptr(self.module),
                rva: self.rva,
                name: string_from_ptr(self.name),
                manual: self.manual,
                kind: FfiSymbolKind::from_raw(self.kind).into(),
            }
        }
    }
}

impl ListElement for FfiAnnotation {
    type Core = AnnotationInfo;

    unsafe fn to_core(&self) -> AnnotationInfo {
        unsafe {
            AnnotationInfo {
                module: string_from_ptr(self.module),
                rva: self.rva,
                text: string_from_ptr(self.text),
                manual: self.manual,
            }
        }
    }
}

impl ListElement for FfiFunction {
    type Core = FunctionInfo;

    unsafe fn to_core(&self) -> FunctionInfo {
        unsafe {
            FunctionInfo {
                module: string_from_ptr(self.module),
                rva_start: self.rva_start,
                rva_end: self.rva_end,
                manual: self.manual,
                instruction_count: self.instruction_count,
            }
        }
    }
}

impl ListElement for FfiBookmark {
    type Core = BookmarkInfo;

    unsafe fn to_core(&self) -> BookmarkInfo {
        unsafe {
            BookmarkInfo {
                module: string_from_ptr(self.module),
                rva: self.rva,
                manual: self.manual,
            }
        }
    }
}

impl From<FfiFunctionRange> for FunctionRange {
    fn from(r: FfiFunctionRange) -> Self {
        FunctionRange {
            start: r.start,
            end: r.end,
            instruction_count: r.instruction_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Capability table
// ---------------------------------------------------------------------------

pub type Ctx = *mut c_void;

pub type FreeListFn = unsafe extern "C" fn(ctx: Ctx, list: *mut FfiList);
pub type ListFn = unsafe extern "C" fn(ctx: Ctx, out: *mut FfiList) -> bool;
pub type ActionFn = unsafe extern "C" fn(ctx: Ctx) -> bool;
pub type AddressFn = unsafe extern "C" fn(ctx: Ctx, addr: u64) -> bool;
/// Write text for `addr` into `buf` (capacity `cap`, NUL included).
pub type TextAtFn = unsafe extern "C" fn(ctx: Ctx, addr: u64, buf: *mut c_char, cap: usize) -> bool;
pub type SetTextFn =
    unsafe extern "C" fn(ctx: Ctx, addr: u64, text: *const c_char, manual: bool) -> bool;
pub type LookupFn = unsafe extern "C" fn(ctx: Ctx, text: *const c_char, out: *mut u64) -> bool;

/// The debugger's capability table.
///
/// A `None` entry makes the matching capability fault with
/// `capability '<name>' is not provided by the host`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DbgHostApi {
    pub ctx: Ctx,
    /// One of the [`FfiArch`] values; anything else is refused at start.
    pub arch: u32,
    /// Releases a buffer returned by any listing call.
    pub free_list: Option<FreeListFn>,

    pub is_debugging: Option<ActionFn>,
    pub is_running: Option<ActionFn>,
    pub exec_command: Option<unsafe extern "C" fn(ctx: Ctx, command: *const c_char) -> bool>,

    /// Registers are named by their lowercase canonical name.
    pub register_get: Option<unsafe extern "C" fn(ctx: Ctx, name: *const c_char) -> u64>,
    pub register_set:
        Option<unsafe extern "C" fn(ctx: Ctx, name: *const c_char, value: u64) -> bool>,

    pub memory_read: Option<
        unsafe extern "C" fn(ctx: Ctx, addr: u64, buf: *mut u8, size: usize, read: *mut usize)
            -> bool,
    >,
    pub memory_write: Option<
        unsafe extern "C" fn(
            ctx: Ctx,
            addr: u64,
            data: *const u8,
            size: usize,
            written: *mut usize,
        ) -> bool,
    >,

    pub pattern_find: Option<
        unsafe extern "C" fn(
            ctx: Ctx,
            start: u64,
            size: u64,
            pattern: *const c_char,
            out: *mut u64,
        ) -> bool,
    >,
    pub pattern_search_replace: Option<
        unsafe extern "C" fn(
            ctx: Ctx,
            start: u64,
            size: u64,
            search: *const c_char,
            replace: *const c_char,
        ) -> bool,
    >,

    pub run: Option<ActionFn>,
    pub pause: Option<ActionFn>,
    pub step_in: Option<ActionFn>,
    pub step_over: Option<ActionFn>,
    pub step_out: Option<ActionFn>,

    pub breakpoint_set: Option<AddressFn>,
    pub breakpoint_delete: Option<AddressFn>,

    /// Text buffer capacity is [`DISASM_TEXT_SIZE`].
    pub disasm_at: Option<
        unsafe extern "C" fn(ctx: Ctx, addr: u64, text: *mut c_char, cap: usize, size: *mut u32)
            -> bool,
    >,
    /// Elements are [`FfiModule`].
    pub modules: Option<ListFn>,
    /// Elements are [`FfiSymbol`].
    pub symbols: Option<ListFn>,

    pub label_set: Option<SetTextFn>,
    pub label_get: Option<TextAtFn>,
    pub label_delete: Option<AddressFn>,
    pub label_from_string: Option<LookupFn>,
    /// Elements are [`FfiAnnotation`].
    pub labels: Option<ListFn>,

    pub comment_set: Option<SetTextFn>,
    pub comment_get: Option<TextAtFn>,
    pub comment_delete: Option<AddressFn>,
    pub comment_from_string: Option<LookupFn>,
    /// Elements are [`FfiAnnotation`].
    pub comments: Option<ListFn>,

    pub stack_push: Option<unsafe extern "C" fn(ctx: Ctx, value: u64) -> u64>,
    pub stack_pop: Option<unsafe extern "C" fn(ctx: Ctx) -> u64>,
    pub stack_peek: Option<unsafe extern "C" fn(ctx: Ctx, offset: i32) -> u64>,

    pub function_add: Option<
        unsafe extern "C" fn(ctx: Ctx, start: u64, end: u64, manual: bool, count: u64) -> bool,
    >,
    pub function_get:
        Option<unsafe extern "C" fn(ctx: Ctx, addr: u64, out: *mut FfiFunctionRange) -> bool>,
    pub function_delete: Option<AddressFn>,
    /// Elements are [`FfiFunction`].
    pub functions: Option<ListFn>,

    pub bookmark_set: Option<unsafe extern "C" fn(ctx: Ctx, addr: u64, manual: bool) -> bool>,
    pub bookmark_get: Option<AddressFn>,
    pub bookmark_delete: Option<AddressFn>,
    /// Elements are [`FfiBookmark`].
    pub bookmarks: Option<ListFn>,

    pub parse_expression: Option<LookupFn>,
    pub resolve_label: Option<LookupFn>,
    pub get_proc_address: Option<
        unsafe extern "C" fn(
            ctx: Ctx,
            module: *const c_char,
            api: *const c_char,
            out: *mut u64,
        ) -> bool,
    >,

    pub assemble: Option<
        unsafe extern "C" fn(
            ctx: Ctx,
            addr: u64,
            instruction: *const c_char,
            buf: *mut u8,
            cap: usize,
            len: *mut usize,
        ) -> bool,
    >,
    pub assemble_mem:
        Option<unsafe extern "C" fn(ctx: Ctx, addr: u64, instruction: *const c_char) -> bool>,

    /// Flags are named by their lowercase name (`zf`, `cf`, ...).
    pub flag_get: Option<unsafe extern "C" fn(ctx: Ctx, name: *const c_char) -> bool>,
    pub flag_set:
        Option<unsafe extern "C" fn(ctx: Ctx, name: *const c_char, value: bool) -> bool>,
}

impl DbgHostApi {
    /// A table with no capabilities and a null context.
    pub fn empty(arch: FfiArch) -> Self {
        Self {
            ctx: std::ptr::null_mut(),
            arch: arch as u32,
            free_list: None,
            is_debugging: None,
            is_running: None,
            exec_command: None,
            register_get: None,
            register_set: None,
            memory_read: None,
            memory_write: None,
            pattern_find: None,
            pattern_search_replace: None,
            run: None,
            pause: None,
            step_in: None,
            step_over: None,
            step_out: None,
            breakpoint_set: None,
            breakpoint_delete: None,
            disasm_at: None,
            modules: None,
            symbols: None,
            label_set: None,
            label_get: None,
            label_delete: None,
            label_from_string: None,
            labels: None,
            comment_set: None,
            comment_get: None,
            comment_delete: None,
            comment_from_string: None,
            comments: None,
            stack_push: None,
            stack_pop: None,
            stack_peek: None,
            function_add: None,
            function_get: None,
            function_delete: None,
            functions: None,
            bookmark_set: None,
            bookmark_get: None,
            bookmark_delete: None,
            bookmarks: None,
            parse_expression: None,
            resolve_label: None,
            get_proc_address: None,
            assemble: None,
            assemble_mem: None,
            flag_get: None,
            flag_set: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_text_stops_at_nul() {
        assert_eq!(string_from_buf(b"entry\0garbage"), "entry");
        assert_eq!(string_from_buf(b"no terminator"), "no terminator");
        assert_eq!(string_from_buf(b"\0"), "");
    }

    #[test]
    fn null_string_reads_empty() {
        assert_eq!(unsafe { string_from_ptr(std::ptr::null()) }, "");
        assert_eq!(unsafe { string_from_ptr(c"kernel32.dll".as_ptr()) }, "kernel32.dll");
    }

    #[test]
    fn module_element_copies_strings() {
        let module = FfiModule {
            name: c"app.exe".as_ptr(),
            base: 0x400000,
            size: 0x1000,
            entry: 0x401000,
            path: std::ptr::null(),
        };
        let info = unsafe { module.to_core() };
        assert_eq!(info.name, "app.exe");
        assert_eq!(info.path, "");
        assert_eq!(info.entry, 0x401000);
    }

    #[test]
    fn symbol_kind_outside_enum_is_unknown() {
        let mut symbol = FfiSymbol {
            module: c"app.exe".as_ptr(),
            rva: 0x1000,
            name: c"main".as_ptr(),
            manual: false,
            kind: FfiSymbolKind::Import as u32,
        };
        assert_eq!(unsafe { symbol.to_core() }.kind, SymbolKind::Import);

        for raw in [3, 4, 0xff, u32::MAX] {
            symbol.kind = raw;
            assert_eq!(unsafe { symbol.to_core() }.kind, SymbolKind::Unknown, "{raw}");
        }
    }

    #[test]
    fn arch_values_are_checked() {
        assert_eq!(FfiArch::from_raw(0), Some(FfiArch::X86));
        assert_eq!(FfiArch::from_raw(1), Some(FfiArch::X64));
        assert_eq!(FfiArch::from_raw(2), None);
        assert_eq!(FfiArch::from_raw(u32::MAX), None);
        assert_eq!(DbgHostApi::empty(FfiArch::X64).arch, 1);
    }
}
