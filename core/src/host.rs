//! The capability interface into the debugger that embeds the bridge.
//!
//! # Design
//! `DebugHost` is a narrow synchronous trait. Implementations are expected
//! to synchronize internally with the debugger's own state; the bridge calls
//! them from its single server thread, one request at a time.
//!
//! Return values follow one convention: `Err(HostFault)` means something
//! unexpected went wrong and becomes a 500 response, while an ordinary
//! failure (no label at that address, breakpoint could not be placed) is a
//! `false` or `None` inside `Ok`.
//!
//! Listing calls hand back a [`HostList`], which owns the host's buffer for
//! as long as the bridge needs it and releases it exactly once on drop.

use std::fmt;
use std::ops::Deref;

use crate::error::{CapacityError, HostFault};

pub type HostResult<T> = Result<T, HostFault>;

/// Capacity of a label text buffer, terminator included.
pub const MAX_LABEL_SIZE: usize = 256;
/// Capacity of a comment text buffer, terminator included.
pub const MAX_COMMENT_SIZE: usize = 512;
/// Largest number of bytes one assembled instruction can produce.
pub const MAX_INSTRUCTION_BYTES: usize = 16;

/// Target architecture of the debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X64,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86 => "x32",
            Arch::X64 => "x64",
        }
    }
}

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name { $($variant),+ }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical lowercase name.
            pub fn name(self) -> &'static str {
                match self { $($name::$variant => $text),+ }
            }

            fn lookup(name: &str) -> Option<Self> {
                let lower = name.to_ascii_lowercase();
                Self::ALL.iter().copied().find(|v| v.name() == lower)
            }
        }
    };
}

named_enum! {
    /// General purpose and instruction pointer registers.
    pub enum Register {
        Eax => "eax", Ebx => "ebx", Ecx => "ecx", Edx => "edx",
        Esi => "esi", Edi => "edi", Ebp => "ebp", Esp => "esp", Eip => "eip",
        Rax => "rax", Rbx => "rbx", Rcx => "rcx", Rdx => "rdx",
        Rsi => "rsi", Rdi => "rdi", Rbp => "rbp", Rsp => "rsp", Rip => "rip",
        R8 => "r8", R9 => "r9", R10 => "r10", R11 => "r11",
        R12 => "r12", R13 => "r13", R14 => "r14", R15 => "r15",
    }
}

impl Register {
    /// Case-insensitive lookup; 64-bit registers only exist on x64.
    pub fn parse(name: &str, arch: Arch) -> Option<Self> {
        let reg = Self::lookup(name)?;
        (arch == Arch::X64 || !reg.is_64bit()).then_some(reg)
    }

    pub fn is_64bit(self) -> bool {
        !matches!(
            self,
            Register::Eax
                | Register::Ebx
                | Register::Ecx
                | Register::Edx
                | Register::Esi
                | Register::Edi
                | Register::Ebp
                | Register::Esp
                | Register::Eip
        )
    }
}

named_enum! {
    /// EFLAGS bits exposed to clients.
    pub enum Flag {
        Zf => "zf", Of => "of", Cf => "cf", Pf => "pf", Sf => "sf",
        Tf => "tf", Af => "af", Df => "df", If => "if",
    }
}

impl Flag {
    pub fn parse(name: &str) -> Option<Self> {
        Self::lookup(name)
    }

    /// Uppercase name as used in `/flags/get_all`.
    pub fn label(self) -> String {
        self.name().to_ascii_uppercase()
    }
}

/// Owned text with a fixed maximum byte length.
///
/// Hosts keep label and comment text in fixed-size buffers; the capacity
/// counts a terminator, so at most `CAP - 1` bytes of text fit.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct BoundedText<const CAP: usize>(String);

impl<const CAP: usize> BoundedText<CAP> {
    pub const CAPACITY: usize = CAP;

    pub fn new(text: impl Into<String>) -> Result<Self, CapacityError> {
        let text = text.into();
        Self::check(text.as_bytes())?;
        Ok(Self(text))
    }

    /// Whether `bytes` fits, terminator included.
    pub fn check(bytes: &[u8]) -> Result<(), CapacityError> {
        if bytes.len() >= CAP {
            return Err(CapacityError {
                len: bytes.len(),
                capacity: CAP,
            });
        }
        Ok(())
    }

    /// Keep as much of `text` as fits, cutting on a character boundary.
    pub fn truncated(text: &str) -> Self {
        let mut end = text.len().min(CAP.saturating_sub(1));
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Self(text[..end].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl<const CAP: usize> Deref for BoundedText<CAP> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl<const CAP: usize> fmt::Debug for BoundedText<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

pub type LabelText = BoundedText<MAX_LABEL_SIZE>;
pub type CommentText = BoundedText<MAX_COMMENT_SIZE>;

/// A list buffer handed over by the host.
///
/// The bridge owns it only while serializing; dropping it runs the host's
/// release hook exactly once, on every exit path.
pub struct HostList<T> {
    items: Vec<T>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> HostList<T> {
    /// A list with nothing to release.
    pub fn owned(items: Vec<T>) -> Self {
        Self {
            items,
            release: None,
        }
    }

    /// A list whose backing buffer is released by `release` on drop.
    pub fn with_release(items: Vec<T>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            items,
            release: Some(Box::new(release)),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Deref for HostList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> Drop for HostList<T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for HostList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostList")
            .field("items", &self.items)
            .field("pending_release", &self.release.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub entry: u64,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Import,
    Export,
    Unknown,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Import => "import",
            SymbolKind::Export => "export",
            SymbolKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub module: String,
    pub rva: u64,
    pub name: String,
    pub manual: bool,
    pub kind: SymbolKind,
}

/// A label or comment entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationInfo {
    pub module: String,
    pub rva: u64,
    pub text: String,
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub module: String,
    pub rva_start: u64,
    pub rva_end: u64,
    pub manual: bool,
    pub instruction_count: u64,
}

/// Bounds of the function containing an address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionRange {
    pub start: u64,
    pub end: u64,
    pub instruction_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkInfo {
    pub module: String,
    pub rva: u64,
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub text: String,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryWrite {
    pub success: bool,
    pub bytes_written: u64,
}

/// Synchronous access to the debugger's introspection and mutation services.
pub trait DebugHost: Send + Sync {
    // --- status & control ---
    fn arch(&self) -> Arch;
    fn is_debugging(&self) -> HostResult<bool>;
    fn is_running(&self) -> HostResult<bool>;
    /// Run a debugger command line.
    fn exec_command(&self, command: &[u8]) -> HostResult<bool>;

    // --- registers ---
    fn register_get(&self, register: Register) -> HostResult<u64>;
    fn register_set(&self, register: Register, value: u64) -> HostResult<bool>;

    // --- memory ---
    /// Bytes actually read, which may be fewer than `size`; `None` when
    /// nothing at `addr` is readable.
    fn memory_read(&self, addr: u64, size: usize) -> HostResult<Option<Vec<u8>>>;
    fn memory_write(&self, addr: u64, data: &[u8]) -> HostResult<MemoryWrite>;

    // --- patterns ---
    /// First match of a byte pattern (`"48 8B ?? ??"`) inside the range.
    fn pattern_find(&self, start: u64, size: u64, pattern: &str) -> HostResult<Option<u64>>;
    fn pattern_search_replace(
        &self,
        start: u64,
        size: u64,
        search: &str,
        replace: &str,
    ) -> HostResult<bool>;

    // --- execution control ---
    fn run(&self) -> HostResult<bool>;
    fn pause(&self) -> HostResult<bool>;
    fn step_in(&self) -> HostResult<bool>;
    fn step_over(&self) -> HostResult<bool>;
    fn step_out(&self) -> HostResult<bool>;

    // --- breakpoints ---
    fn breakpoint_set(&self, addr: u64) -> HostResult<bool>;
    fn breakpoint_delete(&self, addr: u64) -> HostResult<bool>;

    // --- disassembly & modules ---
    fn disasm_at(&self, addr: u64) -> HostResult<Option<Instruction>>;
    fn modules(&self) -> HostResult<Option<HostList<ModuleInfo>>>;

    // --- symbols, labels, comments ---
    fn symbols(&self) -> HostResult<Option<HostList<SymbolInfo>>>;
    /// Text must be shorter than [`MAX_LABEL_SIZE`] bytes.
    fn label_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool>;
    fn label_get(&self, addr: u64) -> HostResult<Option<LabelText>>;
    fn label_delete(&self, addr: u64) -> HostResult<bool>;
    /// Address of the label with this text.
    fn label_from_string(&self, label: &[u8]) -> HostResult<Option<u64>>;
    fn labels(&self) -> HostResult<Option<HostList<AnnotationInfo>>>;
    /// Text must be shorter than [`MAX_COMMENT_SIZE`] bytes.
    fn comment_set(&self, addr: u64, text: &[u8], manual: bool) -> HostResult<bool>;
    fn comment_get(&self, addr: u64) -> HostResult<Option<CommentText>>;
    fn comment_delete(&self, addr: u64) -> HostResult<bool>;
    /// Address of the comment with exactly this text.
    fn comment_from_string(&self, text: &[u8]) -> HostResult<Option<u64>>;
    fn comments(&self) -> HostResult<Option<HostList<AnnotationInfo>>>;

    // --- stack ---
    /// Returns the value previously on top of the stack.
    fn stack_push(&self, value: u64) -> HostResult<u64>;
    fn stack_pop(&self) -> HostResult<u64>;
    fn stack_peek(&self, offset: i32) -> HostResult<u64>;

    // --- functions & bookmarks ---
    fn function_add(
        &self,
        start: u64,
        end: u64,
        manual: bool,
        instruction_count: u64,
    ) -> HostResult<bool>;
    fn function_get(&self, addr: u64) -> HostResult<Option<FunctionRange>>;
    fn function_delete(&self, addr: u64) -> HostResult<bool>;
    fn functions(&self) -> HostResult<Option<HostList<FunctionInfo>>>;
    fn bookmark_set(&self, addr: u64, manual: bool) -> HostResult<bool>;
    fn bookmark_get(&self, addr: u64) -> HostResult<bool>;
    fn bookmark_delete(&self, addr: u64) -> HostResult<bool>;
    fn bookmarks(&self) -> HostResult<Option<HostList<BookmarkInfo>>>;

    // --- expression & symbol resolution ---
    fn parse_expression(&self, expression: &[u8]) -> HostResult<Option<u64>>;
    fn resolve_label(&self, label: &[u8]) -> HostResult<Option<u64>>;
    /// Address of an export in the debuggee.
    fn get_proc_address(&self, module: &[u8], api: &[u8]) -> HostResult<Option<u64>>;

    // --- assembler ---
    /// Encoded bytes (at most [`MAX_INSTRUCTION_BYTES`]) without writing them.
    fn assemble(&self, addr: u64, instruction: &[u8]) -> HostResult<Option<Vec<u8>>>;
    fn assemble_mem(&self, addr: u64, instruction: &[u8]) -> HostResult<bool>;

    // --- CPU flags ---
    fn flag_get(&self, flag: Flag) -> HostResult<bool>;
    fn flag_set(&self, flag: Flag, value: bool) -> HostResult<bool>;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn register_names_are_case_insensitive() {
        assert_eq!(Register::parse("EAX", Arch::X86), Some(Register::Eax));
        assert_eq!(Register::parse("Rip", Arch::X64), Some(Register::Rip));
        assert_eq!(Register::parse("r15", Arch::X64), Some(Register::R15));
        assert_eq!(Register::parse("xmm0", Arch::X64), None);
    }

    #[test]
    fn wide_registers_need_x64() {
        assert_eq!(Register::parse("rax", Arch::X86), None);
        assert_eq!(Register::parse("r8", Arch::X86), None);
        assert_eq!(Register::parse("esp", Arch::X64), Some(Register::Esp));
    }

    #[test]
    fn flags_parse_and_label() {
        assert_eq!(Flag::ALL.len(), 9);
        assert_eq!(Flag::parse("ZF"), Some(Flag::Zf));
        assert_eq!(Flag::parse("if"), Some(Flag::If));
        assert_eq!(Flag::parse("xf"), None);
        assert_eq!(Flag::Df.label(), "DF");
    }

    #[test]
    fn bounded_text_enforces_capacity() {
        assert!(BoundedText::<4>::new("abc").is_ok());
        let err = BoundedText::<4>::new("abcd").unwrap_err();
        assert_eq!(err, CapacityError { len: 4, capacity: 4 });
        assert_eq!(LabelText::CAPACITY, 256);
        assert!(BoundedText::<4>::check(b"\xff\xfe\xfd").is_ok());
        assert!(BoundedText::<4>::check(b"\xff\xfe\xfd\xfc").is_err());
    }

    #[test]
    fn bounded_text_truncates_on_char_boundary() {
        assert_eq!(BoundedText::<4>::truncated("abcdef").as_str(), "abc");
        // 'é' is two bytes; cutting at 3 would split the second one
        assert_eq!(BoundedText::<4>::truncated("éé").as_str(), "é");
        assert_eq!(BoundedText::<1>::truncated("x").as_str(), "");
    }

    #[test]
    fn host_list_releases_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let list = HostList::with_release(vec![1, 2, 3], move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(list.len(), 3);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(list);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn host_list_releases_during_unwind() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let result = std::panic::catch_unwind(move || {
            let list = HostList::with_release(vec!["a"], move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            if list.len() == 1 {
                panic!("serializer blew up");
            }
        });
        assert!(result.is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
