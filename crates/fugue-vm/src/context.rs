//! Call frame state

use crate::memory::Memory;
use crate::stack::Stack;
use crate::storage::Storage;
use std::cell::RefCell;
use std::rc::Rc;

/// Bounds-checked cursor over immutable code bytes.
///
/// Replaces raw pointer arithmetic: reads past the end come back empty or
/// `None` instead of walking off the buffer.
#[derive(Clone, Debug)]
pub struct CodeCursor {
    code: Rc<Vec<u8>>,
    position: usize,
}

impl CodeCursor {
    /// Create a cursor at position zero
    pub fn new(code: Rc<Vec<u8>>) -> Self {
        Self { code, position: 0 }
    }

    /// Read the next byte and advance; `None` at the end of the code
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.code.get(self.position).copied();
        if byte.is_some() {
            self.position += 1;
        }
        byte
    }

    /// Read up to `count` bytes and advance past them; truncated at the end
    /// of the code
    pub fn take(&mut self, count: usize) -> &[u8] {
        let start = self.position.min(self.code.len());
        let end = self.position.saturating_add(count).min(self.code.len());
        self.position = end;
        &self.code[start..end]
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to an absolute position
    pub fn jump(&mut self, target: usize) {
        self.position = target;
    }

    /// The underlying code bytes
    pub fn code(&self) -> &[u8] {
        &self.code
    }
}

/// The state of one in-progress invocation
#[derive(Debug)]
pub struct Context {
    /// Registry index of the executing contract
    pub address: usize,
    /// Registry index of the caller; delegating calls inherit it
    pub sender: usize,
    /// Program cursor over the immutable code
    pub cursor: CodeCursor,
    /// Operand stack
    pub stack: Stack,
    /// Scratch memory owned by this frame
    pub memory: Memory,
    /// Persistent storage; shared by reference for the delegating call
    /// variants, so two frames may hold it but only one executes at a time
    pub storage: Rc<RefCell<Storage>>,
    /// Read-only call input
    pub calldata: Vec<u8>,
    /// Write-once output, captured by RETURN
    pub return_data: Vec<u8>,
    /// Nesting depth of this frame, zero at the top level
    pub depth: usize,
}

impl Context {
    /// Create a call frame
    pub fn new(
        code: Rc<Vec<u8>>,
        address: usize,
        sender: usize,
        calldata: Vec<u8>,
        storage: Rc<RefCell<Storage>>,
        depth: usize,
    ) -> Self {
        Self {
            address,
            sender,
            cursor: CodeCursor::new(code),
            stack: Stack::new(),
            memory: Memory::new(),
            storage,
            calldata,
            return_data: Vec::new(),
            depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walks_code() {
        let mut cursor = CodeCursor::new(Rc::new(vec![1, 2, 3]));
        assert_eq!(cursor.next_byte(), Some(1));
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.next_byte(), Some(2));
        assert_eq!(cursor.next_byte(), Some(3));
        assert_eq!(cursor.next_byte(), None);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_cursor_take_truncates_at_end() {
        let mut cursor = CodeCursor::new(Rc::new(vec![0x60, 0xAA, 0xBB]));
        cursor.next_byte();
        assert_eq!(cursor.take(5), &[0xAA, 0xBB]);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.take(1), &[] as &[u8]);
    }

    #[test]
    fn test_cursor_jump() {
        let mut cursor = CodeCursor::new(Rc::new(vec![0, 1, 2, 3]));
        cursor.jump(2);
        assert_eq!(cursor.next_byte(), Some(2));
    }

    #[test]
    fn test_context_starts_fresh() {
        let storage = Rc::new(RefCell::new(Storage::new()));
        let ctx = Context::new(Rc::new(vec![0x00]), 0, 0, vec![1, 2], storage, 0);
        assert!(ctx.stack.is_empty());
        assert!(ctx.return_data.is_empty());
        assert_eq!(ctx.calldata, vec![1, 2]);
        assert_eq!(ctx.cursor.position(), 0);
        assert_eq!(ctx.depth, 0);
    }

    #[test]
    fn test_shared_storage_reference() {
        let storage = Rc::new(RefCell::new(Storage::new()));
        let ctx = Context::new(Rc::new(vec![]), 0, 0, vec![], Rc::clone(&storage), 0);
        ctx.storage
            .borrow_mut()
            .store(fugue_primitives::U256::ONE, fugue_primitives::U256::MAX);
        assert_eq!(
            storage.borrow().get(&fugue_primitives::U256::ONE),
            fugue_primitives::U256::MAX
        );
    }
}
