//! Bytecode interpreter and contract registry
//!
//! One call is one unit of atomicity: storage and memory are snapshotted at
//! entry, committed on a successful halt, and restored on revert or any
//! fatal failure. Nested calls recurse directly into the interpreter, bounded
//! by an explicit depth counter; a child's failure resolves as a status push
//! in its parent rather than terminating the run.

use crate::context::Context;
use crate::error::{ExecutionResult, HaltReason, VmError, VmResult};
use crate::log::{EventLog, LogRecord};
use crate::opcode::Opcode;
use crate::stack::Stack;
use crate::storage::Storage;
use fugue_crypto::keccak256;
use fugue_primitives::U256;
use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;
use tracing::{debug, trace};

/// Maximum call nesting depth
pub const MAX_CALL_DEPTH: usize = 1024;

/// One registered contract: immutable code and its own persistent storage.
///
/// An address in this model is the registry index, not a cryptographic
/// identity.
#[derive(Clone, Debug)]
pub struct Contract {
    code: Rc<Vec<u8>>,
    storage: Rc<RefCell<Storage>>,
}

impl Contract {
    fn new(code: Vec<u8>) -> Self {
        Self {
            code: Rc::new(code),
            storage: Rc::new(RefCell::new(Storage::new())),
        }
    }

    /// The contract's code bytes
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Read access to the contract's committed storage
    pub fn storage(&self) -> Ref<'_, Storage> {
        self.storage.borrow()
    }
}

/// How the run loop left the Running state
enum Halted {
    Success,
    Revert,
}

/// What a resolved call hands back to its caller
struct CallOutcome {
    status: HaltReason,
    output: Vec<u8>,
}

/// The virtual machine: an append-only, index-addressed contract registry
/// and the dispatch loop that executes against it
#[derive(Debug, Default)]
pub struct Vm {
    contracts: Vec<Contract>,
}

impl Vm {
    /// Create a VM with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract with its own empty storage; returns its address
    pub fn deploy(&mut self, code: Vec<u8>) -> usize {
        let address = self.contracts.len();
        debug!("deploying contract {} ({} code bytes)", address, code.len());
        self.contracts.push(Contract::new(code));
        address
    }

    /// Look up a registered contract
    pub fn contract(&self, address: usize) -> Option<&Contract> {
        self.contracts.get(address)
    }

    /// Run a top-level call against a registered contract.
    ///
    /// The result carries the halt status, the return bytes, and the ordered
    /// log records; the final committed or rolled-back storage stays
    /// observable through [`Vm::contract`].
    pub fn execute(&mut self, address: usize, calldata: Vec<u8>) -> VmResult<ExecutionResult> {
        let contract = self
            .contracts
            .get(address)
            .ok_or(VmError::UnknownContract(address))?
            .clone();
        let mut logs = EventLog::new();
        let mut ctx = Context::new(
            contract.code,
            address,
            address,
            calldata,
            contract.storage,
            0,
        );
        let outcome = self.call(&mut ctx, &mut logs);
        Ok(ExecutionResult {
            status: outcome.status,
            output: outcome.output,
            logs: logs.into_records(),
        })
    }

    /// Execute one call frame with all-or-nothing visibility of its state
    /// mutations
    fn call(&mut self, ctx: &mut Context, logs: &mut EventLog) -> CallOutcome {
        if ctx.depth > MAX_CALL_DEPTH {
            return CallOutcome {
                status: HaltReason::Fatal(VmError::CallDepthExceeded),
                output: Vec::new(),
            };
        }

        debug!(
            "call start: address={} sender={} depth={}",
            ctx.address, ctx.sender, ctx.depth
        );

        // Snapshot storage and memory for reverting state
        let storage_snapshot = ctx.storage.borrow().snapshot();
        let memory_snapshot = ctx.memory.snapshot();

        let status = match self.run(ctx, logs) {
            Ok(Halted::Success) => HaltReason::Success,
            Ok(Halted::Revert) => {
                ctx.storage.borrow_mut().restore(storage_snapshot);
                ctx.memory.restore(memory_snapshot);
                HaltReason::Revert
            }
            Err(error) => {
                debug!("call failed at depth {}: {}", ctx.depth, error);
                ctx.storage.borrow_mut().restore(storage_snapshot);
                ctx.memory.restore(memory_snapshot);
                HaltReason::Fatal(error)
            }
        };

        debug!("call end: address={} status={:?}", ctx.address, status);

        CallOutcome {
            status,
            output: std::mem::take(&mut ctx.return_data),
        }
    }

    /// The fetch-decode-execute loop for one frame
    fn run(&mut self, ctx: &mut Context, logs: &mut EventLog) -> VmResult<Halted> {
        loop {
            let Some(byte) = ctx.cursor.next_byte() else {
                // Running off the end of the code is an implicit stop
                return Ok(Halted::Success);
            };
            let opcode = Opcode::from_byte(byte).ok_or(VmError::UnsupportedOpcode(byte))?;
            trace!("pc {} opcode {:?}", ctx.cursor.position() - 1, opcode);

            match opcode {
                Opcode::STOP => return Ok(Halted::Success),

                // Arithmetic
                Opcode::ADD => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    ctx.stack.push(a.wrapping_add(b))?;
                }
                Opcode::MUL => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    ctx.stack.push(a.wrapping_mul(b))?;
                }
                Opcode::SUB => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    ctx.stack.push(a.wrapping_sub(b))?;
                }
                Opcode::DIV => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    // The primitive faults on a zero divisor; the opcode
                    // substitutes zero instead
                    let result = if b.is_zero() { U256::ZERO } else { a.div_rem(b)?.0 };
                    ctx.stack.push(result)?;
                }
                Opcode::SDIV => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    let result = if b.is_zero() { U256::ZERO } else { a.signed_div(b)? };
                    ctx.stack.push(result)?;
                }
                Opcode::MOD => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    let result = if b.is_zero() { U256::ZERO } else { a.div_rem(b)?.1 };
                    ctx.stack.push(result)?;
                }
                Opcode::SMOD => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    let result = if b.is_zero() { U256::ZERO } else { a.signed_rem(b)? };
                    ctx.stack.push(result)?;
                }
                Opcode::ADDMOD => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    let modulus = ctx.stack.pop()?;
                    let result = if modulus.is_zero() {
                        U256::ZERO
                    } else {
                        a.wrapping_add(b).div_rem(modulus)?.1
                    };
                    ctx.stack.push(result)?;
                }
                Opcode::MULMOD => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    let modulus = ctx.stack.pop()?;
                    let result = if modulus.is_zero() {
                        U256::ZERO
                    } else {
                        a.wrapping_mul(b).div_rem(modulus)?.1
                    };
                    ctx.stack.push(result)?;
                }
                Opcode::EXP => {
                    let base = ctx.stack.pop()?;
                    let exponent = ctx.stack.pop()?;
                    ctx.stack.push(base.pow(exponent))?;
                }
                Opcode::SIGNEXTEND => {
                    let byte_index = ctx.stack.pop()?;
                    let value = ctx.stack.pop()?;
                    ctx.stack.push(value.sign_extend(byte_index))?;
                }

                // Comparison
                Opcode::LT => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    push_bool(&mut ctx.stack, a < b)?;
                }
                Opcode::GT => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    push_bool(&mut ctx.stack, a > b)?;
                }
                Opcode::SLT => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    push_bool(&mut ctx.stack, a.signed_cmp(&b) == Ordering::Less)?;
                }
                Opcode::SGT => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    push_bool(&mut ctx.stack, a.signed_cmp(&b) == Ordering::Greater)?;
                }
                Opcode::EQ => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    push_bool(&mut ctx.stack, a == b)?;
                }
                Opcode::ISZERO => {
                    let a = ctx.stack.pop()?;
                    push_bool(&mut ctx.stack, a.is_zero())?;
                }

                // Bitwise
                Opcode::AND => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    ctx.stack.push(a & b)?;
                }
                Opcode::OR => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    ctx.stack.push(a | b)?;
                }
                Opcode::XOR => {
                    let a = ctx.stack.pop()?;
                    let b = ctx.stack.pop()?;
                    ctx.stack.push(a ^ b)?;
                }
                Opcode::NOT => {
                    let a = ctx.stack.pop()?;
                    ctx.stack.push(!a)?;
                }
                Opcode::BYTE => {
                    let index = ctx.stack.pop()?;
                    let value = ctx.stack.pop()?;
                    let result = match index.to_usize() {
                        Some(i) => U256::from_u64(value.byte(i) as u64),
                        None => U256::ZERO,
                    };
                    ctx.stack.push(result)?;
                }
                Opcode::SHL => {
                    let shift = ctx.stack.pop()?;
                    let value = ctx.stack.pop()?;
                    ctx.stack.push(value.shl(shift_count(shift)))?;
                }
                Opcode::SHR => {
                    let shift = ctx.stack.pop()?;
                    let value = ctx.stack.pop()?;
                    ctx.stack.push(value.shr(shift_count(shift)))?;
                }
                Opcode::SAR => {
                    let shift = ctx.stack.pop()?;
                    let value = ctx.stack.pop()?;
                    ctx.stack.push(value.sar(shift_count(shift)))?;
                }

                // Hashing
                Opcode::SHA3 => {
                    let offset = pop_usize(&mut ctx.stack)?;
                    let size = pop_usize(&mut ctx.stack)?;
                    let digest = keccak256(ctx.memory.read(offset, size));
                    ctx.stack.push(digest)?;
                }

                // Environment
                Opcode::ADDRESS => {
                    ctx.stack.push(U256::from_u64(ctx.address as u64))?;
                }
                Opcode::CALLER => {
                    ctx.stack.push(U256::from_u64(ctx.sender as u64))?;
                }
                Opcode::CALLDATALOAD => {
                    let offset = ctx.stack.pop()?.to_usize().unwrap_or(usize::MAX);
                    let bytes = copy_padded(&ctx.calldata, offset, 32);
                    let mut word = [0u8; 32];
                    word.copy_from_slice(&bytes);
                    ctx.stack.push(U256::from_be_bytes(word))?;
                }
                Opcode::CALLDATASIZE => {
                    ctx.stack.push(U256::from_u64(ctx.calldata.len() as u64))?;
                }
                Opcode::CALLDATACOPY => {
                    let dest = pop_usize(&mut ctx.stack)?;
                    let offset = ctx.stack.pop()?.to_usize().unwrap_or(usize::MAX);
                    let size = pop_usize(&mut ctx.stack)?;
                    let data = copy_padded(&ctx.calldata, offset, size);
                    ctx.memory.write(dest, &data);
                }
                Opcode::CODESIZE => {
                    ctx.stack
                        .push(U256::from_u64(ctx.cursor.code().len() as u64))?;
                }
                Opcode::CODECOPY => {
                    let dest = pop_usize(&mut ctx.stack)?;
                    let offset = ctx.stack.pop()?.to_usize().unwrap_or(usize::MAX);
                    let size = pop_usize(&mut ctx.stack)?;
                    let data = copy_padded(ctx.cursor.code(), offset, size);
                    ctx.memory.write(dest, &data);
                }
                Opcode::EXTCODESIZE => {
                    let address = pop_usize(&mut ctx.stack)?;
                    let contract = self
                        .contracts
                        .get(address)
                        .ok_or(VmError::UnknownContract(address))?;
                    ctx.stack
                        .push(U256::from_u64(contract.code.len() as u64))?;
                }
                Opcode::EXTCODECOPY => {
                    let address = pop_usize(&mut ctx.stack)?;
                    let dest = pop_usize(&mut ctx.stack)?;
                    let offset = ctx.stack.pop()?.to_usize().unwrap_or(usize::MAX);
                    let size = pop_usize(&mut ctx.stack)?;
                    let contract = self
                        .contracts
                        .get(address)
                        .ok_or(VmError::UnknownContract(address))?;
                    let data = copy_padded(&contract.code, offset, size);
                    ctx.memory.write(dest, &data);
                }

                // Stack, memory, flow
                Opcode::POP => {
                    ctx.stack.pop()?;
                }
                Opcode::MLOAD => {
                    let offset = pop_usize(&mut ctx.stack)?;
                    let value = ctx.memory.load_word(offset);
                    ctx.stack.push(value)?;
                }
                Opcode::MSTORE => {
                    let offset = pop_usize(&mut ctx.stack)?;
                    let value = ctx.stack.pop()?;
                    ctx.memory.store_word(offset, value);
                }
                Opcode::MSTORE8 => {
                    let offset = pop_usize(&mut ctx.stack)?;
                    let value = ctx.stack.pop()?;
                    ctx.memory.write_byte(offset, value.byte(31));
                }
                Opcode::SLOAD => {
                    let key = ctx.stack.pop()?;
                    let value = ctx.storage.borrow().get(&key);
                    ctx.stack.push(value)?;
                }
                Opcode::SSTORE => {
                    let key = ctx.stack.pop()?;
                    let value = ctx.stack.pop()?;
                    ctx.storage.borrow_mut().store(key, value);
                }
                Opcode::JUMP => {
                    let dest = ctx
                        .stack
                        .pop()?
                        .to_usize()
                        .ok_or(VmError::InvalidJump(usize::MAX))?;
                    jump_to(ctx, dest)?;
                }
                Opcode::JUMPI => {
                    let dest = ctx
                        .stack
                        .pop()?
                        .to_usize()
                        .ok_or(VmError::InvalidJump(usize::MAX))?;
                    let condition = ctx.stack.pop()?;
                    if !condition.is_zero() {
                        jump_to(ctx, dest)?;
                    }
                }
                Opcode::PC => {
                    // Position of the PC opcode itself
                    ctx.stack
                        .push(U256::from_u64((ctx.cursor.position() - 1) as u64))?;
                }
                Opcode::MSIZE => {
                    ctx.stack
                        .push(U256::from_u64(ctx.memory.capacity() as u64))?;
                }
                Opcode::JUMPDEST => {
                    // Jump-landing marker only
                }

                // Push
                Opcode::PUSH1
                | Opcode::PUSH2
                | Opcode::PUSH3
                | Opcode::PUSH4
                | Opcode::PUSH5
                | Opcode::PUSH6
                | Opcode::PUSH7
                | Opcode::PUSH8
                | Opcode::PUSH9
                | Opcode::PUSH10
                | Opcode::PUSH11
                | Opcode::PUSH12
                | Opcode::PUSH13
                | Opcode::PUSH14
                | Opcode::PUSH15
                | Opcode::PUSH16
                | Opcode::PUSH17
                | Opcode::PUSH18
                | Opcode::PUSH19
                | Opcode::PUSH20
                | Opcode::PUSH21
                | Opcode::PUSH22
                | Opcode::PUSH23
                | Opcode::PUSH24
                | Opcode::PUSH25
                | Opcode::PUSH26
                | Opcode::PUSH27
                | Opcode::PUSH28
                | Opcode::PUSH29
                | Opcode::PUSH30
                | Opcode::PUSH31
                | Opcode::PUSH32 => {
                    let count = opcode.push_size();
                    let bytes = ctx.cursor.take(count);
                    // Zero-extend; immediates truncated by the end of the
                    // code read as zero
                    let mut word = [0u8; 32];
                    word[32 - count..32 - count + bytes.len()].copy_from_slice(bytes);
                    ctx.stack.push(U256::from_be_bytes(word))?;
                }

                // Dup
                Opcode::DUP1
                | Opcode::DUP2
                | Opcode::DUP3
                | Opcode::DUP4
                | Opcode::DUP5
                | Opcode::DUP6
                | Opcode::DUP7
                | Opcode::DUP8
                | Opcode::DUP9
                | Opcode::DUP10
                | Opcode::DUP11
                | Opcode::DUP12
                | Opcode::DUP13
                | Opcode::DUP14
                | Opcode::DUP15
                | Opcode::DUP16 => {
                    ctx.stack.dup(opcode.dup_depth())?;
                }

                // Swap
                Opcode::SWAP1
                | Opcode::SWAP2
                | Opcode::SWAP3
                | Opcode::SWAP4
                | Opcode::SWAP5
                | Opcode::SWAP6
                | Opcode::SWAP7
                | Opcode::SWAP8
                | Opcode::SWAP9
                | Opcode::SWAP10
                | Opcode::SWAP11
                | Opcode::SWAP12
                | Opcode::SWAP13
                | Opcode::SWAP14
                | Opcode::SWAP15
                | Opcode::SWAP16 => {
                    ctx.stack.swap(opcode.swap_depth())?;
                }

                // Logging
                Opcode::LOG0 | Opcode::LOG1 | Opcode::LOG2 | Opcode::LOG3 | Opcode::LOG4 => {
                    let offset = pop_usize(&mut ctx.stack)?;
                    let size = pop_usize(&mut ctx.stack)?;
                    let mut topics = Vec::with_capacity(opcode.log_topics());
                    for _ in 0..opcode.log_topics() {
                        topics.push(ctx.stack.pop()?);
                    }
                    let data = ctx.memory.read(offset, size).to_vec();
                    trace!("log: {} topics, {} data bytes", topics.len(), data.len());
                    logs.append(LogRecord { topics, data });
                }

                // Contract creation
                Opcode::CREATE | Opcode::CREATE2 => {
                    let _value = ctx.stack.pop()?;
                    let offset = pop_usize(&mut ctx.stack)?;
                    let size = pop_usize(&mut ctx.stack)?;
                    if opcode == Opcode::CREATE2 {
                        let _salt = ctx.stack.pop()?;
                    }
                    let code = ctx.memory.read(offset, size).to_vec();
                    let address = self.deploy(code);
                    ctx.stack.push(U256::from_u64(address as u64))?;
                }

                // Nested calls
                Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL | Opcode::STATICCALL => {
                    let _gas = ctx.stack.pop()?;
                    let address = pop_usize(&mut ctx.stack)?;
                    // Only CALL and CALLCODE carry a value operand
                    if matches!(opcode, Opcode::CALL | Opcode::CALLCODE) {
                        let _value = ctx.stack.pop()?;
                    }
                    let args_offset = pop_usize(&mut ctx.stack)?;
                    let args_size = pop_usize(&mut ctx.stack)?;
                    let return_offset = pop_usize(&mut ctx.stack)?;
                    let return_size = pop_usize(&mut ctx.stack)?;

                    let contract = self
                        .contracts
                        .get(address)
                        .ok_or(VmError::UnknownContract(address))?
                        .clone();
                    let calldata = ctx.memory.read(args_offset, args_size).to_vec();

                    // CALL isolates the callee's own storage and names this
                    // frame as the sender; the delegating variants carry this
                    // frame's storage and sender forward
                    let mut child = if opcode == Opcode::CALL {
                        Context::new(
                            contract.code,
                            address,
                            ctx.address,
                            calldata,
                            contract.storage,
                            ctx.depth + 1,
                        )
                    } else {
                        Context::new(
                            contract.code,
                            address,
                            ctx.sender,
                            calldata,
                            Rc::clone(&ctx.storage),
                            ctx.depth + 1,
                        )
                    };

                    let outcome = self.call(&mut child, logs);
                    push_bool(&mut ctx.stack, outcome.status.is_success())?;
                    let copy_len = outcome.output.len().min(return_size);
                    ctx.memory.write(return_offset, &outcome.output[..copy_len]);
                }

                // Termination
                Opcode::RETURN => {
                    let offset = pop_usize(&mut ctx.stack)?;
                    let size = pop_usize(&mut ctx.stack)?;
                    ctx.return_data = ctx.memory.read(offset, size).to_vec();
                    return Ok(Halted::Success);
                }
                Opcode::REVERT => {
                    return Ok(Halted::Revert);
                }

                // Stubs outside this design: gas, balances, block data,
                // return-data introspection, self-destruction
                Opcode::BALANCE
                | Opcode::ORIGIN
                | Opcode::CALLVALUE
                | Opcode::GASPRICE
                | Opcode::RETURNDATASIZE
                | Opcode::RETURNDATACOPY
                | Opcode::EXTCODEHASH
                | Opcode::BLOCKHASH
                | Opcode::COINBASE
                | Opcode::TIMESTAMP
                | Opcode::NUMBER
                | Opcode::DIFFICULTY
                | Opcode::GASLIMIT
                | Opcode::CHAINID
                | Opcode::SELFBALANCE
                | Opcode::BASEFEE
                | Opcode::GAS
                | Opcode::INVALID
                | Opcode::SELFDESTRUCT => {
                    return Err(VmError::UnsupportedOpcode(opcode as u8));
                }
            }
        }
    }
}

/// Pop a word that must fit the host address space
fn pop_usize(stack: &mut Stack) -> VmResult<usize> {
    stack.pop()?.to_usize().ok_or(VmError::InvalidMemoryAccess)
}

/// Push one for true, zero for false
fn push_bool(stack: &mut Stack, value: bool) -> VmResult<()> {
    stack.push(if value { U256::ONE } else { U256::ZERO })
}

/// Clamp a shift-count word into the 0..=256 range the word type defines
fn shift_count(word: U256) -> u32 {
    word.to_usize().map_or(256, |count| count.min(256) as u32)
}

/// Copy `size` bytes of `source` from `offset`; bytes past the end of the
/// source read as zero
fn copy_padded(source: &[u8], offset: usize, size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    for (i, byte) in data.iter_mut().enumerate() {
        if let Some(value) = offset.checked_add(i).and_then(|index| source.get(index)) {
            *byte = *value;
        }
    }
    data
}

/// Validate that `dest` holds the jump-landing marker, then move there
fn jump_to(ctx: &mut Context, dest: usize) -> VmResult<()> {
    if ctx.cursor.code().get(dest) == Some(&(Opcode::JUMPDEST as u8)) {
        ctx.cursor.jump(dest);
        Ok(())
    } else {
        Err(VmError::InvalidJump(dest))
    }
}
