//! System call numbers (must match kernel/src/syscall.rs).

pub const SYS_GET_TIME: u64 = 0;
pub const PROC_EXEC: u64 = 1;
pub const PROC_EXIT: u64 = 2;
pub const PROC_GET_NAME: u64 = 3;
pub const PROC_GET_PID: u64 = 4;
pub const PROC_SLEEP: u64 = 5;
pub const PROC_YIELD: u64 = 6;
pub const MUTEX_ALLOC: u64 = 7;
pub const MUTEX_FREE: u64 = 8;
pub const MUTEX_LOCK: u64 = 9;
pub const MUTEX_UNLOCK: u64 = 10;
pub const MSG_SEND: u64 = 11;
pub const MSG_RECV: u64 = 12;
