//! Typed system call wrappers.

use core::ffi::CStr;
use core::fmt;

use crate::gate::Gate;
use crate::message::Message;
use crate::nr;

/// Code a process starts at.
pub type Entry = extern "C" fn() -> !;

/// Buffer size [`Sys::name`] needs: the longest name plus its NUL.
pub const NAME_BUF: usize = 33;

/// The kernel rejected a call (it returned a negative value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysError;

impl fmt::Display for SysError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("system call failed")
	}
}

pub type SysResult<T> = Result<T, SysError>;

fn check(rc: i64) -> SysResult<u64> {
	u64::try_from(rc).map_err(|_| SysError)
}

/// System calls issued through gate `G`.
pub struct Sys<G> {
	gate: G,
}

impl<G: Gate> Sys<G> {
	pub const fn new(gate: G) -> Self {
		Self { gate }
	}

	pub fn gate(&self) -> &G {
		&self.gate
	}

	pub fn gate_mut(&mut self) -> &mut G {
		&mut self.gate
	}

	fn call(&mut self, nr: u64, args: [u64; 3]) -> i64 {
		// SAFETY: every pointer passed below is taken from a reference that
		// outlives the call and covers what the kernel touches.
		unsafe { self.gate.call(nr, args) }
	}

	/// Whole seconds since boot.
	pub fn time(&mut self) -> u64 {
		check(self.call(nr::SYS_GET_TIME, [0; 3])).unwrap_or(0)
	}

	/// Start `entry` as a new process called `name`; returns its pid.
	pub fn exec(&mut self, name: &CStr, entry: Entry) -> SysResult<u32> {
		let args = [name.as_ptr() as u64, entry as usize as u64, 0];
		check(self.call(nr::PROC_EXEC, args)).map(|pid| pid as u32)
	}

	/// End the calling process.
	pub fn exit(&mut self) -> ! {
		self.call(nr::PROC_EXIT, [0; 3]);
		// Should never reach here
		loop {
			core::hint::spin_loop();
		}
	}

	pub fn pid(&mut self) -> u32 {
		check(self.call(nr::PROC_GET_PID, [0; 3])).map_or(0, |pid| pid as u32)
	}

	/// The caller's name, read into `buf`.
	pub fn name<'b>(&mut self, buf: &'b mut [u8; NAME_BUF]) -> SysResult<&'b str> {
		check(self.call(nr::PROC_GET_NAME, [buf.as_mut_ptr() as u64, 0, 0]))?;
		let len = buf.iter().position(|&b| b == 0).unwrap_or(NAME_BUF);
		core::str::from_utf8(&buf[..len]).map_err(|_| SysError)
	}

	pub fn sleep(&mut self, secs: u64) {
		self.call(nr::PROC_SLEEP, [secs, 0, 0]);
	}

	pub fn yield_now(&mut self) {
		self.call(nr::PROC_YIELD, [0; 3]);
	}

	pub fn mutex_alloc(&mut self) -> SysResult<u64> {
		check(self.call(nr::MUTEX_ALLOC, [0; 3]))
	}

	pub fn mutex_free(&mut self, id: u64) -> SysResult<()> {
		check(self.call(nr::MUTEX_FREE, [id, 0, 0])).map(drop)
	}

	/// Acquire mutex `id`, blocking while another process holds it.
	pub fn mutex_lock(&mut self, id: u64) -> SysResult<()> {
		check(self.call(nr::MUTEX_LOCK, [id, 0, 0])).map(drop)
	}

	pub fn mutex_unlock(&mut self, id: u64) -> SysResult<()> {
		check(self.call(nr::MUTEX_UNLOCK, [id, 0, 0])).map(drop)
	}

	/// Post `msg` to mailbox `mbox`. On success `msg` carries the
	/// kernel's sender and send-time stamps.
	pub fn send(&mut self, mbox: u64, msg: &mut Message) -> SysResult<()> {
		let ptr = msg as *mut Message as u64;
		check(self.call(nr::MSG_SEND, [mbox, ptr, 0])).map(drop)
	}

	/// Take the oldest message from `mbox` into `msg`, blocking while the
	/// mailbox is empty.
	pub fn recv(&mut self, mbox: u64, msg: &mut Message) -> SysResult<()> {
		let ptr = msg as *mut Message as u64;
		check(self.call(nr::MSG_RECV, [mbox, ptr, 0])).map(drop)
	}
}
