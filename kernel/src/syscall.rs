//! System call dispatch.
//!
//! A process traps with the call number in `rax` and up to three
//! arguments in `rbx`, `rcx` and `rdx`; the result comes back in `rax`.
//! Pointers in the arguments are user addresses and every access goes
//! through the platform's copy routines. Recoverable failures return -1.

use khal::Platform;

use crate::config::PROC_NAME_LEN;
use crate::error::{KernelError, KernelResult};
use crate::ipc::{Handoff, MSG_WIRE_SIZE, Message, Received};
use crate::kernel::Kernel;
use crate::task::{Pid, ProcessState};

// ── Syscall numbers ─────────────────────────────────────────────
pub mod nr {
	/// `sys_get_time()`: whole seconds since boot.
	pub const SYS_GET_TIME: u64 = 0;
	/// `proc_exec(name_ptr: *const u8, entry: u64)`: start a process, returns its pid.
	pub const PROC_EXEC: u64 = 1;
	/// `proc_exit()`: destroy the calling process.
	pub const PROC_EXIT: u64 = 2;
	/// `proc_get_name(buf_ptr: *mut u8)`: copy the caller's name, NUL-terminated.
	pub const PROC_GET_NAME: u64 = 3;
	/// `proc_get_pid()`: the caller's pid.
	pub const PROC_GET_PID: u64 = 4;
	/// `proc_sleep(secs: u64)`: sleep for at least `secs` seconds.
	pub const PROC_SLEEP: u64 = 5;
	/// `proc_yield()`: give up the rest of the time slice.
	pub const PROC_YIELD: u64 = 6;
	/// `mutex_alloc()`: allocate a mutex, returns its id.
	pub const MUTEX_ALLOC: u64 = 7;
	/// `mutex_free(id)`: release an unlocked mutex.
	pub const MUTEX_FREE: u64 = 8;
	/// `mutex_lock(id)`: acquire, blocking while another process holds it.
	pub const MUTEX_LOCK: u64 = 9;
	/// `mutex_unlock(id)`: release, handing ownership to the oldest waiter.
	pub const MUTEX_UNLOCK: u64 = 10;
	/// `msg_send(mbox, msg_ptr: *mut Message)`: post a message; the caller's copy is stamped.
	pub const MSG_SEND: u64 = 11;
	/// `msg_recv(mbox, msg_ptr: *mut Message)`: take a message, blocking while the mailbox is empty.
	pub const MSG_RECV: u64 = 12;

	/// Human-readable name for call number `nr`.
	pub fn name(nr: u64) -> &'static str {
		match nr {
			SYS_GET_TIME => "sys_get_time",
			PROC_EXEC => "proc_exec",
			PROC_EXIT => "proc_exit",
			PROC_GET_NAME => "proc_get_name",
			PROC_GET_PID => "proc_get_pid",
			PROC_SLEEP => "proc_sleep",
			PROC_YIELD => "proc_yield",
			MUTEX_ALLOC => "mutex_alloc",
			MUTEX_FREE => "mutex_free",
			MUTEX_LOCK => "mutex_lock",
			MUTEX_UNLOCK => "mutex_unlock",
			MSG_SEND => "msg_send",
			MSG_RECV => "msg_recv",
			_ => "unknown",
		}
	}
}

impl<P: Platform> Kernel<P> {
	/// Run system call `nr` with `args` on behalf of the Active process.
	///
	/// # Panics
	/// On an unknown call number.
	pub fn dispatch(&mut self, nr: u64, args: [u64; 3]) -> i64 {
		let [a1, a2, _] = args;
		let result = match nr {
			nr::SYS_GET_TIME => Ok(self.sys_get_time()),
			nr::PROC_EXEC => self.sys_proc_exec(a1, a2),
			nr::PROC_EXIT => self.sys_proc_exit(),
			nr::PROC_GET_NAME => self.sys_proc_get_name(a1),
			nr::PROC_GET_PID => self.caller().map(|pid| i64::from(pid.0)),
			nr::PROC_SLEEP => self.sys_proc_sleep(a1),
			nr::PROC_YIELD => self.sys_proc_yield(),
			nr::MUTEX_ALLOC => self.mutexes.alloc().map(|id| id as i64),
			nr::MUTEX_FREE => self.mutexes.free(a1).map(|()| 0),
			nr::MUTEX_LOCK => self.sys_mutex_lock(a1),
			nr::MUTEX_UNLOCK => self.sys_mutex_unlock(a1),
			nr::MSG_SEND => self.sys_msg_send(a1, a2),
			nr::MSG_RECV => self.sys_msg_recv(a1, a2),
			_ => panic!("invalid system call {}", nr),
		};

		match result {
			Ok(value) => value,
			Err(e) => {
				log::warn!("[syscall] {} failed: {}", nr::name(nr), e);
				e.sentinel()
			}
		}
	}

	fn caller(&self) -> KernelResult<Pid> {
		self.sched.current().ok_or(KernelError::NoCurrentProcess)
	}

	fn sys_get_time(&self) -> i64 {
		self.clock.seconds(self.config.ticks_per_second) as i64
	}

	fn sys_proc_exec(&mut self, name_ptr: u64, entry: u64) -> KernelResult<i64> {
		if name_ptr == 0 || entry == 0 {
			return Err(KernelError::BadAddress(name_ptr));
		}
		let mut raw = [0u8; PROC_NAME_LEN];
		let len = self.read_user_str(name_ptr, &mut raw)?;
		let name = match core::str::from_utf8(&raw[..len]) {
			Ok(s) => s,
			Err(e) => core::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or_default(),
		};
		let pid = self.spawn(entry, name)?;
		Ok(i64::from(pid.0))
	}

	fn sys_proc_exit(&mut self) -> KernelResult<i64> {
		self.exit(self.sched.current())?;
		Ok(0)
	}

	fn sys_proc_get_name(&mut self, buf_ptr: u64) -> KernelResult<i64> {
		let pid = self.caller()?;
		if buf_ptr == 0 {
			return Err(KernelError::BadAddress(buf_ptr));
		}
		let mut out = [0u8; PROC_NAME_LEN + 1];
		let name = self.procs.expect_mut(pid).name.as_bytes();
		out[..name.len()].copy_from_slice(name);
		self.platform.copy_to_user(buf_ptr, &out[..=name.len()])?;
		Ok(0)
	}

	fn sys_proc_sleep(&mut self, secs: u64) -> KernelResult<i64> {
		let pid = self.caller()?;
		let wake = self
			.clock
			.now()
			.saturating_add(secs.saturating_mul(self.config.ticks_per_second));
		let proc = self.procs.expect_mut(pid);
		proc.state = ProcessState::Sleeping;
		proc.active_time = 0;
		proc.wake_time = wake;
		self.sched.clear_current();
		log::debug!("pid {} sleeping until tick {}", pid, wake);
		Ok(0)
	}

	fn sys_proc_yield(&mut self) -> KernelResult<i64> {
		let pid = self.caller()?;
		let proc = self.procs.expect_mut(pid);
		proc.active_time = 0;
		self.sched.add(proc);
		self.sched.clear_current();
		Ok(0)
	}

	fn sys_mutex_lock(&mut self, id: u64) -> KernelResult<i64> {
		let pid = self.caller()?;
		let previous = self.mutexes.lock(id, pid, &mut self.procs, &mut self.sched)?;
		Ok(previous as i64)
	}

	fn sys_mutex_unlock(&mut self, id: u64) -> KernelResult<i64> {
		let pid = self.caller()?;
		let count = self.mutexes.unlock(id, pid, &mut self.procs, &mut self.sched)?;
		Ok(count as i64)
	}

	fn sys_msg_send(&mut self, mbox: u64, msg_ptr: u64) -> KernelResult<i64> {
		let pid = self.caller()?;
		if msg_ptr == 0 {
			return Err(KernelError::BadAddress(msg_ptr));
		}
		let mut wire = [0u8; MSG_WIRE_SIZE];
		self.platform.copy_from_user(msg_ptr, &mut wire)?;

		let now = self.clock.now();
		let (stamped, handoff) = self.mailboxes.send(
			mbox,
			Message::from_bytes(&wire),
			pid,
			now,
			&mut self.procs,
			&mut self.sched,
		)?;
		self.platform.copy_to_user(msg_ptr, &stamped.to_bytes())?;
		if let Some(handoff) = handoff {
			self.deliver(handoff);
		}
		Ok(0)
	}

	fn sys_msg_recv(&mut self, mbox: u64, msg_ptr: u64) -> KernelResult<i64> {
		let pid = self.caller()?;
		if msg_ptr == 0 {
			return Err(KernelError::BadAddress(msg_ptr));
		}
		// Probe the destination before a message can be taken off the queue.
		let mut wire = [0u8; MSG_WIRE_SIZE];
		self.platform.copy_from_user(msg_ptr, &mut wire)?;

		let now = self.clock.now();
		match self.mailboxes.recv(mbox, pid, msg_ptr, now, &mut self.procs, &mut self.sched)? {
			Received::Message(message) => {
				self.platform.copy_to_user(msg_ptr, &message.to_bytes())?;
			}
			Received::Blocked => {}
		}
		Ok(0)
	}

	/// Complete a blocked receive: write the message into the receiver's
	/// buffer. A failed write is reported through the receiver's `rax`.
	fn deliver(&mut self, handoff: Handoff) {
		let Handoff { receiver, dest, message } = handoff;
		let rc = match self.platform.copy_to_user(dest, &message.to_bytes()) {
			Ok(()) => 0,
			Err(fault) => {
				log::warn!("[syscall] message for pid {} dropped: {}", receiver, fault);
				KernelError::from(fault).sentinel()
			}
		};
		self.procs.expect_mut(receiver).context.set_return(rc);
	}

	/// Copy a NUL-terminated string of at most `buf.len()` bytes from user
	/// memory. Returns its length without the terminator.
	fn read_user_str(&self, addr: u64, buf: &mut [u8]) -> KernelResult<usize> {
		for i in 0..buf.len() {
			self.platform.copy_from_user(addr + i as u64, &mut buf[i..=i])?;
			if buf[i] == 0 {
				return Ok(i);
			}
		}
		Ok(buf.len())
	}
}
