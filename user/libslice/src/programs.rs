//! Stock programs.
//!
//! Each body is generic over the [`Gate`] so it can run against a scripted
//! kernel in tests. A body returns where the process would exit; the
//! `extern "C"` wrappers in [`entry`](crate::entry) issue the exit.

use core::ffi::CStr;

use spin::Once;

use crate::gate::Gate;
use crate::message::Message;
use crate::sys::{Entry, Sys, SysResult};

/// The sentence producers send, one word per message.
pub const WORDS: [&str; 9] = ["the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog"];

/// Longest word a [`WordRecord`] carries.
pub const WORD_LEN: usize = 24;

/// Mutex pair `init` allocates and the test programs share. Even pids
/// use the first, odd pids the second.
pub struct Shared {
	mutexes: Once<[u64; 2]>,
}

impl Shared {
	pub const fn new() -> Self {
		Self { mutexes: Once::new() }
	}

	/// Record the pair. Only the first call has any effect.
	pub fn publish(&self, even: u64, odd: u64) {
		self.mutexes.call_once(|| [even, odd]);
	}

	pub fn mutex_for(&self, pid: u32) -> Option<u64> {
		self.mutexes.get().map(|pair| pair[(pid % 2) as usize])
	}
}

impl Default for Shared {
	fn default() -> Self {
		Self::new()
	}
}

/// The mutex pair used by the programs the kernel boots.
pub static SHARED: Shared = Shared::new();

/// Payload of a producer message: sequence number, then a NUL-padded word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRecord {
	pub sequence: u32,
	word: [u8; WORD_LEN],
}

impl WordRecord {
	pub fn new(sequence: u32, word: &str) -> Self {
		let mut bytes = [0; WORD_LEN];
		let len = word.len().min(WORD_LEN - 1);
		bytes[..len].copy_from_slice(&word.as_bytes()[..len]);
		Self { sequence, word: bytes }
	}

	pub fn word(&self) -> &str {
		let len = self.word.iter().position(|&b| b == 0).unwrap_or(WORD_LEN);
		core::str::from_utf8(&self.word[..len]).unwrap_or("")
	}

	pub fn to_message(&self) -> Message {
		let mut payload = [0; 4 + WORD_LEN];
		payload[..4].copy_from_slice(&self.sequence.to_le_bytes());
		payload[4..].copy_from_slice(&self.word);
		Message::with_payload(&payload)
	}

	pub fn from_message(msg: &Message) -> Self {
		let mut sequence = [0; 4];
		sequence.copy_from_slice(&msg.data[..4]);
		let mut word = [0; WORD_LEN];
		word.copy_from_slice(&msg.data[4..4 + WORD_LEN]);
		Self {
			sequence: u32::from_le_bytes(sequence),
			word,
		}
	}
}

/// Spin until `secs` seconds have passed, without giving up the CPU.
pub fn delay<G: Gate>(sys: &mut Sys<G>, secs: u64) {
	let until = sys.time().saturating_add(secs);
	while sys.time() < until {
		core::hint::spin_loop();
	}
}

/// First program: waits five seconds, allocates the shared mutex pair,
/// then starts `children`.
pub fn init<G: Gate>(sys: &mut Sys<G>, shared: &Shared, children: &[(&CStr, Entry)]) -> SysResult<()> {
	sys.sleep(5);
	let even = sys.mutex_alloc()?;
	let odd = sys.mutex_alloc()?;
	shared.publish(even, odd);
	for &(name, entry) in children {
		// A full table only costs us that child.
		let _ = sys.exec(name, entry);
	}
	Ok(())
}

/// Take the caller's shared mutex `(pid % 5 + 1) * 3 + 1` times, holding it
/// for `pid % 5` seconds each round, asleep or spinning depending on the
/// clock.
pub fn test<G: Gate>(sys: &mut Sys<G>, shared: &Shared) {
	let pid = sys.pid();
	let Some(mutex) = shared.mutex_for(pid) else {
		return;
	};
	let hold = u64::from(pid % 5);
	let rounds = (hold + 1) * 3;

	for _ in 0..=rounds {
		if sys.mutex_lock(mutex).is_err() {
			return;
		}
		if sys.time() % 2 == 0 {
			sys.sleep(hold);
		} else {
			delay(sys, hold);
		}
		if sys.mutex_unlock(mutex).is_err() {
			return;
		}
	}
}

/// Mailbox a producer or consumer with `pid` uses, and how many seconds
/// it keeps going.
fn channel(pid: u32) -> (u64, u64) {
	(u64::from(pid % 2), u64::from(pid * 2 % 15))
}

/// Send [`WORDS`] one per second to mailbox `pid % 2`, stopping early once
/// `pid * 2 % 15` seconds have passed or a send fails.
pub fn producer<G: Gate>(sys: &mut Sys<G>) {
	let (mbox, budget) = channel(sys.pid());
	let start = sys.time();

	for (sequence, word) in (0u32..).zip(WORDS) {
		if sys.time() - start > budget {
			break;
		}
		let mut msg = WordRecord::new(sequence, word).to_message();
		if sys.send(mbox, &mut msg).is_err() {
			return;
		}
		sys.sleep(1);
	}
}

/// Receive from mailbox `pid % 2` for `pid * 2 % 15` seconds, handing
/// each message and its decoded record to `on_message`.
pub fn consumer<G: Gate>(sys: &mut Sys<G>, mut on_message: impl FnMut(&Message, WordRecord)) {
	let (mbox, budget) = channel(sys.pid());
	let start = sys.time();
	let mut msg = Message::empty();

	while sys.time() - start <= budget {
		if sys.recv(mbox, &mut msg).is_err() {
			return;
		}
		on_message(&msg, WordRecord::from_message(&msg));
	}
}
