//! Mailbox messages as a process sees them.

/// Payload bytes per message.
pub const MSG_SIZE: usize = 256;

/// Size of a [`Message`] in memory.
pub const MSG_WIRE_SIZE: usize = 24 + MSG_SIZE;

/// A mailbox message. The kernel overwrites `sender`, `time_sent` and
/// `time_received` (both in ticks); only `data` is the caller's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Message {
	pub sender: u32,
	_pad: u32,
	pub time_sent: u64,
	pub time_received: u64,
	pub data: [u8; MSG_SIZE],
}

const _: () = assert!(core::mem::size_of::<Message>() == MSG_WIRE_SIZE);

impl Message {
	pub const fn empty() -> Self {
		Self {
			sender: 0,
			_pad: 0,
			time_sent: 0,
			time_received: 0,
			data: [0; MSG_SIZE],
		}
	}

	/// A message carrying `payload`, truncated to [`MSG_SIZE`] bytes.
	pub fn with_payload(payload: &[u8]) -> Self {
		let mut msg = Self::empty();
		let len = payload.len().min(MSG_SIZE);
		msg.data[..len].copy_from_slice(&payload[..len]);
		msg
	}
}

impl Default for Message {
	fn default() -> Self {
		Self::empty()
	}
}
