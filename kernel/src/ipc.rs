//! IPC Subsystem: fixed mailboxes with blocking receive.
//!
//! Every mailbox exists from boot; there is no create or destroy.  A
//! mailbox buffers up to `MBOX_SIZE` messages.  Receiving from an empty
//! mailbox blocks the receiver, and the next send hands its message
//! straight to the oldest blocked receiver instead of leaving it in the
//! buffer.
//!
//! **Invariants:**
//! - Receivers only wait on an empty mailbox, so a hand-off always takes
//!   the message the sender just queued.
//! - A Waiting receiver always has `recv_dest` set; the hand-off writes
//!   there, not to wherever the receiver's registers point at wake-up.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::config::{MBOX_MAX, MBOX_SIZE, MSG_SIZE, QUEUE_SIZE};
use crate::error::{KernelError, KernelResult};
use crate::queue::SlotQueue;
use crate::task::{Pid, ProcessState, ProcessTable, Scheduler};

// ── Message ─────────────────────────────────────────────────────

/// Size of a message in process memory.
pub const MSG_WIRE_SIZE: usize = 24 + MSG_SIZE;

/// A message passed between processes.
///
/// `sender`, `time_sent` and `time_received` are stamped by the kernel;
/// whatever the caller put there is overwritten.  Times are in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Message {
	pub sender: u32,
	pub _pad: u32,
	pub time_sent: u64,
	pub time_received: u64,
	/// Opaque payload.
	pub data: [u8; MSG_SIZE],
}

impl Message {
	/// Create an empty message.
	pub const fn empty() -> Self {
		Self {
			sender: 0,
			_pad: 0,
			time_sent: 0,
			time_received: 0,
			data: [0; MSG_SIZE],
		}
	}

	/// A message carrying `payload`, truncated to `MSG_SIZE` bytes.
	pub fn with_payload(payload: &[u8]) -> Self {
		let mut msg = Self::empty();
		let len = payload.len().min(MSG_SIZE);
		msg.data[..len].copy_from_slice(&payload[..len]);
		msg
	}

	/// Encode as laid out in process memory (little endian).
	pub fn to_bytes(&self) -> [u8; MSG_WIRE_SIZE] {
		let mut out = [0; MSG_WIRE_SIZE];
		out[0..4].copy_from_slice(&self.sender.to_le_bytes());
		out[8..16].copy_from_slice(&self.time_sent.to_le_bytes());
		out[16..24].copy_from_slice(&self.time_received.to_le_bytes());
		out[24..].copy_from_slice(&self.data);
		out
	}

	/// Decode from process memory.
	pub fn from_bytes(bytes: &[u8; MSG_WIRE_SIZE]) -> Self {
		let mut msg = Self::empty();
		msg.sender = u32::from_le_bytes(field(bytes, 0));
		msg.time_sent = u64::from_le_bytes(field(bytes, 8));
		msg.time_received = u64::from_le_bytes(field(bytes, 16));
		msg.data.copy_from_slice(&bytes[24..]);
		msg
	}
}

impl Default for Message {
	fn default() -> Self {
		Self::empty()
	}
}

fn field<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
	let mut out = [0; N];
	out.copy_from_slice(&bytes[at..at + N]);
	out
}

// ── Mailbox ─────────────────────────────────────────────────────

/// One mailbox: a bounded message buffer and its blocked receivers.
pub struct Mailbox {
	buffer: SlotQueue<Message, MBOX_SIZE>,
	wait_queue: SlotQueue<Pid, QUEUE_SIZE>,
}

impl Mailbox {
	fn new() -> Self {
		Self {
			buffer: SlotQueue::new(),
			wait_queue: SlotQueue::new(),
		}
	}

	/// Number of buffered messages.
	pub fn len(&self) -> usize {
		self.buffer.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buffer.is_empty()
	}

	/// Blocked receivers, oldest first.
	pub fn waiting(&self) -> impl Iterator<Item = Pid> + '_ {
		self.wait_queue.iter()
	}
}

/// A message delivered directly to a receiver that was blocked in
/// `recv`.  The caller copies `message` to `dest` in the receiver's
/// memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
	pub receiver: Pid,
	pub dest: u64,
	pub message: Message,
}

/// Outcome of a receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
	/// A buffered message was taken.
	Message(Message),
	/// The mailbox was empty; the receiver is now Waiting.
	Blocked,
}

/// The fixed set of mailboxes.
pub struct MailboxTable {
	boxes: Box<[Mailbox]>,
}

impl MailboxTable {
	pub fn new() -> Self {
		let boxes: Vec<Mailbox> = (0..MBOX_MAX).map(|_| Mailbox::new()).collect();
		Self {
			boxes: boxes.into_boxed_slice(),
		}
	}

	fn index(&self, id: u64) -> KernelResult<usize> {
		match usize::try_from(id) {
			Ok(idx) if idx < self.boxes.len() => Ok(idx),
			_ => Err(KernelError::InvalidMailbox(id)),
		}
	}

	pub fn get(&self, id: u64) -> Option<&Mailbox> {
		self.index(id).ok().map(|idx| &self.boxes[idx])
	}

	/// Queue `msg` on mailbox `id`, stamped as sent by `sender` at `now`.
	///
	/// Returns the stamped message and, if a receiver was waiting, the
	/// hand-off that completes its receive.  The receiver is Running
	/// again when this returns.  Never blocks the sender.
	pub fn send(
		&mut self,
		id: u64,
		msg: Message,
		sender: Pid,
		now: u64,
		table: &mut ProcessTable,
		sched: &mut Scheduler,
	) -> KernelResult<(Message, Option<Handoff>)> {
		let idx = self.index(id)?;
		let mailbox = &mut self.boxes[idx];

		let mut stamped = msg;
		stamped.sender = sender.0;
		stamped.time_sent = now;
		stamped.time_received = 0;

		if mailbox.buffer.push(stamped).is_err() {
			log::warn!("mailbox {} is full", id);
			return Err(KernelError::MailboxFull);
		}

		let Some(receiver) = mailbox.wait_queue.pop() else {
			return Ok((stamped, None));
		};

		let proc = table.expect_mut(receiver);
		let Some(dest) = proc.recv_dest.take() else {
			panic!("pid {} waiting on mailbox {} without a destination", receiver, id);
		};
		sched.add(proc);

		let Some(mut message) = mailbox.buffer.pop() else {
			panic!("mailbox {} lost a message during hand-off", id);
		};
		message.time_received = now;
		log::debug!("mailbox {}: pid {} -> pid {}", id, sender, receiver);

		Ok((stamped, Some(Handoff { receiver, dest, message })))
	}

	/// Take the oldest message from mailbox `id`.
	///
	/// On an empty mailbox `receiver` blocks: `dest` is recorded as its
	/// delivery address, it is queued on the mailbox, marked Waiting and
	/// taken off the scheduler.
	pub fn recv(
		&mut self,
		id: u64,
		receiver: Pid,
		dest: u64,
		now: u64,
		table: &mut ProcessTable,
		sched: &mut Scheduler,
	) -> KernelResult<Received> {
		let idx = self.index(id)?;
		let mailbox = &mut self.boxes[idx];

		if let Some(mut message) = mailbox.buffer.pop() {
			message.time_received = now;
			return Ok(Received::Message(message));
		}

		if let Err(e) = mailbox.wait_queue.push(receiver) {
			panic!("unable to queue pid {} on mailbox {}: {}", receiver, id, e);
		}
		let proc = table.expect_mut(receiver);
		proc.recv_dest = Some(dest);
		proc.state = ProcessState::Waiting;
		sched.remove(receiver);
		if sched.current() == Some(receiver) {
			sched.clear_current();
		}
		log::debug!("pid {} waiting on mailbox {}", receiver, id);
		Ok(Received::Blocked)
	}
}

impl Default for MailboxTable {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DEST: u64 = 0x2000;

	fn setup() -> (MailboxTable, ProcessTable, Scheduler, Pid, Pid) {
		let mut table = ProcessTable::new();
		let mut sched = Scheduler::new();
		table.create(0x1000, "idle", 0, &mut sched).unwrap();
		let a = table.create(0x1000, "producer", 0, &mut sched).unwrap();
		let b = table.create(0x1000, "consumer", 0, &mut sched).unwrap();
		(MailboxTable::new(), table, sched, a, b)
	}

	#[test]
	fn buffered_message_keeps_its_stamps() {
		let (mut boxes, mut table, mut sched, a, b) = setup();
		let (stamped, handoff) = boxes
			.send(3, Message::with_payload(b"hello"), a, 40, &mut table, &mut sched)
			.unwrap();
		assert!(handoff.is_none());
		assert_eq!((stamped.sender, stamped.time_sent), (a.0, 40));
		assert_eq!(boxes.get(3).unwrap().len(), 1);

		let Received::Message(got) = boxes.recv(3, b, DEST, 55, &mut table, &mut sched).unwrap() else {
			panic!("expected a buffered message");
		};
		assert_eq!(got.sender, a.0);
		assert_eq!(got.time_sent, 40);
		assert_eq!(got.time_received, 55);
		assert!(got.time_received >= got.time_sent);
		assert_eq!(&got.data[..5], b"hello");
	}

	#[test]
	fn empty_recv_blocks_and_send_hands_off() {
		let (mut boxes, mut table, mut sched, a, b) = setup();
		assert_eq!(boxes.recv(0, b, DEST, 1, &mut table, &mut sched), Ok(Received::Blocked));
		let proc = table.get(b).unwrap();
		assert_eq!(proc.state, ProcessState::Waiting);
		assert_eq!(proc.recv_dest, Some(DEST));
		assert!(!sched.is_queued(b));
		assert_eq!(boxes.get(0).unwrap().waiting().collect::<Vec<_>>(), vec![b]);

		let (_, handoff) = boxes
			.send(0, Message::with_payload(b"ping"), a, 9, &mut table, &mut sched)
			.unwrap();
		let handoff = handoff.expect("receiver was waiting");
		assert_eq!(handoff.receiver, b);
		assert_eq!(handoff.dest, DEST);
		assert_eq!(handoff.message.time_received, 9);
		assert!(boxes.get(0).unwrap().is_empty());

		let proc = table.get(b).unwrap();
		assert_eq!(proc.state, ProcessState::Running);
		assert_eq!(proc.recv_dest, None);
		assert!(sched.is_queued(b));
	}

	#[test]
	fn full_mailbox_rejects_send() {
		let (mut boxes, mut table, mut sched, a, _) = setup();
		for i in 0..MBOX_SIZE {
			boxes.send(1, Message::with_payload(&[i as u8]), a, 0, &mut table, &mut sched).unwrap();
		}
		assert_eq!(
			boxes.send(1, Message::empty(), a, 0, &mut table, &mut sched),
			Err(KernelError::MailboxFull)
		);
		assert_eq!(boxes.get(1).unwrap().len(), MBOX_SIZE);
	}

	#[test]
	fn messages_leave_in_send_order() {
		let (mut boxes, mut table, mut sched, a, b) = setup();
		for i in 0..3u8 {
			boxes.send(2, Message::with_payload(&[i]), a, i as u64, &mut table, &mut sched).unwrap();
		}
		for i in 0..3u8 {
			match boxes.recv(2, b, DEST, 10, &mut table, &mut sched).unwrap() {
				Received::Message(msg) => assert_eq!(msg.data[0], i),
				Received::Blocked => panic!("mailbox drained early"),
			}
		}
	}

	#[test]
	fn mailbox_ids_are_bounded() {
		let (mut boxes, mut table, mut sched, a, _) = setup();
		let bad = MBOX_MAX as u64;
		assert_eq!(
			boxes.send(bad, Message::empty(), a, 0, &mut table, &mut sched),
			Err(KernelError::InvalidMailbox(bad))
		);
		assert_eq!(
			boxes.recv(bad, a, DEST, 0, &mut table, &mut sched),
			Err(KernelError::InvalidMailbox(bad))
		);
	}

	#[test]
	fn wire_format_is_little_endian() {
		let mut msg = Message::with_payload(b"xyz");
		msg.sender = 0x0102_0304;
		msg.time_sent = 7;
		let bytes = msg.to_bytes();
		assert_eq!(&bytes[0..4], &[4, 3, 2, 1]);
		assert_eq!(bytes[8], 7);
		assert_eq!(&bytes[24..27], b"xyz");
		assert_eq!(Message::from_bytes(&bytes), msg);
	}
}
