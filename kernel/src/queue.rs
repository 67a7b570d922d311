//! Fixed-capacity FIFO of small handles.
//!
//! Every queue in the kernel is one of these: the free lists of process
//! slots and mutex ids, the scheduler's run queue, each mutex and mailbox
//! wait queue, and (holding `Message`s) each mailbox buffer.

// ── Slot queue ──────────────────────────────────────────────────

/// Fixed-size ring buffer.
///
/// Non-blocking push (returns error if full), non-blocking pop
/// (returns `None` if empty).  Blocking semantics are handled
/// by the callers through the scheduler.
pub struct SlotQueue<T: Copy + Default, const N: usize> {
	items: [T; N],
	head: usize,
	tail: usize,
	count: usize,
}

impl<T: Copy + Default, const N: usize> SlotQueue<T, N> {
	/// Create a new empty queue.
	pub fn new() -> Self {
		Self {
			items: [T::default(); N],
			head: 0,
			tail: 0,
			count: 0,
		}
	}

	/// Append `item` at the tail.
	///
	/// Returns `Err` if the queue is full.
	pub fn push(&mut self, item: T) -> Result<(), &'static str> {
		if self.count == N {
			return Err("slot queue full");
		}
		self.items[self.tail] = item;
		self.tail = (self.tail + 1) % N;
		self.count += 1;
		Ok(())
	}

	/// Remove the item at the head, clearing its slot.
	///
	/// Returns `None` if the queue is empty.
	pub fn pop(&mut self) -> Option<T> {
		if self.count == 0 {
			return None;
		}
		let item = core::mem::take(&mut self.items[self.head]);
		self.head = (self.head + 1) % N;
		self.count -= 1;
		Some(item)
	}

	/// Number of queued items.
	#[inline]
	pub fn len(&self) -> usize {
		self.count
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.count == 0
	}

	#[inline]
	pub fn is_full(&self) -> bool {
		self.count == N
	}

	/// Queued items, head first.
	pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
		(0..self.count).map(move |i| self.items[(self.head + i) % N])
	}
}

impl<T: Copy + Default + PartialEq, const N: usize> SlotQueue<T, N> {
	/// Whether `item` is queued.
	pub fn contains(&self, item: T) -> bool {
		self.iter().any(|queued| queued == item)
	}
}

impl<T: Copy + Default, const N: usize> Default for SlotQueue<T, N> {
	fn default() -> Self {
		Self::new()
	}
}
