//! `extern "C"` entry points, the addresses handed to the kernel as
//! program entries.

use core::ffi::CStr;

use crate::gate::Int80;
use crate::programs::{self, SHARED};
use crate::sys::{Entry, Sys};

/// Boot program: sets up the shared mutexes and background programs, then
/// yields forever.
pub extern "C" fn init() -> ! {
	let mut sys = Sys::new(Int80);
	let children: [(&CStr, Entry); 2] = [(c"sleep forever", sleep_forever), (c"delay forever", delay_forever)];
	if programs::init(&mut sys, &SHARED, &children).is_err() {
		sys.exit();
	}
	loop {
		sys.yield_now();
	}
}

pub extern "C" fn test() -> ! {
	let mut sys = Sys::new(Int80);
	programs::test(&mut sys, &SHARED);
	sys.exit()
}

pub extern "C" fn producer() -> ! {
	let mut sys = Sys::new(Int80);
	programs::producer(&mut sys);
	sys.exit()
}

pub extern "C" fn consumer() -> ! {
	let mut sys = Sys::new(Int80);
	programs::consumer(&mut sys, |_, _| {});
	sys.exit()
}

pub extern "C" fn sleep_forever() -> ! {
	let mut sys = Sys::new(Int80);
	loop {
		sys.sleep(10);
	}
}

pub extern "C" fn delay_forever() -> ! {
	let mut sys = Sys::new(Int80);
	loop {
		programs::delay(&mut sys, 10);
	}
}
