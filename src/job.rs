use std::fmt;
use std::io;

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use tracing::{debug, trace};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum JobState { Running, Stopped }

impl fmt::Display for JobState {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			JobState::Running => f.write_str("Running"),
			JobState::Stopped => f.write_str("Stopped"),
		}
	}
}

/// A single observed change of a child's status. Signals are kept as raw numbers
/// since that is what gets reported.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatusEvent {
	Unchanged,
	Exited(i32),
	Signaled(i32),
	Stopped(i32),
	Continued,
}

impl StatusEvent {
	/// The state a job in `current` moves to, or `None` once it has terminated.
	pub fn next_state(self, current: JobState) -> Option<JobState> {
		match self {
			StatusEvent::Unchanged => Some(current),
			StatusEvent::Exited(..) | StatusEvent::Signaled(..) => None,
			StatusEvent::Stopped(..) => Some(JobState::Stopped),
			StatusEvent::Continued => Some(JobState::Running),
		}
	}
}

pub trait WaitStatusExt {
	fn event(self) -> StatusEvent;
}

impl WaitStatusExt for WaitStatus {
	fn event(self) -> StatusEvent {
		match self {
			WaitStatus::Exited(_, code) => StatusEvent::Exited(code),
			WaitStatus::Signaled(_, sig, _) => StatusEvent::Signaled(sig as i32),
			WaitStatus::Stopped(_, sig) => StatusEvent::Stopped(sig as i32),
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceEvent(_, sig, _) => StatusEvent::Stopped(sig as i32),
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceSyscall(..) => StatusEvent::Stopped(libc::SIGTRAP),
			WaitStatus::Continued(..) => StatusEvent::Continued,
			WaitStatus::StillAlive => StatusEvent::Unchanged,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Job {
	pub id: u32,
	pub gid: Pid,
	pub name: String,
	pub state: JobState,
}

/// Background and stopped jobs, ordered by job id.
#[derive(Debug, Default)]
pub struct JobSet {
	jobs: Vec<Job>,
}

impl JobSet {
	pub fn new() -> JobSet {
		JobSet { jobs: vec![] }
	}

	fn position(&self, id: u32) -> Option<usize> {
		self.jobs.binary_search_by_key(&id, |job| job.id).ok()
	}

	pub fn add(&mut self, id: u32, gid: Pid, state: JobState, name: &str) {
		debug!(id, %gid, ?state, name, "job added");
		let job = Job { id, gid, name: name.to_owned(), state };
		match self.jobs.binary_search_by_key(&id, |job| job.id) {
			Ok(i) => self.jobs[i] = job,
			Err(i) => self.jobs.insert(i, job),
		}
	}

	pub fn get(&self, id: u32) -> Option<&Job> {
		self.position(id).map(|i| &self.jobs[i])
	}

	pub fn pid_of(&self, id: u32) -> Option<Pid> {
		self.get(id).map(|job| job.gid)
	}

	pub fn job_id_of(&self, gid: Pid) -> Option<u32> {
		self.jobs.iter().find(|job| job.gid == gid).map(|job| job.id)
	}

	pub fn set_state(&mut self, id: u32, state: JobState) {
		if let Some(i) = self.position(id) {
			trace!(id, ?state, "job state updated");
			self.jobs[i].state = state;
		}
	}

	pub fn remove(&mut self, id: u32) -> Option<Job> {
		let job = self.position(id).map(|i| self.jobs.remove(i));
		if job.is_some() {
			debug!(id, "job removed");
		}
		job
	}

	/// Feeds `event` through the job's state machine. Returns whether the job is
	/// still tracked afterwards.
	pub fn apply(&mut self, id: u32, event: StatusEvent) -> bool {
		let current = match self.get(id) {
			Some(job) => job.state,
			None => return false,
		};
		match event.next_state(current) {
			Some(state) => {
				if state != current {
					self.set_state(id, state);
				}
				true
			},
			None => {
				self.remove(id);
				false
			},
		}
	}

	/// Leader pids of every tracked job, each exactly once.
	pub fn tracked_pids(&self) -> Vec<Pid> {
		self.jobs.iter().map(|job| job.gid).collect()
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	#[cfg(test)]
	pub fn is_empty(&self) -> bool {
		self.jobs.is_empty()
	}

	pub fn print<W: io::Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
		for job in &self.jobs {
			writeln!(out, "[{}] ({}) {}\t{}", job.id, job.gid, job.state, job.name)?;
		}
		out.flush()
	}
}

impl Drop for JobSet {
	fn drop(&mut self) {
		debug!(remaining = self.jobs.len(), "job registry released");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::sys::signal::Signal;

	fn pid(n: i32) -> Pid {
		Pid::from_raw(n)
	}

	#[test]
	fn lookups_go_both_ways() {
		let mut set = JobSet::new();
		set.add(1, pid(100), JobState::Running, "/bin/sleep");
		set.add(2, pid(200), JobState::Stopped, "vi");
		assert_eq!(set.pid_of(2), Some(pid(200)));
		assert_eq!(set.job_id_of(pid(100)), Some(1));
		assert_eq!(set.pid_of(3), None);
		assert_eq!(set.job_id_of(pid(300)), None);
	}

	#[test]
	fn remove_only_drops_that_job() {
		let mut set = JobSet::new();
		set.add(1, pid(100), JobState::Running, "a");
		set.add(2, pid(200), JobState::Running, "b");
		assert_eq!(set.remove(1).map(|job| job.name), Some("a".to_string()));
		assert_eq!(set.remove(1), None);
		assert_eq!(set.tracked_pids(), vec![pid(200)]);
	}

	#[test]
	fn state_machine_transitions() {
		assert_eq!(StatusEvent::Unchanged.next_state(JobState::Stopped), Some(JobState::Stopped));
		assert_eq!(StatusEvent::Stopped(19).next_state(JobState::Running), Some(JobState::Stopped));
		assert_eq!(StatusEvent::Continued.next_state(JobState::Stopped), Some(JobState::Running));
		assert_eq!(StatusEvent::Exited(0).next_state(JobState::Running), None);
		assert_eq!(StatusEvent::Signaled(9).next_state(JobState::Stopped), None);
	}

	#[test]
	fn apply_updates_or_removes() {
		let mut set = JobSet::new();
		set.add(4, pid(400), JobState::Running, "a");
		assert!(set.apply(4, StatusEvent::Stopped(20)));
		assert_eq!(set.get(4).map(|job| job.state), Some(JobState::Stopped));
		assert!(set.apply(4, StatusEvent::Continued));
		assert_eq!(set.get(4).map(|job| job.state), Some(JobState::Running));
		assert!(!set.apply(4, StatusEvent::Exited(3)));
		assert!(set.is_empty());
		assert!(!set.apply(4, StatusEvent::Continued));
	}

	#[test]
	fn wait_status_becomes_event() {
		assert_eq!(WaitStatus::Exited(pid(1), 2).event(), StatusEvent::Exited(2));
		assert_eq!(WaitStatus::Signaled(pid(1), Signal::SIGKILL, false).event(), StatusEvent::Signaled(9));
		assert_eq!(WaitStatus::Stopped(pid(1), Signal::SIGTSTP).event(), StatusEvent::Stopped(libc::SIGTSTP));
		assert_eq!(WaitStatus::Continued(pid(1)).event(), StatusEvent::Continued);
		assert_eq!(WaitStatus::StillAlive.event(), StatusEvent::Unchanged);
	}

	#[test]
	fn listing_is_ordered_by_id() {
		let mut set = JobSet::new();
		set.add(3, pid(300), JobState::Stopped, "/usr/bin/vi");
		set.add(1, pid(100), JobState::Running, "sleep");
		let mut out = vec![];
		set.print(&mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(),
		           "[1] (100) Running\tsleep\n[3] (300) Stopped\t/usr/bin/vi\n");
	}
}
