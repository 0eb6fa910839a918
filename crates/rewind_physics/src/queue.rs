//! # Command Queue
//!
//! Mutex-guarded, insertion-ordered list of commands. Producers append under
//! a short-held lock; the command stage swaps the whole list out in one go.
//!
//! The queue is unbounded. `reserve` is a soft target: crossing it logs a
//! warning each time the backing storage has to grow, it never rejects.

use parking_lot::Mutex;
use rewind_core::BodyHandle;

use crate::command::Command;

/// Multi-producer command list.
pub struct CommandQueue {
    commands: Mutex<Vec<Command>>,
    reserve: usize,
}

impl CommandQueue {
    /// Creates a queue with `reserve` slots pre-allocated.
    #[must_use]
    pub fn new(reserve: usize) -> Self {
        Self {
            commands: Mutex::new(Vec::with_capacity(reserve)),
            reserve,
        }
    }

    /// Soft capacity.
    #[must_use]
    pub const fn reserve(&self) -> usize {
        self.reserve
    }

    /// Appends a command. Never blocks on the engine.
    pub fn push(&self, command: Command) {
        let mut commands = self.commands.lock();
        if commands.len() == commands.capacity() && commands.len() >= self.reserve {
            tracing::warn!(
                pending = commands.len(),
                reserve = self.reserve,
                "command queue exceeded its reserve, growing"
            );
        }
        commands.push(command);
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }

    /// Takes every pending command, leaving the queue empty.
    ///
    /// `spare` is an empty vector whose capacity becomes the queue's new
    /// storage, so steady-state flushing does not allocate.
    pub fn take(&self, spare: Vec<Command>) -> Vec<Command> {
        debug_assert!(spare.is_empty());
        let mut commands = self.commands.lock();
        std::mem::replace(&mut *commands, spare)
    }

    /// Drops pending commands that refer to a retired body.
    ///
    /// Stops at the first command that revives the handle; everything after
    /// it refers to the new incarnation. Returns the number removed.
    pub fn strip(&self, handle: BodyHandle) -> usize {
        let mut commands = self.commands.lock();
        let boundary = commands
            .iter()
            .position(|command| command.revives(handle))
            .unwrap_or(commands.len());

        let before = commands.len();
        let mut index = 0;
        commands.retain(|command| {
            let keep = index >= boundary || !command.references(handle);
            index += 1;
            keep
        });
        before - commands.len()
    }

    /// Whether any pending command mentions `handle`.
    #[must_use]
    pub fn references(&self, handle: BodyHandle) -> bool {
        self.commands.lock().iter().any(|c| c.references(handle))
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(rewind_shared::COMMAND_QUEUE_RESERVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_shared::Vec3;

    fn force(handle: BodyHandle) -> Command {
        Command::AddForce {
            handle,
            force: Vec3::Z,
        }
    }

    #[test]
    fn test_take_preserves_order() {
        let queue = CommandQueue::new(4);
        let a = BodyHandle::new(0, 0);
        queue.push(Command::AddBody { handle: a });
        queue.push(force(a));

        let taken = queue.take(Vec::new());
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].kind(), "add_body");
        assert_eq!(taken[1].kind(), "add_force");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_grows_past_reserve() {
        let queue = CommandQueue::new(2);
        for i in 0..10 {
            queue.push(force(BodyHandle::new(i, 0)));
        }
        assert_eq!(queue.len(), 10);
    }

    #[test]
    fn test_strip_stops_at_revival() {
        let queue = CommandQueue::new(8);
        let a = BodyHandle::new(0, 0);
        let b = BodyHandle::new(1, 0);
        queue.push(force(a));
        queue.push(force(b));
        queue.push(Command::AddBody { handle: a });
        queue.push(force(a));

        assert_eq!(queue.strip(a), 1);
        let remaining: Vec<_> = queue.take(Vec::new()).iter().map(Command::kind).collect();
        assert_eq!(remaining, vec!["add_force", "add_body", "add_force"]);
    }
}
