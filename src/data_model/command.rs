//! Commands (7.11), both the accepted and the generated direction.

use std::sync::Arc;

use bitflags::bitflags;
use tracing::debug;

use crate::{
    data_model::node::{next_sibling, ClusterHandle, CommandHandle, Node},
    interaction_model::path::ConcreteCommandPath,
    tlv::TlvReader,
    Error, Result,
};

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct CommandFlags: u16 {
        /// Client to server command, the node handles it
        const ACCEPTED = 0b00000001;
        /// Server to client command, usually a response
        const GENERATED = 0b00000010;
        /// The callback sends its own response instead of the default status
        const CUSTOM = 0b00000100;
    }
}

impl CommandFlags {
    const DIRECTIONS: Self = Self::ACCEPTED.union(Self::GENERATED);

    fn direction(self) -> Self {
        match self & Self::DIRECTIONS {
            d if d.is_empty() => Self::ACCEPTED,
            d => d,
        }
    }
}

/// Handles an invoked command. The payload reader is positioned at the start
/// of the command fields.
pub trait CommandHandler: Send + Sync {
    fn invoke(&self, path: &ConcreteCommandPath, payload: &mut TlvReader<'_>) -> Result<()>;
}

impl<F> CommandHandler for F
where
    F: Fn(&ConcreteCommandPath, &mut TlvReader<'_>) -> Result<()> + Send + Sync,
{
    fn invoke(&self, path: &ConcreteCommandPath, payload: &mut TlvReader<'_>) -> Result<()> {
        self(path, payload)
    }
}

/// Wrap a closure as a shareable command handler
pub fn handler<F>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(&ConcreteCommandPath, &mut TlvReader<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub struct Command {
    pub(crate) id: u32,
    pub(crate) cluster: ClusterHandle,
    pub(crate) path: ConcreteCommandPath,
    pub(crate) flags: CommandFlags,
    pub(crate) callback: Option<Arc<dyn CommandHandler>>,
}

impl Node {
    /// Create a command on a cluster. Without a direction flag the command is
    /// [`CommandFlags::ACCEPTED`]. A cluster can carry an accepted and a
    /// generated command with the same ID.
    pub fn create_command(
        &mut self,
        cluster: ClusterHandle,
        command_id: u32,
        flags: CommandFlags,
        callback: Option<Arc<dyn CommandHandler>>,
    ) -> Result<CommandHandle> {
        let cl = self.clusters.get(cluster).ok_or(Error::NotFound)?;
        let path = ConcreteCommandPath::new(cl.endpoint_id, cl.id, command_id);
        let flags = (flags - CommandFlags::DIRECTIONS) | flags.direction();
        if self.command_in(cluster, command_id, flags).is_some() {
            return Err(Error::AlreadyExists(command_id));
        }
        let handle = self
            .commands
            .insert(Command {
                id: command_id,
                cluster,
                path,
                flags,
                callback,
            })
            .ok_or(Error::NoMemory)?;
        if let Some(cl) = self.clusters.get_mut(cluster) {
            cl.commands.push(handle);
        }
        debug!(?path, ?flags, "command created");
        Ok(handle)
    }

    /// First command with this ID, whatever its direction
    pub fn command(&self, cluster: ClusterHandle, command_id: u32) -> Option<CommandHandle> {
        self.commands(cluster)
            .find(|h| self.commands.get(*h).map(|c| c.id) == Some(command_id))
    }

    /// Command with this ID going in the direction given by `flags`
    pub fn command_in(
        &self,
        cluster: ClusterHandle,
        command_id: u32,
        flags: CommandFlags,
    ) -> Option<CommandHandle> {
        let direction = flags.direction();
        self.commands(cluster).find(|h| {
            self.commands
                .get(*h)
                .is_some_and(|c| c.id == command_id && c.flags.intersects(direction))
        })
    }

    pub fn first_command(&self, cluster: ClusterHandle) -> Option<CommandHandle> {
        self.clusters.get(cluster)?.commands.first().copied()
    }

    pub fn next_command(&self, command: CommandHandle) -> Option<CommandHandle> {
        let cluster = self.commands.get(command)?.cluster;
        next_sibling(&self.clusters.get(cluster)?.commands, command)
    }

    /// Commands of a cluster in creation order
    pub fn commands(&self, cluster: ClusterHandle) -> impl Iterator<Item = CommandHandle> + '_ {
        self.clusters
            .get(cluster)
            .map(|cl| cl.commands.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
    }

    pub fn command_id(&self, command: CommandHandle) -> Option<u32> {
        self.commands.get(command).map(|c| c.id)
    }

    pub fn command_flags(&self, command: CommandHandle) -> Option<CommandFlags> {
        self.commands.get(command).map(|c| c.flags)
    }

    pub fn command_path(&self, command: CommandHandle) -> Option<ConcreteCommandPath> {
        self.commands.get(command).map(|c| c.path)
    }

    pub fn command_callback(&self, command: CommandHandle) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(command)?.callback.clone()
    }
}
