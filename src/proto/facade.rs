//! `group.command(args)` call syntax over the formatted calling convention.
//!
//! A two-level lookup (group name, then command short name) resolved
//! against the session's catalog. Nothing here talks to the server until a
//! command is actually called.

use super::catalog::CommandDescriptor;
use super::error::{Error, Result};
use super::session::Session;
use super::transport::Transport;
use super::value::Value;

/// A command group of the current login.
pub struct Group<'s, T: Transport> {
    session: &'s Session<T>,
    name: String,
}

/// One resolved command of a [`Group`].
pub struct Command<'s, T: Transport> {
    session: &'s Session<T>,
    descriptor: &'s CommandDescriptor,
}

impl<T: Transport> Session<T> {
    /// Look up a command group. Valid when at least one `<name>_*` command exists.
    pub fn group(&self, name: &str) -> Result<Group<'_, T>> {
        if self.catalog()?.group_members(name).is_empty() {
            return Err(Error::UnknownCommand(name.to_string()));
        }
        Ok(Group {
            session: self,
            name: name.to_string(),
        })
    }
}

impl<'s, T: Transport> Group<'s, T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short names of the commands in this group.
    pub fn commands(&self) -> Result<Vec<&'s str>> {
        let catalog = self.session.catalog()?;
        Ok(catalog.group_members(&self.name).into_iter().collect())
    }

    pub fn command(&self, short: &str) -> Result<Command<'s, T>> {
        let full = format!("{}_{short}", self.name);
        let descriptor = self.session.catalog()?.resolve(&full)?;
        Ok(Command {
            session: self.session,
            descriptor,
        })
    }
}

impl<'s, T: Transport> Command<'s, T> {
    pub fn descriptor(&self) -> &'s CommandDescriptor {
        self.descriptor
    }

    pub fn full_name(&self) -> &'s str {
        &self.descriptor.name
    }

    pub fn call(&self, args: &[Value]) -> Result<String> {
        self.session.call_formatted(&self.descriptor.name, args)
    }

    pub fn call_raw(&self, args: &[Value]) -> Result<Value> {
        self.session.call_raw(&self.descriptor.name, args)
    }
}
