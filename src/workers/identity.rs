use std::fmt;
use std::sync::Arc;

/// What a worker does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Serves the health endpoint.
    Health,
    /// Initializes discovered vault servers.
    Init,
    /// Unseals discovered vault servers.
    Unseal,
}

impl Role {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Health => "health",
            Role::Init => "init",
            Role::Unseal => "unseal",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, role and ordinal of a supervised worker.
///
/// The supervisor assigns the ordinal at spawn, in spawn order starting at 1.
/// Names may repeat; `(name, ordinal)` does not. Ordinal 0 means unassigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    name: Arc<str>,
    role: Role,
    ordinal: u32,
}

impl WorkerIdentity {
    /// Identity named after its role.
    pub fn of(role: Role) -> Self {
        Self::named(role.as_str(), role)
    }

    /// Identity with an explicit name.
    pub fn named(name: impl Into<Arc<str>>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
            ordinal: 0,
        }
    }

    /// Same identity with `ordinal` assigned.
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the worker name.
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Worker role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Spawn ordinal; 0 until the supervisor assigns one.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_tells_same_named_workers_apart() {
        let builtin = WorkerIdentity::of(Role::Init).with_ordinal(2);
        let extra = WorkerIdentity::named("init", Role::Unseal).with_ordinal(4);

        assert_eq!(builtin.name(), extra.name());
        assert_ne!(builtin, extra);
        assert_eq!(builtin.to_string(), "init#2");
        assert_eq!(WorkerIdentity::of(Role::Health).ordinal(), 0);
    }
}
