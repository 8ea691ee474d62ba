use std::fmt;

/// A discrete, monotonically increasing counter identifying one fixed-timestep
/// simulation step. Used to correlate client predictions with server echoes.
/// The approved-tick cursor starts at -1, hence the signed representation.
pub type SimTick = i32;

/// Identity of a remote endpoint on the message channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}
