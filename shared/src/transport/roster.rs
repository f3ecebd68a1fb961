use crate::types::PeerId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterMember {
    pub id: PeerId,
    pub name: String,
}

impl RosterMember {
    pub fn new(id: impl Into<PeerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RosterEvent {
    Joined(RosterMember),
    Left(PeerId),
    /// The session membership owner changed
    HostChanged(PeerId),
}

/// Session membership, supplied by the lobby layer.
pub trait RosterSource {
    /// Every current member, including the local peer
    fn members(&self) -> Vec<RosterMember>;

    /// The membership owner, which is the only peer allowed to start a barrier
    fn session_host(&self) -> Option<PeerId>;

    /// Next membership change since the last poll
    fn poll_event(&mut self) -> Option<RosterEvent>;
}
