use crate::api::*;

/// Remote procedure calls to be executed on controller-side.
///
/// References:
///  - https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-callbacks
///  - https://github.com/maniaplanet/script-xmlrpc/blob/master/XmlRpcListing.md
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    /// Sent when a player connects to the server.
    ///
    /// Triggered by `ManiaPlanet.PlayerConnect`
    PlayerConnect { login: String, is_spectator: bool },

    /// Sent when a player disconnects from the server.
    ///
    /// Triggered by `ManiaPlanet.PlayerDisconnect`
    PlayerDisconnect { login: String },

    /// Sent when a map starts, or is restarted.
    ///
    /// Triggered by `ManiaPlanet.BeginMap`
    MapBegin { map: MapInfo },

    /// Sent when a map ends, before the podium.
    ///
    /// Triggered by `ManiaPlanet.EndMap`
    MapEnd { map: MapInfo },

    /// Sent when a player crosses a checkpoint, or the finish line.
    ///
    /// Triggered by `Trackmania.Event.WayPoint`
    RunCheckpoint { event: CheckpointEvent },
}
