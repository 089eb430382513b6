use lazy_static::*;
use semver::Version;

lazy_static! {
    /// Controller version.
    pub static ref VERSION: Version = Version::parse(env!("CARGO_PKG_VERSION"))
        .expect("failed to parse our own SemVer");
}

/// User-Agent header for outgoing requests.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The name this controller uses to identify itself to the ranking service.
pub const TOOL_NAME: &str = env!("CARGO_PKG_NAME");

/// The environment variable that holds the path to the config file.
pub const CONFIG_ENV_VAR: &str = "DEDISYNC_CONFIG";

/// The ranking service endpoint used if the config does not specify one.
pub const DEFAULT_DEDIMANIA_URL: &str = "http://dedimania.net:8081/Dedimania";

/// The game identifier expected by the ranking service.
pub const GAME: &str = "TM2";

/// This call is appended to every batch sent to the ranking service.
/// Its reply lists warnings for each method in the batch.
pub const MAINTENANCE_METHOD: &str = "dedimania.WarningsAndTTR";

/// The number of records a server may hold for a map, unless the
/// ranking service replies with a different limit.
pub const DEFAULT_MAX_RANK: usize = 30;

/// Maps with fewer checkpoints (including the finish line) are rejected
/// by the ranking service.
pub const MIN_CHECKPOINTS: i32 = 2;
