//! Default filesystem locations
//!
//! These are only fallbacks; every one of them can be overridden in the
//! configuration file.

pub const DEFAULT_SERVICE_NAME: &str = "hotswap";
pub const DEFAULT_EXECUTABLE_NAME: &str = "hotswap";

pub const FEED_DIR: &str = "/var/lib/hotswap/feed";
pub const INSTALL_ROOT: &str = "/var/lib/hotswap";
pub const UNIT_DIR: &str = "/etc/systemd/system";
pub const LOGS_DIR: &str = "/var/log/hotswap";

/// Name of the release manifest inside the feed directory
pub const RELEASES_FILE: &str = "releases.json";
