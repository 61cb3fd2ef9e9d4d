/// Name of the environment variable containing the path to the termination configuration
/// file. If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/lariat/termination.toml` or
///      `$HOME/.config/lariat/termination.toml`
///  (2) on Windows: `%APPDATA%\lariat\termination.toml`
pub const ENV_CONFIG_PATH: &str = "LARIAT_TERMINATION_CONFIG";

/// Message of the synthesizer assertion raised when a synthesis call is torn down by a
/// concurrent shutdown.
pub const NOT_YET_IMPLEMENTED: &str = "not yet implemented";

/// Default command line of the external SMT solver process.
pub const DEFAULT_EXTERNAL_SOLVER_COMMAND: &str = "z3 -smt2 -in";

/// File name prefix of dumped synthesis queries.
pub const SYNTHESIS_DUMP_PREFIX: &str = "lasso";
