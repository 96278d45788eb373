//! One module per subcommand. Each exposes `execute`.

pub mod add;
pub mod delete;
pub mod dump;
pub mod fields;
pub mod get;
pub mod init;
pub mod list;
pub mod purge;
pub mod update;
