//! Offline allow-list generation: read addresses, build the Merkle tree,
//! write `whitelist.json` and optionally update a minting config.

pub mod input;
pub mod output;

pub use input::{parse_address_list, read_address_file};
pub use output::{merge_into_minting_config, write_file_atomic, WhitelistFile};
