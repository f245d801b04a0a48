//! vRouter route table client
//!
//! Creates and deletes entries in the inet, inet6 and bridge forwarding
//! tables of the vrouter kernel module and dumps them page by page.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ cli / params │──▶│ RequestBuilder │──▶│  Transport   │──▶│   vrouter    │
//! └──────────────┘   └────────────────┘   │  (netlink)   │◀──│ kernel module│
//!                                         └──────┬───────┘   └──────────────┘
//!                                                │ ResponseBatch
//!                    ┌──────────────┐   ┌────────▼───────┐
//!                    │ TablePrinter │◀──│   DumpStream   │
//!                    └──────────────┘   │ ResponseDecoder│
//!                                       └────────────────┘
//! ```
//!
//! Dumps are paginated by marker: every round asks for the entries after
//! the key of the last entry received, until the module reports that
//! nothing more is pending.

pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod dump;
pub mod error;
pub mod flags;
pub mod netlink;
pub mod record;
pub mod request;
pub mod response;
pub mod table;
pub mod transport;

pub use client::RouteClient;
pub use codec::Operation;
pub use config::RtConfig;
pub use dump::{DumpCursor, DumpState, DumpStream, DumpSummary};
pub use error::{
    ConfigError, DecodeError, DumpError, Result, RtError, TransportError, ValidationError,
};
pub use flags::{ArpFlags, BridgeEntryFlags, InetRouteFlags, Legend, RouteFlags};
pub use netlink::NetlinkTransport;
pub use record::{RouteRecord, StitchedMac};
pub use request::{RequestBuilder, RouteParams};
pub use response::ResponseDecoder;
pub use table::TablePrinter;
pub use transport::{ResponseBatch, ScriptedTransport, Transport};
pub use vrouter_types::{AddressFamily, MacAddress, RouteKey};
