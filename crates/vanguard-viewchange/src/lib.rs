//! # vanguard-viewchange
//!
//! View-change block acceptance and DS committee reconfiguration.
//!
//! When the DS committee replaces a faulty leader, the surviving members
//! emit a view-change block: the candidate leader, the leaders being
//! rotated out, and a threshold cosignature over the committee snapshot.
//! [`ViewChangeProcessor`] validates such a block end to end and, on
//! success, atomically records it (block link + block store) and applies
//! the committee rotation — or rejects it with a typed reason and no side
//! effects.

mod committee_update;
mod error;
mod forward;
mod processor;

pub use committee_update::{
    update_ds_committee_after_vc, update_retrieve_ds_committee_after_vc,
};
pub use error::{ViewChangeError, ViewChangeResult};
pub use forward::{forwarding_cluster_size, NullForwarder, ShardForwarder};
pub use processor::{AcceptanceStage, NodeView, ProcessorConfig, ViewChangeProcessor};
