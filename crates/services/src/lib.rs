//! # services
//!
//! The posting and moderation engine. Pure logic over the ports declared in
//! `domains`; adapters are injected through [`Collaborators`].

pub mod action_log;
pub mod admission;
pub mod bans;
pub mod cache;
pub mod ddos;
pub mod directory;
pub mod identity;
pub mod ip_range;
pub mod metrics;
pub mod moderation;
pub mod policy;
pub mod posting;
pub mod references;
pub mod resources;

pub use action_log::{ActionLog, ActionState};
pub use admission::{RenderAdmission, RenderPermit};
pub use bans::{BanGate, BanRegistry};
pub use cache::SmallObjectCache;
pub use ddos::{DdosConfig, DdosGuard, RequestKind};
pub use directory::{BoardDirectory, ConfiguredBoard};
pub use ip_range::{ip_num, IpBanInfo, IpBanTable, IpRange, IpRangeList};
pub use metrics::EngineMetrics;
pub use policy::{validate_post, PostKind, PostPolicy};
pub use posting::{Collaborators, PostingEngine, SharedState, SiteSecrets};
pub use references::{extract_citations, ReferenceResolver};
pub use resources::{split_command, CustomLink, Friend, ResourceStore};
