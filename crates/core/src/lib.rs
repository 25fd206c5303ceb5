//! Domain rules for subtitle versioning, review workflows and team
//! permissions. Nothing here touches storage or the network.

pub mod clock;
pub mod error;
pub mod external_sync;
pub mod language_prefs;
pub mod languages;
pub mod lineage;
pub mod metadata;
pub mod permissions;
pub mod roles;
pub mod subtitles;
pub mod tasks;
pub mod team;
pub mod types;
pub mod version_graph;
pub mod video;
pub mod visibility;
pub mod workflow;
pub mod writelock;
