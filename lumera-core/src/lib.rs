mod client;
mod hierarchy;
mod session;

pub use client::{
    ClientError, DEFAULT_DELIMITER, GroupUpdater, InformationLevel, LumeraClient, Photo,
    PhotoSetKind, PhotoSetSnapshot, PhotoSetUpdater,
};
pub use hierarchy::{HierarchyNode, KindFilter, NodeKind};
pub use session::{
    ApiError, LoginMethod, RpcEnvelope, RpcFault, Session, SessionState, challenge_response,
};
