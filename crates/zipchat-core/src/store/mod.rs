pub mod reconcile;
pub mod view_state;

pub use reconcile::{Reconciler, ResolveRequest};
pub use view_state::{
    ContactNode, EventNode, ImageSlot, MessageBody, MessageNode, NodeKey, Profile, ViewState,
};
