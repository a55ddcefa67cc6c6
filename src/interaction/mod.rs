//! Pointer, wheel and keyboard handling plus the overlay state it drives.

mod debounce;
mod selection;
mod state;
mod tags;

pub use debounce::{Debounce, Millis};
pub use selection::{IntersectionValidator, RelationError, RelationRegistrar, SelectionPair};
pub use state::{
    ContextMenu, Controller, DiagramEvent, HitTarget, InteractionState, Key, MenuTarget,
    PathPick, PointerButton,
};
pub use tags::{ColorTag, TagOverlay};
