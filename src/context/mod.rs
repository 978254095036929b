//!
//! GL context lifecycle.
//!
//! [`ContextManager`] owns the native handles and drives them through
//! [`ContextState`]:
//!
//! ```text
//!  Uninitialized --init(window)--> Live <--resume(window)-- SurfaceLost
//!        |                          |  \                        ^
//!        +--init(None)--> Attached  |   +---suspend / lost------+
//!                                   |
//!                           context lost --> ContextLost --renegotiated--> SurfaceLost
//!
//!  any --terminate--> Terminated --resume(window)--> Live
//!  any --invalidate--> Uninitialized
//! ```
//!

mod manager;
mod state;

pub use manager::ContextManager;
pub use state::{
    ConfigSelection, ContextState, EglBinding, LiveBinding, ScreenSize, SurfacelessBinding,
    SwapIntervalBounds,
};
