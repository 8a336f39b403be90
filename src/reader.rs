//! Flipbook reader core.
//!
//! The reader presents a magazine as a sequence of spreads: a synthetic
//! title spread followed by two-page leaves. [`SpreadLayout`] owns the
//! index arithmetic, [`ReaderSession`] coordinates navigation, zoom,
//! fullscreen and persistence against injected collaborators, and the
//! `input` module maps keyboard and touch gestures onto session commands.

pub mod input;
pub mod session;
pub mod spread;

pub use input::{ReaderCommand, SWIPE_THRESHOLD, command_for_key, command_for_swipe};
pub use session::{FullscreenHost, PagePresenter, PageStatus, ProgressStore, ReaderSession};
pub use spread::SpreadLayout;
