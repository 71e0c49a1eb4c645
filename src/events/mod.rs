//! # Events Module
//!
//! Progress and diagnostic events emitted by the pipeline.
//!
//! The core never prints. It sends events through a channel and the
//! CLI (or a test) decides what to show.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Copy(CopyEvent::Error { dir, file_name, .. }) = event {
//!             println!("[copy error] folder: {}, file name: {}", dir.display(), file_name);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
