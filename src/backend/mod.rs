//! Backend seams.
//!
//! The core never emits machine code itself. It talks to:
//!
//! - an IR builder ([`builder::IrBuilder`]) offering loads, stores, casts,
//!   branches, phi nodes, calls and arithmetic
//! - a backend module ([`builder::BackendModule`]) declaring functions,
//!   verifying itself and running optimization passes
//!
//! [`recording::RecordingBackend`] keeps everything in memory;
//! `llvm::LlvmBackend` (feature `llvm`) emits real LLVM IR through inkwell.

pub mod builder;
#[cfg(feature = "llvm")]
pub mod llvm;
pub mod recording;
