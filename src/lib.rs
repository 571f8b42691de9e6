//! pxo: per-vendor command taxonomy
//!
//! Keeps a catalogue of device CLI commands grouped into per-vendor
//! category trees, stored in SQLite, with bulk CSV import.

pub mod cli;
pub mod core;
pub mod import;
