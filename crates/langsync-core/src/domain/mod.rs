//! Domain layer: pure keyboard-language logic with no I/O.
//!
//! # Sub-modules
//!
//! - **`language`** – [`LayoutCode`](language::LayoutCode),
//!   [`LayoutCatalogue`](language::LayoutCatalogue) and the
//!   supported/missing partition computed when a peer reports its catalogue.

pub mod language;
