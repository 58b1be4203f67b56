// Copyright (c) 2024 Mike Tsao

#![deny(missing_docs, unused_imports, unused_variables)]

//! Patchbay is a module-graph and parameter-automation engine. It manages a
//! registry of signal-processing module definitions, instantiates and wires
//! them into a graph, and animates their parameters over time with timed
//! morphs, one-to-many macro controls, and whole-table A/B preset morphing.
//!
//! The [Engine] is the front door. A minimal session looks like this:
//!
//! ```no_run
//! use patchbay::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Gain;
//! impl ModuleCore for Gain {
//!     fn create_graph(&mut self) -> anyhow::Result<ModuleGraph> {
//!         Ok(ModuleGraph::stereo_in_out())
//!     }
//!     fn set_param(&mut self, _name: &str, _value: f64) {}
//! }
//!
//! let mut engine = Engine::default();
//! engine.register_module(
//!     ModuleDescriptorBuilder::default()
//!         .key("gain")
//!         .category(Category::Utility)
//!         .build()
//!         .unwrap(),
//!     || Box::new(Gain),
//! );
//! let uid = engine.create_module(&ModuleKey::from("gain"), &Default::default()).unwrap();
//! let level = ParamName(format!("{uid}.level"));
//! engine.morph_param(&level, 1.0, Millis(250.0), Easing::EaseOutQuad);
//! while engine.needs_tick() {
//!     engine.advance();
//! }
//! ```

/// A collection of imports that are useful to users of this crate. `use
/// patchbay::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        automation::prelude::*, graph::prelude::*, registry::prelude::*, types::prelude::*,
        util::prelude::*, Engine, ModuleCore, ModuleCtorFn,
    };
}

pub use engine::Engine;
pub use traits::{ModuleCore, ModuleCtorFn};

pub mod automation;
pub mod engine;
pub mod graph;
pub mod registry;
pub mod traits;
pub mod types;
pub mod util;
