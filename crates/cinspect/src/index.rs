//! The shared engine context that translation units are created through.

use crate::diagnostic::render;
use crate::unit::UnitCell;
use crate::IndexConfig;
use cinspect_engine::{Ast, Engine, EngineError, EngineSettings, ParseRequest};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Options an index was created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub exclude_declarations_from_pch: bool,
    pub display_diagnostics: bool,
}

/// Handle to an engine context.
///
/// Clones share the same context. Parses through one context are
/// serialized. When the last clone is dropped, or [`Index::dispose`] is
/// called, every unit created through it is invalidated.
#[derive(Clone)]
pub struct Index {
    shared: Arc<IndexShared>,
}

pub(crate) struct IndexShared {
    config: IndexConfig,
    /// Created on first use
    engine: Mutex<Option<Engine>>,
    units: Mutex<Vec<Weak<UnitCell>>>,
    disposed: AtomicBool,
}

impl Index {
    /// Create an index with default configuration and the given options.
    pub fn new(exclude_declarations_from_pch: bool, display_diagnostics: bool) -> Self {
        Self::with_config(IndexConfig {
            exclude_declarations_from_pch,
            display_diagnostics,
            ..IndexConfig::default()
        })
    }

    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            shared: Arc::new(IndexShared {
                config,
                engine: Mutex::new(None),
                units: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            exclude_declarations_from_pch: self.shared.config.exclude_declarations_from_pch,
            display_diagnostics: self.shared.config.display_diagnostics,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.shared.config
    }

    /// Number of units created through this index that are still usable
    pub fn live_units(&self) -> usize {
        self.shared
            .units
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|unit| unit.is_live())
            .count()
    }

    /// Invalidate every unit created through this index, for all clones.
    pub fn dispose(self) {
        self.shared.dispose();
    }

    pub(crate) fn shared(&self) -> &Arc<IndexShared> {
        &self.shared
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("options", &self.options())
            .field("live_units", &self.live_units())
            .finish()
    }
}

impl IndexShared {
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn exclude_declarations_from_pch(&self) -> bool {
        self.config.exclude_declarations_from_pch
    }

    fn settings(&self) -> EngineSettings {
        EngineSettings {
            include_dirs: self.config.include_dirs.clone(),
            system_include_dirs: self.config.system_include_dirs.clone(),
            default_args: self.config.default_args.clone(),
        }
    }

    /// Run the engine. Holds the engine lock for the whole parse.
    pub(crate) fn parse(&self, request: &ParseRequest) -> Result<Ast, EngineError> {
        let mut slot = self.engine.lock();
        let mut engine = match slot.take() {
            Some(engine) => engine,
            None => Engine::new(self.settings())?,
        };
        let result = engine.parse(request);
        *slot = Some(engine);
        let ast = result?;

        if self.config.display_diagnostics {
            for diagnostic in &ast.diagnostics {
                eprintln!("{}", render(diagnostic));
            }
        }
        Ok(ast)
    }

    pub(crate) fn register(&self, unit: &Arc<UnitCell>) {
        let mut units = self.units.lock();
        units.retain(|weak| weak.strong_count() > 0);
        units.push(Arc::downgrade(unit));
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let units: Vec<_> = self.units.lock().drain(..).collect();
        let mut invalidated = 0;
        for unit in units.iter().filter_map(Weak::upgrade) {
            unit.invalidate();
            invalidated += 1;
        }
        debug!(units = invalidated, "Disposed index");
    }
}

impl Drop for IndexShared {
    fn drop(&mut self) {
        self.dispose();
    }
}
