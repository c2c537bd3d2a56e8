//! Snapshot-test harness.

use std::sync::Arc;

use snapseed_core::{
    Context, Document, FixtureLoader, LoaderConfig, Registry, SnapError, Store, StructuralTester,
    Tester,
};

/// Ties a store, a comparator and a fixture loader together for one test.
///
/// The `try_*` methods return errors; the plain forms panic with the
/// operation name and the error, failing the calling test.
pub struct Harness {
    store: Arc<dyn Store>,
    tester: Box<dyn Tester>,
    loader: FixtureLoader,
    context: Context,
}

/// Options for building a [`Harness`].
pub struct HarnessBuilder {
    store: Arc<dyn Store>,
    tester: Box<dyn Tester>,
    registry: Registry,
    loader_config: LoaderConfig,
    context: Context,
}

impl HarnessBuilder {
    /// Comparator used by `assert`. Defaults to [`StructuralTester`].
    pub fn tester(mut self, tester: impl Tester + 'static) -> Self {
        self.tester = Box::new(tester);
        self
    }

    /// Directives to start from; the store adds its own on `build`.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Cache decoded fixture documents. Off by default.
    pub fn document_cache(mut self, enabled: bool) -> Self {
        self.loader_config.cache_documents = enabled;
        self
    }

    /// Replace the whole loader configuration.
    pub fn loader_config(mut self, config: LoaderConfig) -> Self {
        self.loader_config = config;
        self
    }

    /// Context passed to seed and snapshot. Defaults to background.
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Let the store register its directives, then freeze the registry.
    pub fn build(self) -> Result<Harness, SnapError> {
        let mut registry = self.registry;
        self.store.register_types(&mut registry)?;
        log::debug!(
            "Building harness with directives {:?}",
            registry.names().collect::<Vec<_>>()
        );

        Ok(Harness {
            store: self.store,
            tester: self.tester,
            loader: FixtureLoader::new(Arc::new(registry), self.loader_config),
            context: self.context,
        })
    }
}

impl Harness {
    /// Harness with default options.
    pub fn new(store: impl Store + 'static) -> Result<Self, SnapError> {
        Self::builder(store).build()
    }

    pub fn builder(store: impl Store + 'static) -> HarnessBuilder {
        HarnessBuilder {
            store: Arc::new(store),
            tester: Box::new(StructuralTester::new()),
            registry: Registry::new(),
            loader_config: LoaderConfig::default(),
            context: Context::background(),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.loader.registry()
    }

    pub fn loader(&self) -> &FixtureLoader {
        &self.loader
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Seed the store.
    pub fn try_seed(&self, root: Document) -> Result<Seeded<'_>, SnapError> {
        let expected = self.store.seed(&self.context, root)?;
        Ok(Seeded {
            harness: self,
            expected,
        })
    }

    /// Seed the store, failing the test on error.
    #[track_caller]
    pub fn seed(&self, root: Document) -> Seeded<'_> {
        match self.try_seed(root) {
            Ok(seeded) => seeded,
            Err(e) => panic!("seed: {}", e),
        }
    }

    /// Current contents of the store.
    pub fn try_snapshot(&self) -> Result<Document, SnapError> {
        self.store.snapshot(&self.context)
    }

    /// Snapshot the store and compare it with `expected`.
    pub fn try_assert(&self, expected: &Document) -> Result<(), SnapError> {
        let actual = self.try_snapshot()?;
        self.tester.test(expected, &actual)
    }

    /// Snapshot the store and compare, failing the test on error or
    /// mismatch.
    #[track_caller]
    pub fn assert(&self, expected: &Document) {
        let actual = match self.try_snapshot() {
            Ok(actual) => actual,
            Err(e) => panic!("snapshot: {}", e),
        };
        if let Err(e) = self.tester.test(expected, &actual) {
            panic!("assert: {}", e);
        }
    }

    /// Load a fixture document for a path spec.
    pub fn try_load_fixture(&self, spec: &str) -> Result<Document, SnapError> {
        self.loader.load(spec)
    }

    /// Load a fixture document, failing the test on error.
    #[track_caller]
    pub fn load_fixture(&self, spec: &str) -> Document {
        match self.try_load_fixture(spec) {
            Ok(doc) => doc,
            Err(e) => panic!("load fixture {}: {}", spec, e),
        }
    }

    /// Guard that tears the store down when dropped.
    ///
    /// Take it at the top of the test so teardown runs however the test
    /// ends:
    ///
    /// ```ignore
    /// let _cleanup = harness.cleanup();
    /// ```
    pub fn cleanup(&self) -> CleanupGuard {
        CleanupGuard {
            store: Some(Arc::clone(&self.store)),
        }
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("loader", &self.loader)
            .field("context", &self.context)
            .finish()
    }
}

/// What a seed call wrote, ready to be asserted again.
#[derive(Debug)]
pub struct Seeded<'h> {
    harness: &'h Harness,
    expected: Document,
}

impl Seeded<'_> {
    /// The tree returned by the store.
    pub fn expected(&self) -> &Document {
        &self.expected
    }

    pub fn into_expected(self) -> Document {
        self.expected
    }

    pub fn try_assert(&self) -> Result<(), SnapError> {
        self.harness.try_assert(&self.expected)
    }

    /// Assert that the store still holds exactly what was seeded.
    #[track_caller]
    pub fn assert(&self) {
        self.harness.assert(&self.expected)
    }
}

/// Runs `teardown` once, with a fresh background context, when dropped.
///
/// A teardown error fails the test, unless the thread is already panicking,
/// in which case it is logged.
#[must_use = "the store is torn down when the guard is dropped"]
pub struct CleanupGuard {
    store: Option<Arc<dyn Store>>,
}

impl CleanupGuard {
    /// Tear down now instead of at drop.
    pub fn teardown(mut self) -> Result<(), SnapError> {
        match self.store.take() {
            Some(store) => store.teardown(&Context::background()),
            None => Ok(()),
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let Some(store) = self.store.take() else {
            return;
        };
        if let Err(e) = store.teardown(&Context::background()) {
            if std::thread::panicking() {
                log::error!("teardown: {}", e);
            } else {
                panic!("teardown: {}", e);
            }
        }
    }
}
